// ==========================================
// 资源产能日历引擎 - 周期展开引擎
// ==========================================
// 依据: Timeline_Engine_Specs_v0.5.md - 5. 周期规则与展开
// 红线: 展开 = 快进 + 物化两阶段; 快进跳过的发生
//       必须计入最大次数收尾
// ==========================================
// 职责: 把周期规则在 [时钟, 展望期] 内展开为发生窗口
// 输入: 锚点窗口 + 周期规则 + 场景时钟 + 展望期结束
// 输出: 发生窗口序列(纯函数, 不触碰存储)
// ==========================================

use chrono::{DateTime, Datelike, Duration, Months, Utc};
use tracing::{debug, instrument};

use crate::domain::error::CalendarResult;
use crate::domain::interval::RecurrenceRule;
use crate::domain::time::{TimeInterval, MAX_INSTANT, MIN_INSTANT};
use crate::domain::types::RecurrenceKind;

// ==========================================
// ExpansionTerminator - 展开收尾器
// ==========================================
// 展望期约束恒在; 规则自身的收尾策略叠加其上
#[derive(Debug, Clone, Copy)]
pub struct ExpansionTerminator {
    horizon_end: DateTime<Utc>,
    end_date_time: Option<DateTime<Utc>>,
    max_occurrences: Option<u32>,
}

impl ExpansionTerminator {
    pub fn for_rule(rule: &RecurrenceRule, horizon_end: DateTime<Utc>) -> Self {
        use crate::domain::interval::RecurrenceEndPolicy::*;
        let (end_date_time, max_occurrences) = match rule.end_policy {
            NoEndDate => (None, None),
            AfterEndDateTime { end_date_time } => (Some(end_date_time), None),
            AfterMaxOccurrences { max_occurrences } => (None, Some(max_occurrences)),
        };
        ExpansionTerminator {
            horizon_end,
            end_date_time,
            max_occurrences,
        }
    }

    /// 收尾判定
    ///
    /// # 参数
    /// - `next_start`: 待判定发生的开始时刻
    /// - `occurrence_count`: 已计数发生数(物化 + 快进跳过)
    ///
    /// 开始时刻越过展望期或收尾时刻(严格大于)即收尾;
    /// 计数达到最大次数即收尾
    pub fn is_exhausted(&self, next_start: DateTime<Utc>, occurrence_count: u32) -> bool {
        if let Some(max) = self.max_occurrences {
            if occurrence_count >= max {
                return true;
            }
        }
        if next_start > self.horizon_end {
            return true;
        }
        if let Some(end) = self.end_date_time {
            if next_start > end {
                return true;
            }
        }
        false
    }
}

// ==========================================
// ExpiredSplit - 时钟推进的过期拆分结果
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ExpiredSplit {
    pub to_actualize: Vec<TimeInterval>, // 保留窗口内的过期发生(固化为实绩)
    pub purged: usize,                   // 超出保留窗口被清除的发生数
}

// ==========================================
// RecurrenceEngine - 周期展开引擎
// ==========================================
pub struct RecurrenceEngine {
    // 无状态引擎，不需要注入依赖
}

impl RecurrenceEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 展开周期规则
    ///
    /// 阶段一(快进): 自首次发生起, 结束不晚于时钟的发生
    /// 逐个跳过, 每跳一个计一次数; 阶段二(物化): 自第一个
    /// 结束晚于时钟的发生起物化, 直到收尾器判停
    ///
    /// # 参数
    /// - `anchor`: 锚点窗口(发生时长一律取锚点时长)
    /// - `rule`: 周期规则
    /// - `clock`: 场景时钟
    /// - `horizon_end`: 展望期结束时刻
    ///
    /// # 返回
    /// 升序发生窗口; 全部过期或规则在快进中收尾则为空
    #[instrument(skip(self, anchor, rule), fields(
        kind = %rule.kind,
        skip = rule.skip_frequency,
        clock = %clock,
        horizon_end = %horizon_end
    ))]
    pub fn expand(
        &self,
        anchor: &TimeInterval,
        rule: &RecurrenceRule,
        clock: DateTime<Utc>,
        horizon_end: DateTime<Utc>,
    ) -> CalendarResult<Vec<TimeInterval>> {
        rule.validate(anchor.start)?;
        let terminator = ExpansionTerminator::for_rule(rule, horizon_end);
        let mut count: u32 = 0;

        let mut current = match self.first_occurrence(anchor, rule) {
            Some(occ) => occ,
            None => return Ok(Vec::new()),
        };

        // 阶段一: 快进
        while current.end <= clock {
            if terminator.is_exhausted(current.start, count) {
                debug!(skipped = count, "快进阶段收尾, 零展开");
                return Ok(Vec::new());
            }
            count = count.saturating_add(1);
            current = match self.next_occurrence(&current, rule) {
                Some(next) => next,
                None => return Ok(Vec::new()),
            };
        }

        // 阶段二: 物化
        let mut occurrences: Vec<TimeInterval> = Vec::new();
        loop {
            if terminator.is_exhausted(current.start, count) {
                break;
            }
            occurrences.push(current);
            count = count.saturating_add(1);
            current = match self.next_occurrence(&current, rule) {
                Some(next) => next,
                None => break,
            };
        }
        debug!(materialized = occurrences.len(), "周期展开完成");
        Ok(occurrences)
    }

    /// 判定序列在给定时钟下是否已耗尽
    ///
    /// 耗尽 = 收尾策略已无法再产出任何发生; 快进语义与
    /// expand 一致, 但不受展望期约束(锚点在展望期之外的
    /// 未来序列不算耗尽)。NoEndDate 序列永不耗尽
    pub fn series_exhausted(
        &self,
        anchor: &TimeInterval,
        rule: &RecurrenceRule,
        clock: DateTime<Utc>,
    ) -> CalendarResult<bool> {
        rule.validate(anchor.start)?;
        let terminator = ExpansionTerminator::for_rule(rule, MAX_INSTANT);
        let mut count: u32 = 0;

        let mut current = match self.first_occurrence(anchor, rule) {
            Some(occ) => occ,
            None => return Ok(true),
        };
        while current.end <= clock {
            if terminator.is_exhausted(current.start, count) {
                return Ok(true);
            }
            count = count.saturating_add(1);
            current = match self.next_occurrence(&current, rule) {
                Some(next) => next,
                None => return Ok(true),
            };
        }
        Ok(terminator.is_exhausted(current.start, count))
    }

    /// 首次发生
    ///
    /// 按周规则自锚点日起至多前探 7 天找第一个被设置
    /// 星期; 其余规则锚点窗口即首次发生
    fn first_occurrence(&self, anchor: &TimeInterval, rule: &RecurrenceRule) -> Option<TimeInterval> {
        match rule.kind {
            RecurrenceKind::Weekly => {
                for offset in 0..7i64 {
                    let candidate = anchor.shift(Duration::days(offset))?;
                    if rule.weekdays.contains(candidate.start.weekday()) {
                        return Some(candidate);
                    }
                }
                None
            }
            _ => Some(*anchor),
        }
    }

    /// 下一次发生
    ///
    /// - 按日: 开始推进 (skip+1) 天
    /// - 按周: 先在本周内找严格更晚的设置位; 否则跳到
    ///   skip 周之后那一周的周一, 再取最早设置位
    /// - 按月: 日历推进 (skip+1) 个月, 同日同时刻,
    ///   月末不足则收缩到当月最后一天
    /// - 按年: 恒推进一个日历年(跳过频度不参与)
    ///
    /// 越出可表示范围返回 None, 序列就此终止
    fn next_occurrence(&self, current: &TimeInterval, rule: &RecurrenceRule) -> Option<TimeInterval> {
        match rule.kind {
            RecurrenceKind::Daily => {
                current.shift(Duration::days(rule.skip_frequency as i64 + 1))
            }
            RecurrenceKind::Weekly => {
                let weekday = current.start.weekday();
                if let Some(next) = rule.weekdays.next_set_after(weekday) {
                    let delta = next.num_days_from_monday() as i64
                        - weekday.num_days_from_monday() as i64;
                    current.shift(Duration::days(delta))
                } else {
                    let first = rule.weekdays.first_set()?;
                    let to_monday = 7 - weekday.num_days_from_monday() as i64;
                    let delta = to_monday
                        + 7 * rule.skip_frequency as i64
                        + first.num_days_from_monday() as i64;
                    current.shift(Duration::days(delta))
                }
            }
            RecurrenceKind::MonthlyByDayNumber => {
                let start = current
                    .start
                    .checked_add_months(Months::new(rule.skip_frequency + 1))?;
                current.rebase_start(start)
            }
            RecurrenceKind::YearlyByMonthDay => {
                let start = current.start.checked_add_months(Months::new(12))?;
                current.rebase_start(start)
            }
        }
    }

    /// 时钟推进时拆分已过期发生
    ///
    /// 结束不晚于新时钟的发生为过期: 结束仍在保留窗口
    /// [new_clock - retention, new_clock] 内的固化为实绩,
    /// 更早的直接清除
    pub fn collect_expired(
        &self,
        occurrences: &[TimeInterval],
        new_clock: DateTime<Utc>,
        retention: Duration,
    ) -> ExpiredSplit {
        let cutoff = new_clock
            .checked_sub_signed(retention)
            .unwrap_or(MIN_INSTANT);
        let mut split = ExpiredSplit::default();
        for occ in occurrences {
            if occ.end > new_clock {
                continue;
            }
            if occ.end >= cutoff {
                split.to_actualize.push(*occ);
            } else {
                split.purged += 1;
            }
        }
        split
    }
}

impl Default for RecurrenceEngine {
    fn default() -> Self {
        Self::new()
    }
}
