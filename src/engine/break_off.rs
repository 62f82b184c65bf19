// ==========================================
// 资源产能日历引擎 - 单次剥离引擎
// ==========================================
// 依据: Timeline_Engine_Specs_v0.5.md - 6. 单次剥离四分支
// 红线: 目标发生必须存在于当前展开列表, 缺失视为
//       内部一致性错误(致命)
// ==========================================
// 职责: 把周期序列中的一次发生剥离为独立区间
// 输入: 已展开的周期区间 + 目标发生窗口 + 覆盖字段
// 输出: 剥离结果(序列去留 + 前段序列 + 独立覆盖区间)
// ==========================================

use tracing::{debug, instrument};

use crate::domain::error::{CalendarError, CalendarResult};
use crate::domain::interval::{
    new_id, CapacityInterval, ExpansionState, RecurrenceEndPolicy, RecurringCapacityInterval,
};
use crate::domain::time::{one_tick, TimeInterval};
use crate::domain::types::CapacityKind;
use crate::domain::usage::CapacityUsage;

// ==========================================
// BreakOffOverrides - 剥离覆盖字段
// ==========================================
// 未给出的字段沿用序列载荷
#[derive(Debug, Clone, Default)]
pub struct BreakOffOverrides {
    pub kind: Option<CapacityKind>,
    pub window: Option<TimeInterval>,
    pub nbr_of_people: Option<f64>,
    pub usage: Option<CapacityUsage>,
    pub display_name: Option<String>,
    pub remark: Option<String>,
}

// ==========================================
// BreakOffOutcome - 剥离结果
// ==========================================
#[derive(Debug, Clone)]
pub struct BreakOffOutcome {
    /// 剥离后的原序列; None 表示序列整体删除(唯一发生被剥离)
    pub updated: Option<RecurringCapacityInterval>,
    /// 中段剥离时新建的前段序列(覆盖目标之前的发生)
    pub detached_prior: Option<RecurringCapacityInterval>,
    /// 承载剥离发生的独立区间(任何分支都会产生)
    pub override_interval: CapacityInterval,
}

// ==========================================
// BreakOffEngine - 单次剥离引擎
// ==========================================
pub struct BreakOffEngine {
    // 无状态引擎，不需要注入依赖
}

impl BreakOffEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 剥离一次发生
    ///
    /// # 参数
    /// - `recurring`: 周期区间(必须处于已展开态)
    /// - `target`: 目标发生窗口(须与展开列表精确匹配)
    /// - `overrides`: 独立区间的覆盖字段
    ///
    /// # 规则
    /// - 唯一发生: 序列删除, 只留独立区间
    /// - 首个发生: 锚点推进到第二个发生
    /// - 末个发生: 收尾改为目标开始前一刻度
    /// - 中间发生: 新建前段序列(收尾于目标前一刻度),
    ///   原序列重锚到目标之后的发生
    ///
    /// # 返回
    /// 目标不在展开列表中返回内部一致性错误
    #[instrument(skip(self, recurring, overrides), fields(
        interval_id = %recurring.base.interval_id,
        target_start = %target.start
    ))]
    pub fn break_off(
        &self,
        recurring: &RecurringCapacityInterval,
        target: &TimeInterval,
        overrides: &BreakOffOverrides,
    ) -> CalendarResult<BreakOffOutcome> {
        let occurrences = recurring.occurrences();
        let idx = occurrences
            .iter()
            .position(|occ| occ == target)
            .ok_or_else(|| {
                CalendarError::InternalInconsistency(format!(
                    "剥离目标不在展开列表中: interval_id={}, target={}",
                    recurring.base.interval_id, target
                ))
            })?;

        let override_interval = self.build_override(recurring, target, overrides)?;

        // 1. 唯一发生: 序列整体删除
        if occurrences.len() == 1 {
            debug!("唯一发生被剥离, 序列删除");
            return Ok(BreakOffOutcome {
                updated: None,
                detached_prior: None,
                override_interval,
            });
        }

        // 2. 首个发生: 锚点推进到第二个发生
        if idx == 0 {
            let mut updated = recurring.clone();
            updated.base.window = occurrences[1];
            updated.expansion = ExpansionState::NotExpanded;
            updated.base.touch();
            debug!(new_anchor = %updated.base.window, "首个发生被剥离, 锚点推进");
            return Ok(BreakOffOutcome {
                updated: Some(updated),
                detached_prior: None,
                override_interval,
            });
        }

        // 3. 末个发生: 收尾改为目标开始前一刻度
        if idx == occurrences.len() - 1 {
            let mut updated = recurring.clone();
            updated.rule.end_policy = RecurrenceEndPolicy::AfterEndDateTime {
                end_date_time: target.start - one_tick(),
            };
            updated.expansion = ExpansionState::NotExpanded;
            updated.base.touch();
            debug!("末个发生被剥离, 序列提前收尾");
            return Ok(BreakOffOutcome {
                updated: Some(updated),
                detached_prior: None,
                override_interval,
            });
        }

        // 4. 中间发生: 前段新序列 + 原序列重锚
        let mut prior = recurring.clone();
        prior.base.interval_id = new_id();
        prior.rule.end_policy = RecurrenceEndPolicy::AfterEndDateTime {
            end_date_time: target.start - one_tick(),
        };
        prior.expansion = ExpansionState::NotExpanded;
        prior.base.touch();

        let mut updated = recurring.clone();
        updated.base.window = occurrences[idx + 1];
        updated.expansion = ExpansionState::NotExpanded;
        updated.base.touch();

        debug!(
            prior_id = %prior.base.interval_id,
            new_anchor = %updated.base.window,
            "中间发生被剥离, 序列一分为二"
        );
        Ok(BreakOffOutcome {
            updated: Some(updated),
            detached_prior: Some(prior),
            override_interval,
        })
    }

    /// 构造承载剥离发生的独立区间
    ///
    /// 新 ID; 未覆盖字段沿用序列载荷; 关联沿用序列的
    /// 全部资源; 覆盖组合仍需通过构造期全部校验
    fn build_override(
        &self,
        recurring: &RecurringCapacityInterval,
        target: &TimeInterval,
        overrides: &BreakOffOverrides,
    ) -> CalendarResult<CapacityInterval> {
        let base = &recurring.base;
        let mut interval = base.clone();
        interval.interval_id = new_id();
        interval.kind = overrides.kind.unwrap_or(base.kind);
        interval.window = overrides.window.unwrap_or(*target);
        interval.nbr_of_people = overrides.nbr_of_people.unwrap_or(base.nbr_of_people);
        if let Some(usage) = &overrides.usage {
            interval.usage = usage.clone();
        }
        if let Some(name) = &overrides.display_name {
            interval.display_name = Some(name.clone());
        }
        if let Some(remark) = &overrides.remark {
            interval.remark = Some(remark.clone());
        }
        interval.touch();
        interval.validate()?;
        Ok(interval)
    }
}

impl Default for BreakOffEngine {
    fn default() -> Self {
        Self::new()
    }
}
