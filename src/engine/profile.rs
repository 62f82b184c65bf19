// ==========================================
// 资源产能日历引擎 - 剖面重建引擎
// ==========================================
// 依据: Timeline_Engine_Specs_v0.5.md - 4. 剖面重建三趟算法
// 红线: 重建结果必须无缝隙无重叠覆盖 [MIN_INSTANT, MAX_INSTANT)
// ==========================================
// 职责: 把允许重叠的原始单元集合压成连续时间线
// 输入: 原始单元列表 + 展望期结束时刻
// 输出: 重建后的剖面单元序列(纯函数, 由调用方整体交换)
// ==========================================

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::domain::error::{CalendarError, CalendarResult};
use crate::domain::interval::{ResourceCapacityInterval, UNRESTRICTED_NBR_OF_PEOPLE};
use crate::domain::time::{TimeInterval, MAX_INSTANT, MIN_INSTANT};
use crate::domain::types::CapacityKind;
use crate::domain::usage::CapacityUsage;

// ==========================================
// ProfileEngine - 剖面重建引擎
// ==========================================
pub struct ProfileEngine {
    // 无状态引擎，不需要注入依赖
}

/// 扫描线边界事件
#[derive(Debug, Clone, Copy)]
struct BoundaryEvent {
    time: DateTime<Utc>,
    is_end: bool,
    unit_idx: usize,
}

impl ProfileEngine {
    /// 构造函数
    pub fn new() -> Self {
        Self {}
    }

    /// 重建资源产能剖面
    ///
    /// 三趟算法:
    /// 1) 同活跃性合并: 活跃/不活跃两组分别扫描线合并,
    ///    人数求和, 类别按优先级归并
    /// 2) 活跃/不活跃复合: 不活跃段无条件压过活跃段,
    ///    前补离线, 尾接展望期外不设限在线段
    /// 3) 缺口填充: 相邻段之间补离线段, 开关随后继段
    ///
    /// # 参数
    /// - `raw`: 原始单元列表(允许重叠, 不变量已在构造期校验)
    /// - `horizon_end`: 计划展望期结束时刻
    ///
    /// # 返回
    /// 覆盖全程的剖面序列; 终检失败返回内部一致性错误
    #[instrument(skip(self, raw), fields(raw_units = raw.len(), horizon_end = %horizon_end))]
    pub fn regenerate(
        &self,
        raw: &[ResourceCapacityInterval],
        horizon_end: DateTime<Utc>,
    ) -> CalendarResult<Vec<ResourceCapacityInterval>> {
        // 1. 按活跃性分组
        let active_raw: Vec<&ResourceCapacityInterval> =
            raw.iter().filter(|u| u.is_active()).collect();
        let inactive_raw: Vec<&ResourceCapacityInterval> =
            raw.iter().filter(|u| !u.is_active()).collect();

        // 2. 第一趟: 同活跃性合并
        let active = self.merge_same_activeness(&active_raw);
        let inactive = self.merge_same_activeness(&inactive_raw);
        debug!(
            active_segments = active.len(),
            inactive_segments = inactive.len(),
            "同活跃性合并完成"
        );

        // 3. 第二趟: 活跃/不活跃复合
        let combined = self.combine_active_inactive(active, inactive, horizon_end);

        // 4. 第三趟: 缺口填充
        let profile = self.fill_gaps(combined);

        // 5. 终检: 剖面必须无缝隙无重叠覆盖全程
        self.verify_contiguous(&profile)?;
        debug!(profile_segments = profile.len(), "剖面重建完成");
        Ok(profile)
    }

    // ==========================================
    // 第一趟: 同活跃性合并
    // ==========================================

    /// 对同一活跃性分组的单元做扫描线合并
    ///
    /// 边界事件按 (时刻, 结束先于开始) 排序; 开集合每次
    /// 成员变化封闭一段, 人数取变化前开集合之和, 类别取
    /// 开集合内优先级最高者; 同刻闭后即开不产生零长段
    fn merge_same_activeness(
        &self,
        units: &[&ResourceCapacityInterval],
    ) -> Vec<ResourceCapacityInterval> {
        if units.is_empty() {
            return Vec::new();
        }

        let mut events: Vec<BoundaryEvent> = Vec::with_capacity(units.len() * 2);
        for (idx, unit) in units.iter().enumerate() {
            events.push(BoundaryEvent {
                time: unit.window.start,
                is_end: false,
                unit_idx: idx,
            });
            events.push(BoundaryEvent {
                time: unit.window.end,
                is_end: true,
                unit_idx: idx,
            });
        }
        // 同刻时结束事件在前
        events.sort_by_key(|e| (e.time, !e.is_end));

        let mut merged: Vec<ResourceCapacityInterval> = Vec::new();
        let mut open: Vec<usize> = Vec::new();
        let mut seg_start: Option<DateTime<Utc>> = None;

        for ev in events {
            if let Some(start) = seg_start {
                if ev.time > start && !open.is_empty() {
                    merged.push(self.merged_segment(units, &open, start, ev.time));
                }
            }
            if ev.is_end {
                open.retain(|&i| i != ev.unit_idx);
            } else {
                open.push(ev.unit_idx);
            }
            seg_start = if open.is_empty() { None } else { Some(ev.time) };
        }
        merged
    }

    /// 由开集合封闭一段合并单元
    fn merged_segment(
        &self,
        units: &[&ResourceCapacityInterval],
        open: &[usize],
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> ResourceCapacityInterval {
        let nbr_of_people: f64 = open.iter().map(|&i| units[i].nbr_of_people).sum();
        let winner = open
            .iter()
            .map(|&i| units[i])
            .max_by_key(|u| u.kind.precedence_rank())
            .map(|u| (u.kind, u.usage.clone()))
            .unwrap_or((CapacityKind::Offline, CapacityUsage::offline()));

        let mixed = open
            .iter()
            .any(|&i| units[i].kind.is_active() != winner.0.is_active());
        if mixed {
            warn!(
                start = %start,
                end = %end,
                "同活跃性分组内出现跨活跃性类别混叠, 按全序优先级归并"
            );
        }

        let source_interval_id = if open.len() == 1 {
            units[open[0]].source_interval_id.clone()
        } else {
            None
        };

        ResourceCapacityInterval {
            source_interval_id,
            kind: winner.0,
            window: TimeInterval::raw(start, end),
            nbr_of_people,
            usage: winner.1,
        }
    }

    // ==========================================
    // 第二趟: 活跃/不活跃复合
    // ==========================================

    /// 不活跃段无条件压过活跃段
    ///
    /// 活跃段被不活跃覆盖的部分切除(截短/打断/整段吞没),
    /// 两序列按时刻交错合并; 首段不从 MIN_INSTANT 起则前
    /// 补离线段; 自 max(末段结束, 展望期结束) 起接一段不
    /// 设限在线段直到 MAX_INSTANT
    fn combine_active_inactive(
        &self,
        active: Vec<ResourceCapacityInterval>,
        inactive: Vec<ResourceCapacityInterval>,
        horizon_end: DateTime<Utc>,
    ) -> Vec<ResourceCapacityInterval> {
        let mut combined: Vec<ResourceCapacityInterval> =
            Vec::with_capacity(active.len() + inactive.len() + 2);

        // 1. 活跃段扣除不活跃覆盖
        for seg in &active {
            let mut cursor = seg.window.start;
            for blk in &inactive {
                if blk.window.end <= cursor {
                    continue;
                }
                if blk.window.start >= seg.window.end {
                    break;
                }
                if blk.window.start > cursor {
                    let mut piece = seg.clone();
                    piece.window = TimeInterval::raw(cursor, blk.window.start);
                    combined.push(piece);
                }
                cursor = cursor.max(blk.window.end);
                if cursor >= seg.window.end {
                    break;
                }
            }
            if cursor < seg.window.end {
                let mut piece = seg.clone();
                piece.window = TimeInterval::raw(cursor, seg.window.end);
                combined.push(piece);
            }
        }

        // 2. 不活跃段原样并入, 按开始时刻排序
        combined.extend(inactive);
        combined.sort_by_key(|s| s.window.start);

        // 3. 尾接展望期外不设限在线段
        let tail_start = combined
            .last()
            .map(|s| s.window.end)
            .unwrap_or(horizon_end)
            .max(horizon_end);
        if tail_start < MAX_INSTANT {
            combined.push(ResourceCapacityInterval::synthetic(
                CapacityKind::Online,
                TimeInterval::raw(tail_start, MAX_INSTANT),
                UNRESTRICTED_NBR_OF_PEOPLE,
                CapacityUsage::unrestricted(),
            ));
        }

        // 4. 首段不从时间轴起点开始则前补离线段
        if let Some(first) = combined.first() {
            if first.window.start > MIN_INSTANT {
                let lead = ResourceCapacityInterval::synthetic(
                    CapacityKind::Offline,
                    TimeInterval::raw(MIN_INSTANT, first.window.start),
                    0.0,
                    CapacityUsage::offline(),
                );
                combined.insert(0, lead);
            }
        }
        combined
    }

    // ==========================================
    // 第三趟: 缺口填充
    // ==========================================

    /// 相邻段之间的缺口补离线段, 开关随后继段
    fn fill_gaps(&self, segments: Vec<ResourceCapacityInterval>) -> Vec<ResourceCapacityInterval> {
        let mut filled: Vec<ResourceCapacityInterval> = Vec::with_capacity(segments.len() * 2);
        let mut cursor = MIN_INSTANT;
        for seg in segments {
            if seg.window.start > cursor {
                filled.push(ResourceCapacityInterval::synthetic(
                    CapacityKind::Offline,
                    TimeInterval::raw(cursor, seg.window.start),
                    0.0,
                    seg.usage.clone(),
                ));
            }
            cursor = seg.window.end;
            filled.push(seg);
        }
        filled
    }

    // ==========================================
    // 终检
    // ==========================================

    /// 剖面连续性检查: 自 MIN_INSTANT 无缝隙无重叠到 MAX_INSTANT
    fn verify_contiguous(&self, profile: &[ResourceCapacityInterval]) -> CalendarResult<()> {
        let mut cursor = MIN_INSTANT;
        for (idx, seg) in profile.iter().enumerate() {
            if seg.window.start != cursor {
                return Err(CalendarError::InternalInconsistency(format!(
                    "剖面第 {} 段不连续: 期望开始 {}, 实际 {}",
                    idx, cursor, seg.window.start
                )));
            }
            cursor = seg.window.end;
        }
        if cursor != MAX_INSTANT {
            return Err(CalendarError::InternalInconsistency(format!(
                "剖面未覆盖到时间轴终点: 止于 {}",
                cursor
            )));
        }
        Ok(())
    }
}

impl Default for ProfileEngine {
    fn default() -> Self {
        Self::new()
    }
}
