// ==========================================
// 资源产能日历引擎 - 时间轴与时间区间
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART B0 时间轴约定
// 依据: Timeline_Engine_Specs_v0.5.md - 0.1 可表示范围与半开区间
// ==========================================
// 红线: 全引擎统一使用 UTC 半开区间 [start, end),
//       剖面覆盖 [MIN_INSTANT, MAX_INSTANT) 无缝隙无重叠

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::{CalendarError, CalendarResult};

/// 时间轴最小可表示时刻
pub const MIN_INSTANT: DateTime<Utc> = DateTime::<Utc>::MIN_UTC;

/// 时间轴最大可表示时刻
pub const MAX_INSTANT: DateTime<Utc> = DateTime::<Utc>::MAX_UTC;

/// 最小时间步长(一个刻度)
///
/// 单次剥离收尾边界等"差一刻"语义均以此为准
pub fn one_tick() -> Duration {
    Duration::nanoseconds(1)
}

// ==========================================
// 时间区间 (Time Interval)
// ==========================================
// 半开区间 [start, end), 构造期校验 end > start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeInterval {
    /// 构造半开区间, 校验结束晚于开始
    ///
    /// # 参数
    /// - `start`: 开始时刻(含)
    /// - `end`: 结束时刻(不含)
    ///
    /// # 返回
    /// 校验失败返回 `CalendarError::InvalidInterval`
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarResult<Self> {
        if end <= start {
            return Err(CalendarError::InvalidInterval { start, end });
        }
        Ok(TimeInterval { start, end })
    }

    /// 内部构造, 调用方保证 end > start
    pub(crate) fn raw(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        debug_assert!(end > start, "区间构造违规: end <= start");
        TimeInterval { start, end }
    }

    /// 覆盖整个可表示范围的区间
    pub fn full_range() -> Self {
        TimeInterval {
            start: MIN_INSTANT,
            end: MAX_INSTANT,
        }
    }

    /// 区间时长
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// 时刻是否落入本区间(半开语义)
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    /// 与另一区间是否有非零重叠(共享端点不算重叠)
    pub fn overlaps(&self, other: &TimeInterval) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// 与另一区间的交集
    pub fn intersection(&self, other: &TimeInterval) -> Option<TimeInterval> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            Some(TimeInterval { start, end })
        } else {
            None
        }
    }

    /// 整体平移, 越出可表示范围返回 None
    pub fn shift(&self, delta: Duration) -> Option<TimeInterval> {
        let start = self.start.checked_add_signed(delta)?;
        let end = self.end.checked_add_signed(delta)?;
        Some(TimeInterval { start, end })
    }

    /// 以新的开始时刻重建区间, 保持原时长
    pub fn rebase_start(&self, new_start: DateTime<Utc>) -> Option<TimeInterval> {
        let end = new_start.checked_add_signed(self.duration())?;
        Some(TimeInterval {
            start: new_start,
            end,
        })
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
