// ==========================================
// 资源产能日历引擎 - 领域模型层
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART B 数据与状态体系
// 依据: Timeline_Engine_Specs_v0.5.md - 主实体定义
// ==========================================
// 职责: 定义领域实体、类型、不变量与查询面
// 红线: 不含存储逻辑, 不含引擎逻辑
// ==========================================

pub mod bucket;
pub mod collection;
pub mod error;
pub mod interval;
pub mod resource;
pub mod time;
pub mod types;
pub mod usage;

// 重导出核心类型
pub use bucket::{TimeBucket, TimeBucketList, TimeBucketListHash};
pub use collection::{ResourceCapacityIntervalsCollection, SMALL_COLLECTION_LINEAR_SCAN_MAX};
pub use error::{CalendarError, CalendarResult};
pub use interval::{
    new_id, CapacityInterval, ExpansionState, IntervalId, RecurrenceEndPolicy, RecurrenceRule,
    RecurringCapacityInterval, ResourceCapacityInterval, ResourceId, ScheduledInterval,
    WeekdayMask, UNRESTRICTED_NBR_OF_PEOPLE,
};
pub use resource::{Resource, ResourceCapacityProfile};
pub use time::{one_tick, TimeInterval, MAX_INSTANT, MIN_INSTANT};
pub use types::{CapacityKind, IntervalSource, RecurrenceKind};
pub use usage::CapacityUsage;
