// ==========================================
// 资源产能日历引擎 - 核心库
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - 系统宪法
// 技术栈: Rust + chrono + serde
// 系统定位: 排产系统的产能时间线计算核心
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 时间线计算
pub mod engine;

// 沙盘层 - 计划时钟与关联
pub mod scenario;

// 配置层 - 运行参数
pub mod config;

// 日志系统
pub mod logging;

// 性能统计
pub mod perf;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CapacityKind, IntervalSource, RecurrenceKind};

// 领域实体
pub use domain::{
    CalendarError, CalendarResult, CapacityInterval, CapacityUsage, RecurrenceEndPolicy,
    RecurrenceRule, RecurringCapacityInterval, Resource, ResourceCapacityInterval,
    ResourceCapacityIntervalsCollection, ScheduledInterval, TimeBucketList, TimeBucketListHash,
    TimeInterval, WeekdayMask,
};

// 引擎
pub use engine::{
    BreakOffEngine, BreakOffOverrides, CalendarOrchestrator, ProfileEngine, RecurrenceEngine,
};

// 沙盘
pub use scenario::Scenario;

// 配置
pub use config::CalendarConfig;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "资源产能日历引擎";

// ==========================================
// 预编译检查
// ==========================================
