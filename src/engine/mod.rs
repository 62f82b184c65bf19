// ==========================================
// 资源产能日历引擎 - 引擎层
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART D 引擎体系
// 依据: Timeline_Engine_Specs_v0.5.md - 1.2 模块拆分
// ==========================================
// 职责: 实现产能时间线计算引擎, 不持有沙盘状态
// 红线: 引擎无状态, 所有校验失败必须返回错误
// ==========================================

pub mod break_off;
pub mod events;
pub mod orchestrator;
pub mod profile;
pub mod recurrence;

// 重导出核心引擎
pub use break_off::{BreakOffEngine, BreakOffOutcome, BreakOffOverrides};
pub use events::{
    CalendarEvent, CalendarEventPublisher, CalendarEventType, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use orchestrator::{
    BreakOffReport, CalendarOrchestrator, ClockAdvanceReport, IntervalRefreshReport,
    IntervalRemovalReport, ProfileRefreshReport,
};
pub use profile::ProfileEngine;
pub use recurrence::{ExpansionTerminator, ExpiredSplit, RecurrenceEngine};
