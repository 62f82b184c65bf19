// ==========================================
// 资源产能日历引擎 - 配置层
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART 5 配置项
// ==========================================
// 职责: 引擎运行参数管理
// 存储: JSON 文件
// ==========================================

pub mod params;

// 重导出核心配置类型
pub use params::CalendarConfig;
