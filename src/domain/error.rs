// ==========================================
// 资源产能日历引擎 - 领域错误类型
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART A3 错误红线
// 工具: thiserror 派生宏
// ==========================================
// 红线: 核心引擎只返回错误, 不记录不吞掉; 内部一致性
//       错误视为致命, 调用方不得重试

use chrono::{DateTime, Utc};
use thiserror::Error;

/// 日历引擎错误类型
#[derive(Error, Debug)]
pub enum CalendarError {
    // ===== 不变量违规(构造期同步拒绝) =====
    #[error("时间区间非法: 结束必须晚于开始 (start={start}, end={end})")]
    InvalidInterval {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("人数系数非法: 必须为正 (nbr_of_people={0})")]
    InvalidNbrOfPeople(f64),

    #[error("周期规则非法 (field={field}): {message}")]
    InvalidRecurrence { field: String, message: String },

    #[error("离线区间不得开启能力开关: {flag}")]
    OfflineUsageConflict { flag: String },

    #[error("时间桶参数非法 (field={field}): {message}")]
    InvalidBucketSpec { field: String, message: String },

    #[error("计划时钟不可回拨 (current={current}, requested={requested})")]
    ClockRegression {
        current: DateTime<Utc>,
        requested: DateTime<Utc>,
    },

    // ===== 查找错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    // ===== 内部一致性错误(致命, 不可重试) =====
    #[error("内部一致性错误: {0}")]
    InternalInconsistency(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result 类型别名
pub type CalendarResult<T> = Result<T, CalendarError>;
