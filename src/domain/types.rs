// ==========================================
// 资源产能日历引擎 - 领域类型定义
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART B1 产能区间分类
// 依据: Timeline_Engine_Specs_v0.5.md - 1.1 区间类别与活跃性
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 产能区间类别 (Capacity Kind)
// ==========================================
// 红线: 活跃性只由类别决定, Online/ReservedOnline 为活跃,
//       Offline/Occupied 为不活跃, 不得引入第三态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapacityKind {
    Online,         // 在线(可排产)
    Offline,        // 离线(停机/休息)
    ReservedOnline, // 预留在线(在线但已被预留)
    Occupied,       // 已占用(被已有工作占用)
}

impl fmt::Display for CapacityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapacityKind::Online => write!(f, "ONLINE"),
            CapacityKind::Offline => write!(f, "OFFLINE"),
            CapacityKind::ReservedOnline => write!(f, "RESERVED_ONLINE"),
            CapacityKind::Occupied => write!(f, "OCCUPIED"),
        }
    }
}

impl CapacityKind {
    /// 活跃性判定: 在线与预留在线视为活跃, 离线与已占用视为不活跃
    pub fn is_active(&self) -> bool {
        matches!(self, CapacityKind::Online | CapacityKind::ReservedOnline)
    }

    /// 同刻合并时的类别优先级, 数值越大越优先
    ///
    /// 全序: Occupied > Offline > ReservedOnline > Online
    pub fn precedence_rank(&self) -> u8 {
        match self {
            CapacityKind::Online => 0,
            CapacityKind::ReservedOnline => 1,
            CapacityKind::Offline => 2,
            CapacityKind::Occupied => 3,
        }
    }

    /// 从字符串解析类别
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ONLINE" => Some(CapacityKind::Online),
            "OFFLINE" => Some(CapacityKind::Offline),
            "RESERVED_ONLINE" => Some(CapacityKind::ReservedOnline),
            "OCCUPIED" => Some(CapacityKind::Occupied),
            _ => None,
        }
    }
}

// ==========================================
// 周期规则类别 (Recurrence Kind)
// ==========================================
// 依据: Timeline_Engine_Specs_v0.5.md - 5.1 周期规则四类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceKind {
    Daily,            // 按日
    Weekly,           // 按周(需要星期掩码)
    MonthlyByDayNumber, // 按月同日
    YearlyByMonthDay, // 按年同月日
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceKind::Daily => write!(f, "DAILY"),
            RecurrenceKind::Weekly => write!(f, "WEEKLY"),
            RecurrenceKind::MonthlyByDayNumber => write!(f, "MONTHLY_BY_DAY_NUMBER"),
            RecurrenceKind::YearlyByMonthDay => write!(f, "YEARLY_BY_MONTH_DAY"),
        }
    }
}

// ==========================================
// 区间来源 (Interval Source)
// ==========================================
// 计划区间来自人工维护或周期展开; 实绩区间由时钟推进
// 将过期展开实例固化而来, 仅保留在保留窗口内
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntervalSource {
    Planned, // 计划
    Actual,  // 实绩(时钟推进固化)
}

impl fmt::Display for IntervalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntervalSource::Planned => write!(f, "PLANNED"),
            IntervalSource::Actual => write!(f, "ACTUAL"),
        }
    }
}
