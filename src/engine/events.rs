// ==========================================
// 资源产能日历引擎 - 引擎层事件发布
// ==========================================
// 职责: 定义日历事件发布 trait，实现依赖倒置
// 说明: Engine 层定义 trait，下游编排/通知层实现适配器
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

use crate::domain::interval::ResourceId;

// ==========================================
// 日历事件类型
// ==========================================

/// 日历事件触发类型
///
/// Engine 层定义的事件类型，用于通知下游系统
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalendarEventType {
    /// 产能轮廓重建
    ProfileRegenerated,
    /// 周期展开重建
    ExpansionsRebuilt,
    /// 产能区间移除
    IntervalRemoved,
    /// 计划时钟推进
    ClockAdvanced,
    /// 周期序列剥离
    SeriesBrokenOff,
}

impl CalendarEventType {
    /// 转换为字符串标识
    pub fn as_str(&self) -> &str {
        match self {
            CalendarEventType::ProfileRegenerated => "ProfileRegenerated",
            CalendarEventType::ExpansionsRebuilt => "ExpansionsRebuilt",
            CalendarEventType::IntervalRemoved => "IntervalRemoved",
            CalendarEventType::ClockAdvanced => "ClockAdvanced",
            CalendarEventType::SeriesBrokenOff => "SeriesBrokenOff",
        }
    }
}

/// 日历事件
///
/// Engine 层发布的事件，包含触发类型和影响范围
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
    /// 事件类型
    pub event_type: CalendarEventType,
    /// 事件来源描述
    pub source: Option<String>,
    /// 受影响的资源列表（None 表示全部）
    pub affected_resources: Option<Vec<ResourceId>>,
    /// 受影响的时间范围
    pub affected_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// 是否需要全量处理
    pub is_full_scope: bool,
}

impl CalendarEvent {
    /// 创建全量事件
    pub fn full_scope(event_type: CalendarEventType, source: Option<String>) -> Self {
        Self {
            event_type,
            source,
            affected_resources: None,
            affected_range: None,
            is_full_scope: true,
        }
    }

    /// 创建增量事件
    pub fn scoped(
        event_type: CalendarEventType,
        source: Option<String>,
        resources: Option<Vec<ResourceId>>,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Self {
        Self {
            event_type,
            source,
            affected_resources: resources,
            affected_range: range,
            is_full_scope: false,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 日历事件发布者 Trait
///
/// Engine 层定义，下游编排/通知层实现
/// 通过 trait 实现依赖倒置，解除 Engine 对下游的直接依赖
pub trait CalendarEventPublisher: Send + Sync {
    /// 发布日历事件
    ///
    /// # 参数
    /// - `event`: 日历事件
    ///
    /// # 返回
    /// - `Ok(task_id)`: 任务 ID（如果支持）或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: CalendarEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者
///
/// 用于不需要事件发布的场景（如单元测试）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl CalendarEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: CalendarEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - event_type={}",
            event.event_type.as_str()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
///
/// 简化 Option<Arc<dyn CalendarEventPublisher>> 的使用
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn CalendarEventPublisher>>,
}

impl OptionalEventPublisher {
    /// 创建带发布者的实例
    pub fn with_publisher(publisher: Arc<dyn CalendarEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    /// 创建空实例（不发布事件）
    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: CalendarEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - event_type={}",
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }

    /// 检查是否配置了发布者
    pub fn is_configured(&self) -> bool {
        self.inner.is_some()
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
