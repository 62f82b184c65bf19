// ==========================================
// 资源产能日历引擎 - 计划沙盘
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART 4 沙盘与关联
// 红线: 资源与区间的关联必须双向一致, 单边修改
//       一律走 attach/detach
// ==========================================
// 职责: 持有计划时钟、资源集合与产能区间集合
// ==========================================

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CalendarConfig;
use crate::domain::error::{CalendarError, CalendarResult};
use crate::domain::interval::{IntervalId, ResourceId, ScheduledInterval};
use crate::domain::resource::Resource;

// ==========================================
// Scenario - 计划沙盘
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// 计划时钟, 展开视野与实绩窗口的基准点
    pub clock: DateTime<Utc>,
    /// 资源集合
    pub resources: HashMap<ResourceId, Resource>,
    /// 产能区间集合 (单次 + 周期)
    pub intervals: HashMap<IntervalId, ScheduledInterval>,
}

impl Scenario {
    /// 创建空沙盘
    pub fn new(clock: DateTime<Utc>) -> Self {
        Self {
            clock,
            resources: HashMap::new(),
            intervals: HashMap::new(),
        }
    }

    /// 给定配置下的展开视野终点
    pub fn horizon_end(&self, config: &CalendarConfig) -> DateTime<Utc> {
        config.horizon_end(self.clock)
    }

    // ==========================================
    // 资源管理
    // ==========================================

    /// 新建资源并纳入沙盘, 返回资源 ID
    pub fn add_resource(&mut self, name: &str) -> ResourceId {
        let resource = Resource::new(name);
        let resource_id = resource.resource_id.clone();
        self.resources.insert(resource_id.clone(), resource);
        resource_id
    }

    /// 查询资源
    pub fn resource(&self, resource_id: &str) -> Option<&Resource> {
        self.resources.get(resource_id)
    }

    /// 查询资源 (可变)
    pub fn resource_mut(&mut self, resource_id: &str) -> Option<&mut Resource> {
        self.resources.get_mut(resource_id)
    }

    fn require_resource_mut(&mut self, resource_id: &str) -> CalendarResult<&mut Resource> {
        self.resources
            .get_mut(resource_id)
            .ok_or_else(|| CalendarError::NotFound {
                entity: "资源".to_string(),
                id: resource_id.to_string(),
            })
    }

    // ==========================================
    // 区间管理
    // ==========================================

    /// 纳入产能区间
    ///
    /// 构造期校验失败或 ID 重复时拒绝
    pub fn insert_interval(&mut self, interval: ScheduledInterval) -> CalendarResult<()> {
        interval.validate()?;
        let interval_id = interval.interval_id().to_string();
        if self.intervals.contains_key(&interval_id) {
            return Err(CalendarError::InternalInconsistency(format!(
                "区间 ID 重复: {}",
                interval_id
            )));
        }
        self.intervals.insert(interval_id, interval);
        Ok(())
    }

    /// 查询区间
    pub fn interval(&self, interval_id: &str) -> Option<&ScheduledInterval> {
        self.intervals.get(interval_id)
    }

    /// 查询区间 (可变)
    pub fn interval_mut(&mut self, interval_id: &str) -> Option<&mut ScheduledInterval> {
        self.intervals.get_mut(interval_id)
    }

    fn require_interval_mut(&mut self, interval_id: &str) -> CalendarResult<&mut ScheduledInterval> {
        self.intervals
            .get_mut(interval_id)
            .ok_or_else(|| CalendarError::NotFound {
                entity: "产能区间".to_string(),
                id: interval_id.to_string(),
            })
    }

    // ==========================================
    // 双向关联
    // ==========================================

    /// 建立区间与资源的双向关联
    pub fn attach(&mut self, interval_id: &str, resource_id: &str) -> CalendarResult<()> {
        if !self.resources.contains_key(resource_id) {
            return Err(CalendarError::NotFound {
                entity: "资源".to_string(),
                id: resource_id.to_string(),
            });
        }
        let interval = self.require_interval_mut(interval_id)?;
        interval
            .base_mut()
            .resource_ids
            .insert(resource_id.to_string());
        let resource = self.require_resource_mut(resource_id)?;
        resource.interval_ids.insert(interval_id.to_string());
        resource.touch();
        Ok(())
    }

    /// 解除区间与资源的双向关联
    pub fn detach(&mut self, interval_id: &str, resource_id: &str) -> CalendarResult<()> {
        let interval = self.require_interval_mut(interval_id)?;
        interval.base_mut().resource_ids.remove(resource_id);
        let resource = self.require_resource_mut(resource_id)?;
        resource.interval_ids.remove(interval_id);
        resource.touch();
        Ok(())
    }

    /// 摘除产能区间, 同步解除全部资源关联
    ///
    /// 返回被摘除的区间与受影响的资源列表
    pub fn take_interval(
        &mut self,
        interval_id: &str,
    ) -> CalendarResult<(ScheduledInterval, Vec<ResourceId>)> {
        let interval =
            self.intervals
                .remove(interval_id)
                .ok_or_else(|| CalendarError::NotFound {
                    entity: "产能区间".to_string(),
                    id: interval_id.to_string(),
                })?;

        let affected: Vec<ResourceId> = interval.base().resource_ids.iter().cloned().collect();
        for resource_id in &affected {
            if let Some(resource) = self.resources.get_mut(resource_id) {
                resource.interval_ids.remove(interval_id);
                resource.touch();
            }
        }
        Ok((interval, affected))
    }

    /// 某资源关联的全部区间
    pub fn intervals_for_resource(&self, resource_id: &str) -> Vec<&ScheduledInterval> {
        let Some(resource) = self.resources.get(resource_id) else {
            return Vec::new();
        };
        resource
            .interval_ids
            .iter()
            .filter_map(|id| self.intervals.get(id))
            .collect()
    }
}
