// ==========================================
// 资源产能日历引擎 - 引擎编排器
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART 1 计算主流程
// 用途: 协调展开/轮廓/剥离三大核心引擎的执行顺序
// ==========================================

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::CalendarConfig;
use crate::domain::collection::ResourceCapacityIntervalsCollection;
use crate::domain::error::{CalendarError, CalendarResult};
use crate::domain::interval::{
    CapacityInterval, IntervalId, ResourceId, ScheduledInterval,
};
use crate::domain::time::TimeInterval;
use crate::engine::break_off::{BreakOffEngine, BreakOffOverrides};
use crate::engine::events::{CalendarEvent, CalendarEventType, OptionalEventPublisher};
use crate::engine::profile::ProfileEngine;
use crate::engine::recurrence::RecurrenceEngine;
use crate::perf::PerfGuard;
use crate::scenario::Scenario;

// ==========================================
// 操作结果上报
// ==========================================

/// 单资源轮廓重建结果
#[derive(Debug, Clone, Serialize)]
pub struct ProfileRefreshReport {
    pub resource_id: ResourceId,
    /// 补齐的周期展开数量
    pub expansions_rebuilt: usize,
    /// 参与重建的原始产能单元数量
    pub raw_units: usize,
    /// 重建后的轮廓分段数量
    pub profile_segments: usize,
    /// 轮廓相对上一版是否发生变化
    pub changed: bool,
    pub elapsed_ms: u64,
}

/// 单区间刷新结果
#[derive(Debug, Clone, Serialize)]
pub struct IntervalRefreshReport {
    pub interval_id: IntervalId,
    /// 周期区间刷新后的发生数 (单次区间为 None)
    pub occurrence_count: Option<usize>,
    pub resources_refreshed: Vec<ProfileRefreshReport>,
    pub elapsed_ms: u64,
}

/// 区间移除结果
#[derive(Debug, Clone, Serialize)]
pub struct IntervalRemovalReport {
    pub interval_id: IntervalId,
    /// 历史清理模式 (未触发轮廓重建)
    pub purged: bool,
    pub resources_refreshed: Vec<ProfileRefreshReport>,
    pub elapsed_ms: u64,
}

/// 时钟推进结果
#[derive(Debug, Clone, Serialize)]
pub struct ClockAdvanceReport {
    pub old_clock: DateTime<Utc>,
    pub new_clock: DateTime<Utc>,
    /// 固化为实绩区间的过期发生数
    pub actualized: usize,
    /// 早于保留窗口被直接清除的过期发生数
    pub purged: usize,
    /// 处置后已耗尽而被整体删除的周期区间数
    pub series_removed: usize,
    pub resources_refreshed: Vec<ProfileRefreshReport>,
    pub elapsed_ms: u64,
}

/// 周期剥离结果
#[derive(Debug, Clone, Serialize)]
pub struct BreakOffReport {
    pub interval_id: IntervalId,
    /// 原序列是否被整体删除 (唯一发生剥离)
    pub series_removed: bool,
    /// 中间剥离时新建的前段序列 ID
    pub detached_prior_id: Option<IntervalId>,
    /// 承载剥离发生的独立区间 ID
    pub override_interval_id: IntervalId,
    pub resources_refreshed: Vec<ProfileRefreshReport>,
    pub elapsed_ms: u64,
}

// ==========================================
// CalendarOrchestrator - 引擎编排器
// ==========================================

pub struct CalendarOrchestrator {
    config: CalendarConfig,
    profile: ProfileEngine,
    recurrence: RecurrenceEngine,
    break_off: BreakOffEngine,
    events: OptionalEventPublisher,
}

impl CalendarOrchestrator {
    /// 创建新的编排器实例 (无事件发布)
    pub fn new(config: CalendarConfig) -> Self {
        Self {
            config,
            profile: ProfileEngine::new(),
            recurrence: RecurrenceEngine::new(),
            break_off: BreakOffEngine::new(),
            events: OptionalEventPublisher::none(),
        }
    }

    /// 创建带事件发布者的编排器实例
    pub fn with_publisher(config: CalendarConfig, events: OptionalEventPublisher) -> Self {
        Self {
            config,
            profile: ProfileEngine::new(),
            recurrence: RecurrenceEngine::new(),
            break_off: BreakOffEngine::new(),
            events,
        }
    }

    pub fn config(&self) -> &CalendarConfig {
        &self.config
    }

    // ==========================================
    // 轮廓重建
    // ==========================================

    /// 重建单资源的产能轮廓
    ///
    /// # 流程
    /// 1. 补齐关联周期区间的展开
    /// 2. 汇总原始产能单元
    /// 3. 重建轮廓并写回
    pub fn refresh_resource(
        &self,
        scenario: &mut Scenario,
        resource_id: &str,
    ) -> CalendarResult<ProfileRefreshReport> {
        let perf = PerfGuard::new("refresh_resource");
        let report = self.refresh_resource_inner(scenario, resource_id, &perf)?;

        self.publish(CalendarEvent::scoped(
            CalendarEventType::ProfileRegenerated,
            Some("CalendarOrchestrator".to_string()),
            Some(vec![resource_id.to_string()]),
            None,
        ));
        Ok(report)
    }

    fn refresh_resource_inner(
        &self,
        scenario: &mut Scenario,
        resource_id: &str,
        perf: &PerfGuard,
    ) -> CalendarResult<ProfileRefreshReport> {
        if !scenario.resources.contains_key(resource_id) {
            return Err(CalendarError::NotFound {
                entity: "资源".to_string(),
                id: resource_id.to_string(),
            });
        }

        info!(resource_id, "开始重建资源产能轮廓");

        // ==========================================
        // 步骤1: 补齐周期展开
        // ==========================================
        debug!("步骤1: 补齐周期展开");

        let linked_ids: Vec<IntervalId> = scenario
            .resources
            .get(resource_id)
            .map(|r| r.interval_ids.iter().cloned().collect())
            .unwrap_or_default();

        let mut expansions_rebuilt = 0;
        for interval_id in &linked_ids {
            if self.ensure_expanded(scenario, interval_id, false)? {
                expansions_rebuilt += 1;
            }
        }

        // ==========================================
        // 步骤2: 汇总原始产能单元
        // ==========================================
        debug!("步骤2: 汇总原始产能单元");

        let mut raw_units = Vec::new();
        for interval_id in &linked_ids {
            if let Some(interval) = scenario.interval(interval_id) {
                raw_units.extend(interval.project_units());
            }
        }

        // ==========================================
        // 步骤3: 重建产能轮廓
        // ==========================================
        debug!(raw_units = raw_units.len(), "步骤3: 重建产能轮廓");

        let horizon_end = scenario.horizon_end(&self.config);
        let segments = self.profile.regenerate(&raw_units, horizon_end)?;
        let profile_segments = segments.len();

        // ==========================================
        // 步骤4: 写回资源
        // ==========================================
        let resource = scenario
            .resource_mut(resource_id)
            .ok_or_else(|| CalendarError::NotFound {
                entity: "资源".to_string(),
                id: resource_id.to_string(),
            })?;
        resource
            .profile
            .replace_raw(ResourceCapacityIntervalsCollection::from_unsorted(
                raw_units.clone(),
            ));
        let changed = resource
            .profile
            .replace_profile(ResourceCapacityIntervalsCollection::from_unsorted(segments));
        resource.touch();

        info!(
            resource_id,
            raw_units = raw_units.len(),
            profile_segments,
            changed,
            "资源产能轮廓重建完成"
        );

        Ok(ProfileRefreshReport {
            resource_id: resource_id.to_string(),
            expansions_rebuilt,
            raw_units: raw_units.len(),
            profile_segments,
            changed,
            elapsed_ms: perf.elapsed_ms(),
        })
    }

    /// 刷新单个产能区间并重建其关联资源的轮廓
    ///
    /// 周期区间会强制重新展开 (规则/锚点变更后调用)
    pub fn refresh_interval(
        &self,
        scenario: &mut Scenario,
        interval_id: &str,
    ) -> CalendarResult<IntervalRefreshReport> {
        let perf = PerfGuard::new("refresh_interval");

        // ==========================================
        // 步骤1: 强制重展开
        // ==========================================
        debug!(interval_id, "步骤1: 强制重展开");

        self.ensure_expanded(scenario, interval_id, true)?;
        let interval = scenario
            .interval(interval_id)
            .ok_or_else(|| CalendarError::NotFound {
                entity: "产能区间".to_string(),
                id: interval_id.to_string(),
            })?;
        let occurrence_count = interval
            .as_recurring()
            .map(|r| r.occurrences().len());
        let affected: Vec<ResourceId> = interval.base().resource_ids.iter().cloned().collect();

        // ==========================================
        // 步骤2: 重建关联资源轮廓
        // ==========================================
        debug!(affected = affected.len(), "步骤2: 重建关联资源轮廓");

        let resources_refreshed = self.refresh_resources(scenario, &affected, &perf)?;

        self.publish(CalendarEvent::scoped(
            CalendarEventType::ExpansionsRebuilt,
            Some("CalendarOrchestrator".to_string()),
            Some(affected),
            None,
        ));

        Ok(IntervalRefreshReport {
            interval_id: interval_id.to_string(),
            occurrence_count,
            resources_refreshed,
            elapsed_ms: perf.elapsed_ms(),
        })
    }

    /// 移除产能区间, 同步解除关联并重建受影响资源的轮廓
    ///
    /// `purge` 用于清理已成历史的过去区间: 仍摘除并解除
    /// 关联, 但跳过轮廓重建(过去区间的移除不影响未来产能)
    pub fn remove_interval(
        &self,
        scenario: &mut Scenario,
        interval_id: &str,
        purge: bool,
    ) -> CalendarResult<IntervalRemovalReport> {
        let perf = PerfGuard::new("remove_interval");

        // ==========================================
        // 步骤1: 摘除区间
        // ==========================================
        debug!(interval_id, purge, "步骤1: 摘除区间");

        let (_removed, affected) = scenario.take_interval(interval_id)?;

        // ==========================================
        // 步骤2: 重建受影响资源轮廓 (历史清理跳过)
        // ==========================================
        let resources_refreshed = if purge {
            debug!("步骤2: 历史清理, 跳过轮廓重建");
            Vec::new()
        } else {
            debug!(affected = affected.len(), "步骤2: 重建受影响资源轮廓");
            self.refresh_resources(scenario, &affected, &perf)?
        };

        self.publish(CalendarEvent::scoped(
            CalendarEventType::IntervalRemoved,
            Some("CalendarOrchestrator".to_string()),
            Some(affected),
            None,
        ));

        info!(interval_id, purge, "产能区间移除完成");
        Ok(IntervalRemovalReport {
            interval_id: interval_id.to_string(),
            purged: purge,
            resources_refreshed,
            elapsed_ms: perf.elapsed_ms(),
        })
    }

    // ==========================================
    // 时钟推进
    // ==========================================

    /// 推进计划时钟
    ///
    /// # 流程
    /// 1. 过期发生处置: 保留窗口内固化为实绩区间, 窗口外清除
    /// 2. 处置后已耗尽的周期区间整体删除
    /// 3. 其余周期区间回到未展开态
    /// 4. 以新时钟重建全部资源轮廓
    ///
    /// # 红线
    /// 时钟只能向前推进
    pub fn advance_clock(
        &self,
        scenario: &mut Scenario,
        new_clock: DateTime<Utc>,
    ) -> CalendarResult<ClockAdvanceReport> {
        let perf = PerfGuard::new("advance_clock");

        if new_clock < scenario.clock {
            return Err(CalendarError::ClockRegression {
                current: scenario.clock,
                requested: new_clock,
            });
        }
        let old_clock = scenario.clock;
        let retention = self.config.retention_window();

        info!(%old_clock, %new_clock, "开始推进计划时钟");

        // ==========================================
        // 步骤1: 过期发生处置
        // ==========================================
        debug!("步骤1: 过期发生处置");

        let recurring_ids: Vec<IntervalId> = scenario
            .intervals
            .iter()
            .filter(|(_, iv)| iv.is_recurring())
            .map(|(id, _)| id.clone())
            .collect();

        let mut actualized = 0;
        let mut purged = 0;
        let mut pending_actuals: Vec<CapacityInterval> = Vec::new();

        for interval_id in &recurring_ids {
            let Some(recurring) = scenario
                .interval(interval_id)
                .and_then(|iv| iv.as_recurring())
            else {
                continue;
            };
            if !recurring.expansion.is_expanded() {
                continue;
            }
            let split = self
                .recurrence
                .collect_expired(recurring.occurrences(), new_clock, retention);
            purged += split.purged;
            for window in &split.to_actualize {
                pending_actuals.push(CapacityInterval::actualized_from(&recurring.base, *window));
            }
        }

        for actual in pending_actuals {
            let links: Vec<ResourceId> = actual.resource_ids.iter().cloned().collect();
            let actual_id = actual.interval_id.clone();
            scenario.insert_interval(ScheduledInterval::Simple(actual))?;
            for resource_id in &links {
                scenario.attach(&actual_id, resource_id)?;
            }
            actualized += 1;
        }

        // ==========================================
        // 步骤2: 删除已耗尽的周期区间
        // ==========================================
        debug!("步骤2: 删除已耗尽的周期区间");

        let mut series_removed = 0;
        for interval_id in &recurring_ids {
            let Some(recurring) = scenario
                .interval(interval_id)
                .and_then(|iv| iv.as_recurring())
            else {
                continue;
            };
            if self.recurrence.series_exhausted(
                &recurring.base.window,
                &recurring.rule,
                new_clock,
            )? {
                scenario.take_interval(interval_id)?;
                series_removed += 1;
                info!(%interval_id, "周期区间发生已全部过期, 整体删除");
            }
        }

        // ==========================================
        // 步骤3: 其余周期区间回到未展开态
        // ==========================================
        debug!("步骤3: 其余周期区间回到未展开态");

        scenario.clock = new_clock;
        for interval_id in &recurring_ids {
            if let Some(recurring) = scenario
                .interval_mut(interval_id)
                .and_then(|iv| iv.as_recurring_mut())
            {
                recurring.clear_expansion();
            }
        }

        // ==========================================
        // 步骤4: 全量重建资源轮廓
        // ==========================================
        debug!("步骤4: 全量重建资源轮廓");

        let all_resources: Vec<ResourceId> = scenario.resources.keys().cloned().collect();
        let resources_refreshed = self.refresh_resources(scenario, &all_resources, &perf)?;

        self.publish(CalendarEvent::full_scope(
            CalendarEventType::ClockAdvanced,
            Some("CalendarOrchestrator".to_string()),
        ));

        info!(actualized, purged, series_removed, "计划时钟推进完成");
        Ok(ClockAdvanceReport {
            old_clock,
            new_clock,
            actualized,
            purged,
            series_removed,
            resources_refreshed,
            elapsed_ms: perf.elapsed_ms(),
        })
    }

    // ==========================================
    // 周期剥离
    // ==========================================

    /// 对周期区间执行单次剥离
    ///
    /// # 流程
    /// 1. 确保序列已展开, 执行剥离判定
    /// 2. 沙盘改写: 摘除原序列, 纳入剥离产物并恢复资源关联
    /// 3. 重建受影响资源的轮廓
    pub fn apply_break_off(
        &self,
        scenario: &mut Scenario,
        interval_id: &str,
        target: &TimeInterval,
        overrides: &BreakOffOverrides,
    ) -> CalendarResult<BreakOffReport> {
        let perf = PerfGuard::new("apply_break_off");

        // ==========================================
        // 步骤1: 剥离判定
        // ==========================================
        debug!(interval_id, target = %target, "步骤1: 剥离判定");

        self.ensure_expanded(scenario, interval_id, false)?;
        let interval = scenario
            .interval(interval_id)
            .ok_or_else(|| CalendarError::NotFound {
                entity: "产能区间".to_string(),
                id: interval_id.to_string(),
            })?;
        let recurring = interval
            .as_recurring()
            .ok_or_else(|| CalendarError::InvalidRecurrence {
                field: "interval_type".to_string(),
                message: format!("单次区间不可剥离: {}", interval_id),
            })?;

        let outcome = self.break_off.break_off(recurring, target, overrides)?;
        let series_removed = outcome.updated.is_none();
        let detached_prior_id = outcome
            .detached_prior
            .as_ref()
            .map(|p| p.base.interval_id.clone());
        let override_interval_id = outcome.override_interval.interval_id.clone();

        // ==========================================
        // 步骤2: 沙盘改写
        // ==========================================
        debug!("步骤2: 沙盘改写");

        let (_original, affected) = scenario.take_interval(interval_id)?;
        let links: BTreeSet<ResourceId> = affected.iter().cloned().collect();

        if let Some(updated) = outcome.updated {
            let id = updated.base.interval_id.clone();
            scenario.insert_interval(ScheduledInterval::Recurring(updated))?;
            for resource_id in &links {
                scenario.attach(&id, resource_id)?;
            }
        }
        if let Some(prior) = outcome.detached_prior {
            let id = prior.base.interval_id.clone();
            scenario.insert_interval(ScheduledInterval::Recurring(prior))?;
            for resource_id in &links {
                scenario.attach(&id, resource_id)?;
            }
        }
        scenario.insert_interval(ScheduledInterval::Simple(outcome.override_interval))?;
        for resource_id in &links {
            scenario.attach(&override_interval_id, resource_id)?;
        }

        // ==========================================
        // 步骤3: 重建受影响资源轮廓
        // ==========================================
        debug!(affected = affected.len(), "步骤3: 重建受影响资源轮廓");

        let resources_refreshed = self.refresh_resources(scenario, &affected, &perf)?;

        self.publish(CalendarEvent::scoped(
            CalendarEventType::SeriesBrokenOff,
            Some("CalendarOrchestrator".to_string()),
            Some(affected),
            Some((target.start, target.end)),
        ));

        info!(
            interval_id,
            series_removed,
            override_interval_id = %override_interval_id,
            "周期剥离完成"
        );
        Ok(BreakOffReport {
            interval_id: interval_id.to_string(),
            series_removed,
            detached_prior_id,
            override_interval_id,
            resources_refreshed,
            elapsed_ms: perf.elapsed_ms(),
        })
    }

    // ==========================================
    // 内部工具
    // ==========================================

    /// 确保周期区间处于已展开态
    ///
    /// # 返回
    /// 本次是否执行了展开 (单次区间恒为 false)
    fn ensure_expanded(
        &self,
        scenario: &mut Scenario,
        interval_id: &str,
        force: bool,
    ) -> CalendarResult<bool> {
        let clock = scenario.clock;
        let horizon_end = scenario.horizon_end(&self.config);

        let interval = scenario
            .interval_mut(interval_id)
            .ok_or_else(|| CalendarError::NotFound {
                entity: "产能区间".to_string(),
                id: interval_id.to_string(),
            })?;
        let Some(recurring) = interval.as_recurring_mut() else {
            return Ok(false);
        };
        if recurring.expansion.is_expanded() && !force {
            return Ok(false);
        }

        let occurrences =
            self.recurrence
                .expand(&recurring.base.window, &recurring.rule, clock, horizon_end)?;
        recurring.set_expansion(occurrences);
        Ok(true)
    }

    fn refresh_resources(
        &self,
        scenario: &mut Scenario,
        resource_ids: &[ResourceId],
        perf: &PerfGuard,
    ) -> CalendarResult<Vec<ProfileRefreshReport>> {
        let mut reports = Vec::with_capacity(resource_ids.len());
        for resource_id in resource_ids {
            reports.push(self.refresh_resource_inner(scenario, resource_id, perf)?);
        }
        Ok(reports)
    }

    fn publish(&self, event: CalendarEvent) {
        if let Err(e) = self.events.publish(event) {
            tracing::warn!("事件发布失败: {}", e);
        }
    }
}
