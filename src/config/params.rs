// ==========================================
// 资源产能日历引擎 - 运行参数
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART 5 配置项
// ==========================================
// 职责: 日历引擎运行参数的定义与加载
// 存储: JSON 文件 (部署目录下 calendar_config.json)
// ==========================================

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::error::CalendarResult;

/// 日历引擎运行参数
///
/// 所有字段带默认值，配置文件可只覆写关心的键
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// 计划展开视野（天），周期区间只展开到 clock + 视野
    #[serde(default = "default_planning_horizon_days")]
    pub planning_horizon_days: i64,

    /// 实绩保留窗口（天），时钟推进时早于窗口的过期发生直接清除
    #[serde(default = "default_actual_retention_days")]
    pub actual_retention_days: i64,
}

fn default_planning_horizon_days() -> i64 {
    90
}

fn default_actual_retention_days() -> i64 {
    30
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            planning_horizon_days: default_planning_horizon_days(),
            actual_retention_days: default_actual_retention_days(),
        }
    }
}

impl CalendarConfig {
    /// 从 JSON 字符串加载配置
    pub fn from_json_str(raw: &str) -> CalendarResult<Self> {
        let config: CalendarConfig =
            serde_json::from_str(raw).context("配置 JSON 解析失败")?;
        Ok(config)
    }

    /// 从 JSON 文件加载配置
    ///
    /// 文件不存在时返回默认配置
    pub fn from_json_file(path: &Path) -> CalendarResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "配置文件不存在, 使用默认配置");
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("配置文件读取失败: {}", path.display()))?;
        Self::from_json_str(&raw)
    }

    /// 给定时钟下的展开视野终点
    pub fn horizon_end(&self, clock: DateTime<Utc>) -> DateTime<Utc> {
        clock + Duration::days(self.planning_horizon_days)
    }

    /// 实绩保留窗口时长
    pub fn retention_window(&self) -> Duration {
        Duration::days(self.actual_retention_days)
    }
}
