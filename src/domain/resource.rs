// ==========================================
// 资源产能日历引擎 - 资源领域模型
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART B4 资源与剖面
// 依据: Timeline_Engine_Specs_v0.5.md - 2.3 资源持有双集合
// ==========================================
// 红线: 剖面替换必须整体交换, 不做原位增量修补

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::collection::ResourceCapacityIntervalsCollection;
use crate::domain::interval::{new_id, IntervalId, ResourceId};

// ==========================================
// ResourceCapacityProfile - 资源产能剖面
// ==========================================
// raw: 关联区间/展开实例的扁平投影(允许重叠)
// profile: 重建后的无缝隙无重叠时间线
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceCapacityProfile {
    raw: ResourceCapacityIntervalsCollection,
    profile: ResourceCapacityIntervalsCollection,
}

impl ResourceCapacityProfile {
    pub fn new() -> Self {
        ResourceCapacityProfile::default()
    }

    pub fn raw(&self) -> &ResourceCapacityIntervalsCollection {
        &self.raw
    }

    pub fn profile(&self) -> &ResourceCapacityIntervalsCollection {
        &self.profile
    }

    /// 整体替换原始集合
    pub fn replace_raw(&mut self, raw: ResourceCapacityIntervalsCollection) {
        self.raw = raw;
    }

    /// 整体交换剖面
    ///
    /// # 返回
    /// 新旧剖面是否不同(供变更上报使用)
    pub fn replace_profile(&mut self, profile: ResourceCapacityIntervalsCollection) -> bool {
        let changed = self.profile != profile;
        self.profile = profile;
        changed
    }
}

// ==========================================
// Resource - 可排产资源
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    // ===== 主键 =====
    pub resource_id: ResourceId,   // 资源ID
    pub name: String,              // 资源名(机组/班组)

    // ===== 关联 =====
    pub interval_ids: BTreeSet<IntervalId>, // 关联产能区间 ID 集合

    // ===== 产能剖面 =====
    pub profile: ResourceCapacityProfile,

    // ===== 审计 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Resource {
            resource_id: new_id(),
            name: name.to_string(),
            interval_ids: BTreeSet::new(),
            profile: ResourceCapacityProfile::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
