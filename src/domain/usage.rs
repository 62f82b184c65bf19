// ==========================================
// 资源产能日历引擎 - 能力开关 (Capacity Usage)
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART B2 能力开关全集
// 依据: Timeline_Engine_Specs_v0.5.md - 1.2 离线区间开关约束
// ==========================================
// 红线: 离线区间不得开启任何作业能力开关, 构造期同步拒绝

use serde::{Deserialize, Serialize};

use crate::domain::error::{CalendarError, CalendarResult};
use crate::domain::types::CapacityKind;

// ==========================================
// 能力开关 (Capacity Usage)
// ==========================================
// 描述一段产能窗口允许承接哪些作业环节, 以及
// 产能代码分区(非空代码工作只能使用同码窗口)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityUsage {
    pub can_clear_changeover: bool,      // 可清除换型状态
    pub prevents_operation_spanning: bool, // 禁止工序跨越本窗口
    pub can_start_activity: bool,        // 可在本窗口内开工
    pub used_for_setup: bool,            // 可用于装夹/换型
    pub used_for_run: bool,              // 可用于加工
    pub used_for_post_processing: bool,  // 可用于后处理
    pub used_for_cleanout: bool,         // 可用于清机
    pub used_for_storage: bool,          // 可用于存放
    pub overtime: bool,                  // 加班窗口
    pub use_only_when_late: bool,        // 仅拖期时启用
    pub capacity_code: Option<String>,   // 产能代码(分区标签)
}

impl Default for CapacityUsage {
    /// 默认为不受限的在线窗口: 各作业环节均可用, 非加班
    fn default() -> Self {
        CapacityUsage {
            can_clear_changeover: true,
            prevents_operation_spanning: false,
            can_start_activity: true,
            used_for_setup: true,
            used_for_run: true,
            used_for_post_processing: true,
            used_for_cleanout: true,
            used_for_storage: true,
            overtime: false,
            use_only_when_late: false,
            capacity_code: None,
        }
    }
}

impl CapacityUsage {
    /// 离线窗口开关组合: 全部作业能力关闭
    pub fn offline() -> Self {
        CapacityUsage {
            can_clear_changeover: false,
            prevents_operation_spanning: false,
            can_start_activity: false,
            used_for_setup: false,
            used_for_run: false,
            used_for_post_processing: false,
            used_for_cleanout: false,
            used_for_storage: false,
            overtime: false,
            use_only_when_late: false,
            capacity_code: None,
        }
    }

    /// 展望期之外的不设限窗口开关组合
    pub fn unrestricted() -> Self {
        CapacityUsage::default()
    }

    /// 校验开关组合与区间类别是否相容
    ///
    /// # 参数
    /// - `kind`: 区间类别
    ///
    /// # 返回
    /// 离线区间若开启任一作业能力开关, 返回
    /// `CalendarError::OfflineUsageConflict` 并指明开关名
    pub fn validate_for_kind(&self, kind: CapacityKind) -> CalendarResult<()> {
        if kind != CapacityKind::Offline {
            return Ok(());
        }
        let forbidden: [(&str, bool); 8] = [
            ("overtime", self.overtime),
            ("can_start_activity", self.can_start_activity),
            ("use_only_when_late", self.use_only_when_late),
            ("used_for_setup", self.used_for_setup),
            ("used_for_run", self.used_for_run),
            ("used_for_post_processing", self.used_for_post_processing),
            ("used_for_cleanout", self.used_for_cleanout),
            ("used_for_storage", self.used_for_storage),
        ];
        for (flag, on) in forbidden {
            if on {
                return Err(CalendarError::OfflineUsageConflict {
                    flag: flag.to_string(),
                });
            }
        }
        Ok(())
    }

    /// 产能代码分区判定
    ///
    /// 空代码工作可使用任意窗口; 非空代码工作只能使用
    /// 同码窗口(空白与两端空格视为无代码)
    pub fn accepts_work_code(&self, work_code: Option<&str>) -> bool {
        match normalize_code(work_code) {
            None => true,
            Some(code) => normalize_code(self.capacity_code.as_deref()) == Some(code),
        }
    }
}

fn normalize_code(code: Option<&str>) -> Option<&str> {
    match code {
        Some(c) => {
            let trimmed = c.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        None => None,
    }
}
