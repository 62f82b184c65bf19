// ==========================================
// 资源产能日历引擎 - 产能区间领域模型
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART B3 产能区间与周期规则
// 依据: Timeline_Engine_Specs_v0.5.md - 2. 区间实体 / 5. 周期规则
// ==========================================
// 红线: 单次区间与周期区间是同一实体的两个变体,
//       不做继承层次; 关联关系用双向 id 集合表达

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

use crate::domain::error::{CalendarError, CalendarResult};
use crate::domain::time::TimeInterval;
use crate::domain::types::{CapacityKind, IntervalSource, RecurrenceKind};
use crate::domain::usage::CapacityUsage;

/// 区间 ID (uuid v4 字符串)
pub type IntervalId = String;

/// 资源 ID (uuid v4 字符串)
pub type ResourceId = String;

/// 展望期之外尾段的人数系数: 不设限产能
pub const UNRESTRICTED_NBR_OF_PEOPLE: f64 = f64::MAX;

/// 生成新的区间/资源 ID
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

// ==========================================
// 星期掩码 (Weekday Mask)
// ==========================================
// 位 0 = 周一 ... 位 6 = 周日
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdayMask(pub u8);

impl WeekdayMask {
    /// 由星期列表构造掩码
    pub fn from_weekdays(days: &[Weekday]) -> Self {
        let mut mask = 0u8;
        for d in days {
            mask |= 1 << d.num_days_from_monday();
        }
        WeekdayMask(mask)
    }

    /// 掩码是否为空(未设置任何星期)
    pub fn is_empty(&self) -> bool {
        self.0 & 0x7F == 0
    }

    /// 指定星期是否被设置
    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    /// 本周内的第一个被设置星期(周一起)
    pub fn first_set(&self) -> Option<Weekday> {
        (0..7u8)
            .find(|idx| self.0 & (1 << idx) != 0)
            .map(weekday_from_index)
    }

    /// 严格晚于指定星期的下一个被设置星期(不跨周)
    pub fn next_set_after(&self, day: Weekday) -> Option<Weekday> {
        let from = day.num_days_from_monday() as u8 + 1;
        (from..7u8)
            .find(|idx| self.0 & (1 << idx) != 0)
            .map(weekday_from_index)
    }

    /// 被设置的星期列表(周一起)
    pub fn weekdays(&self) -> Vec<Weekday> {
        (0..7u8)
            .filter(|idx| self.0 & (1 << idx) != 0)
            .map(weekday_from_index)
            .collect()
    }
}

fn weekday_from_index(idx: u8) -> Weekday {
    match idx {
        0 => Weekday::Mon,
        1 => Weekday::Tue,
        2 => Weekday::Wed,
        3 => Weekday::Thu,
        4 => Weekday::Fri,
        5 => Weekday::Sat,
        _ => Weekday::Sun,
    }
}

impl fmt::Display for WeekdayMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = ["MON", "TUE", "WED", "THU", "FRI", "SAT", "SUN"];
        let mut first = true;
        for idx in 0..7u8 {
            if self.0 & (1 << idx) != 0 {
                if !first {
                    write!(f, "|")?;
                }
                write!(f, "{}", names[idx as usize])?;
                first = false;
            }
        }
        if first {
            write!(f, "NONE")?;
        }
        Ok(())
    }
}

// ==========================================
// 周期收尾策略 (Recurrence End Policy)
// ==========================================
// 依据: Timeline_Engine_Specs_v0.5.md - 5.2 三类收尾
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrenceEndPolicy {
    NoEndDate,
    AfterEndDateTime { end_date_time: DateTime<Utc> },
    AfterMaxOccurrences { max_occurrences: u32 },
}

impl fmt::Display for RecurrenceEndPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceEndPolicy::NoEndDate => write!(f, "NO_END_DATE"),
            RecurrenceEndPolicy::AfterEndDateTime { end_date_time } => {
                write!(f, "AFTER_END_DATE_TIME({})", end_date_time)
            }
            RecurrenceEndPolicy::AfterMaxOccurrences { max_occurrences } => {
                write!(f, "AFTER_MAX_OCCURRENCES({})", max_occurrences)
            }
        }
    }
}

// ==========================================
// 周期规则 (Recurrence Rule)
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub kind: RecurrenceKind,        // 周期类别
    pub skip_frequency: u32,         // 跳过频度(0=每期, 1=隔一期)
    pub weekdays: WeekdayMask,       // 星期掩码(仅按周规则使用)
    pub end_policy: RecurrenceEndPolicy, // 收尾策略
}

impl RecurrenceRule {
    /// 校验规则相对锚点窗口是否成立
    ///
    /// # 参数
    /// - `anchor_start`: 锚点窗口开始时刻
    ///
    /// # 返回
    /// 按周规则掩码为空、收尾时刻早于锚点、最大次数为零
    /// 均返回 `CalendarError::InvalidRecurrence`
    pub fn validate(&self, anchor_start: DateTime<Utc>) -> CalendarResult<()> {
        if self.kind == RecurrenceKind::Weekly && self.weekdays.is_empty() {
            return Err(CalendarError::InvalidRecurrence {
                field: "weekdays".to_string(),
                message: "按周规则必须至少设置一个星期".to_string(),
            });
        }
        if let RecurrenceEndPolicy::AfterEndDateTime { end_date_time } = self.end_policy {
            if end_date_time < anchor_start {
                return Err(CalendarError::InvalidRecurrence {
                    field: "end_date_time".to_string(),
                    message: format!(
                        "收尾时刻早于锚点开始 (end_date_time={}, anchor_start={})",
                        end_date_time, anchor_start
                    ),
                });
            }
        }
        if let RecurrenceEndPolicy::AfterMaxOccurrences { max_occurrences } = self.end_policy {
            if max_occurrences == 0 {
                return Err(CalendarError::InvalidRecurrence {
                    field: "max_occurrences".to_string(),
                    message: "最大发生次数必须为正".to_string(),
                });
            }
        }
        Ok(())
    }
}

// ==========================================
// CapacityInterval - 产能区间(单次载荷)
// ==========================================
// 红线: 窗口半开, 人数系数为正, 离线区间开关受限;
//       三条不变量均在构造期同步拒绝
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityInterval {
    // ===== 主键 =====
    pub interval_id: IntervalId,     // 区间ID

    // ===== 载荷 =====
    pub kind: CapacityKind,          // 类别
    pub window: TimeInterval,        // 锚点窗口 [start, end)
    pub nbr_of_people: f64,          // 人数系数(正数, 可为小数)
    pub usage: CapacityUsage,        // 能力开关

    // ===== 标注 =====
    pub display_name: Option<String>, // 显示名
    pub remark: Option<String>,       // 备注
    pub source: IntervalSource,       // 计划/实绩

    // ===== 关联 =====
    pub resource_ids: BTreeSet<ResourceId>, // 关联资源 ID 集合

    // ===== 审计 =====
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CapacityInterval {
    /// 构造产能区间, 执行全部构造期校验
    ///
    /// # 参数
    /// - `kind`: 区间类别
    /// - `window`: 锚点窗口
    /// - `nbr_of_people`: 人数系数
    /// - `usage`: 能力开关
    pub fn new(
        kind: CapacityKind,
        window: TimeInterval,
        nbr_of_people: f64,
        usage: CapacityUsage,
    ) -> CalendarResult<Self> {
        if !(nbr_of_people > 0.0) {
            return Err(CalendarError::InvalidNbrOfPeople(nbr_of_people));
        }
        usage.validate_for_kind(kind)?;
        let now = Utc::now();
        Ok(CapacityInterval {
            interval_id: new_id(),
            kind,
            window,
            nbr_of_people,
            usage,
            display_name: None,
            remark: None,
            source: IntervalSource::Planned,
            resource_ids: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// 重新校验当前字段组合(供存储层落库前使用)
    pub fn validate(&self) -> CalendarResult<()> {
        if self.window.end <= self.window.start {
            return Err(CalendarError::InvalidInterval {
                start: self.window.start,
                end: self.window.end,
            });
        }
        if !(self.nbr_of_people > 0.0) {
            return Err(CalendarError::InvalidNbrOfPeople(self.nbr_of_people));
        }
        self.usage.validate_for_kind(self.kind)
    }

    /// 由周期展开实例固化出实绩区间(时钟推进用)
    ///
    /// 新 ID, 载荷与标注继承定义, 来源置为实绩,
    /// 关联资源与定义一致
    pub fn actualized_from(base: &CapacityInterval, window: TimeInterval) -> Self {
        let now = Utc::now();
        CapacityInterval {
            interval_id: new_id(),
            kind: base.kind,
            window,
            nbr_of_people: base.nbr_of_people,
            usage: base.usage.clone(),
            display_name: base.display_name.clone(),
            remark: base.remark.clone(),
            source: IntervalSource::Actual,
            resource_ids: base.resource_ids.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 更新审计时间戳
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

// ==========================================
// 展开状态 (Expansion State)
// ==========================================
// 未展开 / 已展开二态; 任何规则与锚点变更都回到未展开
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpansionState {
    NotExpanded,
    Expanded { occurrences: Vec<TimeInterval> },
}

impl ExpansionState {
    pub fn is_expanded(&self) -> bool {
        matches!(self, ExpansionState::Expanded { .. })
    }

    /// 展开实例切片, 未展开视为空
    pub fn as_slice(&self) -> &[TimeInterval] {
        match self {
            ExpansionState::NotExpanded => &[],
            ExpansionState::Expanded { occurrences } => occurrences,
        }
    }

    pub fn occurrence_count(&self) -> usize {
        self.as_slice().len()
    }
}

// ==========================================
// RecurringCapacityInterval - 周期性产能区间
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringCapacityInterval {
    pub base: CapacityInterval,      // 锚点载荷(窗口即锚点发生)
    pub rule: RecurrenceRule,        // 周期规则
    pub expansion: ExpansionState,   // 展开状态
}

impl RecurringCapacityInterval {
    /// 构造周期区间, 同步校验载荷与规则
    pub fn new(base: CapacityInterval, rule: RecurrenceRule) -> CalendarResult<Self> {
        rule.validate(base.window.start)?;
        Ok(RecurringCapacityInterval {
            base,
            rule,
            expansion: ExpansionState::NotExpanded,
        })
    }

    /// 展开实例切片(未展开为空)
    pub fn occurrences(&self) -> &[TimeInterval] {
        self.expansion.as_slice()
    }

    /// 写入展开结果
    pub fn set_expansion(&mut self, occurrences: Vec<TimeInterval>) {
        self.expansion = ExpansionState::Expanded { occurrences };
        self.base.touch();
    }

    /// 规则或锚点变更后回到未展开态
    pub fn clear_expansion(&mut self) {
        self.expansion = ExpansionState::NotExpanded;
        self.base.touch();
    }
}

// ==========================================
// ScheduledInterval - 计划区间(变体)
// ==========================================
// 红线: 用带标签变体而非层次继承承载"单次/周期"之分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "interval_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduledInterval {
    Simple(CapacityInterval),
    Recurring(RecurringCapacityInterval),
}

impl ScheduledInterval {
    pub fn interval_id(&self) -> &IntervalId {
        &self.base().interval_id
    }

    /// 共享载荷(锚点)只读访问
    pub fn base(&self) -> &CapacityInterval {
        match self {
            ScheduledInterval::Simple(iv) => iv,
            ScheduledInterval::Recurring(r) => &r.base,
        }
    }

    /// 共享载荷(锚点)可变访问
    pub fn base_mut(&mut self) -> &mut CapacityInterval {
        match self {
            ScheduledInterval::Simple(iv) => iv,
            ScheduledInterval::Recurring(r) => &mut r.base,
        }
    }

    pub fn kind(&self) -> CapacityKind {
        self.base().kind
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, ScheduledInterval::Recurring(_))
    }

    pub fn as_recurring(&self) -> Option<&RecurringCapacityInterval> {
        match self {
            ScheduledInterval::Recurring(r) => Some(r),
            ScheduledInterval::Simple(_) => None,
        }
    }

    pub fn as_recurring_mut(&mut self) -> Option<&mut RecurringCapacityInterval> {
        match self {
            ScheduledInterval::Recurring(r) => Some(r),
            ScheduledInterval::Simple(_) => None,
        }
    }

    /// 校验载荷与(若有)规则
    pub fn validate(&self) -> CalendarResult<()> {
        self.base().validate()?;
        if let ScheduledInterval::Recurring(r) = self {
            r.rule.validate(r.base.window.start)?;
        }
        Ok(())
    }

    /// 投影为资源产能单元
    ///
    /// 单次区间投影为锚点窗口一个单元; 周期区间按展开
    /// 实例逐一投影, 未展开投影为空
    pub fn project_units(&self) -> Vec<ResourceCapacityInterval> {
        match self {
            ScheduledInterval::Simple(iv) => {
                vec![ResourceCapacityInterval::from_source(iv, iv.window)]
            }
            ScheduledInterval::Recurring(r) => r
                .occurrences()
                .iter()
                .map(|w| ResourceCapacityInterval::from_source(&r.base, *w))
                .collect(),
        }
    }
}

// ==========================================
// ResourceCapacityInterval - 资源产能单元
// ==========================================
// 剖面与原始集合中的扁平单元; 合成段与多源合并段
// 不携带来源区间 ID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCapacityInterval {
    pub source_interval_id: Option<IntervalId>, // 来源区间(合成段为 None)
    pub kind: CapacityKind,                     // 类别
    pub window: TimeInterval,                   // 窗口 [start, end)
    pub nbr_of_people: f64,                     // 人数系数
    pub usage: CapacityUsage,                   // 能力开关
}

impl ResourceCapacityInterval {
    /// 由产能区间载荷投影一个单元
    pub fn from_source(source: &CapacityInterval, window: TimeInterval) -> Self {
        ResourceCapacityInterval {
            source_interval_id: Some(source.interval_id.clone()),
            kind: source.kind,
            window,
            nbr_of_people: source.nbr_of_people,
            usage: source.usage.clone(),
        }
    }

    /// 合成段(前导离线/缺口填充/尾段)构造
    pub fn synthetic(
        kind: CapacityKind,
        window: TimeInterval,
        nbr_of_people: f64,
        usage: CapacityUsage,
    ) -> Self {
        ResourceCapacityInterval {
            source_interval_id: None,
            kind,
            window,
            nbr_of_people,
            usage,
        }
    }

    pub fn is_active(&self) -> bool {
        self.kind.is_active()
    }

    /// 截取本单元窗口与给定窗口的交集部分, 载荷不变
    pub fn clipped_to(&self, window: &TimeInterval) -> Option<ResourceCapacityInterval> {
        self.window.intersection(window).map(|w| {
            let mut unit = self.clone();
            unit.window = w;
            unit
        })
    }
}
