// ==========================================
// 资源产能日历引擎 - 资源产能单元集合
// ==========================================
// 依据: Calendar_Dev_Master_Spec.md - PART C3 集合查询面
// 依据: Timeline_Engine_Specs_v0.5.md - 3. 有序集合与查询
// ==========================================
// 红线: 集合按开始时刻有序(同刻按插入序), 原始集合
//       允许重叠, 剖面集合不重叠不留缝

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::interval::ResourceCapacityInterval;
use crate::domain::time::TimeInterval;

/// 小集合线性扫描上限: 不超过该规模时 FindIdx 直接线扫
pub const SMALL_COLLECTION_LINEAR_SCAN_MAX: usize = 4;

// ==========================================
// ResourceCapacityIntervalsCollection
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceCapacityIntervalsCollection {
    units: Vec<ResourceCapacityInterval>,
}

impl ResourceCapacityIntervalsCollection {
    pub fn new() -> Self {
        ResourceCapacityIntervalsCollection { units: Vec::new() }
    }

    /// 由无序单元列表构造, 按开始时刻稳定排序
    /// (同刻保持输入顺序)
    pub fn from_unsorted(mut units: Vec<ResourceCapacityInterval>) -> Self {
        units.sort_by_key(|u| u.window.start);
        ResourceCapacityIntervalsCollection { units }
    }

    /// 保序插入: 插到同开始时刻一组的末尾
    pub fn push_sorted(&mut self, unit: ResourceCapacityInterval) {
        let pos = self
            .units
            .partition_point(|u| u.window.start <= unit.window.start);
        self.units.insert(pos, unit);
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ResourceCapacityInterval> {
        self.units.get(idx)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceCapacityInterval> {
        self.units.iter()
    }

    pub fn as_slice(&self) -> &[ResourceCapacityInterval] {
        &self.units
    }

    /// 查找覆盖指定时刻的单元下标
    ///
    /// 小集合(不超过 4 个)线性扫描; 否则按开始时刻二分,
    /// 取最后一个 start <= t 的单元验证覆盖
    ///
    /// # 返回
    /// 未覆盖返回 None, 不返回插入点
    pub fn find_idx(&self, t: DateTime<Utc>) -> Option<usize> {
        if self.units.len() <= SMALL_COLLECTION_LINEAR_SCAN_MAX {
            return self.units.iter().position(|u| u.window.contains(t));
        }
        let upper = self.units.partition_point(|u| u.window.start <= t);
        if upper == 0 {
            return None;
        }
        let idx = upper - 1;
        if self.units[idx].window.contains(t) {
            Some(idx)
        } else {
            None
        }
    }

    /// 自前向后找第一个在 t 之后仍有活跃覆盖的单元
    /// (进行中的活跃单元也算)
    pub fn find_first_online_after(&self, t: DateTime<Utc>) -> Option<&ResourceCapacityInterval> {
        self.units
            .iter()
            .find(|u| u.is_active() && u.window.end > t)
    }

    /// 自后向前找最后一个开始于 t 或之前的活跃单元
    pub fn find_first_online_at_or_before(
        &self,
        t: DateTime<Utc>,
    ) -> Option<&ResourceCapacityInterval> {
        self.units
            .iter()
            .rev()
            .find(|u| u.is_active() && u.window.start <= t)
    }

    /// 自前向后找第一个在 t 之后仍有不活跃覆盖的单元
    pub fn find_first_offline_after(&self, t: DateTime<Utc>) -> Option<&ResourceCapacityInterval> {
        self.units
            .iter()
            .find(|u| !u.is_active() && u.window.end > t)
    }

    /// 与 [a, b) 有非零重叠的全部单元(按开始时刻序)
    pub fn find_in_range(
        &self,
        a: DateTime<Utc>,
        b: DateTime<Utc>,
    ) -> Vec<&ResourceCapacityInterval> {
        if b <= a {
            return Vec::new();
        }
        let range = TimeInterval::raw(a, b);
        // start < b 的前缀之外不可能重叠
        let prefix = self.units.partition_point(|u| u.window.start < b);
        self.units[..prefix]
            .iter()
            .filter(|u| u.window.overlaps(&range))
            .collect()
    }

    /// [a, b) 内可排产产能合计(人·小时)
    ///
    /// 对每个活跃单元取其落入 [a, b) 的部分, 扣除同段内
    /// 被不活跃单元覆盖的部分(覆盖先并集去重, 单段扣减
    /// 不为负), 再按人数系数加权求和
    pub fn total_schedulable_capacity_between_dates(
        &self,
        a: DateTime<Utc>,
        b: DateTime<Utc>,
    ) -> f64 {
        if b <= a {
            return 0.0;
        }
        let range = TimeInterval::raw(a, b);
        let mut total_person_hours = 0.0;
        for unit in &self.units {
            if !unit.is_active() {
                continue;
            }
            let clipped = match unit.window.intersection(&range) {
                Some(w) => w,
                None => continue,
            };
            let covered = self.inactive_coverage_within(&clipped);
            let schedulable = clipped.duration() - covered;
            if schedulable > Duration::zero() {
                total_person_hours += unit.nbr_of_people * duration_hours(schedulable);
            }
        }
        total_person_hours
    }

    /// 不活跃单元在给定窗口内的覆盖并集时长
    fn inactive_coverage_within(&self, window: &TimeInterval) -> Duration {
        let mut spans: Vec<TimeInterval> = self
            .units
            .iter()
            .filter(|u| !u.is_active())
            .filter_map(|u| u.window.intersection(window))
            .collect();
        if spans.is_empty() {
            return Duration::zero();
        }
        spans.sort_by_key(|s| s.start);
        let mut covered = Duration::zero();
        let mut cur = spans[0];
        for span in spans.into_iter().skip(1) {
            if span.start <= cur.end {
                if span.end > cur.end {
                    cur.end = span.end;
                }
            } else {
                covered = covered + cur.duration();
                cur = span;
            }
        }
        covered + cur.duration()
    }
}

fn duration_hours(d: Duration) -> f64 {
    d.num_milliseconds() as f64 / 3_600_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::CapacityKind;
    use crate::domain::usage::CapacityUsage;
    use chrono::TimeZone;

    fn ts(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, d, h, m, 0).unwrap()
    }

    fn unit(kind: CapacityKind, d: u32, h1: u32, h2: u32, people: f64) -> ResourceCapacityInterval {
        let usage = if kind == CapacityKind::Offline {
            CapacityUsage::offline()
        } else {
            CapacityUsage::default()
        };
        ResourceCapacityInterval::synthetic(
            kind,
            TimeInterval::new(ts(d, h1, 0), ts(d, h2, 0)).unwrap(),
            people,
            usage,
        )
    }

    fn small_collection() -> ResourceCapacityIntervalsCollection {
        // 3 个单元, 触发线性扫描路径
        ResourceCapacityIntervalsCollection::from_unsorted(vec![
            unit(CapacityKind::Online, 2, 8, 12, 1.0),
            unit(CapacityKind::Offline, 2, 12, 13, 0.0),
            unit(CapacityKind::Online, 2, 13, 16, 1.0),
        ])
    }

    fn large_collection() -> ResourceCapacityIntervalsCollection {
        // 6 个单元, 触发二分路径
        ResourceCapacityIntervalsCollection::from_unsorted(vec![
            unit(CapacityKind::Online, 2, 8, 10, 1.0),
            unit(CapacityKind::Online, 2, 10, 12, 2.0),
            unit(CapacityKind::Offline, 2, 12, 13, 0.0),
            unit(CapacityKind::Online, 2, 13, 16, 1.0),
            unit(CapacityKind::Occupied, 2, 16, 18, 1.0),
            unit(CapacityKind::Online, 2, 18, 20, 1.0),
        ])
    }

    #[test]
    fn test_from_unsorted_orders_by_start() {
        let coll = ResourceCapacityIntervalsCollection::from_unsorted(vec![
            unit(CapacityKind::Online, 2, 13, 16, 1.0),
            unit(CapacityKind::Online, 2, 8, 12, 1.0),
        ]);
        assert_eq!(coll.get(0).unwrap().window.start, ts(2, 8, 0));
        assert_eq!(coll.get(1).unwrap().window.start, ts(2, 13, 0));
    }

    #[test]
    fn test_push_sorted_keeps_insertion_order_on_ties() {
        let mut coll = ResourceCapacityIntervalsCollection::new();
        coll.push_sorted(unit(CapacityKind::Online, 2, 8, 12, 1.0));
        coll.push_sorted(unit(CapacityKind::Offline, 2, 8, 10, 0.0));
        // 同开始时刻, 后插入者在后
        assert_eq!(coll.get(0).unwrap().kind, CapacityKind::Online);
        assert_eq!(coll.get(1).unwrap().kind, CapacityKind::Offline);
    }

    #[test]
    fn test_find_idx_linear_scan_path() {
        let coll = small_collection();
        assert!(coll.len() <= SMALL_COLLECTION_LINEAR_SCAN_MAX);
        assert_eq!(coll.find_idx(ts(2, 9, 0)), Some(0));
        assert_eq!(coll.find_idx(ts(2, 12, 30)), Some(1));
        // 半开语义: 12:00 属于离线段而非在线段
        assert_eq!(coll.find_idx(ts(2, 12, 0)), Some(1));
        // 未覆盖时刻返回 None 而非插入点
        assert_eq!(coll.find_idx(ts(2, 7, 0)), None);
        assert_eq!(coll.find_idx(ts(2, 16, 0)), None);
    }

    #[test]
    fn test_find_idx_binary_search_path() {
        let coll = large_collection();
        assert!(coll.len() > SMALL_COLLECTION_LINEAR_SCAN_MAX);
        assert_eq!(coll.find_idx(ts(2, 9, 0)), Some(0));
        assert_eq!(coll.find_idx(ts(2, 10, 0)), Some(1));
        assert_eq!(coll.find_idx(ts(2, 17, 30)), Some(4));
        assert_eq!(coll.find_idx(ts(2, 19, 59)), Some(5));
        assert_eq!(coll.find_idx(ts(2, 20, 0)), None);
        assert_eq!(coll.find_idx(ts(2, 7, 59)), None);
    }

    #[test]
    fn test_find_first_online_after() {
        let coll = large_collection();
        // 离线段中间: 下一个活跃覆盖是 13:00 段
        let found = coll.find_first_online_after(ts(2, 12, 30)).unwrap();
        assert_eq!(found.window.start, ts(2, 13, 0));
        // 进行中的活跃单元也算
        let found = coll.find_first_online_after(ts(2, 9, 0)).unwrap();
        assert_eq!(found.window.start, ts(2, 8, 0));
        // Occupied 不活跃, 18:00 才是下一个
        let found = coll.find_first_online_after(ts(2, 16, 0)).unwrap();
        assert_eq!(found.window.start, ts(2, 18, 0));
        assert!(coll.find_first_online_after(ts(2, 20, 0)).is_none());
    }

    #[test]
    fn test_find_first_online_at_or_before() {
        let coll = large_collection();
        let found = coll.find_first_online_at_or_before(ts(2, 17, 0)).unwrap();
        assert_eq!(found.window.start, ts(2, 13, 0));
        let found = coll.find_first_online_at_or_before(ts(2, 18, 0)).unwrap();
        assert_eq!(found.window.start, ts(2, 18, 0));
        assert!(coll.find_first_online_at_or_before(ts(2, 7, 0)).is_none());
    }

    #[test]
    fn test_find_first_offline_after() {
        let coll = large_collection();
        let found = coll.find_first_offline_after(ts(2, 8, 0)).unwrap();
        assert_eq!(found.window.start, ts(2, 12, 0));
        let found = coll.find_first_offline_after(ts(2, 13, 0)).unwrap();
        assert_eq!(found.kind, CapacityKind::Occupied);
        assert!(coll.find_first_offline_after(ts(2, 18, 0)).is_none());
    }

    #[test]
    fn test_find_in_range() {
        let coll = large_collection();
        let hits = coll.find_in_range(ts(2, 11, 0), ts(2, 14, 0));
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].window.start, ts(2, 10, 0));
        // 共享端点不算重叠
        let hits = coll.find_in_range(ts(2, 20, 0), ts(2, 22, 0));
        assert!(hits.is_empty());
        assert!(coll.find_in_range(ts(2, 14, 0), ts(2, 14, 0)).is_empty());
    }

    #[test]
    fn test_total_schedulable_capacity_subtracts_inactive_coverage() {
        // 在线 08:00-16:00 ×1, 离线 12:00-13:00 覆盖其中 1 小时
        let coll = ResourceCapacityIntervalsCollection::from_unsorted(vec![
            unit(CapacityKind::Online, 2, 8, 16, 1.0),
            unit(CapacityKind::Offline, 2, 12, 13, 0.0),
        ]);
        let hours = coll.total_schedulable_capacity_between_dates(ts(2, 8, 0), ts(2, 16, 0));
        assert!((hours - 7.0).abs() < 1e-9);
        // 查询窗口截短
        let hours = coll.total_schedulable_capacity_between_dates(ts(2, 10, 0), ts(2, 12, 30));
        assert!((hours - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_schedulable_capacity_no_double_count_overlapping_offline() {
        // 两段重叠离线 11:00-13:00 与 12:00-14:00, 并集 3 小时
        let coll = ResourceCapacityIntervalsCollection::from_unsorted(vec![
            unit(CapacityKind::Online, 2, 8, 16, 2.0),
            unit(CapacityKind::Offline, 2, 11, 13, 0.0),
            unit(CapacityKind::Offline, 2, 12, 14, 0.0),
        ]);
        let hours = coll.total_schedulable_capacity_between_dates(ts(2, 8, 0), ts(2, 16, 0));
        // (8 - 3) 小时 × 2 人
        assert!((hours - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_schedulable_capacity_never_negative_per_segment() {
        // 活跃段被完全覆盖时贡献为零, 不得为负
        let coll = ResourceCapacityIntervalsCollection::from_unsorted(vec![
            unit(CapacityKind::Online, 2, 10, 11, 1.0),
            unit(CapacityKind::Offline, 2, 9, 12, 0.0),
            unit(CapacityKind::Online, 2, 13, 15, 1.0),
        ]);
        let hours = coll.total_schedulable_capacity_between_dates(ts(2, 8, 0), ts(2, 16, 0));
        assert!((hours - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_schedulable_capacity_empty_or_inverted_range() {
        let coll = large_collection();
        assert_eq!(
            coll.total_schedulable_capacity_between_dates(ts(2, 12, 0), ts(2, 12, 0)),
            0.0
        );
        assert_eq!(
            coll.total_schedulable_capacity_between_dates(ts(2, 14, 0), ts(2, 12, 0)),
            0.0
        );
    }
}
