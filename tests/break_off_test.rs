// ==========================================
// 周期剥离沙盘集成测试
// ==========================================
// 测试目标: 验证 apply_break_off 对沙盘的整体改写
// 覆盖范围: 四类位置分支、关联恢复、轮廓重建、错误路径
// ==========================================


use capacity_calendar::domain::interval::RecurrenceEndPolicy;
use capacity_calendar::domain::one_tick;
use capacity_calendar::engine::BreakOffOverrides;
use capacity_calendar::{
    CalendarError, CalendarOrchestrator, CapacityKind, CapacityUsage, ScheduledInterval,
    TimeInterval,
};

use test_helpers::{
    daily_series, insert_and_attach, march, march_window, online_interval, scenario_with_resource,
    test_config,
};

// ==========================================
// 测试辅助函数
// ==========================================

fn max_occurrences(n: u32) -> RecurrenceEndPolicy {
    RecurrenceEndPolicy::AfterMaxOccurrences { max_occurrences: n }
}

fn offline_overrides() -> BreakOffOverrides {
    BreakOffOverrides {
        kind: Some(CapacityKind::Offline),
        usage: Some(CapacityUsage::offline()),
        remark: Some("临时检修".to_string()),
        ..BreakOffOverrides::default()
    }
}

// ==========================================
// 测试用例 1: 中间发生剥离与沙盘改写
// ==========================================

#[test]
fn test_break_off_middle_occurrence_rewires_scenario() {
    println!("\n=== 测试：中间发生剥离与沙盘改写 ===");

    let orchestrator = CalendarOrchestrator::new(test_config());
    let (mut scenario, resource_id) = scenario_with_resource();
    // 每日 08:00-16:00 ×2 人, 无收尾
    let series = daily_series(march_window(2, 8, 16), 2.0, RecurrenceEndPolicy::NoEndDate);
    let series_id = insert_and_attach(
        &mut scenario,
        ScheduledInterval::Recurring(series),
        &resource_id,
    );
    orchestrator.refresh_resource(&mut scenario, &resource_id).unwrap();

    // 剥离 3/4 改为全天检修
    let target = march_window(4, 8, 16);
    let report = orchestrator
        .apply_break_off(&mut scenario, &series_id, &target, &offline_overrides())
        .unwrap();

    assert!(!report.series_removed, "中间剥离不应删除序列");
    assert!(report.detached_prior_id.is_some(), "中间剥离应产生前段序列");
    assert_eq!(report.resources_refreshed.len(), 1);
    assert_eq!(scenario.intervals.len(), 3, "沙盘应持有前段+后段+独立区间");
    println!("✓ 沙盘改写: {} 个区间", scenario.intervals.len());

    // 前段序列: 收尾于目标开始前一刻度, 展开只剩 3/2-3/3
    let prior_id = report.detached_prior_id.as_ref().unwrap();
    let prior = scenario.interval(prior_id).unwrap().as_recurring().unwrap();
    assert_eq!(
        prior.rule.end_policy,
        RecurrenceEndPolicy::AfterEndDateTime {
            end_date_time: march(4, 8, 0) - one_tick(),
        }
    );
    assert_eq!(
        prior.occurrences(),
        &[march_window(2, 8, 16), march_window(3, 8, 16)],
        "前段序列应收尾在目标之前"
    );
    println!("✓ 前段序列 {} 次发生", prior.occurrences().len());

    // 后段序列沿用原区间 ID, 锚点推进到 3/5
    let updated = scenario.interval(&series_id).unwrap().as_recurring().unwrap();
    assert_eq!(updated.base.window, march_window(5, 8, 16));
    assert_eq!(updated.occurrences().first(), Some(&march_window(5, 8, 16)));
    println!("✓ 后段锚点推进到 {}", updated.base.window);

    // 独立区间承载覆盖字段并沿用资源关联
    let override_iv = scenario
        .interval(&report.override_interval_id)
        .unwrap()
        .base();
    assert_eq!(override_iv.kind, CapacityKind::Offline);
    assert_eq!(override_iv.window, target);
    assert_eq!(override_iv.remark.as_deref(), Some("临时检修"));
    assert!(override_iv.resource_ids.contains(&resource_id));

    // 轮廓: 3/4 全天不活跃, 周内可排产产能 = (2+4) 天 ×8h×2 人
    let resource = scenario.resource(&resource_id).unwrap();
    let segment_idx = resource.profile.profile().find_idx(march(4, 10, 0)).unwrap();
    let segment = resource.profile.profile().get(segment_idx).unwrap();
    assert!(!segment.is_active(), "剥离日应整天不活跃");
    let capacity = resource
        .profile
        .profile()
        .total_schedulable_capacity_between_dates(march(2, 0, 0), march(9, 0, 0));
    assert_eq!(capacity, 96.0, "周内可排产产能应为 96 人·小时");
    println!("✓ 周内可排产产能 {} 人·小时", capacity);

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 2: 唯一发生剥离删除序列
// ==========================================

#[test]
fn test_break_off_sole_occurrence_removes_series() {
    println!("\n=== 测试：唯一发生剥离删除序列 ===");

    let orchestrator = CalendarOrchestrator::new(test_config());
    let (mut scenario, resource_id) = scenario_with_resource();
    let series = daily_series(march_window(2, 8, 16), 1.0, max_occurrences(1));
    let series_id = insert_and_attach(
        &mut scenario,
        ScheduledInterval::Recurring(series),
        &resource_id,
    );

    let report = orchestrator
        .apply_break_off(
            &mut scenario,
            &series_id,
            &march_window(2, 8, 16),
            &BreakOffOverrides::default(),
        )
        .unwrap();

    assert!(report.series_removed, "唯一发生剥离应删除序列");
    assert!(report.detached_prior_id.is_none());
    assert!(scenario.interval(&series_id).is_none(), "原序列应被摘除");
    assert_eq!(scenario.intervals.len(), 1, "沙盘只应剩独立区间");

    // 资源关联只指向独立区间
    let resource = scenario.resource(&resource_id).unwrap();
    assert_eq!(resource.interval_ids.len(), 1);
    assert!(resource.interval_ids.contains(&report.override_interval_id));

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 3: 首个发生剥离推进锚点
// ==========================================

#[test]
fn test_break_off_first_occurrence_advances_anchor() {
    println!("\n=== 测试：首个发生剥离推进锚点 ===");

    let orchestrator = CalendarOrchestrator::new(test_config());
    let (mut scenario, resource_id) = scenario_with_resource();
    let series = daily_series(march_window(2, 8, 16), 2.0, max_occurrences(3));
    let series_id = insert_and_attach(
        &mut scenario,
        ScheduledInterval::Recurring(series),
        &resource_id,
    );

    // 不带覆盖字段: 独立区间原样承载当次发生的载荷
    let report = orchestrator
        .apply_break_off(
            &mut scenario,
            &series_id,
            &march_window(2, 8, 16),
            &BreakOffOverrides::default(),
        )
        .unwrap();
    assert!(!report.series_removed);
    assert!(report.detached_prior_id.is_none(), "首个剥离不应产生前段");

    let updated = scenario.interval(&series_id).unwrap().as_recurring().unwrap();
    assert_eq!(updated.base.window, march_window(3, 8, 16), "锚点应推进到第二个发生");
    assert_eq!(updated.rule.end_policy, max_occurrences(3), "收尾策略保持不变");

    // 独立区间载荷与序列一致, 当天产能不变
    let override_iv = scenario
        .interval(&report.override_interval_id)
        .unwrap()
        .base();
    assert_eq!(override_iv.kind, CapacityKind::Online);
    assert_eq!(override_iv.nbr_of_people, 2.0);
    let resource = scenario.resource(&resource_id).unwrap();
    let capacity = resource
        .profile
        .profile()
        .total_schedulable_capacity_between_dates(march(2, 0, 0), march(3, 0, 0));
    assert_eq!(capacity, 16.0, "无覆盖剥离不应改变当天产能");

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 4: 末个发生剥离提前收尾
// ==========================================

#[test]
fn test_break_off_last_occurrence_truncates_series() {
    println!("\n=== 测试：末个发生剥离提前收尾 ===");

    let orchestrator = CalendarOrchestrator::new(test_config());
    let (mut scenario, resource_id) = scenario_with_resource();
    let series = daily_series(march_window(2, 8, 16), 1.0, max_occurrences(3));
    let series_id = insert_and_attach(
        &mut scenario,
        ScheduledInterval::Recurring(series),
        &resource_id,
    );

    let report = orchestrator
        .apply_break_off(
            &mut scenario,
            &series_id,
            &march_window(4, 8, 16),
            &offline_overrides(),
        )
        .unwrap();
    assert!(!report.series_removed);
    assert!(report.detached_prior_id.is_none(), "末个剥离不应产生前段");

    let updated = scenario.interval(&series_id).unwrap().as_recurring().unwrap();
    assert_eq!(
        updated.rule.end_policy,
        RecurrenceEndPolicy::AfterEndDateTime {
            end_date_time: march(4, 8, 0) - one_tick(),
        },
        "收尾策略应改为目标开始前一刻度"
    );
    assert_eq!(
        updated.occurrences(),
        &[march_window(2, 8, 16), march_window(3, 8, 16)],
        "重展开后末个发生应被截掉"
    );

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 5: 错误路径
// ==========================================

#[test]
fn test_break_off_error_paths() {
    println!("\n=== 测试：剥离错误路径 ===");

    let orchestrator = CalendarOrchestrator::new(test_config());
    let (mut scenario, resource_id) = scenario_with_resource();

    // 单次区间不可剥离
    let simple = ScheduledInterval::Simple(online_interval(march_window(2, 8, 16), 1.0));
    let simple_id = insert_and_attach(&mut scenario, simple, &resource_id);
    let err = orchestrator
        .apply_break_off(
            &mut scenario,
            &simple_id,
            &march_window(2, 8, 16),
            &BreakOffOverrides::default(),
        )
        .unwrap_err();
    assert!(
        matches!(&err, CalendarError::InvalidRecurrence { field, .. } if field == "interval_type"),
        "单次区间剥离应被拒绝: {}",
        err
    );
    println!("✓ 单次区间剥离被拒绝");

    // 目标窗口与展开列表不匹配
    let series = daily_series(march_window(2, 8, 16), 1.0, max_occurrences(3));
    let series_id = insert_and_attach(
        &mut scenario,
        ScheduledInterval::Recurring(series),
        &resource_id,
    );
    let wrong_target = TimeInterval::new(march(4, 9, 0), march(4, 17, 0)).unwrap();
    let err = orchestrator
        .apply_break_off(&mut scenario, &series_id, &wrong_target, &BreakOffOverrides::default())
        .unwrap_err();
    assert!(matches!(err, CalendarError::InternalInconsistency(_)));
    println!("✓ 错位目标窗口被拒绝");

    // 剥离失败不得改写沙盘
    assert_eq!(scenario.intervals.len(), 2, "失败路径不应改写沙盘");

    println!("=== 测试通过 ===\n");
}
