// Small dev utility: seed a demo scenario and print the regenerated
// capacity profile for one resource.
//
// Usage:
//   cargo run --bin preview_calendar -- [horizon_days]
//
// This is intentionally lightweight and does not load any config file.

use chrono::{Duration, TimeZone, Utc, Weekday};

use capacity_calendar::domain::interval::{
    CapacityInterval, RecurrenceEndPolicy, RecurrenceRule, RecurringCapacityInterval, WeekdayMask,
};
use capacity_calendar::domain::time::{MAX_INSTANT, MIN_INSTANT};
use capacity_calendar::{
    CalendarConfig, CalendarOrchestrator, CapacityKind, CapacityUsage, RecurrenceKind, Scenario,
    ScheduledInterval, TimeBucketList, TimeInterval,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    capacity_calendar::logging::init();

    let horizon_days = std::env::args()
        .nth(1)
        .and_then(|s| s.parse::<i64>().ok())
        .unwrap_or(14);

    let config = CalendarConfig {
        planning_horizon_days: horizon_days,
        actual_retention_days: 30,
    };
    let orchestrator = CalendarOrchestrator::new(config);

    let clock = Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap();
    let mut scenario = Scenario::new(clock);
    let resource_id = scenario.add_resource("铣床-01");

    // 工作日白班 (周一到周五 08:00-16:00, 2人)
    let shift_anchor = TimeInterval::new(
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 2, 16, 0, 0).unwrap(),
    )?;
    let shift = RecurringCapacityInterval::new(
        CapacityInterval::new(
            CapacityKind::Online,
            shift_anchor,
            2.0,
            CapacityUsage::default(),
        )?,
        RecurrenceRule {
            kind: RecurrenceKind::Weekly,
            skip_frequency: 0,
            weekdays: WeekdayMask::from_weekdays(&[
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]),
            end_policy: RecurrenceEndPolicy::NoEndDate,
        },
    )?;
    let shift_id = shift.base.interval_id.clone();
    scenario.insert_interval(ScheduledInterval::Recurring(shift))?;
    scenario.attach(&shift_id, &resource_id)?;

    // 周三下午设备保养 (离线)
    let maintenance = CapacityInterval::new(
        CapacityKind::Offline,
        TimeInterval::new(
            Utc.with_ymd_and_hms(2026, 3, 4, 13, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 4, 16, 0, 0).unwrap(),
        )?,
        1.0,
        CapacityUsage::offline(),
    )?;
    let maintenance_id = maintenance.interval_id.clone();
    scenario.insert_interval(ScheduledInterval::Simple(maintenance))?;
    scenario.attach(&maintenance_id, &resource_id)?;

    let report = orchestrator.refresh_resource(&mut scenario, &resource_id)?;
    println!(
        "resource={} expansions_rebuilt={} raw_units={} profile_segments={} elapsed_ms={}",
        report.resource_id,
        report.expansions_rebuilt,
        report.raw_units,
        report.profile_segments,
        report.elapsed_ms
    );

    let resource = scenario.resource(&resource_id).ok_or("资源丢失")?;
    println!("--- 产能剖面 (共 {} 段) ---", resource.profile.profile().len());
    for unit in resource.profile.profile().iter() {
        let start = if unit.window.start == MIN_INSTANT {
            "-inf".to_string()
        } else {
            unit.window.start.to_rfc3339()
        };
        let end = if unit.window.end == MAX_INSTANT {
            "+inf".to_string()
        } else {
            unit.window.end.to_rfc3339()
        };
        println!(
            "  [{}, {}) kind={} people={}",
            start, end, unit.kind, unit.nbr_of_people
        );
    }

    // 未来一周按日聚合在线时长
    let mut buckets = TimeBucketList::new(clock, Duration::days(1), 7)?;
    for unit in resource.profile.profile().iter() {
        if unit.is_active() {
            buckets.add_time(unit.window.start, unit.window.end, unit.nbr_of_people);
        }
    }
    println!("--- 未来一周人时聚合 ---");
    for (idx, bucket) in buckets.iter().enumerate() {
        println!(
            "  day+{}: {} 分钟 (溢出 {} 次)",
            idx,
            bucket.accumulated.num_minutes(),
            bucket.overflow_count
        );
    }

    let schedulable = resource
        .profile
        .profile()
        .total_schedulable_capacity_between_dates(clock, clock + Duration::days(7));
    println!("未来一周可排产能: {:.1} 人时", schedulable);

    Ok(())
}
