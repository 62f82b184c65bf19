// ==========================================
// RecurrenceEngine 周期展开集成测试
// ==========================================
// 测试目标: 验证四类周期规则的展开与收尾行为
// 覆盖范围: 步进序列、跳过频度、收尾边界、快进计数、过期拆分
// ==========================================

use chrono::{DateTime, Duration, TimeZone, Utc, Weekday};

use capacity_calendar::domain::interval::{RecurrenceEndPolicy, RecurrenceRule, WeekdayMask};
use capacity_calendar::domain::types::RecurrenceKind;
use capacity_calendar::{CalendarError, RecurrenceEngine, TimeInterval};

// ==========================================
// 测试辅助函数
// ==========================================

fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
}

/// 2026 年 3 月 d 日 08:00-16:00 班次窗口
fn shift(d: u32) -> TimeInterval {
    TimeInterval::new(ts(2026, 3, d, 8, 0), ts(2026, 3, d, 16, 0)).unwrap()
}

fn daily(skip: u32, end_policy: RecurrenceEndPolicy) -> RecurrenceRule {
    RecurrenceRule {
        kind: RecurrenceKind::Daily,
        skip_frequency: skip,
        weekdays: WeekdayMask::default(),
        end_policy,
    }
}

fn weekly(days: &[Weekday], skip: u32) -> RecurrenceRule {
    RecurrenceRule {
        kind: RecurrenceKind::Weekly,
        skip_frequency: skip,
        weekdays: WeekdayMask::from_weekdays(days),
        end_policy: RecurrenceEndPolicy::NoEndDate,
    }
}

fn starts(occurrences: &[TimeInterval]) -> Vec<DateTime<Utc>> {
    occurrences.iter().map(|o| o.start).collect()
}

// ==========================================
// 测试用例 1: 按日步进与跳过频度
// ==========================================

#[test]
fn test_daily_stepping_with_skip() {
    println!("\n=== 测试：按日步进与跳过频度 ===");

    let engine = RecurrenceEngine::new();
    let clock = ts(2026, 3, 2, 0, 0);
    let horizon = ts(2026, 3, 9, 0, 0);

    // 每日一班
    let occs = engine
        .expand(&shift(2), &daily(0, RecurrenceEndPolicy::NoEndDate), clock, horizon)
        .unwrap();
    assert_eq!(
        starts(&occs),
        (2..=8).map(|d| ts(2026, 3, d, 8, 0)).collect::<Vec<_>>(),
        "每日规则应逐日发生"
    );
    println!("✓ 每日规则 {} 次发生", occs.len());

    // 隔一日: 3/2, 3/4, 3/6, 3/8
    let occs = engine
        .expand(&shift(2), &daily(1, RecurrenceEndPolicy::NoEndDate), clock, horizon)
        .unwrap();
    assert_eq!(
        starts(&occs),
        vec![ts(2026, 3, 2, 8, 0), ts(2026, 3, 4, 8, 0), ts(2026, 3, 6, 8, 0), ts(2026, 3, 8, 8, 0)]
    );
    // 发生时长一律取锚点时长
    assert!(occs.iter().all(|o| o.duration() == Duration::hours(8)));
    println!("✓ 隔日规则 {} 次发生", occs.len());

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 2: 按周掩码与跨周跳转
// ==========================================

#[test]
fn test_weekly_mask_and_week_jump() {
    println!("\n=== 测试：按周掩码与跨周跳转 ===");

    let engine = RecurrenceEngine::new();
    let clock = ts(2026, 3, 2, 0, 0); // 2026-03-02 周一
    let horizon = ts(2026, 3, 31, 0, 0);

    // 周一/周五, 隔一周: Mon 3/2, Fri 3/6, 跳过一周 → Mon 3/16, Fri 3/20, Mon 3/30
    let rule = weekly(&[Weekday::Mon, Weekday::Fri], 1);
    let occs = engine.expand(&shift(2), &rule, clock, horizon).unwrap();
    assert_eq!(
        starts(&occs),
        vec![
            ts(2026, 3, 2, 8, 0),
            ts(2026, 3, 6, 8, 0),
            ts(2026, 3, 16, 8, 0),
            ts(2026, 3, 20, 8, 0),
            ts(2026, 3, 30, 8, 0),
        ],
        "周末跳转应落在 skip 周之后那一周的最早设置位"
    );
    println!("✓ 跨周跳转序列正确");

    // 锚点落在未设置的星期三, 首次发生前探到周五
    let rule = weekly(&[Weekday::Fri], 0);
    let occs = engine.expand(&shift(4), &rule, clock, ts(2026, 3, 9, 0, 0)).unwrap();
    assert_eq!(starts(&occs), vec![ts(2026, 3, 6, 8, 0)]);
    println!("✓ 锚点前探至首个设置星期");

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 3: 按月月末收缩
// ==========================================

#[test]
fn test_monthly_end_of_month_clamp() {
    println!("\n=== 测试：按月月末收缩 ===");

    let engine = RecurrenceEngine::new();
    let anchor = TimeInterval::new(ts(2026, 1, 31, 8, 0), ts(2026, 1, 31, 16, 0)).unwrap();
    let rule = RecurrenceRule {
        kind: RecurrenceKind::MonthlyByDayNumber,
        skip_frequency: 0,
        weekdays: WeekdayMask::default(),
        end_policy: RecurrenceEndPolicy::NoEndDate,
    };

    let occs = engine
        .expand(&anchor, &rule, ts(2026, 1, 1, 0, 0), ts(2026, 5, 1, 0, 0))
        .unwrap();
    // 1/31 → 2/28(收缩) → 后续自收缩日继续步进
    assert_eq!(
        starts(&occs),
        vec![
            ts(2026, 1, 31, 8, 0),
            ts(2026, 2, 28, 8, 0),
            ts(2026, 3, 28, 8, 0),
            ts(2026, 4, 28, 8, 0),
        ]
    );

    println!("✓ 月末收缩序列: {:?}", starts(&occs));
    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 4: 按年恒进一年
// ==========================================

#[test]
fn test_yearly_always_advances_one_year() {
    println!("\n=== 测试：按年恒进一年 ===");

    let engine = RecurrenceEngine::new();
    // 闰日锚点 + 跳过频度 5(按年规则不参与)
    let anchor = TimeInterval::new(ts(2024, 2, 29, 8, 0), ts(2024, 2, 29, 16, 0)).unwrap();
    let rule = RecurrenceRule {
        kind: RecurrenceKind::YearlyByMonthDay,
        skip_frequency: 5,
        weekdays: WeekdayMask::default(),
        end_policy: RecurrenceEndPolicy::NoEndDate,
    };

    let occs = engine
        .expand(&anchor, &rule, ts(2024, 1, 1, 0, 0), ts(2027, 6, 1, 0, 0))
        .unwrap();
    assert_eq!(
        starts(&occs),
        vec![
            ts(2024, 2, 29, 8, 0),
            ts(2025, 2, 28, 8, 0),
            ts(2026, 2, 28, 8, 0),
            ts(2027, 2, 28, 8, 0),
        ],
        "按年规则应逐年发生且跳过频度不参与"
    );

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 5: 收尾边界为严格晚于
// ==========================================

#[test]
fn test_terminator_boundary_is_strictly_after() {
    println!("\n=== 测试：收尾边界为严格晚于 ===");

    let engine = RecurrenceEngine::new();
    let clock = ts(2026, 3, 2, 0, 0);
    let horizon = ts(2026, 3, 20, 0, 0);

    // 发生开始恰等于收尾时刻: 仍物化
    let at_boundary = RecurrenceEndPolicy::AfterEndDateTime {
        end_date_time: ts(2026, 3, 4, 8, 0),
    };
    let occs = engine.expand(&shift(2), &daily(0, at_boundary), clock, horizon).unwrap();
    assert_eq!(occs.len(), 3, "开始恰等于收尾时刻的发生应保留");
    assert_eq!(occs.last().unwrap().start, ts(2026, 3, 4, 8, 0));
    println!("✓ 收尾时刻边界含等于");

    // 收尾时刻提前一分钟: 最后一次被截掉
    let before_boundary = RecurrenceEndPolicy::AfterEndDateTime {
        end_date_time: ts(2026, 3, 4, 7, 59),
    };
    let occs = engine.expand(&shift(2), &daily(0, before_boundary), clock, horizon).unwrap();
    assert_eq!(occs.len(), 2);
    println!("✓ 早于收尾时刻即判停");

    // 展望期边界同理: 开始恰等于展望期结束仍物化
    let occs = engine
        .expand(
            &shift(2),
            &daily(0, RecurrenceEndPolicy::NoEndDate),
            clock,
            ts(2026, 3, 5, 8, 0),
        )
        .unwrap();
    assert_eq!(occs.last().unwrap().start, ts(2026, 3, 5, 8, 0));
    assert_eq!(occs.len(), 4);
    println!("✓ 展望期边界含等于");

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 6: 快进阶段计入最大次数
// ==========================================

#[test]
fn test_fast_forward_counts_toward_max_occurrences() {
    println!("\n=== 测试：快进阶段计入最大次数 ===");

    let engine = RecurrenceEngine::new();
    let horizon = ts(2026, 3, 31, 0, 0);
    let max5 = RecurrenceEndPolicy::AfterMaxOccurrences { max_occurrences: 5 };

    // 时钟越过前 3 次发生: 只剩 3/5, 3/6 两次
    let occs = engine
        .expand(&shift(2), &daily(0, max5), ts(2026, 3, 4, 20, 0), horizon)
        .unwrap();
    assert_eq!(starts(&occs), vec![ts(2026, 3, 5, 8, 0), ts(2026, 3, 6, 8, 0)]);
    println!("✓ 快进 3 次后剩余 {} 次", occs.len());

    // 时钟越过全部 5 次: 零展开
    let occs = engine
        .expand(&shift(2), &daily(0, max5), ts(2026, 3, 10, 0, 0), horizon)
        .unwrap();
    assert!(occs.is_empty(), "过期序列应零展开");
    println!("✓ 全部过期零展开");

    // 进行中的发生(开始早于时钟但尚未结束)仍物化
    let occs = engine
        .expand(&shift(2), &daily(0, max5), ts(2026, 3, 2, 12, 0), horizon)
        .unwrap();
    assert_eq!(occs.first().unwrap().start, ts(2026, 3, 2, 8, 0));
    assert_eq!(occs.len(), 5);
    println!("✓ 进行中发生保留");

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 7: 过期拆分与保留窗口
// ==========================================

#[test]
fn test_collect_expired_retention_split() {
    println!("\n=== 测试：过期拆分与保留窗口 ===");

    let engine = RecurrenceEngine::new();
    let occurrences: Vec<TimeInterval> = (2..=8).map(shift).collect();

    // 新时钟 3/7 00:00, 保留 2 天 → 截止 3/5 00:00
    let split = engine.collect_expired(&occurrences, ts(2026, 3, 7, 0, 0), Duration::days(2));
    assert_eq!(
        starts(&split.to_actualize),
        vec![ts(2026, 3, 5, 8, 0), ts(2026, 3, 6, 8, 0)],
        "保留窗口内的过期发生应固化"
    );
    assert_eq!(split.purged, 3, "3/2-3/4 超出保留窗口应清除");
    println!(
        "✓ 固化 {} 次, 清除 {} 次",
        split.to_actualize.len(),
        split.purged
    );

    // 结束恰等于新时钟的发生算过期
    let split = engine.collect_expired(&occurrences, ts(2026, 3, 2, 16, 0), Duration::days(30));
    assert_eq!(starts(&split.to_actualize), vec![ts(2026, 3, 2, 8, 0)]);
    assert_eq!(split.purged, 0);
    println!("✓ 结束恰等于时钟即过期");

    println!("=== 测试通过 ===\n");
}

// ==========================================
// 测试用例 8: 规则校验失败
// ==========================================

#[test]
fn test_rule_validation_failures() {
    println!("\n=== 测试：规则校验失败 ===");

    let engine = RecurrenceEngine::new();
    let clock = ts(2026, 3, 2, 0, 0);
    let horizon = ts(2026, 3, 9, 0, 0);

    // 按周规则空掩码
    let err = engine
        .expand(&shift(2), &weekly(&[], 0), clock, horizon)
        .unwrap_err();
    assert!(
        matches!(&err, CalendarError::InvalidRecurrence { field, .. } if field == "weekdays"),
        "空星期掩码应被拒绝: {}",
        err
    );

    // 最大发生次数为零
    let zero_max = RecurrenceEndPolicy::AfterMaxOccurrences { max_occurrences: 0 };
    let err = engine
        .expand(&shift(2), &daily(0, zero_max), clock, horizon)
        .unwrap_err();
    assert!(matches!(&err, CalendarError::InvalidRecurrence { field, .. } if field == "max_occurrences"));

    // 收尾时刻早于锚点开始
    let too_early = RecurrenceEndPolicy::AfterEndDateTime {
        end_date_time: ts(2026, 3, 1, 0, 0),
    };
    let err = engine
        .expand(&shift(2), &daily(0, too_early), clock, horizon)
        .unwrap_err();
    assert!(matches!(&err, CalendarError::InvalidRecurrence { field, .. } if field == "end_date_time"));

    println!("=== 测试通过 ===\n");
}
