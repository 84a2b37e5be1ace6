// libs/rule-engine-cell/tests/evaluation_test.rs
//
// End-to-end behaviour of rule evaluation through the public API:
// stored rows -> ConditionTree -> PreloadedDayData -> TreeEvaluator / DayRulePlan.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use rule_engine_cell::services::builder::RuleNodeFactory;
use rule_engine_cell::{
    check_rules, Appointment, AppointmentContext, AppointmentStatus, Comparator, Condition, ConcurrentScope,
    ConditionTree, DayRulePlan, IdSetMatch, Practitioner, PreloadedDayData, RuleExpr, TreeEvaluator,
};

// ==============================================================================
// FIXTURES
// ==============================================================================

const TZ: Tz = chrono_tz::America::New_York;

struct Fixture {
    tenant_id: Uuid,
    factory: RuleNodeFactory,
}

impl Fixture {
    fn new() -> Self {
        let tenant_id = Uuid::new_v4();
        Self {
            tenant_id,
            factory: RuleNodeFactory::new(tenant_id, Uuid::new_v4()),
        }
    }

    /// Round-trips through the persisted row format the way the REST source does.
    fn tree(&self, rules: Vec<Vec<rule_engine_cell::RuleCondition>>) -> ConditionTree {
        let rows = rules.into_iter().flatten().map(|node| node.to_row()).collect();
        ConditionTree::from_rows(rows).expect("rows decode")
    }

    fn day(&self, date: NaiveDate, appointments: Vec<Appointment>) -> PreloadedDayData {
        PreloadedDayData::build(self.tenant_id, date, TZ, appointments, self.practitioners())
    }

    fn practitioners(&self) -> Vec<Practitioner> {
        vec![
            Practitioner {
                id: "dr-a".to_string(),
                tenant_id: self.tenant_id,
                display_name: Some("Dr Adams".to_string()),
                tags: vec!["senior".to_string()],
            },
            Practitioner {
                id: "dr-b".to_string(),
                tenant_id: self.tenant_id,
                display_name: Some("Dr Brown".to_string()),
                tags: vec!["locum".to_string()],
            },
        ]
    }

    fn booking(&self, start: DateTime<Tz>, practitioner: &str, kind: &str) -> Appointment {
        Appointment {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            appointment_type_id: kind.to_string(),
            practitioner_id: practitioner.to_string(),
            location_id: Some("main".to_string()),
            start_time: start.with_timezone(&Utc),
            duration_minutes: 15,
            status: AppointmentStatus::Confirmed,
        }
    }
}

fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Tz> {
    TZ.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn checkup_rule() -> RuleExpr {
    RuleExpr::leaf(Condition::AppointmentType(IdSetMatch::is(["checkup"])))
}

fn monday_rule() -> RuleExpr {
    RuleExpr::leaf(Condition::DayOfWeek { comparator: Comparator::Equals, day: 1 })
}

// 2024-03-04 is a Monday, 2024-03-05 a Tuesday.
fn monday() -> DateTime<Tz> {
    local(2024, 3, 4, 10, 0)
}

fn tuesday() -> DateTime<Tz> {
    local(2024, 3, 5, 10, 0)
}

// ==============================================================================
// SCENARIOS
// ==============================================================================

#[test]
fn checkup_on_monday_scenario() {
    let fx = Fixture::new();
    let tree = fx.tree(vec![fx.factory.rule(0, true, RuleExpr::and(vec![checkup_rule(), monday_rule()]))]);

    for (kind, start, blocked) in [
        ("checkup", monday(), true),
        ("checkup", tuesday(), false),
        ("consultation", monday(), false),
    ] {
        let day = fx.day(start.date_naive(), vec![]);
        let result = TreeEvaluator::new(&tree, &day)
            .check(&AppointmentContext::new(kind, "dr-a", start))
            .unwrap();
        assert_eq!(result.is_blocked, blocked, "{} at {}", kind, start);
    }
}

#[test]
fn two_independent_rules_scenario() {
    let fx = Fixture::new();
    let block_checkup = fx.factory.rule(0, true, checkup_rule());
    let block_monday = fx.factory.rule(1, true, monday_rule());
    let (checkup_id, monday_id) = (block_checkup[0].id, block_monday[0].id);
    let tree = fx.tree(vec![block_checkup, block_monday]);

    let check = |kind: &str, start: DateTime<Tz>| {
        let day = fx.day(start.date_naive(), vec![]);
        TreeEvaluator::new(&tree, &day)
            .check(&AppointmentContext::new(kind, "dr-a", start))
            .unwrap()
    };

    assert_eq!(check("checkup", tuesday()).blocked_by_rule_ids, vec![checkup_id]);
    assert_eq!(check("consultation", monday()).blocked_by_rule_ids, vec![monday_id]);

    let both = check("checkup", monday());
    assert!(both.is_blocked);
    assert!(!both.blocked_by_rule_ids.is_empty());

    let neither = check("consultation", tuesday());
    assert!(!neither.is_blocked);
    assert!(neither.blocked_by_rule_ids.is_empty());
}

#[test]
fn disabled_rule_never_blocks() {
    let fx = Fixture::new();
    let always_true = RuleExpr::leaf(Condition::Practitioner(IdSetMatch::is_not(["nobody"])));
    let tree = fx.tree(vec![fx.factory.rule(0, false, always_true)]);
    let day = fx.day(monday().date_naive(), vec![]);

    let result = check_rules(&tree, &AppointmentContext::new("checkup", "dr-a", monday()), &day).unwrap();
    assert!(!result.is_blocked);
    assert!(result.blocked_by_rule_ids.is_empty());
}

// ==============================================================================
// PROPERTIES
// ==============================================================================

#[test]
fn day_of_week_monday_sweep() {
    let fx = Fixture::new();
    let rule = fx.factory.rule(0, true, monday_rule());
    let root = rule[0].id;
    let tree = fx.tree(vec![rule]);

    for offset in 0..7 {
        let start = monday() + Duration::days(offset);
        let day = fx.day(start.date_naive(), vec![]);
        let blocked = TreeEvaluator::new(&tree, &day)
            .evaluate(root, &AppointmentContext::new("checkup", "dr-a", start))
            .unwrap();
        assert_eq!(blocked, offset == 0, "day offset {}", offset);
    }
}

#[test]
fn days_ahead_boundary() {
    let fx = Fixture::new();
    let rule = fx.factory.rule(
        0,
        true,
        RuleExpr::leaf(Condition::DaysAhead { comparator: Comparator::GreaterOrEqual, days: 30 }),
    );
    let root = rule[0].id;
    let tree = fx.tree(vec![rule]);
    let appointment = local(2024, 4, 3, 9, 0);
    let day = fx.day(appointment.date_naive(), vec![]);
    let evaluator = TreeEvaluator::new(&tree, &day);

    let requested = |days_before: i64| {
        AppointmentContext::new("checkup", "dr-a", appointment)
            .with_requested_at(appointment - Duration::days(days_before))
    };

    assert!(evaluator.evaluate(root, &requested(30)).unwrap());
    assert!(!evaluator.evaluate(root, &requested(29)).unwrap());
    assert!(evaluator.evaluate(root, &requested(45)).unwrap());
}

#[test]
fn concurrent_count_blocks_only_the_shared_instant() {
    let fx = Fixture::new();
    let rule = fx.factory.rule(
        0,
        true,
        RuleExpr::leaf(Condition::ConcurrentCount {
            comparator: Comparator::GreaterOrEqual,
            limit: 2,
            scope: ConcurrentScope::Practice,
            appointment_type_ids: None,
        }),
    );
    let root = rule[0].id;
    let tree = fx.tree(vec![rule]);
    let taken = local(2024, 3, 4, 11, 0);
    let day = fx.day(taken.date_naive(), vec![fx.booking(taken, "dr-b", "consultation")]);
    let evaluator = TreeEvaluator::new(&tree, &day);

    assert!(evaluator.evaluate(root, &AppointmentContext::new("checkup", "dr-a", taken)).unwrap());
    for minutes in [-60, -5, 5, 60] {
        let other = taken + Duration::minutes(minutes);
        assert!(!evaluator.evaluate(root, &AppointmentContext::new("checkup", "dr-a", other)).unwrap());
    }
}

#[test]
fn day_invariant_rules_ignore_practitioner_and_time() {
    let fx = Fixture::new();
    let rule = fx.factory.rule(
        0,
        true,
        RuleExpr::and(vec![
            checkup_rule(),
            RuleExpr::leaf(Condition::Location(IdSetMatch::is(["main"]))),
            RuleExpr::not(RuleExpr::leaf(Condition::ClientType(IdSetMatch::is(["vip"])))),
            RuleExpr::leaf(Condition::DaysAhead { comparator: Comparator::LessOrEqual, days: 1 }),
        ]),
    );
    let tree = fx.tree(vec![rule]);
    let start = local(2024, 3, 4, 8, 0);
    let day = fx.day(start.date_naive(), vec![fx.booking(start, "dr-a", "checkup")]);
    let evaluator = TreeEvaluator::new(&tree, &day);
    let base = AppointmentContext::new("checkup", "dr-a", start)
        .with_location("main")
        .with_client_type("regular")
        .with_requested_at(start - Duration::hours(20));

    let plan = DayRulePlan::prepare(&evaluator, &base).unwrap();
    assert_eq!(plan.partition().day_invariant.len(), 1);
    let expected = plan.day_invariant().is_blocking();
    assert!(expected);

    for practitioner in ["dr-a", "dr-b", "dr-unknown"] {
        for minutes in (0..600).step_by(35) {
            let slot = base.for_slot(practitioner, start + Duration::minutes(minutes));
            assert_eq!(evaluator.check(&slot).unwrap().is_blocked, expected);
        }
    }
}

#[test]
fn evaluation_is_deterministic() {
    let fx = Fixture::new();
    let tree = fx.tree(vec![
        fx.factory.rule(0, true, RuleExpr::any(vec![checkup_rule(), monday_rule()])),
        fx.factory.rule(
            1,
            true,
            RuleExpr::leaf(Condition::PractitionerTag(IdSetMatch::is(["locum"]))),
        ),
    ]);
    let day = fx.day(monday().date_naive(), vec![fx.booking(monday(), "dr-a", "checkup")]);
    let evaluator = TreeEvaluator::new(&tree, &day);
    let context = AppointmentContext::new("consultation", "dr-b", monday());

    let first = evaluator.check(&context).unwrap();
    for _ in 0..10 {
        assert_eq!(evaluator.check(&context).unwrap(), first);
    }
    assert_eq!(first.blocked_by_rule_ids.len(), 2);
}
