use tracing::debug;
use uuid::Uuid;

use crate::error::{RuleEngineError, RuleResult};
use crate::models::{ConditionType, NodeKind};
use crate::services::tree::ConditionTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleVariance {
    /// Result cannot change between slots of one day-query.
    DayInvariant,
    /// Must be evaluated against every slot.
    TimeVariant,
}

impl ConditionType {
    /// Inputs fixed for a whole day-query at one location: the requested type
    /// and client, the location itself, plus anything derived only from the
    /// target date.
    pub fn is_day_invariant(&self) -> bool {
        match self {
            ConditionType::AppointmentType
            | ConditionType::ClientType
            | ConditionType::DateRange
            | ConditionType::DayOfWeek
            | ConditionType::DaysAhead
            | ConditionType::Location => true,
            ConditionType::Practitioner
            | ConditionType::PractitionerTag
            | ConditionType::DailyCapacity
            | ConditionType::ConcurrentCount
            | ConditionType::TimeRange => false,
        }
    }
}

/// Enabled rules of one rule set split by variance, each list in stored order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RulePartition {
    pub day_invariant: Vec<Uuid>,
    pub time_variant: Vec<Uuid>,
}

impl RulePartition {
    pub fn total(&self) -> usize {
        self.day_invariant.len() + self.time_variant.len()
    }
}

/// Walk every leaf of the rule. One time-variant leaf decides the whole rule.
pub fn classify_rule(tree: &ConditionTree, root_id: Uuid) -> RuleResult<RuleVariance> {
    let mut stack = vec![root_id];
    let mut visited = 0usize;

    while let Some(node_id) = stack.pop() {
        let node = tree.node(node_id)?;
        visited += 1;
        if visited > tree.len() {
            return Err(RuleEngineError::CycleDetected(node_id));
        }

        match &node.kind {
            NodeKind::Condition(condition) => {
                if !condition.condition_type().is_day_invariant() {
                    return Ok(RuleVariance::TimeVariant);
                }
            }
            NodeKind::And | NodeKind::Not => stack.extend_from_slice(tree.children(node_id)),
        }
    }

    Ok(RuleVariance::DayInvariant)
}

/// Classify all enabled rules. Computed fresh for each query.
pub fn partition_rules(tree: &ConditionTree) -> RuleResult<RulePartition> {
    let mut partition = RulePartition::default();

    for rule_id in tree.enabled_rule_ids() {
        match classify_rule(tree, rule_id)? {
            RuleVariance::DayInvariant => partition.day_invariant.push(rule_id),
            RuleVariance::TimeVariant => partition.time_variant.push(rule_id),
        }
    }

    debug!(
        "Classified {} rules: {} day-invariant, {} time-variant",
        partition.total(),
        partition.day_invariant.len(),
        partition.time_variant.len()
    );
    Ok(partition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Comparator, Condition, IdSetMatch, Polarity};
    use crate::services::builder::{RuleExpr, RuleNodeFactory};
    use assert_matches::assert_matches;
    use chrono::NaiveTime;

    fn factory() -> RuleNodeFactory {
        RuleNodeFactory::new(Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn date_and_request_conditions_are_day_invariant() {
        let f = factory();
        let nodes = f.rule(
            0,
            true,
            RuleExpr::and(vec![
                RuleExpr::leaf(Condition::AppointmentType(IdSetMatch::is(["checkup"]))),
                RuleExpr::not(RuleExpr::leaf(Condition::DaysAhead { comparator: Comparator::LessOrEqual, days: 1 })),
                RuleExpr::leaf(Condition::DayOfWeek { comparator: Comparator::Equals, day: 6 }),
            ]),
        );
        let root = nodes[0].id;
        let tree = ConditionTree::from_nodes(nodes);

        assert_eq!(classify_rule(&tree, root).unwrap(), RuleVariance::DayInvariant);
    }

    #[test]
    fn one_slot_dependent_leaf_makes_rule_time_variant() {
        let f = factory();
        for leaf in [
            Condition::Practitioner(IdSetMatch::is(["dr-a"])),
            Condition::PractitionerTag(IdSetMatch::is(["locum"])),
            Condition::DailyCapacity { comparator: Comparator::GreaterOrEqual, limit: 8 },
            Condition::TimeRange {
                polarity: Polarity::Is,
                start: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
            },
        ] {
            let nodes = f.rule(
                0,
                true,
                RuleExpr::and(vec![
                    RuleExpr::leaf(Condition::AppointmentType(IdSetMatch::is(["checkup"]))),
                    RuleExpr::not(RuleExpr::leaf(leaf)),
                ]),
            );
            let root = nodes[0].id;
            let tree = ConditionTree::from_nodes(nodes);
            assert_eq!(classify_rule(&tree, root).unwrap(), RuleVariance::TimeVariant);
        }
    }

    #[test]
    fn partition_keeps_stored_order_and_skips_disabled() {
        let f = factory();
        let invariant = || RuleExpr::leaf(Condition::Location(IdSetMatch::is(["north"])));
        let variant = || RuleExpr::leaf(Condition::Practitioner(IdSetMatch::is(["dr-a"])));
        let r1 = f.rule(0, true, variant());
        let r2 = f.rule(1, true, invariant());
        let r3 = f.rule(2, false, invariant());
        let r4 = f.rule(3, true, invariant());
        let ids = [r1[0].id, r2[0].id, r4[0].id];
        let tree = ConditionTree::from_nodes(r4.into_iter().chain(r3).chain(r2).chain(r1));

        let partition = partition_rules(&tree).unwrap();
        assert_eq!(partition.day_invariant, vec![ids[1], ids[2]]);
        assert_eq!(partition.time_variant, vec![ids[0]]);
        assert_eq!(partition.total(), 3);
    }

    #[test]
    fn unknown_rule_id_is_corruption() {
        let tree = ConditionTree::new();
        let missing = Uuid::new_v4();
        assert_matches!(classify_rule(&tree, missing), Err(RuleEngineError::NodeNotFound(id)) if id == missing);
    }
}
