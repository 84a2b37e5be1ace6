use tracing::debug;
use uuid::Uuid;

use crate::error::RuleResult;
use crate::models::AppointmentContext;
use crate::services::classifier::{partition_rules, RulePartition};
use crate::services::evaluator::TreeEvaluator;

/// Day-invariant rules that block, evaluated once per day-query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayInvariantCache {
    blocking_rule_ids: Vec<Uuid>,
}

impl DayInvariantCache {
    /// Evaluate each day-invariant rule against one representative context.
    ///
    /// Any slot of the query works as the representative: by classification,
    /// none of these rules read the slot's practitioner or time of day.
    pub fn compute(
        evaluator: &TreeEvaluator<'_>,
        day_invariant_rule_ids: &[Uuid],
        representative: &AppointmentContext,
    ) -> RuleResult<Self> {
        let blocking_rule_ids = evaluator.blocking_rules(day_invariant_rule_ids, representative)?;

        debug!(
            "Pre-evaluated {} day-invariant rules, {} blocking",
            day_invariant_rule_ids.len(),
            blocking_rule_ids.len()
        );
        Ok(Self { blocking_rule_ids })
    }

    pub fn blocking_rule_ids(&self) -> &[Uuid] {
        &self.blocking_rule_ids
    }

    pub fn first_blocking_rule(&self) -> Option<Uuid> {
        self.blocking_rule_ids.first().copied()
    }

    pub fn is_blocking(&self) -> bool {
        !self.blocking_rule_ids.is_empty()
    }
}

/// Per-query evaluation plan: classification plus the cached day-invariant result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayRulePlan {
    partition: RulePartition,
    cache: DayInvariantCache,
}

impl DayRulePlan {
    pub fn prepare(evaluator: &TreeEvaluator<'_>, representative: &AppointmentContext) -> RuleResult<Self> {
        Self::with_partition(partition_rules(evaluator.tree())?, evaluator, representative)
    }

    /// Reuse a classification already made for this tree.
    ///
    /// Day-invariant rules still read the location, so a grid spanning several
    /// locations needs one plan per location.
    pub fn with_partition(
        partition: RulePartition,
        evaluator: &TreeEvaluator<'_>,
        representative: &AppointmentContext,
    ) -> RuleResult<Self> {
        let cache = DayInvariantCache::compute(evaluator, &partition.day_invariant, representative)?;
        Ok(Self { partition, cache })
    }

    pub fn partition(&self) -> &RulePartition {
        &self.partition
    }

    pub fn day_invariant(&self) -> &DayInvariantCache {
        &self.cache
    }

    /// Rule that blocks this slot, if any.
    ///
    /// Cached day-invariant blockers come first; otherwise time-variant rules
    /// run in stored order and the first match wins.
    pub fn first_blocking_rule(
        &self,
        evaluator: &TreeEvaluator<'_>,
        context: &AppointmentContext,
    ) -> RuleResult<Option<Uuid>> {
        if let Some(rule_id) = self.cache.first_blocking_rule() {
            return Ok(Some(rule_id));
        }
        evaluator.first_blocking_rule(&self.partition.time_variant, context)
    }

    /// Cached blockers followed by every matching time-variant rule.
    pub fn blocking_rules(&self, evaluator: &TreeEvaluator<'_>, context: &AppointmentContext) -> RuleResult<Vec<Uuid>> {
        let mut blocking = self.cache.blocking_rule_ids().to_vec();
        blocking.extend(evaluator.blocking_rules(&self.partition.time_variant, context)?);
        Ok(blocking)
    }
}
