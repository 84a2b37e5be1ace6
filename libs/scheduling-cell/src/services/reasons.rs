use std::collections::HashMap;

use tracing::{debug, warn};
use uuid::Uuid;

use rule_engine_cell::{ConditionTree, NodeKind, RuleEngineError};

use crate::error::SchedulingError;
use crate::models::TimeSlot;

pub const GENERIC_BLOCK_REASON: &str = "Not available for this appointment";

/// Turns a blocking rule into text for staff and patients.
#[cfg_attr(test, mockall::automock)]
pub trait BlockReasonProvider: Send + Sync {
    fn describe(&self, tree: &ConditionTree, rule_id: Uuid) -> Result<String, SchedulingError>;
}

/// Names the condition types a rule tests, in tree order.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleSummaryReasons;

impl BlockReasonProvider for RuleSummaryReasons {
    fn describe(&self, tree: &ConditionTree, rule_id: Uuid) -> Result<String, SchedulingError> {
        let mut kinds: Vec<&'static str> = Vec::new();
        let mut stack = vec![rule_id];
        let mut visited = 0usize;

        while let Some(node_id) = stack.pop() {
            visited += 1;
            if visited > tree.len() {
                return Err(RuleEngineError::CycleDetected(node_id).into());
            }
            match &tree.node(node_id)?.kind {
                NodeKind::Condition(condition) => {
                    let kind = condition.condition_type().as_str();
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                NodeKind::And | NodeKind::Not => stack.extend(tree.children(node_id).iter().rev().copied()),
            }
        }

        if kinds.is_empty() {
            return Ok(GENERIC_BLOCK_REASON.to_string());
        }
        Ok(format!("Blocked by clinic rule ({})", kinds.join(", ")))
    }
}

/// Fill `blocked_reason` on rule-blocked slots, asking the provider once per rule.
///
/// Manual blocks keep the text they already carry. A provider error only
/// changes the wording.
pub fn annotate_blocked_slots(provider: &dyn BlockReasonProvider, tree: &ConditionTree, slots: &mut [TimeSlot]) {
    let mut reasons: HashMap<Uuid, String> = HashMap::new();

    for slot in slots.iter_mut() {
        let Some(rule_id) = slot.blocked_by_rule_id else {
            if slot.blocked_by_manual_block_id.is_some() && slot.blocked_reason.is_none() {
                slot.blocked_reason = Some(GENERIC_BLOCK_REASON.to_string());
            }
            continue;
        };

        let reason = reasons.entry(rule_id).or_insert_with(|| {
            provider.describe(tree, rule_id).unwrap_or_else(|err| {
                warn!("Could not describe blocking rule {}: {}", rule_id, err);
                GENERIC_BLOCK_REASON.to_string()
            })
        });
        slot.blocked_reason = Some(reason.clone());
    }

    debug!("Annotated blocked slots with {} distinct rule reasons", reasons.len());
}
