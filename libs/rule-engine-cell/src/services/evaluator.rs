use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{RuleEngineError, RuleResult};
use crate::models::{AppointmentContext, NodeKind, NodeType, RuleCheckResult};
use crate::services::condition::evaluate_condition;
use crate::services::preload::PreloadedDayData;
use crate::services::tree::ConditionTree;

/// Recursive AND/NOT evaluation over a loaded rule set and one day's snapshot.
///
/// Cheap to construct; holds only shared references. Evaluation never
/// mutates anything, so one evaluator can serve every slot of a query.
#[derive(Debug, Clone, Copy)]
pub struct TreeEvaluator<'a> {
    tree: &'a ConditionTree,
    preloaded: &'a PreloadedDayData,
}

impl<'a> TreeEvaluator<'a> {
    pub fn new(tree: &'a ConditionTree, preloaded: &'a PreloadedDayData) -> Self {
        Self { tree, preloaded }
    }

    pub fn tree(&self) -> &'a ConditionTree {
        self.tree
    }

    pub fn preloaded(&self) -> &'a PreloadedDayData {
        self.preloaded
    }

    /// `true` means the rule rooted (or subtree headed) at `node_id` blocks.
    pub fn evaluate(&self, node_id: Uuid, context: &AppointmentContext) -> RuleResult<bool> {
        self.evaluate_at_depth(node_id, context, 0)
    }

    fn evaluate_at_depth(&self, node_id: Uuid, context: &AppointmentContext, depth: usize) -> RuleResult<bool> {
        // Trees are validated acyclic on write; this only stops a corrupted store
        // from overflowing the stack.
        if depth > self.tree.len() {
            return Err(RuleEngineError::CycleDetected(node_id));
        }

        let node = self.tree.node(node_id)?;
        match &node.kind {
            NodeKind::Condition(condition) => {
                let result = evaluate_condition(condition, context, self.preloaded);
                trace!("{} leaf {} -> {}", condition.condition_type(), node_id, result);
                Ok(result)
            }
            NodeKind::And => {
                let children = self.tree.children(node_id);
                if children.is_empty() {
                    return Err(RuleEngineError::InvalidChildCount {
                        node_id,
                        node_type: NodeType::And,
                        count: 0,
                    });
                }
                for child_id in children {
                    if !self.evaluate_at_depth(*child_id, context, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            NodeKind::Not => match self.tree.children(node_id) {
                [child_id] => Ok(!self.evaluate_at_depth(*child_id, context, depth + 1)?),
                children => Err(RuleEngineError::InvalidChildCount {
                    node_id,
                    node_type: NodeType::Not,
                    count: children.len(),
                }),
            },
        }
    }

    /// First rule in `rule_ids` (in order) that blocks the context.
    pub fn first_blocking_rule(&self, rule_ids: &[Uuid], context: &AppointmentContext) -> RuleResult<Option<Uuid>> {
        for rule_id in rule_ids {
            if self.evaluate(*rule_id, context)? {
                return Ok(Some(*rule_id));
            }
        }
        Ok(None)
    }

    /// Every enabled rule that blocks the context, in stored order.
    pub fn blocking_rules(&self, rule_ids: &[Uuid], context: &AppointmentContext) -> RuleResult<Vec<Uuid>> {
        let mut blocking = Vec::new();
        for rule_id in rule_ids {
            if self.evaluate(*rule_id, context)? {
                blocking.push(*rule_id);
            }
        }
        Ok(blocking)
    }

    /// Ad-hoc booking check against all enabled rules of the set.
    pub fn check(&self, context: &AppointmentContext) -> RuleResult<RuleCheckResult> {
        let rule_ids = self.tree.enabled_rule_ids();
        let blocked_by_rule_ids = self.blocking_rules(&rule_ids, context)?;

        debug!(
            "Checked {} rules for {} with {} at {}: {} blocking",
            rule_ids.len(),
            context.appointment_type_id,
            context.practitioner_id,
            context.start,
            blocked_by_rule_ids.len()
        );

        Ok(RuleCheckResult {
            is_blocked: !blocked_by_rule_ids.is_empty(),
            blocked_by_rule_ids,
        })
    }
}

/// Ad-hoc check of every enabled rule in `tree`; reports all matches.
pub fn check_rules(
    tree: &ConditionTree,
    context: &AppointmentContext,
    preloaded: &PreloadedDayData,
) -> RuleResult<RuleCheckResult> {
    TreeEvaluator::new(tree, preloaded).check(context)
}
