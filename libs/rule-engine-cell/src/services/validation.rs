use std::collections::{HashMap, HashSet};

use tracing::warn;
use uuid::Uuid;

use crate::error::{RuleEngineError, RuleResult};
use crate::models::{NodeKind, NodeType, RuleCondition};

/// Write-time structural check for one rule (a root and its whole subtree).
///
/// Returns the root id. Enforces: single root, shared tenant and rule set,
/// every node reachable, no cycles, depth within `max_depth` (root = 1), and
/// the child-count invariants (root 1, AND ≥ 1, NOT 1, CONDITION 0).
pub fn validate_rule(nodes: &[RuleCondition], max_depth: usize) -> RuleResult<Uuid> {
    let mut by_id: HashMap<Uuid, &RuleCondition> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        if by_id.insert(node.id, node).is_some() {
            return Err(RuleEngineError::DuplicateNode(node.id));
        }
    }

    let roots: Vec<&RuleCondition> = nodes.iter().filter(|node| node.is_root).collect();
    let root = match roots.as_slice() {
        [] => return Err(RuleEngineError::MissingRoot),
        [root] => *root,
        many => return Err(RuleEngineError::MultipleRoots(many.iter().map(|node| node.id).collect())),
    };
    if root.parent_id.is_some() {
        return Err(RuleEngineError::InvalidValue {
            node_id: root.id,
            reason: "root node has a parent".to_string(),
        });
    }

    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for node in nodes {
        if node.tenant_id != root.tenant_id || node.rule_set_id != root.rule_set_id {
            return Err(RuleEngineError::ScopeMismatch { node_id: node.id });
        }
        if node.is_root {
            continue;
        }
        match node.parent_id {
            Some(parent_id) if by_id.contains_key(&parent_id) => {
                children.entry(parent_id).or_default().push(node.id);
            }
            _ => return Err(RuleEngineError::OrphanNode(node.id)),
        }
    }

    let mut visited: HashSet<Uuid> = HashSet::with_capacity(nodes.len());
    let mut stack = vec![(root.id, 1usize)];

    while let Some((node_id, depth)) = stack.pop() {
        if !visited.insert(node_id) {
            return Err(RuleEngineError::CycleDetected(node_id));
        }
        if depth > max_depth {
            warn!("Rule {} rejected: depth {} exceeds {}", root.id, depth, max_depth);
            return Err(RuleEngineError::DepthExceeded { root_id: root.id, max_depth });
        }

        let node = by_id[&node_id];
        let child_ids = children.get(&node_id).map(Vec::as_slice).unwrap_or(&[]);
        check_child_count(node, child_ids.len())?;

        stack.extend(child_ids.iter().map(|child_id| (*child_id, depth + 1)));
    }

    // Anything not reached hangs off a cycle detached from the root.
    if let Some(unreached) = nodes.iter().find(|node| !visited.contains(&node.id)) {
        return Err(RuleEngineError::OrphanNode(unreached.id));
    }

    Ok(root.id)
}

fn check_child_count(node: &RuleCondition, count: usize) -> RuleResult<()> {
    let valid = if node.is_root {
        count == 1
    } else {
        match node.kind {
            NodeKind::And => count >= 1,
            NodeKind::Not => count == 1,
            NodeKind::Condition(_) => count == 0,
        }
    };

    if valid {
        Ok(())
    } else {
        Err(RuleEngineError::InvalidChildCount {
            node_id: node.id,
            node_type: if node.is_root { NodeType::And } else { node.node_type() },
            count,
        })
    }
}
