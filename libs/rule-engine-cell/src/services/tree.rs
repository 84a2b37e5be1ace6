use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use crate::error::{RuleEngineError, RuleResult};
use crate::models::{RuleCondition, RuleConditionRow};
use crate::services::validation;

/// Flat store of every node in one rule set.
///
/// Nodes live in an id-keyed arena; structure is a parent → ordered children
/// index. Roots are kept in stored order (`sort_order`, then load order).
#[derive(Debug, Clone, Default)]
pub struct ConditionTree {
    nodes: HashMap<Uuid, RuleCondition>,
    children: HashMap<Uuid, Vec<Uuid>>,
    roots: Vec<Uuid>,
}

impl ConditionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index already-persisted nodes. No structural validation happens here;
    /// malformed trees surface as errors when they are evaluated.
    pub fn from_nodes<I>(nodes: I) -> Self
    where
        I: IntoIterator<Item = RuleCondition>,
    {
        let mut tree = Self::new();
        for node in nodes {
            tree.index_node(node);
        }
        tree.sort_indices();
        tree
    }

    pub fn from_rows(rows: Vec<RuleConditionRow>) -> RuleResult<Self> {
        let nodes = rows
            .into_iter()
            .map(RuleCondition::try_from)
            .collect::<RuleResult<Vec<_>>>()?;

        let tree = Self::from_nodes(nodes);
        debug!("Loaded {} rule nodes ({} rules)", tree.len(), tree.roots.len());
        Ok(tree)
    }

    /// Validate one rule (root plus subtree) and add it atomically.
    pub fn insert_rule(&mut self, nodes: Vec<RuleCondition>, max_depth: usize) -> RuleResult<Uuid> {
        let root_id = validation::validate_rule(&nodes, max_depth)?;

        if let Some(existing) = nodes.iter().find(|node| self.nodes.contains_key(&node.id)) {
            return Err(RuleEngineError::DuplicateNode(existing.id));
        }

        for node in nodes {
            self.index_node(node);
        }
        self.sort_indices();

        debug!("Inserted rule {}", root_id);
        Ok(root_id)
    }

    fn index_node(&mut self, node: RuleCondition) {
        if node.is_root {
            self.roots.push(node.id);
        }
        if let Some(parent_id) = node.parent_id {
            self.children.entry(parent_id).or_default().push(node.id);
        }
        self.nodes.insert(node.id, node);
    }

    fn sort_indices(&mut self) {
        let nodes = &self.nodes;
        let order = |id: &Uuid| nodes.get(id).map(|node| node.sort_order).unwrap_or(i32::MAX);

        self.roots.sort_by_key(order);
        for siblings in self.children.values_mut() {
            siblings.sort_by_key(order);
        }
    }

    pub fn node(&self, id: Uuid) -> RuleResult<&RuleCondition> {
        self.nodes.get(&id).ok_or(RuleEngineError::NodeNotFound(id))
    }

    pub fn children(&self, id: Uuid) -> &[Uuid] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn root_ids(&self) -> &[Uuid] {
        &self.roots
    }

    /// Roots that participate in evaluation, in stored order.
    pub fn enabled_rule_ids(&self) -> Vec<Uuid> {
        self.roots
            .iter()
            .copied()
            .filter(|id| self.nodes.get(id).is_some_and(|node| node.enabled))
            .collect()
    }

    /// Persisted form of every reachable node: each rule's root followed by its
    /// subtree in pre-order, rules in stored order.
    pub fn to_rows(&self) -> Vec<RuleConditionRow> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<Uuid> = self.roots.iter().rev().copied().collect();

        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(&id) {
                rows.push(node.to_row());
                stack.extend(self.children(id).iter().rev().copied());
            }
        }
        rows
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
