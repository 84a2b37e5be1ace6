use uuid::Uuid;

use crate::models::{Condition, NodeKind, RuleCondition};

/// Nested authoring form of a rule body, flattened into stored nodes by
/// [`RuleNodeFactory::rule`].
#[derive(Debug, Clone, PartialEq)]
pub enum RuleExpr {
    And(Vec<RuleExpr>),
    Not(Box<RuleExpr>),
    Leaf(Condition),
}

impl RuleExpr {
    pub fn and(children: Vec<RuleExpr>) -> Self {
        RuleExpr::And(children)
    }

    pub fn not(child: RuleExpr) -> Self {
        RuleExpr::Not(Box::new(child))
    }

    pub fn leaf(condition: Condition) -> Self {
        RuleExpr::Leaf(condition)
    }

    /// `a OR b` written as `NOT(AND(NOT a, NOT b))`; there is no OR node.
    pub fn any(children: Vec<RuleExpr>) -> Self {
        RuleExpr::not(RuleExpr::and(children.into_iter().map(RuleExpr::not).collect()))
    }
}

/// Mints stored nodes for one tenant and rule-set version.
#[derive(Debug, Clone, Copy)]
pub struct RuleNodeFactory {
    pub tenant_id: Uuid,
    pub rule_set_id: Uuid,
}

impl RuleNodeFactory {
    pub fn new(tenant_id: Uuid, rule_set_id: Uuid) -> Self {
        Self { tenant_id, rule_set_id }
    }

    pub fn node(&self, parent_id: Option<Uuid>, sort_order: i32, kind: NodeKind) -> RuleCondition {
        RuleCondition {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            rule_set_id: self.rule_set_id,
            is_root: false,
            enabled: true,
            parent_id,
            sort_order,
            kind,
        }
    }

    pub fn root(&self, sort_order: i32, enabled: bool) -> RuleCondition {
        RuleCondition {
            is_root: true,
            enabled,
            ..self.node(None, sort_order, NodeKind::And)
        }
    }

    /// Root node first, then the body in pre-order.
    pub fn rule(&self, sort_order: i32, enabled: bool, body: RuleExpr) -> Vec<RuleCondition> {
        let root = self.root(sort_order, enabled);
        let root_id = root.id;
        let mut nodes = vec![root];
        self.flatten(&body, root_id, 0, &mut nodes);
        nodes
    }

    fn flatten(&self, expr: &RuleExpr, parent_id: Uuid, sort_order: i32, out: &mut Vec<RuleCondition>) {
        match expr {
            RuleExpr::Leaf(condition) => {
                out.push(self.node(Some(parent_id), sort_order, NodeKind::Condition(condition.clone())));
            }
            RuleExpr::Not(child) => {
                let node = self.node(Some(parent_id), sort_order, NodeKind::Not);
                let id = node.id;
                out.push(node);
                self.flatten(child, id, 0, out);
            }
            RuleExpr::And(children) => {
                let node = self.node(Some(parent_id), sort_order, NodeKind::And);
                let id = node.id;
                out.push(node);
                for (position, child) in children.iter().enumerate() {
                    self.flatten(child, id, position as i32, out);
                }
            }
        }
    }
}
