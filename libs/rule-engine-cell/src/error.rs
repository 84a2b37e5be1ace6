use thiserror::Error;
use uuid::Uuid;

use crate::models::{ConditionType, NodeType, Operator};

/// Structural problems with a stored rule tree.
///
/// Every variant is fatal for the rule (and the query evaluating it). A malformed
/// blocking rule is never treated as "does not match".
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleEngineError {
    #[error("Rule node not found: {0}")]
    NodeNotFound(Uuid),

    #[error("{node_type} node {node_id} has {count} children")]
    InvalidChildCount {
        node_id: Uuid,
        node_type: NodeType,
        count: usize,
    },

    #[error("Unknown node type '{value}' on node {node_id}")]
    UnknownNodeType { node_id: Uuid, value: String },

    #[error("Unknown condition type '{value}' on node {node_id}")]
    UnknownConditionType { node_id: Uuid, value: String },

    #[error("Unknown operator '{value}' on node {node_id}")]
    UnknownOperator { node_id: Uuid, value: String },

    #[error("Operator {operator} is not valid for {condition_type} on node {node_id}")]
    UnsupportedOperator {
        node_id: Uuid,
        condition_type: ConditionType,
        operator: Operator,
    },

    #[error("Condition node {node_id} is missing {field}")]
    MissingField { node_id: Uuid, field: &'static str },

    #[error("Invalid value on node {node_id}: {reason}")]
    InvalidValue { node_id: Uuid, reason: String },

    #[error("Rule has no root node")]
    MissingRoot,

    #[error("Rule has more than one root node: {0:?}")]
    MultipleRoots(Vec<Uuid>),

    #[error("Rule node {0} appears more than once")]
    DuplicateNode(Uuid),

    #[error("Rule {root_id} exceeds maximum depth {max_depth}")]
    DepthExceeded { root_id: Uuid, max_depth: usize },

    #[error("Cycle detected at rule node {0}")]
    CycleDetected(Uuid),

    #[error("Rule node {0} is not reachable from its root")]
    OrphanNode(Uuid),

    #[error("Rule node {node_id} belongs to a different tenant or rule set than its root")]
    ScopeMismatch { node_id: Uuid },
}

pub type RuleResult<T> = std::result::Result<T, RuleEngineError>;
