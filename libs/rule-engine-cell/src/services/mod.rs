pub mod builder;
pub mod classifier;
pub mod condition;
pub mod evaluator;
pub mod pre_evaluator;
pub mod preload;
pub mod tree;
pub mod validation;

pub use builder::RuleExpr;
pub use classifier::{RulePartition, RuleVariance};
pub use evaluator::{check_rules, TreeEvaluator};
pub use pre_evaluator::{DayInvariantCache, DayRulePlan};
pub use preload::{day_bounds, resolve_local, PreloadedDayData};
pub use tree::ConditionTree;
