//! Property scans, filters and cost functions
//!
//! Comparison expressions drive [`GraphScanner`]; the same expressions plus
//! caller-supplied predicates make up the [`TraversalFilters`] and cost functions that
//! path traversals are specified with.

pub mod cost;
pub mod engine;
pub mod expression;
pub mod filters;
pub mod operator;

pub use cost::{CostFn, EdgeCost, VertexCost};
pub use engine::{GraphScanner, ScanTarget, ScannedElement};
pub use expression::{MismatchPolicy, PropertyExpression};
pub use filters::{
    EdgeFilter, LabelFilter, LabelPattern, NamedFn, Predicate, TraversalFilters, VertexFilter,
};
pub use operator::BinaryOperator;
