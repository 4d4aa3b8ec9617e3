//! Binary comparison operators

use crate::graph::{GraphError, GraphResult, PropertyValue};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    Equals,
    Greater,
    GreaterOrEquals,
    Lower,
    LowerOrEquals,
    NotEquals,
}

impl BinaryOperator {
    pub const ALL: [BinaryOperator; 6] = [
        BinaryOperator::Equals,
        BinaryOperator::Greater,
        BinaryOperator::GreaterOrEquals,
        BinaryOperator::Lower,
        BinaryOperator::LowerOrEquals,
        BinaryOperator::NotEquals,
    ];

    /// Whether the operator needs an ordering rather than plain equality
    pub fn is_ordering(self) -> bool {
        !matches!(self, BinaryOperator::Equals | BinaryOperator::NotEquals)
    }

    /// Apply the operator to `left <op> right`.
    ///
    /// Values of incompatible kinds are a [`GraphError::TypeMismatch`]. So is an
    /// ordering operator on kinds that have no ordering (null, arrays, maps). Numeric
    /// values that do not compare (NaN) only satisfy `NotEquals`.
    pub fn evaluate(self, left: &PropertyValue, right: &PropertyValue) -> GraphResult<bool> {
        let ordering = left
            .compare(right)
            .map_err(|(left, right)| GraphError::TypeMismatch { left, right })?;

        if self.is_ordering() && !is_ordered_kind(left) {
            return Err(GraphError::TypeMismatch {
                left: left.type_name(),
                right: right.type_name(),
            });
        }

        let Some(ordering) = ordering else {
            return Ok(self == BinaryOperator::NotEquals);
        };

        Ok(match self {
            BinaryOperator::Equals => ordering == Ordering::Equal,
            BinaryOperator::NotEquals => ordering != Ordering::Equal,
            BinaryOperator::Greater => ordering == Ordering::Greater,
            BinaryOperator::GreaterOrEquals => ordering != Ordering::Less,
            BinaryOperator::Lower => ordering == Ordering::Less,
            BinaryOperator::LowerOrEquals => ordering != Ordering::Greater,
        })
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Equals => "==",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterOrEquals => ">=",
            BinaryOperator::Lower => "<",
            BinaryOperator::LowerOrEquals => "<=",
            BinaryOperator::NotEquals => "!=",
        }
    }
}

fn is_ordered_kind(value: &PropertyValue) -> bool {
    !matches!(
        value,
        PropertyValue::Null | PropertyValue::Array(_) | PropertyValue::Map(_)
    )
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
