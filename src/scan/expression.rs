//! Property comparison expressions

use super::operator::BinaryOperator;
use crate::graph::{GraphElement, GraphResult, PropertyId, PropertyValue};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a scan does when a comparison reports a type mismatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MismatchPolicy {
    /// Treat the element as a non-match and keep scanning
    #[default]
    Skip,
    /// Stop the scan and return the mismatch
    Abort,
}

/// `property <operator> literal`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyExpression {
    pub property_id: PropertyId,
    pub operator: BinaryOperator,
    pub literal: PropertyValue,
}

impl PropertyExpression {
    pub fn new(
        property_id: impl Into<PropertyId>,
        operator: BinaryOperator,
        literal: impl Into<PropertyValue>,
    ) -> Self {
        Self {
            property_id: property_id.into(),
            operator,
            literal: literal.into(),
        }
    }

    pub fn equals(property_id: impl Into<PropertyId>, literal: impl Into<PropertyValue>) -> Self {
        Self::new(property_id, BinaryOperator::Equals, literal)
    }

    /// Evaluate against one element. An element without the property does not match.
    pub fn evaluate<E: GraphElement + ?Sized>(&self, element: &E) -> GraphResult<bool> {
        match element.property(self.property_id) {
            Some(value) => self.operator.evaluate(value, &self.literal),
            None => Ok(false),
        }
    }

    /// Evaluate and fold a mismatch according to `policy`
    pub fn matches<E: GraphElement + ?Sized>(
        &self,
        element: &E,
        policy: MismatchPolicy,
    ) -> GraphResult<bool> {
        match self.evaluate(element) {
            Ok(matched) => Ok(matched),
            Err(err) if err.is_type_mismatch() && policy == MismatchPolicy::Skip => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl fmt::Display for PropertyExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.property_id, self.operator, self.literal)
    }
}
