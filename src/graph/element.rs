//! Behaviour shared by vertices and edges

use super::property::{Properties, PropertyValue};
use super::types::{ElementId, Label, PropertyId, Timestamp};

/// Common surface of every stored element
pub trait GraphElement {
    fn element_id(&self) -> ElementId;

    fn label(&self) -> Option<&Label>;

    fn creation_timestamp(&self) -> Timestamp;

    fn modification_timestamp(&self) -> Timestamp;

    fn properties(&self) -> &Properties;

    fn properties_mut(&mut self) -> &mut Properties;

    /// Record a mutation time
    fn touch(&mut self, at: Timestamp);

    fn property(&self, property_id: PropertyId) -> Option<&PropertyValue> {
        self.properties().get(property_id)
    }

    fn has_label(&self, label: &str) -> bool {
        self.label().is_some_and(|l| l.as_str() == label)
    }
}

/// Implements [`GraphElement`] for a model with the standard header fields
macro_rules! impl_graph_element {
    ($model:ty, $variant:ident) => {
        impl $crate::graph::element::GraphElement for $model {
            fn element_id(&self) -> $crate::graph::types::ElementId {
                $crate::graph::types::ElementId::$variant(self.id)
            }

            fn label(&self) -> Option<&$crate::graph::types::Label> {
                self.label.as_ref()
            }

            fn creation_timestamp(&self) -> $crate::graph::types::Timestamp {
                self.creation_timestamp
            }

            fn modification_timestamp(&self) -> $crate::graph::types::Timestamp {
                self.modification_timestamp
            }

            fn properties(&self) -> &$crate::graph::property::Properties {
                &self.properties
            }

            fn properties_mut(&mut self) -> &mut $crate::graph::property::Properties {
                &mut self.properties
            }

            fn touch(&mut self, at: $crate::graph::types::Timestamp) {
                self.modification_timestamp = at;
            }
        }
    };
}

pub(crate) use impl_graph_element;
