//! B-Tree based property index keyed by value

use crate::graph::{ElementId, PropertyValue};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

/// One named index: value -> elements carrying it
#[derive(Debug, Clone, Default)]
pub struct PropertyIndex {
    /// Value -> set of elements
    index: BTreeMap<PropertyValue, BTreeSet<ElementId>>,
    /// Element -> the value it is currently indexed under
    keys: HashMap<ElementId, PropertyValue>,
}

impl PropertyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `element` under `key`, moving it if it was indexed under another value.
    ///
    /// Returns the previous key.
    pub fn add_or_update(&mut self, key: PropertyValue, element: ElementId) -> Option<PropertyValue> {
        let previous = self.remove_element(element);
        self.index.entry(key.clone()).or_default().insert(element);
        self.keys.insert(element, key);
        previous
    }

    pub fn remove_element(&mut self, element: ElementId) -> Option<PropertyValue> {
        let key = self.keys.remove(&element)?;
        if let Some(elements) = self.index.get_mut(&key) {
            elements.remove(&element);
            if elements.is_empty() {
                self.index.remove(&key);
            }
        }
        Some(key)
    }

    pub fn get(&self, value: &PropertyValue) -> Vec<ElementId> {
        self.index
            .get(value)
            .map(|elements| elements.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn key_of(&self, element: ElementId) -> Option<&PropertyValue> {
        self.keys.get(&element)
    }

    /// Elements whose key lies between the bounds, in key order
    pub fn range(&self, lower: Bound<&PropertyValue>, upper: Bound<&PropertyValue>) -> Vec<ElementId> {
        if is_empty_range(lower, upper) {
            return Vec::new();
        }
        self.index
            .range::<PropertyValue, _>((lower, upper))
            .flat_map(|(_, elements)| elements.iter().copied())
            .collect()
    }

    /// Iterate keys with their elements, in key order
    pub fn entries(&self) -> impl Iterator<Item = (&PropertyValue, &BTreeSet<ElementId>)> {
        self.index.iter()
    }

    /// Number of indexed elements
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_count(&self) -> usize {
        self.index.len()
    }
}

/// `BTreeMap::range` panics on inverted bounds; those select nothing here
fn is_empty_range(lower: Bound<&PropertyValue>, upper: Bound<&PropertyValue>) -> bool {
    match (lower, upper) {
        (Bound::Included(l), Bound::Included(u)) => l > u,
        (Bound::Included(l), Bound::Excluded(u))
        | (Bound::Excluded(l), Bound::Included(u)) => l >= u,
        (Bound::Excluded(l), Bound::Excluded(u)) => l >= u,
        _ => false,
    }
}
