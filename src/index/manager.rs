//! Manager for named property indices
//!
//! Handles creation, deletion, and access to property indices. Elements are added to
//! an index explicitly; the store only removes them again when the element goes away.

use super::property_index::PropertyIndex;
use crate::graph::{ElementId, GraphError, GraphResult, PropertyValue};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Bound;
use std::sync::Arc;

/// Persisted form of one index: keys and their element sets as parallel sequences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexImage {
    pub name: String,
    pub keys: Vec<PropertyValue>,
    pub elements: Vec<Vec<ElementId>>,
}

/// Manager for all property indices
#[derive(Debug, Default)]
pub struct IndexManager {
    indices: RwLock<HashMap<String, Arc<RwLock<PropertyIndex>>>>,
}

impl IndexManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_index(&self, name: impl Into<String>) -> GraphResult<()> {
        let name = name.into();
        let mut indices = self.indices.write();
        if indices.contains_key(&name) {
            return Err(GraphError::DuplicateIndex(name));
        }
        indices.insert(name, Arc::new(RwLock::new(PropertyIndex::new())));
        Ok(())
    }

    pub fn drop_index(&self, name: &str) -> GraphResult<()> {
        self.indices
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| GraphError::IndexNotFound(name.to_string()))
    }

    pub fn has_index(&self, name: &str) -> bool {
        self.indices.read().contains_key(name)
    }

    /// Index names, sorted
    pub fn index_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indices.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Get index for querying
    pub fn get_index(&self, name: &str) -> GraphResult<Arc<RwLock<PropertyIndex>>> {
        self.indices
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| GraphError::IndexNotFound(name.to_string()))
    }

    pub fn add_or_update(&self, name: &str, key: PropertyValue, element: ElementId) -> GraphResult<()> {
        self.get_index(name)?.write().add_or_update(key, element);
        Ok(())
    }

    pub fn remove(&self, name: &str, element: ElementId) -> GraphResult<bool> {
        Ok(self.get_index(name)?.write().remove_element(element).is_some())
    }

    /// Drop `element` from every index
    pub fn remove_element(&self, element: ElementId) {
        for index in self.indices.read().values() {
            index.write().remove_element(element);
        }
    }

    pub fn lookup(&self, name: &str, key: &PropertyValue) -> GraphResult<Vec<ElementId>> {
        Ok(self.get_index(name)?.read().get(key))
    }

    /// Range lookup; a missing bound is open
    pub fn range(
        &self,
        name: &str,
        lower: Option<&PropertyValue>,
        upper: Option<&PropertyValue>,
        include_lower: bool,
        include_upper: bool,
    ) -> GraphResult<Vec<ElementId>> {
        let lower = to_bound(lower, include_lower);
        let upper = to_bound(upper, include_upper);
        Ok(self.get_index(name)?.read().range(lower, upper))
    }

    pub fn clear(&self) {
        self.indices.write().clear();
    }

    /// Snapshot every index, sorted by name
    pub fn export(&self) -> Vec<IndexImage> {
        let indices = self.indices.read();
        let mut images: Vec<IndexImage> = indices
            .iter()
            .map(|(name, index)| {
                let index = index.read();
                let (keys, elements) = index
                    .entries()
                    .map(|(key, set)| (key.clone(), set.iter().copied().collect::<Vec<_>>()))
                    .unzip();
                IndexImage {
                    name: name.clone(),
                    keys,
                    elements,
                }
            })
            .collect();
        images.sort_by(|a, b| a.name.cmp(&b.name));
        images
    }

    /// Rebuild indices from images; validates before replacing anything
    pub fn install(&self, images: Vec<IndexImage>) -> GraphResult<()> {
        let mut rebuilt = HashMap::with_capacity(images.len());
        for image in images {
            if image.keys.len() != image.elements.len() {
                return Err(GraphError::Validation(format!(
                    "index '{}' has {} keys but {} element sets",
                    image.name,
                    image.keys.len(),
                    image.elements.len()
                )));
            }
            let mut index = PropertyIndex::new();
            for (key, elements) in image.keys.into_iter().zip(image.elements) {
                for element in elements {
                    if index.add_or_update(key.clone(), element).is_some() {
                        return Err(GraphError::Validation(format!(
                            "index '{}' lists {} under more than one key",
                            image.name, element
                        )));
                    }
                }
            }
            if rebuilt
                .insert(image.name.clone(), Arc::new(RwLock::new(index)))
                .is_some()
            {
                return Err(GraphError::DuplicateIndex(image.name));
            }
        }
        *self.indices.write() = rebuilt;
        Ok(())
    }
}

fn to_bound(value: Option<&PropertyValue>, inclusive: bool) -> Bound<&PropertyValue> {
    match value {
        None => Bound::Unbounded,
        Some(value) if inclusive => Bound::Included(value),
        Some(value) => Bound::Excluded(value),
    }
}
