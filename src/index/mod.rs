//! Property Indexing module
//!
//! Provides named B-Tree indices from property values to elements.

pub mod manager;
pub mod property_index;

pub use manager::{IndexImage, IndexManager};
pub use property_index::PropertyIndex;
