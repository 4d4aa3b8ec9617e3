//! Pluggable predicates used by traversals
//!
//! Every filter is a value that can be hashed and compared, so a traversal specification
//! built from filters can key the executor cache. A caller-supplied closure is identified
//! by its name together with the closure instance: clones of one `NamedFn` share cached
//! executors, while a second closure under the same name compiles its own.

use super::expression::PropertyExpression;
use crate::graph::{EdgeModel, EdgeType, GraphElement, GraphError, GraphResult, Label, VertexModel};
use regex::Regex;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A named caller-supplied function over a graph element
pub struct NamedFn<T: ?Sized, R> {
    name: Arc<str>,
    func: Arc<dyn Fn(&T) -> R + Send + Sync>,
}

/// Named boolean filter
pub type Predicate<T> = NamedFn<T, bool>;

impl<T: ?Sized, R> NamedFn<T, R> {
    pub fn new(name: impl Into<Arc<str>>, func: impl Fn(&T) -> R + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, value: &T) -> R {
        (self.func)(value)
    }

    fn func_address(&self) -> *const () {
        Arc::as_ptr(&self.func) as *const ()
    }
}

impl<T: ?Sized, R> Clone for NamedFn<T, R> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            func: Arc::clone(&self.func),
        }
    }
}

impl<T: ?Sized, R> PartialEq for NamedFn<T, R> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.func_address() == other.func_address()
    }
}

impl<T: ?Sized, R> Eq for NamedFn<T, R> {}

impl<T: ?Sized, R> Hash for NamedFn<T, R> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl<T: ?Sized, R> fmt::Debug for NamedFn<T, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NamedFn").field(&self.name).finish()
    }
}

/// Compiled label pattern, compared by its source text
#[derive(Clone)]
pub struct LabelPattern {
    source: String,
    regex: Regex,
}

impl LabelPattern {
    pub fn new(source: impl Into<String>) -> GraphResult<Self> {
        let source = source.into();
        let regex = Regex::new(&source)
            .map_err(|err| GraphError::Validation(format!("invalid label pattern: {}", err)))?;
        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, label: &str) -> bool {
        self.regex.is_match(label)
    }
}

impl PartialEq for LabelPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for LabelPattern {}

impl Hash for LabelPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl fmt::Debug for LabelPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LabelPattern").field(&self.source).finish()
    }
}

/// Label test on visited vertices
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LabelFilter {
    Exact(Label),
    Pattern(LabelPattern),
}

impl LabelFilter {
    pub fn exact(label: impl Into<Label>) -> Self {
        LabelFilter::Exact(label.into())
    }

    pub fn pattern(pattern: &str) -> GraphResult<Self> {
        Ok(LabelFilter::Pattern(LabelPattern::new(pattern)?))
    }

    /// Unlabelled elements never match
    pub fn accepts<E: GraphElement + ?Sized>(&self, element: &E) -> bool {
        match (self, element.label()) {
            (_, None) => false,
            (LabelFilter::Exact(expected), Some(label)) => expected == label,
            (LabelFilter::Pattern(pattern), Some(label)) => pattern.is_match(label.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VertexFilter {
    Property(PropertyExpression),
    Custom(Predicate<VertexModel>),
}

impl VertexFilter {
    /// Type mismatches count as a non-match
    pub fn accepts(&self, vertex: &VertexModel) -> bool {
        match self {
            VertexFilter::Property(expression) => expression.evaluate(vertex).unwrap_or(false),
            VertexFilter::Custom(predicate) => predicate.call(vertex),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EdgeFilter {
    /// Only follow edges of these types
    Types(Vec<EdgeType>),
    Label(Label),
    Custom(Predicate<EdgeModel>),
}

impl EdgeFilter {
    pub fn types(types: impl IntoIterator<Item = EdgeType>) -> Self {
        let mut types: Vec<EdgeType> = types.into_iter().collect();
        types.sort();
        types.dedup();
        EdgeFilter::Types(types)
    }

    pub fn accepts(&self, edge: &EdgeModel) -> bool {
        match self {
            EdgeFilter::Types(types) => types.binary_search(&edge.edge_type).is_ok(),
            EdgeFilter::Label(label) => edge.label.as_ref() == Some(label),
            EdgeFilter::Custom(predicate) => predicate.call(edge),
        }
    }

    /// Edge types this filter limits the walk to, if it does
    pub fn edge_types(&self) -> Option<&[EdgeType]> {
        match self {
            EdgeFilter::Types(types) => Some(types),
            _ => None,
        }
    }
}

/// Filters applied while walking; all present filters must accept
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TraversalFilters {
    pub vertex: Option<VertexFilter>,
    pub edge: Option<EdgeFilter>,
    pub edge_property: Option<PropertyExpression>,
    pub label: Option<LabelFilter>,
}

impl TraversalFilters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_vertex(mut self, filter: VertexFilter) -> Self {
        self.vertex = Some(filter);
        self
    }

    pub fn with_edge(mut self, filter: EdgeFilter) -> Self {
        self.edge = Some(filter);
        self
    }

    pub fn with_edge_property(mut self, expression: PropertyExpression) -> Self {
        self.edge_property = Some(expression);
        self
    }

    pub fn with_label(mut self, filter: LabelFilter) -> Self {
        self.label = Some(filter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.vertex.is_none() && self.edge.is_none() && self.edge_property.is_none() && self.label.is_none()
    }

    pub fn accepts_vertex(&self, vertex: &VertexModel) -> bool {
        self.vertex.as_ref().map_or(true, |filter| filter.accepts(vertex))
            && self.label.as_ref().map_or(true, |filter| filter.accepts(vertex))
    }

    pub fn accepts_edge(&self, edge: &EdgeModel) -> bool {
        self.edge.as_ref().map_or(true, |filter| filter.accepts(edge))
            && self
                .edge_property
                .as_ref()
                .map_or(true, |expression| expression.evaluate(edge).unwrap_or(false))
    }
}
