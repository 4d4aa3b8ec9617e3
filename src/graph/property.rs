//! Property values and the per-element property sequence

use super::types::PropertyId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Typed scalar (or container) stored under a property id
///
/// Supports:
/// - String
/// - Integer (i64)
/// - Float (f64)
/// - Boolean
/// - DateTime (unix milliseconds)
/// - Array (Vec<PropertyValue>)
/// - Map (key/value bag, persisted as parallel key and value sequences)
///
/// `Eq`/`Ord`/`Hash` form a total order (kind first, then value; floats by `total_cmp`)
/// so values can key an index. Scan comparisons use [`PropertyValue::compare`] instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    DateTime(i64),
    String(String),
    Array(Vec<PropertyValue>),
    #[serde(with = "parallel_map")]
    Map(IndexMap<String, PropertyValue>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            PropertyValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<i64> {
        match self {
            PropertyValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<PropertyValue>> {
        match self {
            PropertyValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<String, PropertyValue>> {
        match self {
            PropertyValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Numeric view used by cost functions (integers widen to f64)
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Integer(i) => Some(*i as f64),
            PropertyValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Null => "Null",
            PropertyValue::Boolean(_) => "Boolean",
            PropertyValue::Integer(_) => "Integer",
            PropertyValue::Float(_) => "Float",
            PropertyValue::DateTime(_) => "DateTime",
            PropertyValue::String(_) => "String",
            PropertyValue::Array(_) => "Array",
            PropertyValue::Map(_) => "Map",
        }
    }

    /// Natural comparison between two values.
    ///
    /// Integers and floats compare numerically with each other, strings lexicographically.
    /// Booleans, datetimes, arrays and maps only compare with their own kind; arrays and
    /// maps have no ordering and report `None` when they differ. Any other pairing is a
    /// type mismatch, returned as the two kind names.
    pub fn compare(&self, other: &PropertyValue) -> Result<Option<Ordering>, (&'static str, &'static str)> {
        use PropertyValue::*;
        let ordering = match (self, other) {
            (Null, Null) => Some(Ordering::Equal),
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Integer(a), Integer(b)) => Some(a.cmp(b)),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (String(a), String(b)) => Some(a.cmp(b)),
            (Array(a), Array(b)) => (a == b).then_some(Ordering::Equal),
            (Map(a), Map(b)) => (map_cmp(a, b) == Ordering::Equal).then_some(Ordering::Equal),
            _ => return Err((self.type_name(), other.type_name())),
        };
        Ok(ordering)
    }

    fn kind_rank(&self) -> u8 {
        match self {
            PropertyValue::Null => 0,
            PropertyValue::Boolean(_) => 1,
            PropertyValue::Integer(_) => 2,
            PropertyValue::Float(_) => 3,
            PropertyValue::DateTime(_) => 4,
            PropertyValue::String(_) => 5,
            PropertyValue::Array(_) => 6,
            PropertyValue::Map(_) => 7,
        }
    }
}

fn map_cmp(a: &IndexMap<String, PropertyValue>, b: &IndexMap<String, PropertyValue>) -> Ordering {
    a.iter().cmp(b.iter())
}

impl PartialEq for PropertyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PropertyValue {}

impl PartialOrd for PropertyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PropertyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use PropertyValue::*;
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (DateTime(a), DateTime(b)) => a.cmp(b),
            (String(a), String(b)) => a.cmp(b),
            (Array(a), Array(b)) => a.cmp(b),
            (Map(a), Map(b)) => map_cmp(a, b),
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }
}

impl Hash for PropertyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind_rank().hash(state);
        match self {
            PropertyValue::Null => {}
            PropertyValue::Boolean(b) => b.hash(state),
            PropertyValue::Integer(i) => i.hash(state),
            PropertyValue::Float(f) => f.to_bits().hash(state),
            PropertyValue::DateTime(dt) => dt.hash(state),
            PropertyValue::String(s) => s.hash(state),
            PropertyValue::Array(arr) => arr.hash(state),
            PropertyValue::Map(map) => {
                map.len().hash(state);
                for (key, value) in map {
                    key.hash(state);
                    value.hash(state);
                }
            }
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => write!(f, "\"{}\"", s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Float(fl) => write!(f, "{}", fl),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::DateTime(dt) => write!(f, "DateTime({})", dt),
            PropertyValue::Array(arr) => {
                write!(f, "[")?;
                for (i, val) in arr.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", val)?;
                }
                write!(f, "]")
            }
            PropertyValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, val)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, val)?;
                }
                write!(f, "}}")
            }
            PropertyValue::Null => write!(f, "null"),
        }
    }
}

// Convenience conversions
impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        PropertyValue::String(s)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        PropertyValue::String(s.to_string())
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        PropertyValue::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        PropertyValue::Integer(i as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(f: f64) -> Self {
        PropertyValue::Float(f)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        PropertyValue::Boolean(b)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(arr: Vec<PropertyValue>) -> Self {
        PropertyValue::Array(arr)
    }
}

impl From<IndexMap<String, PropertyValue>> for PropertyValue {
    fn from(map: IndexMap<String, PropertyValue>) -> Self {
        PropertyValue::Map(map)
    }
}

/// Key/value bags go on the wire as a key sequence followed by a value sequence
mod parallel_map {
    use super::PropertyValue;
    use indexmap::IndexMap;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(map: &IndexMap<String, PropertyValue>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let keys: Vec<&String> = map.keys().collect();
        let values: Vec<&PropertyValue> = map.values().collect();
        (keys, values).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<IndexMap<String, PropertyValue>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (keys, values): (Vec<String>, Vec<PropertyValue>) = Deserialize::deserialize(deserializer)?;
        if keys.len() != values.len() {
            return Err(D::Error::custom(format!(
                "map has {} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        Ok(keys.into_iter().zip(values).collect())
    }
}

/// One property slot of an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyContainer {
    pub property_id: PropertyId,
    pub value: PropertyValue,
}

impl PropertyContainer {
    pub fn new(property_id: impl Into<PropertyId>, value: impl Into<PropertyValue>) -> Self {
        Self {
            property_id: property_id.into(),
            value: value.into(),
        }
    }
}

/// Ordered property sequence of one element; lookup is a linear scan by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Properties(Vec<PropertyContainer>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, property_id: PropertyId) -> Option<&PropertyValue> {
        self.0
            .iter()
            .find(|p| p.property_id == property_id)
            .map(|p| &p.value)
    }

    /// Set a property, returning the value it replaced
    pub fn set(&mut self, property_id: PropertyId, value: PropertyValue) -> Option<PropertyValue> {
        match self.0.iter_mut().find(|p| p.property_id == property_id) {
            Some(slot) => Some(std::mem::replace(&mut slot.value, value)),
            None => {
                self.0.push(PropertyContainer { property_id, value });
                None
            }
        }
    }

    pub fn remove(&mut self, property_id: PropertyId) -> Option<PropertyValue> {
        let position = self.0.iter().position(|p| p.property_id == property_id)?;
        Some(self.0.remove(position).value)
    }

    pub fn contains(&self, property_id: PropertyId) -> bool {
        self.get(property_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropertyContainer> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// First duplicated property id, if any
    pub fn duplicate_id(&self) -> Option<PropertyId> {
        self.0.iter().enumerate().find_map(|(i, p)| {
            self.0[..i]
                .iter()
                .any(|earlier| earlier.property_id == p.property_id)
                .then_some(p.property_id)
        })
    }
}

impl From<Vec<PropertyContainer>> for Properties {
    fn from(containers: Vec<PropertyContainer>) -> Self {
        Properties(containers)
    }
}

impl FromIterator<PropertyContainer> for Properties {
    fn from_iter<I: IntoIterator<Item = PropertyContainer>>(iter: I) -> Self {
        Properties(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Properties {
    type Item = &'a PropertyContainer;
    type IntoIter = std::slice::Iter<'a, PropertyContainer>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_value_types() {
        assert_eq!(PropertyValue::String("test".to_string()).type_name(), "String");
        assert_eq!(PropertyValue::Integer(42).type_name(), "Integer");
        assert_eq!(PropertyValue::Float(3.14).type_name(), "Float");
        assert_eq!(PropertyValue::Boolean(true).type_name(), "Boolean");
        assert_eq!(PropertyValue::DateTime(1234567890).type_name(), "DateTime");
        assert_eq!(PropertyValue::Array(vec![]).type_name(), "Array");
        assert_eq!(PropertyValue::Map(IndexMap::new()).type_name(), "Map");
        assert_eq!(PropertyValue::Null.type_name(), "Null");
    }

    #[test]
    fn test_compare_numeric_and_string() {
        let three = PropertyValue::Integer(3);
        assert_eq!(three.compare(&PropertyValue::Float(3.5)), Ok(Some(Ordering::Less)));
        assert_eq!(three.compare(&PropertyValue::Integer(3)), Ok(Some(Ordering::Equal)));

        let alice = PropertyValue::from("Alice");
        assert_eq!(alice.compare(&"Bob".into()), Ok(Some(Ordering::Less)));
        assert_eq!(alice.compare(&three), Err(("String", "Integer")));
    }

    #[test]
    fn test_total_order_ranks_kinds() {
        let mut values = vec![
            PropertyValue::from("a"),
            PropertyValue::Float(1.5),
            PropertyValue::Integer(9),
            PropertyValue::Null,
            PropertyValue::Boolean(false),
        ];
        values.sort();
        assert_eq!(values[0], PropertyValue::Null);
        assert_eq!(values[1], PropertyValue::Boolean(false));
        assert_eq!(values[2], PropertyValue::Integer(9));
        assert_eq!(values[3], PropertyValue::Float(1.5));
        assert_eq!(values[4], PropertyValue::from("a"));
    }

    #[test]
    fn test_map_goes_through_parallel_sequences() {
        let mut map = IndexMap::new();
        map.insert("city".to_string(), PropertyValue::from("Oslo"));
        map.insert("zip".to_string(), PropertyValue::Integer(150));
        let value = PropertyValue::Map(map);

        let bytes = bincode::serialize(&value).unwrap();
        let decoded: PropertyValue = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded, value);

        // Variant tag, then the key sequence
        let keys: (u32, Vec<String>) = bincode::deserialize(&bytes).unwrap();
        assert_eq!(keys.1, vec!["city".to_string(), "zip".to_string()]);
    }

    #[test]
    fn test_properties_sequence() {
        let mut props = Properties::new();
        assert_eq!(props.set(PropertyId(1), "Alice".into()), None);
        assert_eq!(props.set(PropertyId(2), 30i64.into()), None);
        assert_eq!(
            props.set(PropertyId(1), "Alicia".into()),
            Some(PropertyValue::from("Alice"))
        );

        assert_eq!(props.len(), 2);
        assert_eq!(props.get(PropertyId(1)).and_then(|v| v.as_string()), Some("Alicia"));
        assert_eq!(props.remove(PropertyId(2)), Some(PropertyValue::Integer(30)));
        assert!(!props.contains(PropertyId(2)));
        assert_eq!(props.duplicate_id(), None);

        let dup: Properties = vec![
            PropertyContainer::new(4u16, 1i64),
            PropertyContainer::new(4u16, 2i64),
        ]
        .into();
        assert_eq!(dup.duplicate_id(), Some(PropertyId(4)));
    }
}
