//! In-memory values held by record fields.

use std::fmt;
use std::hash::{Hash, Hasher};

use rustc_hash::{FxHashMap, FxHasher};

use crate::model::Record;

/// A field value: scalar, nested record, or container.
///
/// The variant reflects what the value holds, not necessarily the declared
/// type of the field: under some decode policies a string field holds
/// `Binary` bytes and a binary field holds `String` text.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Byte(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Struct(Record),
    List(Vec<Value>),
    /// Set elements in source order; no deduplication is performed.
    Set(Vec<Value>),
    Map(MapValue),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Byte(_) => "byte",
            Value::I16(_) => "i16",
            Value::I32(_) => "i32",
            Value::I64(_) => "i64",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Struct(_) => "struct",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Map(_) => "map",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns any integer variant widened to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::I16(v) => Some(i64::from(*v)),
            Value::I32(v) => Some(i64::from(*v)),
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the raw bytes of a `Binary` or `String` value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            Value::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Struct(r) => Some(r),
            _ => None,
        }
    }

    /// Returns the elements of a list or set.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::I16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Binary(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Binary(v.to_vec())
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Struct(v)
    }
}

impl From<MapValue> for Value {
    fn from(v: MapValue) -> Self {
        Value::Map(v)
    }
}

/// Mapping with arbitrary (possibly composite) keys.
///
/// Entries keep insertion order, which is also the wire order on encode.
/// A hash index over the keys makes `insert` and `get` constant time; keys
/// sharing a hash are told apart with `PartialEq`.
#[derive(Clone, Default)]
pub struct MapValue {
    entries: Vec<(Value, Value)>,
    index: FxHashMap<u64, Vec<usize>>,
}

impl MapValue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Inserts an entry, returning the previous value for an equal key.
    ///
    /// Last write wins: a repeated key replaces the value in place and keeps
    /// the position of the first occurrence. Decoding relies on this when the
    /// wire carries duplicate keys.
    pub fn insert(&mut self, key: Value, value: Value) -> Option<Value> {
        let bucket = self.index.entry(key_hash(&key)).or_default();
        if let Some(&at) = bucket.iter().find(|&&at| self.entries[at].0 == key) {
            return Some(std::mem::replace(&mut self.entries[at].1, value));
        }
        bucket.push(self.entries.len());
        self.entries.push((key, value));
        None
    }

    pub fn get(&self, key: &Value) -> Option<&Value> {
        self.index
            .get(&key_hash(key))?
            .iter()
            .map(|&at| &self.entries[at])
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Value, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }
}

impl fmt::Debug for MapValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

// Equal values must hash equally under `Value`'s `PartialEq`.
fn key_hash(value: &Value) -> u64 {
    let mut hasher = FxHasher::default();
    hash_value(value, &mut hasher);
    hasher.finish()
}

fn hash_value(value: &Value, hasher: &mut FxHasher) {
    std::mem::discriminant(value).hash(hasher);
    match value {
        Value::Bool(v) => v.hash(hasher),
        Value::Byte(v) => v.hash(hasher),
        Value::I16(v) => v.hash(hasher),
        Value::I32(v) => v.hash(hasher),
        Value::I64(v) => v.hash(hasher),
        // 0.0 == -0.0, so both hash as positive zero.
        Value::Double(v) => {
            let v = if *v == 0.0 { 0.0 } else { *v };
            v.to_bits().hash(hasher)
        }
        Value::String(v) => v.hash(hasher),
        Value::Binary(v) => v.hash(hasher),
        Value::Struct(record) => {
            record.type_name().hash(hasher);
            for (name, v) in record.iter() {
                name.hash(hasher);
                hash_value(v, hasher);
            }
        }
        Value::List(items) | Value::Set(items) => {
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        // Map equality ignores order; the length is the only cheap order-free part.
        Value::Map(map) => map.len().hash(hasher),
    }
}

// Order-insensitive: two maps are equal when they hold the same entries.
impl PartialEq for MapValue {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<K: Into<Value>, V: Into<Value>> FromIterator<(K, V)> for MapValue {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MapValue::new();
        for (k, v) in iter {
            map.insert(k.into(), v.into());
        }
        map
    }
}

impl IntoIterator for MapValue {
    type Item = (Value, Value);
    type IntoIter = std::vec::IntoIter<(Value, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_last_write_wins() {
        let mut map = MapValue::new();
        assert_eq!(map.insert("a".into(), Value::I32(1)), None);
        map.insert("b".into(), Value::I32(2));
        assert_eq!(map.insert("a".into(), Value::I32(3)), Some(Value::I32(1)));

        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&"a".into()), Some(&Value::I32(3)));
        let keys: Vec<&Value> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, [&Value::from("a"), &Value::from("b")]);
    }

    #[test]
    fn test_map_equality_ignores_order() {
        let a: MapValue = [("x", 1), ("y", 2)].into_iter().collect();
        let b: MapValue = [("y", 2), ("x", 1)].into_iter().collect();
        let c: MapValue = [("x", 1), ("y", 3)].into_iter().collect();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_composite_keys() {
        let mut map = MapValue::new();
        let key = Value::List(vec![Value::I32(1), Value::I32(2)]);
        map.insert(key.clone(), Value::Bool(true));
        assert_eq!(map.get(&key), Some(&Value::Bool(true)));
        assert_eq!(map.get(&Value::List(vec![Value::I32(2)])), None);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::I16(-4).as_i64(), Some(-4));
        assert_eq!(Value::Double(0.5).as_f64(), Some(0.5));
        assert_eq!(Value::from("hi").as_bytes(), Some(&b"hi"[..]));
        assert_eq!(Value::Binary(vec![0xff]).as_str(), None);
        assert_eq!(Value::Set(vec![]).as_slice(), Some(&[][..]));
        assert_eq!(Value::Byte(1).kind(), "byte");
    }

    #[test]
    fn test_signed_zero_keys_merge() {
        let mut map = MapValue::new();
        map.insert(Value::Double(0.0), Value::I32(1));
        assert_eq!(map.insert(Value::Double(-0.0), Value::I32(2)), Some(Value::I32(1)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Value::Double(0.0)), Some(&Value::I32(2)));
    }

    #[test]
    fn test_map_keys_hash_by_content() {
        let inner: MapValue = [("x", 1), ("y", 2)].into_iter().collect();
        let reordered: MapValue = [("y", 2), ("x", 1)].into_iter().collect();
        let mut map = MapValue::new();
        map.insert(Value::Map(inner), "first".into());
        assert_eq!(map.get(&Value::Map(reordered)), Some(&Value::from("first")));

        // Same bytes, different variants.
        map.insert(Value::from("k"), Value::I32(1));
        map.insert(Value::Binary(b"k".to_vec()), Value::I32(2));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_large_map_inserts_in_linear_time() {
        let start = std::time::Instant::now();
        let map: MapValue = (0..200_000).map(|i| (i, i)).collect();
        assert_eq!(map.len(), 200_000);
        assert_eq!(map.get(&Value::I32(199_999)), Some(&Value::I32(199_999)));
        assert!(start.elapsed() < std::time::Duration::from_secs(5));
    }
}
