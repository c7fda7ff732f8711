//! Records read from and written to the vector store.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Point payload: an insertion-ordered mapping of arbitrary nested values.
pub type Payload = serde_json::Map<String, Value>;

/// Build a payload from a JSON object; any other value yields an empty payload.
pub fn payload_from_json(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

/// Identifier of a point in the vector store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PointKey {
    Num(u64),
    Uuid(String),
}

impl fmt::Display for PointKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointKey::Num(n) => write!(f, "{n}"),
            PointKey::Uuid(s) => write!(f, "{s}"),
        }
    }
}

impl From<u64> for PointKey {
    fn from(n: u64) -> Self {
        PointKey::Num(n)
    }
}

impl From<String> for PointKey {
    fn from(s: String) -> Self {
        PointKey::Uuid(s)
    }
}

/// A point scanned from the source collection.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRecord {
    pub id: PointKey,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl SourceRecord {
    pub fn new(id: impl Into<PointKey>, vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id: id.into(),
            vector,
            payload,
        }
    }
}

/// Value a record is grouped by.
///
/// Keys compare by value through a canonical JSON encoding, so `1` and `1.0`
/// land in the same group while `"1"` does not.
#[derive(Debug, Clone)]
pub struct GroupKey {
    value: Value,
    canonical: String,
}

impl GroupKey {
    pub fn new(value: Value) -> Self {
        let canonical = canonical_json(&value);
        Self { value, canonical }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Stable textual encoding used for equality and snapshots.
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    pub fn from_canonical(canonical: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(canonical)?))
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for GroupKey {}

impl Hash for GroupKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => write!(f, "{s}"),
            other => write!(f, "{other}"),
        }
    }
}

impl Serialize for GroupKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}

impl From<&str> for GroupKey {
    fn from(s: &str) -> Self {
        Self::new(Value::String(s.to_string()))
    }
}

fn canonical_json(value: &Value) -> String {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        },
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let inner: Vec<String> = entries
                .into_iter()
                .map(|(k, v)| format!("{}:{}", Value::String(k.clone()), canonical_json(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        other => other.to_string(),
    }
}

/// Records sharing one group key, in scan-arrival order.
#[derive(Debug, Clone)]
pub struct Group {
    key: GroupKey,
    vectors: Vec<Vec<f32>>,
    payloads: Vec<Payload>,
}

impl Group {
    /// A group always starts from the record that created it.
    pub fn new(key: GroupKey, vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            key,
            vectors: vec![vector],
            payloads: vec![payload],
        }
    }

    pub fn push(&mut self, vector: Vec<f32>, payload: Payload) {
        self.vectors.push(vector);
        self.payloads.push(payload);
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// A point written to the destination collection.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

impl OutputPoint {
    /// Mint a point with a fresh random id, unrelated to any source id.
    pub fn new(vector: Vec<f32>, payload: Payload) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            vector,
            payload,
        }
    }
}
