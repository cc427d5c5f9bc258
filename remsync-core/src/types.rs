//! Domain types for record reconciliation.
//!
//! A [`Record`] is an identity plus an opaque JSON field map. Equality
//! ignores the server-stamped [`METADATA_FIELDS`], so a record fetched back
//! from the destination compares equal to the source record it was written
//! from.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::RecordError;

/// Field holding the record identity in serialized form.
pub const ID_FIELD: &str = "id";

/// Fields the destination server stamps on its own records.
pub const METADATA_FIELDS: &[&str] = &["last_modified", "schema"];

// ---------------------------------------------------------------------------
// RecordId
// ---------------------------------------------------------------------------

/// Stable identity of a record, unique within a [`RecordSet`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// An immutable record: identity plus every other field, untyped.
///
/// Serializes as a flat JSON object with `id` alongside the fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(into = "Value", try_from = "Value")]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from an identity and its fields.
    ///
    /// An `id` key inside `fields` is dropped; the explicit identity wins.
    pub fn new(id: impl Into<RecordId>, mut fields: Map<String, Value>) -> Self {
        fields.shift_remove(ID_FIELD);
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a record from a JSON object carrying a string `id`.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => return Err(RecordError::NotAnObject(type_name(&other).to_string())),
        };
        match fields.shift_remove(ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => Ok(Self {
                id: RecordId(id),
                fields,
            }),
            Some(other) => Err(RecordError::MissingIdentity(other.to_string())),
            None => Err(RecordError::MissingIdentity(
                Value::Object(fields).to_string(),
            )),
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Fields that take part in comparison, in key order.
    pub fn content_fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields
            .iter()
            .filter(|(key, _)| !is_metadata(key))
    }

    /// A copy of this record with the metadata fields removed.
    pub fn without_metadata(&self) -> Record {
        let fields = self
            .content_fields()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Record {
            id: self.id.clone(),
            fields,
        }
    }

    /// Flat JSON object including `id`.
    pub fn to_value(&self) -> Value {
        Value::from(self.clone())
    }
}

/// Equality under the comparison rule: identity and every non-metadata field.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.content_fields().count() == other.content_fields().count()
            && self
                .content_fields()
                .all(|(key, value)| other.fields.get(key) == Some(value))
    }
}

impl Eq for Record {}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        let mut object = Map::with_capacity(record.fields.len() + 1);
        object.insert(ID_FIELD.to_string(), Value::String(record.id.0));
        object.extend(record.fields);
        Value::Object(object)
    }
}

impl TryFrom<Value> for Record {
    type Error = RecordError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Record::from_value(value)
    }
}

pub fn is_metadata(field: &str) -> bool {
    METADATA_FIELDS.contains(&field)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ---------------------------------------------------------------------------
// RecordSet
// ---------------------------------------------------------------------------

/// A snapshot of records keyed by identity, iterated in identity order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordSet {
    records: BTreeMap<RecordId, Record>,
}

impl RecordSet {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collect records into a set, rejecting duplicate identities.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Result<Self, RecordError> {
        let mut map = BTreeMap::new();
        for record in records {
            let id = record.id.clone();
            if map.insert(id.clone(), record).is_some() {
                return Err(RecordError::DuplicateIdentity(id));
            }
        }
        Ok(Self { records: map })
    }

    /// Parse raw JSON objects and collect them into a set.
    pub fn from_json(values: impl IntoIterator<Item = Value>) -> Result<Self, RecordError> {
        let records = values
            .into_iter()
            .map(Record::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_records(records)
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &RecordId> {
        self.records.keys()
    }

    /// Apply `operations` to a copy of this set.
    ///
    /// Creates and updates replace the stored record, deletes remove it.
    pub fn apply(&self, operations: &[Operation]) -> RecordSet {
        let mut records = self.records.clone();
        for op in operations {
            match op {
                Operation::Create(record) | Operation::Update(record) => {
                    records.insert(record.id.clone(), record.clone());
                }
                Operation::Delete(id) => {
                    records.remove(id);
                }
            }
        }
        RecordSet { records }
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::collections::btree_map::Values<'a, RecordId, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.values()
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Kind of an [`Operation`]. The derived order is the tie-break used when
/// sorting a plan: creates, then updates, then deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Create => write!(f, "create"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Delete => write!(f, "delete"),
        }
    }
}

/// A single write against the destination collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "target", rename_all = "lowercase")]
pub enum Operation {
    Create(Record),
    Update(Record),
    Delete(RecordId),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Create(_) => OperationKind::Create,
            Operation::Update(_) => OperationKind::Update,
            Operation::Delete(_) => OperationKind::Delete,
        }
    }

    pub fn id(&self) -> &RecordId {
        match self {
            Operation::Create(record) | Operation::Update(record) => record.id(),
            Operation::Delete(id) => id,
        }
    }

    /// The record written by a create or update.
    pub fn record(&self) -> Option<&Record> {
        match self {
            Operation::Create(record) | Operation::Update(record) => Some(record),
            Operation::Delete(_) => None,
        }
    }

    /// Total order key: identity, then kind.
    pub fn sort_key(&self) -> (&RecordId, OperationKind) {
        (self.id(), self.kind())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
