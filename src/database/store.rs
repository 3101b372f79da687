//! Document store abstraction shared by the Postgres and in-memory backends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Exact-match filter: field name to the text form of the expected value.
///
/// `id` (or `_id`) matches the store-assigned identifier. Only scalar fields
/// can match; object and array values never do.
pub type Filter = BTreeMap<String, String>;

/// Errors surfaced by any document store backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database unavailable: {0}")]
    Unavailable(String),

    #[error("duplicate value for unique field '{field}' in {collection}")]
    UniqueViolation { collection: String, field: String },

    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Invalid document in {collection}: {source}")]
    Decode {
        collection: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Query error: {0}")]
    Query(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

/// A stored record: the store-assigned id plus an open set of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: Uuid, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Flatten into a single JSON object with `id` alongside the fields.
    pub fn into_json(self) -> Map<String, Value> {
        let mut map = self.fields;
        map.insert("id".to_string(), Value::String(self.id.to_string()));
        map
    }

    /// Whether every filter entry matches this document.
    pub fn matches(&self, filter: &Filter) -> bool {
        filter.iter().all(|(field, expected)| {
            if is_id_field(field) {
                return self.id.to_string() == *expected;
            }
            self.fields.get(field).and_then(scalar_text).as_deref() == Some(expected.as_str())
        })
    }
}

/// Describes the storage destination for one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
    pub name: String,
    /// Top-level fields whose text value must be unique across the collection
    pub unique: Vec<String>,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), unique: Vec::new() }
    }

    pub fn unique(mut self, field: impl Into<String>) -> Self {
        self.unique.push(field.into());
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Round-trip to the backend.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Prepare the destination for writes. Repeating it is harmless.
    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError>;

    /// All documents matching `filter`, in creation order.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError>;

    /// Persist a new document under a freshly generated id.
    async fn insert(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError>;

    /// Merge `patch` into the top-level fields of an existing document.
    /// Returns `None` when the id does not exist; never creates.
    async fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError>;

    /// Remove a document, returning it if it existed.
    async fn delete_by_id(&self, collection: &str, id: Uuid)
        -> Result<Option<Document>, StoreError>;

    /// Remove every document matching `filter`, returning how many went.
    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError>;
}

/// Text form of a JSON value, following Postgres `->>` semantics.
pub fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// [`field_text`] restricted to scalars, the values a filter can match.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) | Value::Array(_) => None,
        other => field_text(other),
    }
}

pub(crate) fn is_id_field(field: &str) -> bool {
    field == "id" || field == "_id"
}
