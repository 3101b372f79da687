//! Closed registry of schema-less collections.
//!
//! The set of collection names is fixed when the registry is built. Each name
//! maps to one [`DynamicModel`], created on first use and kept for the life of
//! the process. A model prepares its storage destination the first time it
//! touches the store.

use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::info;

use super::models::{self, ModelError};
use super::store::{is_id_field, CollectionSpec, DocumentStore, StoreError};

/// Names that already belong to fixed routes or collections
const RESERVED_NAMES: &[&str] = &["users", "roles", "tests", "test", "data", "health"];

const MAX_NAME_LEN: usize = 63;

/// A validated collection identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionName(String);

impl CollectionName {
    /// Accepts a lower-case ASCII letter followed by `[a-z0-9_]`, up to 63
    /// characters, excluding reserved names.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::InvalidCollection(raw.to_string());

        let mut chars = raw.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() => {}
            _ => return Err(invalid()),
        }
        if raw.len() > MAX_NAME_LEN
            || !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            || RESERVED_NAMES.contains(&raw)
        {
            return Err(invalid());
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Schema-less model bound to one collection.
///
/// Any field is accepted. `name` and `message` are cast to strings, and
/// `createdAt` is a timestamp defaulting to the insert time.
#[derive(Debug)]
pub struct DynamicModel {
    name: CollectionName,
    provisioned: OnceCell<()>,
}

impl DynamicModel {
    fn new(name: CollectionName) -> Self {
        Self { name, provisioned: OnceCell::new() }
    }

    pub fn name(&self) -> &CollectionName {
        &self.name
    }

    pub fn spec(&self) -> CollectionSpec {
        CollectionSpec::new(self.name.as_str())
    }

    pub fn is_provisioned(&self) -> bool {
        self.provisioned.initialized()
    }

    /// Ask the store to prepare this collection, once per process. A failed
    /// attempt is retried by the next caller.
    pub async fn ensure_provisioned(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        self.provisioned
            .get_or_try_init(|| async {
                store.ensure_collection(&self.spec()).await?;
                info!("Provisioned collection: {}", self.name);
                Ok::<(), StoreError>(())
            })
            .await?;
        Ok(())
    }

    /// Shape a request body into a new document.
    pub fn prepare_insert(&self, body: Map<String, Value>) -> Result<Map<String, Value>, ModelError> {
        let mut doc = self.validate(body)?;
        if doc.get("createdAt").map_or(true, Value::is_null) {
            doc.insert("createdAt".to_string(), Value::String(models::now()));
        }
        Ok(doc)
    }

    /// Validate only the fields present in `patch`.
    pub fn prepare_update(&self, patch: Map<String, Value>) -> Result<Map<String, Value>, ModelError> {
        self.validate(patch)
    }

    fn validate(&self, fields: Map<String, Value>) -> Result<Map<String, Value>, ModelError> {
        let mut out = Map::with_capacity(fields.len());
        for (field, value) in fields {
            // Identity belongs to the store
            if is_id_field(&field) {
                continue;
            }
            let value = match field.as_str() {
                "name" | "message" => models::cast_string(&field, value)?,
                "createdAt" => models::cast_timestamp(&field, value)?,
                _ => value,
            };
            out.insert(field, value);
        }
        Ok(out)
    }
}

/// Maps each registered collection name to its memoized [`DynamicModel`].
#[derive(Debug)]
pub struct CollectionRegistry {
    names: BTreeSet<CollectionName>,
    models: RwLock<HashMap<CollectionName, Arc<DynamicModel>>>,
}

impl CollectionRegistry {
    /// Build the registry from configured names. Duplicates collapse; any
    /// invalid name fails the whole set.
    pub fn new<I, S>(names: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| CollectionName::parse(n.as_ref()))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self { names, models: RwLock::new(HashMap::new()) })
    }

    pub fn names(&self) -> impl Iterator<Item = &CollectionName> {
        self.names.iter()
    }

    /// Resolve a raw string against the registered set.
    pub fn lookup(&self, raw: &str) -> Option<&CollectionName> {
        self.names.iter().find(|n| n.as_str() == raw)
    }

    /// Return the model for `name`, creating it on first request.
    pub async fn get_or_create(&self, name: &CollectionName) -> Arc<DynamicModel> {
        // Fast path: try read lock
        {
            let models = self.models.read().await;
            if let Some(model) = models.get(name) {
                return model.clone();
            }
        }

        let mut models = self.models.write().await;
        models
            .entry(name.clone())
            .or_insert_with(|| {
                info!("Created dynamic model for collection: {}", name);
                Arc::new(DynamicModel::new(name.clone()))
            })
            .clone()
    }
}
