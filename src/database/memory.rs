//! In-process document store. Backs the test suite and `DATABASE_URL=memory://`.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::store::{field_text, CollectionSpec, Document, DocumentStore, Filter, StoreError};

#[derive(Default)]
struct MemoryCollection {
    unique: Vec<String>,
    // Insertion order doubles as creation order
    docs: Vec<Document>,
}

impl MemoryCollection {
    /// First unique field on which `candidate` collides with another document.
    fn conflict(&self, candidate: &Document) -> Option<&str> {
        self.unique.iter().map(String::as_str).find(|field| {
            let Some(value) = candidate.get(field).and_then(field_text) else {
                return false;
            };
            self.docs.iter().any(|other| {
                other.id != candidate.id
                    && other.get(field).and_then(field_text).as_deref() == Some(value.as_str())
            })
        })
    }
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: Mutex<HashMap<String, MemoryCollection>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, MemoryCollection>>, StoreError> {
        self.collections
            .lock()
            .map_err(|_| StoreError::Query("memory store lock poisoned".to_string()))
    }
}

fn missing(collection: &str) -> StoreError {
    StoreError::Query(format!("collection \"{}\" does not exist", collection))
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.lock().map(|_| ())
    }

    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        let mut collections = self.lock()?;
        let entry = collections.entry(spec.name.clone()).or_default();
        for field in &spec.unique {
            if !entry.unique.contains(field) {
                entry.unique.push(field.clone());
            }
        }
        Ok(())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self.lock()?;
        let coll = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(coll.docs.iter().filter(|d| d.matches(filter)).cloned().collect())
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        let collections = self.lock()?;
        let coll = collections.get(collection).ok_or_else(|| missing(collection))?;
        Ok(coll.docs.iter().find(|d| d.id == id).cloned())
    }

    async fn insert(
        &self,
        collection: &str,
        fields: Map<String, Value>,
    ) -> Result<Document, StoreError> {
        let mut collections = self.lock()?;
        let coll = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        let doc = Document::new(Uuid::new_v4(), fields);
        if let Some(field) = coll.conflict(&doc) {
            return Err(StoreError::UniqueViolation {
                collection: collection.to_string(),
                field: field.to_string(),
            });
        }
        coll.docs.push(doc.clone());
        Ok(doc)
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.lock()?;
        let coll = collections.get_mut(collection).ok_or_else(|| missing(collection))?;

        let Some(index) = coll.docs.iter().position(|d| d.id == id) else {
            return Ok(None);
        };

        let mut merged = coll.docs[index].clone();
        merged.fields.extend(patch);
        if let Some(field) = coll.conflict(&merged) {
            return Err(StoreError::UniqueViolation {
                collection: collection.to_string(),
                field: field.to_string(),
            });
        }
        coll.docs[index] = merged.clone();
        Ok(Some(merged))
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        id: Uuid,
    ) -> Result<Option<Document>, StoreError> {
        let mut collections = self.lock()?;
        let coll = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        Ok(coll
            .docs
            .iter()
            .position(|d| d.id == id)
            .map(|index| coll.docs.remove(index)))
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        let mut collections = self.lock()?;
        let coll = collections.get_mut(collection).ok_or_else(|| missing(collection))?;
        let before = coll.docs.len();
        coll.docs.retain(|d| !d.matches(filter));
        Ok((before - coll.docs.len()) as u64)
    }
}
