use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use super::models::Entity;
use super::store::{Document, DocumentStore, Filter, StoreError};

/// Typed access to the collection of one fixed entity.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_any(&self, filter: &Filter) -> Result<Vec<T>, StoreError> {
        self.store
            .find(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    pub async fn select_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        Ok(self.select_any(filter).await?.into_iter().next())
    }

    pub async fn select_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.store.find_by_id(T::COLLECTION, id).await?.map(decode).transpose()
    }

    /// Persist `entity`, ignoring whatever id it carries.
    pub async fn create(&self, entity: &T) -> Result<T, StoreError> {
        let mut fields = encode(entity)?;
        fields.remove("id");
        decode(self.store.insert(T::COLLECTION, fields).await?)
    }

    /// Apply an already validated patch.
    pub async fn update_id(&self, id: Uuid, patch: Map<String, Value>) -> Result<Option<T>, StoreError> {
        self.store
            .update_by_id(T::COLLECTION, id, patch)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn delete_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.store.delete_by_id(T::COLLECTION, id).await?.map(decode).transpose()
    }

    pub async fn delete_all(&self) -> Result<u64, StoreError> {
        self.store.delete_many(T::COLLECTION, &Filter::new()).await
    }
}

fn encode<T: Entity>(entity: &T) -> Result<Map<String, Value>, StoreError> {
    match serde_json::to_value(entity) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Query(format!(
            "{} entity did not serialize to an object: {}",
            T::COLLECTION,
            other
        ))),
        Err(source) => Err(StoreError::Decode { collection: T::COLLECTION.to_string(), source }),
    }
}

fn decode<T: Entity>(doc: Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc.into_json()))
        .map_err(|source| StoreError::Decode { collection: T::COLLECTION.to_string(), source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory::MemoryDocumentStore;
    use crate::database::models::{Role, TestEntry};
    use serde_json::json;

    async fn repository<T: Entity>() -> Repository<T> {
        let store = Arc::new(MemoryDocumentStore::new());
        store.ensure_collection(&T::spec()).await.unwrap();
        Repository::new(store)
    }

    #[tokio::test]
    async fn create_assigns_store_id() {
        let repo = repository::<TestEntry>().await;
        let created = repo.create(&TestEntry::new("n", "m")).await.unwrap();
        assert!(!created.id.is_nil());

        let found = repo.select_id(created.id).await.unwrap().unwrap();
        assert_eq!(found.name, "n");
        assert_eq!(found.created_at, created.created_at);
    }

    #[tokio::test]
    async fn filters_and_deletes() {
        let repo = repository::<TestEntry>().await;
        repo.create(&TestEntry::new("a", "1")).await.unwrap();
        repo.create(&TestEntry::new("b", "2")).await.unwrap();

        let mut filter = Filter::new();
        filter.insert("name".into(), "b".into());
        let hit = repo.select_one(&filter).await.unwrap().unwrap();
        assert_eq!(hit.message, "2");

        assert_eq!(repo.delete_all().await.unwrap(), 2);
        assert!(repo.select_any(&Filter::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_and_delete_by_id() {
        let repo = repository::<Role>().await;
        let role = crate::database::models::role::NewRole {
            name: Some("Admin".into()),
            code: Some("ADMIN".into()),
            description: None,
        }
        .into_role()
        .unwrap();
        let role = repo.create(&role).await.unwrap();

        let patch = json!({"description": "all access"}).as_object().cloned().unwrap();
        let updated = repo.update_id(role.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.description, "all access");

        assert!(repo.delete_id(role.id).await.unwrap().is_some());
        assert!(repo.delete_id(role.id).await.unwrap().is_none());
        assert!(repo.update_id(role.id, Map::new()).await.unwrap().is_none());
    }
}
