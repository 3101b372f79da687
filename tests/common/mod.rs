#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use docstore_api::config::AppConfig;
use docstore_api::database::memory::MemoryDocumentStore;
use docstore_api::database::{
    CollectionRegistry, CollectionSpec, Document, DocumentStore, Filter, StoreError, StoreHandle,
};
use docstore_api::{app, AppState};

pub const COLLECTIONS: &[&str] = &["zxx", "zzy", "zxxx"];

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub store: StoreHandle,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Serve the app in-process on a free port. The server lives as long as the
/// test's runtime.
pub async fn spawn_with(config: AppConfig, store: StoreHandle) -> Result<TestServer> {
    // Pick an unused port for isolation
    let port = portpicker::pick_unused_port().context("failed to pick free port")?;
    let base_url = format!("http://127.0.0.1:{}", port);

    let registry = CollectionRegistry::new(&config.api.collections)?;
    let router = app(AppState::new(config, store.clone(), registry));

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .context("failed to bind test listener")?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    Ok(TestServer { port, base_url, store, client: reqwest::Client::new() })
}

pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.api.collections = COLLECTIONS.iter().map(|s| s.to_string()).collect();
    config
}

/// Server backed by a fresh in-memory store.
pub async fn spawn_server() -> Result<TestServer> {
    let store = StoreHandle::pending();
    store.install(Arc::new(MemoryDocumentStore::new())).await?;
    spawn_with(test_config(), store).await
}

/// Server whose store never connected.
pub async fn spawn_disconnected() -> Result<TestServer> {
    spawn_with(test_config(), StoreHandle::pending()).await
}

/// Store double that counts every call before delegating to memory.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryDocumentStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.hit();
        self.inner.ping().await
    }

    async fn ensure_collection(&self, spec: &CollectionSpec) -> Result<(), StoreError> {
        self.hit();
        self.inner.ensure_collection(spec).await
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        self.hit();
        self.inner.find(collection, filter).await
    }

    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        self.hit();
        self.inner.find_by_id(collection, id).await
    }

    async fn insert(&self, collection: &str, fields: Map<String, Value>) -> Result<Document, StoreError> {
        self.hit();
        self.inner.insert(collection, fields).await
    }

    async fn update_by_id(
        &self,
        collection: &str,
        id: Uuid,
        patch: Map<String, Value>,
    ) -> Result<Option<Document>, StoreError> {
        self.hit();
        self.inner.update_by_id(collection, id, patch).await
    }

    async fn delete_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Document>, StoreError> {
        self.hit();
        self.inner.delete_by_id(collection, id).await
    }

    async fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64, StoreError> {
        self.hit();
        self.inner.delete_many(collection, filter).await
    }
}

/// Assert the common envelope and hand back the parsed body.
pub async fn json_body(res: reqwest::Response) -> Result<Value> {
    let body = res.json::<Value>().await?;
    assert!(body.get("success").is_some(), "response should have 'success' field: {}", body);
    Ok(body)
}
