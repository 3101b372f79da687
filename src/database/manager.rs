use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::memory::MemoryDocumentStore;
use super::models;
use super::postgres::PgDocumentStore;
use super::store::{DocumentStore, StoreError};
use crate::config::DatabaseConfig;

/// Scheme that selects the in-process store instead of Postgres
pub const MEMORY_URL: &str = "memory://";

/// Shared handle to the document store.
///
/// Empty until a connection attempt succeeds; while empty every accessor
/// reports [`StoreError::Unavailable`] without doing any I/O.
#[derive(Clone, Default)]
pub struct StoreHandle {
    slot: Arc<OnceLock<Arc<dyn DocumentStore>>>,
}

impl StoreHandle {
    pub fn pending() -> Self {
        Self::default()
    }

    /// Attach a store without provisioning anything. Later attaches are
    /// ignored; returns whether this one took effect.
    pub fn attach(&self, store: Arc<dyn DocumentStore>) -> bool {
        self.slot.set(store).is_ok()
    }

    /// Provision the fixed entity collections, then attach.
    pub async fn install(&self, store: Arc<dyn DocumentStore>) -> Result<(), StoreError> {
        for spec in models::fixed_collections() {
            store.ensure_collection(&spec).await?;
        }
        if !self.attach(store) {
            warn!("Store already attached; ignoring second connection");
        }
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.slot.get().is_some()
    }

    pub fn store(&self) -> Result<Arc<dyn DocumentStore>, StoreError> {
        self.slot
            .get()
            .cloned()
            .ok_or_else(|| StoreError::Unavailable("not connected".to_string()))
    }

    /// Pings the store to ensure connectivity
    pub async fn health_check(&self) -> Result<(), StoreError> {
        self.store()?.ping().await
    }
}

/// Where a connection string points, for startup logging.
#[derive(Debug, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub database: String,
    pub host: String,
    pub port: Option<u16>,
}

/// Parse a connection string without exposing credentials.
pub fn describe_connection(connection_string: &str) -> Result<ConnectionTarget, StoreError> {
    let url = url::Url::parse(connection_string)
        .map_err(|e| StoreError::Query(format!("invalid database URL: {}", e)))?;
    Ok(ConnectionTarget {
        database: url.path().trim_start_matches('/').to_string(),
        host: url.host_str().unwrap_or("").to_string(),
        port: url.port_or_known_default(),
    })
}

/// Open the store named by `url`.
pub async fn connect(url: &str, config: &DatabaseConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    if url == MEMORY_URL {
        info!("Using in-memory document store");
        return Ok(Arc::new(MemoryDocumentStore::new()));
    }

    let target = describe_connection(url)?;
    let store = PgDocumentStore::connect(url, config).await?;
    info!("Connected to database");
    info!("Database name: {}", target.database);
    info!("Database host: {}", target.host);
    if let Some(port) = target.port {
        info!("Database port: {}", port);
    }
    Ok(Arc::new(store))
}

/// Start one connection attempt without blocking startup.
///
/// Without a configured URL nothing is spawned and the handle stays empty, so
/// data routes keep answering 503. A failed attempt is logged and not retried.
pub fn connect_in_background(config: DatabaseConfig, handle: StoreHandle) -> Option<JoinHandle<()>> {
    let Some(url) = config.url.clone() else {
        warn!("DATABASE_URL not configured; skipping database connection (data routes will return 503)");
        return None;
    };

    Some(tokio::spawn(async move {
        let result = async {
            let store = connect(&url, &config).await?;
            handle.install(store).await
        }
        .await;

        if let Err(e) = result {
            error!("Database connection failed: {}", e);
            warn!("Server keeps running, but database routes are unavailable");
        }
    }))
}
