use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection string; `None` leaves every data route answering 503.
    pub url: Option<String>,
    pub max_connections: u32,
    /// Pool acquire timeout, in seconds
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    /// Collection names that get generic CRUD routes
    pub collections: Vec<String>,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// `*` allows any origin
    pub cors_origins: Vec<String>,
    pub collection_access: CollectionAccess,
    pub collection_token: Option<String>,
}

/// Who may call the generic collection routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollectionAccess {
    /// No credentials required
    Public,
    /// `Authorization: Bearer <collection_token>` required
    Token,
}

impl std::str::FromStr for CollectionAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" | "open" => Ok(CollectionAccess::Public),
            "token" | "bearer" => Ok(CollectionAccess::Token),
            other => Err(format!("unknown collection access policy: {}", other)),
        }
    }
}

const DEFAULT_COLLECTIONS: &[&str] = &["zxx", "zzy", "zxxx"];

/// Log filter used when `RUST_LOG` is unset
pub const DEFAULT_LOG_FILTER: &str = "docstore_api=info,tower_http=info";

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from any key/value source (the process environment in production).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Database overrides
        if let Some(v) = lookup("DATABASE_URL") {
            let v = v.trim().to_string();
            self.database.url = if v.is_empty() { None } else { Some(v) };
        }
        if let Some(v) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Some(v) = lookup("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Some(v) = lookup("PORT") {
            self.api.port = v.parse().unwrap_or(self.api.port);
        }
        if let Some(v) = lookup("API_COLLECTIONS") {
            self.api.collections = split_list(&v);
        }
        if let Some(v) = lookup("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Some(v) = lookup("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = split_list(&v);
        }
        if let Some(v) = lookup("SECURITY_COLLECTION_ACCESS") {
            match v.parse() {
                Ok(access) => self.security.collection_access = access,
                Err(e) => tracing::warn!("ignoring SECURITY_COLLECTION_ACCESS: {}", e),
            }
        }
        if let Some(v) = lookup("SECURITY_COLLECTION_TOKEN") {
            self.security.collection_token = Some(v).filter(|t| !t.is_empty());
        }

        self
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
            },
            api: ApiConfig {
                port: 3000,
                collections: default_collections(),
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                cors_origins: vec!["*".to_string()],
                collection_access: CollectionAccess::Public,
                collection_token: None,
            },
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
            },
            api: ApiConfig {
                port: 3000,
                collections: default_collections(),
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                cors_origins: vec!["*".to_string()],
                collection_access: CollectionAccess::Public,
                collection_token: None,
            },
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
            },
            api: ApiConfig {
                port: 3000,
                collections: default_collections(),
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                cors_origins: vec!["*".to_string()],
                collection_access: CollectionAccess::Token,
                collection_token: None,
            },
        }
    }
}

fn default_collections() -> Vec<String> {
    DEFAULT_COLLECTIONS.iter().map(|s| s.to_string()).collect()
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}
