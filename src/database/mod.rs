pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod registry;
pub mod repository;
pub mod store;

pub use manager::StoreHandle;
pub use registry::{CollectionName, CollectionRegistry, DynamicModel};
pub use repository::Repository;
pub use store::{CollectionSpec, Document, DocumentStore, Filter, StoreError};
