//! Infrastructure layer: persistence, audit trail, configuration.

pub mod catalog_store;
pub mod config;
pub mod versioning;


pub use catalog_store::{CatalogStore, InMemoryCatalogStore, LocalCatalogStore, StoreError};
pub use config::CatalogStoreConfig;
pub use versioning::{InMemoryVersionStore, VersionEvent, VersionRecord, VersionStore};
