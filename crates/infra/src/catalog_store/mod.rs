//! Persistence boundary for base items and their items.
//!
//! The store owns everything that needs more than one record to decide:
//! uniqueness of `name`/`partner_key`, the `item_count` cache, restricted
//! deletes, and notifying the audit trail and the event bus.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryCatalogStore, LocalCatalogStore};
pub use r#trait::{CatalogStore, StoreError};
