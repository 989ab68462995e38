//! Catalog domain module: base items and the items that reference them.
//!
//! Business rules only (no IO, no storage): identity validation, the
//! name → reporting category classifier, the query scopes, and the
//! item-count bookkeeping events. Uniqueness across records is enforced
//! by whichever store persists these aggregates.

pub mod base_item;
pub mod item;
pub mod reporting_category;
pub mod scope;

pub use base_item::{
    BaseItem, BaseItemAttributes, BaseItemChanges, BaseItemCommand, BaseItemCreated,
    BaseItemDestroyed, BaseItemEvent, BaseItemId, BaseItemSnapshot, BaseItemSummary,
    BaseItemUpdated, ChangeItemCount, CreateBaseItem, DestroyBaseItem, ItemCountChanged,
    UpdateBaseItem, KIT_NAME,
};
pub use item::{Item, ItemId, NewItem};
pub use reporting_category::{ClassificationRule, NamePattern, ReportingCategory, classify};
pub use scope::{BaseItemOrder, BaseItemQuery};
