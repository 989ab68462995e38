use std::sync::Arc;

use thiserror::Error;

use essentials_catalog::{
    BaseItem, BaseItemAttributes, BaseItemChanges, BaseItemId, BaseItemQuery, Item, ItemId,
    NewItem,
};
use essentials_core::{DomainError, ExpectedVersion, UserId, ValidationErrors};

use crate::versioning::VersionStoreError;

/// Catalog store operation error.
///
/// - **Domain**: validation (per field), not found, conflicts, invariants
/// - **UniqueViolation**: the storage-level unique index refused a write
/// - **Versioning**: the audit trail could not record the change (nothing committed)
/// - **Poisoned**: internal lock poisoning
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("unique index violated on {field}: {value:?}")]
    UniqueViolation { field: &'static str, value: String },

    #[error("audit trail failure: {0}")]
    Versioning(#[from] VersionStoreError),

    #[error("catalog store lock poisoned")]
    Poisoned,
}

impl StoreError {
    /// Field-level validation errors, if the save was rejected as invalid.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            StoreError::Domain(e) => e.field_errors(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Domain(DomainError::NotFound))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Domain(DomainError::Conflict(_)))
    }
}

/// Transactional store of base items and items.
///
/// ## Write semantics
///
/// Every mutating call is one transaction: validation, the mutation, the
/// `item_count` adjustment, and the audit version either all happen or none
/// do. Rejected saves leave the store untouched.
///
/// Writers contending for the same `name` or `partner_key` are serialized;
/// the loser gets a `has already been taken` field error.
///
/// ## Read semantics
///
/// Lookups with no match return `None` or an empty `Vec`, never an error.
pub trait CatalogStore: Send + Sync {
    fn create_base_item(
        &self,
        attributes: BaseItemAttributes,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError>;

    /// Apply `changes`. An update that changes nothing succeeds without
    /// recording a version.
    fn update_base_item(
        &self,
        id: BaseItemId,
        changes: BaseItemChanges,
        expected_version: ExpectedVersion,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError>;

    /// Remove a base item. Refused while items still reference it.
    fn destroy_base_item(
        &self,
        id: BaseItemId,
        expected_version: ExpectedVersion,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError>;

    fn find(&self, id: BaseItemId) -> Result<Option<BaseItem>, StoreError>;

    fn find_by_name(&self, name: &str) -> Result<Option<BaseItem>, StoreError>;

    fn find_by_partner_key(&self, partner_key: &str) -> Result<Option<BaseItem>, StoreError>;

    fn query(&self, query: &BaseItemQuery) -> Result<Vec<BaseItem>, StoreError>;

    /// Add an item under the base item owning `new_item.partner_key`.
    fn create_item(&self, new_item: NewItem) -> Result<Item, StoreError>;

    fn destroy_item(&self, id: ItemId) -> Result<Item, StoreError>;

    fn items_for(&self, partner_key: &str) -> Result<Vec<Item>, StoreError>;

    fn without_kit(&self) -> Result<Vec<BaseItem>, StoreError> {
        self.query(&BaseItemQuery::all().without_kit())
    }

    fn by_partner_key(&self, partner_key: &str) -> Result<Vec<BaseItem>, StoreError> {
        self.query(&BaseItemQuery::all().by_partner_key(partner_key))
    }

    fn alphabetized(&self) -> Result<Vec<BaseItem>, StoreError> {
        self.query(&BaseItemQuery::all().alphabetized())
    }
}

impl<S> CatalogStore for Arc<S>
where
    S: CatalogStore + ?Sized,
{
    fn create_base_item(
        &self,
        attributes: BaseItemAttributes,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError> {
        (**self).create_base_item(attributes, actor)
    }

    fn update_base_item(
        &self,
        id: BaseItemId,
        changes: BaseItemChanges,
        expected_version: ExpectedVersion,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError> {
        (**self).update_base_item(id, changes, expected_version, actor)
    }

    fn destroy_base_item(
        &self,
        id: BaseItemId,
        expected_version: ExpectedVersion,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError> {
        (**self).destroy_base_item(id, expected_version, actor)
    }

    fn find(&self, id: BaseItemId) -> Result<Option<BaseItem>, StoreError> {
        (**self).find(id)
    }

    fn find_by_name(&self, name: &str) -> Result<Option<BaseItem>, StoreError> {
        (**self).find_by_name(name)
    }

    fn find_by_partner_key(&self, partner_key: &str) -> Result<Option<BaseItem>, StoreError> {
        (**self).find_by_partner_key(partner_key)
    }

    fn query(&self, query: &BaseItemQuery) -> Result<Vec<BaseItem>, StoreError> {
        (**self).query(query)
    }

    fn create_item(&self, new_item: NewItem) -> Result<Item, StoreError> {
        (**self).create_item(new_item)
    }

    fn destroy_item(&self, id: ItemId) -> Result<Item, StoreError> {
        (**self).destroy_item(id)
    }

    fn items_for(&self, partner_key: &str) -> Result<Vec<Item>, StoreError> {
        (**self).items_for(partner_key)
    }
}
