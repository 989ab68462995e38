use serde::{Deserialize, Serialize};

use essentials_core::{AggregateId, Entity, ValidationErrors};

/// Item identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub AggregateId);

impl ItemId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// An organization's own item, belonging to exactly one base item.
///
/// The link is the base item's `partner_key`, not its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    name: String,
    partner_key: String,
}

impl Item {
    pub fn new(id: ItemId, new_item: NewItem) -> Self {
        Self {
            id,
            name: new_item.name,
            partner_key: new_item.partner_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Partner key of the owning base item.
    pub fn partner_key(&self) -> &str {
        &self.partner_key
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Input for creating an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub partner_key: String,
}

impl NewItem {
    pub fn new(name: impl Into<String>, partner_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partner_key: partner_key.into(),
        }
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", ValidationErrors::BLANK);
        }
        if self.partner_key.trim().is_empty() {
            errors.add("base_item", ValidationErrors::BLANK);
        }
        errors
    }
}
