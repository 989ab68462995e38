//! Audit trail of base item mutations.
//!
//! Every committed create/update/destroy of a base item is recorded as a
//! [`VersionRecord`]: what happened, who did it, which fields changed, and
//! what the record looked like before the change.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use essentials_catalog::{BaseItemId, BaseItemSnapshot};
use essentials_core::UserId;

/// Field name → `(before, after)`.
pub type Changeset = BTreeMap<String, (JsonValue, JsonValue)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionEvent {
    Create,
    Update,
    Destroy,
}

impl VersionEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            VersionEvent::Create => "create",
            VersionEvent::Update => "update",
            VersionEvent::Destroy => "destroy",
        }
    }
}

/// A version about to be recorded (not yet assigned an id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewVersion {
    pub item_id: BaseItemId,
    pub event: VersionEvent,
    pub whodunnit: Option<UserId>,
    /// Record state before the change; `None` for creates.
    pub object: Option<JsonValue>,
    pub object_changes: Changeset,
    pub created_at: DateTime<Utc>,
}

impl NewVersion {
    /// Build a version from the record state before and after a mutation.
    ///
    /// Destroys carry the prior state in `object` and no changeset.
    pub fn from_snapshots(
        event: VersionEvent,
        before: Option<&BaseItemSnapshot>,
        after: Option<&BaseItemSnapshot>,
        whodunnit: Option<UserId>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, VersionStoreError> {
        let item_id = before
            .or(after)
            .map(|s| s.id)
            .ok_or_else(|| VersionStoreError::Invalid("version without a record".to_string()))?;

        let object = before.map(serde_json::to_value).transpose()?;
        let object_changes = match event {
            VersionEvent::Destroy => Changeset::new(),
            VersionEvent::Create | VersionEvent::Update => changeset(before, after)?,
        };

        Ok(Self {
            item_id,
            event,
            whodunnit,
            object,
            object_changes,
            created_at,
        })
    }
}

/// A recorded version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Store-wide, monotonically increasing.
    pub id: u64,
    pub item_type: String,
    pub item_id: BaseItemId,
    /// Position in this item's trail, starting at 1.
    pub index: u64,
    pub event: VersionEvent,
    pub whodunnit: Option<UserId>,
    pub object: Option<JsonValue>,
    pub object_changes: Changeset,
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    /// The `(before, after)` pair for `field`, if it changed.
    pub fn change(&self, field: &str) -> Option<&(JsonValue, JsonValue)> {
        self.object_changes.get(field)
    }
}

#[derive(Debug, Error)]
pub enum VersionStoreError {
    #[error("failed to serialize version: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid version: {0}")]
    Invalid(String),

    #[error("version store lock poisoned")]
    Poisoned,
}

/// Append-only audit trail.
pub trait VersionStore: Send + Sync {
    fn record(&self, version: NewVersion) -> Result<VersionRecord, VersionStoreError>;

    /// Versions of one base item, oldest first.
    fn versions_for(&self, item_id: BaseItemId) -> Result<Vec<VersionRecord>, VersionStoreError>;

    /// Every version, oldest first.
    fn all(&self) -> Result<Vec<VersionRecord>, VersionStoreError>;
}

impl<S> VersionStore for Arc<S>
where
    S: VersionStore + ?Sized,
{
    fn record(&self, version: NewVersion) -> Result<VersionRecord, VersionStoreError> {
        (**self).record(version)
    }

    fn versions_for(&self, item_id: BaseItemId) -> Result<Vec<VersionRecord>, VersionStoreError> {
        (**self).versions_for(item_id)
    }

    fn all(&self) -> Result<Vec<VersionRecord>, VersionStoreError> {
        (**self).all()
    }
}

/// In-memory audit trail for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryVersionStore {
    versions: RwLock<Vec<VersionRecord>>,
}

impl InMemoryVersionStore {
    pub const ITEM_TYPE: &'static str = "BaseItem";

    pub fn new() -> Self {
        Self::default()
    }
}

impl VersionStore for InMemoryVersionStore {
    fn record(&self, version: NewVersion) -> Result<VersionRecord, VersionStoreError> {
        let mut versions = self.versions.write().map_err(|_| VersionStoreError::Poisoned)?;

        let index = versions
            .iter()
            .rev()
            .find(|v| v.item_id == version.item_id)
            .map_or(0, |v| v.index)
            + 1;

        let record = VersionRecord {
            id: versions.last().map(|v| v.id).unwrap_or(0) + 1,
            item_type: Self::ITEM_TYPE.to_string(),
            item_id: version.item_id,
            index,
            event: version.event,
            whodunnit: version.whodunnit,
            object: version.object,
            object_changes: version.object_changes,
            created_at: version.created_at,
        };
        versions.push(record.clone());

        Ok(record)
    }

    fn versions_for(&self, item_id: BaseItemId) -> Result<Vec<VersionRecord>, VersionStoreError> {
        let versions = self.versions.read().map_err(|_| VersionStoreError::Poisoned)?;
        Ok(versions.iter().filter(|v| v.item_id == item_id).cloned().collect())
    }

    fn all(&self) -> Result<Vec<VersionRecord>, VersionStoreError> {
        let versions = self.versions.read().map_err(|_| VersionStoreError::Poisoned)?;
        Ok(versions.clone())
    }
}

/// Fields whose serialized value differs between `before` and `after`.
///
/// A missing side counts as all-null, so a create lists every non-null field.
pub fn changeset(
    before: Option<&BaseItemSnapshot>,
    after: Option<&BaseItemSnapshot>,
) -> Result<Changeset, VersionStoreError> {
    let before = as_object(before)?;
    let after = as_object(after)?;

    let mut changes = Changeset::new();
    for field in before.keys().chain(after.keys()) {
        let old = before.get(field).cloned().unwrap_or(JsonValue::Null);
        let new = after.get(field).cloned().unwrap_or(JsonValue::Null);
        if old != new {
            changes.insert(field.clone(), (old, new));
        }
    }
    Ok(changes)
}

fn as_object(
    snapshot: Option<&BaseItemSnapshot>,
) -> Result<serde_json::Map<String, JsonValue>, VersionStoreError> {
    match snapshot.map(serde_json::to_value).transpose()? {
        Some(JsonValue::Object(map)) => Ok(map),
        Some(_) => Err(VersionStoreError::Invalid(
            "snapshot did not serialize to an object".to_string(),
        )),
        None => Ok(serde_json::Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use essentials_catalog::{ReportingCategory, classify};
    use essentials_core::AggregateId;
    use serde_json::json;

    fn snapshot(id: BaseItemId, name: &str) -> BaseItemSnapshot {
        BaseItemSnapshot {
            id,
            name: name.to_string(),
            partner_key: "liners".to_string(),
            category: None,
            size: None,
            barcode_count: None,
            item_count: 0,
            reporting_category: classify(name),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn update_changeset_lists_only_changed_fields() {
        let id = BaseItemId::new(AggregateId::new());
        let before = snapshot(id, "Kids S/M (38-65 lbs)");
        let after = snapshot(id, "Liners (Incontinence)");

        let changes = changeset(Some(&before), Some(&after)).unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(
            changes["name"],
            (json!("Kids S/M (38-65 lbs)"), json!("Liners (Incontinence)"))
        );
        assert_eq!(
            changes["reporting_category"],
            (json!("disposable_diapers"), json!(ReportingCategory::AdultIncontinence.as_str()))
        );
    }

    #[test]
    fn create_changeset_skips_null_fields() {
        let id = BaseItemId::new(AggregateId::new());
        let after = snapshot(id, "Foobar");

        let changes = changeset(None, Some(&after)).unwrap();

        assert!(changes.contains_key("name"));
        assert!(changes.contains_key("partner_key"));
        assert!(!changes.contains_key("category"));
        assert_eq!(changes["name"].0, JsonValue::Null);
    }

    #[test]
    fn destroy_keeps_prior_state_without_changes() {
        let id = BaseItemId::new(AggregateId::new());
        let before = snapshot(id, "Foobar");

        let version = NewVersion::from_snapshots(
            VersionEvent::Destroy,
            Some(&before),
            None,
            None,
            Utc::now(),
        )
        .unwrap();

        assert!(version.object_changes.is_empty());
        assert_eq!(version.object.unwrap()["name"], json!("Foobar"));
    }

    #[test]
    fn version_needs_a_record() {
        let err = NewVersion::from_snapshots(VersionEvent::Create, None, None, None, Utc::now())
            .unwrap_err();
        assert!(matches!(err, VersionStoreError::Invalid(_)));
    }

    #[test]
    fn in_memory_store_numbers_versions_and_filters_by_item() {
        let store = InMemoryVersionStore::new();
        let a = BaseItemId::new(AggregateId::new());
        let b = BaseItemId::new(AggregateId::new());

        for (id, name) in [(a, "A"), (b, "B"), (a, "A2"), (b, "B2"), (a, "A3")] {
            let after = snapshot(id, name);
            store
                .record(
                    NewVersion::from_snapshots(VersionEvent::Create, None, Some(&after), None, Utc::now())
                        .unwrap(),
                )
                .unwrap();
        }

        let for_a = store.versions_for(a).unwrap();
        assert_eq!(for_a.iter().map(|v| v.id).collect::<Vec<_>>(), vec![1, 3, 5]);
        assert_eq!(for_a.iter().map(|v| v.index).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(for_a[0].item_type, "BaseItem");

        let for_b = store.versions_for(b).unwrap();
        assert_eq!(for_b.iter().map(|v| v.index).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(store.all().unwrap().len(), 5);
    }
}
