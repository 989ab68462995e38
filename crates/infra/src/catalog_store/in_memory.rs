use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use essentials_catalog::{
    BaseItem, BaseItemAttributes, BaseItemChanges, BaseItemCommand, BaseItemEvent, BaseItemId,
    BaseItemQuery, ChangeItemCount, CreateBaseItem, DestroyBaseItem, Item, ItemId, NewItem,
    UpdateBaseItem,
};
use essentials_core::{
    Aggregate, AggregateId, AggregateRoot, DomainError, Entity, ExpectedVersion, UserId,
    ValidationErrors,
};
use essentials_events::{Command, Event, EventBus, EventEnvelope, InMemoryEventBus};

use super::r#trait::{CatalogStore, StoreError};
use crate::config::CatalogStoreConfig;
use crate::versioning::{InMemoryVersionStore, NewVersion, VersionEvent, VersionStore};

/// Aggregate type stamped on published envelopes.
pub const AGGREGATE_TYPE: &str = "catalog.base_item";

type UniqueIndex = HashMap<String, BaseItemId>;

#[derive(Debug, Default)]
struct CatalogState {
    base_items: HashMap<BaseItemId, BaseItem>,
    names: UniqueIndex,
    partner_keys: UniqueIndex,
    items: HashMap<ItemId, Item>,
}

impl CatalogState {
    fn live(&self, id: BaseItemId) -> Result<&BaseItem, StoreError> {
        self.base_items
            .get(&id)
            .filter(|b| b.is_live())
            .ok_or(StoreError::Domain(DomainError::NotFound))
    }

    fn by_index(&self, index: &UniqueIndex, value: &str) -> Option<&BaseItem> {
        index
            .get(value)
            .and_then(|id| self.base_items.get(id))
            .filter(|b| b.is_live())
    }

    /// Application-level uniqueness pre-check, reported per field.
    fn uniqueness_errors(
        &self,
        attributes: &BaseItemAttributes,
        except: Option<BaseItemId>,
    ) -> ValidationErrors {
        let taken = |index: &UniqueIndex, value: &str| {
            index.get(value).is_some_and(|owner| Some(*owner) != except)
        };

        let mut errors = ValidationErrors::new();
        if taken(&self.names, &attributes.name) {
            errors.add("name", ValidationErrors::TAKEN);
        }
        if taken(&self.partner_keys, &attributes.partner_key) {
            errors.add("partner_key", ValidationErrors::TAKEN);
        }
        errors
    }

    /// Storage-level unique index check.
    fn check_indexes(&self, base_item: &BaseItem) -> Result<(), StoreError> {
        let id = base_item.id_typed();
        claim(&self.names, "name", base_item.name(), id)?;
        claim(&self.partner_keys, "partner_key", base_item.partner_key(), id)
    }

    fn commit(&mut self, before: Option<&BaseItem>, after: BaseItem) {
        let id = after.id_typed();
        if let Some(before) = before {
            release(&mut self.names, before.name(), id);
            release(&mut self.partner_keys, before.partner_key(), id);
        }

        if after.is_live() {
            self.names.insert(after.name().to_string(), id);
            self.partner_keys.insert(after.partner_key().to_string(), id);
            self.base_items.insert(id, after);
        } else {
            self.base_items.remove(&id);
        }
    }
}

fn claim(index: &UniqueIndex, field: &'static str, value: &str, id: BaseItemId) -> Result<(), StoreError> {
    match index.get(value) {
        Some(owner) if *owner != id => Err(StoreError::UniqueViolation {
            field,
            value: value.to_string(),
        }),
        _ => Ok(()),
    }
}

fn release(index: &mut UniqueIndex, value: &str, id: BaseItemId) {
    if index.get(value) == Some(&id) {
        index.remove(value);
    }
}

/// Run `command` against `base_item` and return the resulting state with
/// the events that produced it.
fn decide(
    base_item: &BaseItem,
    command: BaseItemCommand,
) -> Result<(BaseItem, Vec<BaseItemEvent>), StoreError> {
    if command.target_aggregate_id() != base_item.id_typed().0 {
        return Err(DomainError::invariant("command targets another base item").into());
    }
    let events = base_item.handle(&command)?;
    let mut next = base_item.clone();
    for event in &events {
        next.apply(event);
    }
    Ok((next, events))
}

fn reject(operation: &'static str, errors: ValidationErrors) -> StoreError {
    tracing::warn!(operation, fields = %errors, "base item rejected");
    StoreError::Domain(DomainError::Invalid(errors))
}

/// In-memory catalog store.
///
/// A single `RwLock` around all records is the transaction boundary: each
/// write validates, records its audit version and commits while holding the
/// write lock. Committed events are published before the lock is released.
#[derive(Debug)]
pub struct InMemoryCatalogStore<V, B> {
    state: RwLock<CatalogState>,
    versions: V,
    bus: B,
    config: CatalogStoreConfig,
}

/// Fully in-memory wiring, handy for tests and local tooling.
pub type LocalCatalogStore =
    InMemoryCatalogStore<Arc<InMemoryVersionStore>, Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>>;

impl<V, B> InMemoryCatalogStore<V, B> {
    pub fn new(versions: V, bus: B) -> Self {
        Self::with_config(versions, bus, CatalogStoreConfig::default())
    }

    pub fn with_config(versions: V, bus: B, config: CatalogStoreConfig) -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            versions,
            bus,
            config,
        }
    }

    pub fn versions(&self) -> &V {
        &self.versions
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn config(&self) -> CatalogStoreConfig {
        self.config
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CatalogState>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CatalogState>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }
}

impl LocalCatalogStore {
    pub fn local() -> Self {
        Self::local_with_config(CatalogStoreConfig::default())
    }

    pub fn local_with_config(config: CatalogStoreConfig) -> Self {
        Self::with_config(
            Arc::new(InMemoryVersionStore::new()),
            Arc::new(InMemoryEventBus::new()),
            config,
        )
    }
}

impl<V, B> InMemoryCatalogStore<V, B>
where
    V: VersionStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn record_version(
        &self,
        event: VersionEvent,
        before: Option<&BaseItem>,
        after: Option<&BaseItem>,
        actor: Option<UserId>,
    ) -> Result<(), StoreError> {
        if !self.config.record_versions {
            return Ok(());
        }

        let before = before.map(BaseItem::snapshot);
        let after = after.map(BaseItem::snapshot);
        let version =
            NewVersion::from_snapshots(event, before.as_ref(), after.as_ref(), actor, Utc::now())?;
        self.versions.record(version)?;
        Ok(())
    }

    /// Publish committed events. Called with the write guard still held so
    /// envelopes of one stream leave in sequence order. Failures are logged
    /// and not returned: the commit already happened.
    fn publish(&self, base_item_id: BaseItemId, first_sequence: u64, events: &[BaseItemEvent]) {
        if !self.config.publish_events {
            return;
        }

        for (sequence_number, event) in (first_sequence..).zip(events) {
            let payload = match serde_json::to_value(event) {
                Ok(payload) => payload,
                Err(err) => {
                    tracing::warn!(%base_item_id, error = %err, "failed to serialize event");
                    continue;
                }
            };
            let envelope = EventEnvelope::new(
                Uuid::now_v7(),
                base_item_id.0,
                AGGREGATE_TYPE,
                event.event_type(),
                sequence_number,
                payload,
            );
            if let Err(err) = self.bus.publish(envelope) {
                tracing::warn!(%base_item_id, error = ?err, "failed to publish event");
            }
        }
    }
}

impl<V, B> CatalogStore for InMemoryCatalogStore<V, B>
where
    V: VersionStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    fn create_base_item(
        &self,
        attributes: BaseItemAttributes,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError> {
        let id = BaseItemId::new(AggregateId::new());
        let mut state = self.write()?;

        let mut errors = attributes.validate();
        errors.merge(state.uniqueness_errors(&attributes, None));
        if !errors.is_empty() {
            return Err(reject("create", errors));
        }

        let (created, events) = decide(
            &BaseItem::empty(id),
            BaseItemCommand::CreateBaseItem(CreateBaseItem {
                base_item_id: id,
                attributes,
                occurred_at: Utc::now(),
            }),
        )?;
        state.check_indexes(&created)?;
        self.record_version(VersionEvent::Create, None, Some(&created), actor)?;
        state.commit(None, created.clone());
        self.publish(id, 1, &events);
        drop(state);

        tracing::info!(
            base_item_id = %id,
            partner_key = created.partner_key(),
            reporting_category = ?created.reporting_category(),
            "base item created"
        );
        Ok(created)
    }

    fn update_base_item(
        &self,
        id: BaseItemId,
        changes: BaseItemChanges,
        expected_version: ExpectedVersion,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError> {
        let mut state = self.write()?;
        let current = state.live(id)?.clone();
        expected_version.check(current.version())?;

        let next_attributes = current.attributes().merged(&changes);
        let mut errors = next_attributes.validate();
        errors.merge(state.uniqueness_errors(&next_attributes, Some(id)));
        if !errors.is_empty() {
            return Err(reject("update", errors));
        }

        let (updated, events) = decide(
            &current,
            BaseItemCommand::UpdateBaseItem(UpdateBaseItem {
                base_item_id: id,
                changes,
                occurred_at: Utc::now(),
            }),
        )?;
        if events.is_empty() {
            tracing::debug!(base_item_id = %id, "base item unchanged");
            return Ok(current);
        }

        state.check_indexes(&updated)?;
        self.record_version(VersionEvent::Update, Some(&current), Some(&updated), actor)?;
        state.commit(Some(&current), updated.clone());
        self.publish(id, current.version() + 1, &events);
        drop(state);

        tracing::info!(
            base_item_id = %id,
            partner_key = updated.partner_key(),
            reporting_category = ?updated.reporting_category(),
            "base item updated"
        );
        Ok(updated)
    }

    fn destroy_base_item(
        &self,
        id: BaseItemId,
        expected_version: ExpectedVersion,
        actor: Option<UserId>,
    ) -> Result<BaseItem, StoreError> {
        let mut state = self.write()?;
        let current = state.live(id)?.clone();
        expected_version.check(current.version())?;

        let (destroyed, events) = decide(
            &current,
            BaseItemCommand::DestroyBaseItem(DestroyBaseItem {
                base_item_id: id,
                occurred_at: Utc::now(),
            }),
        )?;
        self.record_version(VersionEvent::Destroy, Some(&current), None, actor)?;
        state.commit(Some(&current), destroyed);
        self.publish(id, current.version() + 1, &events);
        drop(state);

        tracing::info!(base_item_id = %id, partner_key = current.partner_key(), "base item destroyed");
        Ok(current)
    }

    fn find(&self, id: BaseItemId) -> Result<Option<BaseItem>, StoreError> {
        let state = self.read()?;
        Ok(state.base_items.get(&id).filter(|b| b.is_live()).cloned())
    }

    fn find_by_name(&self, name: &str) -> Result<Option<BaseItem>, StoreError> {
        let state = self.read()?;
        Ok(state.by_index(&state.names, name).cloned())
    }

    fn find_by_partner_key(&self, partner_key: &str) -> Result<Option<BaseItem>, StoreError> {
        let state = self.read()?;
        Ok(state.by_index(&state.partner_keys, partner_key).cloned())
    }

    fn query(&self, query: &BaseItemQuery) -> Result<Vec<BaseItem>, StoreError> {
        let state = self.read()?;
        Ok(query.apply(state.base_items.values()))
    }

    fn create_item(&self, new_item: NewItem) -> Result<Item, StoreError> {
        new_item.validate().into_result()?;

        let mut state = self.write()?;
        let owner = state
            .by_index(&state.partner_keys, &new_item.partner_key)
            .cloned()
            .ok_or(StoreError::Domain(DomainError::NotFound))?;

        let (counted, events) = decide(
            &owner,
            BaseItemCommand::ChangeItemCount(ChangeItemCount {
                base_item_id: owner.id_typed(),
                delta: 1,
                occurred_at: Utc::now(),
            }),
        )?;
        let item = Item::new(ItemId::new(AggregateId::new()), new_item);
        state.items.insert(*item.id(), item.clone());
        state.commit(Some(&owner), counted.clone());
        self.publish(owner.id_typed(), owner.version() + 1, &events);
        drop(state);

        tracing::debug!(
            base_item_id = %owner.id_typed(),
            item_id = %item.id(),
            item_count = counted.item_count(),
            "item added"
        );
        Ok(item)
    }

    fn destroy_item(&self, id: ItemId) -> Result<Item, StoreError> {
        let mut state = self.write()?;
        let item = state
            .items
            .get(&id)
            .cloned()
            .ok_or(StoreError::Domain(DomainError::NotFound))?;
        let owner = state
            .by_index(&state.partner_keys, item.partner_key())
            .cloned()
            .ok_or_else(|| DomainError::invariant("item references a missing base item"))?;

        let (counted, events) = decide(
            &owner,
            BaseItemCommand::ChangeItemCount(ChangeItemCount {
                base_item_id: owner.id_typed(),
                delta: -1,
                occurred_at: Utc::now(),
            }),
        )?;
        state.items.remove(&id);
        state.commit(Some(&owner), counted.clone());
        self.publish(owner.id_typed(), owner.version() + 1, &events);
        drop(state);

        tracing::debug!(
            base_item_id = %owner.id_typed(),
            item_id = %id,
            item_count = counted.item_count(),
            "item removed"
        );
        Ok(item)
    }

    fn items_for(&self, partner_key: &str) -> Result<Vec<Item>, StoreError> {
        let state = self.read()?;
        let mut items: Vec<Item> = state
            .items
            .values()
            .filter(|i| i.partner_key() == partner_key)
            .cloned()
            .collect();
        items.sort_by_key(|i| *i.id());
        Ok(items)
    }
}
