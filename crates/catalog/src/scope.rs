//! Named, composable filters over base items.
//!
//! ```ignore
//! let visible = store.query(&BaseItemQuery::all().without_kit().alphabetized())?;
//! ```

use crate::base_item::BaseItem;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BaseItemOrder {
    /// Creation order (ids are time-ordered).
    #[default]
    Id,
    /// `name` ascending, byte-wise.
    Name,
}

/// A conjunction of scopes. An empty query matches every live base item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BaseItemQuery {
    exclude_kit: bool,
    partner_key: Option<String>,
    order: BaseItemOrder,
}

impl BaseItemQuery {
    pub fn all() -> Self {
        Self::default()
    }

    /// Everything except the `"Kit"` base item.
    pub fn without_kit(mut self) -> Self {
        self.exclude_kit = true;
        self
    }

    /// Records whose partner key equals `partner_key` exactly.
    pub fn by_partner_key(mut self, partner_key: impl Into<String>) -> Self {
        self.partner_key = Some(partner_key.into());
        self
    }

    pub fn alphabetized(mut self) -> Self {
        self.order = BaseItemOrder::Name;
        self
    }

    pub fn order(&self) -> BaseItemOrder {
        self.order
    }

    pub fn matches(&self, base_item: &BaseItem) -> bool {
        if !base_item.is_live() {
            return false;
        }
        if self.exclude_kit && base_item.is_kit() {
            return false;
        }
        match &self.partner_key {
            Some(key) => base_item.partner_key() == key,
            None => true,
        }
    }

    /// Filter and order `base_items`.
    pub fn apply<'a>(&self, base_items: impl IntoIterator<Item = &'a BaseItem>) -> Vec<BaseItem> {
        let mut matched: Vec<BaseItem> = base_items
            .into_iter()
            .filter(|b| self.matches(b))
            .cloned()
            .collect();

        match self.order {
            BaseItemOrder::Id => matched.sort_by_key(|b| b.id_typed()),
            BaseItemOrder::Name => {
                matched.sort_by(|a, b| a.name().cmp(b.name()).then(a.id_typed().cmp(&b.id_typed())))
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_item::{
        BaseItemAttributes, BaseItemCommand, BaseItemId, CreateBaseItem, KIT_NAME,
    };
    use chrono::Utc;
    use essentials_core::{Aggregate, AggregateId};

    fn base_item(name: &str, partner_key: &str) -> BaseItem {
        let id = BaseItemId::new(AggregateId::new());
        let mut item = BaseItem::empty(id);
        let events = item
            .handle(&BaseItemCommand::CreateBaseItem(CreateBaseItem {
                base_item_id: id,
                attributes: BaseItemAttributes::new(name, partner_key),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        item.apply(&events[0]);
        item
    }

    fn names(items: &[BaseItem]) -> Vec<&str> {
        items.iter().map(|b| b.name()).collect()
    }

    #[test]
    fn without_kit_excludes_only_the_kit() {
        let catalog = vec![
            base_item("Wipes", "wipes"),
            base_item(KIT_NAME, "kit"),
            base_item("Kit Bag", "kit_bag"),
        ];

        let visible = BaseItemQuery::all().without_kit().alphabetized().apply(&catalog);

        assert_eq!(names(&visible), vec!["Kit Bag", "Wipes"]);
    }

    #[test]
    fn by_partner_key_is_exact_and_case_sensitive() {
        let catalog = vec![
            base_item("Wipes", "UniqueString"),
            base_item("Pads", "uniquestring"),
        ];

        assert_eq!(BaseItemQuery::all().by_partner_key("UniqueString").apply(&catalog).len(), 1);
        assert!(BaseItemQuery::all().by_partner_key("random_string").apply(&catalog).is_empty());
    }

    #[test]
    fn alphabetized_orders_by_name() {
        let catalog = vec![
            base_item("Wipes", "wipes"),
            base_item("Adult Briefs", "adult_briefs"),
            base_item("Kids (Size 1)", "kids_1"),
        ];

        let sorted = BaseItemQuery::all().alphabetized().apply(&catalog);

        assert_eq!(names(&sorted), vec!["Adult Briefs", "Kids (Size 1)", "Wipes"]);
    }

    #[test]
    fn uncreated_items_never_match() {
        let ghost = BaseItem::empty(BaseItemId::new(AggregateId::new()));
        assert!(!BaseItemQuery::all().matches(&ghost));
    }
}
