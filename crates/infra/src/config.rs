//! Store configuration.

use serde::{Deserialize, Serialize};

/// Knobs for [`InMemoryCatalogStore`](crate::catalog_store::InMemoryCatalogStore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStoreConfig {
    /// Record an audit version for every create/update/destroy.
    pub record_versions: bool,
    /// Publish committed events on the bus.
    pub publish_events: bool,
}

impl Default for CatalogStoreConfig {
    fn default() -> Self {
        Self {
            record_versions: true,
            publish_events: true,
        }
    }
}

impl CatalogStoreConfig {
    pub const RECORD_VERSIONS_VAR: &'static str = "ESSENTIALS_RECORD_VERSIONS";
    pub const PUBLISH_EVENTS_VAR: &'static str = "ESSENTIALS_PUBLISH_EVENTS";

    /// Read overrides from the environment. Unset variables keep the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            record_versions: lookup(Self::RECORD_VERSIONS_VAR)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.record_versions),
            publish_events: lookup(Self::PUBLISH_EVENTS_VAR)
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.publish_events),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "false" | "0" | "no" | "off"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_record_and_publish() {
        let config = CatalogStoreConfig::from_lookup(|_| None);
        assert_eq!(config, CatalogStoreConfig::default());
        assert!(config.record_versions);
        assert!(config.publish_events);
    }

    #[test]
    fn false_like_values_disable() {
        let config = CatalogStoreConfig::from_lookup(|key| match key {
            CatalogStoreConfig::PUBLISH_EVENTS_VAR => Some("0".to_string()),
            CatalogStoreConfig::RECORD_VERSIONS_VAR => Some("False".to_string()),
            _ => None,
        });
        assert!(!config.publish_events);
        assert!(!config.record_versions);
    }

    #[test]
    fn other_values_enable() {
        let config = CatalogStoreConfig::from_lookup(|_| Some("yes".to_string()));
        assert!(config.record_versions);
        assert!(config.publish_events);
    }
}
