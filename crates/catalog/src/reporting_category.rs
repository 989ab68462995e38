//! Name → reporting category classification.
//!
//! Reporting categories are derived from a base item's name through an
//! ordered rule table. Rules are tested top to bottom and the first match
//! wins, so the order of [`RULES`] is part of the contract.

use serde::{Deserialize, Serialize};

use essentials_core::ValueObject;

use crate::base_item::KIT_NAME;

/// Coarse label used for aggregate reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingCategory {
    AdultIncontinence,
    DisposableDiapers,
    Other,
}

impl ReportingCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportingCategory::AdultIncontinence => "adult_incontinence",
            ReportingCategory::DisposableDiapers => "disposable_diapers",
            ReportingCategory::Other => "other",
        }
    }
}

impl core::fmt::Display for ReportingCategory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValueObject for ReportingCategory {}

/// Size markers used by children's disposable diaper names,
/// e.g. "Kids (Size 4)", "Kids S/M (38-65 lbs)", "Kids Pull-Ups (2T-3T)".
const KIDS_SIZE_TOKENS: &[&str] = &[
    "(Size ",
    "(Newborn)",
    "(Preemie)",
    "S/M (",
    "L/XL (",
    "Pull-Ups",
];

/// How a rule matches a name. All matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePattern {
    /// The whole name equals the given text.
    Exact(&'static str),
    /// The name contains the given text anywhere.
    Contains(&'static str),
    /// Children's diaper sizing: starts with "Kids" and carries a size marker.
    KidsDiaperSizing,
}

impl NamePattern {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(text) => name == *text,
            NamePattern::Contains(text) => name.contains(text),
            NamePattern::KidsDiaperSizing => {
                name.starts_with("Kids") && KIDS_SIZE_TOKENS.iter().any(|t| name.contains(t))
            }
        }
    }
}

/// One row of the classification table.
///
/// `category: None` means "explicitly unclassified" and stops the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationRule {
    pub pattern: NamePattern,
    pub category: Option<ReportingCategory>,
}

/// Ordered rule table; first match wins.
pub const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        pattern: NamePattern::Exact(KIT_NAME),
        category: None,
    },
    ClassificationRule {
        pattern: NamePattern::Contains("Incontinence"),
        category: Some(ReportingCategory::AdultIncontinence),
    },
    ClassificationRule {
        pattern: NamePattern::KidsDiaperSizing,
        category: Some(ReportingCategory::DisposableDiapers),
    },
];

/// Derive the reporting category for a base item name.
///
/// Pure function of `name`. Kits stay unclassified; anything no rule
/// recognises is `Other`.
pub fn classify(name: &str) -> Option<ReportingCategory> {
    RULES
        .iter()
        .find(|rule| rule.pattern.matches(name))
        .map_or(Some(ReportingCategory::Other), |rule| rule.category)
}
