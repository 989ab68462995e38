//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Child records (e.g. catalog items owned by a base item) implement this
/// without being aggregate roots themselves.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
