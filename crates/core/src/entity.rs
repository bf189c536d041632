//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Local caches use the identifier to patch records in place after the
/// backend confirms a change.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
