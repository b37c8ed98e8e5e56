//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Directory records (permissions, roles, menu items) are entities; join
/// records are not.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
