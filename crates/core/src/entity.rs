//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Group members and user accounts are entities: two records with the same
/// id describe the same person even when their display names differ.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Whether both values describe the same entity.
    fn same_identity(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
