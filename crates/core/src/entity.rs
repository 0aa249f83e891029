//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Mutability is a property of which operations a service exposes, not of the
/// type itself; every entity is a plain struct with a version field.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;

    /// Monotonically increasing row version (optimistic concurrency).
    fn version(&self) -> u64;
}
