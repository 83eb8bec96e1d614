//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Entities reference each other only by id; associations are separate records.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
