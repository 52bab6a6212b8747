//! Value object trait: equality by value, not identity.
//!
//! `Money`, `Currency` and split allocations are value objects: two allocations
//! with the same shares are the same allocation, whichever expense they came from.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values. To
/// "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
