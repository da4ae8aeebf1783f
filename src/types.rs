//! Common type aliases.

/// Process-unique integer identifier of a node or element.
///
/// Global ordinals are supplied by the source mesh and preserved through the
/// rendezvous redistribution; the crate never renumbers them.
pub type GlobalOrdinal = usize;
