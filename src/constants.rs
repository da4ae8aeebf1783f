//! Crate-wide constants.

use crate::types::GlobalOrdinal;

/// Sentinel returned by element queries when no element contains the point.
///
/// This value is reserved; meshes must not use it as an element ordinal.
pub const NO_ELEMENT: GlobalOrdinal = GlobalOrdinal::MAX;

/// Maximum number of elements held by a kD-tree leaf.
pub const MAX_LEAF_SIZE: usize = 8;

/// Iteration cap for the collective median bisection inside RCB.
pub const MEDIAN_ITERS: usize = 100;

/// Tolerance of the straight-sided point-in-cell predicates.
pub const GEOMETRIC_TOL: f64 = 1.0e-10;
