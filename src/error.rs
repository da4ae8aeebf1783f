//! Error type shared by all rendezvous operations.

use thiserror::Error;

/// Errors produced while building a rendezvous decomposition.
///
/// A point that misses the mesh during an element query is not an error; it
/// is reported in band through the
/// [`NO_ELEMENT`](crate::constants::NO_ELEMENT) sentinel.
///
/// Failures inside collective operations are detected collectively: when any
/// rank fails, every rank of the communicator observes an error of the same
/// kind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RendezvousError {
    /// A mesh or bounding box violates the input contract.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// RCB could not form a partition of the active point set.
    #[error("partition failed: {0}")]
    Partition(String),
    /// A distributor exchange could not be set up or delivered inconsistent
    /// data.
    #[error("communication failed: {0}")]
    Communication(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RendezvousError>;
