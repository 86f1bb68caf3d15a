//! Error types for multi-pool reads.

use dualstake_protocols::DualStakeError;
use thiserror::Error;

/// One chunk of a batch failed.
///
/// Carries the chunk's identifiers so a retry can reuse the same boundaries.
#[derive(Debug, Error)]
#[error("chunk {index} ({} ids) failed: {source}", ids.len())]
pub struct BatchError {
    /// Position of the chunk in the batch.
    pub index: usize,
    /// Identifiers the chunk covered.
    pub ids: Vec<u64>,
    /// Underlying failure.
    #[source]
    pub source: DualStakeError,
}

/// Errors returned by the facade.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Protocol(#[from] DualStakeError),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error("no price oracle application configured")]
    PriceOracleNotConfigured,
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ExecutionError>;
