//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use dualstake_execution::prelude::*;
//! ```

// Batch
pub use crate::batch::{BatchCoordinator, chunk_ids, merge_into};

// Config
pub use crate::config::{
    BatchConfig, EnvironmentConfig, MAINNET_PRICE_ORACLE_APP_ID, MAINNET_REGISTRY_APP_ID,
    MAINNET_SIMULATION_SENDER, PriceOracleConfig,
};

// Errors
pub use crate::error::{BatchError, ExecutionError, Result};

// Facade
pub use crate::facade::{DualStake, ListingSource};
