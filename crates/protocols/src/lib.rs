//! Protocol layer for the dualSTAKE contracts.
//!
//! This crate provides:
//! - ARC-4 and raw binary decoding of contract values, logs and state blobs
//! - Mapping of decoded tuples and global state onto domain records
//! - Resource, box and fee resolution for contract calls
//! - Atomic transaction group construction with canonical msgpack encoding
//! - Clients for the pool, registry and price-oracle contracts

/// Prelude module for convenient imports.
pub mod prelude;

/// Binary and ABI codec.
pub mod codec;
/// Contract clients.
pub mod dualstake;
/// Error types.
pub mod error;
/// Ledger node transport.
pub mod rpc;
/// Transactions and atomic groups.
pub mod transaction;

pub use error::{DecodeError, DualStakeError, EncodeError, Result, TransportError, ValidationError};
