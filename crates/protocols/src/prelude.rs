//! Prelude module for convenient imports.
//!
//! # Example
//!
//! ```rust
//! use dualstake_protocols::prelude::*;
//! ```

// Clients
pub use crate::dualstake::params::{
    ConfigureParams, ContractAssignmentParams, KeyregOnlineParams, MintParams, OnBehalfParams,
    ProtestParams, QueueUpdateFeesParams, QueueUpgradeParams, RedeemParams, TokenMetadataParams,
    UpgradeParams, VanityConfigureParams, WithdrawFeesParams,
};
pub use crate::dualstake::{
    ContractContext, ContractSchema, PoolClient, PriceOracleClient, ReadableContract,
    RegistryClient, TransactionBuilder,
};

// Errors
pub use crate::error::{
    DecodeError, DualStakeError, EncodeError, Result, TransportError, ValidationError,
};

// Transport
pub use crate::rpc::{LedgerTransport, RpcConfig, RpcProvider, SimulateRequest, SuggestedParams};

// Transactions
pub use crate::transaction::{ApplicationCall, FeeSpec, GroupBuilder, OnComplete, Transaction};
