//! Domain model for dualSTAKE pools.
//!
//! Value objects and records returned by the protocol clients. Everything
//! here is a plain value owned by the caller; no I/O happens in this crate.

pub mod entities;
pub mod enums;
pub mod network;
pub mod value_objects;

pub use entities::{
    ContractListing, ContractMapping, ContractState, ContractUpgradeState, FeeUpdateState,
    OracleQuote, PriceAndTvl,
};
pub use enums::Environment;
pub use network::{NetworkConstants, NetworkConstantsOverrides};
pub use value_objects::{Address, AddressError, PageHash};
