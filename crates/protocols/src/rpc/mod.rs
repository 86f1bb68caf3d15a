//! Ledger node boundary.
//!
//! [`LedgerTransport`] is the only way protocol clients reach the network.
//! [`RpcProvider`] implements it over the algod REST API; tests use the
//! in-memory ledger from [`mock`].

pub mod algod;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

use crate::error::{DecodeError, Result};
use crate::transaction::Transaction;
use async_trait::async_trait;
use dualstake_domain::Address;
use std::collections::HashMap;

pub use algod::{RpcConfig, RpcProvider};

/// Parameters every new transaction is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedParams {
    pub fee_per_byte: u64,
    pub min_fee: u64,
    /// Latest round; new transactions become valid here.
    pub last_round: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
}

/// One asset held by an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetHolding {
    pub asset_id: u64,
    pub amount: u64,
}

/// Subset of account information the clients need.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccountInformation {
    pub address: Address,
    /// Balance in microALGO.
    pub amount: u64,
    pub assets: Vec<AssetHolding>,
    pub incentive_eligible: bool,
}

impl AccountInformation {
    /// Whether the account is opted in to `asset_id`, holding any amount.
    #[must_use]
    pub fn holds(&self, asset_id: u64) -> bool {
        self.assets.iter().any(|h| h.asset_id == asset_id)
    }
}

/// A raw global-state value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TealValue {
    Uint(u64),
    Bytes(Vec<u8>),
}

impl TealValue {
    fn kind(&self) -> &'static str {
        match self {
            TealValue::Uint(_) => "uint",
            TealValue::Bytes(_) => "bytes",
        }
    }
}

/// Global state of an application, keyed by raw key bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlobalState(pub HashMap<Vec<u8>, TealValue>);

impl GlobalState {
    pub fn insert(&mut self, key: &str, value: TealValue) {
        self.0.insert(key.as_bytes().to_vec(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&TealValue> {
        self.0.get(key.as_bytes())
    }

    /// An integer that must be present.
    ///
    /// # Errors
    /// [`DecodeError::MissingKey`] or [`DecodeError::StateType`].
    pub fn require_uint(&self, key: &'static str) -> std::result::Result<u64, DecodeError> {
        match self.get(key) {
            Some(TealValue::Uint(v)) => Ok(*v),
            Some(other) => Err(DecodeError::StateType {
                key,
                expected: "uint",
                found: other.kind(),
            }),
            None => Err(DecodeError::MissingKey(key)),
        }
    }

    /// A byte string that must be present; it may be empty.
    ///
    /// # Errors
    /// [`DecodeError::MissingKey`] or [`DecodeError::StateType`].
    pub fn require_bytes(&self, key: &'static str) -> std::result::Result<&[u8], DecodeError> {
        match self.get(key) {
            Some(TealValue::Bytes(v)) => Ok(v),
            Some(other) => Err(DecodeError::StateType {
                key,
                expected: "bytes",
                found: other.kind(),
            }),
            None => Err(DecodeError::MissingKey(key)),
        }
    }
}

/// Flags of a simulated call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SimulateRequest {
    pub allow_empty_signatures: bool,
    pub allow_unnamed_resources: bool,
    pub fix_signers: bool,
    pub allow_more_logging: bool,
    pub extra_opcode_budget: u64,
}

impl SimulateRequest {
    /// Signature-free read with automatic resource resolution.
    #[must_use]
    pub fn read_only(extra_opcode_budget: u64) -> Self {
        Self {
            allow_empty_signatures: true,
            allow_unnamed_resources: true,
            fix_signers: true,
            allow_more_logging: false,
            extra_opcode_budget,
        }
    }

    /// Lifts the per-call log limits, for batch reads.
    #[must_use]
    pub fn with_more_logging(mut self) -> Self {
        self.allow_more_logging = true;
        self
    }
}

/// Outcome of one simulated transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimulatedTransaction {
    pub logs: Vec<Vec<u8>>,
}

/// Outcome of a simulated group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimulateResponse {
    /// Round the simulation ran against.
    pub last_round: u64,
    pub results: Vec<SimulatedTransaction>,
}

impl SimulateResponse {
    /// Logs of the transaction at `index`, empty when absent.
    #[must_use]
    pub fn logs(&self, index: usize) -> &[Vec<u8>] {
        self.results.get(index).map_or(&[], |r| r.logs.as_slice())
    }
}

/// Request/response access to a ledger node.
///
/// Implementations must be safe for unlimited concurrent use; every call is
/// a read or a simulation.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    async fn suggested_params(&self) -> Result<SuggestedParams>;

    async fn account_information(&self, address: &Address) -> Result<AccountInformation>;

    async fn application_global_state(&self, app_id: u64) -> Result<GlobalState>;

    /// Raw names of every box of `app_id`.
    async fn application_box_names(&self, app_id: u64) -> Result<Vec<Vec<u8>>>;

    async fn application_box(&self, app_id: u64, name: &[u8]) -> Result<Vec<u8>>;

    /// Simulates `txns` as one group. A failed simulation is an error.
    async fn simulate(
        &self,
        txns: &[Transaction],
        request: &SimulateRequest,
    ) -> Result<SimulateResponse>;

    /// Compiles TEAL source to program bytes.
    async fn compile(&self, source: &str) -> Result<Vec<u8>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_state_keys() {
        let mut state = GlobalState::default();
        state.insert("version", TealValue::Uint(3));
        state.insert("lp_type", TealValue::Bytes(b"tm2".to_vec()));

        assert_eq!(state.require_uint("version").unwrap(), 3);
        assert_eq!(state.require_bytes("lp_type").unwrap(), b"tm2");
        assert_eq!(
            state.require_uint("missing"),
            Err(DecodeError::MissingKey("missing"))
        );
        assert!(matches!(
            state.require_uint("lp_type"),
            Err(DecodeError::StateType { found: "bytes", .. })
        ));
    }

    #[test]
    fn test_read_only_flags() {
        let request = SimulateRequest::read_only(700);
        assert!(request.allow_empty_signatures);
        assert!(request.allow_unnamed_resources);
        assert!(request.fix_signers);
        assert!(!request.allow_more_logging);
        assert!(request.with_more_logging().allow_more_logging);
    }

    #[test]
    fn test_holdings_include_zero_balances() {
        let info = AccountInformation {
            assets: vec![AssetHolding {
                asset_id: 5,
                amount: 0,
            }],
            ..Default::default()
        };
        assert!(info.holds(5));
        assert!(!info.holds(6));
    }
}
