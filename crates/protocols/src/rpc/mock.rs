//! In-memory ledger for tests.

use super::{
    AccountInformation, AssetHolding, GlobalState, LedgerTransport, SimulateRequest,
    SimulateResponse, SuggestedParams,
};
use crate::error::{Result, TransportError};
use crate::transaction::Transaction;
use async_trait::async_trait;
use dualstake_domain::Address;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scripted simulation: receives the group and flags, returns the outcome.
pub type SimulateHandler =
    Box<dyn Fn(&[Transaction], &SimulateRequest) -> Result<SimulateResponse> + Send + Sync>;

/// A ledger that answers from fixed tables.
///
/// Unknown accounts have no holdings; unknown boxes answer with status 404.
pub struct MockLedger {
    pub params: SuggestedParams,
    accounts: HashMap<Address, AccountInformation>,
    global_states: HashMap<u64, GlobalState>,
    boxes: HashMap<u64, Vec<(Vec<u8>, Vec<u8>)>>,
    simulate_handler: Option<SimulateHandler>,
    simulate_calls: AtomicUsize,
    simulated: Mutex<Vec<(Vec<Transaction>, SimulateRequest)>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: SuggestedParams {
                fee_per_byte: 0,
                min_fee: 1_000,
                last_round: 1_000,
                genesis_id: "testnet-v1.0".to_string(),
                genesis_hash: [9u8; 32],
            },
            accounts: HashMap::new(),
            global_states: HashMap::new(),
            boxes: HashMap::new(),
            simulate_handler: None,
            simulate_calls: AtomicUsize::new(0),
            simulated: Mutex::new(Vec::new()),
        }
    }

    /// Marks `address` as opted in to `asset_id` with `amount`.
    #[must_use]
    pub fn with_holding(mut self, address: Address, asset_id: u64, amount: u64) -> Self {
        let account = self
            .accounts
            .entry(address)
            .or_insert_with(|| AccountInformation {
                address,
                ..Default::default()
            });
        account.assets.push(AssetHolding { asset_id, amount });
        self
    }

    #[must_use]
    pub fn with_account(mut self, info: AccountInformation) -> Self {
        self.accounts.insert(info.address, info);
        self
    }

    #[must_use]
    pub fn with_global_state(mut self, app_id: u64, state: GlobalState) -> Self {
        self.global_states.insert(app_id, state);
        self
    }

    #[must_use]
    pub fn with_box(mut self, app_id: u64, name: Vec<u8>, value: Vec<u8>) -> Self {
        self.boxes.entry(app_id).or_default().push((name, value));
        self
    }

    #[must_use]
    pub fn with_simulate<F>(mut self, handler: F) -> Self
    where
        F: Fn(&[Transaction], &SimulateRequest) -> Result<SimulateResponse> + Send + Sync + 'static,
    {
        self.simulate_handler = Some(Box::new(handler));
        self
    }

    /// Number of simulate calls served.
    #[must_use]
    pub fn simulate_calls(&self) -> usize {
        self.simulate_calls.load(Ordering::SeqCst)
    }

    /// Every simulated group with its flags, in arrival order.
    #[must_use]
    pub fn simulated(&self) -> Vec<(Vec<Transaction>, SimulateRequest)> {
        self.simulated
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

fn not_found(what: &str) -> crate::error::DualStakeError {
    TransportError::Status {
        status: 404,
        body: format!("{what} not found"),
    }
    .into()
}

#[async_trait]
impl LedgerTransport for MockLedger {
    async fn suggested_params(&self) -> Result<SuggestedParams> {
        Ok(self.params.clone())
    }

    async fn account_information(&self, address: &Address) -> Result<AccountInformation> {
        Ok(self
            .accounts
            .get(address)
            .cloned()
            .unwrap_or_else(|| AccountInformation {
                address: *address,
                ..Default::default()
            }))
    }

    async fn application_global_state(&self, app_id: u64) -> Result<GlobalState> {
        self.global_states
            .get(&app_id)
            .cloned()
            .ok_or_else(|| not_found("application"))
    }

    async fn application_box_names(&self, app_id: u64) -> Result<Vec<Vec<u8>>> {
        Ok(self
            .boxes
            .get(&app_id)
            .map(|boxes| boxes.iter().map(|(name, _)| name.clone()).collect())
            .unwrap_or_default())
    }

    async fn application_box(&self, app_id: u64, name: &[u8]) -> Result<Vec<u8>> {
        self.boxes
            .get(&app_id)
            .and_then(|boxes| boxes.iter().find(|(n, _)| n == name))
            .map(|(_, value)| value.clone())
            .ok_or_else(|| not_found("box"))
    }

    async fn simulate(
        &self,
        txns: &[Transaction],
        request: &SimulateRequest,
    ) -> Result<SimulateResponse> {
        self.simulate_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.simulated.lock() {
            log.push((txns.to_vec(), *request));
        }
        match &self.simulate_handler {
            Some(handler) => handler(txns, request),
            None => Err(TransportError::Simulation("no simulate handler".to_string()).into()),
        }
    }

    async fn compile(&self, source: &str) -> Result<Vec<u8>> {
        Ok(source.as_bytes().to_vec())
    }
}
