//! Unsigned ledger transactions and the atomic group builder.
//!
//! Builders collect steps in their final order, settle each step's fee and
//! assign the shared group id last. Nothing here signs or submits.

pub mod encoding;
pub mod group;

use crate::codec::abi::{self, AbiValue};
use crate::error::{Result, ValidationError};
use crate::rpc::SuggestedParams;
use dualstake_domain::Address;
use tracing::debug;

pub use group::{assign_group, compute_group_id};

/// Largest atomic group the ledger accepts.
pub const MAX_GROUP_SIZE: usize = 16;

/// Rounds a built transaction stays valid for.
pub const VALIDITY_WINDOW: u64 = 1_000;

/// Application arguments beyond this index are packed into one tuple.
pub const MAX_APP_ARGS: usize = 16;

/// Bytes a signature adds to an encoded transaction, used for fee estimates.
pub const SIGNATURE_OVERHEAD: usize = 75;

/// One microALGO fee unit per inner or outer transaction.
pub const FEE_UNIT: u64 = 1_000;

/// Action performed after an application call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnComplete {
    #[default]
    NoOp,
    UpdateApplication,
    DeleteApplication,
}

impl OnComplete {
    /// Wire value.
    #[must_use]
    pub fn code(self) -> u64 {
        match self {
            OnComplete::NoOp => 0,
            OnComplete::UpdateApplication => 4,
            OnComplete::DeleteApplication => 5,
        }
    }
}

/// Global or local storage allocation for a new application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StateSchema {
    pub num_uints: u64,
    pub num_byte_slices: u64,
}

/// A box an application call may touch.
///
/// `app_id` 0 means the called application itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxReference {
    pub app_id: u64,
    pub name: Vec<u8>,
}

impl BoxReference {
    /// A box of the called application.
    #[must_use]
    pub fn own(name: Vec<u8>) -> Self {
        Self { app_id: 0, name }
    }

    /// A box of another application.
    #[must_use]
    pub fn foreign(app_id: u64, name: Vec<u8>) -> Self {
        Self { app_id, name }
    }
}

/// Application call body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApplicationCall {
    /// Zero for application creation.
    pub app_id: u64,
    pub on_complete: OnComplete,
    pub args: Vec<Vec<u8>>,
    pub accounts: Vec<Address>,
    pub foreign_apps: Vec<u64>,
    pub foreign_assets: Vec<u64>,
    pub boxes: Vec<BoxReference>,
    pub approval_program: Vec<u8>,
    pub clear_program: Vec<u8>,
    pub global_schema: StateSchema,
    pub local_schema: StateSchema,
    pub extra_pages: u64,
}

impl ApplicationCall {
    /// A no-op call to `app_id` without arguments.
    #[must_use]
    pub fn new(app_id: u64) -> Self {
        Self {
            app_id,
            ..Default::default()
        }
    }

    /// An ABI method call: selector followed by the encoded arguments.
    ///
    /// Arguments from the fifteenth on are packed into one trailing tuple.
    ///
    /// # Errors
    /// [`ValidationError::TooLong`] when an argument overflows its length prefix.
    pub fn method(
        app_id: u64,
        signature: &str,
        args: Vec<AbiValue>,
    ) -> std::result::Result<Self, ValidationError> {
        let mut encoded = Vec::with_capacity(args.len().min(MAX_APP_ARGS) + 1);
        encoded.push(abi::method_selector(signature).to_vec());

        let direct = MAX_APP_ARGS - 2;
        if args.len() > direct + 1 {
            let mut args = args;
            let packed = args.split_off(direct);
            for arg in &args {
                encoded.push(abi::encode(arg)?);
            }
            encoded.push(abi::encode_tuple(&packed)?);
        } else {
            for arg in &args {
                encoded.push(abi::encode(arg)?);
            }
        }

        Ok(Self {
            app_id,
            args: encoded,
            ..Default::default()
        })
    }

    #[must_use]
    pub fn with_on_complete(mut self, on_complete: OnComplete) -> Self {
        self.on_complete = on_complete;
        self
    }

    #[must_use]
    pub fn with_accounts(mut self, accounts: impl IntoIterator<Item = Address>) -> Self {
        for account in accounts {
            if !self.accounts.contains(&account) {
                self.accounts.push(account);
            }
        }
        self
    }

    #[must_use]
    pub fn with_apps(mut self, apps: impl IntoIterator<Item = u64>) -> Self {
        for app in apps {
            if app != self.app_id && !self.foreign_apps.contains(&app) {
                self.foreign_apps.push(app);
            }
        }
        self
    }

    #[must_use]
    pub fn with_assets(mut self, assets: impl IntoIterator<Item = u64>) -> Self {
        for asset in assets {
            if !self.foreign_assets.contains(&asset) {
                self.foreign_assets.push(asset);
            }
        }
        self
    }

    /// Adds box references; foreign box owners join the foreign apps array.
    #[must_use]
    pub fn with_boxes(mut self, boxes: impl IntoIterator<Item = BoxReference>) -> Self {
        for reference in boxes {
            if reference.app_id != 0 {
                self = self.with_apps([reference.app_id]);
            }
            self.boxes.push(reference);
        }
        self
    }

    #[must_use]
    pub fn with_programs(mut self, approval: Vec<u8>, clear: Vec<u8>) -> Self {
        self.approval_program = approval;
        self.clear_program = clear;
        self
    }

    /// Index of a box owner in the foreign apps array, 0 for the called app.
    ///
    /// # Errors
    /// [`ValidationError::UnknownBoxApp`] when the owner is not referenced.
    pub fn box_app_index(&self, app_id: u64) -> std::result::Result<u64, ValidationError> {
        if app_id == 0 || app_id == self.app_id {
            return Ok(0);
        }
        self.foreign_apps
            .iter()
            .position(|a| *a == app_id)
            .map(|i| i as u64 + 1)
            .ok_or(ValidationError::UnknownBoxApp(app_id))
    }
}

/// Transaction type specific fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    Payment {
        receiver: Address,
        amount: u64,
    },
    AssetTransfer {
        asset_id: u64,
        receiver: Address,
        amount: u64,
    },
    ApplicationCall(ApplicationCall),
}

impl TransactionKind {
    /// Wire type tag.
    #[must_use]
    pub fn type_tag(&self) -> &'static str {
        match self {
            TransactionKind::Payment { .. } => "pay",
            TransactionKind::AssetTransfer { .. } => "axfer",
            TransactionKind::ApplicationCall(_) => "appl",
        }
    }
}

/// An unsigned transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Address,
    pub fee: u64,
    pub first_valid: u64,
    pub last_valid: u64,
    pub genesis_id: String,
    pub genesis_hash: [u8; 32],
    pub group: Option<[u8; 32]>,
    pub lease: Option<[u8; 32]>,
    pub note: Vec<u8>,
    pub kind: TransactionKind,
}

impl Transaction {
    /// Application call body, if this is one.
    #[must_use]
    pub fn as_app_call(&self) -> Option<&ApplicationCall> {
        match &self.kind {
            TransactionKind::ApplicationCall(call) => Some(call),
            _ => None,
        }
    }

    /// Canonical msgpack encoding.
    ///
    /// # Errors
    /// Unresolvable box references or writer failures.
    pub fn encode(&self) -> Result<Vec<u8>> {
        encoding::encode_transaction(self)
    }

    /// SHA-512/256 over the `TX`-prefixed encoding.
    ///
    /// # Errors
    /// See [`Transaction::encode`].
    pub fn raw_id(&self) -> Result<[u8; 32]> {
        Ok(encoding::hash_with_prefix(b"TX", &self.encode()?))
    }

    /// Base32 transaction id, as shown by explorers.
    ///
    /// # Errors
    /// See [`Transaction::encode`].
    pub fn id(&self) -> Result<String> {
        Ok(data_encoding::BASE32_NOPAD.encode(&self.raw_id()?))
    }
}

/// How a step's fee is settled when the group is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeSpec {
    /// Per-byte fee from the node, never below the minimum.
    Suggested,
    /// Fixed fee in microALGO covering the call's inner transactions.
    Static(u64),
}

impl FeeSpec {
    /// A static fee of `units` × 1000 microALGO.
    #[must_use]
    pub const fn units(units: u64) -> Self {
        FeeSpec::Static(units * FEE_UNIT)
    }
}

/// Ordered steps of one atomic operation.
#[derive(Debug, Clone)]
pub struct GroupBuilder {
    params: SuggestedParams,
    steps: Vec<(Transaction, FeeSpec)>,
}

impl GroupBuilder {
    #[must_use]
    pub fn new(params: SuggestedParams) -> Self {
        Self {
            params,
            steps: Vec::new(),
        }
    }

    fn base(&self, sender: Address, kind: TransactionKind) -> Transaction {
        Transaction {
            sender,
            fee: 0,
            first_valid: self.params.last_round,
            last_valid: self.params.last_round + VALIDITY_WINDOW,
            genesis_id: self.params.genesis_id.clone(),
            genesis_hash: self.params.genesis_hash,
            group: None,
            lease: None,
            note: Vec::new(),
            kind,
        }
    }

    /// Number of steps so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// ALGO payment.
    pub fn payment(&mut self, sender: Address, receiver: Address, amount: u64) -> &mut Self {
        let txn = self.base(sender, TransactionKind::Payment { receiver, amount });
        self.steps.push((txn, FeeSpec::Suggested));
        self
    }

    /// Asset transfer.
    pub fn asset_transfer(
        &mut self,
        sender: Address,
        receiver: Address,
        asset_id: u64,
        amount: u64,
    ) -> &mut Self {
        let txn = self.base(
            sender,
            TransactionKind::AssetTransfer {
                asset_id,
                receiver,
                amount,
            },
        );
        self.steps.push((txn, FeeSpec::Suggested));
        self
    }

    /// Zero-amount transfer to self, enabling `sender` to hold `asset_id`.
    pub fn opt_in(&mut self, sender: Address, asset_id: u64) -> &mut Self {
        self.asset_transfer(sender, sender, asset_id, 0)
    }

    /// Application call settled with `fee`.
    pub fn app_call(&mut self, sender: Address, call: ApplicationCall, fee: FeeSpec) -> &mut Self {
        let txn = self.base(sender, TransactionKind::ApplicationCall(call));
        self.steps.push((txn, fee));
        self
    }

    /// Sets the lease of the most recent step.
    pub fn lease(&mut self, lease: [u8; 32]) -> &mut Self {
        if let Some((txn, _)) = self.steps.last_mut() {
            txn.lease = Some(lease);
        }
        self
    }

    /// Settles fees and assigns the group id.
    ///
    /// # Errors
    /// Empty or oversized groups, or encoding failures.
    pub fn build(self) -> Result<Vec<Transaction>> {
        let params = self.params;
        let mut txns = Vec::with_capacity(self.steps.len());
        for (mut txn, fee) in self.steps {
            txn.fee = match fee {
                FeeSpec::Static(fee) => fee,
                FeeSpec::Suggested => {
                    let size = txn.encode()?.len() + SIGNATURE_OVERHEAD;
                    params.min_fee.max(params.fee_per_byte.saturating_mul(size as u64))
                }
            };
            txns.push(txn);
        }
        debug!(count = txns.len(), "Assigning group id");
        assign_group(txns)
    }
}
