//! Arguments of the transaction builders.

use dualstake_domain::{Address, Environment, NetworkConstantsOverrides};

/// Deposit ALGO (and the paired asset at the current rate) for pool tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MintParams {
    /// microALGO to deposit.
    pub algo_amount: u64,
}

/// Return pool tokens for the underlying assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedeemParams {
    pub amount: u64,
}

/// Lock pool tokens as a protest against the node runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtestParams {
    pub amount: u64,
}

/// Act on another user's protest record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OnBehalfParams {
    pub user: Address,
}

/// Participation keys for bringing the escrow online.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyregOnlineParams {
    /// 32 bytes.
    pub selection_key: Vec<u8>,
    /// 32 bytes.
    pub voting_key: Vec<u8>,
    /// 64 bytes.
    pub state_proof_key: Vec<u8>,
    pub first_round: u64,
    pub last_round: u64,
    pub key_dilution: u64,
}

/// Fee withdrawal; `None` withdraws everything accrued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WithdrawFeesParams {
    pub amount: Option<u64>,
}

/// Initial pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureParams {
    pub env: Environment,
    pub asa_id: u64,
    pub lp_type: String,
    pub lp_id: Address,
    pub platform_fee_bps: u64,
    pub noderunner_fee_bps: u64,
    pub admin_addr: Address,
    pub fee_admin_addr: Address,
    pub noderunner_addr: Address,
    /// Skip opting the escrow in to the pool asset during configuration.
    pub delay_optin: bool,
    pub network_overrides: NetworkConstantsOverrides,
}

/// Pool token naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadataParams {
    pub lst_asa_name: String,
    pub lst_unit_name: String,
    pub lst_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueUpdateFeesParams {
    pub new_platform_fee_bps: u64,
    pub new_noderunner_fee_bps: u64,
}

/// Stage an upgrade; one 32-byte hash per program page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueUpgradeParams {
    pub hashes: Vec<Vec<u8>>,
}

/// Replace the application programs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeParams {
    pub approval_program: Vec<u8>,
    pub clear_program: Vec<u8>,
}

/// Register or unregister a pool in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAssignmentParams {
    pub asa_id: u64,
    pub app_id: u64,
}

/// Rename a pool token through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VanityConfigureParams {
    pub dualstake_app_id: u64,
    pub metadata: TokenMetadataParams,
}
