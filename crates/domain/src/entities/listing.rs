use serde::{Deserialize, Serialize};

/// Point-in-time snapshot of a dualSTAKE pool's externally relevant state.
///
/// `round` is the ledger round at which the simulated read executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractListing {
    pub round: u64,
    pub app_id: u64,
    /// Paired-asset units owed per ALGO, scaled by the contract's rate precision.
    pub rate: u64,
    pub algo_balance: u64,
    pub asa_balance: u64,
    pub staked: u64,
    /// Pool token (dualSTAKE LST) asset id.
    pub lst_id: u64,
    pub lst_name: String,
    /// Paired asset id.
    pub asa_id: u64,
    pub asa_name: String,
    pub asa_unit_name: String,
    pub asa_decimals: u8,
    pub need_swap: bool,
    pub incentive_eligible: bool,
    pub is_online: bool,
    pub upgrading: bool,
    /// Stake the simulating sender currently has under protest.
    pub user_protesting_stake: u64,
}
