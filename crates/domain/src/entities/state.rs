use super::listing::ContractListing;
use crate::value_objects::{Address, PageHash};
use serde::{Deserialize, Serialize};

/// A queued fee change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeUpdateState {
    pub applicable_timestamp: u64,
    pub next_noderunner_fee_bps: u64,
    pub next_platform_fee_bps: u64,
}

/// A staged contract upgrade: one hash per program page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractUpgradeState {
    pub applicable_timestamp: u32,
    pub contract_page_hashes: Vec<PageHash>,
}

/// Full pool state: the listing plus administrative and governance fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractState {
    #[serde(flatten)]
    pub listing: ContractListing,
    pub version: u64,
    pub platform_fees: u64,
    pub noderunner_fees: u64,
    pub platform_fee_bps: u64,
    pub noderunner_fee_bps: u64,
    pub admin_addr: Address,
    pub fee_admin_addr: Address,
    pub noderunner_addr: Address,
    /// Liquidity pool kind, e.g. `tm2`.
    pub lp_type: String,
    /// Liquidity pool account.
    pub lp_id: Address,
    pub delay_optin: bool,
    /// `None` when no fee change is queued.
    pub fee_update: Option<FeeUpdateState>,
    /// `None` when no upgrade is staged.
    pub contract_upgrade: Option<ContractUpgradeState>,
    pub protest_count: u64,
    pub protest_sum: u64,
    pub tinyman_app_id: u64,
    pub arc59_app_id: u64,
    pub max_balance: u64,
    pub rate_precision: u64,
    pub upgrade_period: u64,
    pub fee_update_period: u64,
    pub fee_update_max_delta: u64,
}

impl ContractState {
    /// Pool app id.
    #[must_use]
    pub fn app_id(&self) -> u64 {
        self.listing.app_id
    }

    /// Pool token asset id.
    #[must_use]
    pub fn lst_id(&self) -> u64 {
        self.listing.lst_id
    }

    /// Paired asset id.
    #[must_use]
    pub fn asa_id(&self) -> u64 {
        self.listing.asa_id
    }

    /// Current exchange rate.
    #[must_use]
    pub fn rate(&self) -> u64 {
        self.listing.rate
    }

    /// Paired-asset amount owed for `algo_amount` at the current rate.
    ///
    /// Computed in 128-bit space and saturated to `u64::MAX`. A zero rate
    /// precision yields zero.
    #[must_use]
    pub fn paired_amount_for(&self, algo_amount: u64) -> u64 {
        if self.rate_precision == 0 {
            return 0;
        }
        let amount = u128::from(algo_amount) * u128::from(self.listing.rate)
            / u128::from(self.rate_precision);
        u64::try_from(amount).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_rate(rate: u64, rate_precision: u64) -> ContractState {
        ContractState {
            listing: ContractListing {
                round: 1,
                app_id: 10,
                rate,
                algo_balance: 0,
                asa_balance: 0,
                staked: 0,
                lst_id: 11,
                lst_name: "dsTEST".to_string(),
                asa_id: 12,
                asa_name: "Test".to_string(),
                asa_unit_name: "TST".to_string(),
                asa_decimals: 6,
                need_swap: false,
                incentive_eligible: false,
                is_online: false,
                upgrading: false,
                user_protesting_stake: 0,
            },
            version: 1,
            platform_fees: 0,
            noderunner_fees: 0,
            platform_fee_bps: 0,
            noderunner_fee_bps: 0,
            admin_addr: Address::default(),
            fee_admin_addr: Address::default(),
            noderunner_addr: Address::default(),
            lp_type: "tm2".to_string(),
            lp_id: Address::default(),
            delay_optin: false,
            fee_update: None,
            contract_upgrade: None,
            protest_count: 0,
            protest_sum: 0,
            tinyman_app_id: 0,
            arc59_app_id: 0,
            max_balance: 0,
            rate_precision,
            upgrade_period: 0,
            fee_update_period: 0,
            fee_update_max_delta: 0,
        }
    }

    #[test]
    fn test_paired_amount_uses_rate_precision() {
        let state = state_with_rate(25_000_000_000, 10_000_000_000);
        assert_eq!(state.paired_amount_for(1_000_000), 2_500_000);
    }

    #[test]
    fn test_paired_amount_zero_rate() {
        let state = state_with_rate(0, 10_000_000_000);
        assert_eq!(state.paired_amount_for(1_000_000), 0);
        let state = state_with_rate(5, 0);
        assert_eq!(state.paired_amount_for(1_000_000), 0);
    }

    #[test]
    fn test_paired_amount_does_not_overflow() {
        let state = state_with_rate(u64::MAX, 1);
        assert_eq!(state.paired_amount_for(u64::MAX), u64::MAX);
    }
}
