//! ABI method signatures of the deployed contracts.

// Pool reads
pub const GET_CONTRACT_LISTING: &str = "get_contract_listing(address)(uint64,uint64,uint64,uint64,uint64,string,uint64,string,string,uint64,bool,bool,bool,bool,uint64)";
pub const GET_RATE: &str = "get_rate()uint64";
pub const GET_NEED_SWAP: &str = "get_need_swap()bool";

// Pool user operations
pub const MINT: &str = "mint()void";
pub const REDEEM: &str = "redeem()void";
pub const SWAP_OR_FAIL: &str = "swap_or_fail()void";
pub const PROTEST_STAKE: &str = "protest_stake()void";
pub const UNPROTEST_STAKE: &str = "unprotest_stake()void";

// Pool administration
pub const ADMIN_UNPROTEST_STAKE: &str = "admin_unprotest_stake(address)void";
pub const DISSOLVE_PROTESTING_STAKE: &str = "dissolve_protesting_stake(address)void";
pub const KEYREG_ONLINE: &str =
    "keyreg_online(byte[32],byte[32],byte[64],uint64,uint64,uint64,uint64)void";
pub const KEYREG_OFFLINE: &str = "keyreg_offline()void";
pub const WITHDRAW_NODE_RUNNER_FEES: &str = "withdraw_node_runner_fees(uint64)void";
pub const WITHDRAW_PLATFORM_FEES: &str = "withdraw_platform_fees(uint64)void";
pub const CHANGE_NODERUNNER: &str = "change_noderunner(address)void";
pub const CHANGE_FEEADDR: &str = "change_feeaddr(address)void";
pub const CHANGE_ADMIN_1: &str = "change_admin_1(address)void";
pub const CHANGE_ADMIN_2: &str = "change_admin_2()void";
pub const UPDATE_MAX_BALANCE: &str = "update_max_balance(uint64)void";
pub const CONFIGURE: &str = "configure(uint64,bool,byte[],byte[32],uint64,uint64,address,address,address,uint64,uint64,uint64,uint64,uint64,uint64,uint64)void";
pub const CONFIGURE2: &str = "configure2(byte[],byte[],byte[])void";
pub const QUEUE_UPDATE_FEES: &str = "queue_update_fees(uint64,uint64)void";
pub const RESET_UPDATE_FEES: &str = "reset_update_fees()void";
pub const QUEUE_UPGRADE: &str = "queue_upgrade(byte[])void";
pub const RESET_UPGRADE: &str = "reset_upgrade()void";

// Registry
pub const LOG_DUALSTAKE_LISTINGS: &str = "log_dualstake_listings(uint64[])void";
pub const ASSIGN_CONTRACT: &str = "assign_contract()void";
pub const UNASSIGN_CONTRACT: &str = "unassign_contract(byte[])void";
pub const VANITY_CONFIGURE: &str = "vanity_configure(uint64,byte[],byte[],byte[])void";

// Price oracle
pub const LOG_PRICES_AND_TVL: &str = "log_prices_and_tvl(uint64[])void";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dualstake::mapper::LISTING_LAYOUT;

    #[test]
    fn test_listing_signature_matches_layout() {
        assert!(GET_CONTRACT_LISTING.ends_with(&LISTING_LAYOUT.signature()));
    }

    #[test]
    fn test_configure_takes_sixteen_arguments() {
        let start = CONFIGURE.find('(').unwrap() + 1;
        let end = CONFIGURE.rfind(')').unwrap();
        assert_eq!(CONFIGURE[start..end].split(',').count(), 16);
    }
}
