use serde::{Deserialize, Serialize};

/// Oracle-computed price and TVL figures for one pool, in microALGO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OracleQuote {
    pub dualstake_unit_price_in_algo: u64,
    pub algo_tvl_in_algo: u64,
    pub asa_tvl_in_algo: u64,
    pub total_tvl_in_algo: u64,
}

/// Price and TVL of a pool joined with its listing identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceAndTvl {
    /// dualSTAKE app id; the join key.
    pub app_id: u64,
    pub dualstake_asa_id: u64,
    pub dualstake_name: String,
    pub paired_asa_id: u64,
    pub paired_asa_unit_name: String,
    #[serde(flatten)]
    pub quote: OracleQuote,
}
