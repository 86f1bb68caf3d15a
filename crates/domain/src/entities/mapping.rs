use serde::{Deserialize, Serialize};

/// Identity triple of a registered pool, as stored in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractMapping {
    pub paired_asset_id: u64,
    pub pool_app_id: u64,
    pub pool_token_id: u64,
}
