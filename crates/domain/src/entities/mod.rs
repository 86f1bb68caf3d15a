pub mod listing;
pub mod mapping;
pub mod price;
pub mod state;

// Re-export for easier access
pub use listing::ContractListing;
pub use mapping::ContractMapping;
pub use price::{OracleQuote, PriceAndTvl};
pub use state::{ContractState, ContractUpgradeState, FeeUpdateState};
