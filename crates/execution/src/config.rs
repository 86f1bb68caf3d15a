//! Deployment and batching configuration.

use dualstake_domain::{Address, Environment, NetworkConstants, NetworkConstantsOverrides};
use serde::{Deserialize, Serialize};

/// Mainnet registry application.
pub const MAINNET_REGISTRY_APP_ID: u64 = 2_933_409_454;
/// Mainnet price oracle application.
pub const MAINNET_PRICE_ORACLE_APP_ID: u64 = 3_021_936_666;
/// Fee sink; any funded account works as a simulation sender.
pub const MAINNET_SIMULATION_SENDER: &str =
    "A7NMWS3NT3IUDMLVO26ULGXGIIOUQ3ND2TXSER6EBGRZNOBOUIQXHIBGDE";

/// Where the contracts of one deployment live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Account that signs built transactions and runs simulations.
    pub sender: Address,
    /// Registry application id.
    pub registry_app_id: u64,
    /// Liquidity pool application referenced by pool calls.
    pub tinyman_app_id: u64,
    /// Asset inbox router application.
    pub arc59_router_app_id: u64,
    /// Environment whose network constants new pools use.
    pub network: Environment,
}

impl EnvironmentConfig {
    /// Mainnet deployment acting as `sender`.
    #[must_use]
    pub fn mainnet(sender: Address) -> Self {
        let constants = NetworkConstants::PROD;
        Self {
            sender,
            registry_app_id: MAINNET_REGISTRY_APP_ID,
            tinyman_app_id: constants.tm2_app_id,
            arc59_router_app_id: constants.arc59_app_id,
            network: Environment::Prod,
        }
    }

    /// Network constants of the environment with this deployment's
    /// companion applications.
    #[must_use]
    pub fn network_constants(&self) -> NetworkConstants {
        NetworkConstants::for_environment(self.network).with_overrides(&NetworkConstantsOverrides {
            tm2_app_id: Some(self.tinyman_app_id),
            arc59_app_id: Some(self.arc59_router_app_id),
            ..Default::default()
        })
    }
}

/// A deployment plus its price oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceOracleConfig {
    /// Deployment the oracle prices.
    pub environment: EnvironmentConfig,
    /// Price oracle application id.
    pub price_oracle_app_id: u64,
}

/// Chunking and concurrency of multi-pool reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pools per listing simulation; at most 32.
    pub listing_chunk_size: usize,
    /// Pools per price simulation; at most 42.
    pub price_chunk_size: usize,
    /// Simulations in flight at once.
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            listing_chunk_size: 32,
            price_chunk_size: 42,
            concurrency: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_defaults() {
        let sender: Address = MAINNET_SIMULATION_SENDER.parse().unwrap();
        let config = EnvironmentConfig::mainnet(sender);
        assert_eq!(config.registry_app_id, 2_933_409_454);
        assert_eq!(config.tinyman_app_id, 1_002_541_853);
        assert_eq!(config.arc59_router_app_id, 2_449_590_623);
        assert_eq!(config.network_constants(), NetworkConstants::PROD);
    }

    #[test]
    fn test_companion_apps_override_constants() {
        let mut config = EnvironmentConfig::mainnet(Address::default());
        config.network = Environment::Dev;
        config.tinyman_app_id = 5;
        let constants = config.network_constants();
        assert_eq!(constants.tm2_app_id, 5);
        assert_eq!(constants.upgrade_period, NetworkConstants::DEV.upgrade_period);
    }
}
