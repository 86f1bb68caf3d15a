//! Per-environment protocol constants.

use crate::enums::Environment;
use serde::{Deserialize, Serialize};

/// One week in seconds.
pub const WEEKS_1: u64 = 86_400 * 7;

/// Constants a pool contract is configured with at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConstants {
    /// Minting is disabled above this escrow balance (microALGO).
    pub max_balance: u64,
    /// Contract upgrades must be staged this long (seconds).
    pub upgrade_period: u64,
    /// Fee updates apply after this long (seconds).
    pub fee_update_period: u64,
    /// Largest fee change per update, in basis points.
    pub fee_update_max_delta: u64,
    pub rate_precision: u64,
    pub tm2_app_id: u64,
    pub arc59_app_id: u64,
}

impl NetworkConstants {
    /// Mainnet values.
    pub const PROD: Self = Self {
        max_balance: 65_000_000 * 1_000_000,
        upgrade_period: WEEKS_1,
        fee_update_period: WEEKS_1,
        fee_update_max_delta: 250,
        rate_precision: 10_000_000_000,
        tm2_app_id: 1_002_541_853,
        arc59_app_id: 2_449_590_623,
    };

    /// Development network values; short periods, placeholder app ids.
    pub const DEV: Self = Self {
        max_balance: 65_000_000 * 1_000_000,
        upgrade_period: 3_600,
        fee_update_period: 86_400,
        fee_update_max_delta: 250,
        rate_precision: 10_000_000_000,
        tm2_app_id: 1,
        arc59_app_id: 1,
    };

    /// Defaults for an environment.
    #[must_use]
    pub fn for_environment(env: Environment) -> Self {
        match env {
            Environment::Dev => Self::DEV,
            Environment::Prod => Self::PROD,
        }
    }

    /// Returns a copy with every `Some` override applied.
    #[must_use]
    pub fn with_overrides(mut self, overrides: &NetworkConstantsOverrides) -> Self {
        if let Some(v) = overrides.max_balance {
            self.max_balance = v;
        }
        if let Some(v) = overrides.upgrade_period {
            self.upgrade_period = v;
        }
        if let Some(v) = overrides.fee_update_period {
            self.fee_update_period = v;
        }
        if let Some(v) = overrides.fee_update_max_delta {
            self.fee_update_max_delta = v;
        }
        if let Some(v) = overrides.rate_precision {
            self.rate_precision = v;
        }
        if let Some(v) = overrides.tm2_app_id {
            self.tm2_app_id = v;
        }
        if let Some(v) = overrides.arc59_app_id {
            self.arc59_app_id = v;
        }
        self
    }

    /// Template variable names (without the `TMPL_` prefix) and their values.
    #[must_use]
    pub fn template_vars(&self) -> [(&'static str, u64); 7] {
        [
            ("maxBalance", self.max_balance),
            ("upgradePeriod", self.upgrade_period),
            ("feeUpdatePeriod", self.fee_update_period),
            ("feeUpdateMaxDelta", self.fee_update_max_delta),
            ("ratePrecision", self.rate_precision),
            ("tm2AppId", self.tm2_app_id),
            ("arc59AppId", self.arc59_app_id),
        ]
    }
}

/// Partial set of constants overriding an environment's defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConstantsOverrides {
    pub max_balance: Option<u64>,
    pub upgrade_period: Option<u64>,
    pub fee_update_period: Option<u64>,
    pub fee_update_max_delta: Option<u64>,
    pub rate_precision: Option<u64>,
    pub tm2_app_id: Option<u64>,
    pub arc59_app_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults() {
        assert_eq!(
            NetworkConstants::for_environment(Environment::Prod).upgrade_period,
            WEEKS_1
        );
        assert_eq!(
            NetworkConstants::for_environment(Environment::Dev).upgrade_period,
            3_600
        );
    }

    #[test]
    fn test_overrides_only_touch_set_fields() {
        let overrides = NetworkConstantsOverrides {
            tm2_app_id: Some(77),
            ..Default::default()
        };
        let constants = NetworkConstants::PROD.with_overrides(&overrides);
        assert_eq!(constants.tm2_app_id, 77);
        assert_eq!(constants.arc59_app_id, NetworkConstants::PROD.arc59_app_id);
        assert_eq!(constants.max_balance, NetworkConstants::PROD.max_balance);
    }
}
