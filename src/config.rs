// Copyright (c) 2026 Hypermesh Foundation. All rights reserved.
// Licensed under the Business Source License 1.1.
// See the LICENSE file in the repository root for full license text.

//! Deployment configuration.
//!
//! ```toml
//! dao = "dao"
//! engine_account = "engine"
//! dispute_window = 7200      # seconds
//! decision_period = 604800   # seconds, immutable after deployment
//! insurance = "100"
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::governance::GovernanceParams;
use crate::types::{Address, Seconds, TokenAmount};

/// Default dispute window: 2 hours.
pub const DEFAULT_DISPUTE_WINDOW: Seconds = 2 * 60 * 60;

/// Default decision period: 7 days.
pub const DEFAULT_DECISION_PERIOD: Seconds = 7 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub dao: Address,
    /// Token account holding escrow and ledger funds.
    pub engine_account: Address,
    pub dispute_window: Seconds,
    pub decision_period: Seconds,
    pub insurance: TokenAmount,
    /// Cumulative conservation error tolerated before the audit breaker trips.
    pub audit_threshold: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dao: Address::from("dao"),
            engine_account: Address::from("engine"),
            dispute_window: DEFAULT_DISPUTE_WINDOW,
            decision_period: DEFAULT_DECISION_PERIOD,
            insurance: TokenAmount::tokens(100),
            audit_threshold: Decimal::ZERO,
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispute_window == 0 {
            return Err(ConfigError::Invalid("dispute_window must be positive"));
        }
        if self.decision_period == 0 {
            return Err(ConfigError::Invalid("decision_period must be positive"));
        }
        if self.insurance.is_negative() {
            return Err(ConfigError::Invalid("insurance must not be negative"));
        }
        if self.insurance.with_half_stake().is_none() {
            return Err(ConfigError::Invalid("insurance plus half stake exceeds the token range"));
        }
        if self.dao == self.engine_account {
            return Err(ConfigError::Invalid("dao and engine_account must differ"));
        }
        Ok(())
    }

    pub fn governance_params(&self) -> GovernanceParams {
        GovernanceParams {
            dispute_window: self.dispute_window,
            insurance: self.insurance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dispute_window, 7_200);
        assert_eq!(config.decision_period, 604_800);
    }

    #[test]
    fn parse_partial_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            dao = "governance"
            dispute_window = 60
            insurance = "250.5"
            "#,
        )
        .expect("test: valid toml");
        assert_eq!(config.dao, Address::from("governance"));
        assert_eq!(config.dispute_window, 60);
        assert_eq!(config.insurance.to_string(), "250.5");
        assert_eq!(config.decision_period, DEFAULT_DECISION_PERIOD);
    }

    #[test]
    fn zero_window_rejected() {
        let err = EngineConfig::from_toml_str("dispute_window = 0");
        assert!(matches!(err, Err(ConfigError::Invalid(_))), "got {err:?}");
    }

    #[test]
    fn insurance_must_leave_room_for_half_stake() {
        let config = EngineConfig {
            insurance: TokenAmount(Decimal::MAX),
            ..EngineConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_toml_rejected() {
        let err = EngineConfig::from_toml_str("dispute_window = [");
        assert!(matches!(err, Err(ConfigError::Parse(_))), "got {err:?}");
    }
}
