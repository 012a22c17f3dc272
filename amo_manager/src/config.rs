//! Deployment configuration
//!
//! The strategy is configured from JSON at deployment. Governance threshold updates arrive as
//! candid arguments.

use alloy_primitives::U256;
use candid::{CandidType, Nat};
use serde::{Deserialize, Serialize};

use crate::{
    strategy::settings::{OperationThresholds, StrategySettings},
    utils::{
        common::{nat_to_bps, nat_to_u256, string_to_address, string_to_u256},
        error::{AmoError, AmoResult},
    },
};

/// Overrides of the default thresholds. Amounts are decimal strings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsConfig {
    pub max_deposit_deviation_bps: Option<u16>,
    pub max_withdrawal_deviation_bps: Option<u16>,
    pub min_peg_correction: Option<String>,
    pub max_peg_overshoot: Option<String>,
    pub solvency_threshold_bps: Option<u16>,
}

impl TryFrom<ThresholdsConfig> for OperationThresholds {
    type Error = AmoError;

    fn try_from(value: ThresholdsConfig) -> Result<Self, Self::Error> {
        let mut thresholds = OperationThresholds::default();
        if let Some(bps) = value.max_deposit_deviation_bps {
            thresholds.max_deposit_deviation_bps(bps);
        }
        if let Some(bps) = value.max_withdrawal_deviation_bps {
            thresholds.max_withdrawal_deviation_bps(bps);
        }
        if let Some(amount) = value.min_peg_correction {
            thresholds.min_peg_correction(string_to_u256(&amount)?);
        }
        if let Some(amount) = value.max_peg_overshoot {
            thresholds.max_peg_overshoot(string_to_u256(&amount)?);
        }
        if let Some(bps) = value.solvency_threshold_bps {
            thresholds.solvency_threshold_bps(bps);
        }
        thresholds.validate()?;
        Ok(thresholds)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmoConfig {
    pub vault: String,
    pub governor: String,
    pub strategist: String,
    pub harvester: String,
    pub asset: String,
    pub o_token: String,
    /// The pool address, which is also the LP token
    pub platform: String,
    pub asset_decimals: u8,
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
}

impl AmoConfig {
    pub fn from_json(json: &str) -> AmoResult<Self> {
        serde_json::from_str(json).map_err(|err| AmoError::Config(err.to_string()))
    }

    pub fn to_json(&self) -> AmoResult<String> {
        serde_json::to_string_pretty(self).map_err(|err| AmoError::Config(err.to_string()))
    }
}

impl TryFrom<AmoConfig> for StrategySettings {
    type Error = AmoError;

    fn try_from(value: AmoConfig) -> Result<Self, Self::Error> {
        let mut settings = StrategySettings::default();
        settings
            .vault(string_to_address(&value.vault)?)
            .governor(string_to_address(&value.governor)?)
            .strategist(string_to_address(&value.strategist)?)
            .harvester(string_to_address(&value.harvester)?)
            .asset(string_to_address(&value.asset)?)
            .o_token(string_to_address(&value.o_token)?)
            .platform(string_to_address(&value.platform)?)
            .asset_decimals(value.asset_decimals)
            .thresholds(OperationThresholds::try_from(value.thresholds)?);
        settings.validate()?;
        Ok(settings)
    }
}

/// Candid argument of a governance threshold update
#[derive(CandidType, Clone, Debug, Deserialize)]
pub struct ThresholdsInput {
    pub max_deposit_deviation_bps: Nat,
    pub max_withdrawal_deviation_bps: Nat,
    pub min_peg_correction: Nat,
    pub max_peg_overshoot: Nat,
    pub solvency_threshold_bps: Nat,
}

impl TryFrom<ThresholdsInput> for OperationThresholds {
    type Error = AmoError;

    fn try_from(value: ThresholdsInput) -> Result<Self, Self::Error> {
        let thresholds = OperationThresholds {
            max_deposit_deviation_bps: nat_to_bps(&value.max_deposit_deviation_bps)?,
            max_withdrawal_deviation_bps: nat_to_bps(&value.max_withdrawal_deviation_bps)?,
            min_peg_correction: nat_to_u256(&value.min_peg_correction)?,
            max_peg_overshoot: nat_to_u256(&value.max_peg_overshoot)?,
            solvency_threshold_bps: nat_to_bps(&value.solvency_threshold_bps)?,
        };
        if thresholds.min_peg_correction == U256::ZERO {
            return Err(AmoError::Config(
                "min_peg_correction must be at least 1.".to_string(),
            ));
        }
        Ok(thresholds)
    }
}
