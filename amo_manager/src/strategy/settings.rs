//! Strategy settings and governance thresholds

use alloy_primitives::{Address, U256};
use candid::{CandidType, Nat};

use crate::{
    constants::{
        BPS_DENOMINATOR, DEFAULT_MAX_DEPOSIT_DEVIATION_BPS, DEFAULT_MAX_WITHDRAWAL_DEVIATION_BPS,
        DEFAULT_SOLVENCY_THRESHOLD_BPS, O_TOKEN_DECIMALS,
    },
    utils::{
        common::u256_to_nat,
        error::{AmoError, AmoResult},
    },
};

/// Governance-mutable thresholds, read-only while an operation runs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationThresholds {
    /// Max deviation between expected and minted LP units on deposits
    pub max_deposit_deviation_bps: u16,
    /// Max deviation between expected and received amounts on withdrawals
    pub max_withdrawal_deviation_bps: u16,
    /// Dust threshold for the three peg operations
    pub min_peg_correction: U256,
    /// Tolerance past zero tilt, 18 decimals
    pub max_peg_overshoot: U256,
    /// Minimum adjusted value / adjusted supply ratio
    pub solvency_threshold_bps: u16,
}

impl Default for OperationThresholds {
    fn default() -> Self {
        Self {
            max_deposit_deviation_bps: DEFAULT_MAX_DEPOSIT_DEVIATION_BPS,
            max_withdrawal_deviation_bps: DEFAULT_MAX_WITHDRAWAL_DEVIATION_BPS,
            min_peg_correction: U256::from(1_u64),
            max_peg_overshoot: U256::ZERO,
            solvency_threshold_bps: DEFAULT_SOLVENCY_THRESHOLD_BPS,
        }
    }
}

impl OperationThresholds {
    pub fn max_deposit_deviation_bps(&mut self, bps: u16) -> &mut Self {
        self.max_deposit_deviation_bps = bps;
        self
    }

    pub fn max_withdrawal_deviation_bps(&mut self, bps: u16) -> &mut Self {
        self.max_withdrawal_deviation_bps = bps;
        self
    }

    pub fn min_peg_correction(&mut self, amount: U256) -> &mut Self {
        self.min_peg_correction = amount;
        self
    }

    pub fn max_peg_overshoot(&mut self, amount: U256) -> &mut Self {
        self.max_peg_overshoot = amount;
        self
    }

    pub fn solvency_threshold_bps(&mut self, bps: u16) -> &mut Self {
        self.solvency_threshold_bps = bps;
        self
    }

    /// Rejects basis point values above 100%
    pub fn validate(&self) -> AmoResult<()> {
        let checks = [
            ("max_deposit_deviation_bps", self.max_deposit_deviation_bps),
            ("max_withdrawal_deviation_bps", self.max_withdrawal_deviation_bps),
            ("solvency_threshold_bps", self.solvency_threshold_bps),
        ];
        for (name, bps) in checks {
            if bps > BPS_DENOMINATOR {
                return Err(AmoError::Config(format!(
                    "{} of {} exceeds {}.",
                    name, bps, BPS_DENOMINATOR
                )));
            }
        }
        Ok(())
    }
}

/// Settings fixed at deployment, plus the role addresses governance may rotate
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategySettings {
    /// Vault that owns the strategy
    pub vault: Address,
    pub governor: Address,
    pub strategist: Address,
    pub harvester: Address,
    /// Backing asset
    pub asset: Address,
    pub o_token: Address,
    /// The pool, which is also its LP token
    pub platform: Address,
    /// Decimals of the backing asset
    pub asset_decimals: u8,
    pub thresholds: OperationThresholds,
}

impl StrategySettings {
    /// Sets the Vault address.
    pub fn vault(&mut self, vault: Address) -> &mut Self {
        self.vault = vault;
        self
    }

    /// Sets the Governor address.
    pub fn governor(&mut self, governor: Address) -> &mut Self {
        self.governor = governor;
        self
    }

    /// Sets the Strategist address.
    pub fn strategist(&mut self, strategist: Address) -> &mut Self {
        self.strategist = strategist;
        self
    }

    /// Sets the Harvester address.
    pub fn harvester(&mut self, harvester: Address) -> &mut Self {
        self.harvester = harvester;
        self
    }

    /// Sets the backing asset address.
    pub fn asset(&mut self, asset: Address) -> &mut Self {
        self.asset = asset;
        self
    }

    /// Sets the OToken address.
    pub fn o_token(&mut self, o_token: Address) -> &mut Self {
        self.o_token = o_token;
        self
    }

    /// Sets the pool address.
    pub fn platform(&mut self, platform: Address) -> &mut Self {
        self.platform = platform;
        self
    }

    /// Sets the decimals of the backing asset.
    pub fn asset_decimals(&mut self, asset_decimals: u8) -> &mut Self {
        self.asset_decimals = asset_decimals;
        self
    }

    /// Sets the governance thresholds.
    pub fn thresholds(&mut self, thresholds: OperationThresholds) -> &mut Self {
        self.thresholds = thresholds;
        self
    }

    /// `true` for the asset, the OToken, and the pool's LP token
    pub fn is_supported_token(&self, token: Address) -> bool {
        token == self.asset || token == self.o_token || token == self.platform
    }

    pub fn validate(&self) -> AmoResult<()> {
        if self.asset == self.o_token {
            return Err(AmoError::Config(
                "The asset and the OToken must be different tokens.".to_string(),
            ));
        }
        if self.platform == self.asset || self.platform == self.o_token {
            return Err(AmoError::Config(
                "The pool token must differ from the asset and the OToken.".to_string(),
            ));
        }
        if self.asset_decimals > O_TOKEN_DECIMALS {
            return Err(AmoError::Config(format!(
                "Asset decimals of {} exceed the OToken's {}.",
                self.asset_decimals, O_TOKEN_DECIMALS
            )));
        }
        if self.vault == Address::ZERO || self.governor == Address::ZERO {
            return Err(AmoError::Config(
                "The Vault and the Governor must be set.".to_string(),
            ));
        }
        self.thresholds.validate()
    }
}

/// Candid view of the settings
#[derive(Clone, Default, CandidType)]
pub struct StrategySettingsQuery {
    pub vault: String,
    pub governor: String,
    pub strategist: String,
    pub harvester: String,
    pub asset: String,
    pub o_token: String,
    pub platform: String,
    pub asset_decimals: u8,
    pub max_deposit_deviation_bps: u16,
    pub max_withdrawal_deviation_bps: u16,
    pub min_peg_correction: Nat,
    pub max_peg_overshoot: Nat,
    pub solvency_threshold_bps: u16,
}

impl From<&StrategySettings> for StrategySettingsQuery {
    fn from(value: &StrategySettings) -> Self {
        Self {
            vault: value.vault.to_string(),
            governor: value.governor.to_string(),
            strategist: value.strategist.to_string(),
            harvester: value.harvester.to_string(),
            asset: value.asset.to_string(),
            o_token: value.o_token.to_string(),
            platform: value.platform.to_string(),
            asset_decimals: value.asset_decimals,
            max_deposit_deviation_bps: value.thresholds.max_deposit_deviation_bps,
            max_withdrawal_deviation_bps: value.thresholds.max_withdrawal_deviation_bps,
            min_peg_correction: u256_to_nat(&value.thresholds.min_peg_correction),
            max_peg_overshoot: u256_to_nat(&value.thresholds.max_peg_overshoot),
            solvency_threshold_bps: value.thresholds.solvency_threshold_bps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_settings() -> StrategySettings {
        let mut settings = StrategySettings::default();
        settings
            .vault(Address::repeat_byte(0x01))
            .governor(Address::repeat_byte(0x02))
            .strategist(Address::repeat_byte(0x03))
            .harvester(Address::repeat_byte(0x04))
            .asset(Address::repeat_byte(0x05))
            .o_token(Address::repeat_byte(0x06))
            .platform(Address::repeat_byte(0x07))
            .asset_decimals(18);
        settings
    }

    #[test]
    fn test_strategy_settings_setters() {
        let settings = valid_settings();

        assert_eq!(settings.vault, Address::repeat_byte(0x01));
        assert_eq!(settings.governor, Address::repeat_byte(0x02));
        assert_eq!(settings.strategist, Address::repeat_byte(0x03));
        assert_eq!(settings.harvester, Address::repeat_byte(0x04));
        assert_eq!(settings.platform, Address::repeat_byte(0x07));
        assert_eq!(settings.thresholds, OperationThresholds::default());
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_supported_tokens() {
        let settings = valid_settings();
        assert!(settings.is_supported_token(Address::repeat_byte(0x05)));
        assert!(settings.is_supported_token(Address::repeat_byte(0x06)));
        assert!(settings.is_supported_token(Address::repeat_byte(0x07)));
        assert!(!settings.is_supported_token(Address::repeat_byte(0x08)));
    }

    #[test]
    fn test_invalid_settings() {
        let mut settings = valid_settings();
        settings.o_token(settings.asset);
        assert!(matches!(settings.validate(), Err(AmoError::Config(_))));

        let mut settings = valid_settings();
        settings.asset_decimals(24);
        assert!(matches!(settings.validate(), Err(AmoError::Config(_))));

        let mut settings = valid_settings();
        settings.platform(settings.asset);
        assert!(matches!(settings.validate(), Err(AmoError::Config(_))));

        let mut settings = valid_settings();
        settings.platform(settings.o_token);
        assert!(matches!(settings.validate(), Err(AmoError::Config(_))));

        let mut settings = valid_settings();
        settings.vault(Address::ZERO);
        assert!(matches!(settings.validate(), Err(AmoError::Config(_))));
    }

    #[test]
    fn test_settings_query() {
        let mut settings = valid_settings();
        let mut thresholds = OperationThresholds::default();
        thresholds.min_peg_correction(U256::from(5_u64));
        settings.thresholds(thresholds);

        let query = StrategySettingsQuery::from(&settings);
        assert_eq!(query.min_peg_correction, Nat::from(5_u64));
        assert_eq!(query.solvency_threshold_bps, DEFAULT_SOLVENCY_THRESHOLD_BPS);
        assert_eq!(query.asset, Address::repeat_byte(0x05).to_string());
    }

    proptest! {
        #[test]
        fn test_thresholds_validation(
            deposit in 0u16..=u16::MAX,
            withdrawal in 0u16..=u16::MAX,
            solvency in 0u16..=u16::MAX,
        ) {
            let mut thresholds = OperationThresholds::default();
            thresholds
                .max_deposit_deviation_bps(deposit)
                .max_withdrawal_deviation_bps(withdrawal)
                .solvency_threshold_bps(solvency);

            let in_bounds = deposit <= BPS_DENOMINATOR
                && withdrawal <= BPS_DENOMINATOR
                && solvency <= BPS_DENOMINATOR;
            prop_assert_eq!(thresholds.validate().is_ok(), in_bounds);
        }
    }
}
