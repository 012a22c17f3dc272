//! Role capabilities
//!
//! Engine operations are reachable only through a capability, and a capability is only handed
//! out after its role check passes:
//!
//! ```plain
//! Vault                ─► VaultAccess       deposit, deposit_all, withdraw, withdraw_all
//! Strategist, Governor ─► StrategistAccess  mint_and_add_o_tokens, remove_and_burn_o_tokens,
//!                                           remove_only_assets
//! Governor             ─► GovernorAccess    thresholds, roles, token rescue, approvals
//! ```

use alloy_primitives::{Address, U256};

use crate::{
    config::ThresholdsInput,
    pool::PoolAdapter,
    solvency::Vault,
    types::OperationReceipt,
    utils::error::{AmoError, AmoResult},
};

use super::{executable::AmoStrategy, settings::OperationThresholds};

impl<P: PoolAdapter + Clone, V: Vault> AmoStrategy<P, V> {
    pub fn as_vault(&mut self, caller: Address) -> AmoResult<VaultAccess<'_, P, V>> {
        if caller != self.settings().vault {
            return Err(AmoError::CallerNotVault);
        }
        Ok(VaultAccess { strategy: self })
    }

    pub fn as_strategist(&mut self, caller: Address) -> AmoResult<StrategistAccess<'_, P, V>> {
        let settings = self.settings();
        if caller != settings.strategist && caller != settings.governor {
            return Err(AmoError::CallerNotStrategist);
        }
        Ok(StrategistAccess { strategy: self })
    }

    pub fn as_governor(&mut self, caller: Address) -> AmoResult<GovernorAccess<'_, P, V>> {
        if caller != self.settings().governor {
            return Err(AmoError::CallerNotGovernor);
        }
        Ok(GovernorAccess { strategy: self })
    }
}

/// Operations reserved to the Vault
pub struct VaultAccess<'a, P, V> {
    strategy: &'a mut AmoStrategy<P, V>,
}

impl<'a, P: PoolAdapter + Clone, V: Vault> VaultAccess<'a, P, V> {
    /// Deposits idle asset together with an equal nominal amount of minted OTokens
    pub fn deposit(&mut self, asset: Address, amount: U256) -> AmoResult<OperationReceipt> {
        self.strategy.deposit(asset, amount)
    }

    pub fn deposit_all(&mut self) -> AmoResult<OperationReceipt> {
        self.strategy.deposit_all()
    }

    pub fn withdraw(
        &mut self,
        recipient: Address,
        asset: Address,
        amount: U256,
    ) -> AmoResult<OperationReceipt> {
        self.strategy.withdraw(recipient, asset, amount)
    }

    pub fn withdraw_all(&mut self) -> AmoResult<OperationReceipt> {
        self.strategy.withdraw_all()
    }
}

/// Peg operations. The tilt guard runs inside every one of them and cannot be skipped.
pub struct StrategistAccess<'a, P, V> {
    strategy: &'a mut AmoStrategy<P, V>,
}

impl<'a, P: PoolAdapter + Clone, V: Vault> StrategistAccess<'a, P, V> {
    pub fn mint_and_add_o_tokens(&mut self, amount: U256) -> AmoResult<OperationReceipt> {
        self.strategy.mint_and_add_o_tokens(amount)
    }

    pub fn remove_and_burn_o_tokens(&mut self, amount: U256) -> AmoResult<OperationReceipt> {
        self.strategy.remove_and_burn_o_tokens(amount)
    }

    pub fn remove_only_assets(&mut self, amount: U256) -> AmoResult<OperationReceipt> {
        self.strategy.remove_only_assets(amount)
    }
}

pub struct GovernorAccess<'a, P, V> {
    strategy: &'a mut AmoStrategy<P, V>,
}

impl<'a, P: PoolAdapter + Clone, V: Vault> GovernorAccess<'a, P, V> {
    pub fn set_thresholds(&mut self, thresholds: OperationThresholds) -> AmoResult<()> {
        self.strategy.set_thresholds(thresholds)
    }

    /// Candid form of `set_thresholds`
    pub fn set_thresholds_from_input(&mut self, input: ThresholdsInput) -> AmoResult<()> {
        self.set_thresholds(OperationThresholds::try_from(input)?)
    }

    pub fn set_strategist(&mut self, strategist: Address) -> AmoResult<()> {
        self.strategy.set_strategist(strategist)
    }

    pub fn set_harvester(&mut self, harvester: Address) -> AmoResult<()> {
        self.strategy.set_harvester(harvester)
    }

    /// Rescues a token the strategy does not track
    pub fn transfer_token(&mut self, token: Address, amount: U256) -> AmoResult<()> {
        self.strategy.transfer_token(token, amount)
    }

    pub fn safe_approve_all_tokens(&mut self) -> AmoResult<()> {
        self.strategy.safe_approve_all_tokens()
    }

    /// The Governor may run every peg operation too
    pub fn as_strategist(self) -> StrategistAccess<'a, P, V> {
        StrategistAccess {
            strategy: self.strategy,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_utils::*, types::StrategyEvent};
    use candid::Nat;

    #[test]
    fn vault_capability() {
        let mut strategy = strategy_with_pool(1_000, 1_000, 0);
        strategy.receive_token(asset(), e18(10)).unwrap();

        assert_eq!(
            strategy.as_vault(strategist()).err().map(|err| err.to_string()),
            Some("Caller is not the Vault".to_string())
        );
        assert!(strategy.as_vault(governor()).is_err());

        let mut vault = strategy.as_vault(vault_address()).unwrap();
        vault.deposit(asset(), e18(10)).unwrap();
        vault.withdraw_all().unwrap();
        assert!(strategy.position().is_empty());
    }

    #[test]
    fn strategist_capability() {
        let mut strategy = strategy_with_pool(500, 700, 500);

        assert_eq!(
            strategy.as_strategist(vault_address()).err(),
            Some(AmoError::CallerNotStrategist)
        );
        assert_eq!(
            strategy.as_strategist(harvester()).err(),
            Some(AmoError::CallerNotStrategist)
        );

        strategy
            .as_strategist(strategist())
            .unwrap()
            .remove_and_burn_o_tokens(e18(1))
            .unwrap();
        strategy
            .as_strategist(governor())
            .unwrap()
            .remove_and_burn_o_tokens(e18(1))
            .unwrap();
    }

    #[test]
    fn governor_capability() {
        let mut strategy = strategy_with_pool(500, 700, 500);

        assert_eq!(
            strategy.as_governor(strategist()).err(),
            Some(AmoError::CallerNotGovernor)
        );

        let new_strategist = Address::repeat_byte(0x99);
        strategy
            .as_governor(governor())
            .unwrap()
            .set_strategist(new_strategist)
            .unwrap();
        assert!(strategy.as_strategist(strategist()).is_err());
        assert!(strategy.as_strategist(new_strategist).is_ok());

        let mut governor = strategy.as_governor(governor()).unwrap();
        governor.set_harvester(Address::repeat_byte(0x98)).unwrap();
        governor
            .as_strategist()
            .remove_and_burn_o_tokens(e18(1))
            .unwrap();
    }

    #[test]
    fn governance_controls_the_approvals() {
        let mut strategy = unapproved_strategy_with_pool(1_000, 1_000);
        strategy.receive_token(asset(), e18(10)).unwrap();
        assert_eq!(
            strategy
                .as_vault(vault_address())
                .unwrap()
                .deposit(asset(), e18(10))
                .err(),
            Some(AmoError::InsufficientAllowance)
        );

        strategy
            .as_governor(governor())
            .unwrap()
            .safe_approve_all_tokens()
            .unwrap();
        strategy
            .as_vault(vault_address())
            .unwrap()
            .deposit(asset(), e18(10))
            .unwrap();
    }

    #[test]
    fn governor_updates_thresholds_from_candid() {
        let mut strategy = strategy_with_pool(1_000, 1_000, 0);
        let input = ThresholdsInput {
            max_deposit_deviation_bps: Nat::from(40_u64),
            max_withdrawal_deviation_bps: Nat::from(100_u64),
            min_peg_correction: Nat::from(1_000_u64),
            max_peg_overshoot: Nat::from(0_u64),
            solvency_threshold_bps: Nat::from(9_980_u64),
        };

        let mut rejected = input.clone();
        rejected.max_deposit_deviation_bps = Nat::from(20_000_u64);
        let mut governor = strategy.as_governor(governor()).unwrap();
        assert!(matches!(
            governor.set_thresholds_from_input(rejected),
            Err(AmoError::Config(_))
        ));
        governor.set_thresholds_from_input(input).unwrap();

        let thresholds = &strategy.settings().thresholds;
        assert_eq!(thresholds.max_deposit_deviation_bps, 40);
        assert_eq!(thresholds.min_peg_correction, U256::from(1_000_u64));
        assert_eq!(
            strategy.events(),
            &[StrategyEvent::MaxDepositDeviationUpdated {
                previous_bps: 100,
                new_bps: 40,
            }]
        );
    }

    #[test]
    fn governor_rescues_stray_tokens() {
        let mut strategy = strategy_with_pool(1_000, 1_000, 0);
        let stray = Address::repeat_byte(0x55);
        strategy.receive_token(stray, e18(1)).unwrap();

        let mut governor = strategy.as_governor(governor()).unwrap();
        assert_eq!(
            governor.transfer_token(asset(), e18(1)),
            Err(AmoError::CannotTransferSupportedAsset)
        );
        governor.transfer_token(stray, e18(1)).unwrap();
        governor
            .set_thresholds(OperationThresholds::default())
            .unwrap();
    }
}
