//! Solvency Oracle
//!
//! Protocol value is the Vault's total value minus the OTokens the strategy holds in the pool,
//! because those OTokens are not circulating claims against the Vault. Every mutating engine
//! operation projects the snapshot forward with its own effects and checks the projection.

use alloy_primitives::U256;

use crate::{
    constants::{bps_denominator, BPS_DENOMINATOR},
    utils::error::{arithmetic_err, AmoError, AmoResult},
};

/// Vault legs of a committed operation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VaultEffects {
    /// OTokens to mint to the strategy
    pub minted: U256,
    /// OTokens held by the strategy to burn
    pub burned: U256,
    /// Backing asset handed back to the Vault, asset decimals
    pub asset_returned: U256,
}

impl VaultEffects {
    pub fn is_empty(&self) -> bool {
        self.minted.is_zero() && self.burned.is_zero() && self.asset_returned.is_zero()
    }
}

/// The Vault, as consumed by the strategy
#[cfg_attr(test, mockall::automock)]
pub trait Vault {
    /// Checks every leg of `effects` without applying any of them. Once this passes the legs
    /// are expected to succeed.
    fn prepare_settlement(&self, effects: &VaultEffects) -> AmoResult<()>;
    /// Total value of the Vault in 18 decimals, including this strategy's `check_balance`
    fn total_value(&self) -> U256;
    /// Total OToken supply
    fn o_token_total_supply(&self) -> U256;
    /// Mints OTokens to the strategy
    fn mint_for_strategy(&mut self, amount: U256) -> AmoResult<()>;
    /// Burns OTokens held by the strategy
    fn burn_for_strategy(&mut self, amount: U256) -> AmoResult<()>;
    /// Receives backing asset (native decimals) sent back by the strategy
    fn receive_asset(&mut self, amount: U256) -> AmoResult<()>;
}

/// Effects of an operation that move the solvency snapshot, all in 18 decimals
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SolvencyDelta {
    pub position_value_before: U256,
    pub position_value_after: U256,
    pub o_tokens_in_pool_after: U256,
    pub minted: U256,
    pub burned: U256,
    /// Backing asset handed back to the Vault
    pub returned_to_vault: U256,
}

/// On-demand solvency view. Never persisted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolvencySnapshot {
    pub vault_total_value: U256,
    pub o_token_total_supply: U256,
    /// OTokens owned by the strategy through its pool position
    pub o_tokens_in_pool: U256,
}

impl SolvencySnapshot {
    pub fn capture<V: Vault + ?Sized>(vault: &V, o_tokens_in_pool: U256) -> Self {
        Self {
            vault_total_value: vault.total_value(),
            o_token_total_supply: vault.o_token_total_supply(),
            o_tokens_in_pool,
        }
    }

    pub fn adjusted_value(&self) -> U256 {
        self.vault_total_value.saturating_sub(self.o_tokens_in_pool)
    }

    pub fn adjusted_supply(&self) -> U256 {
        self.o_token_total_supply.saturating_sub(self.o_tokens_in_pool)
    }

    /// Applies the effects of an operation to this snapshot
    pub fn project(&self, delta: &SolvencyDelta) -> AmoResult<SolvencySnapshot> {
        let vault_total_value = self
            .vault_total_value
            .checked_sub(delta.position_value_before)
            .ok_or_else(|| arithmetic_err("Vault value is below the strategy's position value."))?
            .checked_add(delta.position_value_after)
            .and_then(|value| value.checked_add(delta.returned_to_vault))
            .ok_or_else(|| arithmetic_err("Projected vault value is out of range."))?;

        let o_token_total_supply = self
            .o_token_total_supply
            .checked_add(delta.minted)
            .and_then(|supply| supply.checked_sub(delta.burned))
            .ok_or_else(|| arithmetic_err("Projected OToken supply is out of range."))?;

        Ok(SolvencySnapshot {
            vault_total_value,
            o_token_total_supply,
            o_tokens_in_pool: delta.o_tokens_in_pool_after,
        })
    }
}

/// Solvency check configured with the governance threshold
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolvencyOracle {
    /// Minimum adjusted value / adjusted supply ratio, in basis points
    pub threshold_bps: u16,
}

impl SolvencyOracle {
    pub fn new(threshold_bps: u16) -> Self {
        Self { threshold_bps }
    }

    /// Vault value minus the OTokens resting in the pool
    pub fn current_protocol_value(&self, snapshot: &SolvencySnapshot) -> U256 {
        snapshot.adjusted_value()
    }

    /// `adjusted_value >= adjusted_supply * threshold`, i.e. the supply may exceed the value by
    /// at most the rounding allowance `1 - threshold`.
    pub fn is_solvent(&self, snapshot: &SolvencySnapshot) -> AmoResult<bool> {
        let supply = snapshot.adjusted_supply();
        if supply.is_zero() {
            return Ok(true);
        }
        let value_bps = snapshot
            .adjusted_value()
            .checked_mul(bps_denominator())
            .ok_or_else(|| arithmetic_err("Solvency value overflowed."))?;
        let required_bps = supply
            .checked_mul(U256::from(self.threshold_bps.min(BPS_DENOMINATOR)))
            .ok_or_else(|| arithmetic_err("Solvency supply overflowed."))?;
        Ok(value_bps >= required_bps)
    }

    pub fn assert_solvent(&self, snapshot: &SolvencySnapshot) -> AmoResult<()> {
        if self.is_solvent(snapshot)? {
            Ok(())
        } else {
            Err(AmoError::ProtocolInsolvent)
        }
    }
}
