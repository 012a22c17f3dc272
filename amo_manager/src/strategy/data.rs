//! Mutable strategy data

use std::collections::BTreeMap;

use alloy_primitives::{Address, U256};

use crate::utils::error::{arithmetic_err, AmoError, AmoResult};

/// The strategy's claim on the pool plus assets pushed by the Vault and not yet deposited
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategyPosition {
    /// LP units held
    pub lp_units: U256,
    /// Idle backing asset, asset decimals
    pub idle_asset: U256,
}

impl StrategyPosition {
    pub fn is_empty(&self) -> bool {
        self.lp_units.is_zero() && self.idle_asset.is_zero()
    }
}

/// Approvals granted to the pool
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Allowances {
    pub asset: U256,
    pub o_token: U256,
}

impl Allowances {
    /// Consumes `amount` of an allowance. `U256::MAX` is never decremented.
    pub fn spend(allowance: &mut U256, amount: U256) -> AmoResult<()> {
        if *allowance == U256::MAX {
            return Ok(());
        }
        *allowance = allowance
            .checked_sub(amount)
            .ok_or(AmoError::InsufficientAllowance)?;
        Ok(())
    }
}

/// Struct containing all mutable data of the strategy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StrategyData {
    pub position: StrategyPosition,
    pub allowances: Allowances,
    /// Tokens sent to the strategy that it does not track. Rescuable by governance.
    pub stray_tokens: BTreeMap<Address, U256>,
}

impl StrategyData {
    /// Sets the position of the strategy.
    pub fn position(&mut self, position: StrategyPosition) -> &mut Self {
        self.position = position;
        self
    }

    /// Sets the pool allowances of the strategy.
    pub fn allowances(&mut self, allowances: Allowances) -> &mut Self {
        self.allowances = allowances;
        self
    }

    /// Credits an untracked token.
    pub fn credit_stray(&mut self, token: Address, amount: U256) -> AmoResult<&mut Self> {
        let balance = self.stray_tokens.entry(token).or_default();
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| arithmetic_err("Token balance overflowed."))?;
        Ok(self)
    }

    /// Debits an untracked token.
    pub fn debit_stray(&mut self, token: Address, amount: U256) -> AmoResult<&mut Self> {
        let balance = self
            .stray_tokens
            .get_mut(&token)
            .ok_or(AmoError::InsufficientTokenBalance)?;
        *balance = balance
            .checked_sub(amount)
            .ok_or(AmoError::InsufficientTokenBalance)?;
        if balance.is_zero() {
            self.stray_tokens.remove(&token);
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spending_allowances() {
        let mut allowance = U256::from(10_u64);
        Allowances::spend(&mut allowance, U256::from(4_u64)).unwrap();
        assert_eq!(allowance, U256::from(6_u64));
        assert_eq!(
            Allowances::spend(&mut allowance, U256::from(7_u64)),
            Err(AmoError::InsufficientAllowance)
        );

        let mut unlimited = U256::MAX;
        Allowances::spend(&mut unlimited, U256::from(7_u64)).unwrap();
        assert_eq!(unlimited, U256::MAX);
    }

    #[test]
    fn stray_token_bookkeeping() {
        let token = Address::repeat_byte(0xaa);
        let mut data = StrategyData::default();
        data.credit_stray(token, U256::from(5_u64)).unwrap();
        data.credit_stray(token, U256::from(5_u64)).unwrap();
        assert_eq!(data.stray_tokens[&token], U256::from(10_u64));

        assert_eq!(
            data.debit_stray(token, U256::from(11_u64)).err(),
            Some(AmoError::InsufficientTokenBalance)
        );
        data.debit_stray(token, U256::from(10_u64)).unwrap();
        assert!(data.stray_tokens.is_empty());
        assert_eq!(
            data.debit_stray(token, U256::from(1_u64)).err(),
            Some(AmoError::InsufficientTokenBalance)
        );
    }

    #[test]
    fn position_setter() {
        let mut data = StrategyData::default();
        assert!(data.position.is_empty());
        data.position(StrategyPosition {
            lp_units: U256::from(1_u64),
            idle_asset: U256::ZERO,
        });
        assert!(!data.position.is_empty());
    }
}
