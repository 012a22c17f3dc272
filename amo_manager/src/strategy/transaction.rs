//! Pending transaction
//!
//! An operation runs against a working copy of the pool, the position, and the allowances.
//! Vault effects (mint, burn, returned assets) and emitted events are queued. Nothing outside
//! the pending transaction changes until the engine commits it, and dropping it discards
//! every effect.

use alloy_primitives::{Address, U256};

use crate::{
    pool::{Coin, PoolAdapter},
    types::{OperationReceipt, StrategyEvent},
    utils::error::{arithmetic_err, AmoError, AmoResult},
};

use super::data::{Allowances, StrategyData, StrategyPosition};

fn add(a: U256, b: U256) -> AmoResult<U256> {
    a.checked_add(b)
        .ok_or_else(|| arithmetic_err("Addition overflowed."))
}

pub struct PendingTransaction<P> {
    /// Working copy of the pool
    pub pool: P,
    pub position: StrategyPosition,
    pub allowances: Allowances,
    pub receipt: OperationReceipt,
}

impl<P: PoolAdapter + Clone> PendingTransaction<P> {
    pub fn begin(pool: &P, data: &StrategyData) -> Self {
        Self {
            pool: pool.clone(),
            position: data.position.clone(),
            allowances: data.allowances.clone(),
            receipt: OperationReceipt::default(),
        }
    }

    /// Queues OTokens to be minted by the Vault to the strategy
    pub fn mint(&mut self, amount: U256) -> AmoResult<()> {
        self.receipt.o_tokens_minted = add(self.receipt.o_tokens_minted, amount)?;
        Ok(())
    }

    /// Queues OTokens held by the strategy to be burned by the Vault
    pub fn burn(&mut self, amount: U256) -> AmoResult<()> {
        self.receipt.o_tokens_burned = add(self.receipt.o_tokens_burned, amount)?;
        Ok(())
    }

    /// Moves backing asset out of the idle balance to `recipient`
    pub fn send_asset(&mut self, vault: Address, recipient: Address, amount: U256) -> AmoResult<()> {
        if amount.is_zero() {
            return Ok(());
        }
        self.position.idle_asset = self
            .position
            .idle_asset
            .checked_sub(amount)
            .ok_or(AmoError::InsufficientAssetBalance)?;
        if recipient == vault {
            self.receipt.asset_to_vault = add(self.receipt.asset_to_vault, amount)?;
        } else {
            self.receipt.transfers.push((recipient, amount));
        }
        Ok(())
    }

    pub fn emit(&mut self, event: StrategyEvent) {
        self.receipt.events.push(event);
    }

    /// Adds liquidity from idle asset and OTokens queued for minting
    pub fn add_liquidity(
        &mut self,
        asset_amount: U256,
        o_token_amount: U256,
        min_lp_out: U256,
    ) -> AmoResult<U256> {
        if asset_amount > self.position.idle_asset {
            return Err(AmoError::InsufficientAssetBalance);
        }
        Allowances::spend(&mut self.allowances.asset, asset_amount)?;
        Allowances::spend(&mut self.allowances.o_token, o_token_amount)?;

        let lp = self
            .pool
            .add_liquidity(asset_amount, o_token_amount, min_lp_out)?;

        self.position.idle_asset -= asset_amount;
        self.position.lp_units = add(self.position.lp_units, lp)?;
        self.receipt.lp_minted = add(self.receipt.lp_minted, lp)?;
        Ok(lp)
    }

    fn burn_lp(&mut self, lp_in: U256) -> AmoResult<()> {
        self.position.lp_units = self
            .position
            .lp_units
            .checked_sub(lp_in)
            .ok_or(AmoError::InsufficientLpTokens)?;
        self.receipt.lp_burned = add(self.receipt.lp_burned, lp_in)?;
        Ok(())
    }

    /// Removes both legs. The asset leg lands in the idle balance.
    pub fn remove_liquidity(
        &mut self,
        lp_in: U256,
        min_asset_out: U256,
        min_o_token_out: U256,
    ) -> AmoResult<(U256, U256)> {
        if lp_in > self.position.lp_units {
            return Err(AmoError::InsufficientLpTokens);
        }
        let (asset_out, o_token_out) =
            self.pool
                .remove_liquidity(lp_in, min_asset_out, min_o_token_out)?;
        self.burn_lp(lp_in)?;
        self.position.idle_asset = add(self.position.idle_asset, asset_out)?;
        Ok((asset_out, o_token_out))
    }

    /// Removes a single leg. An asset leg lands in the idle balance.
    pub fn remove_one_sided(&mut self, lp_in: U256, coin: Coin, min_out: U256) -> AmoResult<U256> {
        if lp_in > self.position.lp_units {
            return Err(AmoError::InsufficientLpTokens);
        }
        let out = self
            .pool
            .remove_liquidity_one_sided(lp_in, coin, min_out)?;
        self.burn_lp(lp_in)?;
        if coin == Coin::Asset {
            self.position.idle_asset = add(self.position.idle_asset, out)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{constants::scale, pool::StableSwapPool};

    fn e18(value: u64) -> U256 {
        U256::from(value) * scale()
    }

    fn funded_data(idle: u64) -> StrategyData {
        let mut data = StrategyData::default();
        data.position(StrategyPosition {
            lp_units: U256::ZERO,
            idle_asset: e18(idle),
        })
        .allowances(Allowances {
            asset: U256::MAX,
            o_token: U256::MAX,
        });
        data
    }

    fn seeded_pool() -> StableSwapPool {
        let mut pool = StableSwapPool::new(18, 0, 100, 0).unwrap();
        pool.add_liquidity(e18(1_000), e18(1_000), U256::ZERO).unwrap();
        pool
    }

    #[test]
    fn dropping_discards_the_working_copy() {
        let pool = seeded_pool();
        let data = funded_data(100);

        let mut tx = PendingTransaction::begin(&pool, &data);
        tx.mint(e18(100)).unwrap();
        tx.add_liquidity(e18(100), e18(100), U256::ZERO).unwrap();
        assert_eq!(tx.pool.get_reserves(), (e18(1_100), e18(1_100)));
        assert_eq!(tx.position.idle_asset, U256::ZERO);
        drop(tx);

        assert_eq!(pool.get_reserves(), (e18(1_000), e18(1_000)));
        assert_eq!(data.position.idle_asset, e18(100));
    }

    #[test]
    fn add_liquidity_requires_idle_asset_and_allowance() {
        let pool = seeded_pool();
        let mut data = funded_data(10);

        let mut tx = PendingTransaction::begin(&pool, &data);
        assert_eq!(
            tx.add_liquidity(e18(11), e18(11), U256::ZERO),
            Err(AmoError::InsufficientAssetBalance)
        );

        data.allowances(Allowances::default());
        let mut tx = PendingTransaction::begin(&pool, &data);
        assert_eq!(
            tx.add_liquidity(e18(10), e18(10), U256::ZERO),
            Err(AmoError::InsufficientAllowance)
        );
        assert_eq!(tx.pool, pool);
    }

    #[test]
    fn removals_are_bounded_by_held_lp() {
        let pool = seeded_pool();
        let data = funded_data(100);

        let mut tx = PendingTransaction::begin(&pool, &data);
        let lp = tx.add_liquidity(e18(100), e18(100), U256::ZERO).unwrap();
        assert_eq!(
            tx.remove_liquidity(lp + U256::from(1_u64), U256::ZERO, U256::ZERO),
            Err(AmoError::InsufficientLpTokens)
        );

        let out = tx.remove_one_sided(lp / U256::from(2_u64), Coin::Asset, U256::ZERO).unwrap();
        assert_eq!(tx.position.idle_asset, out);
        assert_eq!(tx.receipt.lp_burned, lp / U256::from(2_u64));
        assert_eq!(tx.receipt.lp_minted, lp);
    }

    #[test]
    fn sending_assets_splits_vault_and_transfers() {
        let pool = seeded_pool();
        let data = funded_data(10);
        let vault = Address::repeat_byte(0x01);
        let redeemer = Address::repeat_byte(0x02);

        let mut tx = PendingTransaction::begin(&pool, &data);
        tx.send_asset(vault, vault, e18(4)).unwrap();
        tx.send_asset(vault, redeemer, e18(5)).unwrap();
        assert_eq!(
            tx.send_asset(vault, redeemer, e18(2)),
            Err(AmoError::InsufficientAssetBalance)
        );

        assert_eq!(tx.receipt.asset_to_vault, e18(4));
        assert_eq!(tx.receipt.transfers, vec![(redeemer, e18(5))]);
        assert_eq!(tx.position.idle_asset, e18(1));
    }
}
