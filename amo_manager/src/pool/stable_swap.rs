//! Reference two-coin stable-swap pool.
//!
//! Models a Curve-style plain pool: amplified invariant, precision multipliers for coins with
//! fewer than 18 decimals, an imbalance fee charged on uneven deposits and single-coin
//! withdrawals, and admin fee set to zero (all fees stay in the pool for LPs).
//!
//! Rounding always favours the pool: LP minted rounds down, single-coin withdrawals drop one
//! unit before converting back to native decimals.

use alloy_primitives::U256;

use super::{
    math::{
        abs_diff, add, div, get_d, get_y, mul, sub, A_PRECISION, FEE_DENOMINATOR, N_COINS,
        PRECISION,
    },
    Coin, PoolAdapter, PoolError, PoolResult,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StableSwapPool {
    /// Native balances, indexed by coin index
    balances: [U256; N_COINS],
    precision_multipliers: [U256; N_COINS],
    asset_index: usize,
    /// `A * A_PRECISION`
    amp: U256,
    /// Swap fee, `FEE_DENOMINATOR` scaled
    fee: U256,
    total_supply: U256,
    /// Set while the pool is transferring native value out and its state is not settled
    locked: bool,
}

impl StableSwapPool {
    /// Creates an empty pool.
    ///
    /// * `asset_decimals` - decimals of the backing asset. The OToken always has 18.
    /// * `asset_index` - coin index of the backing asset (0 or 1)
    /// * `amplification` - the plain `A` parameter
    /// * `fee` - `FEE_DENOMINATOR` scaled fee, e.g. `4_000_000` for 4 bps
    pub fn new(
        asset_decimals: u8,
        asset_index: usize,
        amplification: u64,
        fee: u64,
    ) -> PoolResult<Self> {
        if asset_index >= N_COINS {
            return Err(PoolError::InvalidCoin);
        }
        if asset_decimals > 18 {
            return Err(PoolError::Arithmetic(
                "Coins with more than 18 decimals are not supported.".to_string(),
            ));
        }
        if fee >= FEE_DENOMINATOR {
            return Err(PoolError::Arithmetic("Fee must be below 100%.".to_string()));
        }
        let amp = amplification
            .checked_mul(A_PRECISION)
            .filter(|amp| *amp > 0)
            .ok_or_else(|| PoolError::Arithmetic("Invalid amplification.".to_string()))?;

        let mut precision_multipliers = [U256::from(1_u64); N_COINS];
        precision_multipliers[asset_index] =
            U256::from(10_u128.pow(18 - asset_decimals as u32));

        Ok(Self {
            balances: [U256::ZERO; N_COINS],
            precision_multipliers,
            asset_index,
            amp: U256::from(amp),
            fee: U256::from(fee),
            total_supply: U256::ZERO,
            locked: false,
        })
    }

    /// Marks the pool as mid-interaction, as it is while sending native value to a receiver.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    fn index_of(&self, coin: Coin) -> usize {
        match coin {
            Coin::Asset => self.asset_index,
            Coin::OToken => 1 - self.asset_index,
        }
    }

    fn ordered(&self, asset_amount: U256, o_token_amount: U256) -> [U256; N_COINS] {
        let mut amounts = [U256::ZERO; N_COINS];
        amounts[self.index_of(Coin::Asset)] = asset_amount;
        amounts[self.index_of(Coin::OToken)] = o_token_amount;
        amounts
    }

    fn xp(&self, balances: &[U256; N_COINS]) -> PoolResult<[U256; N_COINS]> {
        Ok([
            mul(balances[0], self.precision_multipliers[0])?,
            mul(balances[1], self.precision_multipliers[1])?,
        ])
    }

    fn invariant(&self, balances: &[U256; N_COINS]) -> PoolResult<U256> {
        get_d(&self.xp(balances)?, self.amp)
    }

    /// Imbalance fee, `fee * N / (4 * (N - 1))`
    fn base_fee(&self) -> PoolResult<U256> {
        div(
            mul(self.fee, U256::from(N_COINS as u64))?,
            U256::from((4 * (N_COINS - 1)) as u64),
        )
    }

    /// Returns the balances after the change and the LP units minted or burned for it.
    fn simulate_imbalanced(
        &self,
        amounts: &[U256; N_COINS],
        is_deposit: bool,
    ) -> PoolResult<([U256; N_COINS], U256)> {
        if amounts.iter().all(|amount| amount.is_zero()) {
            return Err(PoolError::ZeroAmount);
        }

        let old_balances = self.balances;
        let mut new_balances = old_balances;
        for i in 0..N_COINS {
            new_balances[i] = if is_deposit {
                add(old_balances[i], amounts[i])?
            } else {
                old_balances[i]
                    .checked_sub(amounts[i])
                    .ok_or(PoolError::InsufficientLiquidity)?
            };
        }

        if self.total_supply.is_zero() {
            if !is_deposit {
                return Err(PoolError::InsufficientLiquidity);
            }
            if amounts.iter().any(|amount| amount.is_zero()) {
                return Err(PoolError::InitialDepositRequiresAllCoins);
            }
            return Ok((new_balances, self.invariant(&new_balances)?));
        }

        let d0 = self.invariant(&old_balances)?;
        let d1 = self.invariant(&new_balances)?;
        let changed = if is_deposit { d1 > d0 } else { d1 < d0 };
        if !changed {
            return Err(PoolError::ZeroAmount);
        }

        // Charge the imbalance fee on the distance from a proportional change
        let base_fee = self.base_fee()?;
        let mut charged_balances = new_balances;
        for i in 0..N_COINS {
            let ideal_balance = div(mul(d1, old_balances[i])?, d0)?;
            let difference = abs_diff(ideal_balance, new_balances[i]);
            let fee = div(mul(base_fee, difference)?, U256::from(FEE_DENOMINATOR))?;
            charged_balances[i] = sub(new_balances[i], fee)?;
        }
        let d2 = self.invariant(&charged_balances)?;

        let lp = if is_deposit {
            let growth = d2.checked_sub(d0).ok_or(PoolError::ZeroAmount)?;
            div(mul(self.total_supply, growth)?, d0)?
        } else {
            div(mul(sub(d0, d2)?, self.total_supply)?, d0)?
        };

        Ok((new_balances, lp))
    }

    /// Amount of `coin` received for burning `lp_in` LP units single-sided.
    pub fn calc_withdraw_one_coin(&self, lp_in: U256, coin: Coin) -> PoolResult<U256> {
        if lp_in.is_zero() {
            return Err(PoolError::ZeroAmount);
        }
        if lp_in >= self.total_supply {
            return Err(PoolError::InsufficientLiquidity);
        }

        let i = self.index_of(coin);
        let xp = self.xp(&self.balances)?;
        let d0 = get_d(&xp, self.amp)?;
        let d1 = sub(d0, div(mul(lp_in, d0)?, self.total_supply)?)?;
        let new_y = get_y(self.amp, i, &xp, d1)?;

        let base_fee = self.base_fee()?;
        let mut xp_reduced = xp;
        for j in 0..N_COINS {
            let proportional = div(mul(xp[j], d1)?, d0)?;
            let dx_expected = if j == i {
                proportional.saturating_sub(new_y)
            } else {
                sub(xp[j], proportional)?
            };
            let fee = div(mul(base_fee, dx_expected)?, U256::from(FEE_DENOMINATOR))?;
            xp_reduced[j] = sub(xp_reduced[j], fee)?;
        }

        let y = get_y(self.amp, i, &xp_reduced, d1)?;
        // Withdraw less to account for rounding errors
        let dy = sub(xp_reduced[i], y)?.saturating_sub(U256::from(1_u64));
        div(dy, self.precision_multipliers[i])
    }

    /// Swaps `dx` of `from` for the other coin.
    pub fn exchange(&mut self, from: Coin, dx: U256, min_dy: U256) -> PoolResult<U256> {
        self.assert_not_locked()?;
        if dx.is_zero() {
            return Err(PoolError::ZeroAmount);
        }

        let i = self.index_of(from);
        let j = 1 - i;
        let xp = self.xp(&self.balances)?;
        let d = get_d(&xp, self.amp)?;

        let mut xp_after = xp;
        xp_after[i] = add(xp[i], mul(dx, self.precision_multipliers[i])?)?;
        let y = get_y(self.amp, j, &xp_after, d)?;

        let dy = sub(xp[j], y)?.saturating_sub(U256::from(1_u64));
        let fee = div(mul(dy, self.fee)?, U256::from(FEE_DENOMINATOR))?;
        let dy = div(sub(dy, fee)?, self.precision_multipliers[j])?;
        if dy < min_dy {
            return Err(PoolError::SlippageExceeded);
        }

        let balance_in = add(self.balances[i], dx)?;
        let balance_out = self.balances[j]
            .checked_sub(dy)
            .ok_or(PoolError::InsufficientLiquidity)?;
        self.balances[i] = balance_in;
        self.balances[j] = balance_out;
        Ok(dy)
    }
}

impl PoolAdapter for StableSwapPool {
    fn get_reserves(&self) -> (U256, U256) {
        (
            self.balances[self.index_of(Coin::Asset)],
            self.balances[self.index_of(Coin::OToken)],
        )
    }

    fn total_lp_supply(&self) -> U256 {
        self.total_supply
    }

    fn virtual_price(&self) -> PoolResult<U256> {
        if self.total_supply.is_zero() {
            return Ok(U256::from(PRECISION));
        }
        let d = self.invariant(&self.balances)?;
        div(mul(d, U256::from(PRECISION))?, self.total_supply)
    }

    fn calc_token_amount(
        &self,
        asset_amount: U256,
        o_token_amount: U256,
        is_deposit: bool,
    ) -> PoolResult<U256> {
        let amounts = self.ordered(asset_amount, o_token_amount);
        self.simulate_imbalanced(&amounts, is_deposit)
            .map(|(_, lp)| lp)
    }

    fn add_liquidity(
        &mut self,
        asset_amount: U256,
        o_token_amount: U256,
        min_lp_out: U256,
    ) -> PoolResult<U256> {
        self.assert_not_locked()?;
        let amounts = self.ordered(asset_amount, o_token_amount);
        let (new_balances, minted) = self.simulate_imbalanced(&amounts, true)?;
        if minted.is_zero() {
            return Err(PoolError::ZeroAmount);
        }
        if minted < min_lp_out {
            return Err(PoolError::SlippageExceeded);
        }

        let total_supply = add(self.total_supply, minted)?;
        self.balances = new_balances;
        self.total_supply = total_supply;
        Ok(minted)
    }

    fn remove_liquidity(
        &mut self,
        lp_in: U256,
        min_asset_out: U256,
        min_o_token_out: U256,
    ) -> PoolResult<(U256, U256)> {
        self.assert_not_locked()?;
        if lp_in.is_zero() {
            return Err(PoolError::ZeroAmount);
        }
        if lp_in > self.total_supply {
            return Err(PoolError::InsufficientLiquidity);
        }

        let mut new_balances = self.balances;
        let mut amounts = [U256::ZERO; N_COINS];
        for i in 0..N_COINS {
            amounts[i] = div(mul(self.balances[i], lp_in)?, self.total_supply)?;
            new_balances[i] = sub(self.balances[i], amounts[i])?;
        }

        let asset_out = amounts[self.index_of(Coin::Asset)];
        let o_token_out = amounts[self.index_of(Coin::OToken)];
        if asset_out < min_asset_out || o_token_out < min_o_token_out {
            return Err(PoolError::SlippageExceeded);
        }

        self.balances = new_balances;
        self.total_supply = sub(self.total_supply, lp_in)?;
        Ok((asset_out, o_token_out))
    }

    fn remove_liquidity_one_sided(
        &mut self,
        lp_in: U256,
        coin: Coin,
        min_out: U256,
    ) -> PoolResult<U256> {
        self.assert_not_locked()?;
        let dy = self.calc_withdraw_one_coin(lp_in, coin)?;
        if dy < min_out {
            return Err(PoolError::SlippageExceeded);
        }

        let i = self.index_of(coin);
        let new_balance = self.balances[i]
            .checked_sub(dy)
            .ok_or(PoolError::InsufficientLiquidity)?;
        self.balances[i] = new_balance;
        self.total_supply = sub(self.total_supply, lp_in)?;
        Ok(dy)
    }

    fn assert_not_locked(&self) -> PoolResult<()> {
        if self.locked {
            return Err(PoolError::Locked);
        }
        Ok(())
    }
}
