//! Position Accounting
//!
//! Converts the LP units held by the strategy into its share of each pool reserve:
//!
//! ```plain
//! share = reserve * lp_units / total_lp_supply
//! ```

use alloy_primitives::U256;

use crate::{
    pool::PoolState,
    utils::{
        common::{mul_div, scale_to_o_token},
        error::{arithmetic_err, AmoResult},
    },
};

use super::data::StrategyPosition;

/// The strategy's share of the pool reserves
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PositionShares {
    /// Asset decimals
    pub asset: U256,
    pub o_token: U256,
}

impl PositionShares {
    pub fn of(position: &StrategyPosition, pool_state: &PoolState) -> AmoResult<Self> {
        if pool_state.total_lp_supply.is_zero() || position.lp_units.is_zero() {
            return Ok(Self::default());
        }
        Ok(Self {
            asset: mul_div(
                pool_state.asset_reserve,
                position.lp_units,
                pool_state.total_lp_supply,
            )?,
            o_token: mul_div(
                pool_state.o_token_reserve,
                position.lp_units,
                pool_state.total_lp_supply,
            )?,
        })
    }
}

/// Idle asset plus the asset share of the pool, asset decimals
pub fn asset_balance(position: &StrategyPosition, shares: &PositionShares) -> AmoResult<U256> {
    position
        .idle_asset
        .checked_add(shares.asset)
        .ok_or_else(|| arithmetic_err("Asset balance overflowed."))
}

/// Sum of every tracked balance in 18 decimals
pub fn position_value(
    position: &StrategyPosition,
    pool_state: &PoolState,
    asset_decimals: u8,
) -> AmoResult<U256> {
    let shares = PositionShares::of(position, pool_state)?;
    let assets = scale_to_o_token(asset_balance(position, &shares)?, asset_decimals)?;
    assets
        .checked_add(shares.o_token)
        .ok_or_else(|| arithmetic_err("Position value overflowed."))
}
