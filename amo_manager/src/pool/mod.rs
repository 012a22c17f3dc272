//! Pool Adapter
//!
//! Thin read/write surface over the external liquidity pool the strategy provides liquidity to.
//! The engine only ever talks to the pool through [`PoolAdapter`], in `(asset, oToken)` order;
//! coin indices are the adapter's business.
//!
//! # Atomicity
//!
//! Every mutating call either applies fully or returns an error with the pool untouched.
//! Implementors are `Clone` so the engine can run an operation against a working copy and
//! only commit it once every postcondition has passed.

use std::fmt;

use alloy_primitives::U256;
use candid::CandidType;
use serde::{Deserialize, Serialize};

use crate::utils::{
    common::scale_to_o_token,
    error::AmoResult,
};

pub mod math;
pub mod stable_swap;

pub use stable_swap::StableSwapPool;

/// Pool Adapter Result
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors raised by the pool itself
#[derive(Clone, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum PoolError {
    /// A min-out bound was not met
    SlippageExceeded,
    /// The pool is in the middle of another interaction
    Locked,
    /// Zero amounts were supplied, or the operation would not change the invariant
    ZeroAmount,
    /// The first deposit must contain every coin
    InitialDepositRequiresAllCoins,
    /// The removal exceeds the pool's reserves or LP supply
    InsufficientLiquidity,
    /// The Newton iteration did not converge
    DidNotConverge,
    /// The coin index is out of range
    InvalidCoin,
    /// Arithmetic error
    Arithmetic(String),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::SlippageExceeded => write!(f, "Slippage screwed you"),
            PoolError::Locked => write!(f, "Pool is locked"),
            PoolError::ZeroAmount => write!(f, "Zero amount"),
            PoolError::InitialDepositRequiresAllCoins => {
                write!(f, "Initial deposit requires all coins")
            }
            PoolError::InsufficientLiquidity => write!(f, "Insufficient liquidity"),
            PoolError::DidNotConverge => write!(f, "Invariant did not converge"),
            PoolError::InvalidCoin => write!(f, "Invalid coin"),
            PoolError::Arithmetic(msg) => write!(f, "{}", msg),
        }
    }
}

/// The two coins of the pool, as seen by the strategy
#[derive(Clone, Copy, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Coin {
    /// The backing asset
    Asset,
    /// The protocol's OToken
    OToken,
}

/// Read/write interface to the external liquidity pool.
///
/// All amounts are pool-native decimals.
pub trait PoolAdapter {
    /// Returns `(asset_reserve, o_token_reserve)`
    fn get_reserves(&self) -> (U256, U256);

    /// Total LP units issued by the pool
    fn total_lp_supply(&self) -> U256;

    /// Value of one LP unit in 18 decimals, scaled by 1e18
    fn virtual_price(&self) -> PoolResult<U256>;

    /// Estimates the LP units minted (`is_deposit`) or burned for an imbalanced change
    fn calc_token_amount(
        &self,
        asset_amount: U256,
        o_token_amount: U256,
        is_deposit: bool,
    ) -> PoolResult<U256>;

    /// Adds liquidity and returns the LP units minted
    fn add_liquidity(
        &mut self,
        asset_amount: U256,
        o_token_amount: U256,
        min_lp_out: U256,
    ) -> PoolResult<U256>;

    /// Burns LP units for a proportional share of both coins. Returns `(asset_out, o_token_out)`.
    fn remove_liquidity(
        &mut self,
        lp_in: U256,
        min_asset_out: U256,
        min_o_token_out: U256,
    ) -> PoolResult<(U256, U256)>;

    /// Burns LP units for a single coin and returns the amount received
    fn remove_liquidity_one_sided(&mut self, lp_in: U256, coin: Coin, min_out: U256)
        -> PoolResult<U256>;

    /// Fails while the pool is mid-interaction and its reported balances may be stale
    fn assert_not_locked(&self) -> PoolResult<()> {
        Ok(())
    }
}

/// Signed pool imbalance, `asset - oToken` with both sides in 18 decimals
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tilt {
    Balanced,
    /// More asset than OToken: the OToken trades above peg
    ExcessAsset(U256),
    /// More OToken than asset: the OToken trades below peg
    ExcessOToken(U256),
}

impl Tilt {
    pub fn between(normalized_asset_reserve: U256, o_token_reserve: U256) -> Self {
        if normalized_asset_reserve > o_token_reserve {
            Tilt::ExcessAsset(normalized_asset_reserve - o_token_reserve)
        } else if o_token_reserve > normalized_asset_reserve {
            Tilt::ExcessOToken(o_token_reserve - normalized_asset_reserve)
        } else {
            Tilt::Balanced
        }
    }

    /// Absolute size of the imbalance
    pub fn magnitude(&self) -> U256 {
        match self {
            Tilt::Balanced => U256::ZERO,
            Tilt::ExcessAsset(diff) | Tilt::ExcessOToken(diff) => *diff,
        }
    }
}

impl fmt::Display for Tilt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tilt::Balanced => write!(f, "balanced"),
            Tilt::ExcessAsset(diff) => write!(f, "+{} asset", diff),
            Tilt::ExcessOToken(diff) => write!(f, "+{} oToken", diff),
        }
    }
}

/// Snapshot of pool composition. Read fresh on every operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PoolState {
    /// Asset reserve in the asset's own decimals
    pub asset_reserve: U256,
    /// Asset reserve scaled to 18 decimals
    pub normalized_asset_reserve: U256,
    pub o_token_reserve: U256,
    pub total_lp_supply: U256,
    /// Virtual price of one LP unit, 1e18 scaled
    pub invariant_price: U256,
}

impl PoolState {
    pub fn read<P: PoolAdapter + ?Sized>(pool: &P, asset_decimals: u8) -> AmoResult<Self> {
        let (asset_reserve, o_token_reserve) = pool.get_reserves();
        Ok(Self {
            asset_reserve,
            normalized_asset_reserve: scale_to_o_token(asset_reserve, asset_decimals)?,
            o_token_reserve,
            total_lp_supply: pool.total_lp_supply(),
            invariant_price: pool.virtual_price()?,
        })
    }

    pub fn tilt(&self) -> Tilt {
        Tilt::between(self.normalized_asset_reserve, self.o_token_reserve)
    }
}
