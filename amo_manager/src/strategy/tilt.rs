//! Tilt guard for the peg operations.
//!
//! A peg operation must move the pool towards balance. Starting from an OToken-heavy (or
//! balanced) pool the asset side may not end up ahead by more than the overshoot tolerance,
//! and the gap must strictly shrink. The asset-heavy case is the mirror image.

use alloy_primitives::U256;

use crate::{
    pool::Tilt,
    utils::error::{AmoError, AmoResult},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TiltGuard {
    /// Tolerance past zero tilt, 18 decimals
    pub max_peg_overshoot: U256,
}

impl TiltGuard {
    pub fn new(max_peg_overshoot: U256) -> Self {
        Self { max_peg_overshoot }
    }

    /// Validates the pool's move from `before` to `after`
    pub fn check(&self, before: Tilt, after: Tilt) -> AmoResult<()> {
        let improved = after.magnitude() < before.magnitude();

        match before {
            // A balanced pool cannot be improved, so it fails here
            Tilt::Balanced | Tilt::ExcessOToken(_) => {
                if let Tilt::ExcessAsset(overshoot) = after {
                    if overshoot > self.max_peg_overshoot {
                        return Err(AmoError::OTokensOvershotPeg);
                    }
                }
                if !improved {
                    return Err(AmoError::OTokensBalanceWorse);
                }
            }
            Tilt::ExcessAsset(_) => {
                if let Tilt::ExcessOToken(overshoot) = after {
                    if overshoot > self.max_peg_overshoot {
                        return Err(AmoError::AssetsOvershotPeg);
                    }
                }
                if !improved {
                    return Err(AmoError::AssetsBalanceWorse);
                }
            }
        }

        Ok(())
    }
}
