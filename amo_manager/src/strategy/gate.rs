//! Deviation checks on actual versus expected amounts

use alloy_primitives::U256;

use crate::{
    constants::scale,
    utils::{
        common::{apply_deviation, mul_div},
        error::{AmoError, AmoResult},
    },
};

use super::settings::OperationThresholds;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviationGate {
    pub max_deposit_deviation_bps: u16,
    pub max_withdrawal_deviation_bps: u16,
}

impl From<&OperationThresholds> for DeviationGate {
    fn from(value: &OperationThresholds) -> Self {
        Self {
            max_deposit_deviation_bps: value.max_deposit_deviation_bps,
            max_withdrawal_deviation_bps: value.max_withdrawal_deviation_bps,
        }
    }
}

impl DeviationGate {
    /// Minimum LP units for adding liquidity worth `value` (18 decimals):
    /// `value / virtual_price` reduced by the deposit deviation.
    pub fn min_lp_out(&self, value: U256, virtual_price: U256) -> AmoResult<U256> {
        let expected = mul_div(value, scale(), virtual_price)?;
        apply_deviation(expected, self.max_deposit_deviation_bps)
    }

    /// Minimum amount to receive when `expected` is requested from the pool
    pub fn min_withdrawal_out(&self, expected: U256) -> AmoResult<U256> {
        apply_deviation(expected, self.max_withdrawal_deviation_bps)
    }

    pub fn check_deposit(&self, actual_lp: U256, min_lp: U256) -> AmoResult<()> {
        if actual_lp < min_lp {
            return Err(AmoError::Slippage);
        }
        Ok(())
    }

    pub fn check_withdrawal(&self, actual: U256, min_out: U256) -> AmoResult<()> {
        if actual < min_out {
            return Err(AmoError::Slippage);
        }
        Ok(())
    }
}
