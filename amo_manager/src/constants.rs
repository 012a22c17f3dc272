//! AMO Strategy Constants
// The deviation and solvency defaults below are deployment defaults. Governance overrides them
// per pool through `OperationThresholds`.

use alloy_primitives::U256;

/// Scale used for fixed point arithmetic
pub const SCALE: u128 = 1_000_000_000_000_000_000; // e18
pub fn scale() -> U256 {
    U256::from(SCALE)
}

/// Decimals of the OToken
pub const O_TOKEN_DECIMALS: u8 = 18;

/// Denominator for every basis point value
pub const BPS_DENOMINATOR: u16 = 10_000;
pub fn bps_denominator() -> U256 {
    U256::from(BPS_DENOMINATOR)
}

/// Default max deviation between expected and minted LP units on deposits
pub const DEFAULT_MAX_DEPOSIT_DEVIATION_BPS: u16 = 100; // 1%

/// Default max deviation between expected and received amounts on withdrawals
pub const DEFAULT_MAX_WITHDRAWAL_DEVIATION_BPS: u16 = 100; // 1%

/// Default minimum vault value / OToken supply ratio
pub const DEFAULT_SOLVENCY_THRESHOLD_BPS: u16 = 9_980; // 0.998

/// Number of journal collections kept before the oldest are pruned
pub const MAX_JOURNAL_COLLECTIONS: usize = 500;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_is_e18() {
        assert_eq!(SCALE, 10_u128.pow(18));
    }

    #[test]
    fn defaults_are_within_bounds() {
        assert!(DEFAULT_MAX_DEPOSIT_DEVIATION_BPS < BPS_DENOMINATOR);
        assert!(DEFAULT_MAX_WITHDRAWAL_DEVIATION_BPS < BPS_DENOMINATOR);
        assert!(DEFAULT_SOLVENCY_THRESHOLD_BPS <= BPS_DENOMINATOR);
    }
}
