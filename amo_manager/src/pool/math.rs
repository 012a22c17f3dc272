//! Integer stable-swap invariant math for a two-coin pool.
//!
//! Amounts are "xp" values: balances multiplied by their precision multiplier so both coins
//! are expressed with 18 decimals. `amp` is `A * A_PRECISION`.
//!
//! ```plain
//! A·n^n·Σx + D = A·D·n^n + D^(n+1) / (n^n·Πx)
//! ```
//!
//! Both solvers iterate Newton's method until two consecutive values are within 1 unit.

use alloy_primitives::U256;

use super::{PoolError, PoolResult};

pub const N_COINS: usize = 2;
pub const A_PRECISION: u64 = 100;
pub const FEE_DENOMINATOR: u64 = 10_000_000_000;
pub const PRECISION: u128 = 1_000_000_000_000_000_000;
const MAX_ITERATIONS: usize = 255;

pub(crate) fn add(a: U256, b: U256) -> PoolResult<U256> {
    a.checked_add(b)
        .ok_or_else(|| PoolError::Arithmetic("Addition overflowed.".to_string()))
}

pub(crate) fn sub(a: U256, b: U256) -> PoolResult<U256> {
    a.checked_sub(b)
        .ok_or_else(|| PoolError::Arithmetic("Subtraction underflowed.".to_string()))
}

pub(crate) fn mul(a: U256, b: U256) -> PoolResult<U256> {
    a.checked_mul(b)
        .ok_or_else(|| PoolError::Arithmetic("Multiplication overflowed.".to_string()))
}

pub(crate) fn div(a: U256, b: U256) -> PoolResult<U256> {
    a.checked_div(b)
        .ok_or_else(|| PoolError::Arithmetic("Division by zero.".to_string()))
}

pub(crate) fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

fn converged(current: U256, previous: U256) -> bool {
    abs_diff(current, previous) <= U256::from(1_u64)
}

/// Computes the invariant `D` for the given normalized balances.
pub fn get_d(xp: &[U256; N_COINS], amp: U256) -> PoolResult<U256> {
    let s = add(xp[0], xp[1])?;
    if s.is_zero() {
        return Ok(U256::ZERO);
    }

    let n = U256::from(N_COINS as u64);
    let n_pow_n = U256::from((N_COINS * N_COINS) as u64);
    let a_precision = U256::from(A_PRECISION);
    let ann = mul(amp, n)?;

    let mut d = s;
    for _ in 0..MAX_ITERATIONS {
        let mut d_p = d;
        for x in xp.iter() {
            d_p = div(mul(d_p, d)?, *x)?;
        }
        d_p = div(d_p, n_pow_n)?;

        let d_prev = d;
        let numerator = mul(add(div(mul(ann, s)?, a_precision)?, mul(d_p, n)?)?, d)?;
        let denominator = add(
            div(mul(sub(ann, a_precision)?, d)?, a_precision)?,
            mul(add(n, U256::from(1_u64))?, d_p)?,
        )?;
        d = div(numerator, denominator)?;

        if converged(d, d_prev) {
            return Ok(d);
        }
    }

    Err(PoolError::DidNotConverge)
}

/// Solves for the balance of coin `target` such that the invariant equals `d`,
/// holding every other coin of `xp` fixed. `xp[target]` is ignored.
pub fn get_y(amp: U256, target: usize, xp: &[U256; N_COINS], d: U256) -> PoolResult<U256> {
    if target >= N_COINS {
        return Err(PoolError::InvalidCoin);
    }

    let n = U256::from(N_COINS as u64);
    let a_precision = U256::from(A_PRECISION);
    let ann = mul(amp, n)?;

    let mut c = d;
    let mut s = U256::ZERO;
    for (index, x) in xp.iter().enumerate() {
        if index == target {
            continue;
        }
        s = add(s, *x)?;
        c = div(mul(c, d)?, mul(*x, n)?)?;
    }
    c = div(mul(mul(c, d)?, a_precision)?, mul(ann, n)?)?;
    let b = add(s, div(mul(d, a_precision)?, ann)?)?;

    let mut y = d;
    for _ in 0..MAX_ITERATIONS {
        let y_prev = y;
        let numerator = add(mul(y, y)?, c)?;
        let denominator = sub(add(mul(U256::from(2_u64), y)?, b)?, d)?;
        y = div(numerator, denominator)?;

        if converged(y, y_prev) {
            return Ok(y);
        }
    }

    Err(PoolError::DidNotConverge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn e18(value: u64) -> U256 {
        U256::from(value) * U256::from(PRECISION)
    }

    fn amp(a: u64) -> U256 {
        U256::from(a * A_PRECISION)
    }

    #[test]
    fn balanced_invariant_is_the_sum() {
        let xp = [e18(1_000), e18(1_000)];
        assert_eq!(get_d(&xp, amp(100)).unwrap(), e18(2_000));
    }

    #[test]
    fn empty_pool_has_zero_invariant() {
        assert_eq!(get_d(&[U256::ZERO, U256::ZERO], amp(100)).unwrap(), U256::ZERO);
    }

    #[test]
    fn one_sided_pool_cannot_be_solved() {
        assert!(get_d(&[e18(1_000), U256::ZERO], amp(100)).is_err());
    }

    #[test]
    fn imbalanced_invariant_is_below_the_sum() {
        let xp = [e18(1_000), e18(1_200)];
        let d = get_d(&xp, amp(100)).unwrap();
        assert!(d < e18(2_200));
        assert!(d > e18(2_199));
    }

    #[test]
    fn get_y_recovers_the_balance() {
        let xp = [e18(1_000), e18(1_200)];
        let d = get_d(&xp, amp(100)).unwrap();
        let y = get_y(amp(100), 1, &xp, d).unwrap();
        assert!(abs_diff(y, xp[1]) <= U256::from(1_000_u64));
    }

    #[test]
    fn get_y_rejects_unknown_coin() {
        let xp = [e18(1), e18(1)];
        assert_eq!(get_y(amp(100), 2, &xp, e18(2)), Err(PoolError::InvalidCoin));
    }

    proptest! {
        #[test]
        fn invariant_never_exceeds_the_sum(a in 1_000u64..1_000_000, b in 1_000u64..1_000_000, a_param in 1u64..5_000) {
            let xp = [e18(a), e18(b)];
            let d = get_d(&xp, amp(a_param)).unwrap();
            prop_assert!(d <= xp[0] + xp[1] + U256::from(1_u64));
        }
    }
}
