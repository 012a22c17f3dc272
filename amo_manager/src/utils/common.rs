//! Common utility and helper functions that are used across the project

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use candid::Nat;
use num_bigint::BigUint;
use num_traits::ToPrimitive;

use crate::constants::{bps_denominator, BPS_DENOMINATOR, O_TOKEN_DECIMALS};

use super::error::*;

/// Converts String to Address and returns AmoError on failure
pub fn string_to_address(input: &str) -> AmoResult<Address> {
    Address::from_str(input).map_err(|err| AmoError::Config(format!("{:#?}", err)))
}

/// Converts String to U256 and returns AmoError on failure
pub fn string_to_u256(input: &str) -> AmoResult<U256> {
    U256::from_str(input).map_err(|err| AmoError::Config(format!("{:#?}", err)))
}

/// Converts values of type `Nat` to `U256`
pub fn nat_to_u256(n: &Nat) -> AmoResult<U256> {
    let be_bytes = n.0.to_bytes_be();
    if be_bytes.len() > 32 {
        return Err(AmoError::Config("The `Nat` input length exceedes 32 bytes when converted to big-endian bytes representation.".to_string()));
    }
    // Ensure the byte array is exactly 32 bytes long
    let mut padded_bytes = [0u8; 32];
    let start_pos = 32 - be_bytes.len();
    padded_bytes[start_pos..].copy_from_slice(&be_bytes);

    Ok(U256::from_be_bytes(padded_bytes))
}

/// Converts values of type `U256` to `Nat`
pub fn u256_to_nat(value: &U256) -> Nat {
    Nat(BigUint::from_bytes_be(&value.to_be_bytes::<32>()))
}

/// Converts a `Nat` basis point value to `u16`, rejecting anything above 100%
pub fn nat_to_bps(n: &Nat) -> AmoResult<u16> {
    n.0.to_u16()
        .filter(|bps| *bps <= BPS_DENOMINATOR)
        .ok_or_else(|| AmoError::Config(format!("{} is not a valid basis point value.", n)))
}

/// Returns `a * b / denominator`, rounding down
pub fn mul_div(a: U256, b: U256, denominator: U256) -> AmoResult<U256> {
    a.checked_mul(b)
        .ok_or_else(|| arithmetic_err("Multiplication overflowed."))?
        .checked_div(denominator)
        .ok_or_else(|| arithmetic_err("Division by zero."))
}

/// Returns `amount` reduced by `bps` basis points, rounding down
pub fn apply_deviation(amount: U256, bps: u16) -> AmoResult<U256> {
    let kept = BPS_DENOMINATOR
        .checked_sub(bps)
        .ok_or_else(|| arithmetic_err("Deviation exceeds 100%."))?;
    mul_div(amount, U256::from(kept), bps_denominator())
}

/// 10^exponent
pub fn ten_pow(exponent: u8) -> AmoResult<U256> {
    10_u128
        .checked_pow(exponent as u32)
        .map(U256::from)
        .ok_or_else(|| arithmetic_err("Decimals exponent overflowed."))
}

/// Scales an asset amount with `decimals` decimals to the 18 decimals of the OToken
pub fn scale_to_o_token(amount: U256, decimals: u8) -> AmoResult<U256> {
    let factor = ten_pow(O_TOKEN_DECIMALS.saturating_sub(decimals))?;
    amount
        .checked_mul(factor)
        .ok_or_else(|| arithmetic_err("Decimals normalization overflowed."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_string_to_address_valid() {
        let input = "0x0123456789abcdef0123456789abcdef01234567";
        let result = string_to_address(input);
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), Address::from_str(input).unwrap());
    }

    #[test]
    fn test_string_to_address_invalid() {
        let result = string_to_address("invalid_address");
        assert!(matches!(result, Err(AmoError::Config(_))));
    }

    #[test]
    fn test_nat_to_u256_valid() {
        let value = 1234567890_u64;
        let nat = Nat::from(value);
        assert_eq!(nat_to_u256(&nat).unwrap(), U256::from(value));
    }

    #[test]
    fn test_nat_to_u256_too_large() {
        let nat = Nat(BigUint::from_bytes_be(&[1u8; 33]));
        assert!(nat_to_u256(&nat).is_err());
    }

    #[test]
    fn test_nat_to_bps() {
        assert_eq!(nat_to_bps(&Nat::from(250_u64)).unwrap(), 250);
        assert!(nat_to_bps(&Nat::from(10_001_u64)).is_err());
    }

    #[test]
    fn test_apply_deviation() {
        let amount = U256::from(1_000_000_u64);
        assert_eq!(apply_deviation(amount, 100).unwrap(), U256::from(990_000_u64));
        assert_eq!(apply_deviation(amount, 0).unwrap(), amount);
        assert_eq!(apply_deviation(amount, 10_000).unwrap(), U256::ZERO);
        assert!(apply_deviation(amount, 10_001).is_err());
    }

    #[test]
    fn test_decimal_scaling() {
        let usdc = U256::from(1_500_000_u64); // 1.5 with 6 decimals
        let scaled = scale_to_o_token(usdc, 6).unwrap();
        assert_eq!(scaled, U256::from(1_500_000_000_000_000_000_u128));
        assert_eq!(scale_to_o_token(usdc, 18).unwrap(), usdc);
    }

    #[test]
    fn test_mul_div_by_zero() {
        assert!(mul_div(U256::from(1_u64), U256::from(1_u64), U256::ZERO).is_err());
    }

    proptest! {
        #[test]
        fn test_u256_nat_conversion(value in any::<u128>()) {
            let original = U256::from(value);
            let nat = u256_to_nat(&original);
            prop_assert_eq!(nat_to_u256(&nat).unwrap(), original);
        }
    }
}
