//! Utility and helper functions needed for:
//! - Error handling
//! - Checked fixed point and basis point arithmetic
//! - Type casting between `U256`, `Nat`, and strings

pub mod common;
pub mod error;
