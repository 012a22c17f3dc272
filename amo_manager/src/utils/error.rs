use std::fmt;

use candid::CandidType;
use serde::{Deserialize, Serialize};

use crate::pool::PoolError;

/// AMO Strategy Result
pub type AmoResult<T> = Result<T, AmoError>;

/// AMO Strategy Errors
///
/// Every variant aborts the whole operation. Nothing is committed when one is returned.
#[derive(Clone, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum AmoError {
    /// Deposit/withdraw called by someone other than the Vault
    CallerNotVault,
    /// Peg operation called by someone other than the Strategist or Governor
    CallerNotStrategist,
    /// Configuration change called by someone other than the Governor
    CallerNotGovernor,
    /// Zero amount deposit
    MustDepositSomething,
    /// Zero amount withdrawal
    MustWithdrawSomething,
    /// Peg operation amount is under the governance dust threshold
    BelowMinimumCorrection,
    /// The strategy does not hold enough of the backing asset
    InsufficientAssetBalance,
    /// The strategy does not hold enough LP units for the requested removal
    InsufficientLpTokens,
    /// The pool returned less of the backing asset than requested
    NotEnoughAssetRemoved,
    /// The strategy does not hold enough of a rescued token
    InsufficientTokenBalance,
    /// Post-operation solvency check failed
    ProtocolInsolvent,
    /// Pool was tilted towards OTokens and the operation did not reduce the tilt
    OTokensBalanceWorse,
    /// Pool was tilted towards OTokens and the operation tilted it past the peg
    OTokensOvershotPeg,
    /// Pool was tilted towards the asset and the operation did not reduce the tilt
    AssetsBalanceWorse,
    /// Pool was tilted towards the asset and the operation tilted it past the peg
    AssetsOvershotPeg,
    /// Actual amounts deviated from the expected ones beyond the configured bounds
    Slippage,
    /// The asset is not tracked by the strategy
    UnsupportedAsset,
    /// Governance tried to rescue one of the tracked tokens
    CannotTransferSupportedAsset,
    /// A call arrived while another pool interaction was in flight
    Reentrancy,
    /// The pool has not been approved to pull the token
    InsufficientAllowance,
    /// Error surfaced by the pool adapter
    Pool(PoolError),
    /// Arithmetic error
    Arithmetic(String),
    /// Invalid configuration
    Config(String),
}

impl fmt::Display for AmoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmoError::CallerNotVault => write!(f, "Caller is not the Vault"),
            AmoError::CallerNotStrategist => write!(f, "Caller is not the Strategist or Governor"),
            AmoError::CallerNotGovernor => write!(f, "Caller is not the Governor"),
            AmoError::MustDepositSomething => write!(f, "Must deposit something"),
            AmoError::MustWithdrawSomething => write!(f, "Must withdraw something"),
            AmoError::BelowMinimumCorrection => write!(f, "Amount below minimum correction"),
            AmoError::InsufficientAssetBalance => write!(f, "Insufficient asset balance"),
            AmoError::InsufficientLpTokens => write!(f, "Insufficient LP tokens"),
            AmoError::NotEnoughAssetRemoved => write!(f, "Not enough asset removed from pool"),
            AmoError::InsufficientTokenBalance => write!(f, "Insufficient token balance"),
            AmoError::ProtocolInsolvent => write!(f, "Protocol insolvent"),
            AmoError::OTokensBalanceWorse => write!(f, "OTokens balance worse"),
            AmoError::OTokensOvershotPeg => write!(f, "OTokens overshot peg"),
            AmoError::AssetsBalanceWorse => write!(f, "Assets balance worse"),
            AmoError::AssetsOvershotPeg => write!(f, "Assets overshot peg"),
            AmoError::Slippage => write!(f, "Slippage ruined your day"),
            AmoError::UnsupportedAsset => write!(f, "Unsupported asset"),
            AmoError::CannotTransferSupportedAsset => write!(f, "Cannot transfer supported asset"),
            AmoError::Reentrancy => write!(f, "Reentrant call"),
            AmoError::InsufficientAllowance => write!(f, "Insufficient allowance"),
            AmoError::Pool(err) => write!(f, "Pool error: {}", err),
            AmoError::Arithmetic(msg) => write!(f, "Arithmetic error: {}", msg),
            AmoError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for AmoError {}

/// Min-out violations reported by the pool are slippage failures of the operation.
impl From<PoolError> for AmoError {
    fn from(value: PoolError) -> Self {
        match value {
            PoolError::SlippageExceeded => AmoError::Slippage,
            PoolError::Locked => AmoError::Reentrancy,
            other => AmoError::Pool(other),
        }
    }
}

pub fn arithmetic_err<S: AsRef<str>>(s: S) -> AmoError {
    AmoError::Arithmetic(s.as_ref().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_reasons_match_display() {
        assert_eq!(AmoError::OTokensBalanceWorse.to_string(), "OTokens balance worse");
        assert_eq!(AmoError::OTokensOvershotPeg.to_string(), "OTokens overshot peg");
        assert_eq!(AmoError::AssetsBalanceWorse.to_string(), "Assets balance worse");
        assert_eq!(AmoError::AssetsOvershotPeg.to_string(), "Assets overshot peg");
        assert_eq!(AmoError::Slippage.to_string(), "Slippage ruined your day");
        assert_eq!(AmoError::ProtocolInsolvent.to_string(), "Protocol insolvent");
    }

    #[test]
    fn pool_slippage_maps_to_slippage() {
        assert_eq!(AmoError::from(PoolError::SlippageExceeded), AmoError::Slippage);
        assert_eq!(AmoError::from(PoolError::Locked), AmoError::Reentrancy);
        assert_eq!(
            AmoError::from(PoolError::DidNotConverge),
            AmoError::Pool(PoolError::DidNotConverge)
        );
    }
}
