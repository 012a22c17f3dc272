use std::fmt;

use alloy_primitives::{Address, U256};
use alloy_sol_types::{sol, SolEvent};
use candid::{CandidType, Nat};
use serde::{Deserialize, Serialize};

use crate::{solvency::VaultEffects, utils::common::u256_to_nat};

/// The engine operation a journal entry or receipt belongs to
#[derive(Clone, Copy, CandidType, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    DepositAll,
    Withdraw,
    WithdrawAll,
    MintAndAddOTokens,
    RemoveAndBurnOTokens,
    RemoveOnlyAssets,
    Governance,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Deposit => "deposit",
            Operation::DepositAll => "deposit_all",
            Operation::Withdraw => "withdraw",
            Operation::WithdrawAll => "withdraw_all",
            Operation::MintAndAddOTokens => "mint_and_add_o_tokens",
            Operation::RemoveAndBurnOTokens => "remove_and_burn_o_tokens",
            Operation::RemoveOnlyAssets => "remove_only_assets",
            Operation::Governance => "governance",
        };
        write!(f, "{}", name)
    }
}

/// Events emitted by the strategy, in emission order
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub enum StrategyEvent {
    Deposit {
        asset: Address,
        p_token: Address,
        amount: U256,
    },
    Withdrawal {
        asset: Address,
        p_token: Address,
        amount: U256,
    },
    MaxDepositDeviationUpdated {
        previous_bps: u16,
        new_bps: u16,
    },
    MaxWithdrawalDeviationUpdated {
        previous_bps: u16,
        new_bps: u16,
    },
    StrategistUpdated {
        strategist: Address,
    },
    HarvesterAddressesUpdated {
        previous: Address,
        new: Address,
    },
}

impl StrategyEvent {
    /// Solidity signature of the event
    pub fn signature(&self) -> &'static str {
        match self {
            StrategyEvent::Deposit { .. } => Deposit::SIGNATURE,
            StrategyEvent::Withdrawal { .. } => Withdrawal::SIGNATURE,
            StrategyEvent::MaxDepositDeviationUpdated { .. } => MaxDepositDeviationUpdated::SIGNATURE,
            StrategyEvent::MaxWithdrawalDeviationUpdated { .. } => {
                MaxWithdrawalDeviationUpdated::SIGNATURE
            }
            StrategyEvent::StrategistUpdated { .. } => StrategistUpdated::SIGNATURE,
            StrategyEvent::HarvesterAddressesUpdated { .. } => HarvesterAddressesUpdated::SIGNATURE,
        }
    }

    /// Hex encoded ABI data of the non-indexed fields
    pub fn abi_data(&self) -> String {
        let data = match self {
            StrategyEvent::Deposit {
                asset,
                p_token,
                amount,
            } => Deposit {
                _asset: *asset,
                _pToken: *p_token,
                _amount: *amount,
            }
            .encode_data(),
            StrategyEvent::Withdrawal {
                asset,
                p_token,
                amount,
            } => Withdrawal {
                _asset: *asset,
                _pToken: *p_token,
                _amount: *amount,
            }
            .encode_data(),
            StrategyEvent::MaxDepositDeviationUpdated {
                previous_bps,
                new_bps,
            } => MaxDepositDeviationUpdated {
                _prevMaxDeviationPercentage: U256::from(*previous_bps),
                _newMaxDeviationPercentage: U256::from(*new_bps),
            }
            .encode_data(),
            StrategyEvent::MaxWithdrawalDeviationUpdated {
                previous_bps,
                new_bps,
            } => MaxWithdrawalDeviationUpdated {
                _prevMaxDeviationPercentage: U256::from(*previous_bps),
                _newMaxDeviationPercentage: U256::from(*new_bps),
            }
            .encode_data(),
            StrategyEvent::StrategistUpdated { strategist } => StrategistUpdated {
                _address: *strategist,
            }
            .encode_data(),
            StrategyEvent::HarvesterAddressesUpdated { previous, new } => {
                HarvesterAddressesUpdated {
                    _oldHarvesterAddress: *previous,
                    _newHarvesterAddress: *new,
                }
                .encode_data()
            }
        };
        hex::encode(data)
    }
}

/// Outcome of a committed engine operation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OperationReceipt {
    pub lp_minted: U256,
    pub lp_burned: U256,
    /// OTokens minted by the Vault for this operation
    pub o_tokens_minted: U256,
    /// OTokens burned by the Vault for this operation
    pub o_tokens_burned: U256,
    /// Backing asset returned to the Vault
    pub asset_to_vault: U256,
    /// Backing asset forwarded to recipients other than the Vault
    pub transfers: Vec<(Address, U256)>,
    pub events: Vec<StrategyEvent>,
}

impl OperationReceipt {
    /// Receipt of an operation that had nothing to do
    pub fn noop() -> Self {
        Self::default()
    }

    /// What the Vault has to apply for this receipt
    pub fn vault_effects(&self) -> VaultEffects {
        VaultEffects {
            minted: self.o_tokens_minted,
            burned: self.o_tokens_burned,
            asset_returned: self.asset_to_vault,
        }
    }
}

/// Candid view of the strategy's position
#[derive(Clone, CandidType, Debug, Default, Deserialize, PartialEq)]
pub struct PositionQuery {
    pub lp_units: Nat,
    pub idle_asset: Nat,
    /// Idle asset plus the asset share of the pool, asset decimals
    pub asset_balance: Nat,
    pub o_token_balance: Nat,
    /// Total position value in 18 decimals
    pub position_value: Nat,
}

impl PositionQuery {
    pub fn new(
        lp_units: U256,
        idle_asset: U256,
        asset_balance: U256,
        o_token_balance: U256,
        position_value: U256,
    ) -> Self {
        Self {
            lp_units: u256_to_nat(&lp_units),
            idle_asset: u256_to_nat(&idle_asset),
            asset_balance: u256_to_nat(&asset_balance),
            o_token_balance: u256_to_nat(&o_token_balance),
            position_value: u256_to_nat(&position_value),
        }
    }
}

sol!(
    // Strategy events
    event Deposit(address indexed _asset, address _pToken, uint256 _amount);
    event Withdrawal(address indexed _asset, address _pToken, uint256 _amount);

    // Governance events
    event MaxDepositDeviationUpdated(uint256 _prevMaxDeviationPercentage, uint256 _newMaxDeviationPercentage);
    event MaxWithdrawalDeviationUpdated(uint256 _prevMaxDeviationPercentage, uint256 _newMaxDeviationPercentage);
    event StrategistUpdated(address _address);
    event HarvesterAddressesUpdated(address _oldHarvesterAddress, address _newHarvesterAddress);
);
