//! Fixtures shared by the unit tests

use alloy_primitives::{Address, U256};

use crate::{
    constants::scale,
    pool::{PoolAdapter, StableSwapPool},
    solvency::{Vault, VaultEffects},
    strategy::{settings::StrategySettings, AmoStrategy},
    utils::error::{arithmetic_err, AmoError, AmoResult},
};

/// 4 bps, `FEE_DENOMINATOR` scaled
const POOL_FEE: u64 = 4_000_000;

pub fn e18(value: u64) -> U256 {
    U256::from(value) * scale()
}

pub fn asset() -> Address {
    Address::repeat_byte(0xa1)
}

pub fn o_token() -> Address {
    Address::repeat_byte(0xa2)
}

pub fn platform() -> Address {
    Address::repeat_byte(0xa3)
}

pub fn vault_address() -> Address {
    Address::repeat_byte(0xb1)
}

pub fn governor() -> Address {
    Address::repeat_byte(0xb2)
}

pub fn strategist() -> Address {
    Address::repeat_byte(0xb3)
}

pub fn harvester() -> Address {
    Address::repeat_byte(0xb4)
}

pub fn settings() -> StrategySettings {
    let mut settings = StrategySettings::default();
    settings
        .vault(vault_address())
        .governor(governor())
        .strategist(strategist())
        .harvester(harvester())
        .asset(asset())
        .o_token(o_token())
        .platform(platform())
        .asset_decimals(18);
    settings
}

/// 18 decimals pool with the asset at index 0, seeded by an outside LP
pub fn seeded_pool(asset: u64, o_token: u64) -> StableSwapPool {
    seeded_pool_with_fee(asset, o_token, POOL_FEE)
}

/// `fee` is `FEE_DENOMINATOR` scaled
pub fn seeded_pool_with_fee(asset: u64, o_token: u64, fee: u64) -> StableSwapPool {
    let mut pool = StableSwapPool::new(18, 0, 100, fee).unwrap();
    pool.add_liquidity(e18(asset), e18(o_token), U256::ZERO)
        .unwrap();
    pool
}

/// In-memory Vault tracking what the strategy asked of it
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestVault {
    pub total_value: U256,
    pub o_token_supply: U256,
    pub minted: U256,
    pub burned: U256,
    pub received: U256,
}

impl TestVault {
    pub fn solvent() -> Self {
        Self {
            total_value: e18(1_000_000),
            o_token_supply: e18(900_000),
            ..Default::default()
        }
    }
}

impl Vault for TestVault {
    fn prepare_settlement(&self, effects: &VaultEffects) -> AmoResult<()> {
        if effects.burned > self.o_token_supply {
            return Err(AmoError::Config("Burn exceeds the supply".to_string()));
        }
        Ok(())
    }

    fn total_value(&self) -> U256 {
        self.total_value
    }

    fn o_token_total_supply(&self) -> U256 {
        self.o_token_supply
    }

    fn mint_for_strategy(&mut self, amount: U256) -> AmoResult<()> {
        self.o_token_supply += amount;
        self.total_value += amount;
        self.minted += amount;
        Ok(())
    }

    fn burn_for_strategy(&mut self, amount: U256) -> AmoResult<()> {
        self.o_token_supply = self
            .o_token_supply
            .checked_sub(amount)
            .ok_or_else(|| arithmetic_err("Burned more than the supply."))?;
        self.total_value = self.total_value.saturating_sub(amount);
        self.burned += amount;
        Ok(())
    }

    fn receive_asset(&mut self, amount: U256) -> AmoResult<()> {
        self.received += amount;
        Ok(())
    }
}

pub fn unapproved_strategy_with_pool(
    seed_asset: u64,
    seed_o_token: u64,
) -> AmoStrategy<StableSwapPool, TestVault> {
    AmoStrategy::new(
        settings(),
        seeded_pool(seed_asset, seed_o_token),
        TestVault::solvent(),
    )
    .unwrap()
}

/// Approved strategy holding `deposit` asset (and as many OTokens) in the pool
pub fn strategy_with_pool(
    seed_asset: u64,
    seed_o_token: u64,
    deposit: u64,
) -> AmoStrategy<StableSwapPool, TestVault> {
    let mut strategy = unapproved_strategy_with_pool(seed_asset, seed_o_token);
    strategy
        .as_governor(governor())
        .unwrap()
        .safe_approve_all_tokens()
        .unwrap();

    if deposit > 0 {
        strategy.receive_token(asset(), e18(deposit)).unwrap();
        strategy
            .as_vault(vault_address())
            .unwrap()
            .deposit(asset(), e18(deposit))
            .unwrap();
    }
    strategy
}
