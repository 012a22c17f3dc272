//! The AMO strategy engine.
//!
//! Every operation runs the same pipeline:
//!
//! ```plain
//! guard ─► read pool + vault ─► operation body on a PendingTransaction
//!       ─► tilt / deviation checks (inside the body)
//!       ─► solvency projection ─► commit (vault, pool, position, events)
//! ```
//!
//! Any error before the commit leaves the strategy, the pool, and the Vault untouched.

use alloy_primitives::{Address, U256};

use crate::{
    constants::MAX_JOURNAL_COLLECTIONS,
    journal::{prune_journal, JournalCollection, LogType},
    pool::{Coin, PoolAdapter, PoolState},
    solvency::{SolvencyDelta, SolvencyOracle, SolvencySnapshot, Vault, VaultEffects},
    types::{Operation, OperationReceipt, PositionQuery, StrategyEvent},
    utils::{
        common::{mul_div, scale_to_o_token},
        error::{arithmetic_err, AmoError, AmoResult},
    },
};

use super::{
    accounting::{asset_balance, position_value, PositionShares},
    data::{Allowances, StrategyData, StrategyPosition},
    gate::DeviationGate,
    lock::ReentrancyGuard,
    settings::{OperationThresholds, StrategySettings, StrategySettingsQuery},
    tilt::TiltGuard,
    transaction::PendingTransaction,
};

pub struct AmoStrategy<P, V> {
    /// Deployment settings, roles and thresholds
    settings: StrategySettings,
    /// Mutable state
    data: StrategyData,
    /// The external pool
    pool: P,
    vault: V,
    /// Held from the first pool read of an operation until it returns
    pub(crate) guard: ReentrancyGuard,
    /// Events of every committed operation
    events: Vec<StrategyEvent>,
    journal: Vec<JournalCollection>,
}

impl<P: PoolAdapter + Clone, V: Vault> AmoStrategy<P, V> {
    pub fn new(settings: StrategySettings, pool: P, vault: V) -> AmoResult<Self> {
        settings.validate()?;
        Ok(Self {
            settings,
            data: StrategyData::default(),
            pool,
            vault,
            guard: ReentrancyGuard::default(),
            events: vec![],
            journal: vec![],
        })
    }

    pub fn settings(&self) -> &StrategySettings {
        &self.settings
    }

    pub fn settings_query(&self) -> StrategySettingsQuery {
        StrategySettingsQuery::from(&self.settings)
    }

    pub fn data(&self) -> &StrategyData {
        &self.data
    }

    pub fn position(&self) -> &StrategyPosition {
        &self.data.position
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    /// The pool is shared with every other market participant
    pub fn pool_mut(&mut self) -> &mut P {
        &mut self.pool
    }

    pub fn vault(&self) -> &V {
        &self.vault
    }

    pub fn vault_mut(&mut self) -> &mut V {
        &mut self.vault
    }

    pub fn events(&self) -> &[StrategyEvent] {
        &self.events
    }

    pub fn journal(&self) -> &[JournalCollection] {
        &self.journal
    }

    /// Credits tokens sent to the strategy. The Vault pushes the backing asset this way before
    /// calling `deposit`.
    pub fn receive_token(&mut self, token: Address, amount: U256) -> AmoResult<()> {
        if token == self.settings.asset {
            self.data.position.idle_asset = self
                .data
                .position
                .idle_asset
                .checked_add(amount)
                .ok_or_else(|| arithmetic_err("Idle asset balance overflowed."))?;
            return Ok(());
        }
        self.data.credit_stray(token, amount).map(|_| ())
    }

    fn read_pool_state(&self) -> AmoResult<PoolState> {
        self.guard.assert_vacant()?;
        self.pool.assert_not_locked()?;
        PoolState::read(&self.pool, self.settings.asset_decimals)
    }

    /// Balance of `asset` held by the strategy, idle or in the pool.
    ///
    /// Refuses to run while an operation or a pool interaction is in flight, as the pool's
    /// reserves are not settled then.
    pub fn check_balance(&self, asset: Address) -> AmoResult<U256> {
        let state = self.read_pool_state()?;
        let shares = PositionShares::of(&self.data.position, &state)?;

        if asset == self.settings.asset {
            asset_balance(&self.data.position, &shares)
        } else if asset == self.settings.o_token {
            Ok(shares.o_token)
        } else {
            Err(AmoError::UnsupportedAsset)
        }
    }

    /// Value of everything the strategy holds, 18 decimals
    pub fn position_value(&self) -> AmoResult<U256> {
        let state = self.read_pool_state()?;
        position_value(&self.data.position, &state, self.settings.asset_decimals)
    }

    pub fn position_query(&self) -> AmoResult<PositionQuery> {
        let state = self.read_pool_state()?;
        let position = &self.data.position;
        let shares = PositionShares::of(position, &state)?;

        Ok(PositionQuery::new(
            position.lp_units,
            position.idle_asset,
            asset_balance(position, &shares)?,
            shares.o_token,
            position_value(position, &state, self.settings.asset_decimals)?,
        ))
    }

    pub fn solvency_snapshot(&self) -> AmoResult<SolvencySnapshot> {
        let state = self.read_pool_state()?;
        let shares = PositionShares::of(&self.data.position, &state)?;
        Ok(SolvencySnapshot::capture(&self.vault, shares.o_token))
    }

    pub fn is_solvent(&self) -> AmoResult<bool> {
        SolvencyOracle::new(self.settings.thresholds.solvency_threshold_bps)
            .is_solvent(&self.solvency_snapshot()?)
    }

    fn record(&mut self, journal: JournalCollection) {
        self.journal.push(journal);
        prune_journal(&mut self.journal, MAX_JOURNAL_COLLECTIONS);
    }

    /// Runs an engine operation under the guard and journals its outcome
    fn run<F>(&mut self, operation: Operation, body: F) -> AmoResult<OperationReceipt>
    where
        F: FnOnce(
            &Self,
            &PoolState,
            &mut PendingTransaction<P>,
            &mut JournalCollection,
        ) -> AmoResult<()>,
    {
        let mut journal = JournalCollection::open(Some(operation));

        let result = match self.guard.enter() {
            Ok(_token) => self.execute(body, &mut journal),
            Err(err) => Err(err),
        };

        journal.close(result.as_ref().map(|_| ()));
        self.record(journal);
        result
    }

    fn execute<F>(
        &mut self,
        body: F,
        journal: &mut JournalCollection,
    ) -> AmoResult<OperationReceipt>
    where
        F: FnOnce(
            &Self,
            &PoolState,
            &mut PendingTransaction<P>,
            &mut JournalCollection,
        ) -> AmoResult<()>,
    {
        self.pool.assert_not_locked()?;

        let decimals = self.settings.asset_decimals;
        let state_before = PoolState::read(&self.pool, decimals)?;
        let shares_before = PositionShares::of(&self.data.position, &state_before)?;
        let value_before = position_value(&self.data.position, &state_before, decimals)?;
        let snapshot = SolvencySnapshot::capture(&self.vault, shares_before.o_token);

        journal.append_note(
            Ok(()),
            LogType::Info,
            format!(
                "Pool reserves {} asset / {} oToken, tilt {}, {} LP units held.",
                state_before.asset_reserve,
                state_before.o_token_reserve,
                state_before.tilt(),
                self.data.position.lp_units
            ),
        );

        let mut tx = PendingTransaction::begin(&self.pool, &self.data);
        body(self, &state_before, &mut tx, &mut *journal)?;

        if tx.receipt == OperationReceipt::noop() {
            journal.append_note(Ok(()), LogType::Info, "Nothing to do.");
            return Ok(tx.receipt);
        }

        let state_after = PoolState::read(&tx.pool, decimals)?;
        let shares_after = PositionShares::of(&tx.position, &state_after)?;
        let delta = SolvencyDelta {
            position_value_before: value_before,
            position_value_after: position_value(&tx.position, &state_after, decimals)?,
            o_tokens_in_pool_after: shares_after.o_token,
            minted: tx.receipt.o_tokens_minted,
            burned: tx.receipt.o_tokens_burned,
            returned_to_vault: scale_to_o_token(tx.receipt.asset_to_vault, decimals)?,
        };
        let projected = snapshot.project(&delta)?;

        journal.append_note(
            Ok(()),
            LogType::Info,
            format!(
                "Projected adjusted value {} against adjusted supply {}.",
                projected.adjusted_value(),
                projected.adjusted_supply()
            ),
        );
        SolvencyOracle::new(self.settings.thresholds.solvency_threshold_bps)
            .assert_solvent(&projected)?;

        self.commit(tx, journal)
    }

    /// Settles the Vault effects first, then swaps in the working copies
    fn commit(
        &mut self,
        tx: PendingTransaction<P>,
        journal: &mut JournalCollection,
    ) -> AmoResult<OperationReceipt> {
        let PendingTransaction {
            pool,
            position,
            allowances,
            receipt,
        } = tx;

        let effects = receipt.vault_effects();
        self.vault.prepare_settlement(&effects)?;
        self.settle(&effects, journal)?;

        self.pool = pool;
        self.data.position(position).allowances(allowances);

        for event in receipt.events.iter() {
            journal.append_event(event);
        }
        self.events.extend(receipt.events.iter().cloned());

        Ok(receipt)
    }

    /// Applies the Vault legs in order: mint, burn, then the asset return. A failing leg
    /// unwinds the supply legs already applied, so the Vault ends where it started.
    fn settle(&mut self, effects: &VaultEffects, journal: &mut JournalCollection) -> AmoResult<()> {
        let mut applied = VaultEffects::default();

        if !effects.minted.is_zero() {
            self.vault.mint_for_strategy(effects.minted)?;
            applied.minted = effects.minted;
        }
        if !effects.burned.is_zero() {
            if let Err(err) = self.vault.burn_for_strategy(effects.burned) {
                self.unwind(&applied, journal);
                return Err(err);
            }
            applied.burned = effects.burned;
        }
        if !effects.asset_returned.is_zero() {
            if let Err(err) = self.vault.receive_asset(effects.asset_returned) {
                self.unwind(&applied, journal);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Reverses applied supply legs, newest first
    fn unwind(&mut self, applied: &VaultEffects, journal: &mut JournalCollection) {
        if !applied.burned.is_zero() {
            let restored = self.vault.mint_for_strategy(applied.burned);
            journal.append_note(
                restored,
                LogType::ExecutionResult,
                format!("Re-minted {} burned oToken.", applied.burned),
            );
        }
        if !applied.minted.is_zero() {
            let restored = self.vault.burn_for_strategy(applied.minted);
            journal.append_note(
                restored,
                LogType::ExecutionResult,
                format!("Burned back {} minted oToken.", applied.minted),
            );
        }
    }

    fn deviation_gate(&self) -> DeviationGate {
        DeviationGate::from(&self.settings.thresholds)
    }

    fn check_tilt(
        &self,
        before: &PoolState,
        tx: &PendingTransaction<P>,
        journal: &mut JournalCollection,
    ) -> AmoResult<()> {
        let after = PoolState::read(&tx.pool, self.settings.asset_decimals)?;
        journal.append_note(
            Ok(()),
            LogType::PegCorrection,
            format!("Tilt moved from {} to {}.", before.tilt(), after.tilt()),
        );
        TiltGuard::new(self.settings.thresholds.max_peg_overshoot).check(before.tilt(), after.tilt())
    }

    /// `amount` is 18 decimals
    fn check_peg_amount(&self, amount: U256) -> AmoResult<()> {
        if amount.is_zero() || amount < self.settings.thresholds.min_peg_correction {
            return Err(AmoError::BelowMinimumCorrection);
        }
        Ok(())
    }

    /// Adds `amount` of idle asset together with an equal nominal amount of freshly minted
    /// OTokens.
    fn add_to_pool(
        &self,
        state: &PoolState,
        tx: &mut PendingTransaction<P>,
        journal: &mut JournalCollection,
        amount: U256,
    ) -> AmoResult<()> {
        if amount.is_zero() {
            return Err(AmoError::MustDepositSomething);
        }
        if amount > tx.position.idle_asset {
            return Err(AmoError::InsufficientAssetBalance);
        }

        let o_token_amount = scale_to_o_token(amount, self.settings.asset_decimals)?;
        let value = o_token_amount
            .checked_mul(U256::from(2_u64))
            .ok_or_else(|| arithmetic_err("Deposit value overflowed."))?;
        let gate = self.deviation_gate();
        let min_lp = gate.min_lp_out(value, state.invariant_price)?;

        tx.mint(o_token_amount)?;
        let lp = tx.add_liquidity(amount, o_token_amount, min_lp)?;
        gate.check_deposit(lp, min_lp)?;

        journal.append_note(
            Ok(()),
            LogType::Info,
            format!(
                "Added {} asset and {} oToken for {} LP units (min {}).",
                amount, o_token_amount, lp, min_lp
            ),
        );

        tx.emit(StrategyEvent::Deposit {
            asset: self.settings.asset,
            p_token: self.settings.platform,
            amount,
        });
        tx.emit(StrategyEvent::Deposit {
            asset: self.settings.o_token,
            p_token: self.settings.platform,
            amount: o_token_amount,
        });
        Ok(())
    }

    pub(super) fn deposit(&mut self, asset: Address, amount: U256) -> AmoResult<OperationReceipt> {
        self.run(Operation::Deposit, |strategy, state, tx, journal| {
            if asset != strategy.settings.asset {
                return Err(AmoError::UnsupportedAsset);
            }
            strategy.add_to_pool(state, tx, journal, amount)
        })
    }

    pub(super) fn deposit_all(&mut self) -> AmoResult<OperationReceipt> {
        self.run(Operation::DepositAll, |strategy, state, tx, journal| {
            let amount = tx.position.idle_asset;
            if amount.is_zero() {
                return Ok(());
            }
            strategy.add_to_pool(state, tx, journal, amount)
        })
    }

    /// Removes both legs for at least `amount` of the asset, burns the OToken leg and forwards
    /// exactly `amount` to `recipient`. Rounding leftovers stay idle.
    pub(super) fn withdraw(
        &mut self,
        recipient: Address,
        asset: Address,
        amount: U256,
    ) -> AmoResult<OperationReceipt> {
        self.run(Operation::Withdraw, |strategy, state, tx, journal| {
            if asset != strategy.settings.asset {
                return Err(AmoError::UnsupportedAsset);
            }
            if amount.is_zero() {
                return Err(AmoError::MustWithdrawSomething);
            }

            let lp = mul_div(amount, state.total_lp_supply, state.asset_reserve)
                .map_err(|_| AmoError::InsufficientLpTokens)?
                .checked_add(U256::from(1_u64))
                .ok_or_else(|| arithmetic_err("LP amount overflowed."))?;
            if lp > tx.position.lp_units {
                return Err(AmoError::InsufficientLpTokens);
            }

            let gate = strategy.deviation_gate();
            let expected_o_token = mul_div(state.o_token_reserve, lp, state.total_lp_supply)?;
            let (asset_out, o_token_out) = tx.remove_liquidity(
                lp,
                gate.min_withdrawal_out(amount)?,
                gate.min_withdrawal_out(expected_o_token)?,
            )?;
            if asset_out < amount {
                return Err(AmoError::NotEnoughAssetRemoved);
            }

            tx.burn(o_token_out)?;
            tx.send_asset(strategy.settings.vault, recipient, amount)?;

            journal.append_note(
                Ok(()),
                LogType::Info,
                format!(
                    "Burned {} LP units for {} asset and {} oToken. Sent {} asset to {}.",
                    lp, asset_out, o_token_out, amount, recipient
                ),
            );

            tx.emit(StrategyEvent::Withdrawal {
                asset: strategy.settings.asset,
                p_token: strategy.settings.platform,
                amount,
            });
            tx.emit(StrategyEvent::Withdrawal {
                asset: strategy.settings.o_token,
                p_token: strategy.settings.platform,
                amount: o_token_out,
            });
            Ok(())
        })
    }

    /// Removes the whole position to the Vault. A no-op on an empty position.
    pub(super) fn withdraw_all(&mut self) -> AmoResult<OperationReceipt> {
        self.run(Operation::WithdrawAll, |strategy, state, tx, journal| {
            let lp = tx.position.lp_units;
            let mut o_token_out = U256::ZERO;

            if !lp.is_zero() {
                let gate = strategy.deviation_gate();
                let shares = PositionShares::of(&tx.position, state)?;
                let (asset_out, o_token_removed) = tx.remove_liquidity(
                    lp,
                    gate.min_withdrawal_out(shares.asset)?,
                    gate.min_withdrawal_out(shares.o_token)?,
                )?;
                o_token_out = o_token_removed;
                tx.burn(o_token_out)?;

                journal.append_note(
                    Ok(()),
                    LogType::Info,
                    format!(
                        "Burned all {} LP units for {} asset and {} oToken.",
                        lp, asset_out, o_token_out
                    ),
                );
            }

            let asset_out = tx.position.idle_asset;
            if !asset_out.is_zero() {
                let vault = strategy.settings.vault;
                tx.send_asset(vault, vault, asset_out)?;
                tx.emit(StrategyEvent::Withdrawal {
                    asset: strategy.settings.asset,
                    p_token: strategy.settings.platform,
                    amount: asset_out,
                });
            }
            if !lp.is_zero() {
                tx.emit(StrategyEvent::Withdrawal {
                    asset: strategy.settings.o_token,
                    p_token: strategy.settings.platform,
                    amount: o_token_out,
                });
            }
            Ok(())
        })
    }

    /// Mints `amount` OTokens and adds them to the pool single-sided
    pub(super) fn mint_and_add_o_tokens(&mut self, amount: U256) -> AmoResult<OperationReceipt> {
        self.run(Operation::MintAndAddOTokens, |strategy, state, tx, journal| {
            strategy.check_peg_amount(amount)?;

            let gate = strategy.deviation_gate();
            let min_lp = gate.min_lp_out(amount, state.invariant_price)?;

            tx.mint(amount)?;
            let lp = tx.add_liquidity(U256::ZERO, amount, min_lp)?;
            gate.check_deposit(lp, min_lp)?;
            journal.append_note(
                Ok(()),
                LogType::PegCorrection,
                format!("Minted and added {} oToken for {} LP units.", amount, lp),
            );

            strategy.check_tilt(state, tx, journal)?;

            tx.emit(StrategyEvent::Deposit {
                asset: strategy.settings.o_token,
                p_token: strategy.settings.platform,
                amount,
            });
            Ok(())
        })
    }

    /// Removes OToken-only liquidity worth `amount` OTokens and burns what comes out
    pub(super) fn remove_and_burn_o_tokens(
        &mut self,
        amount: U256,
    ) -> AmoResult<OperationReceipt> {
        self.run(Operation::RemoveAndBurnOTokens, |strategy, state, tx, journal| {
            strategy.check_peg_amount(amount)?;

            let lp = tx
                .pool
                .calc_token_amount(U256::ZERO, amount, false)?
                .checked_add(U256::from(1_u64))
                .ok_or_else(|| arithmetic_err("LP amount overflowed."))?;

            let gate = strategy.deviation_gate();
            let min_out = gate.min_withdrawal_out(amount)?;
            let o_token_out = tx.remove_one_sided(lp, Coin::OToken, min_out)?;
            gate.check_withdrawal(o_token_out, min_out)?;
            tx.burn(o_token_out)?;

            journal.append_note(
                Ok(()),
                LogType::PegCorrection,
                format!(
                    "Removed {} oToken with {} LP units and burned it.",
                    o_token_out, lp
                ),
            );

            strategy.check_tilt(state, tx, journal)?;

            tx.emit(StrategyEvent::Withdrawal {
                asset: strategy.settings.o_token,
                p_token: strategy.settings.platform,
                amount: o_token_out,
            });
            Ok(())
        })
    }

    /// Removes asset-only liquidity worth `amount` (asset decimals) and returns it to the
    /// Vault
    pub(super) fn remove_only_assets(&mut self, amount: U256) -> AmoResult<OperationReceipt> {
        self.run(Operation::RemoveOnlyAssets, |strategy, state, tx, journal| {
            strategy.check_peg_amount(scale_to_o_token(amount, strategy.settings.asset_decimals)?)?;

            let lp = tx
                .pool
                .calc_token_amount(amount, U256::ZERO, false)?
                .checked_add(U256::from(1_u64))
                .ok_or_else(|| arithmetic_err("LP amount overflowed."))?;

            let gate = strategy.deviation_gate();
            let min_out = gate.min_withdrawal_out(amount)?;
            let asset_out = tx.remove_one_sided(lp, Coin::Asset, min_out)?;
            gate.check_withdrawal(asset_out, min_out)?;

            let vault = strategy.settings.vault;
            tx.send_asset(vault, vault, asset_out)?;

            journal.append_note(
                Ok(()),
                LogType::PegCorrection,
                format!(
                    "Removed {} asset with {} LP units and returned it to the Vault.",
                    asset_out, lp
                ),
            );

            strategy.check_tilt(state, tx, journal)?;

            tx.emit(StrategyEvent::Withdrawal {
                asset: strategy.settings.asset,
                p_token: strategy.settings.platform,
                amount: asset_out,
            });
            Ok(())
        })
    }

    /// Runs a governance change under the guard and journals it
    fn govern<F>(&mut self, action: &str, change: F) -> AmoResult<()>
    where
        F: FnOnce(&mut Self) -> AmoResult<Vec<StrategyEvent>>,
    {
        let mut journal = JournalCollection::open(Some(Operation::Governance));

        let result = match self.guard.enter() {
            Ok(_token) => change(self),
            Err(err) => Err(err),
        };

        if let Ok(events) = &result {
            journal.append_note(Ok(()), LogType::Governance, action);
            for event in events.iter() {
                journal.append_event(event);
            }
            self.events.extend(events.iter().cloned());
        }
        journal.close(result.as_ref().map(|_| ()));
        self.record(journal);
        result.map(|_| ())
    }

    pub(super) fn set_thresholds(&mut self, thresholds: OperationThresholds) -> AmoResult<()> {
        self.govern("Updated the operation thresholds.", |strategy| {
            thresholds.validate()?;
            let previous = strategy.settings.thresholds.clone();

            let mut events = vec![];
            if previous.max_deposit_deviation_bps != thresholds.max_deposit_deviation_bps {
                events.push(StrategyEvent::MaxDepositDeviationUpdated {
                    previous_bps: previous.max_deposit_deviation_bps,
                    new_bps: thresholds.max_deposit_deviation_bps,
                });
            }
            if previous.max_withdrawal_deviation_bps != thresholds.max_withdrawal_deviation_bps {
                events.push(StrategyEvent::MaxWithdrawalDeviationUpdated {
                    previous_bps: previous.max_withdrawal_deviation_bps,
                    new_bps: thresholds.max_withdrawal_deviation_bps,
                });
            }

            strategy.settings.thresholds(thresholds);
            Ok(events)
        })
    }

    pub(super) fn set_strategist(&mut self, strategist: Address) -> AmoResult<()> {
        self.govern("Updated the Strategist.", |strategy| {
            strategy.settings.strategist(strategist);
            Ok(vec![StrategyEvent::StrategistUpdated { strategist }])
        })
    }

    pub(super) fn set_harvester(&mut self, harvester: Address) -> AmoResult<()> {
        self.govern("Updated the Harvester.", |strategy| {
            let previous = strategy.settings.harvester;
            strategy.settings.harvester(harvester);
            Ok(vec![StrategyEvent::HarvesterAddressesUpdated {
                previous,
                new: harvester,
            }])
        })
    }

    /// Sends an untracked token to the Governor
    pub(super) fn transfer_token(&mut self, token: Address, amount: U256) -> AmoResult<()> {
        let action = format!("Transferred {} of {} to the Governor.", amount, token);
        self.govern(&action, |strategy| {
            if strategy.settings.is_supported_token(token) {
                return Err(AmoError::CannotTransferSupportedAsset);
            }
            strategy.data.debit_stray(token, amount)?;
            Ok(vec![])
        })
    }

    /// Grants the pool unlimited allowance on the asset and the OToken
    pub(super) fn safe_approve_all_tokens(&mut self) -> AmoResult<()> {
        self.govern("Approved the pool for the asset and the OToken.", |strategy| {
            strategy.data.allowances(Allowances {
                asset: U256::MAX,
                o_token: U256::MAX,
            });
            Ok(vec![])
        })
    }
}
