// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Ledger engine.
//!
//! The [`Engine`] applies bets, wins and rollbacks to player balances. Each
//! operation is keyed by a caller-supplied [`TxnUuid`] so that retries are
//! safe:
//!
//! - **Bet**: debits the player; fails if the balance is too low.
//! - **Win**: credits the player.
//! - **Rollback**: re-credits a previous bet and marks it rolled back.
//!
//! Replaying a bet or win whose `txn_uuid` is already recorded changes
//! nothing and reports the player's *current* balance. A second rollback of
//! the same bet fails with [`LedgerError::AlreadyCancelled`].
//!
//! # Thread Safety
//!
//! Each player has its own lock. The duplicate check, the balance read, and
//! both writes happen while holding it, so operations on one player never
//! interleave. Different players proceed in parallel.
//!
//! # Atomicity
//!
//! A balance change and its record are written as one unit. If the second
//! write fails the first is undone before the error is returned.

use crate::base::{PlayerId, TransactionId, TxnUuid};
use crate::config::EngineConfig;
use crate::error::LedgerError;
use crate::history::{self, HistoryEntry};
use crate::player::Player;
use crate::store::{MemoryPlayerStore, MemoryTransactionStore, PlayerStore, TransactionStore};
use crate::transaction::{
    CancellationRecord, NewTransaction, Transaction, TransactionKind, TransactionRequest,
};
use dashmap::DashMap;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of a bet or win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub player_id: PlayerId,
    /// Balance after the operation, or the current balance for a replay.
    pub balance: Decimal,
    pub txn_uuid: TxnUuid,
    pub transaction_id: TransactionId,
    /// `true` when the `txn_uuid` was already recorded and nothing was applied.
    pub replayed: bool,
}

/// Result of a rollback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackReceipt {
    pub player_id: PlayerId,
    pub balance: Decimal,
}

/// Ledger engine over a player store and a transaction store.
///
/// # Invariants
///
/// - A player's balance is never negative.
/// - Every balance change is paired with exactly one transaction or
///   cancellation record.
/// - `txn_uuid` is unique across bets and wins.
/// - A bet is rolled back at most once.
pub struct Engine<P = MemoryPlayerStore, T = MemoryTransactionStore> {
    players: P,
    transactions: T,
    /// Per-player critical sections. Entries are never removed so that every
    /// caller of a given player contends on the same mutex.
    locks: DashMap<PlayerId, Arc<Mutex<()>>>,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine backed by empty in-memory stores.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_stores(
            MemoryPlayerStore::new(),
            MemoryTransactionStore::new(),
            config,
        )
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, T> Engine<P, T>
where
    P: PlayerStore,
    T: TransactionStore,
{
    pub fn with_stores(players: P, transactions: T, config: EngineConfig) -> Self {
        Engine {
            players,
            transactions,
            locks: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs `f` inside the player's critical section.
    fn with_player_lock<R>(
        &self,
        player_id: PlayerId,
        f: impl FnOnce() -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        // Clone the Arc so the map shard is released before blocking
        let lock = Arc::clone(self.locks.entry(player_id).or_default().value());
        let _guard = lock
            .try_lock_for(self.config.lock_timeout)
            .ok_or(LedgerError::LockTimeout(player_id))?;
        f()
    }

    fn load_player(&self, player_id: PlayerId) -> Result<Player, LedgerError> {
        self.players
            .get(player_id)?
            .ok_or(LedgerError::PlayerNotFound(player_id))
    }

    /// Runs an undo step. Its failure is logged; the caller still reports the
    /// error that triggered the undo.
    fn compensate(&self, step: &str, txn_uuid: &TxnUuid, result: Result<(), LedgerError>) {
        if let Err(err) = result {
            error!(%txn_uuid, step, error = %err, "compensation failed, ledger may be inconsistent");
        }
    }

    /// Processes a request and returns the player's resulting balance.
    ///
    /// # Request Types
    ///
    /// | Type | Behavior |
    /// |------|----------|
    /// | Bet | [`apply_bet`](Self::apply_bet) |
    /// | Win | [`apply_win`](Self::apply_win) |
    /// | Rollback | [`rollback_bet`](Self::rollback_bet) |
    pub fn process(&self, request: TransactionRequest) -> Result<Decimal, LedgerError> {
        match request {
            TransactionRequest::Bet {
                player_id,
                txn_uuid,
                amount,
            } => self.apply_bet(player_id, amount, txn_uuid).map(|r| r.balance),
            TransactionRequest::Win {
                player_id,
                txn_uuid,
                amount,
            } => self.apply_win(player_id, amount, txn_uuid).map(|r| r.balance),
            TransactionRequest::Rollback {
                player_id,
                txn_uuid,
                amount,
            } => self
                .rollback_bet(txn_uuid, player_id, amount)
                .map(|r| r.balance),
        }
    }

    /// Debits `value_bet` from the player.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `value_bet` is not positive.
    /// - [`LedgerError::PlayerNotFound`] - Unknown player.
    /// - [`LedgerError::InsufficientFunds`] - Balance is lower than `value_bet`.
    /// - [`LedgerError::LockTimeout`] - Player is busy; retry with the same uuid.
    pub fn apply_bet(
        &self,
        player_id: PlayerId,
        value_bet: Decimal,
        txn_uuid: TxnUuid,
    ) -> Result<Receipt, LedgerError> {
        self.apply(TransactionKind::Bet, player_id, value_bet, txn_uuid)
    }

    /// Credits `value_win` to the player.
    ///
    /// # Errors
    ///
    /// Same as [`apply_bet`](Self::apply_bet) except that wins never fail for
    /// insufficient funds, and fail with [`LedgerError::BalanceOverflow`] when
    /// the credit exceeds the maximum balance.
    pub fn apply_win(
        &self,
        player_id: PlayerId,
        value_win: Decimal,
        txn_uuid: TxnUuid,
    ) -> Result<Receipt, LedgerError> {
        self.apply(TransactionKind::Win, player_id, value_win, txn_uuid)
    }

    fn apply(
        &self,
        kind: TransactionKind,
        player_id: PlayerId,
        amount: Decimal,
        txn_uuid: TxnUuid,
    ) -> Result<Receipt, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }

        self.with_player_lock(player_id, || {
            let player = self.load_player(player_id)?;

            if let Some(existing) = self.transactions.get_by_uuid(&txn_uuid)? {
                debug!(%player_id, %txn_uuid, ?kind, "replayed transaction");
                return Ok(replay(&player, &existing));
            }

            let (new_balance, record) = match kind {
                TransactionKind::Bet => (
                    player.debit(amount)?,
                    NewTransaction::bet(player_id, txn_uuid, amount),
                ),
                TransactionKind::Win => (
                    player.credit(amount)?,
                    NewTransaction::win(player_id, txn_uuid, amount),
                ),
            };

            let record = match self.transactions.insert(record) {
                Ok(record) => record,
                // Same uuid committed concurrently under another player's lock
                Err(LedgerError::DuplicateTransaction(txn_uuid)) => {
                    let existing = self
                        .transactions
                        .get_by_uuid(&txn_uuid)?
                        .ok_or(LedgerError::DuplicateTransaction(txn_uuid))?;
                    debug!(%player_id, txn_uuid = %existing.txn_uuid, "replayed transaction after insert race");
                    return Ok(replay(&player, &existing));
                }
                Err(err) => return Err(err),
            };

            if let Err(err) = self.players.update_balance(player_id, new_balance) {
                warn!(%player_id, txn_uuid = %record.txn_uuid, error = %err, "balance update failed, removing record");
                self.compensate(
                    "remove transaction",
                    &record.txn_uuid,
                    self.transactions.remove(&record.txn_uuid).map(drop),
                );
                return Err(err);
            }

            debug!(%player_id, txn_uuid = %record.txn_uuid, ?kind, %amount, balance = %new_balance, "applied transaction");
            Ok(Receipt {
                player_id,
                balance: new_balance,
                txn_uuid: record.txn_uuid,
                transaction_id: record.id,
                replayed: false,
            })
        })
    }

    /// Cancels the bet `original_txn_uuid` and re-credits `value_bet`.
    ///
    /// When the bet is unknown and the player exists, the cancellation is
    /// recorded anyway together with an already rolled back bet record, so a
    /// bet arriving later with the same uuid replays without debiting. The
    /// returned [`LedgerError::TransactionNotFound`] carries that record's id.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidAmount`] - `value_bet` is not positive.
    /// - [`LedgerError::TransactionNotFound`] - No such bet.
    /// - [`LedgerError::AlreadyCancelled`] - Bet was already rolled back.
    /// - [`LedgerError::PlayerMismatch`] - Bet belongs to another player.
    /// - [`LedgerError::NotABet`] - `original_txn_uuid` names a win.
    /// - [`LedgerError::AmountMismatch`] - `value_bet` differs from the bet.
    /// - [`LedgerError::PlayerNotFound`] - Player no longer exists.
    /// - [`LedgerError::BalanceOverflow`] - Credit exceeds the maximum balance.
    ///
    /// `PlayerMismatch`, `NotABet` and `AmountMismatch` are stricter than a
    /// plain "credit what was asked" rollback. They map to 409, which callers
    /// should expect alongside the 400/404 of a missing or cancelled bet.
    pub fn rollback_bet(
        &self,
        original_txn_uuid: TxnUuid,
        player_id: PlayerId,
        value_bet: Decimal,
    ) -> Result<RollbackReceipt, LedgerError> {
        if value_bet <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(value_bet));
        }

        self.with_player_lock(player_id, || {
            let Some(original) = self.transactions.get_by_uuid(&original_txn_uuid)? else {
                return Err(self.record_unknown_rollback(player_id, original_txn_uuid, value_bet));
            };

            check_rollback(&original, player_id, value_bet)?;

            let player = self.load_player(player_id)?;
            let new_balance = player.credit(value_bet)?;
            let txn_uuid = original.txn_uuid;

            self.transactions.mark_rolled_back(&txn_uuid)?;

            let cancellation = CancellationRecord {
                txn_uuid: txn_uuid.clone(),
                player_id,
                value_bet,
            };
            if let Err(err) = self.transactions.insert_cancellation(cancellation) {
                self.compensate(
                    "clear rolled_back",
                    &txn_uuid,
                    self.transactions.clear_rolled_back(&txn_uuid),
                );
                return Err(match err {
                    LedgerError::DuplicateTransaction(txn_uuid) => {
                        LedgerError::AlreadyCancelled(txn_uuid)
                    }
                    other => other,
                });
            }

            if let Err(err) = self.players.update_balance(player_id, new_balance) {
                warn!(%player_id, %txn_uuid, error = %err, "balance update failed, reverting rollback");
                self.compensate(
                    "remove cancellation",
                    &txn_uuid,
                    self.transactions.remove_cancellation(&txn_uuid).map(drop),
                );
                self.compensate(
                    "clear rolled_back",
                    &txn_uuid,
                    self.transactions.clear_rolled_back(&txn_uuid),
                );
                return Err(err);
            }

            debug!(%player_id, %txn_uuid, %value_bet, balance = %new_balance, "rolled back bet");
            Ok(RollbackReceipt {
                player_id,
                balance: new_balance,
            })
        })
    }

    /// Stores the cancellation of a bet the ledger has not seen and builds
    /// the not-found error describing it.
    fn record_unknown_rollback(
        &self,
        player_id: PlayerId,
        txn_uuid: TxnUuid,
        value_bet: Decimal,
    ) -> LedgerError {
        match self.store_cancelled_bet(player_id, &txn_uuid, value_bet) {
            Ok(stored) => {
                warn!(%player_id, %txn_uuid, ?stored, "rollback of unknown transaction");
                LedgerError::TransactionNotFound { txn_uuid, stored }
            }
            Err(err) => err,
        }
    }

    fn store_cancelled_bet(
        &self,
        player_id: PlayerId,
        txn_uuid: &TxnUuid,
        value_bet: Decimal,
    ) -> Result<Option<TransactionId>, LedgerError> {
        if self.players.get(player_id)?.is_none() {
            return Ok(None);
        }

        self.transactions.insert_cancellation(CancellationRecord {
            txn_uuid: txn_uuid.clone(),
            player_id,
            value_bet,
        })?;

        let record = NewTransaction::cancelled_bet(player_id, txn_uuid.clone(), value_bet);
        match self.transactions.insert(record) {
            Ok(record) => Ok(Some(record.id)),
            Err(err) => {
                self.compensate(
                    "remove cancellation",
                    txn_uuid,
                    self.transactions.remove_cancellation(txn_uuid).map(drop),
                );
                Err(err)
            }
        }
    }

    /// Player's transactions in creation order.
    ///
    /// # Errors
    ///
    /// [`LedgerError::PlayerNotFound`] for an unknown player.
    pub fn history(&self, player_id: PlayerId) -> Result<Vec<HistoryEntry>, LedgerError> {
        self.with_player_lock(player_id, || {
            self.load_player(player_id)?;
            let records = self.transactions.list_by_player(player_id)?;
            Ok(history::project(&records))
        })
    }

    // === Player administration ===

    /// Registers a player with an opening balance.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidBalance`] if `balance` is negative.
    pub fn create_player(
        &self,
        name: impl Into<String>,
        balance: Decimal,
    ) -> Result<Player, LedgerError> {
        if balance < Decimal::ZERO {
            return Err(LedgerError::InvalidBalance(balance));
        }
        let player = self.players.create(name.into(), balance)?;
        info!(player_id = %player.id(), %balance, "created player");
        Ok(player)
    }

    pub fn player(&self, player_id: PlayerId) -> Result<Player, LedgerError> {
        self.load_player(player_id)
    }

    pub fn balance(&self, player_id: PlayerId) -> Result<Decimal, LedgerError> {
        self.load_player(player_id).map(|player| player.balance())
    }

    pub fn players(&self) -> Result<Vec<Player>, LedgerError> {
        self.players.list()
    }

    /// Changes a player's display name. The balance is untouched.
    pub fn rename_player(
        &self,
        player_id: PlayerId,
        name: impl Into<String>,
    ) -> Result<Player, LedgerError> {
        let name = name.into();
        self.with_player_lock(player_id, || self.players.rename(player_id, name))
    }

    /// Deletes a player.
    ///
    /// Transactions of the player are kept and still count for `txn_uuid`
    /// uniqueness.
    pub fn delete_player(&self, player_id: PlayerId) -> Result<Player, LedgerError> {
        self.with_player_lock(player_id, || {
            let player = self
                .players
                .delete(player_id)?
                .ok_or(LedgerError::PlayerNotFound(player_id))?;
            let orphaned = self.transactions.list_by_player(player_id)?.len();
            if orphaned > 0 {
                warn!(%player_id, orphaned, "deleted player still has transactions");
            }
            info!(%player_id, "deleted player");
            Ok(player)
        })
    }

    // === Transaction queries ===

    /// Looks up a bet or win by its `txn_uuid`.
    pub fn transaction(&self, txn_uuid: &TxnUuid) -> Result<Transaction, LedgerError> {
        self.transactions
            .get_by_uuid(txn_uuid)?
            .ok_or_else(|| LedgerError::TransactionNotFound {
                txn_uuid: txn_uuid.clone(),
                stored: None,
            })
    }

    /// All transactions in creation order.
    pub fn transactions(&self) -> Result<Vec<Transaction>, LedgerError> {
        self.transactions.list()
    }

    pub fn cancellation(
        &self,
        txn_uuid: &TxnUuid,
    ) -> Result<Option<CancellationRecord>, LedgerError> {
        self.transactions.get_cancellation(txn_uuid)
    }
}

fn replay(player: &Player, existing: &Transaction) -> Receipt {
    Receipt {
        player_id: player.id(),
        balance: player.balance(),
        txn_uuid: existing.txn_uuid.clone(),
        transaction_id: existing.id,
        replayed: true,
    }
}

/// Checks that `original` is a live bet of `player_id` for `value_bet`.
fn check_rollback(
    original: &Transaction,
    player_id: PlayerId,
    value_bet: Decimal,
) -> Result<(), LedgerError> {
    if original.rolled_back {
        return Err(LedgerError::AlreadyCancelled(original.txn_uuid.clone()));
    }
    if original.player_id != player_id {
        return Err(LedgerError::PlayerMismatch {
            txn_uuid: original.txn_uuid.clone(),
            owner: original.player_id,
            requested: player_id,
        });
    }
    if !original.is_bet() {
        return Err(LedgerError::NotABet(original.txn_uuid.clone()));
    }
    if original.value_bet != value_bet {
        return Err(LedgerError::AmountMismatch {
            txn_uuid: original.txn_uuid.clone(),
            recorded: original.value_bet,
            requested: value_bet,
        });
    }
    Ok(())
}
