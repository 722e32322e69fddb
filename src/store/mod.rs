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

//! Storage collaborators of the engine.
//!
//! The engine only talks to storage through [`PlayerStore`] and
//! [`TransactionStore`]. Every method is fallible so that a persistent
//! backend can report write failures as [`LedgerError::Storage`]; the engine
//! undoes its earlier writes when that happens.
//!
//! Stores do not serialize multi-step operations themselves. The engine
//! holds the player's lock around every read-modify-write sequence.

mod player;
mod transaction;

pub use player::MemoryPlayerStore;
pub use transaction::MemoryTransactionStore;

use crate::base::{PlayerId, TransactionId, TxnUuid};
use crate::error::LedgerError;
use crate::player::Player;
use crate::transaction::{CancellationRecord, NewTransaction, Transaction};
use rust_decimal::Decimal;

/// Player persistence.
pub trait PlayerStore: Send + Sync {
    /// Creates a player and assigns its id.
    fn create(&self, name: String, balance: Decimal) -> Result<Player, LedgerError>;

    fn get(&self, id: PlayerId) -> Result<Option<Player>, LedgerError>;

    /// All players ordered by id.
    fn list(&self) -> Result<Vec<Player>, LedgerError>;

    /// Overwrites the balance of an existing player.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::PlayerNotFound`] if the player does not exist.
    /// - [`LedgerError::InvalidBalance`] if `balance` is negative.
    fn update_balance(&self, id: PlayerId, balance: Decimal) -> Result<Player, LedgerError>;

    fn rename(&self, id: PlayerId, name: String) -> Result<Player, LedgerError>;

    /// Removes a player, returning it if it existed.
    fn delete(&self, id: PlayerId) -> Result<Option<Player>, LedgerError>;
}

/// Transaction and cancellation persistence.
pub trait TransactionStore: Send + Sync {
    /// Inserts a record and assigns its sequence id.
    ///
    /// # Errors
    ///
    /// [`LedgerError::DuplicateTransaction`] if the `txn_uuid` is taken.
    fn insert(&self, transaction: NewTransaction) -> Result<Transaction, LedgerError>;

    fn get(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError>;

    fn get_by_uuid(&self, txn_uuid: &TxnUuid) -> Result<Option<Transaction>, LedgerError>;

    /// All records in creation order.
    fn list(&self) -> Result<Vec<Transaction>, LedgerError>;

    /// Records of one player in creation order.
    fn list_by_player(&self, player_id: PlayerId) -> Result<Vec<Transaction>, LedgerError>;

    fn remove(&self, txn_uuid: &TxnUuid) -> Result<Option<Transaction>, LedgerError>;

    /// Flips `rolled_back` from `false` to `true`.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::AlreadyCancelled`] if the flag is already set.
    /// - [`LedgerError::TransactionNotFound`] if no such record exists.
    fn mark_rolled_back(&self, txn_uuid: &TxnUuid) -> Result<Transaction, LedgerError>;

    /// Reverts [`mark_rolled_back`](Self::mark_rolled_back) for a rollback
    /// that failed before it committed.
    fn clear_rolled_back(&self, txn_uuid: &TxnUuid) -> Result<(), LedgerError>;

    /// # Errors
    ///
    /// [`LedgerError::DuplicateTransaction`] if a cancellation for the same
    /// `txn_uuid` exists.
    fn insert_cancellation(&self, record: CancellationRecord) -> Result<(), LedgerError>;

    fn get_cancellation(&self, txn_uuid: &TxnUuid)
    -> Result<Option<CancellationRecord>, LedgerError>;

    fn remove_cancellation(
        &self,
        txn_uuid: &TxnUuid,
    ) -> Result<Option<CancellationRecord>, LedgerError>;
}
