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

//! In-memory transaction store with uniqueness on `txn_uuid`.

use super::TransactionStore;
use crate::base::{PlayerId, TransactionId, TxnUuid};
use crate::error::LedgerError;
use crate::transaction::{CancellationRecord, NewTransaction, Transaction};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transactions keyed by `txn_uuid`, with secondary indexes by sequence id
/// and by player.
///
/// Lock order is always records, then `by_id`, then `by_player`.
#[derive(Debug)]
pub struct MemoryTransactionStore {
    /// Primary map; the entry API enforces `txn_uuid` uniqueness.
    records: DashMap<TxnUuid, Transaction>,

    by_id: DashMap<TransactionId, TxnUuid>,

    /// Sequence ids per player in insertion order.
    by_player: DashMap<PlayerId, Vec<TransactionId>>,

    cancellations: DashMap<TxnUuid, CancellationRecord>,

    next_id: AtomicU64,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            by_id: DashMap::new(),
            by_player: DashMap::new(),
            cancellations: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn lookup(&self, id: &TransactionId) -> Option<Transaction> {
        let txn_uuid = self.by_id.get(id)?.clone();
        self.records.get(&txn_uuid).map(|record| record.clone())
    }
}

impl Default for MemoryTransactionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn insert(&self, transaction: NewTransaction) -> Result<Transaction, LedgerError> {
        // Entry API gives an atomic check-and-insert on the uuid
        match self.records.entry(transaction.txn_uuid.clone()) {
            Entry::Occupied(entry) => Err(LedgerError::DuplicateTransaction(entry.key().clone())),
            Entry::Vacant(entry) => {
                let id = TransactionId(self.next_id.fetch_add(1, Ordering::Relaxed));
                let record = transaction.into_transaction(id);
                let player_id = record.player_id;
                entry.insert(record.clone());
                self.by_id.insert(id, record.txn_uuid.clone());
                self.by_player.entry(player_id).or_default().push(id);
                Ok(record)
            }
        }
    }

    fn get(&self, id: TransactionId) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.lookup(&id))
    }

    fn get_by_uuid(&self, txn_uuid: &TxnUuid) -> Result<Option<Transaction>, LedgerError> {
        Ok(self.records.get(txn_uuid).map(|record| record.clone()))
    }

    fn list(&self) -> Result<Vec<Transaction>, LedgerError> {
        let mut records: Vec<Transaction> =
            self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn list_by_player(&self, player_id: PlayerId) -> Result<Vec<Transaction>, LedgerError> {
        let ids = match self.by_player.get(&player_id) {
            Some(ids) => ids.clone(),
            None => return Ok(Vec::new()),
        };
        Ok(ids.iter().filter_map(|id| self.lookup(id)).collect())
    }

    fn remove(&self, txn_uuid: &TxnUuid) -> Result<Option<Transaction>, LedgerError> {
        let Some((_, record)) = self.records.remove(txn_uuid) else {
            return Ok(None);
        };
        self.by_id.remove(&record.id);
        if let Some(mut ids) = self.by_player.get_mut(&record.player_id) {
            ids.retain(|id| *id != record.id);
        }
        Ok(Some(record))
    }

    fn mark_rolled_back(&self, txn_uuid: &TxnUuid) -> Result<Transaction, LedgerError> {
        let mut record =
            self.records
                .get_mut(txn_uuid)
                .ok_or_else(|| LedgerError::TransactionNotFound {
                    txn_uuid: txn_uuid.clone(),
                    stored: None,
                })?;
        if record.rolled_back {
            return Err(LedgerError::AlreadyCancelled(txn_uuid.clone()));
        }
        record.rolled_back = true;
        Ok(record.clone())
    }

    fn clear_rolled_back(&self, txn_uuid: &TxnUuid) -> Result<(), LedgerError> {
        if let Some(mut record) = self.records.get_mut(txn_uuid) {
            record.rolled_back = false;
        }
        Ok(())
    }

    fn insert_cancellation(&self, record: CancellationRecord) -> Result<(), LedgerError> {
        match self.cancellations.entry(record.txn_uuid.clone()) {
            Entry::Occupied(entry) => Err(LedgerError::DuplicateTransaction(entry.key().clone())),
            Entry::Vacant(entry) => {
                entry.insert(record);
                Ok(())
            }
        }
    }

    fn get_cancellation(
        &self,
        txn_uuid: &TxnUuid,
    ) -> Result<Option<CancellationRecord>, LedgerError> {
        Ok(self.cancellations.get(txn_uuid).map(|record| record.clone()))
    }

    fn remove_cancellation(
        &self,
        txn_uuid: &TxnUuid,
    ) -> Result<Option<CancellationRecord>, LedgerError> {
        Ok(self.cancellations.remove(txn_uuid).map(|(_, record)| record))
    }
}
