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

//! Player transaction history.

use crate::base::TxnUuid;
use crate::transaction::{Transaction, TransactionKind};
use rust_decimal::Decimal;
use serde::Serialize;

/// One line of a player's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub txn_uuid: TxnUuid,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub value: Decimal,
    /// Always `false` for wins.
    pub rolled_back: bool,
}

impl From<&Transaction> for HistoryEntry {
    fn from(transaction: &Transaction) -> Self {
        match transaction.kind() {
            TransactionKind::Bet => Self {
                txn_uuid: transaction.txn_uuid.clone(),
                kind: TransactionKind::Bet,
                value: transaction.value_bet,
                rolled_back: transaction.rolled_back,
            },
            TransactionKind::Win => Self {
                txn_uuid: transaction.txn_uuid.clone(),
                kind: TransactionKind::Win,
                value: transaction.value_win,
                rolled_back: false,
            },
        }
    }
}

/// Projects records into history entries, keeping their order.
pub fn project<'a, I>(transactions: I) -> Vec<HistoryEntry>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    transactions.into_iter().map(HistoryEntry::from).collect()
}
