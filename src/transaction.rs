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

//! Transaction records and requests.
//!
//! A bet or win is written once and never changes, except for the
//! `rolled_back` flag of a bet, which goes from `false` to `true` when the
//! bet is cancelled:
//!
//! ```text
//!  Bet (rolled_back = false) ──rollback──► Bet (rolled_back = true) + CancellationRecord
//!  Win                        (never rolled back)
//! ```

use crate::base::{PlayerId, TransactionId, TxnUuid};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A persisted bet or win.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub txn_uuid: TxnUuid,
    pub player_id: PlayerId,
    pub value_bet: Decimal,
    pub value_win: Decimal,
    pub rolled_back: bool,
}

impl Transaction {
    pub fn kind(&self) -> TransactionKind {
        if self.value_bet > Decimal::ZERO && self.value_win == Decimal::ZERO {
            TransactionKind::Bet
        } else {
            TransactionKind::Win
        }
    }

    pub fn is_bet(&self) -> bool {
        self.kind() == TransactionKind::Bet
    }
}

/// Record to insert; the store assigns the [`TransactionId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub txn_uuid: TxnUuid,
    pub player_id: PlayerId,
    pub value_bet: Decimal,
    pub value_win: Decimal,
    pub rolled_back: bool,
}

impl NewTransaction {
    pub fn bet(player_id: PlayerId, txn_uuid: TxnUuid, amount: Decimal) -> Self {
        Self {
            txn_uuid,
            player_id,
            value_bet: amount,
            value_win: Decimal::ZERO,
            rolled_back: false,
        }
    }

    pub fn win(player_id: PlayerId, txn_uuid: TxnUuid, amount: Decimal) -> Self {
        Self {
            txn_uuid,
            player_id,
            value_bet: Decimal::ZERO,
            value_win: amount,
            rolled_back: false,
        }
    }

    /// A bet that arrives already cancelled.
    ///
    /// Written when a rollback names a bet the ledger has not seen, so that a
    /// late bet with the same token replays instead of debiting.
    pub fn cancelled_bet(player_id: PlayerId, txn_uuid: TxnUuid, amount: Decimal) -> Self {
        Self {
            rolled_back: true,
            ..Self::bet(player_id, txn_uuid, amount)
        }
    }

    pub(crate) fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            txn_uuid: self.txn_uuid,
            player_id: self.player_id,
            value_bet: self.value_bet,
            value_win: self.value_win,
            rolled_back: self.rolled_back,
        }
    }
}

/// Recorded intent to cancel a bet, unique per `txn_uuid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationRecord {
    pub txn_uuid: TxnUuid,
    pub player_id: PlayerId,
    pub value_bet: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Bet,
    Win,
}

/// A request submitted to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransactionRequest {
    Bet {
        player_id: PlayerId,
        txn_uuid: TxnUuid,
        amount: Decimal,
    },
    Win {
        player_id: PlayerId,
        txn_uuid: TxnUuid,
        amount: Decimal,
    },
    /// Cancels the bet identified by `txn_uuid`
    Rollback {
        player_id: PlayerId,
        txn_uuid: TxnUuid,
        amount: Decimal,
    },
}

impl TransactionRequest {
    pub fn txn_uuid(&self) -> &TxnUuid {
        match self {
            Self::Bet { txn_uuid, .. } => txn_uuid,
            Self::Win { txn_uuid, .. } => txn_uuid,
            Self::Rollback { txn_uuid, .. } => txn_uuid,
        }
    }

    pub fn player_id(&self) -> PlayerId {
        match self {
            Self::Bet { player_id, .. } => *player_id,
            Self::Win { player_id, .. } => *player_id,
            Self::Rollback { player_id, .. } => *player_id,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            Self::Bet { amount, .. } => *amount,
            Self::Win { amount, .. } => *amount,
            Self::Rollback { amount, .. } => *amount,
        }
    }
}
