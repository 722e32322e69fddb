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

//! Error types for ledger operations.

use crate::base::{PlayerId, TransactionId, TxnUuid};
use rust_decimal::Decimal;
use thiserror::Error;

/// Ledger operation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Bet, win or rollback amount is zero or negative
    #[error("invalid amount {0} (must be positive)")]
    InvalidAmount(Decimal),

    /// Opening balance is negative
    #[error("invalid balance {0} (must be zero or positive)")]
    InvalidBalance(Decimal),

    #[error("player with id {0} not found")]
    PlayerNotFound(PlayerId),

    /// Bet exceeds the player's balance
    #[error("insufficient balance: available {balance}, required {required}")]
    InsufficientFunds { balance: Decimal, required: Decimal },

    /// Credit would exceed the largest representable balance
    #[error("balance overflow: {balance} + {amount} exceeds the maximum balance")]
    BalanceOverflow { balance: Decimal, amount: Decimal },

    /// Rollback references an unknown transaction.
    ///
    /// `stored` is set when the cancellation was recorded anyway.
    #[error("transaction {txn_uuid} not found{}", stored_suffix(.stored))]
    TransactionNotFound {
        txn_uuid: TxnUuid,
        stored: Option<TransactionId>,
    },

    #[error("transaction {0} is already cancelled (rolled back)")]
    AlreadyCancelled(TxnUuid),

    /// Rollback names a different player than the one who placed the bet
    #[error("transaction {txn_uuid} belongs to player {owner}, not {requested}")]
    PlayerMismatch {
        txn_uuid: TxnUuid,
        owner: PlayerId,
        requested: PlayerId,
    },

    /// Only bets can be rolled back
    #[error("transaction {0} is not a bet")]
    NotABet(TxnUuid),

    #[error("rollback amount {requested} does not match bet {txn_uuid} of {recorded}")]
    AmountMismatch {
        txn_uuid: TxnUuid,
        recorded: Decimal,
        requested: Decimal,
    },

    /// Uniqueness violation on `txn_uuid` in the transaction store
    #[error("duplicate transaction {0}")]
    DuplicateTransaction(TxnUuid),

    /// Player lock could not be acquired in time
    #[error("timed out waiting for player {0}")]
    LockTimeout(PlayerId),

    /// Backing store failed to persist or read
    #[error("storage failure: {0}")]
    Storage(String),
}

fn stored_suffix(stored: &Option<TransactionId>) -> String {
    match stored {
        Some(id) => format!(", but stored with id: {id}"),
        None => String::new(),
    }
}

/// Coarse classification of [`LedgerError`] for boundary layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, never retried
    Validation,
    NotFound,
    /// Client-correctable state conflict
    Conflict,
    /// Transient contention; safe to retry with the same `txn_uuid`
    Unavailable,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount(_) | Self::InvalidBalance(_) => ErrorKind::Validation,
            Self::PlayerNotFound(_) | Self::TransactionNotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientFunds { .. }
            | Self::BalanceOverflow { .. }
            | Self::AlreadyCancelled(_)
            | Self::PlayerMismatch { .. }
            | Self::NotABet(_)
            | Self::AmountMismatch { .. }
            | Self::DuplicateTransaction(_) => ErrorKind::Conflict,
            Self::LockTimeout(_) => ErrorKind::Unavailable,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-style status code for the error.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_)
            | Self::InvalidBalance(_)
            | Self::InsufficientFunds { .. }
            | Self::BalanceOverflow { .. }
            | Self::AlreadyCancelled(_) => 400,
            Self::PlayerNotFound(_) | Self::TransactionNotFound { .. } => 404,
            Self::PlayerMismatch { .. }
            | Self::NotABet(_)
            | Self::AmountMismatch { .. }
            | Self::DuplicateTransaction(_) => 409,
            Self::LockTimeout(_) => 503,
            Self::Storage(_) => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Unavailable
    }

    /// Message safe to hand to an external caller.
    ///
    /// Storage errors are replaced by a generic message so backend details
    /// never leak.
    pub fn client_message(&self) -> String {
        match self {
            Self::Storage(_) => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}
