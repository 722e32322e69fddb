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

//! # Casino Ledger
//!
//! This library keeps player balances consistent with the bets, wins and
//! rollbacks applied to them. Every request carries a caller-supplied
//! idempotency token (`txn_uuid`), so retrying a request never applies it
//! twice.
//!
//! ## Core Components
//!
//! - [`Engine`]: Applies bets, wins and rollbacks under per-player locks
//! - [`PlayerStore`] / [`TransactionStore`]: Storage collaborators, with
//!   in-memory implementations
//! - [`HistoryEntry`]: Typed, chronological view of a player's transactions
//! - [`LedgerError`]: Error types, classified by [`ErrorKind`]
//!
//! ## Example
//!
//! ```
//! use casino_ledger::{Engine, TxnUuid};
//! use rust_decimal_macros::dec;
//!
//! let engine = Engine::new();
//! let player = engine.create_player("Alice", dec!(1000)).unwrap();
//!
//! let receipt = engine.apply_bet(player.id(), dec!(100), TxnUuid::from("a")).unwrap();
//! assert_eq!(receipt.balance, dec!(900));
//!
//! // Replaying the same uuid does not debit again
//! let replay = engine.apply_bet(player.id(), dec!(100), TxnUuid::from("a")).unwrap();
//! assert!(replay.replayed);
//! assert_eq!(replay.balance, dec!(900));
//!
//! let rollback = engine.rollback_bet(TxnUuid::from("a"), player.id(), dec!(100)).unwrap();
//! assert_eq!(rollback.balance, dec!(1000));
//! ```
//!
//! ## Thread Safety
//!
//! The engine serializes operations per player and lets different players
//! proceed in parallel. Share it across threads behind an `Arc`.

mod base;
pub mod config;
mod engine;
pub mod error;
pub mod history;
pub mod player;
pub mod store;
mod transaction;

pub use base::{PlayerId, TransactionId, TxnUuid};
pub use config::EngineConfig;
pub use engine::{Engine, Receipt, RollbackReceipt};
pub use error::{ErrorKind, LedgerError};
pub use history::HistoryEntry;
pub use player::Player;
pub use store::{MemoryPlayerStore, MemoryTransactionStore, PlayerStore, TransactionStore};
pub use transaction::{
    CancellationRecord, NewTransaction, Transaction, TransactionKind, TransactionRequest,
};
