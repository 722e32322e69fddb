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

//! Player accounts.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use casino_ledger::{Player, PlayerId};
//!
//! let player = Player::new(PlayerId(1), "Alice", dec!(1000)).unwrap();
//! assert_eq!(player.balance(), dec!(1000));
//! ```

use crate::base::PlayerId;
use crate::error::LedgerError;
use rust_decimal::Decimal;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// A player and their current balance.
///
/// The balance is never negative. It only changes through [`debit`](Self::debit)
/// and [`credit`](Self::credit), which the engine calls inside the player's
/// critical section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    id: PlayerId,
    name: String,
    balance: Decimal,
}

impl Player {
    const DECIMAL_PRECISION: u32 = 4;

    pub fn new(id: PlayerId, name: impl Into<String>, balance: Decimal) -> Result<Self, LedgerError> {
        if balance < Decimal::ZERO {
            return Err(LedgerError::InvalidBalance(balance));
        }
        Ok(Self {
            id,
            name: name.into(),
            balance,
        })
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn balance(&self) -> Decimal {
        self.balance
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub(crate) fn set_balance(&mut self, balance: Decimal) -> Result<(), LedgerError> {
        if balance < Decimal::ZERO {
            return Err(LedgerError::InvalidBalance(balance));
        }
        self.balance = balance;
        Ok(())
    }

    fn assert_invariants(&self) {
        debug_assert!(
            self.balance >= Decimal::ZERO,
            "Invariant violated: balance went negative: {}",
            self.balance
        );
    }

    /// Balance after removing `amount`, without mutating the player.
    pub fn debit(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        if self.balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance: self.balance,
                required: amount,
            });
        }
        self.assert_invariants();
        Ok(self.balance - amount)
    }

    /// Balance after adding `amount`, without mutating the player.
    ///
    /// Fails with [`LedgerError::BalanceOverflow`] past [`Decimal::MAX`].
    pub fn credit(&self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if amount <= Decimal::ZERO {
            return Err(LedgerError::InvalidAmount(amount));
        }
        self.assert_invariants();
        self.balance
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow {
                balance: self.balance,
                amount,
            })
    }
}

impl Serialize for Player {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Player", 3)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field(
            "balance",
            &self.balance.round_dp(Player::DECIMAL_PRECISION),
        )?;
        state.end()
    }
}
