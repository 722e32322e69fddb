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

//! Core identifier types for players and transactions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a player account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Store-assigned sequence number of a transaction record.
///
/// Sequence numbers grow monotonically, so ordering by them is ordering by
/// creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied idempotency token.
///
/// Globally unique across bets and wins. Resubmitting a request with a token
/// that was already applied is a replay, not a new transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TxnUuid(String);

impl TxnUuid {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxnUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TxnUuid {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for TxnUuid {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for TxnUuid {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_display_their_inner_value() {
        assert_eq!(PlayerId(42).to_string(), "42");
        assert_eq!(TransactionId(7).to_string(), "7");
        assert_eq!(TxnUuid::from("abc123").to_string(), "abc123");
    }

    #[test]
    fn txn_uuid_serializes_as_plain_string() {
        let json = serde_json::to_string(&TxnUuid::new("round-1")).unwrap();
        assert_eq!(json, "\"round-1\"");

        let parsed: TxnUuid = serde_json::from_str("\"round-2\"").unwrap();
        assert_eq!(parsed.as_str(), "round-2");
    }
}
