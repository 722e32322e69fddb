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

//! Engine configuration.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

/// Tunables for [`Engine`](crate::Engine).
///
/// Deserializes from `{"lock_timeout_ms": 250}`; missing fields fall back to
/// the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on waiting for a player's lock before failing with
    /// [`LedgerError::LockTimeout`](crate::LedgerError::LockTimeout).
    #[serde(
        rename = "lock_timeout_ms",
        serialize_with = "serialize_millis",
        deserialize_with = "deserialize_millis"
    )]
    pub lock_timeout: Duration,
}

impl EngineConfig {
    pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Self::DEFAULT_LOCK_TIMEOUT,
        }
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let millis = u64::try_from(duration.as_millis()).map_err(serde::ser::Error::custom)?;
    serializer.serialize_u64(millis)
}

fn deserialize_millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lock_timeout_is_five_seconds() {
        assert_eq!(EngineConfig::default().lock_timeout, Duration::from_secs(5));
    }

    #[test]
    fn deserializes_millis() {
        let config: EngineConfig = serde_json::from_str(r#"{"lock_timeout_ms": 250}"#).unwrap();
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn serializing_oversized_timeout_fails() {
        let config = EngineConfig::default().with_lock_timeout(Duration::MAX);
        assert!(serde_json::to_string(&config).is_err());
    }

    #[test]
    fn serializes_millis() {
        let config = EngineConfig::default().with_lock_timeout(Duration::from_millis(1500));
        assert_eq!(
            serde_json::to_string(&config).unwrap(),
            r#"{"lock_timeout_ms":1500}"#
        );
    }
}
