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

//! In-memory player store.

use super::PlayerStore;
use crate::base::PlayerId;
use crate::error::LedgerError;
use crate::player::Player;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicU64, Ordering};

/// Players held in a [`DashMap`], ids assigned from a counter starting at 1.
#[derive(Debug)]
pub struct MemoryPlayerStore {
    players: DashMap<PlayerId, Player>,
    next_id: AtomicU64,
}

impl MemoryPlayerStore {
    pub fn new() -> Self {
        Self {
            players: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryPlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerStore for MemoryPlayerStore {
    fn create(&self, name: String, balance: Decimal) -> Result<Player, LedgerError> {
        // Validate before consuming an id
        if balance < Decimal::ZERO {
            return Err(LedgerError::InvalidBalance(balance));
        }
        let id = PlayerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let player = Player::new(id, name, balance)?;
        self.players.insert(id, player.clone());
        Ok(player)
    }

    fn get(&self, id: PlayerId) -> Result<Option<Player>, LedgerError> {
        Ok(self.players.get(&id).map(|player| player.clone()))
    }

    fn list(&self) -> Result<Vec<Player>, LedgerError> {
        let mut players: Vec<Player> = self.players.iter().map(|p| p.value().clone()).collect();
        players.sort_by_key(Player::id);
        Ok(players)
    }

    fn update_balance(&self, id: PlayerId, balance: Decimal) -> Result<Player, LedgerError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or(LedgerError::PlayerNotFound(id))?;
        player.set_balance(balance)?;
        Ok(player.clone())
    }

    fn rename(&self, id: PlayerId, name: String) -> Result<Player, LedgerError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or(LedgerError::PlayerNotFound(id))?;
        player.set_name(name);
        Ok(player.clone())
    }

    fn delete(&self, id: PlayerId) -> Result<Option<Player>, LedgerError> {
        Ok(self.players.remove(&id).map(|(_, player)| player))
    }
}
