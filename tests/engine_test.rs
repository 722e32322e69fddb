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

//! Engine public API integration tests.

use casino_ledger::{
    Engine, LedgerError, PlayerId, TransactionKind, TransactionRequest, TxnUuid,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn uuid(value: &str) -> TxnUuid {
    TxnUuid::from(value)
}

fn engine_with_player(balance: Decimal) -> (Engine, PlayerId) {
    let engine = Engine::new();
    let player = engine.create_player("Alice", balance).unwrap();
    (engine, player.id())
}

// === Bets ===

#[test]
fn bet_debits_balance() {
    let (engine, player) = engine_with_player(dec!(1000));

    let receipt = engine.apply_bet(player, dec!(100), uuid("abc123")).unwrap();

    assert_eq!(receipt.player_id, player);
    assert_eq!(receipt.balance, dec!(900));
    assert_eq!(receipt.txn_uuid, uuid("abc123"));
    assert!(!receipt.replayed);
    assert_eq!(engine.balance(player).unwrap(), dec!(900));
}

#[test]
fn bet_of_entire_balance_leaves_zero() {
    let (engine, player) = engine_with_player(dec!(50));
    let receipt = engine.apply_bet(player, dec!(50), uuid("all-in")).unwrap();
    assert_eq!(receipt.balance, Decimal::ZERO);
}

#[test]
fn bet_insufficient_funds() {
    let (engine, player) = engine_with_player(dec!(50));

    let result = engine.apply_bet(player, dec!(100), uuid("a"));
    assert_eq!(
        result,
        Err(LedgerError::InsufficientFunds {
            balance: dec!(50),
            required: dec!(100),
        })
    );

    // Balance unchanged and nothing recorded
    assert_eq!(engine.balance(player).unwrap(), dec!(50));
    assert!(engine.transactions().unwrap().is_empty());
}

#[test]
fn rejected_bet_leaves_uuid_free() {
    let (engine, player) = engine_with_player(dec!(50));

    engine.apply_bet(player, dec!(100), uuid("a")).unwrap_err();
    engine.apply_win(player, dec!(100), uuid("w")).unwrap();

    // The same uuid can now succeed
    let receipt = engine.apply_bet(player, dec!(100), uuid("a")).unwrap();
    assert!(!receipt.replayed);
    assert_eq!(receipt.balance, dec!(50));
}

#[test]
fn bet_replay_returns_current_balance_without_debiting() {
    let (engine, player) = engine_with_player(dec!(1000));

    let first = engine.apply_bet(player, dec!(100), uuid("a")).unwrap();
    engine.apply_win(player, dec!(25), uuid("b")).unwrap();

    let replay = engine.apply_bet(player, dec!(100), uuid("a")).unwrap();

    assert!(replay.replayed);
    assert_eq!(replay.transaction_id, first.transaction_id);
    assert_eq!(replay.txn_uuid, uuid("a"));
    // Present balance, not the balance right after the original bet
    assert_eq!(replay.balance, dec!(925));
    assert_eq!(engine.balance(player).unwrap(), dec!(925));
}

#[test]
fn bet_replay_does_not_check_funds() {
    let (engine, player) = engine_with_player(dec!(100));
    engine.apply_bet(player, dec!(100), uuid("a")).unwrap();

    // Balance is now 0, but the replay is a no-op, not a new debit
    let replay = engine.apply_bet(player, dec!(100), uuid("a")).unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.balance, Decimal::ZERO);
}

#[test]
fn bet_rejects_non_positive_amounts() {
    let (engine, player) = engine_with_player(dec!(100));

    assert_eq!(
        engine.apply_bet(player, dec!(0), uuid("a")),
        Err(LedgerError::InvalidAmount(dec!(0)))
    );
    assert_eq!(
        engine.apply_bet(player, dec!(-10), uuid("a")),
        Err(LedgerError::InvalidAmount(dec!(-10)))
    );
    assert_eq!(engine.balance(player).unwrap(), dec!(100));
}

#[test]
fn bet_unknown_player() {
    let engine = Engine::new();
    assert_eq!(
        engine.apply_bet(PlayerId(999), dec!(10), uuid("a")),
        Err(LedgerError::PlayerNotFound(PlayerId(999)))
    );
}

// === Wins ===

#[test]
fn win_credits_balance() {
    let (engine, player) = engine_with_player(dec!(1000));
    let receipt = engine.apply_win(player, dec!(50.25), uuid("w")).unwrap();
    assert_eq!(receipt.balance, dec!(1050.25));
}

#[test]
fn win_on_zero_balance() {
    let (engine, player) = engine_with_player(Decimal::ZERO);
    let receipt = engine.apply_win(player, dec!(10), uuid("w")).unwrap();
    assert_eq!(receipt.balance, dec!(10));
}

#[test]
fn win_replay_does_not_credit_again() {
    let (engine, player) = engine_with_player(dec!(1000));
    engine.apply_win(player, dec!(50), uuid("w")).unwrap();

    let replay = engine.apply_win(player, dec!(50), uuid("w")).unwrap();

    assert!(replay.replayed);
    assert_eq!(replay.balance, dec!(1050));
    assert_eq!(engine.transactions().unwrap().len(), 1);
}

#[test]
fn win_rejects_non_positive_amounts() {
    let (engine, player) = engine_with_player(dec!(100));
    assert_eq!(
        engine.apply_win(player, dec!(0), uuid("w")),
        Err(LedgerError::InvalidAmount(dec!(0)))
    );
}

#[test]
fn win_uuid_collides_with_bet_uuid() {
    let (engine, player) = engine_with_player(dec!(100));
    engine.apply_bet(player, dec!(10), uuid("same")).unwrap();

    // Uniqueness spans bets and wins
    let replay = engine.apply_win(player, dec!(500), uuid("same")).unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.balance, dec!(90));
}

#[test]
fn win_past_max_balance_is_rejected() {
    let (engine, player) = engine_with_player(Decimal::MAX);

    assert_eq!(
        engine.apply_win(player, dec!(1), uuid("w")),
        Err(LedgerError::BalanceOverflow {
            balance: Decimal::MAX,
            amount: dec!(1),
        })
    );
    assert_eq!(engine.balance(player).unwrap(), Decimal::MAX);
    assert!(engine.history(player).unwrap().is_empty());

    // Nothing was recorded, so the uuid is still usable
    let receipt = engine.apply_bet(player, dec!(1), uuid("w")).unwrap();
    assert!(!receipt.replayed);
}

#[test]
fn replay_for_another_player_reports_that_players_balance() {
    let engine = Engine::new();
    let alice = engine.create_player("Alice", dec!(100)).unwrap().id();
    let bob = engine.create_player("Bob", dec!(7)).unwrap().id();

    engine.apply_bet(alice, dec!(10), uuid("a")).unwrap();
    let replay = engine.apply_bet(bob, dec!(10), uuid("a")).unwrap();

    assert!(replay.replayed);
    assert_eq!(replay.player_id, bob);
    assert_eq!(replay.balance, dec!(7));
    assert_eq!(engine.balance(alice).unwrap(), dec!(90));
}

// === Rollbacks ===

#[test]
fn rollback_restores_balance_and_marks_bet() {
    let (engine, player) = engine_with_player(dec!(1000));
    engine.apply_bet(player, dec!(100), uuid("a")).unwrap();

    let receipt = engine.rollback_bet(uuid("a"), player, dec!(100)).unwrap();

    assert_eq!(receipt.player_id, player);
    assert_eq!(receipt.balance, dec!(1000));
    assert!(engine.transaction(&uuid("a")).unwrap().rolled_back);

    let cancellation = engine.cancellation(&uuid("a")).unwrap().unwrap();
    assert_eq!(cancellation.player_id, player);
    assert_eq!(cancellation.value_bet, dec!(100));
}

#[test]
fn second_rollback_fails_already_cancelled() {
    let (engine, player) = engine_with_player(dec!(1000));
    engine.apply_bet(player, dec!(100), uuid("a")).unwrap();
    engine.rollback_bet(uuid("a"), player, dec!(100)).unwrap();

    let result = engine.rollback_bet(uuid("a"), player, dec!(100));

    assert_eq!(result, Err(LedgerError::AlreadyCancelled(uuid("a"))));
    assert_eq!(engine.balance(player).unwrap(), dec!(1000));
}

#[test]
fn rollback_unknown_transaction_stores_cancellation() {
    let (engine, player) = engine_with_player(dec!(1000));

    let result = engine.rollback_bet(uuid("notfound123"), player, dec!(200));

    let Err(LedgerError::TransactionNotFound { txn_uuid, stored }) = result.clone() else {
        panic!("expected TransactionNotFound, got {result:?}");
    };
    assert_eq!(txn_uuid, uuid("notfound123"));
    let stored = stored.expect("cancellation should be stored");
    assert!(
        result
            .unwrap_err()
            .to_string()
            .contains(&format!("not found, but stored with id: {stored}"))
    );

    // No balance change, but the cancellation is remembered
    assert_eq!(engine.balance(player).unwrap(), dec!(1000));
    assert!(engine.cancellation(&uuid("notfound123")).unwrap().is_some());
    let tombstone = engine.transaction(&uuid("notfound123")).unwrap();
    assert_eq!(tombstone.id, stored);
    assert!(tombstone.rolled_back);
}

#[test]
fn late_bet_after_unknown_rollback_is_a_replay() {
    let (engine, player) = engine_with_player(dec!(1000));
    engine
        .rollback_bet(uuid("late"), player, dec!(200))
        .unwrap_err();

    let receipt = engine.apply_bet(player, dec!(200), uuid("late")).unwrap();

    assert!(receipt.replayed);
    assert_eq!(receipt.balance, dec!(1000));
}

#[test]
fn repeated_unknown_rollback_is_already_cancelled() {
    let (engine, player) = engine_with_player(dec!(1000));
    engine.rollback_bet(uuid("x"), player, dec!(5)).unwrap_err();

    assert_eq!(
        engine.rollback_bet(uuid("x"), player, dec!(5)),
        Err(LedgerError::AlreadyCancelled(uuid("x")))
    );
}

#[test]
fn rollback_unknown_transaction_and_unknown_player_stores_nothing() {
    let engine = Engine::new();

    let result = engine.rollback_bet(uuid("notfound123"), PlayerId(1), dec!(200));

    assert_eq!(
        result,
        Err(LedgerError::TransactionNotFound {
            txn_uuid: uuid("notfound123"),
            stored: None,
        })
    );
    assert!(engine.cancellation(&uuid("notfound123")).unwrap().is_none());
    assert!(engine.transactions().unwrap().is_empty());
}

#[test]
fn rollback_rejects_other_players_bet() {
    let engine = Engine::new();
    let alice = engine.create_player("Alice", dec!(100)).unwrap().id();
    let bob = engine.create_player("Bob", dec!(100)).unwrap().id();
    engine.apply_bet(alice, dec!(10), uuid("a")).unwrap();

    let result = engine.rollback_bet(uuid("a"), bob, dec!(10));

    assert_eq!(
        result,
        Err(LedgerError::PlayerMismatch {
            txn_uuid: uuid("a"),
            owner: alice,
            requested: bob,
        })
    );
    assert_eq!(engine.balance(bob).unwrap(), dec!(100));
    assert!(!engine.transaction(&uuid("a")).unwrap().rolled_back);
}

#[test]
fn rollback_rejects_wins() {
    let (engine, player) = engine_with_player(dec!(100));
    engine.apply_win(player, dec!(10), uuid("w")).unwrap();

    assert_eq!(
        engine.rollback_bet(uuid("w"), player, dec!(10)),
        Err(LedgerError::NotABet(uuid("w")))
    );
    assert_eq!(engine.balance(player).unwrap(), dec!(110));
}

#[test]
fn rollback_rejects_mismatched_amount() {
    let (engine, player) = engine_with_player(dec!(100));
    engine.apply_bet(player, dec!(10), uuid("a")).unwrap();

    assert_eq!(
        engine.rollback_bet(uuid("a"), player, dec!(20)),
        Err(LedgerError::AmountMismatch {
            txn_uuid: uuid("a"),
            recorded: dec!(10),
            requested: dec!(20),
        })
    );
    assert_eq!(engine.balance(player).unwrap(), dec!(90));
}

#[test]
fn rollback_accepts_equal_amount_with_different_scale() {
    let (engine, player) = engine_with_player(dec!(100));
    engine.apply_bet(player, dec!(10), uuid("a")).unwrap();

    let receipt = engine.rollback_bet(uuid("a"), player, dec!(10.00)).unwrap();
    assert_eq!(receipt.balance, dec!(100));
}

#[test]
fn rollback_rejects_non_positive_amount() {
    let (engine, player) = engine_with_player(dec!(100));
    assert_eq!(
        engine.rollback_bet(uuid("a"), player, dec!(0)),
        Err(LedgerError::InvalidAmount(dec!(0)))
    );
}

#[test]
fn rollback_past_max_balance_is_rejected() {
    let (engine, player) = engine_with_player(Decimal::MAX);
    engine.apply_bet(player, dec!(1), uuid("bet")).unwrap();
    engine.apply_win(player, dec!(1), uuid("win")).unwrap();

    let err = engine.rollback_bet(uuid("bet"), player, dec!(1)).unwrap_err();

    assert_eq!(
        err,
        LedgerError::BalanceOverflow {
            balance: Decimal::MAX,
            amount: dec!(1),
        }
    );
    assert_eq!(err.status_code(), 400);
    assert_eq!(engine.balance(player).unwrap(), Decimal::MAX);
    assert!(!engine.transaction(&uuid("bet")).unwrap().rolled_back);
    assert_eq!(engine.cancellation(&uuid("bet")).unwrap(), None);
    let history = engine.history(player).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|entry| !entry.rolled_back));
}

// === History ===

#[test]
fn scenario_bet_win_rollback_history() {
    let (engine, player) = engine_with_player(dec!(1000));

    assert_eq!(engine.apply_bet(player, dec!(100), uuid("a")).unwrap().balance, dec!(900));
    assert_eq!(engine.apply_win(player, dec!(50), uuid("b")).unwrap().balance, dec!(950));
    assert_eq!(
        engine.rollback_bet(uuid("a"), player, dec!(100)).unwrap().balance,
        dec!(1050)
    );

    let history = engine.history(player).unwrap();
    assert_eq!(history.len(), 2);

    assert_eq!(history[0].txn_uuid, uuid("a"));
    assert_eq!(history[0].kind, TransactionKind::Bet);
    assert_eq!(history[0].value, dec!(100));
    assert!(history[0].rolled_back);

    assert_eq!(history[1].txn_uuid, uuid("b"));
    assert_eq!(history[1].kind, TransactionKind::Win);
    assert_eq!(history[1].value, dec!(50));
    assert!(!history[1].rolled_back);
}

#[test]
fn history_includes_cancelled_unknown_bets() {
    let (engine, player) = engine_with_player(dec!(1000));
    engine.apply_bet(player, dec!(5), uuid("abcd")).unwrap();
    engine.apply_win(player, dec!(1000), uuid("efgh")).unwrap();
    engine.rollback_bet(uuid("ijkl"), player, dec!(20)).unwrap_err();

    let history = engine.history(player).unwrap();

    let summary: Vec<(String, TransactionKind, Decimal, bool)> = history
        .into_iter()
        .map(|e| (e.txn_uuid.to_string(), e.kind, e.value, e.rolled_back))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("abcd".to_string(), TransactionKind::Bet, dec!(5), false),
            ("efgh".to_string(), TransactionKind::Win, dec!(1000), false),
            ("ijkl".to_string(), TransactionKind::Bet, dec!(20), true),
        ]
    );
}

#[test]
fn history_only_lists_own_transactions() {
    let engine = Engine::new();
    let alice = engine.create_player("Alice", dec!(100)).unwrap().id();
    let bob = engine.create_player("Bob", dec!(100)).unwrap().id();
    engine.apply_bet(alice, dec!(1), uuid("a1")).unwrap();
    engine.apply_bet(bob, dec!(1), uuid("b1")).unwrap();
    engine.apply_win(alice, dec!(1), uuid("a2")).unwrap();

    let history = engine.history(alice).unwrap();
    let uuids: Vec<&str> = history.iter().map(|e| e.txn_uuid.as_str()).collect();
    assert_eq!(uuids, vec!["a1", "a2"]);
}

#[test]
fn history_of_unknown_player() {
    let engine = Engine::new();
    assert_eq!(
        engine.history(PlayerId(999)),
        Err(LedgerError::PlayerNotFound(PlayerId(999)))
    );
}

#[test]
fn history_of_new_player_is_empty() {
    let (engine, player) = engine_with_player(dec!(1));
    assert!(engine.history(player).unwrap().is_empty());
}

// === Player administration ===

#[test]
fn create_player_rejects_negative_balance() {
    let engine = Engine::new();
    assert_eq!(
        engine.create_player("Alice", dec!(-1)),
        Err(LedgerError::InvalidBalance(dec!(-1)))
    );
    assert!(engine.players().unwrap().is_empty());
}

#[test]
fn rename_player_keeps_balance() {
    let (engine, player) = engine_with_player(dec!(1000));
    engine.apply_bet(player, dec!(1), uuid("a")).unwrap();

    let renamed = engine.rename_player(player, "Maria da Silva").unwrap();

    assert_eq!(renamed.name(), "Maria da Silva");
    assert_eq!(renamed.balance(), dec!(999));
}

#[test]
fn rename_unknown_player() {
    let engine = Engine::new();
    assert_eq!(
        engine.rename_player(PlayerId(5), "Nobody"),
        Err(LedgerError::PlayerNotFound(PlayerId(5)))
    );
}

#[test]
fn delete_player_keeps_transactions() {
    let (engine, player) = engine_with_player(dec!(100));
    engine.apply_bet(player, dec!(10), uuid("a")).unwrap();

    let deleted = engine.delete_player(player).unwrap();

    assert_eq!(deleted.balance(), dec!(90));
    assert_eq!(engine.player(player), Err(LedgerError::PlayerNotFound(player)));
    assert_eq!(engine.history(player), Err(LedgerError::PlayerNotFound(player)));
    // The uuid stays taken
    assert_eq!(engine.transaction(&uuid("a")).unwrap().player_id, player);
}

#[test]
fn delete_unknown_player() {
    let engine = Engine::new();
    assert_eq!(
        engine.delete_player(PlayerId(999)),
        Err(LedgerError::PlayerNotFound(PlayerId(999)))
    );
}

#[test]
fn rollback_after_player_deleted() {
    let (engine, player) = engine_with_player(dec!(100));
    engine.apply_bet(player, dec!(10), uuid("a")).unwrap();
    engine.delete_player(player).unwrap();

    assert_eq!(
        engine.rollback_bet(uuid("a"), player, dec!(10)),
        Err(LedgerError::PlayerNotFound(player))
    );
    assert!(!engine.transaction(&uuid("a")).unwrap().rolled_back);
}

// === Queries ===

#[test]
fn transaction_lookup_by_uuid() {
    let (engine, player) = engine_with_player(dec!(100));
    engine.apply_bet(player, dec!(10), uuid("a")).unwrap();

    let record = engine.transaction(&uuid("a")).unwrap();
    assert_eq!(record.value_bet, dec!(10));
    assert_eq!(record.value_win, Decimal::ZERO);
    assert!(!record.rolled_back);

    assert_eq!(
        engine.transaction(&uuid("missing")),
        Err(LedgerError::TransactionNotFound {
            txn_uuid: uuid("missing"),
            stored: None,
        })
    );
}

#[test]
fn transactions_are_listed_in_creation_order() {
    let (engine, player) = engine_with_player(dec!(1000));
    engine.apply_bet(player, dec!(100), uuid("abc123")).unwrap();
    engine.apply_bet(player, dec!(200), uuid("def456")).unwrap();

    let values: Vec<Decimal> = engine
        .transactions()
        .unwrap()
        .iter()
        .map(|t| t.value_bet)
        .collect();
    assert_eq!(values, vec![dec!(100), dec!(200)]);
}

// === Request dispatch ===

#[test]
fn process_dispatches_requests() {
    let (engine, player) = engine_with_player(dec!(1000));

    let requests = [
        TransactionRequest::Bet {
            player_id: player,
            txn_uuid: uuid("a"),
            amount: dec!(100),
        },
        TransactionRequest::Win {
            player_id: player,
            txn_uuid: uuid("b"),
            amount: dec!(50),
        },
        TransactionRequest::Rollback {
            player_id: player,
            txn_uuid: uuid("a"),
            amount: dec!(100),
        },
    ];

    let balances: Vec<Decimal> = requests
        .into_iter()
        .map(|request| engine.process(request).unwrap())
        .collect();

    assert_eq!(balances, vec![dec!(900), dec!(950), dec!(1050)]);
}
