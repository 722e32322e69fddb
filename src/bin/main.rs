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

use casino_ledger::{Engine, EngineConfig, LedgerError, PlayerId, TransactionRequest, TxnUuid};
use clap::Parser;
use csv::{ReaderBuilder, Trim, Writer};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

/// Casino Ledger - Replay bet, win and rollback CSV files
///
/// Seeds players from a CSV file, applies every transaction row in order
/// and writes the resulting balances (or one player's history) to stdout.
#[derive(Parser, Debug)]
#[command(name = "casino-ledger")]
#[command(about = "A player balance ledger that replays transaction CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with transactions
    ///
    /// Expected format: type,player,txn,amount
    /// Example: cargo run -- --players players.csv transactions.csv > balances.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Path to CSV file with players to create before replaying
    ///
    /// Expected format: name,balance. Players get ids 1, 2, ... in file order.
    #[arg(long, value_name = "FILE")]
    players: Option<PathBuf>,

    /// Print this player's history instead of all balances
    #[arg(long, value_name = "PLAYER")]
    history: Option<u64>,

    /// How long an operation waits for a busy player
    #[arg(long, value_name = "MS", default_value_t = 5000)]
    lock_timeout_ms: u64,

    /// Log more (-v: info, -vv: debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so stdout stays valid CSV
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    let config =
        EngineConfig::default().with_lock_timeout(Duration::from_millis(args.lock_timeout_ms));
    let engine = Engine::with_config(config);

    if let Some(path) = &args.players {
        let result = open(path).and_then(|file| {
            load_players(&engine, BufReader::new(file)).map_err(|e| e.to_string())
        });
        if let Err(e) = result {
            eprintln!("Error loading players from '{}': {}", path.display(), e);
            process::exit(1);
        }
    }

    let result = open(&args.input).and_then(|file| {
        process_transactions(&engine, BufReader::new(file)).map_err(|e| e.to_string())
    });
    if let Err(e) = result {
        eprintln!("Error processing transactions: {}", e);
        process::exit(1);
    }

    let written = match args.history {
        Some(player) => write_history(&engine, PlayerId(player), std::io::stdout()),
        None => write_players(&engine, std::io::stdout()),
    };
    if let Err(e) = written {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

fn open(path: &PathBuf) -> Result<File, String> {
    File::open(path).map_err(|e| format!("cannot open '{}': {}", path.display(), e))
}

/// Errors raised while reading input or writing output.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Raw player row: `name, balance`.
#[derive(Debug, Deserialize)]
struct PlayerRecord {
    name: String,
    balance: Decimal,
}

/// Raw transaction row: `type, player, txn, amount`.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    tx_type: String,
    player: u64,
    txn: String,
    #[serde(deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
}

impl CsvRecord {
    /// Converts the row into a request.
    ///
    /// Returns `None` for unknown types or a missing amount.
    fn into_request(self) -> Option<TransactionRequest> {
        let player_id = PlayerId(self.player);
        let txn_uuid = TxnUuid::from(self.txn);
        let amount = self.amount?;

        match self.tx_type.to_lowercase().as_str() {
            "bet" => Some(TransactionRequest::Bet {
                player_id,
                txn_uuid,
                amount,
            }),
            "win" => Some(TransactionRequest::Win {
                player_id,
                txn_uuid,
                amount,
            }),
            "rollback" => Some(TransactionRequest::Rollback {
                player_id,
                txn_uuid,
                amount,
            }),
            _ => None,
        }
    }
}

/// Creates one player per row, in order.
///
/// Rows with a negative balance or that fail to parse are skipped.
pub fn load_players<R: Read>(engine: &Engine, reader: R) -> Result<usize, CliError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .has_headers(true)
        .from_reader(reader);

    let mut created = 0;
    for result in rdr.deserialize::<PlayerRecord>() {
        match result {
            Ok(record) => match engine.create_player(record.name, record.balance) {
                Ok(_) => created += 1,
                Err(e @ LedgerError::InvalidBalance(_)) => warn!("Skipping player: {}", e),
                Err(e) => return Err(e.into()),
            },
            Err(e) => warn!("Skipping malformed player row: {}", e),
        }
    }
    Ok(created)
}

/// Applies transactions from a CSV reader.
///
/// Rows are streamed, so arbitrarily large files are fine. Malformed rows and
/// rejected requests are logged and skipped.
///
/// # CSV Format
///
/// Expected columns: `type, player, txn, amount`
/// - `type`: bet, win or rollback
/// - `player`: Player ID (u64)
/// - `txn`: Idempotency token; for rollbacks, the token of the bet to cancel
/// - `amount`: Decimal amount
///
/// # Example
///
/// ```csv
/// type,player,txn,amount
/// bet,1,a,100.0
/// win,1,b,50.0
/// rollback,1,a,100.0
/// ```
pub fn process_transactions<R: Read>(engine: &Engine, reader: R) -> Result<usize, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let mut applied = 0;
    for result in rdr.deserialize::<CsvRecord>() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping malformed row: {}", e);
                continue;
            }
        };

        let Some(request) = record.into_request() else {
            warn!("Skipping invalid transaction record");
            continue;
        };

        let txn_uuid = request.txn_uuid().clone();
        match engine.process(request) {
            Ok(balance) => {
                debug!(%txn_uuid, %balance, "processed row");
                applied += 1;
            }
            Err(e) => warn!(%txn_uuid, status = e.status_code(), "Skipping txn: {}", e),
        }
    }

    Ok(applied)
}

/// Writes every player as `id, name, balance`.
pub fn write_players<W: Write>(engine: &Engine, writer: W) -> Result<(), CliError> {
    let mut wtr = Writer::from_writer(writer);
    for player in engine.players()? {
        wtr.serialize(&player)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Writes one player's history as `txn_uuid, type, value, rolled_back`.
pub fn write_history<W: Write>(
    engine: &Engine,
    player_id: PlayerId,
    writer: W,
) -> Result<(), CliError> {
    let mut wtr = Writer::from_writer(writer);
    for entry in engine.history(player_id)? {
        wtr.serialize(&entry)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}
