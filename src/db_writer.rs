//! DB writer (C5): drains the event queue and persists rows to PostgreSQL,
//! reconnecting with exponential backoff on connection loss. Shutdown is
//! driven by the queue being closed and drained, not by a flag — once the
//! upstream workers stop producing and the queue is closed, `pop` returns
//! `EndOfStream` and this loop exits.

use std::time::Duration;

use postgres::{Client, NoTls};

use crate::config::Config;
use crate::event::{Event, EventKind};
use crate::queue::{BoundedQueue, Popped};

const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 30_000;

fn table_for_event<'a>(kind: EventKind, config: &'a Config) -> Option<&'a str> {
    match kind {
        EventKind::Pumpfun if !config.pumpfun_table.is_empty() => Some(&config.pumpfun_table),
        EventKind::Raydium if !config.raydium_table.is_empty() => Some(&config.raydium_table),
        _ => None,
    }
}

fn connect_with_backoff(conninfo: &str) -> Client {
    let mut backoff_ms = INITIAL_BACKOFF_MS;
    loop {
        match Client::connect(conninfo, NoTls) {
            Ok(client) => {
                tracing::info!("connected to PostgreSQL");
                return client;
            }
            Err(err) => {
                tracing::warn!(error = %err, backoff_ms, "DB connection failed, retrying");
                std::thread::sleep(Duration::from_millis(backoff_ms));
                backoff_ms = (backoff_ms * 2).min(MAX_BACKOFF_MS);
            }
        }
    }
}

/// Events whose `kind` has no configured table are silently dropped — they
/// still counted against the queue but carry nothing worth persisting.
fn insert_event(client: &mut Client, event: &Event, config: &Config) -> Result<(), postgres::Error> {
    let Some(table) = table_for_event(event.kind, config) else {
        return Ok(());
    };
    let query = format!(
        "INSERT INTO {table} (slot, signature, raw_log) VALUES ($1, $2, $3) ON CONFLICT DO NOTHING"
    );
    let slot = event.slot as i64;
    client.execute(query.as_str(), &[&slot, &event.signature, &event.data])?;
    Ok(())
}

/// Runs until the queue is closed and drained.
pub fn run(config: &Config, queue: &BoundedQueue) {
    let mut client = connect_with_backoff(&config.pg_conninfo);

    loop {
        let event = match queue.pop() {
            Popped::Event(event) => event,
            Popped::EndOfStream => break,
        };

        if let Err(err) = insert_event(&mut client, &event, config) {
            tracing::warn!(error = %err, "insert failed; reconnecting");
            client = connect_with_backoff(&config.pg_conninfo);
        }
    }
}
