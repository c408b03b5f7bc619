//! Best-effort query audit log.
//!
//! Handlers send entries over an unbounded channel and never wait on the
//! write; a background task batches inserts to keep the write lock short.
//! Losing an entry on a crash is acceptable, blocking a response is not.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};

use crate::db::Database;

const BATCH_SIZE: usize = 100;
const FLUSH_INTERVAL: Duration = Duration::from_secs(1);

/// One logged query, written after the response has been produced.
#[derive(Debug, Clone)]
pub struct QueryLogEntry {
    pub email: String,
    pub prompt: String,
    pub os: String,
    pub existing_script: String,
    pub response: String,
    pub action_type: String,
}

/// Spawn the audit writer task. Entries are flushed when the batch fills,
/// on a timer tick, and once more when the channel closes.
pub fn spawn_audit_logger(
    db: Database,
    mut rx: mpsc::UnboundedReceiver<QueryLogEntry>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut batch: Vec<QueryLogEntry> = Vec::with_capacity(BATCH_SIZE);
        let mut ticker = interval(FLUSH_INTERVAL);

        loop {
            tokio::select! {
                entry = rx.recv() => {
                    match entry {
                        Some(entry) => {
                            batch.push(entry);
                            if batch.len() >= BATCH_SIZE {
                                flush_batch(&db, &mut batch);
                            }
                        }
                        None => {
                            flush_batch(&db, &mut batch);
                            break;
                        }
                    }
                }
                _ = ticker.tick() => {
                    flush_batch(&db, &mut batch);
                }
            }
        }
    })
}

fn flush_batch(db: &Database, batch: &mut Vec<QueryLogEntry>) {
    if batch.is_empty() {
        return;
    }

    let entries = std::mem::take(batch);
    let count = entries.len();

    if let Err(e) = write_entries(db, &entries) {
        tracing::warn!(count, error = %e, "Failed to write audit log batch");
    } else {
        tracing::debug!(count, "Flushed audit log batch");
    }
}

fn write_entries(db: &Database, entries: &[QueryLogEntry]) -> Result<(), rusqlite::Error> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO query_log (id, email, prompt, os, script, response, action_type) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for entry in entries {
                stmt.execute(rusqlite::params![
                    uuid::Uuid::new_v4().to_string(),
                    entry.email,
                    entry.prompt,
                    entry.os,
                    entry.existing_script,
                    entry.response,
                    entry.action_type,
                ])?;
            }
        }
        tx.commit()
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
