pub mod audit;

pub use self::audit::{QueryLogEntry, spawn_audit_logger};

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;

use crate::db::Database;
use crate::error::AppError;

/// Length of the rolling usage window, in hours.
const WINDOW_HOURS: i64 = 24;

/// Per-identity usage record, one row per email.
#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub calls_in_window: i64,
}

/// Enforces a rolling daily call budget per authenticated identity.
///
/// `admit` and `record_usage` are deliberately decoupled: a call is recorded
/// only after a successful completion, so a failed completion does not
/// consume quota. Concurrent requests from one identity can therefore race
/// past the limit by the number of in-flight requests; that bounded
/// over-admission is accepted.
pub struct QuotaGuard {
    db: Database,
    daily_limit: i64,
}

impl QuotaGuard {
    pub fn new(db: Database, daily_limit: i64) -> Self {
        Self { db, daily_limit }
    }

    /// Create the usage record for an identity if it does not exist yet.
    /// Called during token issuance.
    pub fn provision(&self, email: &str) -> Result<(), AppError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO users (email, created_at, window_start, calls_in_window) \
                 VALUES (?1, ?2, ?2, 0)",
                params![email, now],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    /// Fetch the usage record for an identity, if one exists.
    pub fn get_record(&self, email: &str) -> Result<Option<UsageRecord>, AppError> {
        let row = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT email, created_at, window_start, calls_in_window \
                 FROM users WHERE email = ?1",
            )?;
            let record = stmt.query_row(params![email], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            });

            match record {
                Ok(r) => Ok(Some(r)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })?;

        let Some((email, created_at, window_start, calls_in_window)) = row else {
            return Ok(None);
        };

        Ok(Some(UsageRecord {
            email,
            created_at: parse_timestamp(&created_at)?,
            window_start: parse_timestamp(&window_start)?,
            calls_in_window,
        }))
    }

    /// Admit a call for an identity, resetting the window if it has elapsed.
    ///
    /// Fails `NotRegistered` when no record exists (the identity was never
    /// provisioned) and `QuotaExceeded` when the call count has reached the
    /// daily limit inside the current window.
    pub fn admit(&self, email: &str) -> Result<(), AppError> {
        let record = self
            .get_record(email)?
            .ok_or_else(|| AppError::NotRegistered(email.to_string()))?;

        let now = Utc::now();
        if now - record.window_start > Duration::hours(WINDOW_HOURS) {
            self.reset_window(email, now)?;
            return Ok(());
        }

        if record.calls_in_window >= self.daily_limit {
            tracing::info!(email = %email, calls = record.calls_in_window, "Quota exceeded");
            return Err(AppError::QuotaExceeded);
        }

        Ok(())
    }

    /// Record one billable call: an atomic increment at the store layer.
    pub fn record_usage(&self, email: &str) -> Result<(), AppError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET calls_in_window = calls_in_window + 1 WHERE email = ?1",
                params![email],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn reset_window(&self, email: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET window_start = ?1, calls_in_window = 0 WHERE email = ?2",
                params![now.to_rfc3339(), email],
            )?;
            Ok(())
        })?;
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::Database(format!("invalid timestamp '{raw}': {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
