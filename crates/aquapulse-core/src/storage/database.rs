//! SQLite-based intake log and reminder state storage.
//!
//! Provides persistent storage for:
//! - Logged drinks (the intake log daily stats are computed from)
//! - The reminder state, as JSON in a key-value table

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local, NaiveDate};
use rusqlite::{params, Connection};

use super::data_dir;
use crate::collaborators::StatePersistence;
use crate::error::{CoreError, DatabaseError, Result};
use crate::reminder::ReminderState;
use crate::stats::{DailyStats, IntakeEvent, IntakeSource};

const STATE_KEY: &str = "reminder_state";

/// SQLite database for the intake log and reminder state.
///
/// The connection sits behind a mutex so one handle can be shared with the
/// scheduler as its `StatePersistence`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open the database at `~/.config/aquapulse/aquapulse.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("aquapulse.db");
        Self::open_path(&path)
    }

    pub fn open_path(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        // The CLI and a running engine may share the file.
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.migrate()?;
        Ok(db)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::Locked)
    }

    fn migrate(&self) -> Result<(), DatabaseError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS intakes (
                    id         INTEGER PRIMARY KEY AUTOINCREMENT,
                    day        TEXT NOT NULL,
                    at         TEXT NOT NULL,
                    amount_ml  INTEGER NOT NULL,
                    source     TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS kv (
                    key   TEXT PRIMARY KEY,
                    value TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_intakes_day ON intakes(day);",
            )
            .map_err(|e| DatabaseError::MigrationFailed(e.to_string()))
    }

    /// Append a drink to the intake log.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub fn record_intake(&self, event: &IntakeEvent) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO intakes (day, at, amount_ml, source) VALUES (?1, ?2, ?3, ?4)",
            params![
                event.at.date_naive().format("%Y-%m-%d").to_string(),
                event.at.to_rfc3339(),
                event.amount_ml,
                event.source.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All drinks logged on a local calendar day, oldest first.
    pub fn intakes_on(&self, date: NaiveDate) -> Result<Vec<IntakeEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT at, amount_ml, source FROM intakes WHERE day = ?1 ORDER BY at, id",
        )?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u32>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (at, amount_ml, source) = row?;
            let at = DateTime::parse_from_rfc3339(&at)
                .map_err(|e| corrupt("intakes", e.to_string()))?
                .with_timezone(&Local);
            let source = IntakeSource::parse(&source)
                .ok_or_else(|| corrupt("intakes", format!("unknown source '{source}'")))?;
            events.push(IntakeEvent::new(at, amount_ml, source));
        }
        Ok(events)
    }

    /// Daily report for `date`. Reminder counters come from the stored state
    /// when it was last touched that day, otherwise they are zero.
    pub fn daily_stats(&self, date: NaiveDate, goal_ml: u32) -> Result<DailyStats> {
        let events = self.intakes_on(date)?;
        let (shown, complied) = match self.load_state()? {
            Some(state) if state.last_updated_at.date_naive() == date => {
                (state.today_shown, state.today_complied)
            }
            _ => (0, 0),
        };
        Ok(DailyStats::calculate(date, &events, goal_ml, shown, complied))
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT value FROM kv WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get::<_, String>(0));
        match result {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn load_state(&self) -> Result<Option<ReminderState>> {
        match self.kv_get(STATE_KEY)? {
            Some(json) => serde_json::from_str::<ReminderState>(&json)
                .map(Some)
                .map_err(|e| CoreError::from(corrupt("kv", format!("{STATE_KEY}: {e}")))),
            None => Ok(None),
        }
    }

    pub fn save_state(&self, state: &ReminderState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.kv_set(STATE_KEY, &json)
    }
}

impl StatePersistence for Database {
    fn save(&self, state: &ReminderState) -> Result<()> {
        self.save_state(state)
    }

    fn load(&self) -> Result<Option<ReminderState>> {
        self.load_state()
    }
}

fn corrupt(table: &str, message: String) -> DatabaseError {
    DatabaseError::Corrupt {
        table: table.to_string(),
        message,
    }
}
