//! SQLite-backed session store.
//!
//! Persists one row per coaching session in a single database file at
//! `{root_dir}/braindoc.db3`. History reads feed the prompt builder's
//! journey context and the session history endpoint.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::parser::ParsedReply;
use crate::sentiment::Sentiment;

/// Database filename within the store root directory.
const DB_FILENAME: &str = "braindoc.db3";

pub(crate) const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Complete DDL for the session database.
///
/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
const SCHEMA_SQL: &str = r#"
-- Enable WAL mode for concurrent reads during writes.
PRAGMA journal_mode = WAL;

-- Schema version tracking.
CREATE TABLE IF NOT EXISTS schema_meta (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- One row per coaching session.
CREATE TABLE IF NOT EXISTS sessions (
    id               TEXT PRIMARY KEY,
    user_id          TEXT NOT NULL,
    situation        TEXT NOT NULL,
    sentiment        TEXT NOT NULL,      -- lowercase Sentiment label
    raw_reply        TEXT NOT NULL,
    quote            TEXT NOT NULL DEFAULT '',
    movie_scene      TEXT NOT NULL DEFAULT '',
    deep_meaning     TEXT NOT NULL DEFAULT '',
    actionable_path  TEXT NOT NULL DEFAULT '',
    affirmation      TEXT NOT NULL DEFAULT '',
    validation_score REAL NOT NULL DEFAULT 0,
    created_at       INTEGER NOT NULL DEFAULT 0
);

-- History reads are always per user, newest first.
CREATE INDEX IF NOT EXISTS idx_sessions_user_created ON sessions(user_id, created_at);
"#;

/// One persisted coaching session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub situation: String,
    pub sentiment: Sentiment,
    pub raw_reply: String,
    pub parsed: ParsedReply,
    pub validation_score: f64,
    pub created_at: u64,
}

/// Parameters for appending a new session row.
pub struct NewSession<'a> {
    pub user_id: &'a str,
    pub situation: &'a str,
    pub sentiment: Sentiment,
    pub raw_reply: &'a str,
    pub parsed: &'a ParsedReply,
    pub validation_score: f64,
}

/// SQLite-backed session store.
///
/// Thread-safe via an internal `Mutex<Connection>`. All writes are
/// serialized; reads can proceed concurrently with WAL mode on the
/// SQLite side, though we still acquire the mutex for simplicity.
pub struct SessionStore {
    root: PathBuf,
    conn: Mutex<Connection>,
}

impl SessionStore {
    /// Open (or create) the SQLite database at `{root_dir}/braindoc.db3`.
    ///
    /// Applies the schema if the database is new.
    pub fn open(root_dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root_dir).map_err(|e| StoreError::Io(e.to_string()))?;
        let db_path = root_dir.join(DB_FILENAME);
        let conn = Connection::open(&db_path).map_err(StoreError::Sqlite)?;
        apply_schema(&conn).map_err(StoreError::Sqlite)?;
        Ok(Self {
            root: root_dir.to_path_buf(),
            conn: Mutex::new(conn),
        })
    }

    /// Returns the root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read the current schema version from the database.
    pub fn schema_version(&self) -> Result<Option<u32>, StoreError> {
        let conn = self.lock()?;
        read_schema_version(&conn).map_err(StoreError::Sqlite)
    }

    /// Insert a session row and return its generated id.
    pub fn append(&self, s: &NewSession<'_>) -> Result<String, StoreError> {
        let conn = self.lock()?;
        let id = Uuid::new_v4().to_string();
        let now = now_epoch_secs();

        conn.execute(
            "INSERT INTO sessions \
             (id, user_id, situation, sentiment, raw_reply, quote, movie_scene, \
              deep_meaning, actionable_path, affirmation, validation_score, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                id,
                s.user_id,
                s.situation,
                s.sentiment.as_str(),
                s.raw_reply,
                s.parsed.quote,
                s.parsed.movie_scene,
                s.parsed.deep_meaning,
                s.parsed.actionable_path,
                s.parsed.affirmation,
                s.validation_score,
                now
            ],
        )
        .map_err(StoreError::Sqlite)?;

        Ok(id)
    }

    /// Most recent sessions for one user, newest first.
    ///
    /// Rows sharing a timestamp fall back to insertion order, so the
    /// result is deterministic even for back-to-back sessions.
    pub fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<SessionRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, situation, sentiment, raw_reply, quote, movie_scene, \
                 deep_meaning, actionable_path, affirmation, validation_score, created_at \
                 FROM sessions WHERE user_id = ?1 \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2",
            )
            .map_err(StoreError::Sqlite)?;
        let rows = stmt
            .query_map(params![user_id, limit as i64], row_to_record)
            .map_err(StoreError::Sqlite)?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r.map_err(StoreError::Sqlite)?);
        }
        Ok(records)
    }

    /// Number of stored sessions for one user.
    pub fn count(&self, user_id: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let n: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sessions WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .map_err(StoreError::Sqlite)?;
        Ok(n as u64)
    }

    /// Acquire the connection mutex.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }
}

/// Errors from the SQLite session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("lock poisoned: {0}")]
    Lock(String),
}

// ---------------------------------------------------------------------------
// Schema helpers
// ---------------------------------------------------------------------------

/// Apply the full schema to an open connection.
///
/// Safe to call multiple times. Seeds the schema version on a fresh
/// database and leaves an existing stamp untouched.
fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;

    let version_str = CURRENT_SCHEMA_VERSION.to_string();
    conn.execute(
        "INSERT OR IGNORE INTO schema_meta (key, value) VALUES ('schema_version', ?1)",
        params![version_str],
    )?;

    Ok(())
}

/// Read the current schema version from the database.
///
/// Returns `None` if the `schema_meta` table is empty or the key is missing.
fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<u32>> {
    let mut stmt = conn.prepare("SELECT value FROM schema_meta WHERE key = 'schema_version'")?;
    let mut rows = stmt.query([])?;
    match rows.next()? {
        Some(row) => {
            let val: String = row.get(0)?;
            Ok(val.parse::<u32>().ok())
        }
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Row conversion
// ---------------------------------------------------------------------------

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRecord> {
    let sentiment_str: String = row.get(3)?;

    Ok(SessionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        situation: row.get(2)?,
        sentiment: Sentiment::from_label(&sentiment_str).unwrap_or(Sentiment::Neutral),
        raw_reply: row.get(4)?,
        parsed: ParsedReply {
            quote: row.get(5)?,
            movie_scene: row.get(6)?,
            deep_meaning: row.get(7)?,
            actionable_path: row.get(8)?,
            affirmation: row.get(9)?,
        },
        validation_score: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn now_epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
