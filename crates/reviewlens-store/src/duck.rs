//! DuckDB substrate: key/value state table plus a relational decision log.

use std::path::Path;
use std::sync::Mutex;

use duckdb::{params, Connection};
use reviewlens_core::{
    categorize_issue, decide_escalation, parse_timestamp, DecisionLogEntry, SystemState,
};
use tracing::info;

use crate::{StoreError, Substrate};

const STATE_KEY: &str = "system_state";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS system_state (
        key    VARCHAR PRIMARY KEY,
        value  VARCHAR NOT NULL
    );
    CREATE SEQUENCE IF NOT EXISTS decision_log_seq;
    CREATE TABLE IF NOT EXISTS decision_log (
        id                   BIGINT PRIMARY KEY DEFAULT nextval('decision_log_seq'),
        \"timestamp\"        VARCHAR NOT NULL,
        issue_category       VARCHAR NOT NULL,
        category_confidence  DOUBLE  NOT NULL,
        escalation_level     VARCHAR NOT NULL,
        escalation_reason    VARCHAR NOT NULL
    );
";

/// DuckDB-backed substrate.
///
/// The state is one JSON value in the `system_state` key/value table; each
/// decision is a row in `decision_log`. A commit upserts the state and
/// inserts the log row inside one transaction.
///
/// Use [`open`](Self::open) for in-memory and
/// [`open_persistent`](Self::open_persistent) for a database file that
/// survives restarts.
pub struct DuckSubstrate {
    conn: Mutex<Connection>,
}

impl DuckSubstrate {
    /// Open an in-memory database.
    pub fn open() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// Open or create a database file at `path`.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let store = Self::init(Connection::open(path)?)?;
        info!(path = %path.display(), "opened duckdb substrate");
        Ok(store)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Number of rows in `decision_log`.
    pub fn log_count(&self) -> Result<usize, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let mut stmt = conn.prepare("SELECT count(*)::BIGINT FROM decision_log")?;
        let count: i64 = stmt
            .query_map([], |row| row.get(0))?
            .next()
            .transpose()?
            .ok_or_else(|| StoreError::Other("count returned no rows".into()))?;
        Ok(count as usize)
    }
}

impl Substrate for DuckSubstrate {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn load_state(&self) -> Result<Option<SystemState>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let mut stmt = conn.prepare("SELECT value FROM system_state WHERE key = ?")?;
        let raw: Option<String> = stmt
            .query_map([STATE_KEY], |row| row.get(0))?
            .next()
            .transpose()?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn commit(&self, state: &SystemState, entry: &DecisionLogEntry) -> Result<(), StoreError> {
        let value = serde_json::to_string(state)?;
        let mut conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO system_state (key, value) VALUES (?, ?)",
            params![STATE_KEY, value],
        )?;
        tx.execute(
            "INSERT INTO decision_log (
                \"timestamp\", issue_category, category_confidence,
                escalation_level, escalation_reason
            ) VALUES (?, ?, ?, ?, ?)",
            params![
                entry.timestamp.to_rfc3339(),
                entry.issue_category.category.as_str(),
                entry.issue_category.confidence,
                entry.escalation.level.as_str(),
                entry.escalation.reason,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn log_entries(&self) -> Result<Vec<DecisionLogEntry>, StoreError> {
        let conn = self.conn.lock().map_err(|_| StoreError::Lock)?;
        let mut stmt = conn.prepare(
            "SELECT \"timestamp\", issue_category, category_confidence,
                    escalation_level, escalation_reason
             FROM decision_log ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(raw_ts, category, confidence, level, reason)| {
                let timestamp = parse_timestamp(&raw_ts)
                    .map_err(|e| StoreError::Other(format!("bad timestamp {raw_ts:?}: {e}")))?;
                let issue_category = categorize_issue(&category, confidence)
                    .map_err(|e| StoreError::Other(e.to_string()))?;
                let escalation = decide_escalation(&level, reason)
                    .map_err(|e| StoreError::Other(e.to_string()))?;
                Ok(DecisionLogEntry {
                    timestamp,
                    issue_category,
                    escalation,
                })
            })
            .collect()
    }
}
