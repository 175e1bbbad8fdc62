use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mace_models::signal_schema::{SignalQuery, SignalRow, SIGNAL_TABLE_DDL};
use rusqlite::{Connection, Row};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::StoreError;
use crate::store::SignalStore;

const RECENT_SIGNALS_SQL: &str = "\
SELECT agent_name, market_id, direction, fair_probability, confidence, key_drivers, metadata, created_at \
FROM agent_signals WHERE agent_name = ?1 AND market_id = ?2 \
ORDER BY created_at DESC, id DESC LIMIT ?3";

/// SQLite-backed signal store.
///
/// The database is written by the analysis pipeline; this struct reads it.
/// `rusqlite::Connection` is not `Sync`, so access is serialized through a
/// `Mutex` and queries run on the blocking pool.
pub struct SqliteSignalStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSignalStore {
    /// Open a read-only connection to an existing signal database.
    pub fn open(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn))
    }

    /// Open (or create) a writable database and ensure the schema exists.
    pub fn open_writable(path: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SIGNAL_TABLE_DDL)?;
        Ok(Self::from_connection(conn))
    }

    /// Open an in-memory database with the schema created. Useful for testing.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SIGNAL_TABLE_DDL)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Insert a signal row. In production the analysis pipeline writes rows;
    /// this is available for seeding and tests.
    pub fn insert(&self, row: &SignalRow) -> Result<(), StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
        conn.execute(
            "INSERT INTO agent_signals \
             (agent_name, market_id, direction, fair_probability, confidence, key_drivers, metadata, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                row.agent_name,
                row.market_id,
                row.direction,
                row.fair_probability,
                row.confidence,
                json_column(&row.key_drivers),
                json_column(&row.metadata),
                row.created_at,
            ],
        )?;
        Ok(())
    }

    /// Count all stored signals.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
        let count: usize =
            conn.query_row("SELECT COUNT(*) FROM agent_signals", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl SignalStore for SqliteSignalStore {
    async fn recent_signals(
        &self,
        query: &SignalQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<SignalRow>, StoreError> {
        let conn = Arc::clone(&self.conn);
        let query = query.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| StoreError::Unavailable(format!("SQLite mutex poisoned: {e}")))?;
            // The caller may have given up while we waited for the lock.
            if cancel.is_cancelled() {
                return Err(StoreError::Cancelled);
            }
            select_recent(&conn, &query, &cancel)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("query task failed: {e}")))?
    }
}

fn select_recent(
    conn: &Connection,
    query: &SignalQuery,
    cancel: &CancellationToken,
) -> Result<Vec<SignalRow>, StoreError> {
    let mut stmt = conn.prepare_cached(RECENT_SIGNALS_SQL)?;
    let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
    let mut rows = stmt.query(rusqlite::params![query.agent_name, query.market_id, limit])?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        out.push(map_row(row)?);
    }

    debug!(
        agent = %query.agent_name,
        market = %query.market_id,
        rows = out.len(),
        "Fetched recent signals"
    );
    Ok(out)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<SignalRow> {
    Ok(SignalRow {
        agent_name: row.get(0)?,
        market_id: row.get(1)?,
        direction: row.get(2)?,
        fair_probability: row.get(3)?,
        confidence: row.get(4)?,
        key_drivers: row
            .get::<_, Option<String>>(5)?
            .map(serde_json::Value::String),
        metadata: row
            .get::<_, Option<String>>(6)?
            .map(serde_json::Value::String),
        created_at: row.get(7)?,
    })
}

/// Text columns hold JSON; strings are stored as-is so pre-encoded values
/// are not double-encoded.
fn json_column(value: &Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn make_row(agent: &str, market: &str, minutes_ago: i64, probability: f64) -> SignalRow {
        SignalRow {
            agent_name: agent.to_string(),
            market_id: market.to_string(),
            direction: Some("YES".to_string()),
            fair_probability: Some(probability),
            confidence: Some(0.7),
            key_drivers: Some(serde_json::json!(["polling lead", "fundraising"])),
            metadata: Some(serde_json::json!({"model": "gpt-4"})),
            created_at: Some((Utc::now() - Duration::minutes(minutes_ago)).to_rfc3339()),
        }
    }

    #[tokio::test]
    async fn returns_newest_first_with_limit() {
        let store = SqliteSignalStore::open_in_memory().unwrap();
        store.insert(&make_row("momentum", "mkt-1", 30, 0.40)).unwrap();
        store.insert(&make_row("momentum", "mkt-1", 10, 0.60)).unwrap();
        store.insert(&make_row("momentum", "mkt-1", 20, 0.50)).unwrap();

        let rows = store
            .recent_signals(
                &SignalQuery::new("momentum", "mkt-1", 2),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fair_probability, Some(0.60));
        assert_eq!(rows[1].fair_probability, Some(0.50));
    }

    #[tokio::test]
    async fn filters_by_agent_and_market() {
        let store = SqliteSignalStore::open_in_memory().unwrap();
        store.insert(&make_row("momentum", "mkt-1", 10, 0.60)).unwrap();
        store.insert(&make_row("momentum", "mkt-2", 10, 0.60)).unwrap();
        store.insert(&make_row("breaking_news", "mkt-1", 10, 0.60)).unwrap();

        let rows = store
            .recent_signals(
                &SignalQuery::new("momentum", "mkt-1", 5),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[tokio::test]
    async fn json_columns_come_back_as_strings() {
        let store = SqliteSignalStore::open_in_memory().unwrap();
        store.insert(&make_row("momentum", "mkt-1", 10, 0.60)).unwrap();

        let rows = store
            .recent_signals(
                &SignalQuery::new("momentum", "mkt-1", 1),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let drivers = rows[0].key_drivers.as_ref().unwrap();
        let text = drivers.as_str().unwrap();
        let decoded: Vec<String> = serde_json::from_str(text).unwrap();
        assert_eq!(decoded, vec!["polling lead", "fundraising"]);
    }

    #[tokio::test]
    async fn cancelled_token_skips_query() {
        let store = SqliteSignalStore::open_in_memory().unwrap();
        store.insert(&make_row("momentum", "mkt-1", 10, 0.60)).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = store
            .recent_signals(&SignalQuery::new("momentum", "mkt-1", 1), cancel)
            .await;
        assert!(matches!(result, Err(StoreError::Cancelled)));
    }

    #[tokio::test]
    async fn nullable_columns_read_as_none() {
        let store = SqliteSignalStore::open_in_memory().unwrap();
        store
            .insert(&SignalRow {
                agent_name: "momentum".to_string(),
                market_id: "mkt-1".to_string(),
                ..SignalRow::default()
            })
            .unwrap();

        let rows = store
            .recent_signals(
                &SignalQuery::new("momentum", "mkt-1", 1),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].direction.is_none());
        assert!(rows[0].key_drivers.is_none());
        assert!(rows[0].created_at.is_none());
    }

    #[test]
    fn open_missing_file_read_only_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.db");
        let result = SqliteSignalStore::open(path.to_str().unwrap());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn writable_then_read_only_on_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("signals.db");
        let path_str = path.to_str().unwrap();

        let writer = SqliteSignalStore::open_writable(path_str).unwrap();
        writer.insert(&make_row("momentum", "mkt-1", 5, 0.55)).unwrap();

        let reader = SqliteSignalStore::open(path_str).unwrap();
        let rows = reader
            .recent_signals(
                &SignalQuery::new("momentum", "mkt-1", 3),
                CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
