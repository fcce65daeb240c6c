//! SQLite signal log
//!
//! `SqliteSignalStore` is a [`SignalObserver`]: every delivered signal is
//! appended to the `signals` table (see `/sql/`). The log is write-only
//! from the scanner's point of view; nothing in the detection path reads
//! it back.

use super::error::ScanError;
use super::notifier::SignalObserver;
use super::types::SignalRecord;
use rusqlite::{params, Connection};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Run schema migrations from SQL files
///
/// Reads all .sql files from the directory, sorted by name, and executes
/// them. Every file must be idempotent (`IF NOT EXISTS`).
///
/// Arguments:
/// - `conn`: SQLite connection
/// - `schema_dir`: Path to directory containing .sql files
pub fn run_schema_migrations(conn: &mut Connection, schema_dir: &str) -> Result<(), ScanError> {
    let schema_path = Path::new(schema_dir);

    if !schema_path.is_dir() {
        return Err(ScanError::Configuration(format!(
            "Schema directory not found: {}",
            schema_dir
        )));
    }

    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    log::info!("📊 SQLite journal mode: {}", mode);

    // Sorted so 01_, 02_, ... run in order
    let mut sql_files: Vec<_> = fs::read_dir(schema_path)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("sql"))
        .collect();
    sql_files.sort();

    log::info!("🔧 Running schema migrations from: {}", schema_dir);

    for path in sql_files {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        log::info!("   ├─ Executing: {}", filename);
        let sql_content = fs::read_to_string(&path)?;
        conn.execute_batch(&sql_content)?;
    }

    log::info!("   └─ ✅ Schema ready");
    Ok(())
}

/// One row of the `signals` table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSignal {
    pub id: i64,
    pub symbol: String,
    pub pair: String,
    pub kind: String,
    pub signal_type: String,
    pub signal_number: u32,
    pub price: f64,
    pub percentage: f64,
    pub initial_percentage: f64,
    pub previous_percentage: f64,
    pub volume_24h: f64,
    pub volume_category: String,
    pub trades_history: Vec<String>,
    pub cash_5min: f64,
    pub created_at: i64,
}

const SELECT_COLUMNS: &str = "id, symbol, pair, kind, signal_type, signal_number, price, percentage,
     initial_percentage, previous_percentage, volume_24h, volume_category,
     trades_history, cash_5min, created_at";

fn row_to_signal(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredSignal> {
    let history_json: String = row.get(12)?;
    Ok(StoredSignal {
        id: row.get(0)?,
        symbol: row.get(1)?,
        pair: row.get(2)?,
        kind: row.get(3)?,
        signal_type: row.get(4)?,
        signal_number: row.get(5)?,
        price: row.get(6)?,
        percentage: row.get(7)?,
        initial_percentage: row.get(8)?,
        previous_percentage: row.get(9)?,
        volume_24h: row.get(10)?,
        volume_category: row.get(11)?,
        // A corrupt history cell should not hide the rest of the row
        trades_history: serde_json::from_str(&history_json).unwrap_or_default(),
        cash_5min: row.get(13)?,
        created_at: row.get(14)?,
    })
}

/// SQLite-backed signal log
#[derive(Clone)]
pub struct SqliteSignalStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSignalStore {
    /// Open a database that already has the schema
    pub fn new(db_path: &str) -> Result<Self, ScanError> {
        let conn = Connection::open(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open (or create) a database and apply the schema files
    pub fn open_with_schema(db_path: &str, schema_dir: &str) -> Result<Self, ScanError> {
        let mut conn = Connection::open(db_path)?;
        run_schema_migrations(&mut conn, schema_dir)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one record
    pub fn insert_signal(&self, record: &SignalRecord) -> Result<i64, ScanError> {
        let history = serde_json::to_string(&record.trades_history)?;
        let conn = self.lock();

        conn.execute(
            r#"
            INSERT INTO signals (
                symbol, pair, kind, signal_type, signal_number,
                price, percentage, initial_percentage, previous_percentage,
                volume_24h, volume_category, trades_history, cash_5min, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.symbol,
                record.pair,
                record.kind.as_str(),
                record.signal_type(),
                record.signal_number,
                record.price,
                record.percentage,
                record.initial_percentage,
                record.previous_percentage,
                record.volume_24h,
                record.volume_category.as_str(),
                history,
                record.cash_5min,
                record.created_at,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Most recent signals, newest first
    pub fn recent_signals(&self, limit: usize) -> Result<Vec<StoredSignal>, ScanError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM signals ORDER BY created_at DESC, id DESC LIMIT ?",
            SELECT_COLUMNS
        ))?;

        let rows = stmt.query_map([limit as i64], row_to_signal)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Most recent signals of one symbol, newest first
    pub fn signals_for_symbol(&self, symbol: &str, limit: usize) -> Result<Vec<StoredSignal>, ScanError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM signals WHERE symbol = ? ORDER BY created_at DESC, id DESC LIMIT ?",
            SELECT_COLUMNS
        ))?;

        let rows = stmt.query_map(params![symbol, limit as i64], row_to_signal)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn count(&self) -> Result<i64, ScanError> {
        let conn = self.lock();
        Ok(conn.query_row("SELECT COUNT(*) FROM signals", [], |row| row.get(0))?)
    }
}

impl SignalObserver for SqliteSignalStore {
    fn on_signal(&self, record: &SignalRecord) -> Result<(), ScanError> {
        let id = self.insert_signal(record)?;
        log::debug!("💾 Stored signal #{} ({} {})", id, record.symbol, record.kind.as_str());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::{SignalKind, VolumeCategory};
    use tempfile::{NamedTempFile, TempDir};

    const SCHEMA: &str = include_str!("../../sql/01_signals.sql");

    fn create_test_db() -> Result<(NamedTempFile, SqliteSignalStore), Box<dyn std::error::Error>> {
        let temp_file = NamedTempFile::new()?;
        let db_path = temp_file.path().to_str().ok_or("non-utf8 temp path")?;

        let conn = Connection::open(db_path)?;
        conn.execute_batch(SCHEMA)?;
        drop(conn);

        let store = SqliteSignalStore::new(db_path)?;
        Ok((temp_file, store))
    }

    fn record(symbol: &str, signal_number: u32, created_at: i64) -> SignalRecord {
        SignalRecord {
            symbol: symbol.to_string(),
            pair: format!("{}_USDT", symbol),
            kind: if signal_number == 1 { SignalKind::New } else { SignalKind::FollowUp },
            signal_number,
            price: 0.0123,
            percentage: 61.0,
            initial_percentage: 40.0,
            previous_percentage: 40.0,
            volume_24h: 50_000.0,
            volume_category: VolumeCategory::Low,
            trades_history: vec!["15.11 01:13    +5,355.97  66.4% => 71.6% - V: % 15.9".to_string()],
            cash_5min: 8396.0,
            created_at,
        }
    }

    #[test]
    fn test_observer_inserts_row() {
        let (_temp, store) = create_test_db().unwrap();

        store.on_signal(&record("XYZ", 2, 1_700_000_000)).unwrap();

        let rows = store.recent_signals(10).unwrap();
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.symbol, "XYZ");
        assert_eq!(row.kind, "FOLLOW_UP");
        assert_eq!(row.signal_type, "second");
        assert_eq!(row.signal_number, 2);
        assert_eq!(row.volume_category, "low");
        assert_eq!(row.trades_history.len(), 1);
        assert!(row.trades_history[0].contains("+5,355.97"));
        assert_eq!(row.created_at, 1_700_000_000);
    }

    #[test]
    fn test_recent_signals_newest_first_with_limit() {
        let (_temp, store) = create_test_db().unwrap();
        for (i, symbol) in ["AAA", "BBB", "CCC"].iter().enumerate() {
            store.insert_signal(&record(symbol, 1, 1_700_000_000 + i as i64)).unwrap();
        }

        let rows = store.recent_signals(2).unwrap();
        let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["CCC", "BBB"]);
        assert_eq!(store.count().unwrap(), 3);
    }

    #[test]
    fn test_signals_for_symbol() {
        let (_temp, store) = create_test_db().unwrap();
        store.insert_signal(&record("XYZ", 1, 100)).unwrap();
        store.insert_signal(&record("ABC", 1, 150)).unwrap();
        store.insert_signal(&record("XYZ", 2, 200)).unwrap();

        let rows = store.signals_for_symbol("XYZ", 10).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].signal_number, 2);
        assert_eq!(rows[1].signal_number, 1);
    }

    #[test]
    fn test_missing_table_is_database_error() {
        let temp_file = NamedTempFile::new().unwrap();
        let store = SqliteSignalStore::new(temp_file.path().to_str().unwrap()).unwrap();

        let err = store.on_signal(&record("XYZ", 1, 100)).unwrap_err();
        assert!(matches!(err, ScanError::Database(_)));
    }

    #[test]
    fn test_schema_migrations_idempotent() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("01_signals.sql"), SCHEMA).unwrap();
        std::fs::write(dir.path().join("README.txt"), "not sql").unwrap();
        let db = dir.path().join("test.db");
        let db_path = db.to_str().unwrap();
        let schema_dir = dir.path().to_str().unwrap();

        let store = SqliteSignalStore::open_with_schema(db_path, schema_dir).unwrap();
        store.insert_signal(&record("XYZ", 1, 100)).unwrap();
        drop(store);

        // Second run must not fail or wipe data
        let store = SqliteSignalStore::open_with_schema(db_path, schema_dir).unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_missing_schema_dir() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = run_schema_migrations(&mut conn, "/definitely/not/here").unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));
    }
}
