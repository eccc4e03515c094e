use crate::domain::model::{Record, RecordSet};
use crate::domain::ports::TableSource;
use crate::utils::error::{DashError, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::{Number, Value};
use std::collections::HashSet;
use std::path::Path;

/// 唯讀 SQLite 連線；每次頁面渲染開一次，渲染結束即釋放
pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        tracing::debug!("Opening database {}", path.as_ref().display());
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    fn try_table_exists(&self, table: &str) -> Result<bool> {
        let found: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [table],
            |row| row.get(0),
        )?;
        Ok(found > 0)
    }

    fn try_columns(&self, table: &str) -> Result<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(distinct_columns(&names).into_iter().map(|(_, n)| n).collect())
    }

    fn try_row_count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

impl TableSource for SqliteSource {
    fn table_exists(&self, table: &str) -> bool {
        self.try_table_exists(table).unwrap_or_else(|e| {
            tracing::warn!("⚠️ Could not check table {}: {}", table, e);
            false
        })
    }

    fn columns(&self, table: &str) -> Vec<String> {
        self.try_columns(table).unwrap_or_else(|e| {
            tracing::warn!("⚠️ Could not read columns of {}: {}", table, e);
            Vec::new()
        })
    }

    fn row_count(&self, table: &str) -> usize {
        if !self.table_exists(table) {
            return 0;
        }
        self.try_row_count(table).unwrap_or_else(|e| {
            tracing::warn!("⚠️ Could not count rows of {}: {}", table, e);
            0
        })
    }

    fn load(&self, table: &str) -> Result<RecordSet> {
        if !self.try_table_exists(table)? {
            return Err(DashError::MissingTable {
                table: table.to_string(),
            });
        }

        let sql = format!("SELECT * FROM {}", quote_identifier(table));
        let mut stmt = self.conn.prepare(&sql)?;
        let columns = distinct_columns(&stmt.column_names());

        let mut set = RecordSet::new(columns.iter().map(|(_, c)| c.clone()).collect());
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let mut record = Record::new();
            for (i, column) in &columns {
                record = record.with(column, to_json(row.get_ref(*i)?));
            }
            set.push(record)?;
        }

        tracing::debug!("Loaded {} rows from {} ({:?})", set.len(), table, set.columns());
        Ok(set)
    }
}

/// 去除欄名前後空白；去空白後重名的欄位只保留第一個，回傳 (原始索引, 欄名)
fn distinct_columns<S: AsRef<str>>(names: &[S]) -> Vec<(usize, String)> {
    let mut seen = HashSet::new();
    names
        .iter()
        .enumerate()
        .filter_map(|(i, name)| {
            let trimmed = name.as_ref().trim().to_string();
            if seen.insert(trimmed.clone()) {
                Some((i, trimmed))
            } else {
                tracing::warn!("⚠️ Duplicate column '{}' ignored", trimmed);
                None
            }
        })
        .collect()
}

/// 識別字無法綁定參數，以雙引號包住並跳脫內部引號
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn seeded() -> (NamedTempFile, SqliteSource) {
        let file = NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(file.path()).unwrap();
            conn.execute_batch(
                "CREATE TABLE it_tickets (ticket_id INTEGER, \" Priority \" TEXT, status TEXT, cost REAL, notes TEXT);
                 INSERT INTO it_tickets VALUES (1, 'High', 'Open', 12.5, NULL);
                 INSERT INTO it_tickets VALUES (2, 'Low', 'Closed', NULL, 'printer');",
            )
            .unwrap();
        }
        let source = SqliteSource::open(file.path()).unwrap();
        (file, source)
    }

    #[test]
    fn test_introspection() {
        let (_file, source) = seeded();

        assert!(source.table_exists("it_tickets"));
        assert!(!source.table_exists("users"));
        assert!(!source.table_exists("it_tickets' OR '1'='1"));
        assert_eq!(
            source.columns("it_tickets"),
            vec!["ticket_id", "Priority", "status", "cost", "notes"]
        );
        assert!(source.columns("users").is_empty());
        assert_eq!(source.row_count("it_tickets"), 2);
        assert_eq!(source.row_count("users"), 0);
    }

    #[test]
    fn test_load_maps_sqlite_values() {
        let (_file, source) = seeded();
        let set = source.load("it_tickets").unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.columns()[1], "Priority");

        let first = &set.records()[0];
        assert_eq!(first.get("ticket_id"), Some(&Value::from(1)));
        assert_eq!(first.get("Priority"), Some(&Value::from("High")));
        assert_eq!(first.get("cost"), Some(&Value::from(12.5)));
        assert_eq!(first.get("notes"), Some(&Value::Null));
    }

    #[test]
    fn test_duplicate_columns_after_trim_keep_first() {
        let file = NamedTempFile::new().unwrap();
        {
            let conn = Connection::open(file.path()).unwrap();
            conn.execute_batch(
                "CREATE TABLE it_tickets (status TEXT, \" status\" TEXT, priority TEXT);
                 INSERT INTO it_tickets VALUES ('Open', 'Closed', 'High');",
            )
            .unwrap();
        }
        let source = SqliteSource::open(file.path()).unwrap();

        assert_eq!(source.columns("it_tickets"), vec!["status", "priority"]);
        let set = source.load("it_tickets").unwrap();
        assert_eq!(set.columns(), ["status".to_string(), "priority".to_string()]);
        assert_eq!(set.records()[0].get("status"), Some(&Value::from("Open")));
        assert_eq!(set.records()[0].get("priority"), Some(&Value::from("High")));
    }

    #[test]
    fn test_load_missing_table() {
        let (_file, source) = seeded();
        assert!(matches!(
            source.load("cyber_incidents"),
            Err(DashError::MissingTable { .. })
        ));
    }

    #[test]
    fn test_open_missing_file_fails() {
        assert!(matches!(
            SqliteSource::open("/nonexistent/dir/platform.db"),
            Err(DashError::QueryFailure(_))
        ));
    }
}
