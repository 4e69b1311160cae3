//! SQLite storage implementation

use std::path::Path;
use rusqlite::{Connection, params_from_iter};
use rusqlite::types::Value as SqlValue;
use crate::{Result, Error};
use crate::table::{Table, Value};
use super::schema;

/// A single connection to the project database.
///
/// Callers open one per operation and drop it when the operation is done.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    // ========== Table Replacement ==========

    /// Drop `name` if present and recreate it with the table's content.
    ///
    /// Runs in one transaction, so a failed insert leaves the previous table intact.
    pub fn replace_table(&mut self, name: &str, table: &Table) -> Result<()> {
        if table.column_count() == 0 {
            return Err(Error::Validation(format!("cannot store table {} without columns", name)));
        }

        let tx = self.conn.transaction()?;
        tx.execute(&format!("DROP TABLE IF EXISTS {}", schema::quote_identifier(name)), [])?;
        tx.execute(&schema::create_table_sql(name, table), [])?;
        {
            let mut stmt = tx.prepare(&schema::insert_sql(name, table.column_count()))?;
            for row in table.rows() {
                stmt.execute(params_from_iter(row.iter().map(SqlValue::from)))?;
            }
        }
        tx.commit()?;

        tracing::debug!("Replaced table {} with {} rows", name, table.row_count());
        Ok(())
    }

    /// (Re)build the lookup indexes on the transactions table
    pub fn create_transaction_indexes(&self) -> Result<()> {
        for stmt in schema::CREATE_TRANSACTION_INDEXES {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    // ========== Queries ==========

    /// Run arbitrary SQL and collect the result set.
    ///
    /// Any failure is reported as `Error::Query` carrying the SQL text.
    pub fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Table> {
        let as_query_error = |source: rusqlite::Error| Error::Query { sql: sql.to_string(), source };

        let mut stmt = self.conn.prepare(sql).map_err(as_query_error)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let mut rows = stmt.query(params_from_iter(params.iter())).map_err(as_query_error)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(as_query_error)? {
            let mut values = Vec::with_capacity(width);
            for idx in 0..width {
                values.push(Value::from(row.get_ref(idx).map_err(as_query_error)?));
            }
            out.push(values);
        }

        Table::new(columns, out)
    }

    /// Names of all user tables, sorted
    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(schema::LIST_TABLES)?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Count rows in a table
    pub fn count_rows(&self, name: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", schema::quote_identifier(name));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Names of indexes defined on a table
    pub fn index_names(&self, table: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 ORDER BY name"
        )?;
        let names = stmt
            .query_map([table], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn sample_table(amounts: &[f64]) -> Table {
        let rows = amounts
            .iter()
            .enumerate()
            .map(|(i, a)| vec![Value::Integer(i as i64), Value::Real(*a), Value::Integer((i % 2) as i64)])
            .collect();
        Table::new(vec!["Time".into(), "Amount".into(), "Class".into()], rows).unwrap()
    }

    #[test]
    fn test_replace_table_drops_previous_rows() {
        let mut store = SqliteStore::open_in_memory().unwrap();

        store.replace_table("raw_transactions", &sample_table(&[1.0, 2.0, 3.0])).unwrap();
        store.replace_table("raw_transactions", &sample_table(&[4.0])).unwrap();

        assert_eq!(store.count_rows("raw_transactions").unwrap(), 1);
    }

    #[test]
    fn test_query_returns_typed_values() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace_table("t", &sample_table(&[10.5, 20.0])).unwrap();

        let result = store
            .query("SELECT Time, Amount FROM t WHERE Amount > ?1", &[SqlValue::Real(15.0)])
            .unwrap();
        assert_eq!(result.columns(), &["Time", "Amount"]);
        assert_eq!(result.rows(), &[vec![Value::Integer(1), Value::Real(20.0)]]);
    }

    #[test]
    fn test_query_error_carries_sql() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store.query("SELECT * FROM missing_table", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Query);
        match err {
            Error::Query { sql, .. } => assert_eq!(sql, "SELECT * FROM missing_table"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_indexes_rebuilt_after_replace() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace_table("raw_transactions", &sample_table(&[1.0])).unwrap();
        store.create_transaction_indexes().unwrap();
        store.replace_table("raw_transactions", &sample_table(&[2.0])).unwrap();
        assert!(store.index_names("raw_transactions").unwrap().is_empty());

        store.create_transaction_indexes().unwrap();
        assert_eq!(
            store.index_names("raw_transactions").unwrap(),
            vec!["idx_amount", "idx_class", "idx_time"]
        );
    }

    #[test]
    fn test_list_tables() {
        let mut store = SqliteStore::open_in_memory().unwrap();
        store.replace_table("raw_transactions", &sample_table(&[1.0])).unwrap();
        store.replace_table("processed_cleaned", &sample_table(&[1.0])).unwrap();
        assert_eq!(
            store.list_tables().unwrap(),
            vec!["processed_cleaned", "raw_transactions"]
        );
    }
}
