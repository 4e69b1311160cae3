//! Database schema definitions

use crate::table::Table;

/// Table holding the most recently ingested raw dataset
pub const RAW_TRANSACTIONS_TABLE: &str = "raw_transactions";

/// Prefix of tables mirroring processed-stage checkpoints
pub const PROCESSED_TABLE_PREFIX: &str = "processed_";

pub const TIME_COLUMN: &str = "Time";
pub const AMOUNT_COLUMN: &str = "Amount";
pub const CLASS_COLUMN: &str = "Class";

/// Columns every raw dataset must provide
pub const REQUIRED_COLUMNS: &[&str] = &[TIME_COLUMN, AMOUNT_COLUMN, CLASS_COLUMN];

/// SQL to create the lookup indexes on the transactions table
pub const CREATE_TRANSACTION_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_class ON raw_transactions(Class)",
    "CREATE INDEX IF NOT EXISTS idx_time ON raw_transactions(Time)",
    "CREATE INDEX IF NOT EXISTS idx_amount ON raw_transactions(Amount)",
];

/// SQL to list user tables
pub const LIST_TABLES: &str =
    "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

/// Name of the table mirroring a processed stage
pub fn processed_table_name(stage_name: &str) -> String {
    format!("{}{}", PROCESSED_TABLE_PREFIX, stage_name)
}

/// Quote an identifier for interpolation into SQL
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// CREATE TABLE statement matching the table's columns and value types
pub fn create_table_sql(name: &str, table: &Table) -> String {
    let columns: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| format!("{} {}", quote_identifier(column), table.declared_type(idx)))
        .collect();
    format!("CREATE TABLE {} ({})", quote_identifier(name), columns.join(", "))
}

/// INSERT statement with one positional parameter per column
pub fn insert_sql(name: &str, width: usize) -> String {
    let placeholders: Vec<String> = (1..=width).map(|i| format!("?{}", i)).collect();
    format!("INSERT INTO {} VALUES ({})", quote_identifier(name), placeholders.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;

    #[test]
    fn test_create_table_sql() {
        let table = Table::new(
            vec!["Time".into(), "Amount".into(), "Note".into()],
            vec![vec![Value::Integer(0), Value::Real(1.5), Value::Text("x".into())]],
        )
        .unwrap();
        assert_eq!(
            create_table_sql("raw_transactions", &table),
            r#"CREATE TABLE "raw_transactions" ("Time" INTEGER, "Amount" REAL, "Note" TEXT)"#
        );
    }

    #[test]
    fn test_identifiers_escaped() {
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
        assert_eq!(insert_sql("t", 3), r#"INSERT INTO "t" VALUES (?1, ?2, ?3)"#);
        assert_eq!(processed_table_name("cleaned"), "processed_cleaned");
    }
}
