//! In-memory tabular data
//!
//! A `Table` is the unit that moves between CSV files, the SQLite store and
//! callers. Cells use the same four storage classes SQLite does, so a table
//! read from a file, written to the database and queried back keeps its types.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use serde::Serialize;
use crate::{Error, Result};

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            Value::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Text written into a CSV field.
    ///
    /// Whole reals keep a fractional digit (`1000.0`) so re-reading the file
    /// infers the same column type.
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => format_real(*f),
            Value::Text(s) => s.clone(),
        }
    }
}

fn format_real(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        f.to_string()
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            other => write!(f, "{}", other.to_csv_field()),
        }
    }
}

impl From<&Value> for rusqlite::types::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => rusqlite::types::Value::Null,
            Value::Integer(i) => rusqlite::types::Value::Integer(*i),
            Value::Real(f) => rusqlite::types::Value::Real(*f),
            Value::Text(s) => rusqlite::types::Value::Text(s.clone()),
        }
    }
}

impl From<rusqlite::types::ValueRef<'_>> for Value {
    fn from(value: rusqlite::types::ValueRef<'_>) -> Self {
        use rusqlite::types::ValueRef;
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Value::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        }
    }
}

/// Column type inferred from CSV text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    fn infer<'a>(cells: impl Iterator<Item = &'a str>) -> Self {
        let mut ty = ColumnType::Integer;
        for cell in cells.map(str::trim).filter(|c| !c.is_empty()) {
            if ty == ColumnType::Integer && cell.parse::<i64>().is_err() {
                ty = ColumnType::Real;
            }
            if ty == ColumnType::Real && cell.parse::<f64>().is_err() {
                return ColumnType::Text;
            }
        }
        ty
    }

    fn parse(self, cell: &str) -> Value {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match self {
            ColumnType::Integer => trimmed.parse().map(Value::Integer).unwrap_or(Value::Null),
            ColumnType::Real => trimmed.parse().map(Value::Real).unwrap_or(Value::Null),
            ColumnType::Text => Value::Text(cell.to_string()),
        }
    }
}

/// Rename repeated header names to `name.1`, `name.2`, ...
///
/// Names are compared case-insensitively because SQLite column names are.
fn dedupe_headers(headers: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::new();
    for name in headers {
        let mut candidate = name.clone();
        while seen.contains(&candidate.to_lowercase()) {
            let n = suffixes.entry(name.to_lowercase()).or_insert(0);
            *n += 1;
            candidate = format!("{}.{}", name, n);
        }
        seen.insert(candidate.to_lowercase());
        columns.push(candidate);
    }
    columns
}

/// Rectangular table of named columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Build a table, rejecting rows whose width differs from the header
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(Error::Validation(format!(
                "row {} has {} cells, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, rows })
    }

    /// Read a CSV file with a header row, typing each column from its contents
    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)?;

        let columns = dedupe_headers(rdr.headers()?.iter().map(|h| h.trim().to_string()));

        let mut records = Vec::new();
        for record in rdr.records() {
            records.push(record?);
        }

        let types: Vec<ColumnType> = (0..columns.len())
            .map(|idx| ColumnType::infer(records.iter().map(|r| r.get(idx).unwrap_or(""))))
            .collect();

        let rows = records
            .iter()
            .map(|record| {
                types
                    .iter()
                    .enumerate()
                    .map(|(idx, ty)| ty.parse(record.get(idx).unwrap_or("")))
                    .collect()
            })
            .collect();

        Table::new(columns, rows)
    }

    /// Write the table to a CSV file, replacing any existing file
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(&self.columns)?;
        for row in &self.rows {
            wtr.write_record(row.iter().map(Value::to_csv_field))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when there are no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Value at `row` in column `name`
    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.column_index(name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// New table with only the named columns, in the given order
    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|name| {
                self.column_index(name)
                    .ok_or_else(|| Error::Validation(format!("no column named {}", name)))
            })
            .collect::<Result<Vec<usize>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table {
            columns: names.iter().map(|n| n.to_string()).collect(),
            rows,
        })
    }

    /// SQLite column type used when the table is written to the store
    pub fn declared_type(&self, idx: usize) -> &'static str {
        let mut ty = "INTEGER";
        for value in self.rows.iter().map(|r| &r[idx]) {
            match value {
                Value::Null | Value::Integer(_) => {}
                Value::Real(_) => ty = "REAL",
                Value::Text(_) => return "TEXT",
            }
        }
        ty
    }
}
