//! Canned queries over the transactions table
//!
//! Each builder produces fixed SQL plus bound parameters. Numeric arguments
//! are checked at construction, so no caller value is ever spliced into SQL text.

use serde::Serialize;
use rusqlite::types::Value as SqlValue;
use crate::table::{Table, Value};
use crate::{Error, Result};

/// Amount above which a transaction counts as high-value unless the caller says otherwise
pub const DEFAULT_HIGH_VALUE_THRESHOLD: f64 = 1000.0;

const SELECT_BY_CLASS: &str = "SELECT * FROM raw_transactions WHERE Class = ?1";

const SELECT_HIGH_VALUE: &str =
    "SELECT * FROM raw_transactions WHERE Amount >= ?1 ORDER BY Amount DESC";

const SELECT_TIME_RANGE: &str =
    "SELECT * FROM raw_transactions WHERE Time >= ?1 AND Time <= ?2 ORDER BY Time";

const FRAUD_STATISTICS: &str = r#"
SELECT
    Class,
    COUNT(*) AS count,
    ROUND(AVG(Amount), 2) AS avg_amount,
    ROUND(MIN(Amount), 2) AS min_amount,
    ROUND(MAX(Amount), 2) AS max_amount
FROM raw_transactions
GROUP BY Class
ORDER BY Class
"#;

const TRANSACTION_COUNTS: &str = r#"
SELECT
    COUNT(*) AS total,
    COALESCE(SUM(CASE WHEN Class = 1 THEN 1 ELSE 0 END), 0) AS fraud,
    COALESCE(SUM(CASE WHEN Class = 0 THEN 1 ELSE 0 END), 0) AS legitimate
FROM raw_transactions
"#;

/// SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionQuery {
    sql: String,
    params: Vec<SqlValue>,
}

impl TransactionQuery {
    fn new(sql: &str, params: Vec<SqlValue>) -> Self {
        Self { sql: sql.trim().to_string(), params }
    }

    /// Append a `LIMIT` bound as the next positional parameter.
    ///
    /// `None` means no limit. `Some(0)` is a literal cap and yields no rows;
    /// it is not treated as "unlimited".
    fn with_limit(mut self, limit: Option<u64>) -> Self {
        if let Some(limit) = limit {
            self.params.push(SqlValue::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));
            self.sql = format!("{} LIMIT ?{}", self.sql, self.params.len());
        }
        self
    }

    /// Transactions labelled as fraud (`Class = 1`), at most `limit` rows when given
    pub fn fraud(limit: Option<u64>) -> Self {
        Self::new(SELECT_BY_CLASS, vec![SqlValue::Integer(1)]).with_limit(limit)
    }

    /// Transactions labelled as legitimate (`Class = 0`), at most `limit` rows when given
    pub fn legitimate(limit: Option<u64>) -> Self {
        Self::new(SELECT_BY_CLASS, vec![SqlValue::Integer(0)]).with_limit(limit)
    }

    /// Transactions with `Amount >= threshold`, largest first
    pub fn high_value(threshold: f64, limit: Option<u64>) -> Result<Self> {
        let threshold = finite("threshold", threshold)?;
        Ok(Self::new(SELECT_HIGH_VALUE, vec![SqlValue::Real(threshold)]).with_limit(limit))
    }

    /// Transactions with `start <= Time <= end`, in time order
    pub fn time_range(start: f64, end: f64) -> Result<Self> {
        let start = finite("start time", start)?;
        let end = finite("end time", end)?;
        Ok(Self::new(SELECT_TIME_RANGE, vec![SqlValue::Real(start), SqlValue::Real(end)]))
    }

    /// Per-class count and amount aggregates
    pub fn fraud_statistics() -> Self {
        Self::new(FRAUD_STATISTICS, Vec::new())
    }

    /// Total, fraud and legitimate counts
    pub fn transaction_counts() -> Self {
        Self::new(TRANSACTION_COUNTS, Vec::new())
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }
}

fn finite(what: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::Validation(format!("{} must be a finite number, got {}", what, value)))
    }
}

/// Amount aggregates for one class label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassStatistics {
    /// The group's label as stored; `Null` for rows with a blank Class
    pub class: Value,
    pub count: usize,
    pub avg_amount: Option<f64>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
}

impl ClassStatistics {
    /// Decode the result of `TransactionQuery::fraud_statistics`.
    ///
    /// Every group is kept, including ones whose label is null or not a number.
    pub fn from_table(table: &Table) -> Result<Vec<Self>> {
        if !table.has_column("Class") {
            return Err(Error::Unexpected("statistics result has no Class column".to_string()));
        }
        (0..table.row_count())
            .map(|row| -> Result<Self> {
                let class = table.value(row, "Class").cloned().unwrap_or(Value::Null);
                let count = table
                    .value(row, "count")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                let amount = |name: &str| table.value(row, name).and_then(|v| v.as_f64());
                Ok(Self {
                    class,
                    count: count as usize,
                    avg_amount: amount("avg_amount"),
                    min_amount: amount("min_amount"),
                    max_amount: amount("max_amount"),
                })
            })
            .collect()
    }
}

/// Class totals over the whole transactions table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionCounts {
    pub total: usize,
    pub fraud: usize,
    pub legitimate: usize,
    /// Percentage of fraud rows, rounded to 3 decimal places
    pub fraud_rate: f64,
}

impl TransactionCounts {
    pub fn new(total: usize, fraud: usize, legitimate: usize) -> Self {
        let fraud_rate = if total > 0 {
            round_to(fraud as f64 / total as f64 * 100.0, 3)
        } else {
            0.0
        };
        Self { total, fraud, legitimate, fraud_rate }
    }

    /// Decode the result of `TransactionQuery::transaction_counts`
    pub fn from_table(table: &Table) -> Result<Self> {
        let count = |name: &str| -> Result<usize> {
            table
                .value(0, name)
                .and_then(|v| v.as_i64())
                .map(|n| n as usize)
                .ok_or_else(|| Error::Unexpected(format!("count query returned no {} value", name)))
        };
        Ok(Self::new(count("total")?, count("fraud")?, count("legitimate")?))
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_bound() {
        let q = TransactionQuery::fraud(Some(5));
        assert_eq!(q.sql(), "SELECT * FROM raw_transactions WHERE Class = ?1 LIMIT ?2");
        assert_eq!(q.params(), &[SqlValue::Integer(1), SqlValue::Integer(5)]);

        let q = TransactionQuery::legitimate(None);
        assert_eq!(q.sql(), "SELECT * FROM raw_transactions WHERE Class = ?1");
        assert_eq!(q.params(), &[SqlValue::Integer(0)]);
    }

    #[test]
    fn test_high_value_sql() {
        let q = TransactionQuery::high_value(DEFAULT_HIGH_VALUE_THRESHOLD, Some(3)).unwrap();
        assert_eq!(
            q.sql(),
            "SELECT * FROM raw_transactions WHERE Amount >= ?1 ORDER BY Amount DESC LIMIT ?2"
        );
        assert_eq!(q.params()[0], SqlValue::Real(1000.0));
    }

    #[test]
    fn test_non_finite_arguments_rejected() {
        assert!(TransactionQuery::high_value(f64::NAN, None).is_err());
        let err = TransactionQuery::time_range(0.0, f64::INFINITY).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
    }

    #[test]
    fn test_fraud_rate() {
        assert_eq!(TransactionCounts::new(0, 0, 0).fraud_rate, 0.0);
        assert_eq!(TransactionCounts::new(10, 0, 10).fraud_rate, 0.0);
        assert_eq!(TransactionCounts::new(3, 1, 2).fraud_rate, 33.333);
        assert_eq!(TransactionCounts::new(284807, 492, 284315).fraud_rate, 0.173);
    }

    #[test]
    fn test_decode_statistics_keeps_null_class() {
        let table = Table::new(
            vec!["Class".into(), "count".into(), "avg_amount".into(), "min_amount".into(), "max_amount".into()],
            vec![
                vec![Value::Null, Value::Integer(1), Value::Real(30.0), Value::Real(30.0), Value::Real(30.0)],
                vec![Value::Integer(0), Value::Integer(1), Value::Real(10.0), Value::Real(10.0), Value::Real(10.0)],
            ],
        )
        .unwrap();

        let stats = ClassStatistics::from_table(&table).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].class, Value::Null);
        assert_eq!(stats[0].avg_amount, Some(30.0));
        assert_eq!(stats[1].class, Value::Integer(0));
    }

    #[test]
    fn test_decode_statistics() {
        let table = Table::new(
            vec!["Class".into(), "count".into(), "avg_amount".into(), "min_amount".into(), "max_amount".into()],
            vec![
                vec![Value::Integer(0), Value::Integer(2), Value::Real(5.5), Value::Real(1.0), Value::Real(10.0)],
                vec![Value::Integer(1), Value::Integer(1), Value::Real(3.0), Value::Real(3.0), Value::Real(3.0)],
            ],
        )
        .unwrap();

        let stats = ClassStatistics::from_table(&table).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].avg_amount, Some(5.5));
        assert_eq!(stats[1].class, Value::Integer(1));
    }
}
