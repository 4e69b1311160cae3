//! Content hashing for dataset versioning.
//!
//! The digest covers the typed cell values of a loaded table, not the bytes
//! of the file it came from, so `1.50` and `1.5` in the source produce the
//! same hash while any changed cell produces a different one.

use serde::{Deserialize, Serialize};
use crate::table::{Table, Value};
use crate::Result;

/// Recorded in place of a digest when hashing fails
pub const HASH_UNAVAILABLE: &str = "hash_unavailable";

/// Outcome of hashing a table at ingest time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataHash {
    Computed(String),
    Unavailable,
}

impl DataHash {
    pub fn as_str(&self) -> &str {
        match self {
            DataHash::Computed(hex) => hex,
            DataHash::Unavailable => HASH_UNAVAILABLE,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, DataHash::Computed(_))
    }
}

impl std::fmt::Display for DataHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Produces a content digest for a table
pub trait ContentHasher {
    fn hash_table(&self, table: &Table) -> Result<String>;
}

/// blake3 digest over column names and typed cell values
#[derive(Debug, Default, Clone, Copy)]
pub struct Blake3Hasher;

impl ContentHasher for Blake3Hasher {
    fn hash_table(&self, table: &Table) -> Result<String> {
        let width = table.column_count();
        let mut hasher = blake3::Hasher::new();

        hasher.update(&(width as u64).to_le_bytes());
        for column in table.columns() {
            update_str(&mut hasher, column);
        }

        hasher.update(&(table.row_count() as u64).to_le_bytes());
        for row in table.rows() {
            for value in row {
                update_value(&mut hasher, value);
            }
        }

        Ok(hasher.finalize().to_hex().to_string())
    }
}

fn update_str(hasher: &mut blake3::Hasher, s: &str) {
    hasher.update(&(s.len() as u64).to_le_bytes());
    hasher.update(s.as_bytes());
}

fn update_value(hasher: &mut blake3::Hasher, value: &Value) {
    match value {
        Value::Null => {
            hasher.update(&[0]);
        }
        Value::Integer(i) => {
            hasher.update(&[1]);
            hasher.update(&i.to_le_bytes());
        }
        Value::Real(f) => {
            hasher.update(&[2]);
            hasher.update(&f.to_bits().to_le_bytes());
        }
        Value::Text(s) => {
            hasher.update(&[3]);
            update_str(hasher, s);
        }
    }
}

/// Hash a table, degrading to `DataHash::Unavailable` on failure
pub fn compute_data_hash(hasher: &dyn ContentHasher, table: &Table) -> DataHash {
    match hasher.hash_table(table) {
        Ok(hex) => DataHash::Computed(hex),
        Err(e) => {
            tracing::warn!("Could not calculate data hash: {}", e);
            DataHash::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(amount: f64) -> Table {
        Table::new(
            vec!["Time".into(), "Amount".into(), "Class".into()],
            vec![
                vec![Value::Integer(0), Value::Real(149.62), Value::Integer(0)],
                vec![Value::Integer(1), Value::Real(amount), Value::Integer(1)],
            ],
        )
        .unwrap()
    }

    struct FailingHasher;

    impl ContentHasher for FailingHasher {
        fn hash_table(&self, _table: &Table) -> Result<String> {
            Err(crate::Error::Unexpected("boom".into()))
        }
    }

    #[test]
    fn test_identical_content_same_hash() {
        let a = Blake3Hasher.hash_table(&sample(2.69)).unwrap();
        let b = Blake3Hasher.hash_table(&sample(2.69)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_changed_cell_changes_hash() {
        let a = Blake3Hasher.hash_table(&sample(2.69)).unwrap();
        let b = Blake3Hasher.hash_table(&sample(2.70)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_type_is_part_of_hash() {
        let int = Table::new(vec!["x".into()], vec![vec![Value::Integer(1)]]).unwrap();
        let text = Table::new(vec!["x".into()], vec![vec![Value::Text("1".into())]]).unwrap();
        assert_ne!(
            Blake3Hasher.hash_table(&int).unwrap(),
            Blake3Hasher.hash_table(&text).unwrap()
        );
    }

    #[test]
    fn test_failure_degrades_to_sentinel() {
        let hash = compute_data_hash(&FailingHasher, &sample(1.0));
        assert_eq!(hash, DataHash::Unavailable);
        assert_eq!(hash.as_str(), HASH_UNAVAILABLE);
        assert!(!hash.is_available());
    }
}
