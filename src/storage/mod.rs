//! Storage Layer - SQLite-backed persistence
//!
//! One database file per project, holding:
//! - raw_transactions: the latest ingested dataset, indexed on Class, Time, Amount
//! - processed_<stage>: checkpoints of transformed data

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteStore;
