//! Storage manager - the single entry point for project data
//!
//! Owns the project directory tree and the database file. Every operation
//! that touches the database opens its own connection and closes it before
//! returning.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use regex::Regex;
use serde::Serialize;
use crate::config::{ProjectLayout, StorageConfig};
use crate::hash::{self, Blake3Hasher, ContentHasher, DataHash};
use crate::query::{ClassStatistics, TransactionCounts, TransactionQuery};
use crate::registry::{MetadataRegistry, RegistryEntry};
use crate::storage::schema::{self, RAW_TRANSACTIONS_TABLE, REQUIRED_COLUMNS};
use crate::storage::SqliteStore;
use crate::table::Table;
use crate::{Error, Result};

/// Whether an ingest made it into the metadata registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataStatus {
    Recorded,
    /// The registry could not be updated; the ingest itself succeeded
    NotRecorded(String),
}

impl MetadataStatus {
    pub fn is_recorded(&self) -> bool {
        matches!(self, MetadataStatus::Recorded)
    }
}

/// Result of a successful raw ingest
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// The table as loaded, not re-read from storage
    pub table: Table,
    pub data_hash: DataHash,
    /// Immutable copy written under `data/raw`
    pub raw_path: PathBuf,
    pub metadata: MetadataStatus,
}

impl LoadOutcome {
    pub fn into_table(self) -> Table {
        self.table
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub row_count: usize,
}

/// Tables currently in the database with their sizes
#[derive(Debug, Clone, Serialize)]
pub struct DataSummary {
    pub database_path: String,
    pub tables: BTreeMap<String, TableSummary>,
}

fn dataset_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("dataset name pattern is valid"))
}

fn stage_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("stage name pattern is valid"))
}

/// Manages data storage for a fraud-detection project
pub struct StorageManager {
    layout: ProjectLayout,
    registry: MetadataRegistry,
    hasher: Box<dyn ContentHasher>,
}

impl StorageManager {
    /// Create a manager rooted at `root` with the default database name
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        Self::from_config(&StorageConfig::with_root(root))
    }

    /// Create a manager from a config, ensuring the directory tree exists
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        config.validate().inspect_err(|e| tracing::error!("{}", e))?;
        let layout = ProjectLayout::new(config);
        layout.ensure().inspect_err(|e| {
            tracing::error!("Error creating directory structure at {}: {}", config.root.display(), e)
        })?;
        tracing::info!("Directory structure ready at {}", config.root.display());

        let registry = MetadataRegistry::new(layout.registry_path());
        Ok(Self {
            layout,
            registry,
            hasher: Box::new(Blake3Hasher),
        })
    }

    /// Replace the content hasher
    pub fn with_hasher(mut self, hasher: impl ContentHasher + 'static) -> Self {
        self.hasher = Box::new(hasher);
        self
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }

    pub fn database_path(&self) -> PathBuf {
        self.layout.database_path()
    }

    pub fn registry(&self) -> &MetadataRegistry {
        &self.registry
    }

    fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(&self.layout.database_path())
    }

    // ========== Ingestion ==========

    /// Load a raw CSV file into immutable storage, the database and the registry.
    ///
    /// Fails with `NotFound` when `source_path` does not exist and with
    /// `Validation` when the file is empty or lacks Time, Amount or Class.
    pub fn load_raw(&self, source_path: &Path, dataset_name: &str) -> Result<LoadOutcome> {
        tracing::info!("Loading data from: {}", source_path.display());

        if !source_path.exists() {
            let err = Error::NotFound(format!("CSV file not found: {}", source_path.display()));
            tracing::error!("File error: {}", err);
            return Err(err);
        }

        let table = Table::from_csv_path(source_path)
            .inspect_err(|e| tracing::error!("Could not read {}: {}", source_path.display(), e))?;

        self.ingest_table(table, dataset_name)
    }

    /// Ingest an already-loaded table under `dataset_name`.
    ///
    /// Steps run in order: hash, raw copy, `raw_transactions` replacement with
    /// its indexes, registry entry. Only the last step is allowed to fail
    /// without failing the ingest.
    pub fn ingest_table(&self, table: Table, dataset_name: &str) -> Result<LoadOutcome> {
        validate_dataset_name(dataset_name)
            .and_then(|_| validate_transactions(&table))
            .inspect_err(|e| tracing::error!("{}", e))?;

        tracing::info!(
            "Data loaded: {} rows, {} columns",
            table.row_count(),
            table.column_count()
        );

        let data_hash = hash::compute_data_hash(self.hasher.as_ref(), &table);

        let raw_path = self.layout.raw_dataset_path(dataset_name);
        table
            .write_csv(&raw_path)
            .inspect_err(|e| tracing::error!("Error writing {}: {}", raw_path.display(), e))?;
        tracing::info!("Raw data saved to: {}", raw_path.display());

        self.save_to_sqlite(&table, RAW_TRANSACTIONS_TABLE)?;

        let metadata = self.record_metadata(RegistryEntry::now(
            dataset_name,
            data_hash.as_str(),
            table.row_count(),
            table.column_count(),
            &raw_path,
        ));

        if let Some(rate) = class_mean(&table) {
            tracing::info!("Fraud rate: {:.3}%", rate * 100.0);
        }

        Ok(LoadOutcome {
            table,
            data_hash,
            raw_path,
            metadata,
        })
    }

    fn save_to_sqlite(&self, table: &Table, name: &str) -> Result<()> {
        let result = self.open_store().and_then(|mut store| {
            store.replace_table(name, table)?;
            if name == RAW_TRANSACTIONS_TABLE {
                store.create_transaction_indexes()?;
            }
            Ok(())
        });

        match &result {
            Ok(()) => tracing::info!("Data saved to SQLite table: {}", name),
            Err(e) => tracing::error!("Database error saving {}: {}", name, e),
        }
        result
    }

    fn record_metadata(&self, entry: RegistryEntry) -> MetadataStatus {
        match self.registry.append(entry) {
            Ok(()) => {
                tracing::info!("Metadata recorded in {}", self.registry.path().display());
                MetadataStatus::Recorded
            }
            Err(e) => {
                tracing::warn!("Could not record metadata: {}", e);
                MetadataStatus::NotRecorded(e.to_string())
            }
        }
    }

    // ========== Queries ==========

    /// Execute SQL against the database and return the result set
    pub fn run_query(&self, sql: &str) -> Result<Table> {
        self.open_store()
            .and_then(|store| store.query(sql, &[]))
            .inspect_err(|e| tracing::error!("SQL query error: {}", e))
    }

    /// Execute one of the canned transaction queries
    pub fn execute(&self, query: &TransactionQuery) -> Result<Table> {
        tracing::debug!("Executing: {}", query.sql());
        self.open_store()
            .and_then(|store| store.query(query.sql(), query.params()))
            .inspect_err(|e| tracing::error!("SQL query error: {}", e))
    }

    pub fn fraud_transactions(&self, limit: Option<u64>) -> Result<Table> {
        self.execute(&TransactionQuery::fraud(limit))
    }

    pub fn legitimate_transactions(&self, limit: Option<u64>) -> Result<Table> {
        self.execute(&TransactionQuery::legitimate(limit))
    }

    /// Transactions with `Amount >= threshold`, largest amount first
    pub fn high_value_transactions(&self, threshold: f64, limit: Option<u64>) -> Result<Table> {
        self.execute(&TransactionQuery::high_value(threshold, limit)?)
    }

    /// Transactions with `start <= Time <= end`, ordered by time
    pub fn transactions_in_time_range(&self, start: f64, end: f64) -> Result<Table> {
        self.execute(&TransactionQuery::time_range(start, end)?)
    }

    pub fn fraud_statistics(&self) -> Result<Vec<ClassStatistics>> {
        let table = self.execute(&TransactionQuery::fraud_statistics())?;
        ClassStatistics::from_table(&table)
    }

    pub fn transaction_counts(&self) -> Result<TransactionCounts> {
        let table = self.execute(&TransactionQuery::transaction_counts())?;
        TransactionCounts::from_table(&table)
    }

    // ========== Processed Data ==========

    /// Save a processed table as `data/processed/<stage>.csv` and `processed_<stage>`
    pub fn save_processed(&self, table: &Table, stage_name: &str) -> Result<PathBuf> {
        if !stage_name_pattern().is_match(stage_name) {
            let err = Error::Validation(format!(
                "invalid stage name {:?}: use letters, digits and underscores",
                stage_name
            ));
            tracing::error!("{}", err);
            return Err(err);
        }

        validate_unique_columns(table).inspect_err(|e| tracing::error!("{}", e))?;

        let output_path = self.layout.processed_stage_path(stage_name);
        table
            .write_csv(&output_path)
            .inspect_err(|e| tracing::error!("Error saving processed data: {}", e))?;
        self.save_to_sqlite(table, &schema::processed_table_name(stage_name))?;

        tracing::info!("Processed data saved: {}", stage_name);
        Ok(output_path)
    }

    // ========== Reporting ==========

    /// Row counts of every table in the database
    pub fn get_summary(&self) -> Result<DataSummary> {
        let database_path = self.layout.database_path();
        let result = self.open_store().and_then(|store| {
            let mut tables = BTreeMap::new();
            for name in store.list_tables()? {
                let row_count = store.count_rows(&name)?;
                tables.insert(name, TableSummary { row_count });
            }
            Ok(tables)
        });

        let tables = result.inspect_err(|e| tracing::error!("Error getting data summary: {}", e))?;
        Ok(DataSummary {
            database_path: database_path.display().to_string(),
            tables,
        })
    }

    /// Every registry entry, oldest first
    pub fn registry_entries(&self) -> Result<Vec<RegistryEntry>> {
        self.registry.entries()
    }

    pub fn dataset_history(&self, dataset_name: &str) -> Result<Vec<RegistryEntry>> {
        self.registry.history(dataset_name)
    }

    /// Most recent registry entry for a dataset, if it was ever ingested
    pub fn latest_entry(&self, dataset_name: &str) -> Result<Option<RegistryEntry>> {
        self.registry.latest(dataset_name)
    }
}

fn validate_dataset_name(name: &str) -> Result<()> {
    if dataset_name_pattern().is_match(name) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "invalid dataset name {:?}: use letters, digits, '.', '-' and '_'",
            name
        )))
    }
}

fn validate_transactions(table: &Table) -> Result<()> {
    if table.is_empty() {
        return Err(Error::Validation("CSV file is empty".to_string()));
    }

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|c| !table.has_column(c))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Validation(format!(
            "Missing required columns: [{}]",
            missing.join(", ")
        )));
    }
    validate_unique_columns(table)
}

/// SQLite compares column names case-insensitively, so `V1` and `v1` collide
fn validate_unique_columns(table: &Table) -> Result<()> {
    let mut seen = HashSet::new();
    for column in table.columns() {
        if !seen.insert(column.to_lowercase()) {
            return Err(Error::Validation(format!("duplicate column name: {}", column)));
        }
    }
    Ok(())
}

/// Mean of the Class column, i.e. the fraud share
fn class_mean(table: &Table) -> Option<f64> {
    let labels: Vec<f64> = table
        .column(schema::CLASS_COLUMN)?
        .into_iter()
        .filter_map(|v| v.as_f64())
        .collect();
    if labels.is_empty() {
        return None;
    }
    Some(labels.iter().sum::<f64>() / labels.len() as f64)
}
