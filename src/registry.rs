//! Append-only registry of ingest events
//!
//! Stored as `{"datasets": [...]}` in the project's metadata directory. Every
//! successful ingest adds one entry; nothing here rewrites or removes entries.

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use crate::hash::HASH_UNAVAILABLE;
use crate::Result;

/// One ingest event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub timestamp: String,
    pub dataset_name: String,
    pub data_hash: String,
    pub row_count: usize,
    pub column_count: usize,
    pub file_path: String,
}

impl RegistryEntry {
    /// Create an entry stamped with the current local time
    pub fn now(
        dataset_name: impl Into<String>,
        data_hash: impl Into<String>,
        row_count: usize,
        column_count: usize,
        file_path: &Path,
    ) -> Self {
        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            dataset_name: dataset_name.into(),
            data_hash: data_hash.into(),
            row_count,
            column_count,
            file_path: file_path.display().to_string(),
        }
    }
}

/// How an entry's hash compares with the previous entry for the same dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashChange {
    First,
    Unchanged,
    Changed,
    /// One of the two ingests was recorded without a hash
    Unknown,
}

impl HashChange {
    pub fn between(previous: Option<&str>, current: &str) -> Self {
        match previous {
            None => HashChange::First,
            Some(prev) if prev == HASH_UNAVAILABLE || current == HASH_UNAVAILABLE => HashChange::Unknown,
            Some(prev) if prev == current => HashChange::Unchanged,
            Some(_) => HashChange::Changed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HashChange::First => "first",
            HashChange::Unchanged => "unchanged",
            HashChange::Changed => "changed",
            HashChange::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    datasets: Vec<RegistryEntry>,
}

/// Handle to the registry file
#[derive(Debug, Clone)]
pub struct MetadataRegistry {
    path: PathBuf,
}

impl MetadataRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<RegistryDocument> {
        if !self.path.exists() {
            return Ok(RegistryDocument::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Read the existing document, add `entry` at the end and write it back
    pub fn append(&self, entry: RegistryEntry) -> Result<()> {
        let mut document = self.load()?;
        document.datasets.push(entry);
        let contents = serde_json::to_string_pretty(&document)?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    /// All entries in the order they were recorded
    pub fn entries(&self) -> Result<Vec<RegistryEntry>> {
        Ok(self.load()?.datasets)
    }

    /// Entries recorded for one dataset name, oldest first
    pub fn history(&self, dataset_name: &str) -> Result<Vec<RegistryEntry>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|e| e.dataset_name == dataset_name)
            .collect())
    }

    /// Most recent entry for a dataset name
    pub fn latest(&self, dataset_name: &str) -> Result<Option<RegistryEntry>> {
        Ok(self.history(dataset_name)?.pop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, hash: &str) -> RegistryEntry {
        RegistryEntry::now(name, hash, 10, 3, Path::new("/data/raw/x.csv"))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MetadataRegistry::new(dir.path().join("data_registry.json"));
        assert!(registry.entries().unwrap().is_empty());
        assert!(registry.latest("creditcard").unwrap().is_none());
    }

    #[test]
    fn test_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MetadataRegistry::new(dir.path().join("data_registry.json"));

        registry.append(entry("a", "h1")).unwrap();
        registry.append(entry("b", "h2")).unwrap();
        registry.append(entry("a", "h3")).unwrap();

        let hashes: Vec<String> = registry.entries().unwrap().into_iter().map(|e| e.data_hash).collect();
        assert_eq!(hashes, vec!["h1", "h2", "h3"]);
        assert_eq!(registry.history("a").unwrap().len(), 2);
        assert_eq!(registry.latest("a").unwrap().unwrap().data_hash, "h3");
    }

    #[test]
    fn test_document_shape() {
        let dir = tempfile::tempdir().unwrap();
        let registry = MetadataRegistry::new(dir.path().join("data_registry.json"));
        registry.append(entry("creditcard", "abc")).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(registry.path()).unwrap()).unwrap();
        let first = &raw["datasets"][0];
        for key in ["timestamp", "dataset_name", "data_hash", "row_count", "column_count", "file_path"] {
            assert!(first.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(first["row_count"], 10);
    }

    #[test]
    fn test_hash_change_with_missing_hashes() {
        assert_eq!(HashChange::between(None, "abc"), HashChange::First);
        assert_eq!(HashChange::between(Some("abc"), "abc"), HashChange::Unchanged);
        assert_eq!(HashChange::between(Some("abc"), "def"), HashChange::Changed);
        assert_eq!(HashChange::between(Some(HASH_UNAVAILABLE), HASH_UNAVAILABLE), HashChange::Unknown);
        assert_eq!(HashChange::between(Some("abc"), HASH_UNAVAILABLE), HashChange::Unknown);
        assert_eq!(HashChange::between(Some(HASH_UNAVAILABLE), "abc").as_str(), "unknown");
    }

    #[test]
    fn test_corrupt_file_fails_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data_registry.json");
        std::fs::write(&path, "not json").unwrap();

        let registry = MetadataRegistry::new(&path);
        assert!(registry.append(entry("a", "h")).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }
}
