use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use crate::Error;

pub const DEFAULT_ROOT: &str = "./fraud_detection_project";
pub const DEFAULT_DATABASE_NAME: &str = "fraud_detection";
pub const REGISTRY_FILE_NAME: &str = "data_registry.json";

/// Directories created under the project root, relative to it
pub const PROJECT_DIRECTORIES: &[&str] = &[
    "data/raw",
    "data/processed",
    "data/features",
    "data/predictions",
    "database",
    "metadata",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub database_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_ROOT),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Reject database names that would leave `<root>/database`
    pub fn validate(&self) -> crate::Result<()> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN
            .get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("database name pattern is valid"));
        if pattern.is_match(&self.database_name) {
            Ok(())
        } else {
            Err(Error::Validation(format!(
                "invalid database name {:?}: use letters, digits, '-' and '_'",
                self.database_name
            )))
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("fraudstore.toml")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<StorageConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: StorageConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &StorageConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Paths of the project directory tree
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
    database_name: String,
}

impl ProjectLayout {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: config.root.clone(),
            database_name: config.database_name.clone(),
        }
    }

    /// Create every missing directory level. Existing directories are left alone.
    pub fn ensure(&self) -> std::io::Result<()> {
        for dir in PROJECT_DIRECTORIES {
            std::fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.root.join("data").join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.root.join("data").join("processed")
    }

    pub fn features_dir(&self) -> PathBuf {
        self.root.join("data").join("features")
    }

    pub fn predictions_dir(&self) -> PathBuf {
        self.root.join("data").join("predictions")
    }

    pub fn database_path(&self) -> PathBuf {
        self.root
            .join("database")
            .join(format!("{}.db", self.database_name))
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.join("metadata").join(REGISTRY_FILE_NAME)
    }

    pub fn raw_dataset_path(&self, dataset_name: &str) -> PathBuf {
        self.raw_dir().join(format!("{}.csv", dataset_name))
    }

    pub fn processed_stage_path(&self, stage_name: &str) -> PathBuf {
        self.processed_dir().join(format!("{}.csv", stage_name))
    }
}
