//! Fraudstore CLI - Command-line interface for the transaction storage manager

use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use fraudstore::config::{self, StorageConfig};
use fraudstore::query::DEFAULT_HIGH_VALUE_THRESHOLD;
use fraudstore::storage::schema::REQUIRED_COLUMNS;
use fraudstore::ui::{self, Icons};
use fraudstore::{DataSummary, HashChange, MetadataStatus, StorageManager, Table, TransactionCounts};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Rows printed for a result set in human mode
const DISPLAY_ROWS: usize = 20;

#[derive(Parser)]
#[command(name = "fraudstore")]
#[command(version)]
#[command(about = "Local storage manager for credit-card transaction datasets")]
#[command(long_about = r#"
Fraudstore keeps a fraud-detection project's data in one place:
  • Immutable raw copies of ingested CSV files
  • A SQLite database with the latest transactions and processed stages
  • A JSON registry recording every ingest with a content hash

Example usage:
  fraudstore load --csv creditcard.csv --dataset creditcard_fraud_2013
  fraudstore counts
  fraudstore high-value --threshold 1000 --limit 5
  fraudstore query "SELECT AVG(Amount) FROM raw_transactions GROUP BY Class"
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Project root directory (overrides the config file)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Database file name without extension (overrides the config file)
    #[arg(long, global = true)]
    database: Option<String>,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a config file with the current root and database name
    Init {
        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Ingest a CSV and print counts, samples, statistics and a summary
    Demo {
        /// Path to the raw CSV file
        #[arg(long)]
        csv: PathBuf,

        /// Dataset name used for the raw copy and the registry
        #[arg(short, long, default_value = "creditcard_fraud_2013")]
        dataset: String,
    },

    /// Ingest a raw CSV file
    Load {
        /// Path to the raw CSV file
        #[arg(long)]
        csv: PathBuf,

        /// Dataset name used for the raw copy and the registry
        #[arg(short, long, default_value = "creditcard")]
        dataset: String,
    },

    /// Run an SQL statement against the database
    Query {
        /// SQL text
        sql: String,
    },

    /// Show fraud transactions (Class = 1)
    Fraud {
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Show legitimate transactions (Class = 0)
    Legit {
        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Show transactions with Amount >= threshold, largest first
    HighValue {
        #[arg(short, long, default_value_t = DEFAULT_HIGH_VALUE_THRESHOLD)]
        threshold: f64,

        #[arg(short, long)]
        limit: Option<u64>,
    },

    /// Show transactions with start <= Time <= end
    TimeRange {
        #[arg(long)]
        start: f64,

        #[arg(long)]
        end: f64,
    },

    /// Per-class amount statistics
    Stats,

    /// Total, fraud and legitimate counts with the fraud rate
    Counts,

    /// Save a CSV file as a processed stage
    Save {
        /// Path to the processed CSV file
        #[arg(long)]
        csv: PathBuf,

        /// Stage name, e.g. cleaned, engineered, scaled
        #[arg(short, long)]
        stage: String,
    },

    /// Tables in the database with their row counts
    Summary,

    /// Registry entries, optionally for one dataset
    History {
        #[arg(short, long)]
        dataset: Option<String>,

        /// Only the most recent entry for --dataset
        #[arg(long, requires = "dataset")]
        latest: bool,
    },
}

fn resolve_config(cli: &Cli) -> anyhow::Result<StorageConfig> {
    let mut config = config::load_config(cli.config.as_deref())?.unwrap_or_default();
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(database) = &cli.database {
        config.database_name = database.clone();
    }
    Ok(config)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_table(table: &Table, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(table);
    }
    if table.row_count() == 0 {
        println!("∅ No rows.");
    } else {
        println!("{}", ui::render_table(table, Some(DISPLAY_ROWS)));
    }
    Ok(())
}

fn print_counts(counts: &TransactionCounts) {
    let total = counts.total.to_string();
    let fraud = counts.fraud.to_string();
    let legitimate = counts.legitimate.to_string();
    let rate = format!("{}%", counts.fraud_rate);
    println!(
        "{}",
        ui::stats_table(&[
            ("Total transactions", total.as_str()),
            ("Fraud transactions", fraud.as_str()),
            ("Legitimate transactions", legitimate.as_str()),
            ("Fraud rate", rate.as_str()),
        ])
    );
}

fn short_hash(hash: &str) -> String {
    hash.chars().take(12).collect()
}

fn print_summary(summary: &DataSummary) {
    ui::status(Icons::DATABASE, "Database", &summary.database_path);
    let rows: Vec<(String, String)> = summary
        .tables
        .iter()
        .map(|(name, t)| (name.clone(), t.row_count.to_string()))
        .collect();
    let rows: Vec<(&str, &str)> = rows.iter().map(|(n, c)| (n.as_str(), c.as_str())).collect();
    if rows.is_empty() {
        println!("∅ No tables yet.");
    } else {
        println!("{}", ui::stats_table(&rows));
    }
}

fn load(manager: &StorageManager, csv: &Path, dataset: &str, json: bool) -> anyhow::Result<Table> {
    let spinner = ui::Spinner::new(&format!("Loading {}", csv.display()));
    let result = manager.load_raw(csv, dataset);
    let elapsed = spinner.finish();
    let outcome = result?;

    if json {
        print_json(&serde_json::json!({
            "dataset_name": dataset,
            "row_count": outcome.table.row_count(),
            "column_count": outcome.table.column_count(),
            "data_hash": outcome.data_hash.as_str(),
            "raw_path": outcome.raw_path.display().to_string(),
            "metadata_recorded": outcome.metadata.is_recorded(),
        }))?;
    } else {
        ui::success(&format!(
            "Data loaded: {} rows, {} columns",
            outcome.table.row_count(),
            outcome.table.column_count()
        ));
        ui::status(Icons::FILE, "Raw copy", &outcome.raw_path.display().to_string());
        ui::status(Icons::SEARCH, "Data hash", outcome.data_hash.as_str());
        if let MetadataStatus::NotRecorded(reason) = &outcome.metadata {
            ui::warn(&format!("Metadata not recorded: {}", reason));
        }
        ui::timing(&elapsed);
    }

    Ok(outcome.into_table())
}

fn run_demo(manager: &StorageManager, csv: &Path, dataset: &str) -> anyhow::Result<()> {
    ui::banner("FRAUD DETECTION PROJECT - DATA STORAGE SETUP");
    ui::status(Icons::FOLDER, "Project root", &manager.layout().root().display().to_string());

    load(manager, csv, dataset, false)?;

    ui::section("TRANSACTION COUNTS");
    print_counts(&manager.transaction_counts()?);

    ui::section("FRAUD TRANSACTIONS SAMPLE");
    let sample = manager.fraud_transactions(Some(5))?;
    print_table(&sample.select(REQUIRED_COLUMNS)?, false)?;

    ui::section("FRAUD STATISTICS");
    for stats in manager.fraud_statistics()? {
        ui::class_row(&stats.class, &format_class_stats(&stats));
    }

    ui::section(&format!("HIGH-VALUE TRANSACTIONS (>= {})", DEFAULT_HIGH_VALUE_THRESHOLD));
    let high_value = manager.high_value_transactions(DEFAULT_HIGH_VALUE_THRESHOLD, Some(5))?;
    println!("Found {} high-value transactions", high_value.row_count());
    if high_value.row_count() > 0 {
        print_table(&high_value.select(REQUIRED_COLUMNS)?, false)?;
    }

    ui::section("DATA STORAGE SUMMARY");
    print_summary(&manager.get_summary()?);

    println!();
    ui::success("Data storage setup complete!");
    ui::status(Icons::DATABASE, "Database location", &manager.database_path().display().to_string());
    Ok(())
}

fn format_amount(amount: Option<f64>) -> String {
    amount.map(|a| format!("{:.2}", a)).unwrap_or_else(|| "-".to_string())
}

fn format_class_stats(stats: &fraudstore::ClassStatistics) -> String {
    format!(
        "Class {}: count {}, avg {}, min {}, max {}",
        stats.class,
        stats.count,
        format_amount(stats.avg_amount),
        format_amount(stats.min_amount),
        format_amount(stats.max_amount)
    )
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = resolve_config(&cli)?;

    if let Commands::Init { force } = &cli.command {
        let path = cli.config.clone().unwrap_or_else(config::default_config_path);
        config.validate()?;
        config::write_config(&path, &config, *force)?;
        ui::success(&format!("Config written to {}", path.display()));
        return Ok(());
    }

    let manager = StorageManager::from_config(&config)?;
    let json = cli.json;

    match &cli.command {
        // Written before the manager exists
        Commands::Init { .. } => {}

        Commands::Demo { csv, dataset } => run_demo(&manager, csv, dataset)?,

        Commands::Load { csv, dataset } => {
            ui::header(&format!("Ingesting {} as {}", csv.display(), dataset));
            load(&manager, csv, dataset, json)?;
        }

        Commands::Query { sql } => print_table(&manager.run_query(sql)?, json)?,

        Commands::Fraud { limit } => print_table(&manager.fraud_transactions(*limit)?, json)?,

        Commands::Legit { limit } => print_table(&manager.legitimate_transactions(*limit)?, json)?,

        Commands::HighValue { threshold, limit } => {
            print_table(&manager.high_value_transactions(*threshold, *limit)?, json)?
        }

        Commands::TimeRange { start, end } => {
            print_table(&manager.transactions_in_time_range(*start, *end)?, json)?
        }

        Commands::Stats => {
            let stats = manager.fraud_statistics()?;
            if json {
                print_json(&stats)?;
            } else if stats.is_empty() {
                println!("∅ No transactions.");
            } else {
                ui::section("Amount statistics by class");
                for s in &stats {
                    ui::class_row(&s.class, &format_class_stats(s));
                }
            }
        }

        Commands::Counts => {
            let counts = manager.transaction_counts()?;
            if json {
                print_json(&counts)?;
            } else {
                print_counts(&counts);
            }
        }

        Commands::Save { csv, stage } => {
            let table = Table::from_csv_path(csv)?;
            let path = manager.save_processed(&table, stage)?;
            if json {
                print_json(&serde_json::json!({
                    "stage": stage,
                    "row_count": table.row_count(),
                    "path": path.display().to_string(),
                }))?;
            } else {
                ui::success(&format!("Processed data saved: {} ({} rows)", stage, table.row_count()));
                ui::status(Icons::FILE, "Path", &path.display().to_string());
            }
        }

        Commands::Summary => {
            let summary = manager.get_summary()?;
            if json {
                print_json(&summary)?;
            } else {
                ui::header("Data storage summary");
                print_summary(&summary);
            }
        }

        Commands::History { dataset, latest } => {
            let entries = match dataset {
                Some(name) if *latest => manager.latest_entry(name)?.into_iter().collect::<Vec<_>>(),
                Some(name) => manager.dataset_history(name)?,
                None => manager.registry_entries()?,
            };
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("∅ No ingests recorded.");
            } else {
                ui::section(&format!("{} Ingest history", Icons::HISTORY));
                let mut previous: HashMap<&str, &str> = HashMap::new();
                for entry in &entries {
                    let previous_hash = previous.get(entry.dataset_name.as_str()).copied();
                    let changed = HashChange::between(previous_hash, &entry.data_hash);
                    println!(
                        "- {} {} ({} rows, {} cols) {} [{}]",
                        entry.timestamp,
                        entry.dataset_name,
                        entry.row_count,
                        entry.column_count,
                        short_hash(&entry.data_hash),
                        changed.as_str()
                    );
                    previous.insert(&entry.dataset_name, &entry.data_hash);
                }
            }
        }
    }

    Ok(())
}
