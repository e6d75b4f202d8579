//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables (a `.env` file is honoured). Every section has defaults that
//! reproduce the published 82610ENG setup, so an empty file is valid.
//!
//! ```toml
//! [source]
//! dataset_id = "82610ENG"
//!
//! [http]
//! max_attempts = 5
//!
//! [[reference]]
//! category = "Onshore Wind"
//! year = 2023
//! production = 17482
//! capacity = 6692
//! ```

use crate::analysis::extract::MetricColumns;
use crate::categories::{CategoryConflict, CategoryTable};
use crate::ingest::cbs::CBS_BASE_URL;
use crate::ingest::pagination::RetryPolicy;
use crate::model::{
    COL_CAPACITY_END_OF_YEAR, COL_NET_PRODUCTION, DATASET_ID, EnergySource, FIELD_ENERGY_SOURCE,
    FIELD_PERIODS,
};
use crate::reference::{ReferenceEntry, ReferenceTable};
use crate::verify::Tolerances;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid category table: {0}")]
    Category(#[from] CategoryConflict),
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub dataset_id: String,
    pub table: String,
    pub key_field: String,
    pub period_field: String,
    pub production_column: String,
    pub capacity_column: String,
    /// Raw energy source keys to request; empty fetches the whole table.
    pub filter_keys: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: CBS_BASE_URL.to_string(),
            dataset_id: DATASET_ID.to_string(),
            table: "TypedDataSet".to_string(),
            key_field: FIELD_ENERGY_SOURCE.to_string(),
            period_field: FIELD_PERIODS.to_string(),
            production_column: COL_NET_PRODUCTION.to_string(),
            capacity_column: COL_CAPACITY_END_OF_YEAR.to_string(),
            filter_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub initial_backoff_secs: u64,
    pub backoff_multiplier: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 90,
            max_attempts: 5,
            initial_backoff_secs: 2,
            backoff_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Rows for earlier years are dropped before export.
    pub min_year: Option<i32>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("CBS_Renewable_Data.xlsx"),
            min_year: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifyConfig {
    pub production_tolerance: f64,
    pub capacity_tolerance: f64,
    /// Reference year used by key discovery.
    pub discover_year: i32,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            production_tolerance: 1.0,
            capacity_tolerance: 1.0,
            discover_year: 2023,
        }
    }
}

/// `[[categories]]` entry: every key that identifies one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryKeys {
    pub category: EnergySource,
    pub keys: Vec<String>,
}

// ============================================================================
// Config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub http: HttpConfig,
    pub output: OutputConfig,
    pub verify: VerifyConfig,
    /// Replaces the built-in key registry when non-empty.
    pub categories: Vec<CategoryKeys>,
    /// Replaces the built-in reference values when non-empty.
    pub reference: Vec<ReferenceEntry>,
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml_str(&text)
            }
            None => Ok(Self::default()),
        }
    }

    /// Applies `CBS_BASE_URL`, `CBS_DATASET_ID` and `CBS_OUTPUT` from the
    /// process environment, loading `.env` first.
    pub fn apply_env(&mut self) {
        dotenv::dotenv().ok();
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CBS_BASE_URL").filter(|v| !v.trim().is_empty()) {
            self.source.base_url = url.trim().to_string();
        }
        if let Some(id) = lookup("CBS_DATASET_ID").filter(|v| !v.trim().is_empty()) {
            self.source.dataset_id = id.trim().to_string();
        }
        if let Some(path) = lookup("CBS_OUTPUT").filter(|v| !v.trim().is_empty()) {
            self.output.path = PathBuf::from(path.trim());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = url::Url::parse(&self.source.base_url) {
            return Err(ConfigError::Invalid(format!(
                "source.base_url {:?} is not a URL: {}",
                self.source.base_url, e
            )));
        }
        if self.http.max_attempts == 0 {
            return Err(ConfigError::Invalid("http.max_attempts must be at least 1".into()));
        }
        if self.http.timeout_secs == 0 {
            return Err(ConfigError::Invalid("http.timeout_secs must be at least 1".into()));
        }
        if !(self.verify.production_tolerance > 0.0 && self.verify.capacity_tolerance > 0.0) {
            return Err(ConfigError::Invalid("verify tolerances must be positive".into()));
        }
        self.category_table()?;
        Ok(())
    }

    pub fn category_table(&self) -> Result<CategoryTable, ConfigError> {
        if self.categories.is_empty() {
            return Ok(CategoryTable::from_registry());
        }
        let mut table = CategoryTable::new();
        for entry in &self.categories {
            for key in &entry.keys {
                table.insert(key, entry.category)?;
            }
        }
        Ok(table)
    }

    pub fn reference_table(&self) -> ReferenceTable {
        if self.reference.is_empty() {
            ReferenceTable::builtin()
        } else {
            ReferenceTable::from_entries(self.reference.iter().copied())
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.http.max_attempts,
            initial_delay: Duration::from_secs(self.http.initial_backoff_secs),
            multiplier: self.http.backoff_multiplier,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn metric_columns(&self) -> MetricColumns {
        MetricColumns {
            key_field: self.source.key_field.clone(),
            period_field: self.source.period_field.clone(),
            production: self.source.production_column.clone(),
            capacity: self.source.capacity_column.clone(),
        }
    }

    pub fn tolerances(&self) -> Tolerances {
        Tolerances {
            production: self.verify.production_tolerance,
            capacity: self.verify.capacity_tolerance,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
