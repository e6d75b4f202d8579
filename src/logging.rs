//! Structured logging for the CBS renewables pipeline
//!
//! Installs a `tracing` subscriber with console output and an optional
//! append-only log file, and provides the failure-classification and
//! summary helpers the pipeline logs through.

use crate::analysis::classify::DiscoveryIssue;
use crate::analysis::groupings::ClassificationSummary;
use crate::model::{EnergySource, FatalKind, FetchError};
use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt as tfmt};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Transient network trouble that outlasted the retry budget
    Expected,
    /// Indicates an API change, a bad URL, or a configuration issue
    Unexpected,
    /// Cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `min_level`. The log file, if any, is
/// opened in append mode and always carries timestamps. Calling this twice
/// keeps the first subscriber.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(min_level).into())
        .from_env_lossy();

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    let console = tfmt::layer().with_writer(std::io::stderr).with_target(false);
    layers.push(if console_timestamps {
        console.boxed()
    } else {
        console.without_time().boxed()
    });

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => layers.push(
                tfmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .boxed(),
            ),
            Err(e) => eprintln!("Failed to open log file {}: {}", path, e),
        }
    }

    // Err only if a subscriber is already installed (e.g. across tests).
    let _ = tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init();
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a failed fetch by its error kind.
pub fn classify_fetch_failure(err: &FetchError) -> FailureType {
    match err {
        FetchError::Exhausted { .. } => FailureType::Expected,
        FetchError::Fatal { kind, .. } => match kind {
            FatalKind::HttpStatus | FatalKind::Parse | FatalKind::InvalidUrl => FailureType::Unexpected,
            FatalKind::Request | FatalKind::LinkLoop => FailureType::Unknown,
        },
        FetchError::Client(_) => FailureType::Unexpected,
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a fetch failure once, with automatic classification.
pub fn log_fetch_failure(err: &FetchError) -> FailureType {
    let failure_type = classify_fetch_failure(err);
    match failure_type {
        FailureType::Expected => warn!(failure = %failure_type, "{}", err),
        FailureType::Unexpected | FailureType::Unknown => error!(failure = %failure_type, "{}", err),
    }
    failure_type
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log what classification kept and dropped.
pub fn log_classification_summary(summary: &ClassificationSummary) {
    if summary.dropped() == 0 && summary.coerced_values == 0 {
        info!(
            total = summary.total,
            kept = summary.kept,
            "all records classified"
        );
        return;
    }
    warn!(
        total = summary.total,
        kept = summary.kept,
        unknown_category = summary.unknown_category,
        no_year = summary.no_year,
        below_min_year = summary.below_min_year,
        duplicate_years = summary.duplicate_years,
        coerced_values = summary.coerced_values,
        "some records were dropped or zeroed"
    );
    if !summary.unknown_keys.is_empty() {
        let keys: Vec<&str> = summary.unknown_keys.iter().map(String::as_str).collect();
        debug!(keys = %keys.join(", "), "unclassified energy source keys");
    }
}

/// Log sources the discovery classifier could not bind.
pub fn log_unresolved_sources(unresolved: &[(EnergySource, DiscoveryIssue)]) {
    for (source, issue) in unresolved {
        warn!(%source, %issue, "energy source unresolved; its reference checks will fail");
    }
}
