//! Core data types for the CBS renewable electricity pipeline.
//!
//! This module defines the shared domain model imported by all other modules.
//! It contains no I/O: only types, the dataset's column identifiers, and the
//! fetch error enum.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Dataset identifiers
// ---------------------------------------------------------------------------

/// CBS table "Renewable electricity; production and capacity".
pub const DATASET_ID: &str = "82610ENG";

/// Dimension column holding the energy source key (e.g. `"E006590 "`).
pub const FIELD_ENERGY_SOURCE: &str = "EnergySourcesTechniques";

/// Dimension column holding the period code (e.g. `"2023JJ00"`).
pub const FIELD_PERIODS: &str = "Periods";

/// Net production of electricity, in mln kWh.
///
/// The dataset also carries a normalised production topic for wind; that
/// variant never matches published yearly totals and must not be used.
pub const COL_NET_PRODUCTION: &str = "NetProductionOfElectricity_3";

/// Electrical capacity at the end of the year, in MW.
pub const COL_CAPACITY_END_OF_YEAR: &str = "ElectricalCapacityEndOfYear_8";

/// One row of the OData `value` array, untouched.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// The energy sources exported to the workbook, one sheet each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EnergySource {
    #[serde(rename = "Solar")]
    Solar,
    #[serde(rename = "Onshore Wind")]
    OnshoreWind,
    #[serde(rename = "Offshore Wind")]
    OffshoreWind,
}

impl EnergySource {
    /// Sheet order in the exported workbook.
    pub const ALL: [EnergySource; 3] = [
        EnergySource::Solar,
        EnergySource::OnshoreWind,
        EnergySource::OffshoreWind,
    ];

    pub fn sheet_name(self) -> &'static str {
        match self {
            EnergySource::Solar => "Solar",
            EnergySource::OnshoreWind => "Onshore Wind",
            EnergySource::OffshoreWind => "Offshore Wind",
        }
    }

    pub fn from_sheet_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.sheet_name() == name.trim())
    }
}

impl fmt::Display for EnergySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// The two topics extracted per record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    NetProduction,
    InstalledCapacity,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::NetProduction, Metric::InstalledCapacity];

    /// Column header in the workbook, unit included.
    pub fn header(self) -> &'static str {
        match self {
            Metric::NetProduction => "Net Production (mln kWh)",
            Metric::InstalledCapacity => "Installed Capacity (MW)",
        }
    }

    /// Fixed factor applied to the raw CBS value to reach the declared unit.
    ///
    /// CBS publishes net production in mln kWh and capacity in MW already,
    /// so both are identity. Never derived from the data.
    pub fn scale(self) -> f64 {
        match self {
            Metric::NetProduction => 1.0,
            Metric::InstalledCapacity => 1.0,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// Production and capacity for one (source, year), in declared units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub production: f64,
    pub capacity: f64,
}

impl Metrics {
    pub fn new(production: f64, capacity: f64) -> Self {
        Self { production, capacity }
    }

    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::NetProduction => self.production,
            Metric::InstalledCapacity => self.capacity,
        }
    }
}

// ---------------------------------------------------------------------------
// Records and series
// ---------------------------------------------------------------------------

/// One dataset row after metric extraction.
///
/// `key` and `period` are kept exactly as received (CBS pads some keys with
/// trailing whitespace); trimming happens at lookup time.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub key: String,
    pub period: String,
    pub metrics: Metrics,
}

/// Per-source mapping from year to metrics.
///
/// Holds at most one entry per (source, year). The source emits one row per
/// source per year, so a second insert for the same year is rejected and left
/// to the caller to report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct YearlySeries {
    series: BTreeMap<EnergySource, BTreeMap<i32, Metrics>>,
}

impl YearlySeries {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a value; returns `false` and keeps the existing one if the
    /// year is already present for that source.
    pub fn insert(&mut self, source: EnergySource, year: i32, metrics: Metrics) -> bool {
        let years = self.series.entry(source).or_default();
        if years.contains_key(&year) {
            return false;
        }
        years.insert(year, metrics);
        true
    }

    pub fn get(&self, source: EnergySource, year: i32) -> Option<&Metrics> {
        self.series.get(&source).and_then(|years| years.get(&year))
    }

    /// All years for a source, ascending.
    pub fn years(&self, source: EnergySource) -> Option<&BTreeMap<i32, Metrics>> {
        self.series.get(&source)
    }

    pub fn contains_source(&self, source: EnergySource) -> bool {
        self.series.contains_key(&source)
    }

    pub fn sources(&self) -> impl Iterator<Item = EnergySource> + '_ {
        self.series.keys().copied()
    }

    /// Total number of (source, year) entries.
    pub fn len(&self) -> usize {
        self.series.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Why a page failed for good.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FatalKind {
    /// Non-success status other than 5xx/429.
    HttpStatus,
    /// Body was not an OData JSON page.
    Parse,
    /// Request could not be sent for a reason other than timeout or connect.
    Request,
    /// Configured base URL or continuation link does not parse.
    InvalidUrl,
    /// Continuation link points back at the page that returned it.
    LinkLoop,
}

impl fmt::Display for FatalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FatalKind::HttpStatus => "http-status",
            FatalKind::Parse => "parse",
            FatalKind::Request => "request",
            FatalKind::InvalidUrl => "invalid-url",
            FatalKind::LinkLoop => "link-loop",
        };
        f.write_str(name)
    }
}

/// Errors that end a dataset fetch. Any of these aborts the run; no partial
/// record set is ever returned.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
    /// A page kept failing with transient errors until the retry budget ran out.
    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
    /// A page failed in a way retrying cannot fix (4xx, malformed body).
    #[error("fatal error fetching {url} ({kind}): {message}")]
    Fatal {
        url: String,
        kind: FatalKind,
        message: String,
    },
}
