//! Groups extracted records into per-source yearly series.

use crate::analysis::period::year_from_period;
use crate::categories::CategoryTable;
use crate::model::{Record, YearlySeries};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::warn;

/// What happened to each input record.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassificationSummary {
    pub total: usize,
    pub kept: usize,
    pub unknown_category: usize,
    pub no_year: usize,
    pub below_min_year: usize,
    pub duplicate_years: usize,
    /// Metric cells that were missing or non-numeric and became 0.
    pub coerced_values: usize,
    /// Distinct trimmed keys that matched no source.
    pub unknown_keys: BTreeSet<String>,
}

impl ClassificationSummary {
    pub fn dropped(&self) -> usize {
        self.total - self.kept
    }
}

/// Classifies, dates and inserts every record.
///
/// Pure: the same records and table always give the same series. Records
/// with unknown keys or non-annual periods are dropped and counted; for a
/// repeated (source, year) the first row is kept.
pub fn build_series(
    records: &[Record],
    table: &CategoryTable,
    min_year: Option<i32>,
) -> (YearlySeries, ClassificationSummary) {
    let mut series = YearlySeries::new();
    let mut summary = ClassificationSummary {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        let Some(source) = table.classify(&record.key) else {
            summary.unknown_category += 1;
            summary.unknown_keys.insert(record.key.trim().to_string());
            continue;
        };
        let Some(year) = year_from_period(&record.period) else {
            summary.no_year += 1;
            continue;
        };
        if min_year.is_some_and(|min| year < min) {
            summary.below_min_year += 1;
            continue;
        }
        if series.insert(source, year, record.metrics) {
            summary.kept += 1;
        } else {
            warn!(%source, year, key = record.key.trim(), "duplicate year, keeping first row");
            summary.duplicate_years += 1;
        }
    }

    (series, summary)
}
