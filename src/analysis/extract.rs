//! Metric extraction and numeric coercion.
//!
//! CBS exposes several suffixed variants of what reads like the same topic
//! (`NetProductionOfElectricity_3`, normalised wind production, ...). The
//! configured column names are used when present. If a dataset revision
//! renumbers a column, the fallback picks the column with the same stem and
//! the lowest numeric suffix, and never a normalised variant.

use crate::model::{Metric, Metrics, RawRecord, Record};
use serde_json::Value;

/// Which raw fields feed a `Record`.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricColumns {
    pub key_field: String,
    pub period_field: String,
    pub production: String,
    pub capacity: String,
}

/// A record plus how many of its metrics had to be defaulted to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub record: Record,
    pub coerced: usize,
}

impl MetricColumns {
    pub fn extract(&self, raw: &RawRecord) -> Extracted {
        let mut coerced = 0;
        let mut metric = |column: &str, m: Metric| match select_column(raw, column).and_then(coerce_number) {
            Some(v) => v * m.scale(),
            None => {
                coerced += 1;
                0.0
            }
        };
        let production = metric(&self.production, Metric::NetProduction);
        let capacity = metric(&self.capacity, Metric::InstalledCapacity);

        Extracted {
            record: Record {
                key: text_field(raw, &self.key_field),
                period: text_field(raw, &self.period_field),
                metrics: Metrics::new(production, capacity),
            },
            coerced,
        }
    }
}

/// Best-effort numeric reading of a JSON value.
///
/// Accepts numbers and numeric strings (CBS's UntypedDataSet sends every
/// cell as text, padded). `null`, blanks and CBS's `"."` placeholder for
/// suppressed cells give `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn text_field(raw: &RawRecord, field: &str) -> String {
    match raw.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn select_column<'r>(raw: &'r RawRecord, preferred: &str) -> Option<&'r Value> {
    if let Some(v) = raw.get(preferred) {
        return Some(v);
    }
    let stem = column_stem(preferred);
    raw.iter()
        .filter(|(name, _)| column_stem(name) == stem && !is_normalised(name))
        .min_by_key(|(name, _)| column_suffix(name).unwrap_or(u32::MAX))
        .map(|(_, v)| v)
}

fn column_stem(name: &str) -> &str {
    name.rsplit_once('_').map_or(name, |(stem, _)| stem)
}

fn column_suffix(name: &str) -> Option<u32> {
    name.rsplit_once('_').and_then(|(_, n)| n.parse().ok())
}

fn is_normalised(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("normalised") || lower.contains("normalized")
}
