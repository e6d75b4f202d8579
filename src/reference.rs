//! Published reference values used to validate the pipeline output.
//!
//! Figures are the CBS yearly totals for 2022-2024 (production in mln kWh,
//! capacity in MW). The table is built once and never mutated; a
//! configuration file may replace it wholesale.

use crate::model::{EnergySource, Metrics};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One expected (source, year) value, as written in the `[[reference]]`
/// configuration array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub category: EnergySource,
    pub year: i32,
    pub production: f64,
    pub capacity: f64,
}

/// Built-in expected values: (source, year, production, capacity).
pub static REFERENCE_VALUES: &[(EnergySource, i32, f64, f64)] = &[
    (EnergySource::OnshoreWind, 2022, 13134.0, 6131.0),
    (EnergySource::OnshoreWind, 2023, 17482.0, 6692.0),
    (EnergySource::OnshoreWind, 2024, 17657.0, 6955.0),
    (EnergySource::OffshoreWind, 2022, 7936.0, 2570.0),
    (EnergySource::OffshoreWind, 2023, 11553.0, 4110.0),
    (EnergySource::OffshoreWind, 2024, 15182.0, 4748.0),
    (EnergySource::Solar, 2022, 16657.0, 17356.0),
    (EnergySource::Solar, 2023, 19607.0, 21957.0),
    (EnergySource::Solar, 2024, 21822.0, 24772.0),
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTable {
    entries: BTreeMap<EnergySource, BTreeMap<i32, Metrics>>,
}

impl ReferenceTable {
    pub fn builtin() -> Self {
        Self::from_entries(REFERENCE_VALUES.iter().map(|&(category, year, production, capacity)| {
            ReferenceEntry {
                category,
                year,
                production,
                capacity,
            }
        }))
    }

    /// Later entries for the same (source, year) replace earlier ones.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ReferenceEntry>,
    {
        let mut table = BTreeMap::<EnergySource, BTreeMap<i32, Metrics>>::new();
        for e in entries {
            table
                .entry(e.category)
                .or_default()
                .insert(e.year, Metrics::new(e.production, e.capacity));
        }
        Self { entries: table }
    }

    pub fn get(&self, source: EnergySource, year: i32) -> Option<&Metrics> {
        self.entries.get(&source).and_then(|years| years.get(&year))
    }

    /// Sources in `EnergySource` order, each with its years ascending.
    pub fn iter(&self) -> impl Iterator<Item = (EnergySource, &BTreeMap<i32, Metrics>)> + '_ {
        self.entries.iter().map(|(s, years)| (*s, years))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
