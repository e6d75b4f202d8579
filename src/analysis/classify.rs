//! Classifier strategies.
//!
//! `Static` uses the key table from the registry or configuration. `Discover`
//! is a fallback for dataset revisions whose keys are unknown: each source is
//! bound to whichever key reports exactly the reference production and
//! capacity for one known year. It is fragile if two sources share a
//! measurement pair in that year, in which case the source stays unresolved.

use crate::analysis::period::year_from_period;
use crate::categories::CategoryTable;
use crate::model::{EnergySource, Record};
use crate::reference::ReferenceTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierStrategy {
    #[default]
    Static,
    Discover,
}

/// Why discovery could not bind a source.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryIssue {
    /// The reference table has no value for the discovery year.
    NoReferenceValue,
    NoMatch,
    /// Several distinct keys matched; none is picked.
    Ambiguous(Vec<String>),
    /// The only matching key is already bound to another source.
    KeyTaken { key: String, by: EnergySource },
}

impl fmt::Display for DiscoveryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryIssue::NoReferenceValue => write!(f, "no reference value for discovery year"),
            DiscoveryIssue::NoMatch => write!(f, "no record matches the reference values"),
            DiscoveryIssue::Ambiguous(keys) => write!(f, "multiple keys match: {}", keys.join(", ")),
            DiscoveryIssue::KeyTaken { key, by } => write!(f, "matching key {:?} already bound to {}", key, by),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    pub table: CategoryTable,
    pub unresolved: Vec<(EnergySource, DiscoveryIssue)>,
}

/// Binds sources to keys by matching `year`'s reference values exactly.
///
/// Sources are tried in reference-table order. Unresolved sources are
/// returned as warnings, never as errors.
pub fn discover_categories(records: &[Record], reference: &ReferenceTable, year: i32) -> Discovery {
    let mut discovery = Discovery::default();
    let candidates: Vec<&Record> = records
        .iter()
        .filter(|r| year_from_period(&r.period) == Some(year))
        .collect();

    for (source, _) in reference.iter() {
        let Some(expected) = reference.get(source, year) else {
            discovery.unresolved.push((source, DiscoveryIssue::NoReferenceValue));
            continue;
        };

        let keys: BTreeSet<&str> = candidates
            .iter()
            .filter(|r| r.metrics == *expected)
            .map(|r| r.key.trim())
            .filter(|k| !k.is_empty())
            .collect();

        let issue = match keys.len() {
            0 => DiscoveryIssue::NoMatch,
            1 => {
                let key = keys.into_iter().next().unwrap_or_default();
                match discovery.table.insert(key, source) {
                    Ok(()) => {
                        info!(%source, key, year, "discovered energy source key");
                        continue;
                    }
                    Err(conflict) => DiscoveryIssue::KeyTaken {
                        key: conflict.key,
                        by: conflict.existing,
                    },
                }
            }
            _ => DiscoveryIssue::Ambiguous(keys.into_iter().map(String::from).collect()),
        };
        warn!(%source, year, %issue, "energy source key left unresolved");
        discovery.unresolved.push((source, issue));
    }

    discovery
}
