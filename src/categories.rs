/// Energy source registry for dataset 82610ENG.
///
/// Defines the known spellings of each exported energy source: the stable
/// CBS dimension key and the English label the `cbsodata` client returns
/// instead. This is the single source of truth for source keys; all other
/// modules classify records through a `CategoryTable` built from here (or
/// from a configuration override).
use crate::model::EnergySource;
use std::collections::BTreeMap;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Known spellings of one energy source in the CBS data.
pub struct SourceKeys {
    pub source: EnergySource,
    /// CBS dimension key. The TypedDataSet pads these with a trailing space.
    pub code: &'static str,
    /// English dimension title.
    pub label: &'static str,
}

pub static SOURCE_REGISTRY: &[SourceKeys] = &[
    SourceKeys {
        source: EnergySource::Solar,
        code: "E006590",
        label: "Solar photovoltaic",
    },
    SourceKeys {
        source: EnergySource::OnshoreWind,
        code: "E006637",
        label: "Wind energy: onshore",
    },
    SourceKeys {
        source: EnergySource::OffshoreWind,
        code: "E006638",
        label: "Wind energy: offshore",
    },
];

/// Looks up a registry entry by CBS key. Surrounding whitespace is ignored.
pub fn find_by_code(code: &str) -> Option<&'static SourceKeys> {
    let code = code.trim();
    SOURCE_REGISTRY.iter().find(|k| k.code == code)
}

// ---------------------------------------------------------------------------
// Classifier table
// ---------------------------------------------------------------------------

/// Two different sources claim the same key.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("key {key:?} maps to both {existing} and {conflicting}")]
pub struct CategoryConflict {
    pub key: String,
    pub existing: EnergySource,
    pub conflicting: EnergySource,
}

/// Exact-match lookup from a trimmed record key to its energy source.
///
/// Never matches partially: `"E00659"` or `"solar photovoltaic"` classify as
/// nothing rather than guessing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryTable {
    keys: BTreeMap<String, EnergySource>,
}

impl CategoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table covering every code and label in `SOURCE_REGISTRY`.
    pub fn from_registry() -> Self {
        let mut table = Self::new();
        for entry in SOURCE_REGISTRY {
            table.keys.insert(entry.code.to_string(), entry.source);
            table.keys.insert(entry.label.to_string(), entry.source);
        }
        table
    }

    /// Adds a key. Re-adding a key for the same source is a no-op; blank keys
    /// are ignored.
    pub fn insert(&mut self, key: &str, source: EnergySource) -> Result<(), CategoryConflict> {
        let key = key.trim();
        if key.is_empty() {
            return Ok(());
        }
        match self.keys.get(key) {
            Some(&existing) if existing != source => Err(CategoryConflict {
                key: key.to_string(),
                existing,
                conflicting: source,
            }),
            Some(_) => Ok(()),
            None => {
                self.keys.insert(key.to_string(), source);
                Ok(())
            }
        }
    }

    pub fn classify(&self, raw_key: &str) -> Option<EnergySource> {
        self.keys.get(raw_key.trim()).copied()
    }

    /// Keys bound to a source, sorted.
    pub fn keys_for(&self, source: EnergySource) -> Vec<&str> {
        self.keys
            .iter()
            .filter(|(_, s)| **s == source)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn covers(&self, source: EnergySource) -> bool {
        self.keys.values().any(|s| *s == source)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
