/// Record classification and aggregation for the CBS renewables pipeline.
///
/// Submodules:
/// - `period`   : annual period codes to calendar years.
/// - `extract`  : picks the production/capacity columns and coerces values.
/// - `classify` : classifier strategies, including reference-value key discovery.
/// - `groupings`: organizes flat records into per-source yearly series.
pub mod classify;
pub mod extract;
pub mod groupings;
pub mod period;

use crate::config::{Config, ConfigError};
use crate::model::{EnergySource, RawRecord, YearlySeries};
use classify::{ClassifierStrategy, DiscoveryIssue, discover_categories};
use groupings::{ClassificationSummary, build_series};
use tracing::{debug, warn};

/// Output of the classify/aggregate stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub series: YearlySeries,
    pub summary: ClassificationSummary,
    /// Sources the discovery strategy could not bind (always empty for `Static`).
    pub unresolved: Vec<(EnergySource, DiscoveryIssue)>,
}

/// Extracts, classifies and groups a fetched record set.
pub fn analyse(
    raw: &[RawRecord],
    config: &Config,
    strategy: ClassifierStrategy,
) -> Result<Analysis, ConfigError> {
    let columns = config.metric_columns();
    let mut coerced_values = 0;
    let records: Vec<_> = raw
        .iter()
        .map(|r| {
            let e = columns.extract(r);
            coerced_values += e.coerced;
            e.record
        })
        .collect();

    let (table, unresolved) = match strategy {
        ClassifierStrategy::Static => {
            let table = config.category_table()?;
            for source in EnergySource::ALL {
                if table.covers(source) {
                    debug!(%source, keys = ?table.keys_for(source), "classifying by key");
                } else {
                    warn!(%source, "no keys configured for source");
                }
            }
            (table, Vec::new())
        }
        ClassifierStrategy::Discover => {
            let d = discover_categories(&records, &config.reference_table(), config.verify.discover_year);
            (d.table, d.unresolved)
        }
    };

    let (series, mut summary) = build_series(&records, &table, config.output.min_year);
    summary.coerced_values = coerced_values;

    Ok(Analysis {
        series,
        summary,
        unresolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Metrics;
    use serde_json::json;

    fn raw_rows() -> Vec<RawRecord> {
        [
            json!({"EnergySourcesTechniques": "E006590 ", "Periods": "2023JJ00",
                   "NetProductionOfElectricity_3": 19607, "ElectricalCapacityEndOfYear_8": 21957}),
            json!({"EnergySourcesTechniques": "E006637 ", "Periods": "2023JJ00",
                   "NetProductionOfElectricity_3": 17482, "ElectricalCapacityEndOfYear_8": 6692}),
            json!({"EnergySourcesTechniques": "E006637 ", "Periods": "2021JJ00",
                   "NetProductionOfElectricity_3": "", "ElectricalCapacityEndOfYear_8": 5000}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect()
    }

    #[test]
    fn test_static_strategy() {
        let a = analyse(&raw_rows(), &Config::default(), ClassifierStrategy::Static).unwrap();
        assert_eq!(a.summary.kept, 3);
        assert_eq!(a.summary.coerced_values, 1);
        assert!(a.unresolved.is_empty());
        assert_eq!(
            a.series.get(EnergySource::OnshoreWind, 2021),
            Some(&Metrics::new(0.0, 5000.0))
        );
    }

    #[test]
    fn test_discover_strategy_reports_unresolved() {
        let a = analyse(&raw_rows(), &Config::default(), ClassifierStrategy::Discover).unwrap();
        assert_eq!(
            a.series.get(EnergySource::Solar, 2023),
            Some(&Metrics::new(19607.0, 21957.0))
        );
        assert!(a.series.get(EnergySource::OnshoreWind, 2021).is_some());
        assert_eq!(a.unresolved, vec![(EnergySource::OffshoreWind, DiscoveryIssue::NoMatch)]);
    }

    #[test]
    fn test_analyse_is_idempotent() {
        let rows = raw_rows();
        let config = Config::default();
        let first = analyse(&rows, &config, ClassifierStrategy::Static).unwrap();
        let second = analyse(&rows, &config, ClassifierStrategy::Static).unwrap();
        assert_eq!(first, second);
    }
}
