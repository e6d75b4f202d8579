//! One full run: fetch → classify → aggregate → export → verify.
//!
//! The workbook is only written after every page has been fetched, so a
//! failed fetch never leaves a partial file behind. A run in which nothing
//! could be classified skips the export but still verifies, so every
//! reference value shows up as a missing check.

use crate::analysis::{Analysis, analyse, classify::ClassifierStrategy};
use crate::config::{Config, ConfigError};
use crate::export::{self, ExportError};
use crate::ingest::cbs::fetch_dataset;
use crate::ingest::pagination::PageSource;
use crate::logging;
use crate::model::{EnergySource, FetchError};
use crate::verify::{self, VerificationReport};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("writing {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: ExportError,
    },
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub records: usize,
    pub pages: usize,
    pub retries: usize,
    pub analysis: Analysis,
    /// Sheets written, in workbook order. Empty when the export was skipped.
    pub sheets: Vec<&'static str>,
    pub report: VerificationReport,
}

impl PipelineRun {
    pub fn exported(&self) -> bool {
        !self.sheets.is_empty()
    }
}

pub fn run_pipeline(
    source: &dyn PageSource,
    config: &Config,
    strategy: ClassifierStrategy,
) -> Result<PipelineRun, PipelineError> {
    let outcome = fetch_dataset(source, &config.source, config.retry_policy())?;
    info!(records = outcome.records.len(), pages = outcome.pages, "dataset retrieved");

    let analysed = analyse(&outcome.records, config, strategy)?;
    logging::log_classification_summary(&analysed.summary);
    logging::log_unresolved_sources(&analysed.unresolved);

    let sheets = if analysed.series.is_empty() {
        warn!(
            path = %config.output.path.display(),
            "no records classified; workbook not written"
        );
        Vec::new()
    } else {
        let path = &config.output.path;
        let sheets = export::write_workbook(&analysed.series, path).map_err(|source| PipelineError::Export {
            path: path.clone(),
            source,
        })?;
        for sheet in &sheets {
            let years = EnergySource::from_sheet_name(sheet).and_then(|s| analysed.series.years(s));
            if let Some(years) = years {
                info!(
                    sheet,
                    years = years.len(),
                    first = years.keys().next().copied().unwrap_or_default(),
                    last = years.keys().next_back().copied().unwrap_or_default(),
                    "sheet created"
                );
            }
        }
        sheets
    };

    let report = verify::verify(&analysed.series, &config.reference_table(), config.tolerances());

    Ok(PipelineRun {
        records: outcome.records.len(),
        pages: outcome.pages,
        retries: outcome.retries,
        analysis: analysed,
        sheets,
        report,
    })
}
