/// End-to-end pipeline scenarios against a scripted CBS feed
///
/// These tests run fetch → classify → aggregate → export → verify with an
/// in-memory page source, so they need no network access.
///
/// Run with: cargo test --test pipeline_scenarios
mod common;

use cbs_renewables::analysis::{analyse, classify::ClassifierStrategy};
use cbs_renewables::config::Config;
use cbs_renewables::export;
use cbs_renewables::ingest::cbs::fetch_dataset;
use cbs_renewables::model::{EnergySource, FatalKind, FetchError, Metrics};
use cbs_renewables::pipeline::{PipelineError, run_pipeline};
use cbs_renewables::reference::{ReferenceEntry, ReferenceTable};
use cbs_renewables::verify::{CheckStatus, Tolerances, verify};
use common::*;
use pretty_assertions::assert_eq;
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

fn onshore_reference(years: &[(i32, f64, f64)]) -> ReferenceTable {
    ReferenceTable::from_entries(years.iter().map(|&(year, production, capacity)| ReferenceEntry {
        category: EnergySource::OnshoreWind,
        year,
        production,
        capacity,
    }))
}

fn onshore_rows() -> Vec<cbs_renewables::model::RawRecord> {
    vec![
        cbs_row(1, "E006637 ", "2022JJ00", 13134.0, 6131.0),
        cbs_row(2, "E006637 ", "2023JJ00", 17482.0, 6692.0),
        cbs_row(3, "E006637 ", "2024JJ00", 17657.0, 6955.0),
    ]
}

// ---------------------------------------------------------------------------
// Verification scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_onshore_wind_matching_reference_passes() {
    let config = Config::default();
    let start = start_url(&config);
    let source = ScriptedSource::new().respond(&start, Ok(page(onshore_rows(), None)));

    let outcome = fetch_dataset(&source, &config.source, instant_retry()).unwrap();
    let analysed = analyse(&outcome.records, &config, ClassifierStrategy::Static).unwrap();

    let reference = onshore_reference(&[
        (2022, 13134.0, 6131.0),
        (2023, 17482.0, 6692.0),
        (2024, 17657.0, 6955.0),
    ]);
    let report = verify(&analysed.series, &reference, Tolerances::default());

    assert_eq!(report.summary.total, 6);
    assert!(report.checks.iter().all(|c| c.status == CheckStatus::Pass));
    assert!(report.passed());
}

#[test]
fn test_reference_year_absent_from_feed_fails_run() {
    let config = Config::default();
    let analysed = analyse(&onshore_rows(), &config, ClassifierStrategy::Static).unwrap();

    let reference = onshore_reference(&[
        (2021, 11000.0, 5300.0),
        (2022, 13134.0, 6131.0),
        (2023, 17482.0, 6692.0),
        (2024, 17657.0, 6955.0),
    ]);
    let report = verify(&analysed.series, &reference, Tolerances::default());

    let failing: Vec<_> = report
        .checks
        .iter()
        .filter(|c| c.status != CheckStatus::Pass)
        .map(|c| (c.year, c.status))
        .collect();
    assert_eq!(failing, vec![(2021, CheckStatus::Missing), (2021, CheckStatus::Missing)]);
    assert_eq!(report.summary.passed, 6);
    assert!(!report.passed());
}

#[test]
fn test_builtin_reference_against_full_feed() {
    let mut rows = onshore_rows();
    rows.extend([
        cbs_row(10, "E006638 ", "2022JJ00", 7936.0, 2570.0),
        cbs_row(11, "E006638 ", "2023JJ00", 11553.0, 4110.0),
        cbs_row(12, "E006638 ", "2024JJ00", 15182.0, 4748.0),
        cbs_row(20, "E006590 ", "2022JJ00", 16657.0, 17356.0),
        cbs_row(21, "E006590 ", "2023JJ00", 19607.0, 21957.0),
        cbs_row(22, "E006590 ", "2024JJ00", 21822.0, 24772.0),
        cbs_row(30, "T001028 ", "2023JJ00", 60000.0, 40000.0),
    ]);
    let config = Config::default();

    for strategy in [ClassifierStrategy::Static, ClassifierStrategy::Discover] {
        let analysed = analyse(&rows, &config, strategy).unwrap();
        assert!(analysed.unresolved.is_empty(), "{:?}", strategy);
        assert_eq!(analysed.summary.unknown_category, 1);
        let report = verify(&analysed.series, &config.reference_table(), config.tolerances());
        assert!(report.passed(), "{:?} should verify", strategy);
    }
}

#[test]
fn test_empty_metric_becomes_zero_not_error() {
    let mut row = cbs_row(1, "E006590 ", "2023JJ00", 0.0, 21957.0);
    row.insert("NetProductionOfElectricity_3".into(), serde_json::json!(""));
    let analysed = analyse(&[row], &Config::default(), ClassifierStrategy::Static).unwrap();
    assert_eq!(
        analysed.series.get(EnergySource::Solar, 2023),
        Some(&Metrics::new(0.0, 21957.0))
    );
    assert_eq!(analysed.summary.coerced_values, 1);
}

// ---------------------------------------------------------------------------
// Pagination scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_three_pages_with_flaky_second_page() {
    let config = Config::default();
    let start = start_url(&config);
    let p2 = "https://opendata.cbs.nl/ODataApi/odata/82610ENG/TypedDataSet?$skiptoken=Id%2010000";
    let p3 = "https://opendata.cbs.nl/ODataApi/odata/82610ENG/TypedDataSet?$skiptoken=Id%2020000";

    let source = ScriptedSource::new()
        .respond(&start, Ok(page(vec![cbs_row(1, "E006590 ", "2022JJ00", 1.0, 1.0)], Some(p2))))
        .respond(p2, Err(timeout()))
        .respond(p2, Err(timeout()))
        .respond(
            p2,
            Ok(page(
                vec![
                    cbs_row(2, "E006590 ", "2023JJ00", 2.0, 2.0),
                    cbs_row(3, "E006637 ", "2023JJ00", 3.0, 3.0),
                ],
                Some(p3),
            )),
        )
        .respond(p3, Ok(page(vec![cbs_row(4, "E006638 ", "2023JJ00", 4.0, 4.0)], None)));

    let outcome = fetch_dataset(&source, &config.source, instant_retry()).unwrap();

    assert_eq!(outcome.pages, 3);
    assert_eq!(outcome.retries, 2);
    assert_eq!(source.request_count(p2), 3);
    assert_eq!(source.request_count(p3), 1);

    let ids: Vec<i64> = outcome
        .records
        .iter()
        .map(|r| r["ID"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    let unique: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn test_failed_page_aborts_without_partial_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let source = ScriptedSource::new()
        .respond(&start_url(&config), Ok(page(onshore_rows(), Some("page-2"))))
        .respond("page-2", Err(timeout()))
        .respond("page-2", Err(timeout()))
        .respond("page-2", Err(timeout()));

    let err = run_pipeline(&source, &config, ClassifierStrategy::Static).unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Fetch(FetchError::Exhausted { attempts: 3, .. })
    ));
    assert_eq!(source.request_count("page-2"), 3);
    assert!(!config.output.path.exists());
}

#[test]
fn test_client_error_is_not_retried() {
    let config = Config::default();
    // nothing scripted: the source answers 404
    let source = ScriptedSource::new();
    let err = fetch_dataset(&source, &config.source, instant_retry()).unwrap_err();
    assert!(matches!(err, FetchError::Fatal { kind: FatalKind::HttpStatus, .. }));
    assert_eq!(source.requests.borrow().len(), 1);
}

// ---------------------------------------------------------------------------
// Full runs
// ---------------------------------------------------------------------------

#[test]
fn test_full_run_writes_workbook_then_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.reference = vec![ReferenceEntry {
        category: EnergySource::OnshoreWind,
        year: 2023,
        production: 17482.0,
        capacity: 6692.0,
    }];
    let source = ScriptedSource::new().respond(&start_url(&config), Ok(page(onshore_rows(), None)));

    let run = run_pipeline(&source, &config, ClassifierStrategy::Static).unwrap();

    assert_eq!(run.records, 3);
    assert_eq!(run.pages, 1);
    assert_eq!(run.sheets, vec!["Onshore Wind"]);
    assert!(run.exported());
    assert!(config.output.path.exists());
    assert!(run.report.passed());
}

#[test]
fn test_nothing_classified_still_verifies_as_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    for (strategy, unresolved) in [(ClassifierStrategy::Static, 0), (ClassifierStrategy::Discover, 3)] {
        let source = ScriptedSource::new().respond(
            &start_url(&config),
            Ok(page(vec![cbs_row(1, "T001028 ", "2023JJ00", 60000.0, 40000.0)], None)),
        );
        let run = run_pipeline(&source, &config, strategy).unwrap();

        assert!(run.analysis.series.is_empty());
        assert_eq!(run.analysis.unresolved.len(), unresolved);
        assert!(!run.exported());
        assert!(!config.output.path.exists());
        assert_eq!(run.report.summary.total, 18);
        assert_eq!(run.report.summary.missing, 18);
        assert!(!run.report.passed(), "{:?} must fail verification", strategy);
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[test]
fn test_export_after_fetch() {
    let config = Config::default();
    let analysed = analyse(&onshore_rows(), &config, ClassifierStrategy::Static).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.xlsx");

    let sheets = export::write_workbook(&analysed.series, &path).unwrap();
    assert_eq!(sheets, vec!["Onshore Wind"]);

    let file = std::fs::File::open(&path).unwrap();
    let archive = zip::ZipArchive::new(file).unwrap();
    let names: HashSet<&str> = archive.file_names().collect();
    assert!(names.contains("xl/worksheets/sheet1.xml"));
    assert!(!names.contains("xl/worksheets/sheet2.xml"));
}
