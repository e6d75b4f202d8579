//! Reference Verification Module
//!
//! Compares the computed yearly series against the published reference
//! values, one check per (source, year, metric). A reference value with no
//! computed counterpart is a failed check, never skipped.

use crate::model::{EnergySource, Metric, YearlySeries};
use crate::reference::ReferenceTable;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

// ============================================================================
// Verification Results
// ============================================================================

/// Maximum absolute difference still counted as a match, per metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerances {
    pub production: f64,
    pub capacity: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            production: 1.0,
            capacity: 1.0,
        }
    }
}

impl Tolerances {
    pub fn for_metric(&self, metric: Metric) -> f64 {
        match metric {
            Metric::NetProduction => self.production,
            Metric::InstalledCapacity => self.capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    /// No computed value for this source/year.
    Missing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckResult {
    pub source: EnergySource,
    pub year: i32,
    pub metric: Metric,
    pub fetched: Option<f64>,
    pub expected: f64,
    pub status: CheckStatus,
}

impl CheckResult {
    pub fn difference(&self) -> Option<f64> {
        self.fetched.map(|f| f - self.expected)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct VerificationSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub missing: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub timestamp: String,
    pub checks: Vec<CheckResult>,
    pub summary: VerificationSummary,
}

impl VerificationReport {
    /// True only if there was something to check and every check passed.
    pub fn passed(&self) -> bool {
        self.summary.total > 0 && self.summary.passed == self.summary.total
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }
}

// ============================================================================
// Verification
// ============================================================================

pub fn check_value(fetched: Option<f64>, expected: f64, tolerance: f64) -> CheckStatus {
    match fetched {
        None => CheckStatus::Missing,
        Some(v) if (v - expected).abs() < tolerance => CheckStatus::Pass,
        Some(_) => CheckStatus::Fail,
    }
}

pub fn verify(series: &YearlySeries, reference: &ReferenceTable, tolerances: Tolerances) -> VerificationReport {
    let mut report = VerificationReport {
        timestamp: Utc::now().to_rfc3339(),
        checks: Vec::with_capacity(reference.len() * Metric::ALL.len()),
        summary: VerificationSummary::default(),
    };

    for (source, years) in reference.iter() {
        for (&year, expected) in years {
            let computed = series.get(source, year);
            for metric in Metric::ALL {
                let fetched = computed.map(|m| m.get(metric));
                let expected = expected.get(metric);
                let status = check_value(fetched, expected, tolerances.for_metric(metric));

                report.summary.total += 1;
                match status {
                    CheckStatus::Pass => report.summary.passed += 1,
                    CheckStatus::Fail => report.summary.failed += 1,
                    CheckStatus::Missing => report.summary.missing += 1,
                }
                report.checks.push(CheckResult {
                    source,
                    year,
                    metric,
                    fetched,
                    expected,
                    status,
                });
            }
        }
    }

    report
}

// ============================================================================
// Reporting
// ============================================================================

const RULE_WIDTH: usize = 92;

/// Renders the checks as a fixed-width table.
pub fn render_table(report: &VerificationReport) -> String {
    let mut out = String::new();
    let rule = "─".repeat(RULE_WIDTH);
    let _ = writeln!(
        out,
        "{:<15} {:>4}  {:<26} {:>10} {:>10} {:>8}  {}",
        "Source", "Year", "Metric", "Fetched", "Reference", "Diff", "Status"
    );
    let _ = writeln!(out, "{}", rule);
    for c in &report.checks {
        let fetched = c
            .fetched
            .map(|v| format!("{:.0}", v))
            .unwrap_or_else(|| "N/A".to_string());
        let diff = c
            .difference()
            .map(|d| format!("{:+.0}", d))
            .unwrap_or_default();
        let status = match c.status {
            CheckStatus::Pass => "✓ PASS",
            CheckStatus::Fail => "✗ FAIL",
            CheckStatus::Missing => "✗ MISSING",
        };
        let _ = writeln!(
            out,
            "{:<15} {:>4}  {:<26} {:>10} {:>10.0} {:>8}  {}",
            c.source.sheet_name(),
            c.year,
            c.metric.header(),
            fetched,
            c.expected,
            diff,
            status
        );
    }
    out
}

pub fn print_summary(report: &VerificationReport) {
    let rule = "═".repeat(RULE_WIDTH);
    println!("\n{}", rule);
    println!("📊 VERIFICATION against published CBS figures");
    println!("{}", rule);
    print!("{}", render_table(report));
    println!("{}", rule);
    println!(
        "Checks: {}/{} passed  ({} failed, {} missing)",
        report.summary.passed, report.summary.total, report.summary.failed, report.summary.missing
    );
    println!(
        "Overall: {}",
        if report.passed() { "ALL PASS ✓" } else { "SOME FAILURES ✗" }
    );
    println!("{}", rule);
}

// ============================================================================
// Tests
// ============================================================================
