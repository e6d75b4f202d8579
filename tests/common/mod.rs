//! Shared helpers for the integration tests.

use cbs_renewables::ingest::pagination::{Page, PageError, PageSource, RetryPolicy};
use cbs_renewables::model::{FatalKind, RawRecord};
use serde_json::json;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

/// Page source that replays scripted responses per URL, in order, and
/// records every request it receives.
pub struct ScriptedSource {
    responses: RefCell<HashMap<String, VecDeque<Result<Page, PageError>>>>,
    pub requests: RefCell<Vec<String>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn respond(self, url: &str, response: Result<Page, PageError>) -> Self {
        self.responses
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }
}

impl PageSource for ScriptedSource {
    fn get_page(&self, url: &str) -> Result<Page, PageError> {
        self.requests.borrow_mut().push(url.to_string());
        self.responses
            .borrow_mut()
            .get_mut(url)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(PageError::Fatal {
                    kind: FatalKind::HttpStatus,
                    message: format!("HTTP error: 404 for {}", url),
                })
            })
    }
}

/// A 82610ENG TypedDataSet row.
pub fn cbs_row(id: i64, key: &str, period: &str, production: f64, capacity: f64) -> RawRecord {
    json!({
        "ID": id,
        "EnergySourcesTechniques": key,
        "Periods": period,
        "NetProductionOfElectricity_3": production,
        "ElectricalCapacityEndOfYear_8": capacity
    })
    .as_object()
    .cloned()
    .unwrap()
}

pub fn page(records: Vec<RawRecord>, next: Option<&str>) -> Page {
    Page {
        records,
        next_link: next.map(String::from),
    }
}

pub fn timeout() -> PageError {
    PageError::Retryable("Request failed: operation timed out".to_string())
}

/// First-page URL for the default configuration.
pub fn start_url(config: &cbs_renewables::config::Config) -> String {
    cbs_renewables::ingest::cbs::build_dataset_url(&config.source)
        .unwrap()
        .to_string()
}

/// Default configuration with fast retries and the workbook under `dir`.
pub fn test_config(dir: &std::path::Path) -> cbs_renewables::config::Config {
    let mut config = cbs_renewables::config::Config::default();
    config.http.max_attempts = 3;
    config.http.initial_backoff_secs = 0;
    config.output.path = dir.join("CBS_Renewable_Data.xlsx");
    config
}

/// Three attempts per page, no waiting.
pub fn instant_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        initial_delay: Duration::ZERO,
        multiplier: 2,
    }
}
