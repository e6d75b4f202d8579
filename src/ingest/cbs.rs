/// CBS Open Data (StatLine OData v3) client
///
/// Retrieves dataset 82610ENG from the CBS OData API. Responses are JSON
/// objects with a `value` array and, when more rows remain, an
/// `odata.nextLink` continuation URL.
///
/// API Documentation: https://www.cbs.nl/en-gb/our-services/open-data
/// Example: https://opendata.cbs.nl/ODataApi/odata/82610ENG/TypedDataSet?$format=json
use crate::config::SourceConfig;
use crate::ingest::pagination::{FetchOutcome, Page, PageError, PageSource, PaginatedFetcher, RetryPolicy};
use crate::model::{FatalKind, FetchError, RawRecord};
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;
use url::{ParseError, Url};

pub const CBS_BASE_URL: &str = "https://opendata.cbs.nl/ODataApi/odata";

const USER_AGENT: &str = concat!("cbs_renewables/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// CBS API Response Structures
// ============================================================================

/// One page of an OData feed.
#[derive(Debug, Deserialize)]
pub struct ODataResponse {
    #[serde(default)]
    pub value: Vec<RawRecord>,
    /// v3 spells it `odata.nextLink`, v4 `@odata.nextLink`.
    #[serde(rename = "odata.nextLink", alias = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

/// Entry of a dimension table such as `EnergySourcesTechniques`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DimensionCode {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Title")]
    pub title: String,
}

// ============================================================================
// URL construction
// ============================================================================

/// Builds the first-page URL for the configured dataset.
///
/// Only the four columns the pipeline reads are selected. When
/// `filter_keys` is non-empty the request is restricted to those energy
/// source keys; keys are sent verbatim since CBS pads them with spaces.
pub fn build_dataset_url(source: &SourceConfig) -> Result<Url, ParseError> {
    let select = [
        source.key_field.as_str(),
        source.period_field.as_str(),
        source.production_column.as_str(),
        source.capacity_column.as_str(),
    ]
    .join(",");

    let mut url = Url::parse_with_params(
        &resource_url(source, &source.table),
        &[("$format", "json"), ("$select", select.as_str())],
    )?;

    if !source.filter_keys.is_empty() {
        let filter = source
            .filter_keys
            .iter()
            .map(|k| format!("{} eq '{}'", source.key_field, k.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(" or ");
        url.query_pairs_mut().append_pair("$filter", &filter);
    }
    Ok(url)
}

/// URL of a dimension table, e.g. the energy source code list.
pub fn build_dimension_url(source: &SourceConfig, dimension: &str) -> Result<Url, ParseError> {
    Url::parse_with_params(&resource_url(source, dimension), &[("$format", "json")])
}

fn resource_url(source: &SourceConfig, resource: &str) -> String {
    format!(
        "{}/{}/{}",
        source.base_url.trim_end_matches('/'),
        source.dataset_id,
        resource
    )
}

fn invalid_url(source: &SourceConfig, err: ParseError) -> FetchError {
    FetchError::Fatal {
        url: source.base_url.clone(),
        kind: FatalKind::InvalidUrl,
        message: err.to_string(),
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Decodes a page body. A body that is not a JSON object is fatal: retrying
/// the same URL returns the same bytes.
pub fn parse_page(body: &str) -> Result<Page, PageError> {
    let response: ODataResponse = serde_json::from_str(body)
        .map_err(|e| PageError::Fatal {
            kind: FatalKind::Parse,
            message: format!("Parse error: {}", e),
        })?;
    Ok(Page {
        records: response.value,
        next_link: response.next_link,
    })
}

// ============================================================================
// HTTP page source
// ============================================================================

pub struct HttpPageSource {
    client: reqwest::blocking::Client,
}

impl HttpPageSource {
    /// `timeout` bounds each request so a stalled connection cannot hang the run.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured client.
    pub fn from_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl PageSource for HttpPageSource {
    fn get_page(&self, url: &str) -> Result<Page, PageError> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }

        let body = response
            .text()
            .map_err(|e| PageError::Retryable(format!("body read failed: {}", e)))?;
        parse_page(&body)
    }
}

fn classify_request_error(err: reqwest::Error) -> PageError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        PageError::Retryable(format!("Request failed: {}", err))
    } else {
        PageError::Fatal {
            kind: FatalKind::Request,
            message: format!("Request failed: {}", err),
        }
    }
}

/// 5xx and 429 are transient; every other non-success status is final.
pub fn classify_status(status: StatusCode) -> PageError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        PageError::Retryable(format!("HTTP error: {}", status))
    } else {
        PageError::Fatal {
            kind: FatalKind::HttpStatus,
            message: format!("HTTP error: {}", status),
        }
    }
}

// ============================================================================
// API Client Functions
// ============================================================================

/// Downloads every row of the configured dataset.
pub fn fetch_dataset<S: PageSource + ?Sized>(
    source: &S,
    config: &SourceConfig,
    policy: RetryPolicy,
) -> Result<FetchOutcome, FetchError> {
    let url = build_dataset_url(config).map_err(|e| invalid_url(config, e))?;
    info!(%url, "fetching dataset");
    PaginatedFetcher::new(source, policy).fetch_all(url.as_str())
}

/// Lists the energy source dimension (key and title per entry).
///
/// Entries without a string `Key` and `Title` are skipped.
pub fn fetch_energy_source_codes<S: PageSource + ?Sized>(
    source: &S,
    config: &SourceConfig,
    policy: RetryPolicy,
) -> Result<Vec<DimensionCode>, FetchError> {
    let url = build_dimension_url(config, &config.key_field).map_err(|e| invalid_url(config, e))?;
    let outcome = PaginatedFetcher::new(source, policy).fetch_all(url.as_str())?;
    Ok(outcome
        .records
        .into_iter()
        .filter_map(|r| serde_json::from_value(serde_json::Value::Object(r)).ok())
        .collect())
}

// ============================================================================
// Tests
// ============================================================================
