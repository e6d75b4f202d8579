//! Continuation-link pagination with per-page retry.
//!
//! The fetch loop is an explicit state machine:
//!
//! ```text
//!            success + next link
//!          +---------------------+
//!          v                     |
//!   --> Fetching --success, no link--> Done
//!        |    ^
//!  retryable  | after backoff
//!        v    |
//!       Retrying
//!        |
//!   budget spent --> Exhausted        fatal error --> Failed
//! ```
//!
//! Retries never move past a page: a page that cannot be fetched aborts the
//! whole run, so the caller never sees a record set with a hole in it.

use crate::model::{FatalKind, FetchError, RawRecord};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

// ============================================================================
// Page source
// ============================================================================

/// One decoded response page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<RawRecord>,
    pub next_link: Option<String>,
}

/// Why a single page request failed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PageError {
    /// Timeouts, dropped connections, 5xx. Worth another attempt.
    #[error("{0}")]
    Retryable(String),
    /// Anything a retry cannot fix.
    #[error("{message}")]
    Fatal { kind: FatalKind, message: String },
}

/// Something that can fetch one page by URL.
pub trait PageSource {
    fn get_page(&self, url: &str) -> Result<Page, PageError>;
}

// ============================================================================
// Retry policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts per page, first try included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `failed_attempt`-th failure (1-based): 2s, 4s, 8s, ...
    pub fn delay_for(&self, failed_attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .saturating_pow(failed_attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor)
    }
}

// ============================================================================
// State machine
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Fetching { url: String, attempt: u32 },
    Retrying { url: String, attempt: u32, delay: Duration, error: String },
    Exhausted { url: String, attempts: u32, error: String },
    Failed { url: String, kind: FatalKind, message: String },
    Done,
}

/// Everything a completed fetch produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<RawRecord>,
    pub pages: usize,
    pub retries: usize,
}

pub struct PaginatedFetcher<'a, S: PageSource + ?Sized> {
    source: &'a S,
    policy: RetryPolicy,
    sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a, S: PageSource + ?Sized> PaginatedFetcher<'a, S> {
    pub fn new(source: &'a S, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Replaces the backoff sleep, e.g. to record delays in tests.
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Follows continuation links from `start_url` until the last page.
    pub fn fetch_all(&self, start_url: &str) -> Result<FetchOutcome, FetchError> {
        let mut outcome = FetchOutcome::default();
        let mut state = FetchState::Fetching {
            url: start_url.to_string(),
            attempt: 1,
        };

        loop {
            state = match state {
                FetchState::Exhausted { url, attempts, error } => {
                    return Err(FetchError::Exhausted {
                        url,
                        attempts,
                        last_error: error,
                    });
                }
                FetchState::Failed { url, kind, message } => {
                    return Err(FetchError::Fatal { url, kind, message });
                }
                FetchState::Done => {
                    info!(
                        pages = outcome.pages,
                        records = outcome.records.len(),
                        retries = outcome.retries,
                        "fetch complete"
                    );
                    return Ok(outcome);
                }
                other => self.step(other, &mut outcome),
            };
        }
    }

    /// Advances one non-terminal state.
    pub fn step(&self, state: FetchState, outcome: &mut FetchOutcome) -> FetchState {
        match state {
            FetchState::Fetching { url, attempt } => {
                debug!(%url, attempt, "requesting page");
                match self.source.get_page(&url) {
                    Ok(page) => {
                        outcome.pages += 1;
                        outcome.records.extend(page.records);
                        match page.next_link.filter(|next| !next.trim().is_empty()) {
                            Some(next) if next == url => FetchState::Failed {
                                url,
                                kind: FatalKind::LinkLoop,
                                message: "continuation link points at the current page".to_string(),
                            },
                            Some(next) => {
                                info!(
                                    page = outcome.pages,
                                    records = outcome.records.len(),
                                    "page fetched, following continuation link"
                                );
                                FetchState::Fetching { url: next, attempt: 1 }
                            }
                            None => FetchState::Done,
                        }
                    }
                    Err(PageError::Retryable(error)) if attempt < self.policy.max_attempts => {
                        FetchState::Retrying {
                            delay: self.policy.delay_for(attempt),
                            url,
                            attempt,
                            error,
                        }
                    }
                    Err(PageError::Retryable(error)) => FetchState::Exhausted {
                        url,
                        attempts: attempt,
                        error,
                    },
                    Err(PageError::Fatal { kind, message }) => FetchState::Failed { url, kind, message },
                }
            }
            FetchState::Retrying { url, attempt, delay, error } => {
                warn!(
                    %url,
                    attempt,
                    max_attempts = self.policy.max_attempts,
                    delay_secs = delay.as_secs_f64(),
                    %error,
                    "page request failed, retrying"
                );
                outcome.retries += 1;
                (self.sleep)(delay);
                FetchState::Fetching { url, attempt: attempt + 1 }
            }
            terminal => terminal,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
