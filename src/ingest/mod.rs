/// Data ingestion from the CBS Open Data portal.
///
/// - `pagination`: continuation-link fetch loop with retry and backoff.
/// - `cbs`       : CBS URL construction, response decoding, HTTP page source.
pub mod cbs;
pub mod pagination;
