//! HTTP client for the event store query API.

use std::time::Duration;

use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::types::{DateRange, EventRecord, FilterSet, FilterValue};

use super::FetchOutcome;

/// Response body for GET /datasets/{dataset}/events
#[derive(Debug, Deserialize)]
struct EventsPage {
    /// Matching records for this page, ascending by time
    #[serde(default)]
    rows: Vec<EventRecord>,
}

/// HTTP client for the event store.
pub struct FetchClient {
    config: StoreConfig,
    http_client: reqwest::Client,
    base_url: String,
    dataset: String,
}

impl FetchClient {
    /// Create a new fetch client from configuration.
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("store.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();
        let dataset = config
            .dataset
            .clone()
            .ok_or_else(|| Error::Config("store.dataset is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(api_key) = &config.api_key {
            let auth_value = format!("Bearer {}", api_key);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            base_url,
            dataset,
        })
    }

    fn events_url(&self) -> String {
        format!(
            "{}/datasets/{}/events",
            self.base_url,
            urlencoding::encode(&self.dataset)
        )
    }

    /// Fetch a single page of the filtered range.
    async fn fetch_page(
        &self,
        range: &DateRange,
        filters: &FilterSet,
        offset: usize,
    ) -> Result<Vec<EventRecord>> {
        let params = query_params(range, filters, offset, self.config.page_size);

        let response = self
            .http_client
            .get(self.events_url())
            .query(&params)
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            let page: EventsPage = response
                .json()
                .await
                .map_err(|e| Error::Fetch(format!("failed to parse response: {}", e)))?;
            Ok(page.rows)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Fetch(format!(
                "API error ({}): {}",
                status, error_text
            )))
        }
    }

    /// Fetch every matching record for a range, in ascending time order.
    ///
    /// Pages are requested in waves of up to `fetch_concurrency`
    /// requests and reassembled strictly in page order, so downstream
    /// consumers never observe out-of-order data. The first failed page
    /// halts pagination; earlier pages are still delivered alongside
    /// the verbatim error message. Hitting `max_rows` sets the
    /// truncation flag instead of failing.
    ///
    /// Cancellation is cooperative: dropping the returned future (for
    /// example when a newer request supersedes this one) abandons any
    /// in-flight pages without side effects.
    pub async fn fetch_events(&self, range: &DateRange, filters: &FilterSet) -> FetchOutcome {
        let page_size = self.config.page_size;
        let fan_out = self.config.fetch_concurrency.max(1);

        tracing::debug!(
            from = %range.start_instant(),
            to = %range.end_instant(),
            filters = filters.len(),
            page_size,
            fan_out,
            "Fetching events"
        );

        let outcome = paginate(
            |offset| self.fetch_page(range, filters, offset),
            page_size,
            self.config.max_rows,
            fan_out,
        )
        .await;

        tracing::info!(
            rows = outcome.records.len(),
            truncated = outcome.truncated,
            failed = outcome.error.is_some(),
            "Fetch complete"
        );

        outcome
    }
}

/// Drive the wave-based pagination loop over an injectable page fetcher.
///
/// Up to `fan_out` pages are requested per wave and reassembled strictly
/// in page order. The first failed page halts pagination with earlier
/// pages still delivered; hitting `max_rows` truncates and sets the flag
/// instead of failing.
async fn paginate<F, Fut>(
    fetch_page: F,
    page_size: usize,
    max_rows: usize,
    fan_out: usize,
) -> FetchOutcome
where
    F: Fn(usize) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<EventRecord>>>,
{
    let mut records: Vec<EventRecord> = Vec::new();
    let mut truncated = false;
    let mut error: Option<String> = None;
    let mut next_offset = 0usize;

    'fetch: loop {
        let remaining = max_rows - records.len();
        let pages_needed = ((remaining + page_size - 1) / page_size).min(fan_out);
        let offsets: Vec<usize> = (0..pages_needed)
            .map(|i| next_offset + i * page_size)
            .collect();

        let wave = join_all(offsets.iter().map(|offset| fetch_page(*offset))).await;

        let mut exhausted = false;
        for page in wave {
            match page {
                Ok(rows) => {
                    let fetched = rows.len();
                    records.extend(rows);
                    if records.len() >= max_rows {
                        records.truncate(max_rows);
                        truncated = true;
                        tracing::warn!(max_rows, "Row cap reached; results are truncated");
                        break 'fetch;
                    }
                    if fetched < page_size {
                        exhausted = true;
                        break;
                    }
                }
                Err(e) => {
                    // Partial results already fetched are still delivered.
                    tracing::error!(error = %e, "Page fetch failed; halting pagination");
                    error = Some(e.to_string());
                    break 'fetch;
                }
            }
        }
        if exhausted {
            break;
        }
        next_offset += pages_needed * page_size;
    }

    FetchOutcome {
        records,
        truncated,
        error,
    }
}

/// Build the query string for one page.
///
/// The day-granularity range expands to inclusive UTC instants; each
/// `Equals` constraint becomes one exact-match parameter; each `Absent`
/// constraint becomes an `absent=<dimension>` parameter, which the
/// store distinguishes from "equals empty string".
fn query_params(
    range: &DateRange,
    filters: &FilterSet,
    offset: usize,
    limit: usize,
) -> Vec<(String, String)> {
    let mut params = vec![
        ("from".to_string(), range.start_instant().to_rfc3339()),
        ("to".to_string(), range.end_instant().to_rfc3339()),
        ("order".to_string(), "asc".to_string()),
        ("offset".to_string(), offset.to_string()),
        ("limit".to_string(), limit.to_string()),
    ];
    for (dimension, constraint) in filters.iter() {
        match constraint {
            FilterValue::Equals(value) => {
                params.push((dimension.as_str().to_string(), value.clone()));
            }
            FilterValue::Absent => {
                params.push(("absent".to_string(), dimension.as_str().to_string()));
            }
        }
    }
    params
}
