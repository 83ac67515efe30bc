//! HTTP client for the App Store search service.
//!
//! Wraps `reqwest` with status classification and typed response decoding.
//! Retry and pacing live in [`crate::enrich`]; this client performs exactly
//! one request per call.

use std::time::Duration;

use appscope_core::LookupSettings;
use reqwest::{Client, StatusCode, Url};

use crate::error::LookupError;
use crate::types::{ItunesApp, SearchResponse};

/// Client for the App Store `search` endpoint.
///
/// Point `LookupSettings::base_url` at a mock server in tests.
pub struct LookupClient {
    client: Client,
    base_url: Url,
    country: String,
    result_limit: u32,
    inter_request_delay: Duration,
    max_retries: u32,
    retry_backoff: Duration,
}

impl LookupClient {
    /// Creates a client from the configured lookup settings.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`LookupError::InvalidBaseUrl`] if the base
    /// URL does not parse.
    pub fn new(settings: &LookupSettings) -> Result<Self, LookupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(settings.user_agent.as_str())
            .build()?;

        // Exactly one trailing slash so `join("search")` appends a segment
        // instead of replacing the last one.
        let normalised = format!("{}/", settings.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| LookupError::InvalidBaseUrl {
            base_url: settings.base_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            country: settings.country.clone(),
            result_limit: settings.result_limit,
            inter_request_delay: Duration::from_millis(settings.inter_request_delay_ms),
            max_retries: settings.max_retries,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        })
    }

    pub(crate) fn inter_request_delay(&self) -> Duration {
        self.inter_request_delay
    }

    pub(crate) fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub(crate) fn retry_backoff(&self) -> Duration {
        self.retry_backoff
    }

    /// Searches the software catalogue for `term`, returning at most the
    /// configured result limit.
    ///
    /// # Errors
    ///
    /// - [`LookupError::RateLimited`] on HTTP 429.
    /// - [`LookupError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`LookupError::Http`] on network failure or timeout.
    /// - [`LookupError::Deserialize`] if the body is not a search response.
    pub async fn search(&self, term: &str) -> Result<Vec<ItunesApp>, LookupError> {
        let limit = self.result_limit.to_string();
        let url = self.build_url(
            "search",
            &[
                ("term", term),
                ("country", &self.country),
                ("media", "software"),
                ("entity", "software"),
                ("limit", &limit),
            ],
        )?;

        let body = self.request_text(&url).await?;
        let response: SearchResponse =
            serde_json::from_str(&body).map_err(|e| LookupError::Deserialize {
                context: format!("search(term={term})"),
                source: e,
            })?;

        tracing::debug!(
            term,
            result_count = response.result_count,
            returned = response.results.len(),
            "lookup search complete"
        );
        Ok(response.results)
    }

    /// Builds the request URL with percent-encoded query parameters.
    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, LookupError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| LookupError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn request_text(&self, url: &Url) -> Result<String, LookupError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(LookupError::RateLimited {
                url: url.to_string(),
            });
        }
        if !status.is_success() {
            return Err(LookupError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
