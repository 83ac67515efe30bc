//! Sequential enrichment pass: one lookup per term, retry-then-skip.
//!
//! A term that returns nothing is a miss; a term whose request still fails
//! after the retry is a failure. Neither stops the remaining terms.

use std::collections::HashSet;

use appscope_core::{AppRecord, Completeness};
use serde::Serialize;

use crate::client::LookupClient;
use crate::normalize::normalize_app;
use crate::retry::retry_with_backoff;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TermFailure {
    pub term: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnrichmentReport {
    pub terms_total: u64,
    /// Terms that returned at least one result.
    pub resolved: u64,
    /// Terms with zero results.
    pub misses: Vec<String>,
    pub failures: Vec<TermFailure>,
    /// Results whose `trackId` was already collected.
    pub duplicates_skipped: u64,
    /// Results without a `trackId` or name.
    pub unusable_entries: u64,
    pub records: u64,
}

impl EnrichmentReport {
    #[must_use]
    pub fn completeness(&self) -> Completeness {
        Completeness {
            terms_attempted: self.terms_total,
            terms_resolved: self.resolved,
            ..Completeness::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct Enrichment {
    pub records: Vec<AppRecord>,
    pub report: EnrichmentReport,
}

/// Resolves each term against the lookup service, strictly one request at a
/// time with the configured pause between requests.
///
/// Results are deduplicated by `trackId` across all terms, keeping the first
/// occurrence.
pub async fn enrich_terms(client: &LookupClient, terms: &[String]) -> Enrichment {
    let mut records = Vec::new();
    let mut report = EnrichmentReport::default();
    let mut seen_ids: HashSet<String> = HashSet::new();

    for (index, term) in terms.iter().enumerate() {
        if index > 0 && !client.inter_request_delay().is_zero() {
            tokio::time::sleep(client.inter_request_delay()).await;
        }
        report.terms_total += 1;

        let results = match retry_with_backoff(client.max_retries(), client.retry_backoff(), || {
            client.search(term)
        })
        .await
        {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(term = %term, error = %e, "lookup failed, skipping term");
                report.failures.push(TermFailure {
                    term: term.clone(),
                    error: e.to_string(),
                });
                continue;
            }
        };

        if results.is_empty() {
            tracing::info!(term = %term, "lookup returned no results");
            report.misses.push(term.clone());
            continue;
        }
        report.resolved += 1;

        let mut added = 0usize;
        for app in results {
            let Some(record) = normalize_app(app) else {
                report.unusable_entries += 1;
                continue;
            };
            if !seen_ids.insert(record.id.clone()) {
                report.duplicates_skipped += 1;
                continue;
            }
            records.push(record);
            added += 1;
        }
        tracing::debug!(term = %term, added, "term resolved");
    }

    report.records = records.len() as u64;
    tracing::info!(
        terms = report.terms_total,
        resolved = report.resolved,
        misses = report.misses.len(),
        failures = report.failures.len(),
        records = report.records,
        "enrichment complete"
    );

    Enrichment { records, report }
}
