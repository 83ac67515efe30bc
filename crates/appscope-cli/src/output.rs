//! Artifact writers for the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use appscope_core::{AppRecord, UnifiedCollection};
use serde::Serialize;

pub(crate) const UNIFIED_APPS_JSON: &str = "unified_apps.json";
pub(crate) const UNIFIED_APPS_CSV: &str = "unified_apps.csv";
pub(crate) const MARKET_AGGREGATES_JSON: &str = "market_aggregates.json";
pub(crate) const FINDINGS_JSON: &str = "findings.json";
pub(crate) const MARKET_REPORT_MD: &str = "market_report.md";
pub(crate) const CAMPAIGN_FINDINGS_JSON: &str = "campaign_findings.json";
pub(crate) const CAMPAIGN_REPORT_MD: &str = "campaign_report.md";
pub(crate) const RUN_SUMMARY_JSON: &str = "run_summary.json";

fn ensure_dir(dir: &Path) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory {}", dir.display()))
}

/// Pretty-prints `value` as JSON into `dir/name`.
pub(crate) fn write_json<T: Serialize + ?Sized>(
    dir: &Path,
    name: &str,
    value: &T,
) -> anyhow::Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(name);
    let body = serde_json::to_string_pretty(value)
        .with_context(|| format!("failed to serialize {name}"))?;
    fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote artifact");
    Ok(path)
}

pub(crate) fn write_text(dir: &Path, name: &str, text: &str) -> anyhow::Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(name);
    fs::write(&path, text).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote artifact");
    Ok(path)
}

/// One row per record, columns in [`AppRecord`] field order.
pub(crate) fn write_apps_csv(dir: &Path, collection: &UnifiedCollection) -> anyhow::Result<PathBuf> {
    ensure_dir(dir)?;
    let path = dir.join(UNIFIED_APPS_CSV);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for record in collection {
        writer
            .serialize(record)
            .with_context(|| format!("failed to write app {} to {}", record.id, path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    tracing::info!(path = %path.display(), records = collection.len(), "wrote artifact");
    Ok(path)
}

/// Writes the collection as both JSON and CSV.
pub(crate) fn write_unified(
    dir: &Path,
    collection: &UnifiedCollection,
) -> anyhow::Result<Vec<PathBuf>> {
    Ok(vec![
        write_json(dir, UNIFIED_APPS_JSON, collection)?,
        write_apps_csv(dir, collection)?,
    ])
}

/// Reloads the collection written by an earlier run.
pub(crate) fn read_unified(dir: &Path) -> anyhow::Result<UnifiedCollection> {
    let path = dir.join(UNIFIED_APPS_JSON);
    let body = fs::read_to_string(&path).with_context(|| {
        format!(
            "failed to read {}; run `appscope run` or `appscope stage enrich` first",
            path.display()
        )
    })?;
    let records: Vec<AppRecord> = serde_json::from_str(&body)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    let (collection, duplicates) = UnifiedCollection::from_records(records);
    if duplicates > 0 {
        tracing::warn!(duplicates, path = %path.display(), "ignored duplicate records");
    }
    Ok(collection)
}

/// Completeness ratio recorded by the last full run, if one was written.
pub(crate) fn read_completeness(dir: &Path) -> Option<f64> {
    let path = dir.join(RUN_SUMMARY_JSON);
    let body = fs::read_to_string(&path).ok()?;
    let summary: serde_json::Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable run summary");
            return None;
        }
    };
    summary.get("completeness_ratio")?.as_f64()
}
