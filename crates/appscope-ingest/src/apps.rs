//! Normalization of the Google Play export into [`AppRecord`]s.
//!
//! Structural problems (missing file, unreadable CSV, missing `name` or
//! `category` column) are fatal. Everything below that is recovered per row
//! or per field and counted in [`NormalizeReport`].

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use appscope_core::{unify_category, AppRecord, Completeness, Platform, RecordSource};
use csv::StringRecord;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::columns::{decode_lossy, Columns};
use crate::error::{IngestError, ParseError};
use crate::parse::{
    is_missing, parse_date, parse_installs, parse_price, parse_rating, parse_reviews,
    parse_size_mb,
};

const HEADER_ALIASES: &[(&str, &str)] = &[
    ("app", "name"),
    ("current_ver", "current_version"),
    ("android_ver", "android_version"),
];

const REQUIRED_COLUMNS: &[&str] = &["name", "category"];

/// Row and field counters for one normalization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeReport {
    pub rows_read: u64,
    pub rows_retained: u64,
    /// Rows without a name or category.
    pub rows_dropped: u64,
    /// Retained rows folded into a more recently updated row of the same name.
    pub duplicates_removed: u64,
    pub fields_parsed: u64,
    /// Recovered field errors keyed by column. Rows with invalid UTF-8 are
    /// decoded lossily and counted under `encoding`.
    pub field_errors: BTreeMap<String, u64>,
}

impl NormalizeReport {
    #[must_use]
    pub fn field_error_total(&self) -> u64 {
        self.field_errors.values().sum()
    }

    #[must_use]
    pub fn completeness(&self) -> Completeness {
        Completeness {
            rows_read: self.rows_read,
            rows_retained: self.rows_retained,
            fields_parsed: self.fields_parsed,
            field_errors: self.field_error_total(),
            ..Completeness::default()
        }
    }

    fn recover<T>(&mut self, line: u64, result: Result<T, ParseError>, fallback: T) -> T {
        match result {
            Ok(value) => {
                self.fields_parsed += 1;
                value
            }
            Err(err) => {
                tracing::debug!(line, field = err.field, error = %err, "recovered field parse error");
                *self.field_errors.entry(err.field.to_string()).or_default() += 1;
                fallback
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NormalizedApps {
    pub records: Vec<AppRecord>,
    pub report: NormalizeReport,
}

/// Opens and normalizes the app export at `path`.
///
/// # Errors
///
/// Returns [`IngestError`] if the file is missing, unreadable or structurally
/// malformed.
pub fn load_apps(path: &Path) -> Result<NormalizedApps, IngestError> {
    if !path.exists() {
        return Err(IngestError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let file = std::fs::File::open(path).map_err(|e| IngestError::FileRead {
        path: path.display().to_string(),
        source: e,
    })?;
    normalize_apps(file, &path.display().to_string())
}

/// Normalizes CSV rows from `reader` into android-tagged [`AppRecord`]s.
///
/// `context` names the input in errors and logs.
///
/// # Errors
///
/// Returns [`IngestError`] for a missing header row, a missing required
/// column, or a CSV structural error.
pub fn normalize_apps<R: Read>(reader: R, context: &str) -> Result<NormalizedApps, IngestError> {
    let csv_error = |source| IngestError::Csv {
        context: context.to_string(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let (headers, _) = decode_lossy(reader.byte_headers().map_err(csv_error)?);
    let columns = Columns::from_headers(&headers, HEADER_ALIASES, REQUIRED_COLUMNS, context)?;

    let mut report = NormalizeReport::default();
    let mut records: Vec<AppRecord> = Vec::new();
    let mut position_by_name: HashMap<String, usize> = HashMap::new();

    for result in reader.byte_records() {
        let raw = result.map_err(csv_error)?;
        report.rows_read += 1;
        let line = raw.position().map_or(report.rows_read + 1, csv::Position::line);
        let (row, lossy) = decode_lossy(&raw);
        if lossy {
            tracing::debug!(context, line, "replaced invalid UTF-8 in row");
            *report.field_errors.entry("encoding".to_string()).or_default() += 1;
        }

        let Some(record) = normalize_row(&row, &columns, line, &mut report) else {
            report.rows_dropped += 1;
            continue;
        };
        report.rows_retained += 1;

        match position_by_name.get(&record.name) {
            Some(&existing) => {
                report.duplicates_removed += 1;
                if record.last_updated > records[existing].last_updated {
                    records[existing] = record;
                }
            }
            None => {
                position_by_name.insert(record.name.clone(), records.len());
                records.push(record);
            }
        }
    }

    if report.rows_dropped > 0 {
        tracing::warn!(
            context,
            dropped = report.rows_dropped,
            "dropped rows missing name or category"
        );
    }
    tracing::info!(
        context,
        read = report.rows_read,
        retained = report.rows_retained,
        duplicates = report.duplicates_removed,
        field_errors = report.field_error_total(),
        "normalized app export"
    );

    Ok(NormalizedApps { records, report })
}

fn normalize_row(
    row: &StringRecord,
    columns: &Columns,
    line: u64,
    report: &mut NormalizeReport,
) -> Option<AppRecord> {
    let name = required(columns.get(row, "name"))?;
    let original_category = required(columns.get(row, "category"))?;

    let rating = report.recover(line, parse_rating(columns.get(row, "rating")), None);
    let review_count = report.recover(line, parse_reviews(columns.get(row, "reviews")), 0);
    let size_mb = report.recover(line, parse_size_mb(columns.get(row, "size")), None);

    let install_count_bucket = columns.get(row, "installs").trim().to_string();
    let installs = report.recover(line, parse_installs(&install_count_bucket), 0);

    let price = report.recover(line, parse_price(columns.get(row, "price")), Decimal::ZERO);
    let last_updated = report.recover(
        line,
        parse_date("last_updated", columns.get(row, "last_updated")),
        None,
    );

    Some(AppRecord {
        id: name.clone(),
        category: unify_category(&original_category),
        original_category,
        name,
        platform: Platform::Android,
        rating,
        review_count,
        is_free: price.is_zero(),
        price,
        install_count_bucket,
        installs,
        size_mb,
        content_rating: optional(columns.get(row, "content_rating")),
        genres: optional(columns.get(row, "genres")),
        last_updated,
        version: optional(columns.get(row, "current_version")),
        min_os_version: optional(columns.get(row, "android_version")),
        developer: None,
        source: RecordSource::GooglePlay,
    })
}

fn required(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!is_missing(trimmed)).then(|| trimmed.to_string())
}

fn optional(raw: &str) -> Option<String> {
    required(raw).filter(|v| !v.eq_ignore_ascii_case("varies with device"))
}

#[cfg(test)]
#[path = "apps_test.rs"]
mod tests;
