//! Loader for the direct-to-consumer campaign export (saved as CSV).
//!
//! Accepts either an explicit `conversions` column or the purchase split
//! (`first_purchase`, `repeat_purchase`), in which case conversions are the
//! sum of both.
//!
//! A row with an unparseable number is skipped. An unparseable `date` only
//! clears the date and is counted as a field error.

use std::io::Read;
use std::path::Path;

use appscope_core::CampaignRecord;
use csv::StringRecord;

use crate::columns::{decode_lossy, Columns};
use crate::error::{IngestError, ParseError};
use crate::parse::{is_missing, parse_amount, parse_count, parse_date};

const HEADER_ALIASES: &[(&str, &str)] = &[
    ("spend_usd", "spend"),
    ("revenue_usd", "revenue"),
    ("seo_category", "category"),
];

const REQUIRED_COLUMNS: &[&str] = &["channel", "spend", "revenue", "impressions", "clicks"];

#[derive(Debug, Clone)]
pub struct CampaignLoad {
    pub records: Vec<CampaignRecord>,
    pub rows_read: u64,
    /// Rows with no channel or an unparseable number.
    pub rows_skipped: u64,
    /// Recovered field errors on kept rows (bad dates, invalid UTF-8).
    pub field_errors: u64,
}

/// Opens and parses the campaign export at `path`.
///
/// # Errors
///
/// Returns [`IngestError`] if the file is missing, unreadable, malformed or
/// lacks a required column.
pub fn load_campaigns(path: &Path) -> Result<CampaignLoad, IngestError> {
    if !path.exists() {
        return Err(IngestError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let file = std::fs::File::open(path).map_err(|e| IngestError::FileRead {
        path: path.display().to_string(),
        source: e,
    })?;
    read_campaigns(file, &path.display().to_string())
}

/// Parses campaign rows from `reader`.
///
/// # Errors
///
/// Returns [`IngestError`] for a missing header row, a missing required
/// column, or a CSV structural error.
pub fn read_campaigns<R: Read>(reader: R, context: &str) -> Result<CampaignLoad, IngestError> {
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
    if !columns.has("conversions") && !columns.has("first_purchase") {
        return Err(IngestError::MissingColumn {
            context: context.to_string(),
            column: "conversions".to_string(),
        });
    }

    let mut load = CampaignLoad {
        records: Vec::new(),
        rows_read: 0,
        rows_skipped: 0,
        field_errors: 0,
    };

    for result in reader.byte_records() {
        let raw = result.map_err(csv_error)?;
        load.rows_read += 1;
        let line = raw.position().map_or(load.rows_read + 1, csv::Position::line);
        let (row, lossy) = decode_lossy(&raw);
        match parse_row(&row, &columns) {
            Ok(Some(parsed)) => {
                if lossy {
                    tracing::debug!(context, line, "replaced invalid UTF-8 in campaign row");
                    load.field_errors += 1;
                }
                if let Some(err) = parsed.date_error {
                    tracing::debug!(context, line, error = %err, "cleared unparseable campaign date");
                    load.field_errors += 1;
                }
                load.records.push(parsed.record);
            }
            Ok(None) => load.rows_skipped += 1,
            Err(err) => {
                tracing::debug!(context, line, error = %err, "skipping campaign row");
                load.rows_skipped += 1;
            }
        }
    }

    if load.rows_skipped > 0 {
        tracing::warn!(
            context,
            skipped = load.rows_skipped,
            "skipped campaign rows without a channel or with unparseable numbers"
        );
    }
    tracing::info!(
        context,
        read = load.rows_read,
        kept = load.records.len(),
        skipped = load.rows_skipped,
        field_errors = load.field_errors,
        "loaded campaign export"
    );

    Ok(load)
}

struct ParsedRow {
    record: CampaignRecord,
    date_error: Option<ParseError>,
}

fn parse_row(row: &StringRecord, columns: &Columns) -> Result<Option<ParsedRow>, ParseError> {
    let channel = columns.get(row, "channel").trim();
    if is_missing(channel) {
        return Ok(None);
    }

    let conversions = if columns.has("conversions") {
        parse_count("conversions", columns.get(row, "conversions"))?
    } else {
        let first = parse_count("first_purchase", columns.get(row, "first_purchase"))?;
        let repeat = match columns.get(row, "repeat_purchase") {
            raw if is_missing(raw) => 0,
            raw => parse_count("repeat_purchase", raw)?,
        };
        first + repeat
    };

    let text = |column: &str| {
        let raw = columns.get(row, column).trim();
        (!is_missing(raw)).then(|| raw.to_string())
    };

    let (date, date_error) = match parse_date("date", columns.get(row, "date")) {
        Ok(date) => (date, None),
        Err(err) => (None, Some(err)),
    };

    let record = CampaignRecord {
        channel: channel.to_string(),
        spend: parse_amount("spend", columns.get(row, "spend"))?,
        revenue: parse_amount("revenue", columns.get(row, "revenue"))?,
        impressions: parse_count("impressions", columns.get(row, "impressions"))?,
        clicks: parse_count("clicks", columns.get(row, "clicks"))?,
        conversions,
        date,
        campaign_id: text("campaign_id"),
        category: text("category"),
    };
    Ok(Some(ParsedRow { record, date_error }))
}
