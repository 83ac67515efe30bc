use std::collections::HashSet;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Android => f.pad("android"),
            Platform::Ios => f.pad("ios"),
        }
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "android" | "google_play" => Ok(Platform::Android),
            "ios" | "app_store" => Ok(Platform::Ios),
            other => Err(CoreError::InvalidPlatform(other.to_string())),
        }
    }
}

/// Where a record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    GooglePlay,
    AppStore,
}

/// One app, normalized into the shared schema.
///
/// `rating` is `None` when the source had no usable rating; it is never
/// coerced to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
    pub id: String,
    pub name: String,
    pub platform: Platform,
    /// Unified category label.
    pub category: String,
    /// Category label as the store reported it.
    pub original_category: String,
    pub rating: Option<f64>,
    pub review_count: u64,
    pub price: Decimal,
    /// Install bucket as published (`"10,000+"`); empty when the store does not publish one.
    pub install_count_bucket: String,
    /// Lower bound of the install bucket.
    pub installs: u64,
    pub is_free: bool,
    pub size_mb: Option<f64>,
    pub content_rating: Option<String>,
    pub genres: Option<String>,
    pub last_updated: Option<NaiveDate>,
    pub version: Option<String>,
    pub min_os_version: Option<String>,
    pub developer: Option<String>,
    pub source: RecordSource,
}

impl AppRecord {
    /// A free, unrated record with every optional field empty.
    #[must_use]
    pub fn new(platform: Platform, id: &str, name: &str, category: &str) -> Self {
        let source = match platform {
            Platform::Android => RecordSource::GooglePlay,
            Platform::Ios => RecordSource::AppStore,
        };
        Self {
            id: id.to_string(),
            name: name.to_string(),
            platform,
            category: category.to_string(),
            original_category: category.to_string(),
            rating: None,
            review_count: 0,
            price: Decimal::ZERO,
            install_count_bucket: String::new(),
            installs: 0,
            is_free: true,
            size_mb: None,
            content_rating: None,
            genres: None,
            last_updated: None,
            version: None,
            min_os_version: None,
            developer: None,
            source,
        }
    }
}

/// The merged set of app records across both platforms, unique by
/// `(platform, id)`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct UnifiedCollection {
    records: Vec<AppRecord>,
}

impl UnifiedCollection {
    /// Concatenates normalized local records with enriched remote records.
    ///
    /// Returns the collection and the number of records skipped because
    /// their `(platform, id)` key was already present.
    #[must_use]
    pub fn from_sources(local: Vec<AppRecord>, remote: Vec<AppRecord>) -> (Self, usize) {
        Self::from_records(local.into_iter().chain(remote))
    }

    /// Builds a collection keeping the first record for each `(platform, id)`.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = AppRecord>) -> (Self, usize) {
        let mut seen = HashSet::new();
        let mut kept = Vec::new();
        let mut skipped = 0usize;
        for record in records {
            if seen.insert((record.platform, record.id.clone())) {
                kept.push(record);
            } else {
                skipped += 1;
            }
        }
        (Self { records: kept }, skipped)
    }

    #[must_use]
    pub fn records(&self) -> &[AppRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AppRecord> {
        self.records.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn count_platform(&self, platform: Platform) -> usize {
        self.records.iter().filter(|r| r.platform == platform).count()
    }
}

impl<'a> IntoIterator for &'a UnifiedCollection {
    type Item = &'a AppRecord;
    type IntoIter = std::slice::Iter<'a, AppRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// One row of the marketing campaign export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecord {
    pub channel: String,
    pub spend: Decimal,
    pub revenue: Decimal,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub date: Option<NaiveDate>,
    pub campaign_id: Option<String>,
    pub category: Option<String>,
}

/// Parse-success counters gathered while loading and enriching, used to score
/// how much of the expected data actually arrived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completeness {
    pub rows_read: u64,
    pub rows_retained: u64,
    /// Typed fields that parsed cleanly on retained rows.
    pub fields_parsed: u64,
    /// Typed fields that failed to parse and were recovered.
    pub field_errors: u64,
    pub terms_attempted: u64,
    pub terms_resolved: u64,
}

impl Completeness {
    /// Fraction of attempted units (rows, fields, terms) that succeeded, in `[0, 1]`.
    ///
    /// Returns `1.0` when nothing was attempted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        let attempted =
            self.rows_read + self.fields_parsed + self.field_errors + self.terms_attempted;
        if attempted == 0 {
            return 1.0;
        }
        let succeeded = self.rows_retained + self.fields_parsed + self.terms_resolved;
        (succeeded as f64 / attempted as f64).clamp(0.0, 1.0)
    }

    #[must_use]
    pub fn merge(self, other: Completeness) -> Completeness {
        Completeness {
            rows_read: self.rows_read + other.rows_read,
            rows_retained: self.rows_retained + other.rows_retained,
            fields_parsed: self.fields_parsed + other.fields_parsed,
            field_errors: self.field_errors + other.field_errors,
            terms_attempted: self.terms_attempted + other.terms_attempted,
            terms_resolved: self.terms_resolved + other.terms_resolved,
        }
    }
}
