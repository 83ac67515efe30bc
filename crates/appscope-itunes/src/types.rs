//! App Store search response types.
//!
//! Every field of a result is optional: the service omits keys freely and
//! callers decide which gaps make an entry unusable.

use serde::Deserialize;

/// Envelope of a `search` response: `{ "resultCount": n, "results": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub result_count: u32,
    #[serde(default)]
    pub results: Vec<ItunesApp>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItunesApp {
    #[serde(default)]
    pub track_id: Option<i64>,
    #[serde(default)]
    pub track_name: Option<String>,
    #[serde(default)]
    pub artist_name: Option<String>,
    #[serde(default)]
    pub primary_genre_name: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub average_user_rating: Option<f64>,
    #[serde(default)]
    pub user_rating_count: Option<u64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub content_advisory_rating: Option<String>,
    /// Sent as a string by the service; some mirrors send a number.
    #[serde(default)]
    pub file_size_bytes: Option<serde_json::Value>,
    #[serde(default)]
    pub current_version_release_date: Option<String>,
    #[serde(default)]
    pub bundle_id: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub minimum_os_version: Option<String>,
}
