//! Mapping from App Store search results onto [`AppRecord`].

use appscope_core::{unify_category, AppRecord, Platform, RecordSource};
use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;

use crate::types::ItunesApp;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Converts one search result into an ios-tagged [`AppRecord`].
///
/// Returns `None` when the entry has no `trackId` or no name. A rating is
/// kept only when the service reports at least one rating behind it.
#[must_use]
pub fn normalize_app(app: ItunesApp) -> Option<AppRecord> {
    let id = app.track_id?.to_string();
    let name = app.track_name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty())?;

    let review_count = app.user_rating_count.unwrap_or(0);
    let rating = app
        .average_user_rating
        .filter(|r| review_count > 0 && (0.0..=5.0).contains(r));

    let price = app.price.map_or(Decimal::ZERO, to_price);
    let original_category = app
        .primary_genre_name
        .unwrap_or_else(|| "Unknown".to_string());
    let genres = (!app.genres.is_empty()).then(|| app.genres.join(", "));

    Some(AppRecord {
        id,
        name,
        platform: Platform::Ios,
        category: unify_category(&original_category),
        original_category,
        rating,
        review_count,
        is_free: price.is_zero(),
        price,
        install_count_bucket: String::new(),
        installs: 0,
        size_mb: app.file_size_bytes.as_ref().and_then(size_mb),
        content_rating: app.content_advisory_rating,
        genres,
        last_updated: app
            .current_version_release_date
            .as_deref()
            .and_then(parse_release_date),
        version: app.version,
        min_os_version: app.minimum_os_version,
        developer: app.artist_name,
        source: RecordSource::AppStore,
    })
}

/// Rounds to cents; negative or non-finite prices become zero.
fn to_price(raw: f64) -> Decimal {
    Decimal::try_from(raw)
        .map(|d| d.round_dp(2).max(Decimal::ZERO))
        .unwrap_or(Decimal::ZERO)
}

#[allow(clippy::cast_precision_loss)]
fn size_mb(raw: &serde_json::Value) -> Option<f64> {
    let bytes = match raw {
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok()?,
        serde_json::Value::Number(n) => n.as_u64()?,
        _ => return None,
    };
    Some(bytes as f64 / BYTES_PER_MB)
}

/// Parses `"2024-01-15T08:00:00Z"` (or a bare date) into a [`NaiveDate`].
fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_app() -> ItunesApp {
        ItunesApp {
            track_id: Some(324_684_580),
            track_name: Some("Spotify - Music and Podcasts".to_owned()),
            artist_name: Some("Spotify".to_owned()),
            primary_genre_name: Some("Music".to_owned()),
            genres: vec!["Music".to_owned(), "Entertainment".to_owned()],
            average_user_rating: Some(4.78),
            user_rating_count: Some(35_000_000),
            price: Some(0.0),
            currency: Some("USD".to_owned()),
            content_advisory_rating: Some("12+".to_owned()),
            file_size_bytes: Some(serde_json::json!("209715200")),
            current_version_release_date: Some("2024-01-15T08:00:00Z".to_owned()),
            bundle_id: Some("com.spotify.client".to_owned()),
            version: Some("8.9.6".to_owned()),
            minimum_os_version: Some("15.0".to_owned()),
        }
    }

    #[test]
    fn maps_full_entry() {
        let record = normalize_app(full_app()).unwrap();
        assert_eq!(record.id, "324684580");
        assert_eq!(record.platform, Platform::Ios);
        assert_eq!(record.category, "Music");
        assert_eq!(record.rating, Some(4.78));
        assert_eq!(record.review_count, 35_000_000);
        assert!(record.is_free);
        assert_eq!(record.size_mb, Some(200.0));
        assert_eq!(record.genres.as_deref(), Some("Music, Entertainment"));
        assert_eq!(record.last_updated, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(record.developer.as_deref(), Some("Spotify"));
        assert_eq!(record.source, RecordSource::AppStore);
    }

    #[test]
    fn unifies_app_store_genre() {
        let mut app = full_app();
        app.primary_genre_name = Some("Social Networking".to_owned());
        assert_eq!(normalize_app(app).unwrap().category, "Social");
    }

    #[test]
    fn missing_track_id_is_skipped() {
        let mut app = full_app();
        app.track_id = None;
        assert!(normalize_app(app).is_none());
    }

    #[test]
    fn blank_name_is_skipped() {
        let mut app = full_app();
        app.track_name = Some("  ".to_owned());
        assert!(normalize_app(app).is_none());
    }

    #[test]
    fn rating_without_reviews_is_absent() {
        let mut app = full_app();
        app.user_rating_count = Some(0);
        assert_eq!(normalize_app(app).unwrap().rating, None);
    }

    #[test]
    fn paid_price_rounds_to_cents() {
        let mut app = full_app();
        app.price = Some(2.99);
        let record = normalize_app(app).unwrap();
        assert_eq!(record.price, Decimal::new(299, 2));
        assert!(!record.is_free);
    }

    #[test]
    fn numeric_file_size_is_accepted() {
        assert_eq!(size_mb(&serde_json::json!(1_048_576)), Some(1.0));
        assert_eq!(size_mb(&serde_json::json!("abc")), None);
    }
}
