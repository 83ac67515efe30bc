use appscope_core::Platform;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::*;

const HEADER: &str = "App,Category,Rating,Reviews,Size,Installs,Type,Price,Content Rating,Genres,Last Updated,Current Ver,Android Ver\n";

fn normalize(body: &str) -> NormalizedApps {
    let input = format!("{HEADER}{body}");
    normalize_apps(input.as_bytes(), "test.csv").unwrap()
}

#[test]
fn normalizes_a_complete_row() {
    let out = normalize(
        "Photo Editor,ART_AND_DESIGN,4.1,159,19M,\"10,000+\",Free,0,Everyone,Art & Design,\"January 7, 2018\",1.0.0,4.0.3 and up\n",
    );
    assert_eq!(out.records.len(), 1);
    let app = &out.records[0];
    assert_eq!(app.name, "Photo Editor");
    assert_eq!(app.id, "Photo Editor");
    assert_eq!(app.platform, Platform::Android);
    assert_eq!(app.category, "Creative");
    assert_eq!(app.original_category, "ART_AND_DESIGN");
    assert_eq!(app.rating, Some(4.1));
    assert_eq!(app.review_count, 159);
    assert_eq!(app.size_mb, Some(19.0));
    assert_eq!(app.install_count_bucket, "10,000+");
    assert_eq!(app.installs, 10_000);
    assert!(app.is_free);
    assert_eq!(app.price, Decimal::ZERO);
    assert_eq!(app.content_rating.as_deref(), Some("Everyone"));
    assert_eq!(app.last_updated, NaiveDate::from_ymd_opt(2018, 1, 7));
    assert_eq!(app.version.as_deref(), Some("1.0.0"));
    assert_eq!(app.min_os_version.as_deref(), Some("4.0.3 and up"));
    assert_eq!(out.report.rows_retained, 1);
    assert_eq!(out.report.field_error_total(), 0);
}

#[test]
fn missing_rating_is_absent_not_zero() {
    let out = normalize("Notes,PRODUCTIVITY,NaN,0,2.5M,100+,Free,0,Everyone,Productivity,\"May 1, 2018\",1.0,4.1 and up\n");
    assert_eq!(out.records[0].rating, None);
    assert_eq!(out.report.field_error_total(), 0);
}

#[test]
fn bad_rating_is_recovered_and_counted() {
    let out = normalize("Odd,TOOLS,19,3.0M,1.0M,\"1,000+\",Free,0,Everyone,Tools,\"May 1, 2018\",1.0,4.1 and up\n");
    let app = &out.records[0];
    assert_eq!(app.rating, None);
    assert_eq!(app.review_count, 3_000_000);
    assert_eq!(out.report.field_errors.get("rating"), Some(&1));
}

#[test]
fn unparseable_price_becomes_free() {
    let out = normalize("Pricey,TOOLS,4.0,10,1M,100+,Paid,$N/A,Everyone,Tools,\"May 1, 2018\",1.0,4.1 and up\n");
    let app = &out.records[0];
    assert_eq!(app.price, Decimal::ZERO);
    assert!(app.is_free);
    assert_eq!(out.report.field_errors.get("price"), Some(&1));
    assert_eq!(out.report.rows_retained, 1);
}

#[test]
fn paid_price_is_parsed() {
    let out = normalize("Pro,TOOLS,4.0,10,1M,100+,Paid,$4.99,Everyone,Tools,\"May 1, 2018\",1.0,4.1 and up\n");
    assert_eq!(out.records[0].price, Decimal::new(499, 2));
    assert!(!out.records[0].is_free);
}

#[test]
fn rows_missing_required_keys_are_dropped() {
    let out = normalize(
        ",TOOLS,4.0,10,1M,100+,Free,0,Everyone,Tools,,1.0,4.1\nNoCategory,,4.0,10,1M,100+,Free,0,Everyone,Tools,,1.0,4.1\nKept,TOOLS,4.0,10,1M,100+,Free,0,Everyone,Tools,,1.0,4.1\n",
    );
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.report.rows_read, 3);
    assert_eq!(out.report.rows_dropped, 2);
    assert_eq!(out.report.rows_retained, 1);
}

#[test]
fn duplicate_names_keep_latest_update() {
    let out = normalize(
        "Chat,SOCIAL,4.0,10,1M,100+,Free,0,Everyone,Social,\"January 1, 2018\",1.0,4.1\nChat,SOCIAL,4.5,20,1M,100+,Free,0,Everyone,Social,\"June 1, 2018\",2.0,4.1\nChat,SOCIAL,3.0,30,1M,100+,Free,0,Everyone,Social,\"March 1, 2018\",1.5,4.1\n",
    );
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].version.as_deref(), Some("2.0"));
    assert_eq!(out.report.duplicates_removed, 2);
}

#[test]
fn short_rows_are_tolerated() {
    let out = normalize("Tiny,WEATHER,4.2\n");
    assert_eq!(out.records.len(), 1);
    assert_eq!(out.records[0].category, "Weather");
    assert_eq!(out.records[0].review_count, 0);
}

#[test]
fn missing_category_column_is_fatal() {
    let err = normalize_apps("App,Rating\nX,4.0\n".as_bytes(), "bad.csv").unwrap_err();
    assert!(matches!(err, IngestError::MissingColumn { ref column, .. } if column == "category"));
}

#[test]
fn invalid_utf8_in_one_row_keeps_the_whole_export() {
    let mut input = b"App,Category,Rating\nGood,TOOLS,4.0\n".to_vec();
    input.extend_from_slice(b"Bad\xff,TOOLS,3.0\nAlso Good,GAME,2.0\n");
    let out = normalize_apps(input.as_slice(), "latin1.csv").unwrap();

    assert_eq!(out.report.rows_read, 3);
    assert_eq!(out.report.rows_retained, 3);
    assert_eq!(out.records.len(), 3);
    assert_eq!(out.records[1].name, "Bad\u{fffd}");
    assert_eq!(out.records[1].rating, Some(3.0));
    assert_eq!(out.report.field_errors.get("encoding"), Some(&1));
}

#[test]
fn empty_input_is_fatal() {
    let err = normalize_apps("".as_bytes(), "empty.csv").unwrap_err();
    assert!(matches!(err, IngestError::EmptyFile { .. }));
}

#[test]
fn missing_file_is_reported() {
    let err = load_apps(Path::new("/nonexistent/apps.csv")).unwrap_err();
    assert!(matches!(err, IngestError::FileNotFound { .. }));
}

#[test]
fn completeness_reflects_field_errors() {
    let out = normalize("Pricey,TOOLS,4.0,10,1M,100+,Paid,$N/A,Everyone,Tools,\"May 1, 2018\",1.0,4.1 and up\n");
    let completeness = out.report.completeness();
    assert_eq!(completeness.rows_read, 1);
    assert_eq!(completeness.field_errors, 1);
    assert!(completeness.ratio() < 1.0);
}
