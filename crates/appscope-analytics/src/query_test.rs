use appscope_core::{AppRecord, Platform, UnifiedCollection};
use rust_decimal::Decimal;

use super::*;
use crate::narrator::{Topic, MARKET_TOPICS};

fn app(platform: Platform, id: &str, category: &str, rating: Option<f64>) -> AppRecord {
    let mut record = AppRecord::new(platform, id, id, category);
    record.rating = rating;
    record
}

fn engine(records: Vec<AppRecord>) -> QueryEngine {
    let (collection, _) = UnifiedCollection::from_records(records);
    QueryEngine::new(collection)
}

fn mixed() -> QueryEngine {
    engine(vec![
        app(Platform::Android, "a1", "Games", Some(3.0)),
        app(Platform::Android, "a2", "Games", None),
        app(Platform::Android, "a3", "Social", Some(5.0)),
        app(Platform::Ios, "i1", "Games", Some(4.5)),
    ])
}

fn params() -> QueryParams {
    QueryParams::default()
}

#[test]
fn compare_platforms_reports_means_and_counts() {
    let outcome = mixed().run("compare-platforms", &params()).unwrap();
    assert_eq!(outcome.stats.len(), 2);
    let android = &outcome.stats[0];
    let ios = &outcome.stats[1];
    assert_eq!((android.group_key.as_str(), android.count), ("android", 3));
    assert_eq!(android.mean_rating, Some(4.0));
    assert_eq!((ios.group_key.as_str(), ios.count), ("ios", 1));
    assert_eq!(ios.mean_rating, Some(4.5));
    assert_eq!(
        outcome.summary,
        "android 4.00 (3 apps) vs ios 4.50 (1 apps)"
    );
}

#[test]
fn compare_platforms_within_a_category() {
    let params = QueryParams {
        category: Some("GAME".to_string()),
        ..params()
    };
    let outcome = mixed().run("compare-platforms", &params).unwrap();
    assert_eq!(outcome.stats[0].count, 2);
    assert_eq!(outcome.stats[0].mean_rating, Some(3.0));
    assert_eq!(outcome.stats[1].count, 1);
}

#[test]
fn unknown_query_is_an_error() {
    let err = mixed().run("best-apps", &params()).unwrap_err();
    assert_eq!(err, QueryError::UnknownQuery("best-apps".to_string()));
    assert!(err.to_string().contains("compare-platforms"));
}

#[test]
fn query_names_accept_underscores_and_case() {
    assert_eq!(
        "Top_Categories".parse::<QueryName>().unwrap(),
        QueryName::TopCategories
    );
    for name in QueryName::ALL {
        assert_eq!(name.as_str().parse::<QueryName>().unwrap(), name);
    }
}

#[test]
fn empty_result_is_no_matches() {
    let params = QueryParams {
        category: Some("Weather".to_string()),
        ..params()
    };
    let outcome = mixed().run("compare-platforms", &params).unwrap();
    assert!(outcome.is_empty());
    assert_eq!(outcome.summary, "no matches");

    let outcome = engine(vec![]).run("summary", &QueryParams::default()).unwrap();
    assert_eq!(outcome.summary, "no matches");
}

#[test]
fn top_categories_respects_platform_and_limit() {
    let engine = mixed();
    let all = engine.run("top-categories", &params()).unwrap();
    let keys: Vec<&str> = all.stats.iter().map(|s| s.group_key.as_str()).collect();
    assert_eq!(keys, vec!["Games", "Social"]);

    let ios_only = QueryParams {
        platform: Some(Platform::Ios),
        limit: Some(1),
        ..params()
    };
    let outcome = engine.run("top-categories", &ios_only).unwrap();
    assert_eq!(outcome.stats.len(), 1);
    assert_eq!(outcome.stats[0].count, 1);
}

#[test]
fn top_categories_for_absent_platform_is_no_matches() {
    let engine = engine(vec![app(Platform::Android, "a", "Games", Some(4.0))]);
    let outcome = engine
        .run(
            "top-categories",
            &QueryParams {
                platform: Some(Platform::Ios),
                ..params()
            },
        )
        .unwrap();
    assert_eq!(outcome.summary, "no matches");
}

#[test]
fn category_requires_a_category() {
    let err = mixed().run("category", &params()).unwrap_err();
    assert_eq!(
        err,
        QueryError::MissingParameter {
            query: QueryName::Category,
            parameter: "category",
        }
    );
}

#[test]
fn category_lists_top_apps_above_min_rating() {
    let params = QueryParams {
        category: Some("games".to_string()),
        min_rating: Some(3.5),
        ..params()
    };
    let outcome = mixed().run("category", &params).unwrap();
    assert_eq!(outcome.stats[0].group_key, "Games");
    assert_eq!(outcome.stats[0].count, 3);
    let ids: Vec<&str> = outcome.apps.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["i1"]);
}

#[test]
fn category_orders_apps_by_rating_with_unrated_last() {
    let params = QueryParams {
        category: Some("Games".to_string()),
        ..params()
    };
    let outcome = mixed().run("category", &params).unwrap();
    let ids: Vec<&str> = outcome.apps.iter().map(|a| a.id.as_str()).collect();
    assert_eq!(ids, vec!["i1", "a1", "a2"]);
}

#[test]
fn opportunities_flag_small_weak_and_premium_categories() {
    let mut premium = app(Platform::Ios, "p", "Medical", Some(4.6));
    premium.price = Decimal::new(999, 2);
    premium.is_free = false;
    let engine = engine(vec![
        app(Platform::Android, "a", "Games", Some(3.2)),
        app(Platform::Android, "b", "Games", Some(3.4)),
        premium,
    ]);
    let outcome = engine.run("list-opportunities", &params()).unwrap();
    assert_eq!(outcome.opportunities.len(), 2);

    // Equal signal counts: the less crowded category first.
    let medical = &outcome.opportunities[0];
    assert_eq!(medical.category, "Medical");
    assert_eq!(
        medical.signals,
        vec![OpportunitySignal::LowCompetition, OpportunitySignal::Premium]
    );
    let games = &outcome.opportunities[1];
    assert_eq!(games.category, "Games");
    assert_eq!(
        games.signals,
        vec![OpportunitySignal::LowCompetition, OpportunitySignal::QualityGap]
    );
}

#[test]
fn quality_gap_threshold_follows_min_rating() {
    let engine = engine(vec![app(Platform::Android, "a", "Games", Some(4.2))]);
    let strict = QueryParams {
        min_rating: Some(4.5),
        ..params()
    };
    let outcome = engine.run("list-opportunities", &strict).unwrap();
    assert!(outcome.opportunities[0]
        .signals
        .contains(&OpportunitySignal::QualityGap));

    let outcome = engine.run("list-opportunities", &params()).unwrap();
    assert!(!outcome.opportunities[0]
        .signals
        .contains(&OpportunitySignal::QualityGap));
}

#[test]
fn pricing_breakdown_per_platform() {
    let mut paid = app(Platform::Ios, "p", "Tools", Some(4.0));
    paid.price = Decimal::new(199, 2);
    paid.is_free = false;
    let engine = engine(vec![paid, app(Platform::Android, "f", "Tools", None)]);

    let ios = QueryParams {
        platform: Some(Platform::Ios),
        ..params()
    };
    let pricing = engine.run("pricing", &ios).unwrap().pricing.unwrap();
    assert_eq!((pricing.free, pricing.paid), (0, 1));
    assert!((pricing.mean_paid_price.unwrap() - 1.99).abs() < 1e-9);

    let all = engine.run("pricing", &params()).unwrap();
    assert_eq!(all.pricing.unwrap().free, 1);
    assert!(all.summary.contains("mean paid price $1.99"));
}

#[test]
fn summary_describes_the_collection() {
    let outcome = mixed().run("summary", &params()).unwrap();
    assert_eq!(
        outcome.summary,
        "4 apps (3 android, 1 ios) across 2 categories; mean rating 4.17"
    );
}

#[test]
fn outcome_serializes_query_name() {
    let outcome = mixed().run("summary", &params()).unwrap();
    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(value["query"], "summary");
}

#[test]
fn compare_platforms_applies_platform_and_min_rating() {
    let ios_only = QueryParams {
        platform: Some(Platform::Ios),
        ..params()
    };
    let outcome = mixed().run("compare-platforms", &ios_only).unwrap();
    assert_eq!(outcome.stats.len(), 1);
    assert_eq!(outcome.summary, "ios 4.50 (1 apps)");

    let strong = QueryParams {
        min_rating: Some(4.0),
        ..params()
    };
    let outcome = mixed().run("compare-platforms", &strong).unwrap();
    assert_eq!(
        outcome.summary,
        "android 5.00 (1 apps) vs ios 4.50 (1 apps)"
    );
}

#[test]
fn opportunities_respect_platform_and_category() {
    let engine = engine(vec![
        app(Platform::Android, "a", "Games", Some(3.2)),
        app(Platform::Ios, "i", "Social", Some(3.1)),
    ]);
    let ios = QueryParams {
        platform: Some(Platform::Ios),
        ..params()
    };
    let outcome = engine.run("list-opportunities", &ios).unwrap();
    let categories: Vec<&str> = outcome
        .opportunities
        .iter()
        .map(|o| o.category.as_str())
        .collect();
    assert_eq!(categories, vec!["Social"]);

    let games = QueryParams {
        category: Some("games".to_string()),
        ..params()
    };
    let outcome = engine.run("list-opportunities", &games).unwrap();
    assert_eq!(outcome.opportunities.len(), 1);
    assert_eq!(outcome.opportunities[0].category, "Games");
}

#[test]
fn parameters_a_query_does_not_read_are_rejected() {
    let with_platform = QueryParams {
        platform: Some(Platform::Ios),
        ..params()
    };
    let err = mixed().run("summary", &with_platform).unwrap_err();
    assert_eq!(
        err,
        QueryError::UnsupportedParameter {
            query: QueryName::Summary,
            parameter: "platform",
        }
    );

    let with_limit = QueryParams {
        limit: Some(3),
        ..params()
    };
    assert!(matches!(
        mixed().run("compare-platforms", &with_limit),
        Err(QueryError::UnsupportedParameter { parameter: "limit", .. })
    ));
    assert!(matches!(
        mixed().run(
            "pricing",
            &QueryParams {
                category: Some("Games".to_string()),
                ..params()
            }
        ),
        Err(QueryError::UnsupportedParameter { parameter: "category", .. })
    ));
}

#[test]
fn insights_lists_market_findings() {
    let outcome = mixed()
        .with_completeness(0.5)
        .run("insights", &params())
        .unwrap();
    let topics: Vec<Topic> = outcome.findings.iter().map(|f| f.topic).collect();
    assert_eq!(topics, MARKET_TOPICS);
    assert!(outcome.findings.iter().all(|f| f.confidence_score == 88));
    assert_eq!(outcome.summary, "6 findings over 4 apps, confidence 88/100");

    let empty = engine(vec![]).run("insights", &params()).unwrap();
    assert!(empty.is_empty());
}
