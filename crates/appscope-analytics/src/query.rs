//! Named queries over a materialized collection and its aggregates.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use appscope_core::{unify_category, AppRecord, Platform, UnifiedCollection};
use serde::Serialize;
use thiserror::Error;

use crate::aggregate::{group_by, top_n, AggregateStat, MarketAggregates, PricingStats};
use crate::narrator::{market_findings, Finding};

/// Result-list size when no limit is given.
pub const DEFAULT_LIMIT: usize = 10;
/// Categories with fewer apps than this have low competition.
pub const LOW_COMPETITION_APPS: u64 = 200;
/// Default mean rating below which a category shows a quality gap.
pub const QUALITY_GAP_RATING: f64 = 4.0;
/// Mean list price above which a category counts as premium.
pub const PREMIUM_MEAN_PRICE: f64 = 2.0;

const NO_MATCHES: &str = "no matches";

const CATEGORY: &str = "category";
const PLATFORM: &str = "platform";
const MIN_RATING: &str = "min-rating";
const LIMIT: &str = "limit";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown query `{}` (known queries: {})", .0, QueryName::vocabulary())]
    UnknownQuery(String),

    #[error("query `{query}` requires the `{parameter}` parameter")]
    MissingParameter {
        query: QueryName,
        parameter: &'static str,
    },

    #[error("query `{query}` does not take the `{parameter}` parameter")]
    UnsupportedParameter {
        query: QueryName,
        parameter: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryName {
    ComparePlatforms,
    TopCategories,
    Category,
    ListOpportunities,
    Pricing,
    Summary,
    Insights,
}

impl QueryName {
    pub const ALL: [QueryName; 7] = [
        QueryName::ComparePlatforms,
        QueryName::TopCategories,
        QueryName::Category,
        QueryName::ListOpportunities,
        QueryName::Pricing,
        QueryName::Summary,
        QueryName::Insights,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QueryName::ComparePlatforms => "compare-platforms",
            QueryName::TopCategories => "top-categories",
            QueryName::Category => "category",
            QueryName::ListOpportunities => "list-opportunities",
            QueryName::Pricing => "pricing",
            QueryName::Summary => "summary",
            QueryName::Insights => "insights",
        }
    }

    /// Parameters this query reads.
    #[must_use]
    pub fn accepts(self) -> &'static [&'static str] {
        match self {
            QueryName::ComparePlatforms => &[CATEGORY, PLATFORM, MIN_RATING],
            QueryName::TopCategories => &[PLATFORM, LIMIT],
            QueryName::Category | QueryName::ListOpportunities => {
                &[CATEGORY, PLATFORM, MIN_RATING, LIMIT]
            }
            QueryName::Pricing => &[PLATFORM],
            QueryName::Summary | QueryName::Insights => &[],
        }
    }

    /// Comma-separated list of every query name.
    #[must_use]
    pub fn vocabulary() -> String {
        Self::ALL.map(QueryName::as_str).join(", ")
    }
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for QueryName {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|q| q.as_str() == normalized)
            .ok_or_else(|| QueryError::UnknownQuery(s.trim().to_string()))
    }
}

impl Serialize for QueryName {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub category: Option<String>,
    pub platform: Option<Platform>,
    pub min_rating: Option<f64>,
    pub limit: Option<usize>,
}

impl QueryParams {
    fn limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT)
    }

    /// Names of the parameters that were set.
    fn given(&self) -> Vec<&'static str> {
        [
            (CATEGORY, self.category.is_some()),
            (PLATFORM, self.platform.is_some()),
            (MIN_RATING, self.min_rating.is_some()),
            (LIMIT, self.limit.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }

    /// The requested category mapped onto the unified labels.
    fn unified_category(&self) -> Option<String> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(unify_category)
    }

    fn admits(&self, record: &AppRecord) -> bool {
        self.platform.map_or(true, |p| record.platform == p)
            && self
                .min_rating
                .map_or(true, |min| record.rating.is_some_and(|r| r >= min))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunitySignal {
    LowCompetition,
    QualityGap,
    Premium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Opportunity {
    pub category: String,
    pub count: u64,
    pub mean_rating: Option<f64>,
    pub mean_price: f64,
    pub signals: Vec<OpportunitySignal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryOutcome {
    pub query: QueryName,
    /// One-line human summary; `"no matches"` for an empty result.
    pub summary: String,
    pub stats: Vec<AggregateStat>,
    pub apps: Vec<AppRecord>,
    pub opportunities: Vec<Opportunity>,
    pub pricing: Option<PricingStats>,
    pub findings: Vec<Finding>,
}

impl QueryOutcome {
    fn empty(query: QueryName) -> Self {
        Self {
            query,
            summary: NO_MATCHES.to_string(),
            stats: Vec::new(),
            apps: Vec::new(),
            opportunities: Vec::new(),
            pricing: None,
            findings: Vec::new(),
        }
    }

    fn with_summary(query: QueryName, summary: String) -> Self {
        Self {
            summary,
            ..Self::empty(query)
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
            && self.apps.is_empty()
            && self.opportunities.is_empty()
            && self.pricing.is_none()
            && self.findings.is_empty()
    }
}

/// Answers named queries against one loaded collection.
///
/// Aggregates are computed once at construction; queries only read them or
/// scan a filtered subset of the records.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    collection: UnifiedCollection,
    aggregates: MarketAggregates,
    /// Completeness ratio the `insights` findings are scored with.
    completeness: f64,
}

impl QueryEngine {
    #[must_use]
    pub fn new(collection: UnifiedCollection) -> Self {
        let aggregates = MarketAggregates::compute(&collection);
        Self {
            collection,
            aggregates,
            completeness: 1.0,
        }
    }

    /// Scores `insights` findings with the completeness of the run that
    /// produced the collection.
    #[must_use]
    pub fn with_completeness(mut self, completeness: f64) -> Self {
        self.completeness = completeness;
        self
    }

    #[must_use]
    pub fn collection(&self) -> &UnifiedCollection {
        &self.collection
    }

    #[must_use]
    pub fn aggregates(&self) -> &MarketAggregates {
        &self.aggregates
    }

    /// Resolves `name` and runs it.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnknownQuery`] for a name outside the vocabulary,
    /// and the errors of [`QueryEngine::execute`].
    pub fn run(&self, name: &str, params: &QueryParams) -> Result<QueryOutcome, QueryError> {
        let query = name.parse::<QueryName>()?;
        self.execute(query, params)
    }

    /// Runs an already-resolved query.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::MissingParameter`] when a required parameter is
    /// absent and [`QueryError::UnsupportedParameter`] when one the query does
    /// not read is set.
    pub fn execute(
        &self,
        query: QueryName,
        params: &QueryParams,
    ) -> Result<QueryOutcome, QueryError> {
        if let Some(parameter) = params
            .given()
            .into_iter()
            .find(|p| !query.accepts().contains(p))
        {
            return Err(QueryError::UnsupportedParameter { query, parameter });
        }
        let outcome = match query {
            QueryName::ComparePlatforms => self.compare_platforms(params),
            QueryName::TopCategories => self.top_categories(params),
            QueryName::Category => self.category(params)?,
            QueryName::ListOpportunities => self.list_opportunities(params),
            QueryName::Pricing => self.pricing(params),
            QueryName::Summary => self.summary(),
            QueryName::Insights => self.insights(),
        };
        tracing::debug!(query = %query, empty = outcome.is_empty(), "query answered");
        Ok(outcome)
    }

    fn compare_platforms(&self, params: &QueryParams) -> QueryOutcome {
        let query = QueryName::ComparePlatforms;
        let stats: Vec<AggregateStat> = if params.given().is_empty() {
            self.aggregates.by_platform.values().cloned().collect()
        } else {
            let category = params.unified_category();
            group_by(
                self.collection
                    .iter()
                    .filter(|r| {
                        category
                            .as_ref()
                            .map_or(true, |c| r.category.eq_ignore_ascii_case(c))
                    })
                    .filter(|r| params.admits(r)),
                |r| r.platform.to_string(),
            )
            .into_values()
            .collect()
        };
        if stats.is_empty() {
            return QueryOutcome::empty(query);
        }
        let summary = stats
            .iter()
            .map(|s| format!("{} {} ({} apps)", s.group_key, fmt_rating(s.mean_rating), s.count))
            .collect::<Vec<_>>()
            .join(" vs ");
        QueryOutcome {
            stats,
            ..QueryOutcome::with_summary(query, summary)
        }
    }

    fn top_categories(&self, params: &QueryParams) -> QueryOutcome {
        let query = QueryName::TopCategories;
        let Some(categories) = self.aggregates.categories(params.platform) else {
            return QueryOutcome::empty(query);
        };
        let stats = top_n(categories, params.limit());
        let Some(leader) = stats.first() else {
            return QueryOutcome::empty(query);
        };
        let summary = format!(
            "top {} of {} categories; {} leads with {} apps",
            stats.len(),
            categories.len(),
            leader.group_key,
            leader.count
        );
        QueryOutcome {
            stats,
            ..QueryOutcome::with_summary(query, summary)
        }
    }

    fn category(&self, params: &QueryParams) -> Result<QueryOutcome, QueryError> {
        let query = QueryName::Category;
        let wanted = params
            .unified_category()
            .ok_or(QueryError::MissingParameter {
                query,
                parameter: CATEGORY,
            })?;

        let stat = self
            .aggregates
            .categories(params.platform)
            .and_then(|categories| {
                categories
                    .values()
                    .find(|s| s.group_key.eq_ignore_ascii_case(&wanted))
            });
        let Some(stat) = stat else {
            return Ok(QueryOutcome::empty(query));
        };

        let mut apps: Vec<AppRecord> = self
            .collection
            .iter()
            .filter(|r| r.category.eq_ignore_ascii_case(&wanted))
            .filter(|r| params.admits(r))
            .cloned()
            .collect();
        apps.sort_by(app_order);
        apps.truncate(params.limit());

        let summary = format!(
            "{}: {} apps, mean rating {}, {:.1}% of the market; showing {} apps",
            stat.group_key,
            stat.count,
            fmt_rating(stat.mean_rating),
            stat.share_of_total * 100.0,
            apps.len()
        );
        Ok(QueryOutcome {
            stats: vec![stat.clone()],
            apps,
            ..QueryOutcome::with_summary(query, summary)
        })
    }

    fn list_opportunities(&self, params: &QueryParams) -> QueryOutcome {
        let query = QueryName::ListOpportunities;
        let gap_rating = params.min_rating.unwrap_or(QUALITY_GAP_RATING);
        let Some(categories) = self.aggregates.categories(params.platform) else {
            return QueryOutcome::empty(query);
        };
        let wanted = params.unified_category();
        let mut opportunities: Vec<Opportunity> = categories
            .values()
            .filter(|stat| {
                wanted
                    .as_ref()
                    .map_or(true, |c| stat.group_key.eq_ignore_ascii_case(c))
            })
            .filter_map(|stat| {
                let mut signals = Vec::new();
                if stat.count < LOW_COMPETITION_APPS {
                    signals.push(OpportunitySignal::LowCompetition);
                }
                if stat.mean_rating.is_some_and(|r| r < gap_rating) {
                    signals.push(OpportunitySignal::QualityGap);
                }
                if stat.mean_price > PREMIUM_MEAN_PRICE {
                    signals.push(OpportunitySignal::Premium);
                }
                (!signals.is_empty()).then(|| Opportunity {
                    category: stat.group_key.clone(),
                    count: stat.count,
                    mean_rating: stat.mean_rating,
                    mean_price: stat.mean_price,
                    signals,
                })
            })
            .collect();
        // More signals first, then the least crowded.
        opportunities.sort_by(|a, b| {
            b.signals
                .len()
                .cmp(&a.signals.len())
                .then(a.count.cmp(&b.count))
                .then_with(|| a.category.cmp(&b.category))
        });
        opportunities.truncate(params.limit());

        if opportunities.is_empty() {
            return QueryOutcome::empty(query);
        }
        let summary = format!(
            "{} categories show an opportunity signal (quality gap below {gap_rating:.1})",
            opportunities.len()
        );
        QueryOutcome {
            opportunities,
            ..QueryOutcome::with_summary(query, summary)
        }
    }

    fn pricing(&self, params: &QueryParams) -> QueryOutcome {
        let query = QueryName::Pricing;
        let pricing = match params.platform {
            Some(p) => self.aggregates.pricing_by_platform.get(&p),
            None => Some(&self.aggregates.pricing),
        };
        let Some(pricing) = pricing.filter(|p| p.free + p.paid > 0) else {
            return QueryOutcome::empty(query);
        };
        let paid_price = pricing
            .mean_paid_price
            .map_or_else(|| "n/a".to_string(), |p| format!("${p:.2}"));
        let summary = format!(
            "{} free, {} paid (free share {:.3}), mean paid price {paid_price}, {} premium",
            pricing.free, pricing.paid, pricing.free_share, pricing.premium
        );
        QueryOutcome {
            pricing: Some(pricing.clone()),
            ..QueryOutcome::with_summary(query, summary)
        }
    }

    fn summary(&self) -> QueryOutcome {
        let query = QueryName::Summary;
        if self.collection.is_empty() {
            return QueryOutcome::empty(query);
        }
        let summary = format!(
            "{} apps ({} android, {} ios) across {} categories; mean rating {}",
            self.aggregates.total,
            self.collection.count_platform(Platform::Android),
            self.collection.count_platform(Platform::Ios),
            self.aggregates.by_category.len(),
            fmt_rating(self.aggregates.quality.mean_rating)
        );
        QueryOutcome {
            stats: self.aggregates.by_platform.values().cloned().collect(),
            pricing: Some(self.aggregates.pricing.clone()),
            ..QueryOutcome::with_summary(query, summary)
        }
    }

    fn insights(&self) -> QueryOutcome {
        let query = QueryName::Insights;
        if self.collection.is_empty() {
            return QueryOutcome::empty(query);
        }
        let findings = market_findings(&self.aggregates, self.completeness);
        let confidence = findings.first().map_or(0, |f| f.confidence_score);
        let summary = format!(
            "{} findings over {} apps, confidence {confidence}/100",
            findings.len(),
            self.aggregates.total
        );
        QueryOutcome {
            findings,
            ..QueryOutcome::with_summary(query, summary)
        }
    }
}

fn fmt_rating(rating: Option<f64>) -> String {
    rating.map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}"))
}

/// Highest rated first (unrated last), then most reviewed, then name.
fn app_order(a: &AppRecord, b: &AppRecord) -> Ordering {
    let by_rating = match (a.rating, b.rating) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_rating
        .then(b.review_count.cmp(&a.review_count))
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
