//! Grouped statistics over the unified collection.
//!
//! Everything here is a pure function of its input records; the input is
//! never mutated and identical input order always yields identical output.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use appscope_core::{AppRecord, Metric, Platform, UnifiedCollection};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

/// Rating at or above which an app counts as high quality.
pub const HIGH_RATING: f64 = 4.0;
/// Rating at or above which an app counts as excellent.
pub const EXCELLENT_RATING: f64 = 4.5;
/// Review count at or above which an app counts as popular.
pub const POPULAR_REVIEWS: u64 = 10_000;
/// List price above which a paid app counts as premium.
pub const PREMIUM_PRICE: Decimal = Decimal::TEN;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStat {
    pub group_key: String,
    pub count: u64,
    /// Records in the group with a present rating.
    pub rated_count: u64,
    /// Mean over present ratings only; `None` when no record is rated.
    pub mean_rating: Option<f64>,
    pub mean_reviews: f64,
    pub mean_price: f64,
    pub free_count: u64,
    /// `count / total` across everything that was grouped.
    pub share_of_total: f64,
}

#[derive(Default)]
struct Accumulator {
    count: u64,
    rated_count: u64,
    rating_sum: f64,
    review_sum: u128,
    price_sum: Decimal,
    free_count: u64,
}

impl Accumulator {
    fn add(&mut self, record: &AppRecord) {
        self.count += 1;
        if let Some(rating) = record.rating {
            self.rated_count += 1;
            self.rating_sum += rating;
        }
        self.review_sum += u128::from(record.review_count);
        self.price_sum += record.price;
        if record.is_free {
            self.free_count += 1;
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self, group_key: String, total: u64) -> AggregateStat {
        let count = self.count as f64;
        AggregateStat {
            group_key,
            count: self.count,
            rated_count: self.rated_count,
            mean_rating: (self.rated_count > 0).then(|| self.rating_sum / self.rated_count as f64),
            mean_reviews: self.review_sum as f64 / count,
            mean_price: self.price_sum.to_f64().unwrap_or(0.0) / count,
            free_count: self.free_count,
            share_of_total: self.count as f64 / total as f64,
        }
    }
}

/// Groups `records` by `key_fn` and computes one [`AggregateStat`] per key.
///
/// Groups are only created for keys that occur, so every stat has
/// `count >= 1` and the shares of all groups sum to 1.
pub fn group_by<'a, I, F>(records: I, key_fn: F) -> BTreeMap<String, AggregateStat>
where
    I: IntoIterator<Item = &'a AppRecord>,
    F: Fn(&AppRecord) -> String,
{
    let mut groups: BTreeMap<String, Accumulator> = BTreeMap::new();
    let mut total = 0u64;
    for record in records {
        total += 1;
        groups.entry(key_fn(record)).or_default().add(record);
    }
    groups
        .into_iter()
        .map(|(key, acc)| {
            let stat = acc.finish(key.clone(), total);
            (key, stat)
        })
        .collect()
}

/// Orders stats by count descending, then mean rating descending (unrated
/// last), then key ascending, and keeps the first `n`.
#[must_use]
pub fn top_n(stats: &BTreeMap<String, AggregateStat>, n: usize) -> Vec<AggregateStat> {
    let mut ranked: Vec<AggregateStat> = stats.values().cloned().collect();
    ranked.sort_by(rank_order);
    ranked.truncate(n);
    ranked
}

fn rank_order(a: &AggregateStat, b: &AggregateStat) -> Ordering {
    b.count
        .cmp(&a.count)
        .then_with(|| compare_rating_desc(a.mean_rating, b.mean_rating))
        .then_with(|| a.group_key.cmp(&b.group_key))
}

fn compare_rating_desc(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Bucket label for a rating.
#[must_use]
pub fn rating_bucket(rating: Option<f64>) -> &'static str {
    match rating {
        None => "unrated",
        Some(r) if r >= EXCELLENT_RATING => "4.5+",
        Some(r) if r >= HIGH_RATING => "4.0-4.5",
        Some(r) if r >= 3.0 => "3.0-4.0",
        Some(_) => "<3.0",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityStats {
    pub rated: u64,
    pub high_rated: u64,
    pub excellent: u64,
    pub popular: u64,
    /// `high_rated / rated`.
    pub high_quality_share: Metric,
    /// `excellent / rated`.
    pub excellent_share: Metric,
    pub mean_rating: Option<f64>,
}

impl QualityStats {
    #[allow(clippy::cast_precision_loss)]
    fn compute(collection: &UnifiedCollection) -> Self {
        let ratings: Vec<f64> = collection.iter().filter_map(|r| r.rating).collect();
        let rated = ratings.len() as u64;
        let high_rated = ratings.iter().filter(|r| **r >= HIGH_RATING).count() as u64;
        let excellent = ratings.iter().filter(|r| **r >= EXCELLENT_RATING).count() as u64;
        let popular = collection
            .iter()
            .filter(|r| r.review_count >= POPULAR_REVIEWS)
            .count() as u64;
        Self {
            rated,
            high_rated,
            excellent,
            popular,
            high_quality_share: Metric::ratio(high_rated as f64, rated as f64),
            excellent_share: Metric::ratio(excellent as f64, rated as f64),
            mean_rating: (rated > 0).then(|| ratings.iter().sum::<f64>() / rated as f64),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricingStats {
    pub free: u64,
    pub paid: u64,
    /// `free / (free + paid)`.
    pub free_share: Metric,
    /// Mean list price of paid apps; `None` when there are none.
    pub mean_paid_price: Option<f64>,
    /// Paid apps priced above [`PREMIUM_PRICE`].
    pub premium: u64,
}

impl PricingStats {
    #[allow(clippy::cast_precision_loss)]
    fn compute<'a>(records: impl IntoIterator<Item = &'a AppRecord>) -> Self {
        let mut free = 0u64;
        let mut paid = 0u64;
        let mut premium = 0u64;
        let mut paid_sum = Decimal::ZERO;
        for record in records {
            if record.is_free {
                free += 1;
            } else {
                paid += 1;
                paid_sum += record.price;
                if record.price > PREMIUM_PRICE {
                    premium += 1;
                }
            }
        }
        Self {
            free,
            paid,
            free_share: Metric::ratio(free as f64, (free + paid) as f64),
            mean_paid_price: (paid > 0).then(|| paid_sum.to_f64().unwrap_or(0.0) / paid as f64),
            premium,
        }
    }
}

/// Every aggregate the narrator and query interface read, materialized once
/// per load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketAggregates {
    pub total: u64,
    pub by_platform: BTreeMap<String, AggregateStat>,
    pub by_category: BTreeMap<String, AggregateStat>,
    pub by_rating_bucket: BTreeMap<String, AggregateStat>,
    pub by_platform_category: BTreeMap<Platform, BTreeMap<String, AggregateStat>>,
    pub quality: QualityStats,
    pub pricing: PricingStats,
    pub pricing_by_platform: BTreeMap<Platform, PricingStats>,
}

impl MarketAggregates {
    #[must_use]
    pub fn compute(collection: &UnifiedCollection) -> Self {
        let mut by_platform_category = BTreeMap::new();
        let mut pricing_by_platform = BTreeMap::new();
        for platform in [Platform::Android, Platform::Ios] {
            if on_platform(collection, platform).next().is_none() {
                continue;
            }
            by_platform_category.insert(
                platform,
                group_by(on_platform(collection, platform), |r| r.category.clone()),
            );
            pricing_by_platform.insert(
                platform,
                PricingStats::compute(on_platform(collection, platform)),
            );
        }

        Self {
            total: collection.len() as u64,
            by_platform: group_by(collection, |r| r.platform.to_string()),
            by_category: group_by(collection, |r| r.category.clone()),
            by_rating_bucket: group_by(collection, |r| rating_bucket(r.rating).to_string()),
            by_platform_category,
            quality: QualityStats::compute(collection),
            pricing: PricingStats::compute(collection),
            pricing_by_platform,
        }
    }

    /// Stats for `platform`, if any record carries it.
    #[must_use]
    pub fn platform(&self, platform: Platform) -> Option<&AggregateStat> {
        self.by_platform.get(&platform.to_string())
    }

    /// Category stats, restricted to one platform when given.
    #[must_use]
    pub fn categories(&self, platform: Option<Platform>) -> Option<&BTreeMap<String, AggregateStat>> {
        match platform {
            Some(p) => self.by_platform_category.get(&p),
            None => Some(&self.by_category),
        }
    }
}

fn on_platform(
    collection: &UnifiedCollection,
    platform: Platform,
) -> impl Iterator<Item = &AppRecord> {
    collection.iter().filter(move |r| r.platform == platform)
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
