//! Rule-table narration.
//!
//! Each topic owns an ordered list of rules. For every topic, in the fixed
//! topic order, the first rule whose predicate holds renders the topic's
//! [`Finding`]. Every topic ends with an unconditional rule, so each topic
//! yields exactly one finding. Templates only interpolate numbers already
//! present in the facts they are given.

use std::collections::BTreeMap;

use appscope_core::Platform;
use serde::Serialize;

use crate::aggregate::{top_n, MarketAggregates};

/// Base of every confidence score.
pub const CONFIDENCE_BASE: u32 = 85;
/// Cap on each of the two confidence bonuses.
pub const MAX_BONUS: u32 = 5;

/// Categories with more apps than this count as crowded.
const CROWDED_CATEGORY_APPS: u64 = 100;
/// Reviews-per-app ratio between platforms that counts as an engagement gap.
const ENGAGEMENT_GAP_RATIO: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    PlatformComparison,
    CategoryLeadership,
    QualityBenchmark,
    Pricing,
    CompetitiveConcentration,
    ReviewEngagement,
    ChannelPerformance,
    FunnelConversion,
    CampaignEfficiency,
}

impl Topic {
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Topic::PlatformComparison => "Platform comparison",
            Topic::CategoryLeadership => "Category leadership",
            Topic::QualityBenchmark => "Quality benchmark",
            Topic::Pricing => "Pricing",
            Topic::CompetitiveConcentration => "Competitive concentration",
            Topic::ReviewEngagement => "Review engagement",
            Topic::ChannelPerformance => "Channel performance",
            Topic::FunnelConversion => "Funnel conversion",
            Topic::CampaignEfficiency => "Campaign efficiency",
        }
    }
}

/// Topic order of the market report.
pub const MARKET_TOPICS: &[Topic] = &[
    Topic::PlatformComparison,
    Topic::CategoryLeadership,
    Topic::QualityBenchmark,
    Topic::Pricing,
    Topic::CompetitiveConcentration,
    Topic::ReviewEngagement,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub topic: Topic,
    /// Id of the rule that produced this finding.
    pub rule: &'static str,
    pub narrative_text: String,
    pub confidence_score: u8,
    pub supporting_metrics: BTreeMap<String, f64>,
}

/// Rendered template output: text plus the numbers it quotes.
pub(crate) struct Rendered {
    pub(crate) text: String,
    pub(crate) metrics: Vec<(&'static str, f64)>,
}

pub(crate) struct Rule<C> {
    pub(crate) topic: Topic,
    pub(crate) id: &'static str,
    pub(crate) applies: fn(&C) -> bool,
    pub(crate) render: fn(&C) -> Rendered,
}

/// Evaluates `rules` topic by topic in `topics` order.
pub(crate) fn evaluate<C>(
    rules: &[Rule<C>],
    topics: &[Topic],
    facts: &C,
    confidence: u8,
) -> Vec<Finding> {
    topics
        .iter()
        .filter_map(|topic| {
            let rule = rules
                .iter()
                .find(|r| r.topic == *topic && (r.applies)(facts))?;
            let rendered = (rule.render)(facts);
            Some(Finding {
                topic: *topic,
                rule: rule.id,
                narrative_text: rendered.text,
                confidence_score: confidence,
                supporting_metrics: rendered
                    .metrics
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            })
        })
        .collect()
}

/// Heuristic confidence in `[0, 100]`: a base of 85 plus up to 5 points for
/// data completeness and up to 5 for sample size.
///
/// Not a calibrated probability.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn confidence_score(completeness: f64, sample_size: u64) -> u8 {
    let completeness = if completeness.is_finite() {
        completeness.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let completeness_bonus = (completeness * 5.0).floor() as u32;
    let sample_bonus = match sample_size {
        0 => 0,
        1..=99 => 1,
        100..=999 => 2,
        1_000..=4_999 => 3,
        5_000..=9_999 => 4,
        _ => 5,
    };
    let score = CONFIDENCE_BASE + completeness_bonus.min(MAX_BONUS) + sample_bonus.min(MAX_BONUS);
    score.min(100) as u8
}

/// The numbers the market rules read, extracted once from [`MarketAggregates`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MarketFacts {
    android_count: u64,
    ios_count: u64,
    android_rating: Option<f64>,
    ios_rating: Option<f64>,
    category_count: usize,
    leader: Option<(String, u64, f64)>,
    high_quality_share: Option<f64>,
    excellent_share: Option<f64>,
    mean_rating: Option<f64>,
    free_share: Option<f64>,
    paid_count: u64,
    mean_paid_price: Option<f64>,
    top3_share: f64,
    crowded_categories: usize,
    /// Mean reviews per app, `None` when the platform has no apps.
    android_reviews: Option<f64>,
    ios_reviews: Option<f64>,
}

impl MarketFacts {
    /// Mean reviews per app on both platforms, when both have reviews at all.
    fn review_pair(&self) -> Option<(f64, f64)> {
        match (self.android_reviews, self.ios_reviews) {
            (Some(a), Some(i)) if a > 0.0 && i > 0.0 => Some((a, i)),
            _ => None,
        }
    }
}

impl MarketFacts {
    pub(crate) fn from_aggregates(aggregates: &MarketAggregates) -> Self {
        let platform = |p: Platform| aggregates.platform(p);
        let ranked = top_n(&aggregates.by_category, aggregates.by_category.len());
        Self {
            android_count: platform(Platform::Android).map_or(0, |s| s.count),
            ios_count: platform(Platform::Ios).map_or(0, |s| s.count),
            android_rating: platform(Platform::Android).and_then(|s| s.mean_rating),
            ios_rating: platform(Platform::Ios).and_then(|s| s.mean_rating),
            category_count: ranked.len(),
            leader: ranked
                .first()
                .map(|s| (s.group_key.clone(), s.count, s.share_of_total)),
            high_quality_share: aggregates.quality.high_quality_share.value(),
            excellent_share: aggregates.quality.excellent_share.value(),
            mean_rating: aggregates.quality.mean_rating,
            free_share: aggregates.pricing.free_share.value(),
            paid_count: aggregates.pricing.paid,
            mean_paid_price: aggregates.pricing.mean_paid_price,
            top3_share: ranked.iter().take(3).map(|s| s.share_of_total).sum(),
            crowded_categories: ranked
                .iter()
                .filter(|s| s.count > CROWDED_CATEGORY_APPS)
                .count(),
            android_reviews: platform(Platform::Android).map(|s| s.mean_reviews),
            ios_reviews: platform(Platform::Ios).map(|s| s.mean_reviews),
        }
    }
}

fn pct(share: f64) -> f64 {
    share * 100.0
}

#[allow(clippy::cast_precision_loss)]
fn num(n: u64) -> f64 {
    n as f64
}

const MARKET_RULES: &[Rule<MarketFacts>] = &[
    // -- platform comparison ------------------------------------------------
    Rule {
        topic: Topic::PlatformComparison,
        id: "platform_rating_gap",
        applies: |f| match (f.android_rating, f.ios_rating) {
            (Some(a), Some(i)) => (a - i).abs() >= 0.1,
            _ => false,
        },
        render: |f| {
            let a = f.android_rating.unwrap_or_default();
            let i = f.ios_rating.unwrap_or_default();
            let (leader, trailer) = if i > a { ("iOS", "Android") } else { ("Android", "iOS") };
            Rendered {
                text: format!(
                    "{leader} apps rate higher than {trailer} apps on average (android {a:.2} across {} apps vs ios {i:.2} across {} apps).",
                    f.android_count, f.ios_count
                ),
                metrics: vec![
                    ("android_mean_rating", a),
                    ("ios_mean_rating", i),
                    ("android_count", num(f.android_count)),
                    ("ios_count", num(f.ios_count)),
                ],
            }
        },
    },
    Rule {
        topic: Topic::PlatformComparison,
        id: "platform_rating_parity",
        applies: |f| f.android_rating.is_some() && f.ios_rating.is_some(),
        render: |f| {
            let a = f.android_rating.unwrap_or_default();
            let i = f.ios_rating.unwrap_or_default();
            Rendered {
                text: format!(
                    "Average ratings are on par across platforms (android {a:.2} across {} apps, ios {i:.2} across {} apps).",
                    f.android_count, f.ios_count
                ),
                metrics: vec![
                    ("android_mean_rating", a),
                    ("ios_mean_rating", i),
                    ("android_count", num(f.android_count)),
                    ("ios_count", num(f.ios_count)),
                ],
            }
        },
    },
    Rule {
        topic: Topic::PlatformComparison,
        id: "platform_single_sided",
        applies: |_| true,
        render: |f| Rendered {
            text: format!(
                "A rating comparison needs rated apps on both platforms; this run has {} android and {} ios apps.",
                f.android_count, f.ios_count
            ),
            metrics: vec![
                ("android_count", num(f.android_count)),
                ("ios_count", num(f.ios_count)),
            ],
        },
    },
    // -- category leadership -----------------------------------------------
    Rule {
        topic: Topic::CategoryLeadership,
        id: "category_dominant",
        applies: |f| f.leader.as_ref().is_some_and(|(_, _, share)| *share >= 0.25),
        render: |f| {
            let (name, count, share) = f.leader.clone().unwrap_or_default();
            Rendered {
                text: format!(
                    "{name} dominates the market with {count} apps, {:.1}% of the collection.",
                    pct(share)
                ),
                metrics: vec![("leader_count", num(count)), ("leader_share", share)],
            }
        },
    },
    Rule {
        topic: Topic::CategoryLeadership,
        id: "category_leader",
        applies: |f| f.leader.is_some(),
        render: |f| {
            let (name, count, share) = f.leader.clone().unwrap_or_default();
            Rendered {
                text: format!(
                    "{name} is the largest of {} categories with {count} apps ({:.1}% share); no category holds a quarter of the market.",
                    f.category_count,
                    pct(share)
                ),
                metrics: vec![
                    ("leader_count", num(count)),
                    ("leader_share", share),
                    ("category_count", num(f.category_count as u64)),
                ],
            }
        },
    },
    Rule {
        topic: Topic::CategoryLeadership,
        id: "category_empty",
        applies: |_| true,
        render: |_| Rendered {
            text: "No categorized apps are available to rank.".to_string(),
            metrics: vec![],
        },
    },
    // -- quality benchmark -------------------------------------------------
    Rule {
        topic: Topic::QualityBenchmark,
        id: "quality_high_bar",
        applies: |f| f.high_quality_share.is_some_and(|s| s >= 0.5),
        render: |f| {
            let high = f.high_quality_share.unwrap_or_default();
            let excellent = f.excellent_share.unwrap_or_default();
            Rendered {
                text: format!(
                    "Most rated apps clear the 4.0 bar: {:.1}% rate 4.0 or higher and {:.1}% reach 4.5, so quality is table stakes.",
                    pct(high),
                    pct(excellent)
                ),
                metrics: vec![
                    ("high_quality_share", high),
                    ("excellent_share", excellent),
                ],
            }
        },
    },
    Rule {
        topic: Topic::QualityBenchmark,
        id: "quality_gap",
        applies: |f| f.high_quality_share.is_some(),
        render: |f| {
            let high = f.high_quality_share.unwrap_or_default();
            let mean = f.mean_rating.unwrap_or_default();
            Rendered {
                text: format!(
                    "Only {:.1}% of rated apps reach 4.0 and the average rating is {mean:.2}, leaving room for quality-led entrants.",
                    pct(high)
                ),
                metrics: vec![("high_quality_share", high), ("mean_rating", mean)],
            }
        },
    },
    Rule {
        topic: Topic::QualityBenchmark,
        id: "quality_unrated",
        applies: |_| true,
        render: |_| Rendered {
            text: "No app carries a rating, so quality cannot be benchmarked.".to_string(),
            metrics: vec![],
        },
    },
    // -- pricing -----------------------------------------------------------
    Rule {
        topic: Topic::Pricing,
        id: "pricing_free_dominant",
        applies: |f| f.free_share.is_some_and(|s| s >= 0.8),
        render: |f| {
            let free = f.free_share.unwrap_or_default();
            let mut metrics = vec![("free_share", free), ("paid_count", num(f.paid_count))];
            let paid_clause = match f.mean_paid_price {
                Some(price) => {
                    metrics.push(("mean_paid_price", price));
                    format!("the {} paid apps average ${price:.2}", f.paid_count)
                }
                None => "no app charges up front".to_string(),
            };
            Rendered {
                text: format!(
                    "Free distribution dominates: {:.1}% of apps are free and {paid_clause}. Monetization happens after install.",
                    pct(free)
                ),
                metrics,
            }
        },
    },
    Rule {
        topic: Topic::Pricing,
        id: "pricing_mixed",
        applies: |f| f.free_share.is_some(),
        render: |f| {
            let free = f.free_share.unwrap_or_default();
            let price = f.mean_paid_price.unwrap_or_default();
            Rendered {
                text: format!(
                    "Paid apps hold a real share: {:.1}% of apps are free while {} paid apps average ${price:.2}.",
                    pct(free),
                    f.paid_count
                ),
                metrics: vec![
                    ("free_share", free),
                    ("paid_count", num(f.paid_count)),
                    ("mean_paid_price", price),
                ],
            }
        },
    },
    Rule {
        topic: Topic::Pricing,
        id: "pricing_empty",
        applies: |_| true,
        render: |_| Rendered {
            text: "No apps are available to describe pricing.".to_string(),
            metrics: vec![],
        },
    },
    // -- competitive concentration -------------------------------------------
    Rule {
        topic: Topic::CompetitiveConcentration,
        id: "concentration_high",
        applies: |f| f.category_count > 3 && f.top3_share >= 0.5,
        render: |f| Rendered {
            text: format!(
                "The market is concentrated: the top three of {} categories hold {:.1}% of apps.",
                f.category_count,
                pct(f.top3_share)
            ),
            metrics: vec![
                ("top3_share", f.top3_share),
                ("category_count", num(f.category_count as u64)),
            ],
        },
    },
    Rule {
        topic: Topic::CompetitiveConcentration,
        id: "concentration_crowded",
        applies: |f| f.crowded_categories > 0,
        render: |f| Rendered {
            text: format!(
                "{} categories exceed {CROWDED_CATEGORY_APPS} apps each, signalling heavy competition, while the top three hold {:.1}% of apps.",
                f.crowded_categories,
                pct(f.top3_share)
            ),
            metrics: vec![
                ("crowded_categories", num(f.crowded_categories as u64)),
                ("top3_share", f.top3_share),
            ],
        },
    },
    Rule {
        topic: Topic::CompetitiveConcentration,
        id: "concentration_fragmented",
        applies: |_| true,
        render: |f| Rendered {
            text: format!(
                "The market is fragmented: the top three categories hold {:.1}% of apps across {} categories.",
                pct(f.top3_share),
                f.category_count
            ),
            metrics: vec![
                ("top3_share", f.top3_share),
                ("category_count", num(f.category_count as u64)),
            ],
        },
    },
    // -- review engagement -------------------------------------------------
    Rule {
        topic: Topic::ReviewEngagement,
        id: "engagement_ios_heavier",
        applies: |f| f.review_pair().is_some_and(|(a, i)| i / a >= ENGAGEMENT_GAP_RATIO),
        render: |f| {
            let (a, i) = f.review_pair().unwrap_or((1.0, 0.0));
            engagement_gap("iOS", "Android", i, a)
        },
    },
    Rule {
        topic: Topic::ReviewEngagement,
        id: "engagement_android_heavier",
        applies: |f| f.review_pair().is_some_and(|(a, i)| a / i >= ENGAGEMENT_GAP_RATIO),
        render: |f| {
            let (a, i) = f.review_pair().unwrap_or((0.0, 1.0));
            engagement_gap("Android", "iOS", a, i)
        },
    },
    Rule {
        topic: Topic::ReviewEngagement,
        id: "engagement_balanced",
        applies: |f| f.review_pair().is_some(),
        render: |f| {
            let (a, i) = f.review_pair().unwrap_or_default();
            Rendered {
                text: format!(
                    "Review engagement is comparable across platforms (android {a:.0} vs ios {i:.0} reviews per app)."
                ),
                metrics: vec![("android_mean_reviews", a), ("ios_mean_reviews", i)],
            }
        },
    },
    Rule {
        topic: Topic::ReviewEngagement,
        id: "engagement_unmeasured",
        applies: |_| true,
        render: |f| Rendered {
            text: format!(
                "Review engagement needs reviewed apps on both platforms; this run has {} android and {} ios apps.",
                f.android_count, f.ios_count
            ),
            metrics: vec![
                ("android_count", num(f.android_count)),
                ("ios_count", num(f.ios_count)),
            ],
        },
    },
];

fn engagement_gap(leader: &str, trailer: &str, lead: f64, trail: f64) -> Rendered {
    let ratio = lead / trail;
    Rendered {
        text: format!(
            "{leader} apps draw {ratio:.1}x the reviews per app of {trailer} apps ({lead:.0} vs {trail:.0}), pointing to a more active user base."
        ),
        metrics: vec![
            ("engagement_ratio", ratio),
            ("leader_mean_reviews", lead),
            ("trailer_mean_reviews", trail),
        ],
    }
}

/// One finding per market topic, in [`MARKET_TOPICS`] order.
#[must_use]
pub fn market_findings(aggregates: &MarketAggregates, completeness: f64) -> Vec<Finding> {
    let facts = MarketFacts::from_aggregates(aggregates);
    let confidence = confidence_score(completeness, aggregates.total);
    evaluate(MARKET_RULES, MARKET_TOPICS, &facts, confidence)
}

/// Concatenates finding texts, in the order given, into a markdown document.
#[must_use]
pub fn render_report(title: &str, findings: &[Finding]) -> String {
    let mut out = format!("# {title}\n");
    for finding in findings {
        out.push_str(&format!(
            "\n## {}\n\n{}\n\n_Confidence: {}/100_\n",
            finding.topic.title(),
            finding.narrative_text,
            finding.confidence_score
        ));
    }
    out
}

#[cfg(test)]
#[path = "narrator_test.rs"]
mod tests;
