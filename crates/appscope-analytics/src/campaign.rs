//! Channel, funnel and per-campaign analysis of the marketing campaign export.
//!
//! Shares nothing with the app pipeline except the narrator's rule table.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use appscope_core::{CampaignRecord, Metric};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::narrator::{confidence_score, evaluate, Finding, Rendered, Rule, Topic};

/// ROAS above which a segment is high-performing.
pub const HIGH_ROAS: f64 = 3.0;
/// ROAS at or above which a segment is medium-performing.
pub const MEDIUM_ROAS: f64 = 1.5;
/// Click-through rate below which the top of the funnel counts as leaking.
const LOW_CTR: f64 = 0.01;
/// Length of each per-campaign ranking.
pub const TOP_CAMPAIGNS: usize = 5;

/// Topic order of the campaign report.
pub const CAMPAIGN_TOPICS: &[Topic] = &[
    Topic::ChannelPerformance,
    Topic::FunnelConversion,
    Topic::CampaignEfficiency,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoasTier {
    High,
    Medium,
    Low,
}

impl RoasTier {
    /// Tier of a defined ROAS; `None` when undefined.
    #[must_use]
    pub fn of(roas: Metric) -> Option<Self> {
        roas.value().map(|r| {
            if r > HIGH_ROAS {
                RoasTier::High
            } else if r >= MEDIUM_ROAS {
                RoasTier::Medium
            } else {
                RoasTier::Low
            }
        })
    }
}

/// Campaign totals for one channel, category or campaign id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentStats {
    pub segment: String,
    pub campaigns: u64,
    pub spend: Decimal,
    pub revenue: Decimal,
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    /// `revenue / spend`.
    pub roas: Metric,
    /// `clicks / impressions`.
    pub ctr: Metric,
    /// `conversions / clicks`.
    pub conversion_rate: Metric,
    /// `spend / conversions`.
    pub cpa: Metric,
    /// `spend / clicks`.
    pub cpc: Metric,
    pub tier: Option<RoasTier>,
}

#[derive(Default)]
struct Totals {
    campaigns: u64,
    spend: Decimal,
    revenue: Decimal,
    impressions: u64,
    clicks: u64,
    conversions: u64,
}

impl Totals {
    fn add(&mut self, record: &CampaignRecord) {
        self.campaigns += 1;
        self.spend += record.spend;
        self.revenue += record.revenue;
        self.impressions += record.impressions;
        self.clicks += record.clicks;
        self.conversions += record.conversions;
    }

    #[allow(clippy::cast_precision_loss)]
    fn finish(self, segment: String) -> SegmentStats {
        let spend = dec(self.spend);
        let roas = Metric::ratio(dec(self.revenue), spend);
        SegmentStats {
            segment,
            campaigns: self.campaigns,
            spend: self.spend,
            revenue: self.revenue,
            impressions: self.impressions,
            clicks: self.clicks,
            conversions: self.conversions,
            roas,
            ctr: Metric::ratio(self.clicks as f64, self.impressions as f64),
            conversion_rate: Metric::ratio(self.conversions as f64, self.clicks as f64),
            cpa: Metric::ratio(spend, self.conversions as f64),
            cpc: Metric::ratio(spend, self.clicks as f64),
            tier: RoasTier::of(roas),
        }
    }
}

fn dec(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Overall impression → click → conversion funnel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Funnel {
    pub impressions: u64,
    pub clicks: u64,
    pub conversions: u64,
    pub ctr: Metric,
    pub conversion_rate: Metric,
    /// `conversions / impressions`.
    pub end_to_end: Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignAnalysis {
    pub records: u64,
    pub total_spend: Decimal,
    pub total_revenue: Decimal,
    pub overall_roas: Metric,
    /// Ranked by ROAS descending; undefined ROAS last, then by name.
    pub channels: Vec<SegmentStats>,
    /// Channels that spent nothing and so have no ROAS.
    pub zero_spend_channels: Vec<String>,
    pub funnel: Funnel,
    /// Same ranking as `channels`; empty when no record carries a category.
    pub categories: Vec<SegmentStats>,
    pub efficiency: CampaignEfficiency,
}

/// How many campaigns fall in each ROAS tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierDistribution {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    /// Campaigns without spend.
    pub undefined: u64,
}

impl TierDistribution {
    fn of(stats: &[SegmentStats]) -> Self {
        let mut tiers = Self::default();
        for stat in stats {
            match stat.tier {
                Some(RoasTier::High) => tiers.high += 1,
                Some(RoasTier::Medium) => tiers.medium += 1,
                Some(RoasTier::Low) => tiers.low += 1,
                None => tiers.undefined += 1,
            }
        }
        tiers
    }

    /// Campaigns with a defined ROAS.
    #[must_use]
    pub fn tiered(&self) -> u64 {
        self.high + self.medium + self.low
    }
}

/// Per-campaign rollup keyed by `campaign_id`. Rows sharing an id are summed
/// first; rows without one are left out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignEfficiency {
    /// Distinct campaign ids.
    pub campaigns: u64,
    /// Means over the campaigns where the ratio is defined.
    pub mean_roas: Metric,
    pub mean_ctr: Metric,
    pub mean_cpc: Metric,
    /// Highest ROAS first, at most [`TOP_CAMPAIGNS`].
    pub top_by_roas: Vec<SegmentStats>,
    /// Highest click-through rate first, at most [`TOP_CAMPAIGNS`].
    pub top_by_ctr: Vec<SegmentStats>,
    pub tiers: TierDistribution,
}

#[allow(clippy::cast_precision_loss)]
fn mean_defined(stats: &[SegmentStats], metric: fn(&SegmentStats) -> Metric) -> Metric {
    let values: Vec<f64> = stats.iter().filter_map(|s| metric(s).value()).collect();
    Metric::ratio(values.iter().sum(), values.len() as f64)
}

fn campaign_efficiency(records: &[CampaignRecord]) -> CampaignEfficiency {
    let campaigns = segment(records, |r| {
        r.campaign_id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    });

    let top_by_roas: Vec<SegmentStats> = campaigns
        .iter()
        .filter(|c| !c.roas.is_undefined())
        .take(TOP_CAMPAIGNS)
        .cloned()
        .collect();
    let mut top_by_ctr: Vec<SegmentStats> = campaigns
        .iter()
        .filter(|c| !c.ctr.is_undefined())
        .cloned()
        .collect();
    top_by_ctr.sort_by(|a, b| metric_desc(a.ctr, b.ctr).then_with(|| a.segment.cmp(&b.segment)));
    top_by_ctr.truncate(TOP_CAMPAIGNS);

    CampaignEfficiency {
        campaigns: campaigns.len() as u64,
        mean_roas: mean_defined(&campaigns, |s| s.roas),
        mean_ctr: mean_defined(&campaigns, |s| s.ctr),
        mean_cpc: mean_defined(&campaigns, |s| s.cpc),
        top_by_roas,
        top_by_ctr,
        tiers: TierDistribution::of(&campaigns),
    }
}

impl CampaignAnalysis {
    /// Best-ranked channel with a defined ROAS.
    #[must_use]
    pub fn best_channel(&self) -> Option<&SegmentStats> {
        self.channels.first().filter(|c| !c.roas.is_undefined())
    }

    /// Worst-ranked channel with a defined ROAS.
    #[must_use]
    pub fn worst_channel(&self) -> Option<&SegmentStats> {
        self.channels.iter().rev().find(|c| !c.roas.is_undefined())
    }
}

fn segment<'a, F>(records: &'a [CampaignRecord], key_fn: F) -> Vec<SegmentStats>
where
    F: Fn(&'a CampaignRecord) -> Option<&'a str>,
{
    let mut groups: BTreeMap<&str, Totals> = BTreeMap::new();
    for record in records {
        if let Some(key) = key_fn(record) {
            groups.entry(key).or_default().add(record);
        }
    }
    let mut stats: Vec<SegmentStats> = groups
        .into_iter()
        .map(|(key, totals)| totals.finish(key.to_string()))
        .collect();
    stats.sort_by(roas_order);
    stats
}

fn roas_order(a: &SegmentStats, b: &SegmentStats) -> Ordering {
    metric_desc(a.roas, b.roas).then_with(|| a.segment.cmp(&b.segment))
}

/// Larger values first, undefined last.
fn metric_desc(a: Metric, b: Metric) -> Ordering {
    match (a.value(), b.value()) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Groups campaign rows by channel, by category and by campaign id when
/// present, and derives ROAS and funnel ratios.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn analyze_campaigns(records: &[CampaignRecord]) -> CampaignAnalysis {
    let channels = segment(records, |r| Some(r.channel.as_str()));
    let categories = segment(records, |r| {
        r.category.as_deref().map(str::trim).filter(|c| !c.is_empty())
    });

    let mut overall = Totals::default();
    for record in records {
        overall.add(record);
    }
    let zero_spend_channels = channels
        .iter()
        .filter(|c| c.spend.is_zero())
        .map(|c| c.segment.clone())
        .collect::<Vec<_>>();
    if !zero_spend_channels.is_empty() {
        tracing::warn!(
            channels = ?zero_spend_channels,
            "channels without spend have undefined roas"
        );
    }

    CampaignAnalysis {
        records: records.len() as u64,
        total_spend: overall.spend,
        total_revenue: overall.revenue,
        overall_roas: Metric::ratio(dec(overall.revenue), dec(overall.spend)),
        channels,
        zero_spend_channels,
        funnel: Funnel {
            impressions: overall.impressions,
            clicks: overall.clicks,
            conversions: overall.conversions,
            ctr: Metric::ratio(overall.clicks as f64, overall.impressions as f64),
            conversion_rate: Metric::ratio(overall.conversions as f64, overall.clicks as f64),
            end_to_end: Metric::ratio(overall.conversions as f64, overall.impressions as f64),
        },
        categories,
        efficiency: campaign_efficiency(records),
    }
}

fn pct_text(metric: Metric) -> String {
    metric
        .value()
        .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}%", v * 100.0))
}

#[allow(clippy::cast_precision_loss)]
fn num(n: u64) -> f64 {
    n as f64
}

/// Adds `(name, value)` only when the metric is defined.
fn push_metric(metrics: &mut Vec<(&'static str, f64)>, name: &'static str, metric: Metric) {
    if let Some(v) = metric.value() {
        metrics.push((name, v));
    }
}

const CAMPAIGN_RULES: &[Rule<CampaignAnalysis>] = &[
    Rule {
        topic: Topic::ChannelPerformance,
        id: "channel_high_roas_leader",
        applies: |a| a.best_channel().is_some_and(|c| c.tier == Some(RoasTier::High)),
        render: |a| render_channel_leader(a, true),
    },
    Rule {
        topic: Topic::ChannelPerformance,
        id: "channel_leader",
        applies: |a| a.best_channel().is_some(),
        render: |a| render_channel_leader(a, false),
    },
    Rule {
        topic: Topic::ChannelPerformance,
        id: "channel_no_spend",
        applies: |_| true,
        render: |a| Rendered {
            text: format!(
                "No channel recorded spend, so return on ad spend is undefined for all {} channels.",
                a.channels.len()
            ),
            metrics: vec![("channel_count", num(a.channels.len() as u64))],
        },
    },
    Rule {
        topic: Topic::FunnelConversion,
        id: "funnel_click_leak",
        applies: |a| a.funnel.ctr.value().is_some_and(|ctr| ctr < LOW_CTR),
        render: |a| {
            let f = &a.funnel;
            let mut metrics = vec![
                ("impressions", num(f.impressions)),
                ("clicks", num(f.clicks)),
            ];
            push_metric(&mut metrics, "ctr", f.ctr);
            push_metric(&mut metrics, "conversion_rate", f.conversion_rate);
            Rendered {
                text: format!(
                    "The funnel leaks at the top: only {} of {} impressions become clicks, and {} of clicks convert.",
                    pct_text(f.ctr),
                    f.impressions,
                    pct_text(f.conversion_rate)
                ),
                metrics,
            }
        },
    },
    Rule {
        topic: Topic::FunnelConversion,
        id: "funnel_overview",
        applies: |a| !a.funnel.ctr.is_undefined(),
        render: |a| {
            let f = &a.funnel;
            let mut metrics = vec![
                ("impressions", num(f.impressions)),
                ("clicks", num(f.clicks)),
                ("conversions", num(f.conversions)),
            ];
            push_metric(&mut metrics, "ctr", f.ctr);
            push_metric(&mut metrics, "conversion_rate", f.conversion_rate);
            push_metric(&mut metrics, "end_to_end", f.end_to_end);
            Rendered {
                text: format!(
                    "{} impressions became {} clicks ({} click-through) and {} conversions ({} of clicks, {} end to end).",
                    f.impressions,
                    f.clicks,
                    pct_text(f.ctr),
                    f.conversions,
                    pct_text(f.conversion_rate),
                    pct_text(f.end_to_end)
                ),
                metrics,
            }
        },
    },
    Rule {
        topic: Topic::FunnelConversion,
        id: "funnel_no_impressions",
        applies: |_| true,
        render: |a| Rendered {
            text: format!(
                "No impressions were recorded, so the funnel cannot be measured ({} conversions reported).",
                a.funnel.conversions
            ),
            metrics: vec![("conversions", num(a.funnel.conversions))],
        },
    },
    Rule {
        topic: Topic::CampaignEfficiency,
        id: "efficiency_high_tier_share",
        applies: |a| {
            let tiers = a.efficiency.tiers;
            tiers.tiered() > 0 && tiers.high * 2 >= tiers.tiered()
        },
        render: |a| {
            let e = &a.efficiency;
            let mut rendered = render_efficiency_leader(e);
            rendered.text = format!(
                "{} of {} campaigns return more than {HIGH_ROAS:.0}x their spend. {}",
                e.tiers.high,
                e.tiers.tiered(),
                rendered.text
            );
            rendered
        },
    },
    Rule {
        topic: Topic::CampaignEfficiency,
        id: "efficiency_leader",
        applies: |a| !a.efficiency.top_by_roas.is_empty(),
        render: |a| {
            let e = &a.efficiency;
            let mut rendered = render_efficiency_leader(e);
            rendered.text.push_str(&format!(
                " Tiers split {} high, {} medium and {} low.",
                e.tiers.high, e.tiers.medium, e.tiers.low
            ));
            rendered
        },
    },
    Rule {
        topic: Topic::CampaignEfficiency,
        id: "efficiency_untracked",
        applies: |_| true,
        render: |a| Rendered {
            text: if a.efficiency.campaigns == 0 {
                "No row carries a campaign id, so campaigns cannot be ranked individually."
                    .to_string()
            } else {
                format!(
                    "None of the {} identified campaigns recorded spend, so none can be ranked by ROAS.",
                    a.efficiency.campaigns
                )
            },
            metrics: vec![("campaign_count", num(a.efficiency.campaigns))],
        },
    },
];

fn render_efficiency_leader(efficiency: &CampaignEfficiency) -> Rendered {
    let best = efficiency.top_by_roas.first();
    let best_name = best.map_or("", |c| c.segment.as_str());
    let best_roas = best.and_then(|c| c.roas.value()).unwrap_or_default();
    let mut text = format!("{best_name} is the most efficient campaign at {best_roas:.2}x");
    if let Some(clicker) = efficiency.top_by_ctr.first() {
        text.push_str(&format!(
            " and {} has the best click-through at {}",
            clicker.segment,
            pct_text(clicker.ctr)
        ));
    }
    text.push('.');

    let mut metrics = vec![
        ("best_campaign_roas", best_roas),
        ("campaign_count", num(efficiency.campaigns)),
        ("high_tier_campaigns", num(efficiency.tiers.high)),
        ("medium_tier_campaigns", num(efficiency.tiers.medium)),
        ("low_tier_campaigns", num(efficiency.tiers.low)),
    ];
    push_metric(&mut metrics, "mean_campaign_roas", efficiency.mean_roas);
    push_metric(&mut metrics, "mean_campaign_ctr", efficiency.mean_ctr);
    push_metric(&mut metrics, "mean_campaign_cpc", efficiency.mean_cpc);
    Rendered { text, metrics }
}

fn render_channel_leader(analysis: &CampaignAnalysis, high: bool) -> Rendered {
    let best = analysis.best_channel();
    let worst = analysis.worst_channel();
    let best_roas = best.and_then(|c| c.roas.value()).unwrap_or_default();
    let worst_roas = worst.and_then(|c| c.roas.value()).unwrap_or_default();
    let best_name = best.map_or("", |c| c.segment.as_str());
    let worst_name = worst.map_or("", |c| c.segment.as_str());
    let high_count = analysis
        .channels
        .iter()
        .filter(|c| c.tier == Some(RoasTier::High))
        .count();

    let mut text = if high {
        format!(
            "{best_name} leads with a ROAS of {best_roas:.2}x; {high_count} of {} channels return more than {HIGH_ROAS:.0}x their spend.",
            analysis.channels.len()
        )
    } else {
        format!(
            "{best_name} returns the most revenue per dollar at {best_roas:.2}x, but no channel clears {HIGH_ROAS:.0}x."
        )
    };
    if worst_name != best_name {
        text.push_str(&format!(" {worst_name} trails at {worst_roas:.2}x."));
    }
    if !analysis.zero_spend_channels.is_empty() {
        text.push_str(&format!(
            " {} recorded no spend.",
            analysis.zero_spend_channels.join(", ")
        ));
    }

    let mut metrics = vec![
        ("best_roas", best_roas),
        ("worst_roas", worst_roas),
        ("high_roas_channels", num(high_count as u64)),
        ("channel_count", num(analysis.channels.len() as u64)),
    ];
    push_metric(&mut metrics, "overall_roas", analysis.overall_roas);
    Rendered { text, metrics }
}

/// One finding per campaign topic, in [`CAMPAIGN_TOPICS`] order.
#[must_use]
pub fn campaign_findings(analysis: &CampaignAnalysis, completeness: f64) -> Vec<Finding> {
    let confidence = confidence_score(completeness, analysis.records);
    evaluate(CAMPAIGN_RULES, CAMPAIGN_TOPICS, analysis, confidence)
}
