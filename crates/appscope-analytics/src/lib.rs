//! Aggregation, rule-driven narration and named queries over the unified
//! app collection, plus the campaign channel analysis.

pub mod aggregate;
pub mod campaign;
pub mod narrator;
pub mod query;

pub use aggregate::{group_by, top_n, AggregateStat, MarketAggregates, PricingStats, QualityStats};
pub use campaign::{
    analyze_campaigns, campaign_findings, CampaignAnalysis, CampaignEfficiency, Funnel, RoasTier,
    SegmentStats, TierDistribution, CAMPAIGN_TOPICS, TOP_CAMPAIGNS,
};
pub use narrator::{
    confidence_score, market_findings, render_report, Finding, Topic, MARKET_TOPICS,
};
pub use query::{
    Opportunity, OpportunitySignal, QueryEngine, QueryError, QueryName, QueryOutcome, QueryParams,
};
