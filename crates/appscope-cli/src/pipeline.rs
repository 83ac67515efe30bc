//! Stage orchestration for `run` and `stage`.
//!
//! Stages run strictly in sequence and hand immutable values forward:
//! normalize → enrich → unify → aggregate → narrate, with the campaign
//! analysis as an independent branch. A stage that needs an earlier stage's
//! output recomputes it in memory instead of reading artifacts back.

use std::path::PathBuf;

use anyhow::Context;
use appscope_analytics::{
    analyze_campaigns, campaign_findings, market_findings, render_report, CampaignAnalysis,
    Finding, MarketAggregates,
};
use appscope_core::{load_terms, AppConfig, Completeness, Platform, UnifiedCollection};
use appscope_ingest::{load_apps, load_campaigns, NormalizeReport};
use appscope_itunes::{enrich_terms, EnrichmentReport, LookupClient};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::Serialize;

use crate::output::{
    self, CAMPAIGN_FINDINGS_JSON, CAMPAIGN_REPORT_MD, FINDINGS_JSON, MARKET_AGGREGATES_JSON,
    MARKET_REPORT_MD, RUN_SUMMARY_JSON,
};

const MARKET_REPORT_TITLE: &str = "App market report";
const CAMPAIGN_REPORT_TITLE: &str = "Campaign performance report";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Stage {
    Normalize,
    Enrich,
    Aggregate,
    Narrate,
    Campaign,
}

/// The merged collection plus everything needed to score it.
struct Unified {
    collection: UnifiedCollection,
    normalize: NormalizeReport,
    enrichment: Option<EnrichmentReport>,
    cross_source_duplicates: usize,
}

impl Unified {
    fn completeness(&self) -> Completeness {
        let local = self.normalize.completeness();
        match &self.enrichment {
            Some(report) => local.merge(report.completeness()),
            None => local,
        }
    }
}

struct MarketOutput {
    aggregates: MarketAggregates,
    findings: Vec<Finding>,
    report: String,
}

struct CampaignOutput {
    rows_read: u64,
    rows_skipped: u64,
    field_errors: u64,
    analysis: CampaignAnalysis,
    findings: Vec<Finding>,
    report: String,
}

#[derive(Debug, Serialize)]
struct CampaignSummary {
    rows_read: u64,
    rows_skipped: u64,
    field_errors: u64,
    records: u64,
    channels: usize,
    zero_spend_channels: Vec<String>,
}

/// Contents of `run_summary.json`.
#[derive(Debug, Serialize)]
struct RunSummary {
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    skip_enrichment: bool,
    normalize: NormalizeReport,
    enrichment: Option<EnrichmentReport>,
    cross_source_duplicates: usize,
    unified_records: usize,
    android_records: usize,
    ios_records: usize,
    completeness: Completeness,
    completeness_ratio: f64,
    market_findings: usize,
    campaign: CampaignSummary,
    artifacts: Vec<String>,
}

fn normalize_stage(config: &AppConfig) -> anyhow::Result<appscope_ingest::NormalizedApps> {
    load_apps(&config.apps_path).with_context(|| {
        format!(
            "normalize stage failed for {}",
            config.apps_path.display()
        )
    })
}

async fn enrich_stage(config: &AppConfig) -> anyhow::Result<appscope_itunes::Enrichment> {
    let terms = load_terms(&config.terms_path).with_context(|| {
        format!(
            "enrich stage failed to load terms from {}",
            config.terms_path.display()
        )
    })?;
    let client =
        LookupClient::new(&config.lookup).context("enrich stage failed to build lookup client")?;
    tracing::info!(terms = terms.terms.len(), "enriching from lookup service");
    let enrichment = enrich_terms(&client, &terms.terms).await;
    if !enrichment.report.failures.is_empty() {
        tracing::warn!(
            failures = enrichment.report.failures.len(),
            "some terms were skipped after failed lookups"
        );
    }
    Ok(enrichment)
}

async fn unify(config: &AppConfig, skip_enrichment: bool) -> anyhow::Result<Unified> {
    let local = normalize_stage(config)?;
    let (remote, enrichment) = if skip_enrichment {
        tracing::info!("enrichment skipped");
        (Vec::new(), None)
    } else {
        let enrichment = enrich_stage(config).await?;
        (enrichment.records, Some(enrichment.report))
    };

    let (collection, cross_source_duplicates) =
        UnifiedCollection::from_sources(local.records, remote);
    tracing::info!(
        records = collection.len(),
        android = collection.count_platform(Platform::Android),
        ios = collection.count_platform(Platform::Ios),
        duplicates = cross_source_duplicates,
        "unified collection built"
    );
    Ok(Unified {
        collection,
        normalize: local.report,
        enrichment,
        cross_source_duplicates,
    })
}

fn market(unified: &Unified) -> MarketOutput {
    let aggregates = MarketAggregates::compute(&unified.collection);
    let findings = market_findings(&aggregates, unified.completeness().ratio());
    let report = render_report(MARKET_REPORT_TITLE, &findings);
    MarketOutput {
        aggregates,
        findings,
        report,
    }
}

fn campaign_stage(config: &AppConfig) -> anyhow::Result<CampaignOutput> {
    let load = load_campaigns(&config.campaigns_path).with_context(|| {
        format!(
            "campaign stage failed for {}",
            config.campaigns_path.display()
        )
    })?;
    let completeness = Completeness {
        rows_read: load.rows_read,
        rows_retained: load.records.len() as u64,
        field_errors: load.field_errors,
        ..Completeness::default()
    };
    let analysis = analyze_campaigns(&load.records);
    let findings = campaign_findings(&analysis, completeness.ratio());
    let report = render_report(CAMPAIGN_REPORT_TITLE, &findings);
    Ok(CampaignOutput {
        rows_read: load.rows_read,
        rows_skipped: load.rows_skipped,
        field_errors: load.field_errors,
        analysis,
        findings,
        report,
    })
}

fn write_market(config: &AppConfig, market: &MarketOutput) -> anyhow::Result<Vec<PathBuf>> {
    let dir = &config.output_dir;
    Ok(vec![
        output::write_json(dir, FINDINGS_JSON, &market.findings)?,
        output::write_text(dir, MARKET_REPORT_MD, &market.report)?,
    ])
}

fn write_campaign(config: &AppConfig, campaign: &CampaignOutput) -> anyhow::Result<Vec<PathBuf>> {
    let dir = &config.output_dir;
    Ok(vec![
        output::write_json(dir, CAMPAIGN_FINDINGS_JSON, &campaign.findings)?,
        output::write_text(dir, CAMPAIGN_REPORT_MD, &campaign.report)?,
    ])
}

/// Runs one stage and its in-memory prerequisites.
///
/// # Errors
///
/// Returns an error naming the stage when an input file is missing or
/// malformed, or when an artifact cannot be written.
pub(crate) async fn run_stage(
    config: &AppConfig,
    stage: Stage,
    skip_enrichment: bool,
) -> anyhow::Result<()> {
    let dir = &config.output_dir;
    let written = match stage {
        Stage::Normalize => {
            let local = normalize_stage(config)?;
            let (collection, _) = UnifiedCollection::from_records(local.records);
            print_normalize(&local.report);
            output::write_unified(dir, &collection)?
        }
        Stage::Enrich => {
            let unified = unify(config, skip_enrichment).await?;
            if let Some(report) = &unified.enrichment {
                print_enrichment(report);
            }
            output::write_unified(dir, &unified.collection)?
        }
        Stage::Aggregate => {
            let unified = unify(config, skip_enrichment).await?;
            let aggregates = MarketAggregates::compute(&unified.collection);
            print_platforms(&aggregates);
            vec![output::write_json(dir, MARKET_AGGREGATES_JSON, &aggregates)?]
        }
        Stage::Narrate => {
            let unified = unify(config, skip_enrichment).await?;
            let market = market(&unified);
            print_findings(&market.findings);
            write_market(config, &market)?
        }
        Stage::Campaign => {
            let campaign = campaign_stage(config)?;
            print_channels(&campaign.analysis);
            print_campaigns(&campaign.analysis);
            print_findings(&campaign.findings);
            write_campaign(config, &campaign)?
        }
    };
    print_written(&written);
    Ok(())
}

/// Runs every stage and writes all artifacts plus `run_summary.json`.
///
/// # Errors
///
/// Returns an error naming the failing stage. Per-term lookup failures and
/// recoverable row errors do not fail the run; they are counted in the
/// summary.
pub(crate) async fn run_all(config: &AppConfig, skip_enrichment: bool) -> anyhow::Result<()> {
    let started_at = Utc::now();
    let dir = &config.output_dir;

    let unified = unify(config, skip_enrichment).await?;
    let mut written = output::write_unified(dir, &unified.collection)?;

    let market = market(&unified);
    written.push(output::write_json(
        dir,
        MARKET_AGGREGATES_JSON,
        &market.aggregates,
    )?);
    written.extend(write_market(config, &market)?);

    let campaign = campaign_stage(config)?;
    written.extend(write_campaign(config, &campaign)?);

    let completeness = unified.completeness();
    let summary = RunSummary {
        started_at,
        finished_at: Utc::now(),
        skip_enrichment,
        normalize: unified.normalize.clone(),
        enrichment: unified.enrichment.clone(),
        cross_source_duplicates: unified.cross_source_duplicates,
        unified_records: unified.collection.len(),
        android_records: unified.collection.count_platform(Platform::Android),
        ios_records: unified.collection.count_platform(Platform::Ios),
        completeness,
        completeness_ratio: completeness.ratio(),
        market_findings: market.findings.len(),
        campaign: CampaignSummary {
            rows_read: campaign.rows_read,
            rows_skipped: campaign.rows_skipped,
            field_errors: campaign.field_errors,
            records: campaign.analysis.records,
            channels: campaign.analysis.channels.len(),
            zero_spend_channels: campaign.analysis.zero_spend_channels.clone(),
        },
        artifacts: written.iter().map(|p| p.display().to_string()).collect(),
    };
    written.push(output::write_json(dir, RUN_SUMMARY_JSON, &summary)?);

    print_normalize(&unified.normalize);
    if let Some(report) = &unified.enrichment {
        print_enrichment(report);
    }
    print_platforms(&market.aggregates);
    print_findings(&market.findings);
    print_channels(&campaign.analysis);
    print_campaigns(&campaign.analysis);
    print_findings(&campaign.findings);
    println!("completeness: {:.3}", summary.completeness_ratio);
    print_written(&written);
    Ok(())
}

fn print_normalize(report: &NormalizeReport) {
    println!(
        "normalize: {} rows read, {} retained, {} dropped, {} duplicates, {} field errors",
        report.rows_read,
        report.rows_retained,
        report.rows_dropped,
        report.duplicates_removed,
        report.field_error_total()
    );
}

fn print_enrichment(report: &EnrichmentReport) {
    println!(
        "enrich: {} terms, {} resolved, {} misses, {} failed, {} records",
        report.terms_total,
        report.resolved,
        report.misses.len(),
        report.failures.len(),
        report.records
    );
    for failure in &report.failures {
        println!("  skipped {:<20}{}", failure.term, failure.error);
    }
}

fn print_platforms(aggregates: &MarketAggregates) {
    println!("{:<10}{:>8}{:>10}{:>8}", "PLATFORM", "APPS", "RATING", "SHARE");
    for stat in aggregates.by_platform.values() {
        let rating = stat
            .mean_rating
            .map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}"));
        println!(
            "{:<10}{:>8}{:>10}{:>7.1}%",
            stat.group_key,
            stat.count,
            rating,
            stat.share_of_total * 100.0
        );
    }
}

fn print_channels(analysis: &CampaignAnalysis) {
    println!(
        "{:<16}{:>12}{:>12}{:>8}{:>8}{:>8}{:>10}",
        "CHANNEL", "SPEND", "REVENUE", "ROAS", "CTR", "CPC", "CPA"
    );
    for channel in &analysis.channels {
        println!(
            "{:<16}{:>12}{:>12}{:>8.2}{:>8.4}{:>8.2}{:>10.2}",
            channel.segment,
            channel.spend.round_dp(2),
            channel.revenue.round_dp(2),
            channel.roas,
            channel.ctr,
            channel.cpc,
            channel.cpa
        );
    }
}

fn print_campaigns(analysis: &CampaignAnalysis) {
    let efficiency = &analysis.efficiency;
    if efficiency.top_by_roas.is_empty() {
        return;
    }
    println!(
        "{:<16}{:<16}{:>8}{:>8}{:>8}",
        "CAMPAIGN", "TIER", "ROAS", "CTR", "CPC"
    );
    for campaign in &efficiency.top_by_roas {
        let tier = campaign
            .tier
            .map_or_else(|| "n/a".to_string(), |t| format!("{t:?}").to_lowercase());
        println!(
            "{:<16}{:<16}{:>8.2}{:>8.4}{:>8.2}",
            campaign.segment, tier, campaign.roas, campaign.ctr, campaign.cpc
        );
    }
    let tiers = efficiency.tiers;
    println!(
        "campaign tiers: {} high, {} medium, {} low, {} without spend",
        tiers.high, tiers.medium, tiers.low, tiers.undefined
    );
}

fn print_findings(findings: &[Finding]) {
    for finding in findings {
        println!(
            "[{:>3}] {}: {}",
            finding.confidence_score,
            finding.topic.title(),
            finding.narrative_text
        );
    }
}

fn print_written(paths: &[PathBuf]) {
    for path in paths {
        println!("wrote {}", path.display());
    }
}
