//! `query` command: one-shot and interactive lookups over `unified_apps.json`.

use std::io::{self, BufRead, Write};

use appscope_analytics::{QueryEngine, QueryName, QueryOutcome, QueryParams};
use appscope_core::{AppConfig, Platform};

use crate::output;

/// A parsed interactive input line.
#[derive(Debug, PartialEq)]
enum Input {
    Query { name: String, params: QueryParams },
    Help,
    Quit,
    Blank,
}

fn load_engine(config: &AppConfig) -> anyhow::Result<QueryEngine> {
    let collection = output::read_unified(&config.output_dir)?;
    let completeness = output::read_completeness(&config.output_dir).unwrap_or(1.0);
    tracing::debug!(records = collection.len(), completeness, "query engine loaded");
    Ok(QueryEngine::new(collection).with_completeness(completeness))
}

/// Runs one named query and prints the outcome.
///
/// # Errors
///
/// Returns an error if `unified_apps.json` cannot be loaded, or a
/// [`appscope_analytics::QueryError`] for an unknown name or a missing
/// parameter.
pub(crate) fn run_named(
    config: &AppConfig,
    name: &str,
    params: &QueryParams,
) -> anyhow::Result<()> {
    let query = name.parse::<QueryName>()?;
    let engine = load_engine(config)?;
    let outcome = engine.execute(query, params)?;
    let mut stdout = io::stdout().lock();
    print_outcome(&mut stdout, &outcome)?;
    Ok(())
}

/// Reads queries from stdin until `quit` or end of input. Bad input is
/// reported and the loop continues.
///
/// # Errors
///
/// Returns an error if `unified_apps.json` cannot be loaded or the terminal
/// cannot be read or written.
pub(crate) fn run_interactive(config: &AppConfig) -> anyhow::Result<()> {
    let engine = load_engine(config)?;
    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();
    interactive_loop(&engine, stdin, &mut stdout)
}

fn interactive_loop<R: BufRead, W: Write>(
    engine: &QueryEngine,
    input: R,
    out: &mut W,
) -> anyhow::Result<()> {
    writeln!(
        out,
        "{} apps loaded. Type `help` for the query list, `quit` to exit.",
        engine.collection().len()
    )?;
    write!(out, "> ")?;
    out.flush()?;

    for line in input.lines() {
        match parse_line(&line?) {
            Ok(Input::Quit) => return Ok(()),
            Ok(Input::Help) => print_help(out)?,
            Ok(Input::Blank) => {}
            Ok(Input::Query { name, params }) => match engine.run(&name, &params) {
                Ok(outcome) => print_outcome(out, &outcome)?,
                Err(e) => writeln!(out, "error: {e}")?,
            },
            Err(message) => writeln!(out, "error: {message}")?,
        }
        write!(out, "> ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}

/// Parses `name [key=value ...]`. Values containing spaces go in double
/// quotes: `category="Health & Fitness"`.
fn parse_line(line: &str) -> Result<Input, String> {
    let tokens = tokenize(line)?;
    let Some((name, args)) = tokens.split_first() else {
        return Ok(Input::Blank);
    };
    match name.to_ascii_lowercase().as_str() {
        "quit" | "exit" | "q" => return Ok(Input::Quit),
        "help" | "?" => return Ok(Input::Help),
        _ => {}
    }

    let mut params = QueryParams::default();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got `{arg}`"))?;
        match key.trim_start_matches("--").replace('_', "-").as_str() {
            "category" => params.category = Some(value.to_string()),
            "platform" => {
                params.platform = Some(
                    value
                        .parse::<Platform>()
                        .map_err(|e| e.to_string())?,
                );
            }
            "min-rating" => {
                params.min_rating = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("min-rating must be a number, got `{value}`"))?,
                );
            }
            "limit" => {
                params.limit = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("limit must be a whole number, got `{value}`"))?,
                );
            }
            other => return Err(format!("unknown parameter `{other}`")),
        }
    }
    Ok(Input::Query {
        name: name.clone(),
        params,
    })
}

fn tokenize(line: &str) -> Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    for c in line.trim().chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if in_quotes {
        return Err("unterminated quote".to_string());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn print_help<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{:<20}PARAMETERS", "QUERY")?;
    for query in QueryName::ALL {
        let accepts = query.accepts();
        let accepts = if accepts.is_empty() {
            "-".to_string()
        } else {
            accepts.join(" ")
        };
        writeln!(out, "{query:<20}{accepts}")?;
    }
    writeln!(out, "values: platform=<android|ios> min-rating=<n> limit=<n>")?;
    writeln!(out, "example: category category=Games platform=ios limit=5")
}

fn fmt_rating(rating: Option<f64>) -> String {
    rating.map_or_else(|| "n/a".to_string(), |r| format!("{r:.2}"))
}

fn print_outcome<W: Write>(out: &mut W, outcome: &QueryOutcome) -> io::Result<()> {
    writeln!(out, "{}: {}", outcome.query, outcome.summary)?;

    if !outcome.stats.is_empty() {
        writeln!(
            out,
            "{:<24}{:>8}{:>10}{:>12}{:>10}",
            "GROUP", "APPS", "RATING", "REVIEWS", "SHARE"
        )?;
        for stat in &outcome.stats {
            writeln!(
                out,
                "{:<24}{:>8}{:>10}{:>12.0}{:>9.1}%",
                stat.group_key,
                stat.count,
                fmt_rating(stat.mean_rating),
                stat.mean_reviews,
                stat.share_of_total * 100.0
            )?;
        }
    }

    if !outcome.apps.is_empty() {
        writeln!(
            out,
            "{:<40}{:<9}{:>8}{:>12}{:>9}",
            "APP", "PLATFORM", "RATING", "REVIEWS", "PRICE"
        )?;
        for app in &outcome.apps {
            let name = if app.name.chars().count() > 38 {
                format!("{}...", app.name.chars().take(35).collect::<String>())
            } else {
                app.name.clone()
            };
            writeln!(
                out,
                "{:<40}{:<9}{:>8}{:>12}{:>9}",
                name,
                app.platform,
                fmt_rating(app.rating),
                app.review_count,
                app.price.round_dp(2)
            )?;
        }
    }

    if !outcome.opportunities.is_empty() {
        writeln!(
            out,
            "{:<24}{:>8}{:>10}{:>10}  SIGNALS",
            "CATEGORY", "APPS", "RATING", "PRICE"
        )?;
        for opportunity in &outcome.opportunities {
            let signals = opportunity
                .signals
                .iter()
                .map(|s| format!("{s:?}"))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(
                out,
                "{:<24}{:>8}{:>10}{:>10.2}  {signals}",
                opportunity.category,
                opportunity.count,
                fmt_rating(opportunity.mean_rating),
                opportunity.mean_price
            )?;
        }
    }

    if let Some(pricing) = &outcome.pricing {
        writeln!(
            out,
            "free {}  paid {}  free share {:.3}  premium {}",
            pricing.free, pricing.paid, pricing.free_share, pricing.premium
        )?;
    }

    for finding in &outcome.findings {
        writeln!(
            out,
            "[{}] {} ({}/100)",
            finding.topic.title(),
            finding.narrative_text,
            finding.confidence_score
        )?;
    }
    Ok(())
}
