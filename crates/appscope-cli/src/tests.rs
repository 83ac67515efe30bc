use clap::Parser;

use super::*;

#[test]
fn parses_run_command() {
    let cli = Cli::try_parse_from(["appscope", "run"]).expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Commands::Run {
            skip_enrichment: false
        }
    ));
}

#[test]
fn parses_run_skip_enrichment() {
    let cli = Cli::try_parse_from(["appscope", "run", "--skip-enrichment"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Run {
            skip_enrichment: true
        }
    ));
}

#[test]
fn parses_each_stage() {
    for (arg, expected) in [
        ("normalize", Stage::Normalize),
        ("enrich", Stage::Enrich),
        ("aggregate", Stage::Aggregate),
        ("narrate", Stage::Narrate),
        ("campaign", Stage::Campaign),
    ] {
        let cli = Cli::try_parse_from(["appscope", "stage", arg]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Stage { stage, skip_enrichment: false } if stage == expected
        ));
    }
}

#[test]
fn rejects_unknown_stage() {
    assert!(Cli::try_parse_from(["appscope", "stage", "publish"]).is_err());
}

#[test]
fn parses_query_with_filters() {
    let cli = Cli::try_parse_from([
        "appscope",
        "query",
        "category",
        "--category",
        "Games",
        "--platform",
        "ios",
        "--min-rating",
        "4.2",
        "--limit",
        "5",
    ])
    .unwrap();
    assert!(matches!(
        cli.command,
        Commands::Query {
            name: Some(ref n),
            category: Some(ref c),
            platform: Some(Platform::Ios),
            min_rating: Some(r),
            limit: Some(5),
            interactive: false,
        } if n == "category" && c == "Games" && (r - 4.2).abs() < f64::EPSILON
    ));
}

#[test]
fn query_name_is_free_text_so_unknown_names_reach_the_engine() {
    let cli = Cli::try_parse_from(["appscope", "query", "best-apps"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Query { name: Some(ref n), .. } if n == "best-apps"
    ));
}

#[test]
fn query_requires_name_or_interactive() {
    assert!(Cli::try_parse_from(["appscope", "query"]).is_err());
    let cli = Cli::try_parse_from(["appscope", "query", "--interactive"]).unwrap();
    assert!(matches!(
        cli.command,
        Commands::Query {
            name: None,
            interactive: true,
            ..
        }
    ));
    assert!(Cli::try_parse_from(["appscope", "query", "summary", "--interactive"]).is_err());
}

#[test]
fn rejects_unknown_platform() {
    assert!(Cli::try_parse_from(["appscope", "query", "pricing", "--platform", "web"]).is_err());
}

#[test]
fn missing_command_is_an_error() {
    assert!(Cli::try_parse_from(["appscope"]).is_err());
}

#[test]
fn input_format_errors_exit_2() {
    let error = anyhow::Error::new(IngestError::MissingColumn {
        context: "apps.csv".to_string(),
        column: "category".to_string(),
    })
    .context("normalize stage failed for apps.csv");
    assert_eq!(exit_code(&error), 2);
}

#[test]
fn missing_input_file_exits_2() {
    let error = anyhow::Error::new(IngestError::FileNotFound {
        path: "apps.csv".to_string(),
    })
    .context("normalize stage failed for apps.csv");
    assert_eq!(exit_code(&error), 2);
}

#[test]
fn unreadable_input_file_exits_1() {
    let error = anyhow::Error::new(IngestError::FileRead {
        path: "apps.csv".to_string(),
        source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
    });
    assert_eq!(exit_code(&error), 1);
}

#[test]
fn unknown_query_exits_3() {
    let error = anyhow::Error::new(QueryError::UnknownQuery("best-apps".to_string()));
    assert_eq!(exit_code(&error), 3);
}

#[test]
fn config_errors_exit_4() {
    let error = anyhow::Error::new(ConfigError::InvalidEnvVar {
        var: "APPSCOPE_ENV".to_string(),
        reason: "unknown environment".to_string(),
    })
    .context("failed to load configuration");
    assert_eq!(exit_code(&error), 4);
}

#[test]
fn other_errors_exit_1() {
    assert_eq!(exit_code(&anyhow::anyhow!("disk full")), 1);
}
