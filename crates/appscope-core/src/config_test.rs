use std::collections::HashMap;
use std::env::VarError;
use std::path::Path;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "APPSCOPE_ENV"));
}

#[test]
fn empty_environment_yields_defaults() {
    let map: HashMap<&str, &str> = HashMap::new();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.apps_path, Path::new("./data/googleplaystore.csv"));
    assert_eq!(cfg.campaigns_path, Path::new("./data/d2c_campaigns.csv"));
    assert_eq!(cfg.terms_path, Path::new("./config/terms.yaml"));
    assert_eq!(cfg.output_dir, Path::new("./reports"));
    assert_eq!(cfg.lookup.base_url, "https://itunes.apple.com/");
    assert_eq!(cfg.lookup.country, "us");
    assert_eq!(cfg.lookup.result_limit, 20);
    assert_eq!(cfg.lookup.timeout_secs, 30);
    assert_eq!(cfg.lookup.user_agent, "appscope/0.1 (market-intelligence)");
    assert_eq!(cfg.lookup.inter_request_delay_ms, 500);
    assert_eq!(cfg.lookup.max_retries, 1);
    assert_eq!(cfg.lookup.retry_backoff_ms, 1000);
}

#[test]
fn overrides_are_applied() {
    let mut map = HashMap::new();
    map.insert("APPSCOPE_ENV", "test");
    map.insert("APPSCOPE_OUTPUT_DIR", "/tmp/out");
    map.insert("APPSCOPE_LOOKUP_COUNTRY", "gb");
    map.insert("APPSCOPE_LOOKUP_RESULT_LIMIT", "5");
    map.insert("APPSCOPE_LOOKUP_INTER_REQUEST_DELAY_MS", "0");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.env, Environment::Test);
    assert_eq!(cfg.output_dir, Path::new("/tmp/out"));
    assert_eq!(cfg.lookup.country, "gb");
    assert_eq!(cfg.lookup.result_limit, 5);
    assert_eq!(cfg.lookup.inter_request_delay_ms, 0);
}

#[test]
fn invalid_timeout_is_rejected() {
    let mut map = HashMap::new();
    map.insert("APPSCOPE_LOOKUP_TIMEOUT_SECS", "not-a-number");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "APPSCOPE_LOOKUP_TIMEOUT_SECS"),
        "expected InvalidEnvVar(APPSCOPE_LOOKUP_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn invalid_max_retries_is_rejected() {
    let mut map = HashMap::new();
    map.insert("APPSCOPE_LOOKUP_MAX_RETRIES", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "APPSCOPE_LOOKUP_MAX_RETRIES"),
        "expected InvalidEnvVar(APPSCOPE_LOOKUP_MAX_RETRIES), got: {result:?}"
    );
}

#[test]
fn zero_result_limit_is_rejected() {
    let mut map = HashMap::new();
    map.insert("APPSCOPE_LOOKUP_RESULT_LIMIT", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "APPSCOPE_LOOKUP_RESULT_LIMIT"),
        "expected InvalidEnvVar(APPSCOPE_LOOKUP_RESULT_LIMIT), got: {result:?}"
    );
}
