use crate::app_config::{AppConfig, Environment, LookupSettings};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Does not read `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Every variable has a default, so an empty environment yields a usable
/// development configuration.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("APPSCOPE_ENV", "development"))?;
    let log_level = or_default("APPSCOPE_LOG_LEVEL", "info");
    let apps_path = PathBuf::from(or_default(
        "APPSCOPE_APPS_PATH",
        "./data/googleplaystore.csv",
    ));
    let campaigns_path = PathBuf::from(or_default(
        "APPSCOPE_CAMPAIGNS_PATH",
        "./data/d2c_campaigns.csv",
    ));
    let terms_path = PathBuf::from(or_default("APPSCOPE_TERMS_PATH", "./config/terms.yaml"));
    let output_dir = PathBuf::from(or_default("APPSCOPE_OUTPUT_DIR", "./reports"));

    let result_limit = parse_u32("APPSCOPE_LOOKUP_RESULT_LIMIT", "20")?;
    if result_limit == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "APPSCOPE_LOOKUP_RESULT_LIMIT".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let lookup_settings = LookupSettings {
        base_url: or_default("APPSCOPE_LOOKUP_BASE_URL", "https://itunes.apple.com/"),
        country: or_default("APPSCOPE_LOOKUP_COUNTRY", "us"),
        result_limit,
        timeout_secs: parse_u64("APPSCOPE_LOOKUP_TIMEOUT_SECS", "30")?,
        user_agent: or_default(
            "APPSCOPE_LOOKUP_USER_AGENT",
            "appscope/0.1 (market-intelligence)",
        ),
        inter_request_delay_ms: parse_u64("APPSCOPE_LOOKUP_INTER_REQUEST_DELAY_MS", "500")?,
        max_retries: parse_u32("APPSCOPE_LOOKUP_MAX_RETRIES", "1")?,
        retry_backoff_ms: parse_u64("APPSCOPE_LOOKUP_RETRY_BACKOFF_MS", "1000")?,
    };

    Ok(AppConfig {
        env,
        log_level,
        apps_path,
        campaigns_path,
        terms_path,
        output_dir,
        lookup: lookup_settings,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "APPSCOPE_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
