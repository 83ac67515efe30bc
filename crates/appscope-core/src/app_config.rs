use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings for the App Store lookup client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupSettings {
    pub base_url: String,
    pub country: String,
    /// Maximum results requested per term.
    pub result_limit: u32,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Minimum pause between two consecutive lookup requests.
    pub inter_request_delay_ms: u64,
    pub max_retries: u32,
    /// Fixed pause before a retry.
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub log_level: String,
    pub apps_path: PathBuf,
    pub campaigns_path: PathBuf,
    pub terms_path: PathBuf,
    pub output_dir: PathBuf,
    pub lookup: LookupSettings,
}
