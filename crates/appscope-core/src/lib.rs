//! Shared domain types and configuration for the appscope pipeline.

pub mod app_config;
pub mod categories;
mod config;
pub mod metric;
pub mod records;
pub mod terms;

use thiserror::Error;

pub use app_config::{AppConfig, Environment, LookupSettings};
pub use categories::unify_category;
pub use config::{load_app_config, load_app_config_from_env};
pub use metric::Metric;
pub use records::{
    AppRecord, CampaignRecord, Completeness, Platform, RecordSource, UnifiedCollection,
};
pub use terms::{load_terms, TermsFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read terms file {path}: {source}")]
    TermsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse terms file: {0}")]
    TermsFileParse(#[source] serde_yaml::Error),

    #[error("terms validation failed: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid platform: {0}")]
    InvalidPlatform(String),
}
