use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Lookup terms resolved by the enricher, one request per term.
#[derive(Debug, Clone, Deserialize)]
pub struct TermsFile {
    pub terms: Vec<String>,
}

/// Load and validate the lookup terms from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_terms(path: &Path) -> Result<TermsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::TermsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_terms(&content)
}

fn parse_terms(content: &str) -> Result<TermsFile, ConfigError> {
    let mut terms_file: TermsFile =
        serde_yaml::from_str(content).map_err(ConfigError::TermsFileParse)?;

    for term in &mut terms_file.terms {
        *term = term.trim().to_string();
    }

    validate_terms(&terms_file)?;

    Ok(terms_file)
}

fn validate_terms(terms_file: &TermsFile) -> Result<(), ConfigError> {
    if terms_file.terms.is_empty() {
        return Err(ConfigError::Validation(
            "at least one term is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for term in &terms_file.terms {
        if term.is_empty() {
            return Err(ConfigError::Validation(
                "terms must be non-empty".to_string(),
            ));
        }
        if !seen.insert(term.to_lowercase()) {
            return Err(ConfigError::Validation(format!("duplicate term: '{term}'")));
        }
    }

    Ok(())
}
