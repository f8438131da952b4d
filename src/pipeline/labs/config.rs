use std::path::Path;

use serde::{Deserialize, Serialize};

use super::fallbacks::{default_known_fallbacks, KnownFallback};

/// Minimum flowed-text length (characters) before the text grammars are tried.
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 50;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read parser config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid parser config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A row-level artifact left by a vendor layout, e.g. a lab-site code
/// ("01") read as the result of an annotation row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactSkipRule {
    /// Exact (trimmed) result text the rule fires on.
    pub result_equals: String,
    /// Lower-cased keywords; any of them in the test name triggers the rule.
    pub name_keywords: Vec<String>,
}

impl ArtifactSkipRule {
    pub fn matches(&self, test_name: &str, result: &str) -> bool {
        if result.trim() != self.result_equals {
            return false;
        }
        let lower = test_name.to_lowercase();
        self.name_keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_lowercase()))
    }
}

pub fn default_artifact_skip_rules() -> Vec<ArtifactSkipRule> {
    vec![ArtifactSkipRule {
        result_equals: "01".into(),
        name_keywords: vec!["immature".into(), "nrbc".into(), "comment".into()],
    }]
}

/// Tunables of the lab report parser. Every field has a default, so a config
/// file only needs to name what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub min_text_length: usize,
    pub known_fallbacks: Vec<KnownFallback>,
    pub artifact_skip_rules: Vec<ArtifactSkipRule>,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            min_text_length: DEFAULT_MIN_TEXT_LENGTH,
            known_fallbacks: default_known_fallbacks(),
            artifact_skip_rules: default_artifact_skip_rules(),
        }
    }
}

impl ParserConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            fallbacks = config.known_fallbacks.len(),
            skip_rules = config.artifact_skip_rules.len(),
            "Loaded parser config"
        );
        Ok(config)
    }

    /// Whether a located row is a layout artifact rather than a test.
    pub fn is_artifact_row(&self, test_name: &str, result: &str) -> bool {
        self.artifact_skip_rules
            .iter()
            .any(|rule| rule.matches(test_name, result))
    }
}
