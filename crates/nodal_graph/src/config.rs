// SPDX-License-Identifier: MIT OR Apache-2.0
//! Document configuration.

use nodal_history::HistoryConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default name of a document's root
pub const DEFAULT_DOCUMENT_NAME: &str = "document";

/// Errors reading or writing a configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The RON text could not be parsed
    #[error("Failed to parse document config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    /// The configuration could not be written
    #[error("Failed to serialize document config: {0}")]
    Serialize(#[from] ron::Error),
}

/// Settings for a new document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    /// Name of the document's root component
    pub name: String,
    /// Undo history settings
    pub history: HistoryConfig,
}

impl DocumentConfig {
    /// Parse a configuration from RON text.
    ///
    /// Missing fields take their defaults.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Write the configuration as pretty RON
    pub fn to_ron(&self) -> Result<String, ConfigError> {
        Ok(ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?)
    }
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_DOCUMENT_NAME.to_string(),
            history: HistoryConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ron() {
        let config = DocumentConfig::from_ron(
            "(name: \"comp\", history: (max_depth: Some(10), merge_window_ms: Some(500)))",
        )
        .unwrap();
        assert_eq!(config.name, "comp");
        assert_eq!(config.history.max_depth, Some(10));
        assert_eq!(config.history.merge_window_ms, Some(500));
    }

    #[test]
    fn test_missing_fields_default() {
        let config = DocumentConfig::from_ron("()").unwrap();
        assert_eq!(config, DocumentConfig::default());
    }

    #[test]
    fn test_to_ron_reads_back() {
        let config = DocumentConfig {
            name: "shot".to_string(),
            ..DocumentConfig::default()
        };
        let text = config.to_ron().unwrap();
        assert_eq!(DocumentConfig::from_ron(&text).unwrap(), config);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            DocumentConfig::from_ron("(name: 3)"),
            Err(ConfigError::Parse(_))
        ));
    }
}
