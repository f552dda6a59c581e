// SPDX-License-Identifier: MIT OR Apache-2.0
//! History configuration.

use crate::history::MAX_HISTORY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings controlling how much history is kept and how batches coalesce
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of batches kept; the oldest are dropped beyond it
    pub max_depth: Option<usize>,
    /// Batches sharing a merge group only coalesce if the second one is
    /// committed within this many milliseconds of the first being touched
    pub merge_window_ms: Option<u64>,
}

impl HistoryConfig {
    /// Merge window as a duration
    pub fn merge_window(&self) -> Option<Duration> {
        self.merge_window_ms.map(Duration::from_millis)
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: Some(MAX_HISTORY),
            merge_window_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.max_depth, Some(MAX_HISTORY));
        assert_eq!(config.merge_window(), None);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let config: HistoryConfig = ron::from_str("(merge_window_ms: Some(250))").unwrap();
        assert_eq!(config.max_depth, Some(MAX_HISTORY));
        assert_eq!(config.merge_window(), Some(Duration::from_millis(250)));
    }
}
