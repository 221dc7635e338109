//! Configuration for the editing engine.
//!
//! The engine never reads files or environment variables; callers build an
//! [`EditorConfig`] (or deserialize one) and hand it over explicitly.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within {min}..={max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Thresholds used by the text locator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocatorConfig {
    /// Minimum similarity for a fuzzy window to be accepted
    pub fuzzy_threshold: f64,

    /// Fuzzy window size tolerance relative to the searched text
    pub window_tolerance: f64,

    /// Minimum context similarity for picking one of several occurrences
    pub min_context_similarity: f64,

    /// Lead the best candidate needs over the runner-up
    pub ambiguity_margin: f64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            window_tolerance: 0.2,
            min_context_similarity: 0.5,
            ambiguity_margin: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecorderConfig {
    /// Shrink each change to the words that actually differ
    pub word_level_narrowing: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            word_level_narrowing: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EditorConfig {
    pub locator: LocatorConfig,
    pub recorder: RecorderConfig,
}

impl EditorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let locator = &self.locator;
        check_range("fuzzyThreshold", locator.fuzzy_threshold, 0.0, 1.0)?;
        check_range("windowTolerance", locator.window_tolerance, 0.0, 0.99)?;
        check_range("minContextSimilarity", locator.min_context_similarity, 0.0, 1.0)?;
        check_range("ambiguityMargin", locator.ambiguity_margin, 0.0, 1.0)?;
        Ok(())
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value.is_nan() || value < min || value > max {
        return Err(ConfigError::OutOfRange { field, value, min, max });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EditorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.locator.fuzzy_threshold, 0.85);
        assert!(config.recorder.word_level_narrowing);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "locator": { "fuzzyThreshold": 0.9 } }"#;
        let config: EditorConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.locator.fuzzy_threshold, 0.9);
        assert_eq!(config.locator.ambiguity_margin, 0.1);
        assert!(config.recorder.word_level_narrowing);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let mut config = EditorConfig::default();
        config.locator.fuzzy_threshold = 1.5;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fuzzyThreshold"));
    }

    #[test]
    fn test_nan_rejected() {
        let mut config = EditorConfig::default();
        config.locator.ambiguity_margin = f64::NAN;
        assert!(config.validate().is_err());
    }
}
