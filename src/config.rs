//! Aggregation configuration
//!
//! Every field has a default matching the dashboard's expectations, so an empty
//! JSON object is a valid configuration.

use crate::error::MetricsError;
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Maximum heart-rate chart points per day (~15 minute resolution)
pub const DEFAULT_SERIES_TARGET: usize = 96;

/// Percentile used for the resting heart-rate proxy
pub const DEFAULT_RESTING_PERCENTILE: f64 = 0.1;

/// Largest lookback accepted from callers (about ten years)
pub const MAX_WINDOW_DAYS: u32 = 3650;

/// Reject lookbacks longer than [`MAX_WINDOW_DAYS`]
pub fn validate_window(days: u32) -> Result<(), MetricsError> {
    if days > MAX_WINDOW_DAYS {
        return Err(MetricsError::InvalidConfig(format!(
            "days must be at most {MAX_WINDOW_DAYS}, got {days}"
        )));
    }
    Ok(())
}

/// How a timestamp is assigned to a calendar day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DayBucketing {
    /// First ten characters of the timestamp, whatever offset it carries
    #[default]
    Lexical,
    /// Convert to a fixed UTC offset before taking the date
    Offset { minutes: i32 },
}

impl DayBucketing {
    /// Fixed offset for [`DayBucketing::Offset`], `None` for lexical bucketing
    /// or an out-of-range offset
    pub fn offset(&self) -> Option<FixedOffset> {
        match self {
            DayBucketing::Lexical => None,
            DayBucketing::Offset { minutes } => FixedOffset::east_opt(minutes * 60),
        }
    }
}

/// Tunables for [`crate::aggregator::Aggregator`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub series_target: usize,
    pub resting_percentile: f64,
    pub bucketing: DayBucketing,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            series_target: DEFAULT_SERIES_TARGET,
            resting_percentile: DEFAULT_RESTING_PERCENTILE,
            bucketing: DayBucketing::Lexical,
        }
    }
}

impl AggregationConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, MetricsError> {
        let config: AggregationConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MetricsError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> Result<String, MetricsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.series_target == 0 {
            return Err(MetricsError::InvalidConfig(
                "series_target must be at least 1".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.resting_percentile) {
            return Err(MetricsError::InvalidConfig(format!(
                "resting_percentile must be in [0, 1), got {}",
                self.resting_percentile
            )));
        }
        if let DayBucketing::Offset { minutes } = self.bucketing {
            if self.bucketing.offset().is_none() {
                return Err(MetricsError::InvalidConfig(format!(
                    "bucketing offset out of range: {minutes} minutes"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_object_is_default() {
        let config = AggregationConfig::from_json("{}").unwrap();
        assert_eq!(config, AggregationConfig::default());
    }

    #[test]
    fn test_offset_bucketing() {
        let config =
            AggregationConfig::from_json(r#"{"bucketing": {"mode": "offset", "minutes": -300}}"#)
                .unwrap();
        assert_eq!(config.bucketing, DayBucketing::Offset { minutes: -300 });
        assert_eq!(
            config.bucketing.offset(),
            Some(FixedOffset::west_opt(5 * 3600).unwrap())
        );
    }

    #[test]
    fn test_window_cap() {
        assert!(validate_window(0).is_ok());
        assert!(validate_window(MAX_WINDOW_DAYS).is_ok());
        assert!(matches!(
            validate_window(MAX_WINDOW_DAYS + 1),
            Err(MetricsError::InvalidConfig(_))
        ));
        assert!(validate_window(u32::MAX).is_err());
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(matches!(
            AggregationConfig::from_json(r#"{"series_target": 0}"#),
            Err(MetricsError::InvalidConfig(_))
        ));
        assert!(matches!(
            AggregationConfig::from_json(r#"{"resting_percentile": 1.5}"#),
            Err(MetricsError::InvalidConfig(_))
        ));
        assert!(matches!(
            AggregationConfig::from_json(r#"{"bucketing": {"mode": "offset", "minutes": 100000}}"#),
            Err(MetricsError::InvalidConfig(_))
        ));
        assert!(matches!(
            AggregationConfig::from_json("not json"),
            Err(MetricsError::JsonError(_))
        ));
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = AggregationConfig {
            series_target: 48,
            resting_percentile: 0.05,
            bucketing: DayBucketing::Offset { minutes: 60 },
        };
        let parsed = AggregationConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
