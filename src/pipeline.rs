//! Pipeline orchestration
//!
//! This module provides the public API for healthfold. It runs a raw provider
//! export through adapter, aggregator and encoder in one call.

use crate::adapters::{AppleHealthAdapter, HealthConnectAdapter, ProviderPayloadAdapter};
use crate::aggregator::Aggregator;
use crate::config::{validate_window, AggregationConfig};
use crate::encoder::MetricsEncoder;
use crate::error::MetricsError;
use crate::history::MetricsHistory;
use crate::trends::{build_trend, TrendQuery, TrendReport, WorkoutWeekSummary};
use crate::types::{DaySummary, WeightSample};
use chrono::{Local, NaiveDate};
use tracing::debug;

/// Convert a raw Apple Health export into an encoded daily metrics payload.
///
/// # Arguments
/// * `raw_json` - Apple Health export JSON
/// * `days` - Window size; the payload covers `days + 1` calendar days ending today
///
/// # Example
/// ```ignore
/// let payload = apple_to_daily_metrics(export_json, 7)?;
/// ```
pub fn apple_to_daily_metrics(raw_json: String, days: u32) -> Result<String, MetricsError> {
    let adapter = AppleHealthAdapter;
    process_provider_payload(&adapter, &raw_json, days, Local::now().date_naive())
}

/// Convert a raw Health Connect export into an encoded daily metrics payload.
///
/// # Arguments
/// * `raw_json` - Health Connect `readRecords` export JSON
/// * `days` - Window size; the payload covers `days + 1` calendar days ending today
pub fn health_connect_to_daily_metrics(
    raw_json: String,
    days: u32,
) -> Result<String, MetricsError> {
    let adapter = HealthConnectAdapter;
    process_provider_payload(&adapter, &raw_json, days, Local::now().date_naive())
}

/// Adapter, then aggregator, then encoder, with the default configuration
fn process_provider_payload(
    adapter: &dyn ProviderPayloadAdapter,
    raw_json: &str,
    days: u32,
    today: NaiveDate,
) -> Result<String, MetricsError> {
    validate_window(days)?;
    let snapshot = adapter.parse(raw_json)?;
    let source = snapshot.source;
    let summaries = Aggregator::default().build(today, &snapshot.into_input(days));

    MetricsEncoder::new().encode_to_json(source, &summaries)
}

/// Stateful processor that keeps a history of computed days across calls.
///
/// Use this when the host app wants to merge successive syncs and draw trends
/// from them.
pub struct MetricsProcessor {
    aggregator: Aggregator,
    encoder: MetricsEncoder,
    history: MetricsHistory,
    weights: Vec<WeightSample>,
    today: Option<NaiveDate>,
}

impl Default for MetricsProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self {
            aggregator: Aggregator::default(),
            encoder: MetricsEncoder::new(),
            history: MetricsHistory::new(),
            weights: Vec::new(),
            today: None,
        }
    }

    /// Create a processor with a validated configuration
    pub fn with_config(config: AggregationConfig) -> Result<Self, MetricsError> {
        config.validate()?;
        Ok(Self {
            aggregator: Aggregator::new(config),
            ..Self::new()
        })
    }

    /// Pin the last day of every window instead of using the local date
    pub fn set_today(&mut self, today: Option<NaiveDate>) {
        self.today = today;
    }

    pub fn config(&self) -> &AggregationConfig {
        self.aggregator.config()
    }

    pub fn history(&self) -> &MetricsHistory {
        &self.history
    }

    /// Weight readings from the most recent payload
    pub fn weights(&self) -> &[WeightSample] {
        &self.weights
    }

    /// Load history state from JSON
    pub fn load_history(&mut self, json: &str) -> Result<(), MetricsError> {
        self.history = MetricsHistory::from_json(json)?;
        Ok(())
    }

    /// Save history state to JSON
    pub fn save_history(&self) -> Result<String, MetricsError> {
        self.history.to_json()
    }

    /// Process an Apple Health export and merge the window into history
    pub fn process_apple(&mut self, raw_json: &str, days: u32) -> Result<String, MetricsError> {
        let adapter = AppleHealthAdapter;
        self.process_with_adapter(&adapter, raw_json, days)
    }

    /// Process a Health Connect export and merge the window into history
    pub fn process_health_connect(
        &mut self,
        raw_json: &str,
        days: u32,
    ) -> Result<String, MetricsError> {
        let adapter = HealthConnectAdapter;
        self.process_with_adapter(&adapter, raw_json, days)
    }

    /// Trend over the stored history
    pub fn trend(&self, query: &TrendQuery) -> TrendReport {
        let days: Vec<DaySummary> = self.history.iter().cloned().collect();
        build_trend(&days, &self.weights, query, self.today())
    }

    /// Workout card for the current week
    pub fn workout_week(&self, goal_minutes: f64) -> WorkoutWeekSummary {
        let days = self.history.last_n_days(7);
        WorkoutWeekSummary::for_week(&days, self.today(), goal_minutes)
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Local::now().date_naive())
    }

    fn process_with_adapter(
        &mut self,
        adapter: &dyn ProviderPayloadAdapter,
        raw_json: &str,
        days: u32,
    ) -> Result<String, MetricsError> {
        validate_window(days)?;
        let mut snapshot = adapter.parse(raw_json)?;
        let source = snapshot.source;
        let weights = std::mem::take(&mut snapshot.weight);

        let summaries = self.aggregator.build(self.today(), &snapshot.into_input(days));
        let json = self.encoder.encode_to_json(source, &summaries)?;

        debug!(
            provider = source.as_str(),
            days = summaries.len(),
            weights = weights.len(),
            "merged window into history"
        );
        self.history.merge(summaries);
        self.weights = weights;

        Ok(json)
    }
}
