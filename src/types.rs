//! Core types for the healthfold aggregation pipeline
//!
//! Raw records arrive from a provider adapter with their timestamps untouched
//! (they may be malformed). The aggregator folds them into one [`DaySummary`]
//! per calendar day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Health data provider a record came from.
///
/// Informational only: the aggregator passes it through and never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    /// Apple Health (HealthKit)
    Apple,
    /// Android Health Connect
    Google,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Apple => "apple",
            DataSource::Google => "google",
        }
    }
}

/// Canonical workout classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkoutType {
    Run,
    Walk,
    Cycle,
    Strength,
}

/// Canonical sleep stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SleepStage {
    Light,
    Deep,
    Rem,
    Awake,
}

// ---------------------------------------------------------------------------
// Raw input records
// ---------------------------------------------------------------------------

/// Step count attributed to a calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    /// Day key (YYYY-MM-DD)
    pub date: String,
    pub value: u64,
    pub source: DataSource,
}

/// Single heart-rate reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateSample {
    /// ISO-8601 timestamp
    pub timestamp: String,
    pub bpm: f64,
    pub source: DataSource,
}

/// Stage segment inside a sleep session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepStageSegment {
    pub start: String,
    pub end: String,
    /// Provider stage code, mapped with [`crate::mapping::map_sleep_stage`]
    #[serde(default)]
    pub stage: Option<String>,
}

/// Sleep session with optional stage breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSession {
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub stages: Vec<SleepStageSegment>,
    pub source: DataSource,
}

/// Workout session as reported by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutSession {
    pub start: String,
    pub end: String,
    /// Provider activity identifier, mapped with [`crate::mapping::map_workout_type`]
    pub activity_type: String,
    /// Energy burned (kcal)
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub distance_km: Option<f64>,
    pub source: DataSource,
}

/// Device-reported active energy total for a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveEnergyRecord {
    pub date: String,
    pub kcal: f64,
    pub source: DataSource,
}

/// Device-reported exercise minutes for a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseMinutesRecord {
    pub date: String,
    pub minutes: f64,
    pub source: DataSource,
}

/// Body weight reading. Not part of [`DaySummary`]; used by trends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightSample {
    pub timestamp: String,
    pub kg: f64,
    pub source: DataSource,
}

/// Everything the aggregator needs for one window.
///
/// Every collection is optional; a missing one behaves like an empty one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsInput {
    /// Window size; the output covers `days + 1` calendar days
    pub days: u32,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub heart_rate: Vec<HeartRateSample>,
    #[serde(default)]
    pub sleep: Vec<SleepSession>,
    #[serde(default)]
    pub workouts: Vec<WorkoutSession>,
    #[serde(default)]
    pub active_energy: Vec<ActiveEnergyRecord>,
    #[serde(default)]
    pub exercise_minutes: Vec<ExerciseMinutesRecord>,
}

impl MetricsInput {
    pub fn new(days: u32) -> Self {
        Self {
            days,
            ..Default::default()
        }
    }

    /// Total number of raw records across all collections
    pub fn record_count(&self) -> usize {
        self.steps.len()
            + self.heart_rate.len()
            + self.sleep.len()
            + self.workouts.len()
            + self.active_energy.len()
            + self.exercise_minutes.len()
    }
}

/// Full read of one provider, as produced by an adapter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSnapshot {
    pub source: DataSource,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub heart_rate: Vec<HeartRateSample>,
    #[serde(default)]
    pub sleep: Vec<SleepSession>,
    #[serde(default)]
    pub workouts: Vec<WorkoutSession>,
    #[serde(default)]
    pub active_energy: Vec<ActiveEnergyRecord>,
    #[serde(default)]
    pub exercise_minutes: Vec<ExerciseMinutesRecord>,
    #[serde(default)]
    pub weight: Vec<WeightSample>,
}

impl ProviderSnapshot {
    pub fn empty(source: DataSource) -> Self {
        Self {
            source,
            steps: Vec::new(),
            heart_rate: Vec::new(),
            sleep: Vec::new(),
            workouts: Vec::new(),
            active_energy: Vec::new(),
            exercise_minutes: Vec::new(),
            weight: Vec::new(),
        }
    }

    /// Aggregator input for a `days` window; weight is left out
    pub fn into_input(self, days: u32) -> MetricsInput {
        MetricsInput {
            days,
            steps: self.steps,
            heart_rate: self.heart_rate,
            sleep: self.sleep,
            workouts: self.workouts,
            active_energy: self.active_energy,
            exercise_minutes: self.exercise_minutes,
        }
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Heart-rate summary for one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartRateSummary {
    /// Mean bpm, one decimal place
    pub average: f64,
    /// Low-percentile bpm used in place of a clinical resting heart rate
    pub resting_proxy: u32,
    /// Downsampled bpm readings in original order
    pub series: Vec<f64>,
}

/// Minutes per retained sleep stage. Awake time is not kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageMinutes {
    pub light: f64,
    pub deep: f64,
    pub rem: f64,
}

/// Sleep summary for one day
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepSummary {
    /// Full span of all sessions started that day, awake time included
    pub total_minutes: f64,
    pub stage_minutes: StageMinutes,
}

/// Itemized workout with a recognized type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutEntry {
    /// Deterministic id derived from start, end and provider activity code
    pub id: String,
    pub canonical_type: WorkoutType,
    pub duration_minutes: f64,
    pub calories: f64,
}

/// Aggregated metrics for one calendar day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub steps: u64,
    pub calories: f64,
    pub active_minutes: f64,
    pub heart_rate: HeartRateSummary,
    pub sleep: SleepSummary,
    pub workouts: Vec<WorkoutEntry>,
}

impl DaySummary {
    /// Zero-valued summary for a day without data
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            steps: 0,
            calories: 0.0,
            active_minutes: 0.0,
            heart_rate: HeartRateSummary::default(),
            sleep: SleepSummary::default(),
            workouts: Vec::new(),
        }
    }
}
