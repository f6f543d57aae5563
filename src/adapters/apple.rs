//! Apple Health adapter
//!
//! Parses HealthKit sample exports (react-native-health shapes) and maps them
//! to provider-neutral records.

use crate::error::MetricsError;
use crate::types::{
    ActiveEnergyRecord, DataSource, ExerciseMinutesRecord, HeartRateSample, ProviderSnapshot,
    SleepSession, SleepStageSegment, StepRecord, WeightSample, WorkoutSession,
};
use serde::Deserialize;
use std::collections::BTreeMap;

use super::ProviderPayloadAdapter;

const SOURCE: DataSource = DataSource::Apple;

/// Apple Health payload adapter
pub struct AppleHealthAdapter;

impl ProviderPayloadAdapter for AppleHealthAdapter {
    fn source(&self) -> DataSource {
        SOURCE
    }

    fn parse(&self, raw_json: &str) -> Result<ProviderSnapshot, MetricsError> {
        let payload: ApplePayload = serde_json::from_str(raw_json)?;

        let steps = payload
            .steps
            .iter()
            .map(|s| StepRecord {
                date: day_prefix(&s.start_date),
                value: s.value.unwrap_or(0.0).max(0.0).round() as u64,
                source: SOURCE,
            })
            .collect();

        let heart_rate = payload
            .heart_rate
            .iter()
            .filter_map(|s| {
                s.value.map(|bpm| HeartRateSample {
                    timestamp: s.start_date.clone(),
                    bpm,
                    source: SOURCE,
                })
            })
            .collect();

        // HealthKit reports one sample per stage; each becomes a session
        // covering itself so stage minutes and totals line up.
        let sleep = payload
            .sleep
            .into_iter()
            .map(|s| {
                let stages = match s.value {
                    Some(code) => vec![SleepStageSegment {
                        start: s.start_date.clone(),
                        end: s.end_date.clone(),
                        stage: Some(code),
                    }],
                    None => Vec::new(),
                };
                SleepSession {
                    start: s.start_date,
                    end: s.end_date,
                    stages,
                    source: SOURCE,
                }
            })
            .collect();

        let workouts = payload
            .workouts
            .into_iter()
            .map(|w| WorkoutSession {
                activity_type: w
                    .workout_activity_type
                    .or(w.activity_type)
                    .or(w.activity_name)
                    .unwrap_or_default(),
                calories: w.total_energy_burned.map(Quantity::value),
                distance_km: w.total_distance.map(Quantity::value),
                start: w.start_date,
                end: w.end_date,
                source: SOURCE,
            })
            .collect();

        // Active energy arrives as many small samples; fold them into days
        let mut energy_by_day: BTreeMap<String, f64> = BTreeMap::new();
        for s in &payload.active_energy {
            *energy_by_day.entry(day_prefix(&s.start_date)).or_insert(0.0) +=
                s.value.unwrap_or(0.0);
        }
        let active_energy = energy_by_day
            .into_iter()
            .map(|(date, kcal)| ActiveEnergyRecord {
                date,
                kcal,
                source: SOURCE,
            })
            .collect();

        let exercise_minutes = payload
            .exercise_time
            .iter()
            .map(|s| ExerciseMinutesRecord {
                date: day_prefix(&s.start_date),
                minutes: s.value.unwrap_or(0.0),
                source: SOURCE,
            })
            .collect();

        let weight = payload
            .weight
            .iter()
            .filter_map(|s| {
                s.value.filter(|kg| kg.is_finite()).map(|kg| WeightSample {
                    timestamp: s.start_date.clone(),
                    kg,
                    source: SOURCE,
                })
            })
            .collect();

        Ok(ProviderSnapshot {
            source: SOURCE,
            steps,
            heart_rate,
            sleep,
            workouts,
            active_energy,
            exercise_minutes,
            weight,
        })
    }
}

/// Leading `YYYY-MM-DD` of a HealthKit timestamp, left as-is when shorter
fn day_prefix(timestamp: &str) -> String {
    timestamp.get(..10).unwrap_or(timestamp).to_string()
}

// HealthKit export structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApplePayload {
    #[serde(default)]
    steps: Vec<AppleSample>,
    #[serde(default)]
    heart_rate: Vec<AppleSample>,
    #[serde(default)]
    sleep: Vec<AppleSleepSample>,
    #[serde(default)]
    workouts: Vec<AppleWorkout>,
    #[serde(default)]
    active_energy: Vec<AppleSample>,
    #[serde(default)]
    exercise_time: Vec<AppleSample>,
    #[serde(default)]
    weight: Vec<AppleSample>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppleSample {
    start_date: String,
    #[serde(default)]
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppleSleepSample {
    start_date: String,
    end_date: String,
    /// INBED / ASLEEPCORE / ASLEEPDEEP / ASLEEPREM
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppleWorkout {
    start_date: String,
    end_date: String,
    #[serde(default)]
    workout_activity_type: Option<String>,
    #[serde(default)]
    activity_type: Option<String>,
    #[serde(default)]
    activity_name: Option<String>,
    #[serde(default)]
    total_energy_burned: Option<Quantity>,
    #[serde(default)]
    total_distance: Option<Quantity>,
}

/// HealthKit quantities come either bare or wrapped with a unit
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Quantity {
    Plain(f64),
    Wrapped { quantity: f64 },
}

impl Quantity {
    fn value(self) -> f64 {
        match self {
            Quantity::Plain(v) => v,
            Quantity::Wrapped { quantity } => quantity,
        }
    }
}
