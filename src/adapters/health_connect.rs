//! Health Connect adapter
//!
//! Parses Android Health Connect `readRecords` exports and maps them to
//! provider-neutral records. Daily totals are bucketed by the UTC date of each
//! record's end time. Sessions and weight readings come out newest first.

use crate::calendar::{format_day, minutes_between, utc_day};
use crate::error::MetricsError;
use crate::types::{
    ActiveEnergyRecord, DataSource, ExerciseMinutesRecord, HeartRateSample, ProviderSnapshot,
    SleepSession, SleepStageSegment, StepRecord, WeightSample, WorkoutSession,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::ProviderPayloadAdapter;

const SOURCE: DataSource = DataSource::Google;

const KG_PER_POUND: f64 = 0.45359237;

/// Health Connect payload adapter
pub struct HealthConnectAdapter;

impl ProviderPayloadAdapter for HealthConnectAdapter {
    fn source(&self) -> DataSource {
        SOURCE
    }

    fn parse(&self, raw_json: &str) -> Result<ProviderSnapshot, MetricsError> {
        let payload: HealthConnectPayload = serde_json::from_str(raw_json)?;

        let mut steps_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for rec in &payload.steps {
            if let Some(day) = utc_day(&rec.end_time) {
                *steps_by_day.entry(day).or_insert(0.0) += rec.count.unwrap_or(0.0);
            }
        }
        let steps = steps_by_day
            .into_iter()
            .map(|(day, value)| StepRecord {
                date: format_day(day),
                value: value.max(0.0).round() as u64,
                source: SOURCE,
            })
            .collect();

        let mut heart_rate: Vec<HeartRateSample> = payload
            .heart_rate
            .into_iter()
            .flat_map(|rec| rec.samples)
            .map(|s| HeartRateSample {
                timestamp: s.time,
                bpm: s.beats_per_minute,
                source: SOURCE,
            })
            .collect();
        heart_rate.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        let mut sleep: Vec<SleepSession> = payload
            .sleep_session
            .into_iter()
            .map(|rec| SleepSession {
                stages: rec
                    .stages
                    .into_iter()
                    .map(|st| SleepStageSegment {
                        stage: st.stage.as_ref().and_then(stage_code),
                        start: st.start_time,
                        end: st.end_time,
                    })
                    .collect(),
                start: rec.start_time,
                end: rec.end_time,
                source: SOURCE,
            })
            .collect();
        sleep.sort_by(|a, b| b.start.cmp(&a.start));

        // Exercise sessions carry no energy; exercise minutes come from their spans
        let mut minutes_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        let mut workouts: Vec<WorkoutSession> = Vec::with_capacity(payload.exercise_session.len());
        for rec in payload.exercise_session {
            if let (Some(day), Some(minutes)) = (
                utc_day(&rec.end_time),
                minutes_between(&rec.start_time, &rec.end_time),
            ) {
                *minutes_by_day.entry(day).or_insert(0.0) += minutes;
            }
            workouts.push(WorkoutSession {
                activity_type: rec
                    .exercise_type
                    .as_ref()
                    .map(exercise_name)
                    .unwrap_or_else(|| "unknown".to_string()),
                calories: Some(0.0),
                distance_km: None,
                start: rec.start_time,
                end: rec.end_time,
                source: SOURCE,
            });
        }
        workouts.sort_by(|a, b| b.start.cmp(&a.start));
        let exercise_minutes = minutes_by_day
            .into_iter()
            .map(|(day, minutes)| ExerciseMinutesRecord {
                date: format_day(day),
                minutes: minutes.round(),
                source: SOURCE,
            })
            .collect();

        let mut energy_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for rec in &payload.active_calories_burned {
            if let Some(day) = utc_day(&rec.end_time) {
                let kcal = rec.energy.as_ref().map(Energy::kilocalories).unwrap_or(0.0);
                *energy_by_day.entry(day).or_insert(0.0) += kcal;
            }
        }
        let active_energy = energy_by_day
            .into_iter()
            .map(|(day, kcal)| ActiveEnergyRecord {
                date: format_day(day),
                kcal,
                source: SOURCE,
            })
            .collect();

        let mut weight: Vec<WeightSample> = payload
            .weight
            .into_iter()
            .filter_map(|rec| {
                let kg = rec.weight.as_ref().and_then(Mass::kilograms)?;
                kg.is_finite().then(|| WeightSample {
                    timestamp: rec.time,
                    kg,
                    source: SOURCE,
                })
            })
            .collect();
        weight.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

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

/// Translate a Health Connect sleep stage into the mapper's vocabulary.
///
/// Numeric codes follow `SleepSessionRecord.STAGE_TYPE_*`; generic "sleeping"
/// and unknown codes return `None`, which the mapper treats as light sleep.
fn stage_code(code: &Code) -> Option<String> {
    let name = match code {
        Code::Number(1) | Code::Number(3) | Code::Number(7) => "awake",
        Code::Number(4) => "light",
        Code::Number(5) => "deep",
        Code::Number(6) => "rem",
        Code::Number(_) => return None,
        Code::Text(text) => {
            let upper = text.to_uppercase();
            if upper.contains("REM") {
                "rem"
            } else if upper.contains("DEEP") {
                "deep"
            } else if upper.contains("AWAKE") || upper.contains("OUT_OF_BED") {
                "awake"
            } else {
                "core"
            }
        }
    };
    Some(name.to_string())
}

/// Name for a Health Connect exercise type (`ExerciseSessionRecord.EXERCISE_TYPE_*`)
fn exercise_name(code: &Code) -> String {
    match code {
        Code::Text(text) => text.clone(),
        Code::Number(n) => match n {
            8 => "bike",
            9 => "bike_stationary",
            36 => "high_intensity_interval_training",
            37 => "hike",
            56 => "running",
            57 => "running_treadmill",
            70 => "strength_training",
            73 => "swimming_open_water",
            74 => "swimming_pool",
            79 => "walking",
            81 => "weightlifting",
            83 => "yoga",
            other => return other.to_string(),
        }
        .to_string(),
    }
}

// Health Connect record structures

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HealthConnectPayload {
    #[serde(default)]
    steps: Vec<StepsRecord>,
    #[serde(default)]
    heart_rate: Vec<HeartRateRecord>,
    #[serde(default)]
    sleep_session: Vec<SleepSessionRecord>,
    #[serde(default)]
    exercise_session: Vec<ExerciseSessionRecord>,
    #[serde(default)]
    active_calories_burned: Vec<ActiveCaloriesRecord>,
    #[serde(default)]
    weight: Vec<WeightRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StepsRecord {
    end_time: String,
    #[serde(default)]
    count: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeartRateRecord {
    #[serde(default)]
    samples: Vec<HeartRateRecordSample>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeartRateRecordSample {
    time: String,
    beats_per_minute: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SleepSessionRecord {
    start_time: String,
    end_time: String,
    #[serde(default)]
    stages: Vec<SleepStageRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SleepStageRecord {
    start_time: String,
    end_time: String,
    #[serde(default)]
    stage: Option<Code>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExerciseSessionRecord {
    start_time: String,
    end_time: String,
    #[serde(default)]
    exercise_type: Option<Code>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActiveCaloriesRecord {
    end_time: String,
    #[serde(default)]
    energy: Option<Energy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Energy {
    #[serde(default)]
    in_kilocalories: Option<f64>,
    #[serde(default)]
    in_calories: Option<f64>,
}

impl Energy {
    fn kilocalories(&self) -> f64 {
        self.in_kilocalories
            .or_else(|| self.in_calories.map(|cal| cal / 1000.0))
            .unwrap_or(0.0)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeightRecord {
    time: String,
    #[serde(default)]
    weight: Option<Mass>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Mass {
    #[serde(default)]
    in_kilograms: Option<f64>,
    #[serde(default)]
    in_pounds: Option<f64>,
}

impl Mass {
    fn kilograms(&self) -> Option<f64> {
        self.in_kilograms
            .or_else(|| self.in_pounds.map(|lb| lb * KG_PER_POUND))
    }
}

/// Enumerated field that may arrive as its numeric constant or as a name
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Code {
    Number(i64),
    Text(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::build_daily_metrics_ending;
    use crate::types::WorkoutType;
    use pretty_assertions::assert_eq;

    fn sample_payload() -> &'static str {
        r#"{
            "steps": [
                {"startTime": "2024-01-15T08:00:00Z", "endTime": "2024-01-15T09:00:00Z", "count": 1200},
                {"startTime": "2024-01-15T17:00:00Z", "endTime": "2024-01-15T18:00:00Z", "count": 3400},
                {"startTime": "2024-01-14T23:30:00Z", "endTime": "2024-01-15T00:10:00Z", "count": 100},
                {"startTime": "2024-01-14T10:00:00Z", "endTime": "2024-01-14T11:00:00Z", "count": 800}
            ],
            "heartRate": [
                {"samples": [
                    {"time": "2024-01-15T10:00:00Z", "beatsPerMinute": 72},
                    {"time": "2024-01-15T09:00:00Z", "beatsPerMinute": 64}
                ]},
                {"samples": []}
            ],
            "sleepSession": [{
                "startTime": "2024-01-14T23:00:00Z",
                "endTime": "2024-01-15T06:00:00Z",
                "stages": [
                    {"startTime": "2024-01-14T23:00:00Z", "endTime": "2024-01-15T02:00:00Z", "stage": 4},
                    {"startTime": "2024-01-15T02:00:00Z", "endTime": "2024-01-15T03:00:00Z", "stage": 5},
                    {"startTime": "2024-01-15T03:00:00Z", "endTime": "2024-01-15T04:30:00Z", "stage": "REM"},
                    {"startTime": "2024-01-15T04:30:00Z", "endTime": "2024-01-15T05:00:00Z", "stage": 1},
                    {"startTime": "2024-01-15T05:00:00Z", "endTime": "2024-01-15T06:00:00Z", "stage": 2}
                ]
            }],
            "exerciseSession": [
                {"startTime": "2024-01-15T07:00:00Z", "endTime": "2024-01-15T07:45:20Z", "exerciseType": 56},
                {"startTime": "2024-01-15T18:00:00Z", "endTime": "2024-01-15T18:30:00Z", "exerciseType": 999},
                {"startTime": "2024-01-14T18:00:00Z", "endTime": "2024-01-14T19:00:00Z"}
            ],
            "activeCaloriesBurned": [
                {"startTime": "2024-01-15T07:00:00Z", "endTime": "2024-01-15T08:00:00Z", "energy": {"inKilocalories": 250.5}},
                {"startTime": "2024-01-15T12:00:00Z", "endTime": "2024-01-15T13:00:00Z", "energy": {"inCalories": 49500}},
                {"startTime": "2024-01-15T14:00:00Z", "endTime": "2024-01-15T15:00:00Z"}
            ],
            "weight": [
                {"time": "2024-01-15T06:00:00Z", "weight": {"inPounds": 160}},
                {"time": "2024-01-10T06:00:00Z", "weight": {"inKilograms": 73.1}},
                {"time": "2024-01-11T06:00:00Z", "weight": {}}
            ]
        }"#
    }

    #[test]
    fn test_steps_bucketed_by_end_day() {
        let snapshot = HealthConnectAdapter.parse(sample_payload()).unwrap();

        let steps: Vec<(&str, u64)> = snapshot
            .steps
            .iter()
            .map(|s| (s.date.as_str(), s.value))
            .collect();
        assert_eq!(steps, vec![("2024-01-14", 800), ("2024-01-15", 4700)]);
        assert!(snapshot.steps.iter().all(|s| s.source == DataSource::Google));
    }

    #[test]
    fn test_heart_rate_flattened_and_sorted() {
        let snapshot = HealthConnectAdapter.parse(sample_payload()).unwrap();

        let bpm: Vec<f64> = snapshot.heart_rate.iter().map(|h| h.bpm).collect();
        assert_eq!(bpm, vec![64.0, 72.0]);
    }

    #[test]
    fn test_sleep_stage_codes_translated() {
        let snapshot = HealthConnectAdapter.parse(sample_payload()).unwrap();

        let stages: Vec<Option<&str>> = snapshot.sleep[0]
            .stages
            .iter()
            .map(|s| s.stage.as_deref())
            .collect();
        assert_eq!(
            stages,
            vec![Some("light"), Some("deep"), Some("rem"), Some("awake"), None]
        );
    }

    #[test]
    fn test_exercise_sessions_and_minutes() {
        let snapshot = HealthConnectAdapter.parse(sample_payload()).unwrap();

        let names: Vec<&str> = snapshot
            .workouts
            .iter()
            .map(|w| w.activity_type.as_str())
            .collect();
        assert_eq!(names, vec!["999", "running", "unknown"]);
        assert!(snapshot.workouts.iter().all(|w| w.calories == Some(0.0)));

        let minutes: Vec<(&str, f64)> = snapshot
            .exercise_minutes
            .iter()
            .map(|m| (m.date.as_str(), m.minutes))
            .collect();
        assert_eq!(minutes, vec![("2024-01-14", 60.0), ("2024-01-15", 75.0)]);
    }

    #[test]
    fn test_itemized_workouts_newest_first() {
        let raw = r#"{"exerciseSession": [
            {"startTime": "2024-01-15T07:00:00Z", "endTime": "2024-01-15T07:30:00Z", "exerciseType": 56},
            {"startTime": "2024-01-15T18:00:00Z", "endTime": "2024-01-15T18:40:00Z", "exerciseType": 79},
            {"startTime": "2024-01-15T12:00:00Z", "endTime": "2024-01-15T12:20:00Z", "exerciseType": 8}
        ]}"#;
        let snapshot = HealthConnectAdapter.parse(raw).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let days = build_daily_metrics_ending(today, &snapshot.into_input(0));

        let types: Vec<WorkoutType> = days[0].workouts.iter().map(|w| w.canonical_type).collect();
        assert_eq!(types, vec![WorkoutType::Walk, WorkoutType::Cycle, WorkoutType::Run]);
    }

    #[test]
    fn test_active_energy_units() {
        let snapshot = HealthConnectAdapter.parse(sample_payload()).unwrap();

        assert_eq!(snapshot.active_energy.len(), 1);
        assert_eq!(snapshot.active_energy[0].date, "2024-01-15");
        assert_eq!(snapshot.active_energy[0].kcal, 300.0);
    }

    #[test]
    fn test_weight_converted_and_filtered() {
        let snapshot = HealthConnectAdapter.parse(sample_payload()).unwrap();

        assert_eq!(snapshot.weight.len(), 2);
        assert!((snapshot.weight[0].kg - 72.574779).abs() < 1e-6);
        assert_eq!(snapshot.weight[1].kg, 73.1);
    }
}
