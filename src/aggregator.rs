//! Daily metrics aggregation
//!
//! Folds raw provider records into exactly `days + 1` [`DaySummary`] entries,
//! oldest first, ending today. Pure: no I/O, no retained state, never fails.
//!
//! Merge rules:
//! - steps are summed per day
//! - heart rate: mean (1 decimal), low-percentile resting proxy, downsampled series
//! - sleep is bucketed by session start; awake stage minutes are discarded
//! - workouts add to calories / active minutes; only recognized types are itemized
//! - explicit daily active energy and exercise minutes replace the workout
//!   totals only when larger

use crate::calendar::{day_key, minutes_between, parse_day, DayWindow};
use crate::config::AggregationConfig;
use crate::mapping::{map_sleep_stage, map_workout_type};
use crate::types::{
    DaySummary, HeartRateSummary, MetricsInput, SleepStage, WorkoutEntry, WorkoutSession,
};
use chrono::{Local, NaiveDate};
use tracing::debug;
use uuid::Uuid;

/// Build daily metrics for a window ending on the current local day, with the
/// default configuration.
pub fn build_daily_metrics(input: &MetricsInput) -> Vec<DaySummary> {
    Aggregator::default().build(Local::now().date_naive(), input)
}

/// Build daily metrics for a window ending on `today`, with the default configuration.
pub fn build_daily_metrics_ending(today: NaiveDate, input: &MetricsInput) -> Vec<DaySummary> {
    Aggregator::default().build(today, input)
}

/// Aggregator carrying its configuration. Cheap to clone, safe to share.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: AggregationConfig,
}

/// Records skipped during one fold
#[derive(Debug, Default)]
struct FoldStats {
    out_of_window: usize,
    unparseable: usize,
}

impl FoldStats {
    /// Resolve a day key to a window slot, counting why a record was skipped
    fn slot(&mut self, window: &DayWindow, key: Option<NaiveDate>) -> Option<usize> {
        match key {
            None => {
                self.unparseable += 1;
                None
            }
            Some(date) => {
                let idx = window.index_of(date);
                if idx.is_none() {
                    self.out_of_window += 1;
                }
                idx
            }
        }
    }
}

impl Aggregator {
    pub fn new(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Aggregate `input` into one summary per day from `today - input.days`
    /// through `today`.
    pub fn build(&self, today: NaiveDate, input: &MetricsInput) -> Vec<DaySummary> {
        let window = DayWindow::ending(today, input.days);
        let bucketing = &self.config.bucketing;
        let mut stats = FoldStats::default();

        let mut days: Vec<DaySummary> = window.days().map(DaySummary::empty).collect();

        for record in &input.steps {
            if let Some(i) = stats.slot(&window, parse_day(&record.date)) {
                days[i].steps += record.value;
            }
        }

        let mut heart_rate: Vec<Vec<f64>> = vec![Vec::new(); days.len()];
        for sample in &input.heart_rate {
            if let Some(i) = stats.slot(&window, day_key(&sample.timestamp, bucketing)) {
                heart_rate[i].push(sample.bpm);
            }
        }
        for (day, samples) in days.iter_mut().zip(&heart_rate) {
            if !samples.is_empty() {
                day.heart_rate = self.summarize_heart_rate(samples);
            }
        }

        for session in &input.sleep {
            let Some(i) = stats.slot(&window, day_key(&session.start, bucketing)) else {
                continue;
            };
            let Some(total) = minutes_between(&session.start, &session.end) else {
                stats.unparseable += 1;
                continue;
            };
            let sleep = &mut days[i].sleep;
            sleep.total_minutes += total;

            for segment in &session.stages {
                let minutes = minutes_between(&segment.start, &segment.end).unwrap_or(0.0);
                match map_sleep_stage(segment.stage.as_deref()) {
                    SleepStage::Light => sleep.stage_minutes.light += minutes,
                    SleepStage::Deep => sleep.stage_minutes.deep += minutes,
                    SleepStage::Rem => sleep.stage_minutes.rem += minutes,
                    SleepStage::Awake => {}
                }
            }
        }

        for workout in &input.workouts {
            let Some(i) = stats.slot(&window, day_key(&workout.start, bucketing)) else {
                continue;
            };
            let Some(minutes) = minutes_between(&workout.start, &workout.end) else {
                stats.unparseable += 1;
                continue;
            };
            let kcal = workout.calories.unwrap_or(0.0);
            let day = &mut days[i];

            if let Some(canonical_type) = map_workout_type(&workout.activity_type) {
                day.workouts.push(WorkoutEntry {
                    id: workout_id(workout),
                    canonical_type,
                    duration_minutes: minutes,
                    calories: kcal,
                });
            }
            // fallback totals; device daily readings below may raise them
            day.calories += kcal;
            day.active_minutes += minutes;
        }

        for record in &input.active_energy {
            if let Some(i) = stats.slot(&window, parse_day(&record.date)) {
                days[i].calories = days[i].calories.max(record.kcal);
            }
        }

        for record in &input.exercise_minutes {
            if let Some(i) = stats.slot(&window, parse_day(&record.date)) {
                days[i].active_minutes = days[i].active_minutes.max(record.minutes);
            }
        }

        for day in &mut days {
            day.active_minutes = day.active_minutes.round();
            day.sleep.total_minutes = day.sleep.total_minutes.round();
            day.sleep.stage_minutes.light = day.sleep.stage_minutes.light.round();
            day.sleep.stage_minutes.deep = day.sleep.stage_minutes.deep.round();
            day.sleep.stage_minutes.rem = day.sleep.stage_minutes.rem.round();
        }

        debug!(
            start = %window.start(),
            end = %window.end(),
            records = input.record_count(),
            out_of_window = stats.out_of_window,
            unparseable = stats.unparseable,
            "aggregated daily metrics"
        );

        days
    }

    fn summarize_heart_rate(&self, samples: &[f64]) -> HeartRateSummary {
        let count = samples.len();
        let average = samples.iter().sum::<f64>() / count as f64;

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);
        let rank = (count as f64 * self.config.resting_percentile).floor() as usize;
        let resting = sorted[rank.min(count - 1)];

        // ceiling stride keeps the series within the target
        let stride = count.div_ceil(self.config.series_target.max(1)).max(1);
        let series = samples.iter().step_by(stride).copied().collect();

        HeartRateSummary {
            average: round1(average),
            resting_proxy: resting.round().max(0.0) as u32,
            series,
        }
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Stable id for a workout: UUIDv5 over start, end and provider activity code
fn workout_id(workout: &WorkoutSession) -> String {
    let name = format!(
        "{}|{}|{}",
        workout.start, workout.end, workout.activity_type
    );
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DayBucketing;
    use crate::types::{
        ActiveEnergyRecord, DataSource, ExerciseMinutesRecord, HeartRateSample, SleepSession,
        SleepStageSegment, StepRecord, WorkoutType,
    };
    use pretty_assertions::assert_eq;

    const SRC: DataSource = DataSource::Apple;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn steps(date: &str, value: u64) -> StepRecord {
        StepRecord {
            date: date.to_string(),
            value,
            source: SRC,
        }
    }

    fn hr(timestamp: &str, bpm: f64) -> HeartRateSample {
        HeartRateSample {
            timestamp: timestamp.to_string(),
            bpm,
            source: SRC,
        }
    }

    fn workout(start: &str, end: &str, activity: &str, kcal: Option<f64>) -> WorkoutSession {
        WorkoutSession {
            start: start.to_string(),
            end: end.to_string(),
            activity_type: activity.to_string(),
            calories: kcal,
            distance_km: None,
            source: SRC,
        }
    }

    fn segment(start: &str, end: &str, stage: &str) -> SleepStageSegment {
        SleepStageSegment {
            start: start.to_string(),
            end: end.to_string(),
            stage: Some(stage.to_string()),
        }
    }

    fn last(days: &[DaySummary]) -> &DaySummary {
        days.last().unwrap()
    }

    #[test]
    fn test_window_is_complete_and_contiguous() {
        for n in [0u32, 1, 6, 30, 90] {
            let days = build_daily_metrics_ending(today(), &MetricsInput::new(n));
            assert_eq!(days.len(), n as usize + 1);
            assert_eq!(last(&days).date, today());
            for pair in days.windows(2) {
                assert_eq!(pair[0].date.succ_opt().unwrap(), pair[1].date);
            }
        }
    }

    #[test]
    fn test_current_day_window() {
        let days = build_daily_metrics(&MetricsInput::new(3));
        assert_eq!(days.len(), 4);
    }

    #[test]
    fn test_empty_input_zero_fills() {
        let days = build_daily_metrics_ending(today(), &MetricsInput::new(6));
        for day in &days {
            assert_eq!(day, &DaySummary::empty(day.date));
        }
    }

    #[test]
    fn test_steps_are_summed() {
        let mut input = MetricsInput::new(6);
        input.steps = vec![steps("2024-01-15", 1000), steps("2024-01-15", 2500)];

        let days = build_daily_metrics_ending(today(), &input);
        assert_eq!(last(&days).steps, 3500);
    }

    #[test]
    fn test_out_of_window_records_are_dropped() {
        let mut input = MetricsInput::new(2);
        input.steps = vec![
            steps("2024-01-12", 999),
            steps("2024-01-16", 999),
            steps("2024-01-13", 10),
        ];
        input.heart_rate = vec![hr("2023-12-31T10:00:00Z", 70.0)];

        let days = build_daily_metrics_ending(today(), &input);
        assert_eq!(days.iter().map(|d| d.steps).sum::<u64>(), 10);
        assert_eq!(days[0].steps, 10);
        assert!(days.iter().all(|d| d.heart_rate.series.is_empty()));
    }

    #[test]
    fn test_resting_proxy_is_tenth_percentile() {
        let mut input = MetricsInput::new(0);
        input.heart_rate = [50.0, 60.0, 62.0, 64.0, 66.0, 68.0, 70.0, 72.0, 74.0, 76.0]
            .iter()
            .enumerate()
            .map(|(i, bpm)| hr(&format!("2024-01-15T08:{:02}:00Z", i), *bpm))
            .collect();

        let days = build_daily_metrics_ending(today(), &input);
        let heart = &last(&days).heart_rate;
        assert_eq!(heart.resting_proxy, 60);
        assert_eq!(heart.average, 66.2);
        assert_eq!(heart.series.len(), 10);
    }

    #[test]
    fn test_resting_proxy_small_counts() {
        let mut input = MetricsInput::new(0);
        input.heart_rate = vec![hr("2024-01-15T08:00:00Z", 58.6)];
        let days = build_daily_metrics_ending(today(), &input);
        assert_eq!(last(&days).heart_rate.resting_proxy, 59);

        input.heart_rate.push(hr("2024-01-15T09:00:00Z", 80.0));
        let days = build_daily_metrics_ending(today(), &input);
        assert_eq!(last(&days).heart_rate.resting_proxy, 59);
        assert_eq!(last(&days).heart_rate.average, 69.3);
    }

    #[test]
    fn test_series_is_downsampled_in_order() {
        let mut input = MetricsInput::new(0);
        input.heart_rate = (0..500)
            .map(|i| {
                let ts = format!("2024-01-15T{:02}:{:02}:00Z", (i / 60) % 24, i % 60);
                hr(&ts, 40.0 + i as f64 * 0.1)
            })
            .collect();

        let days = build_daily_metrics_ending(today(), &input);
        let series = &last(&days).heart_rate.series;
        assert!(series.len() <= 96);
        assert!(!series.is_empty());
        assert_eq!(series[0], 40.0);
        assert!(series.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_series_target_is_configurable() {
        let aggregator = Aggregator::new(AggregationConfig {
            series_target: 10,
            ..Default::default()
        });
        let mut input = MetricsInput::new(0);
        input.heart_rate = (0..95)
            .map(|i| hr(&format!("2024-01-15T10:{:02}:00Z", i % 60), 60.0))
            .collect();

        let days = aggregator.build(today(), &input);
        assert_eq!(last(&days).heart_rate.series.len(), 10);
    }

    #[test]
    fn test_calories_prefer_larger_reading() {
        let mut input = MetricsInput::new(1);
        input.workouts = vec![
            workout("2024-01-15T07:00:00Z", "2024-01-15T07:30:00Z", "Running", Some(200.0)),
            workout("2024-01-14T07:00:00Z", "2024-01-14T07:30:00Z", "Running", Some(500.0)),
        ];
        input.active_energy = vec![
            ActiveEnergyRecord {
                date: "2024-01-15".to_string(),
                kcal: 350.0,
                source: SRC,
            },
            ActiveEnergyRecord {
                date: "2024-01-14".to_string(),
                kcal: 300.0,
                source: SRC,
            },
        ];

        let days = build_daily_metrics_ending(today(), &input);
        assert_eq!(days[1].calories, 350.0);
        // explicit reading never lowers the workout total
        assert_eq!(days[0].calories, 500.0);
    }

    #[test]
    fn test_exercise_minutes_prefer_larger_reading() {
        let mut input = MetricsInput::new(0);
        input.workouts = vec![workout(
            "2024-01-15T07:00:00Z",
            "2024-01-15T07:20:00Z",
            "Walking",
            None,
        )];
        input.exercise_minutes = vec![ExerciseMinutesRecord {
            date: "2024-01-15".to_string(),
            minutes: 42.4,
            source: SRC,
        }];

        let days = build_daily_metrics_ending(today(), &input);
        assert_eq!(last(&days).active_minutes, 42.0);
        assert_eq!(last(&days).calories, 0.0);
    }

    #[test]
    fn test_unrecognized_workout_counts_but_is_not_itemized() {
        let mut input = MetricsInput::new(0);
        input.workouts = vec![
            workout("2024-01-15T06:00:00Z", "2024-01-15T07:00:00Z", "Yoga", Some(180.0)),
            workout("2024-01-15T12:00:00Z", "2024-01-15T12:20:00Z", "Cycling", Some(100.0)),
            workout("2024-01-15T18:00:00Z", "2024-01-15T18:30:00Z", "Cycle", Some(220.0)),
        ];

        let days = build_daily_metrics_ending(today(), &input);
        let day = last(&days);
        assert_eq!(day.calories, 500.0);
        assert_eq!(day.active_minutes, 110.0);
        assert_eq!(day.workouts.len(), 1);
        assert_eq!(day.workouts[0].canonical_type, WorkoutType::Cycle);
        assert_eq!(day.workouts[0].duration_minutes, 30.0);
        assert_eq!(day.workouts[0].calories, 220.0);
    }

    #[test]
    fn test_workout_ids_are_deterministic() {
        let mut input = MetricsInput::new(0);
        input.workouts = vec![
            workout("2024-01-15T06:00:00Z", "2024-01-15T07:00:00Z", "Running", None),
            workout("2024-01-15T08:00:00Z", "2024-01-15T09:00:00Z", "Running", None),
        ];

        let first = build_daily_metrics_ending(today(), &input);
        let second = build_daily_metrics_ending(today(), &input);
        let ids: Vec<&str> = last(&first).workouts.iter().map(|w| w.id.as_str()).collect();

        assert_eq!(ids.len(), 2);
        assert_ne!(ids[0], ids[1]);
        assert_eq!(last(&first).workouts, last(&second).workouts);
    }

    #[test]
    fn test_sleep_stage_rounding_and_awake_exclusion() {
        let mut input = MetricsInput::new(0);
        input.sleep = vec![SleepSession {
            start: "2024-01-15T22:00:00Z".to_string(),
            end: "2024-01-15T23:36:00Z".to_string(),
            stages: vec![
                segment("2024-01-15T22:00:00Z", "2024-01-15T22:45:36Z", "ASLEEPCORE"),
                segment("2024-01-15T22:45:36Z", "2024-01-15T23:16:00Z", "ASLEEPDEEP"),
                segment("2024-01-15T23:16:00Z", "2024-01-15T23:36:00Z", "INBED"),
            ],
            source: SRC,
        }];

        let days = build_daily_metrics_ending(today(), &input);
        let sleep = &last(&days).sleep;
        assert_eq!(sleep.stage_minutes.light, 46.0);
        assert_eq!(sleep.stage_minutes.deep, 30.0);
        assert_eq!(sleep.stage_minutes.rem, 0.0);
        assert_eq!(sleep.total_minutes, 96.0);
    }

    #[test]
    fn test_sleep_buckets_by_session_start() {
        let mut input = MetricsInput::new(1);
        input.sleep = vec![SleepSession {
            start: "2024-01-14T23:00:00Z".to_string(),
            end: "2024-01-15T07:00:00Z".to_string(),
            stages: vec![segment("2024-01-14T23:00:00Z", "2024-01-15T07:00:00Z", "unknown")],
            source: SRC,
        }];

        let days = build_daily_metrics_ending(today(), &input);
        assert_eq!(days[0].sleep.total_minutes, 480.0);
        assert_eq!(days[0].sleep.stage_minutes.light, 480.0);
        assert_eq!(days[1].sleep.total_minutes, 0.0);
    }

    #[test]
    fn test_malformed_timestamps_are_excluded() {
        let mut input = MetricsInput::new(0);
        input.heart_rate = vec![hr("not-a-time", 90.0), hr("2024-01-15T08:00:00Z", 60.0)];
        input.sleep = vec![SleepSession {
            start: "2024-01-15T01:00:00Z".to_string(),
            end: "??".to_string(),
            stages: Vec::new(),
            source: SRC,
        }];
        input.workouts = vec![workout("2024-01-15T06:00:00Z", "", "Running", Some(100.0))];
        input.steps = vec![steps("15/01/2024", 500)];

        let days = build_daily_metrics_ending(today(), &input);
        let day = last(&days);
        assert_eq!(day.heart_rate.series, vec![60.0]);
        assert_eq!(day.sleep.total_minutes, 0.0);
        assert_eq!(day.calories, 0.0);
        assert!(day.workouts.is_empty());
        assert_eq!(day.steps, 0);
    }

    #[test]
    fn test_lexical_bucketing_keeps_local_date() {
        let mut input = MetricsInput::new(1);
        input.heart_rate = vec![hr("2024-01-14T23:30:00-05:00", 70.0)];

        let days = build_daily_metrics_ending(today(), &input);
        assert_eq!(days[0].heart_rate.series, vec![70.0]);

        let utc = Aggregator::new(AggregationConfig {
            bucketing: DayBucketing::Offset { minutes: 0 },
            ..Default::default()
        });
        let days = utc.build(today(), &input);
        assert!(days[0].heart_rate.series.is_empty());
        assert_eq!(days[1].heart_rate.series, vec![70.0]);
    }

    #[test]
    fn test_concurrent_windows_are_independent() {
        let mut input = MetricsInput::new(30);
        input.steps = vec![steps("2024-01-01", 4000), steps("2023-11-01", 7000)];
        let mut wide = input.clone();
        wide.days = 90;

        let (short, long) = std::thread::scope(|s| {
            let a = s.spawn(|| build_daily_metrics_ending(today(), &input));
            let b = s.spawn(|| build_daily_metrics_ending(today(), &wide));
            (a.join().unwrap(), b.join().unwrap())
        });

        assert_eq!(short.len(), 31);
        assert_eq!(long.len(), 91);
        assert_eq!(short.iter().map(|d| d.steps).sum::<u64>(), 4000);
        assert_eq!(long.iter().map(|d| d.steps).sum::<u64>(), 11000);
    }
}
