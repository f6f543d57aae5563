//! Trend series
//!
//! Turns stored day summaries into chart-ready series: per-metric daily
//! values, optional weekly grouping, summary statistics and the weekly
//! workout goal card.

use crate::calendar::{parse_day, DayWindow};
use crate::types::{DaySummary, WeightSample};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weight used when no reading exists at or before the window
pub const DEFAULT_WEIGHT_KG: f64 = 72.5;

const WEEK_DAYS: usize = 7;

/// Metric a trend is drawn for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendMetric {
    Steps,
    /// Active minutes
    Active,
    /// Sleep duration in hours
    Sleep,
    /// Resting heart-rate proxy
    Heart,
    Calories,
    Weight,
}

impl TrendMetric {
    pub fn unit(&self) -> &'static str {
        match self {
            TrendMetric::Steps => "steps",
            TrendMetric::Active => "min",
            TrendMetric::Sleep => "h",
            TrendMetric::Heart => "bpm",
            TrendMetric::Calories => "kcal",
            TrendMetric::Weight => "kg",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TrendMetric::Steps => "Steps",
            TrendMetric::Active => "Active minutes",
            TrendMetric::Sleep => "Sleep duration",
            TrendMetric::Heart => "Resting heart rate",
            TrendMetric::Calories => "Calories",
            TrendMetric::Weight => "Weight",
        }
    }

    /// Whether weekly grouping sums (true) or averages (false)
    pub fn is_cumulative(&self) -> bool {
        matches!(
            self,
            TrendMetric::Steps | TrendMetric::Active | TrendMetric::Calories
        )
    }

    /// Value of this metric for one day. Weight is not part of a day summary.
    pub fn value_of(&self, day: &DaySummary) -> f64 {
        match self {
            TrendMetric::Steps => day.steps as f64,
            TrendMetric::Active => day.active_minutes,
            TrendMetric::Sleep => day.sleep.total_minutes / 60.0,
            TrendMetric::Heart => f64::from(day.heart_rate.resting_proxy),
            TrendMetric::Calories => day.calories,
            TrendMetric::Weight => 0.0,
        }
    }
}

/// Lookback window of a trend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrendRange {
    #[default]
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "90d")]
    Quarter,
}

impl TrendRange {
    /// Number of days covered
    pub fn len(&self) -> usize {
        match self {
            TrendRange::Week => 7,
            TrendRange::Month => 30,
            TrendRange::Quarter => 90,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendGrouping {
    #[default]
    Daily,
    Weekly,
}

/// What to draw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendQuery {
    pub metric: TrendMetric,
    #[serde(default)]
    pub range: TrendRange,
    #[serde(default)]
    pub grouping: TrendGrouping,
    /// Weight assumed before the first reading
    #[serde(default = "default_weight")]
    pub fallback_weight_kg: f64,
}

fn default_weight() -> f64 {
    DEFAULT_WEIGHT_KG
}

impl TrendQuery {
    pub fn new(metric: TrendMetric, range: TrendRange, grouping: TrendGrouping) -> Self {
        Self {
            metric,
            range,
            grouping,
            fallback_weight_kg: DEFAULT_WEIGHT_KG,
        }
    }
}

/// Value and position of an extreme
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Extreme {
    pub value: f64,
    pub index: usize,
}

/// Summary statistics over a series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendStats {
    pub avg: f64,
    pub min: Extreme,
    pub max: Extreme,
    /// Change of the second-half mean over the first-half mean, in percent
    pub delta_pct: f64,
}

impl TrendStats {
    /// Statistics for `values`; all zero for an empty series.
    ///
    /// The first occurrence wins ties for min and max.
    pub fn compute(values: &[f64]) -> Self {
        let Some(&first) = values.first() else {
            return Self::default();
        };

        let mut min = Extreme { value: first, index: 0 };
        let mut max = min;
        for (index, &value) in values.iter().enumerate() {
            if value < min.value {
                min = Extreme { value, index };
            }
            if value > max.value {
                max = Extreme { value, index };
            }
        }

        let half = (values.len() / 2).max(1);
        let prev = mean(&values[..half]);
        let curr = mean(&values[values.len() - half..]);
        let delta_pct = if prev > 0.0 {
            (curr - prev) / prev * 100.0
        } else {
            0.0
        };

        Self {
            avg: mean(values),
            min,
            max,
            delta_pct,
        }
    }
}

/// Chart-ready trend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub metric: TrendMetric,
    /// One "Jan 5" style label per value, oldest first
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub unit: String,
    pub stats: TrendStats,
}

/// One value per day for the `len` days ending `today`.
///
/// Days without a summary read as 0.
pub fn metric_series(
    days: &[DaySummary],
    metric: TrendMetric,
    today: NaiveDate,
    len: usize,
) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    let window = DayWindow::ending(today, (len - 1) as u32);
    let mut values = vec![0.0; window.len()];
    for day in days {
        if let Some(i) = window.index_of(day.date) {
            values[i] = metric.value_of(day);
        }
    }
    values
}

/// Daily weight for the `len` days ending `today`, one decimal place.
///
/// Each day carries the latest reading at or before it. Days before the first
/// reading use `fallback_kg`.
pub fn weight_series(
    samples: &[WeightSample],
    today: NaiveDate,
    len: usize,
    fallback_kg: f64,
) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    let window = DayWindow::ending(today, (len - 1) as u32);

    let mut readings: Vec<(NaiveDate, &str, f64)> = samples
        .iter()
        .filter_map(|s| parse_day(&s.timestamp).map(|d| (d, s.timestamp.as_str(), s.kg)))
        .collect();
    readings.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));

    let mut last = readings
        .iter()
        .filter(|(d, _, _)| *d < window.start())
        .last()
        .map(|r| r.2)
        .unwrap_or(fallback_kg);

    let mut by_day: HashMap<NaiveDate, f64> = HashMap::new();
    for (d, _, kg) in &readings {
        by_day.insert(*d, *kg);
    }

    window
        .days()
        .map(|d| {
            if let Some(kg) = by_day.get(&d) {
                last = *kg;
            }
            round_to(last, 1)
        })
        .collect()
}

/// Fold a daily series into chunks of seven, two decimal places.
///
/// Cumulative metrics are summed, the rest averaged. A short trailing chunk
/// is kept.
pub fn group_weekly(values: &[f64], metric: TrendMetric) -> Vec<f64> {
    values
        .chunks(WEEK_DAYS)
        .map(|chunk| {
            let sum: f64 = chunk.iter().sum();
            let v = if metric.is_cumulative() {
                sum
            } else {
                sum / chunk.len() as f64
            };
            round_to(v, 2)
        })
        .collect()
}

/// Labels for `n` points ending `today`, a day or a week apart
pub fn trend_labels(n: usize, grouping: TrendGrouping, today: NaiveDate) -> Vec<String> {
    let step = match grouping {
        TrendGrouping::Daily => 1,
        TrendGrouping::Weekly => WEEK_DAYS as i64,
    };
    (0..n)
        .rev()
        .map(|i| {
            let d = today - Duration::days(i as i64 * step);
            d.format("%b %-d").to_string()
        })
        .collect()
}

/// Build the trend for `query` from stored summaries and weight readings
pub fn build_trend(
    days: &[DaySummary],
    weights: &[WeightSample],
    query: &TrendQuery,
    today: NaiveDate,
) -> TrendReport {
    let len = query.range.len();
    let daily = match query.metric {
        TrendMetric::Weight => weight_series(weights, today, len, query.fallback_weight_kg),
        metric => metric_series(days, metric, today, len),
    };
    let values = match query.grouping {
        TrendGrouping::Daily => daily,
        TrendGrouping::Weekly => group_weekly(&daily, query.metric),
    };

    TrendReport {
        metric: query.metric,
        labels: trend_labels(values.len(), query.grouping, today),
        stats: TrendStats::compute(&values),
        unit: query.metric.unit().to_string(),
        values,
    }
}

/// One day of the weekly workout card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutDayPoint {
    pub date: NaiveDate,
    pub minutes: f64,
    pub sessions: usize,
    pub calories: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTotals {
    pub minutes: f64,
    pub sessions: usize,
    pub calories: f64,
}

/// Itemized workouts of the Monday-start week containing a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutWeekSummary {
    pub week_start: NaiveDate,
    /// Monday through Sunday
    pub points: Vec<WorkoutDayPoint>,
    pub totals: WorkoutTotals,
    pub goal_minutes: f64,
    /// Share of the goal reached, clamped to [0, 1]
    pub progress: f64,
    pub remaining_minutes: f64,
}

impl WorkoutWeekSummary {
    pub fn for_week(days: &[DaySummary], today: NaiveDate, goal_minutes: f64) -> Self {
        let week_start = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));

        let points: Vec<WorkoutDayPoint> = week_start
            .iter_days()
            .take(WEEK_DAYS)
            .map(|date| {
                let workouts = days
                    .iter()
                    .find(|d| d.date == date)
                    .map(|d| d.workouts.as_slice())
                    .unwrap_or_default();
                WorkoutDayPoint {
                    date,
                    minutes: workouts.iter().map(|w| w.duration_minutes).sum(),
                    sessions: workouts.len(),
                    calories: workouts.iter().map(|w| w.calories).sum(),
                }
            })
            .collect();

        let totals = points.iter().fold(WorkoutTotals::default(), |acc, p| WorkoutTotals {
            minutes: acc.minutes + p.minutes,
            sessions: acc.sessions + p.sessions,
            calories: acc.calories + p.calories,
        });

        let goal_minutes = goal_minutes.max(0.0);
        let progress = (totals.minutes / goal_minutes.max(1.0)).clamp(0.0, 1.0);
        let remaining_minutes = (goal_minutes - totals.minutes).max(0.0);

        Self {
            week_start,
            points,
            totals,
            goal_minutes,
            progress,
            remaining_minutes,
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
