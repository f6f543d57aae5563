//! Provider vocabulary mapping
//!
//! Translates provider-specific activity identifiers and sleep-stage codes into
//! the canonical enumerations. Unknown inputs never fail.

use crate::types::{SleepStage, WorkoutType};

/// Map a provider activity identifier to a canonical workout type.
///
/// Matching is case-insensitive and substring based; the first matching rule
/// wins, so "RunWalk" is a [`WorkoutType::Run`]. Only the exact words match:
/// "Cycling", "Hiking" and "biking" are unrecognized. Returns `None` when
/// nothing matches; such sessions still count toward daily totals.
pub fn map_workout_type(activity: &str) -> Option<WorkoutType> {
    let x = activity.to_lowercase();

    if x.contains("run") {
        Some(WorkoutType::Run)
    } else if x.contains("walk") || x.contains("hike") {
        Some(WorkoutType::Walk)
    } else if x.contains("cycle") || x.contains("bike") {
        Some(WorkoutType::Cycle)
    } else if x.contains("strength")
        || x.contains("functional")
        || x.contains("traditionalstrengthtraining")
    {
        Some(WorkoutType::Strength)
    } else {
        None
    }
}

/// Map a provider sleep-stage code to a canonical stage.
///
/// Exact match against HealthKit sleep-analysis values plus the lowercase
/// canonical names. Missing or unrecognized codes fall back to
/// [`SleepStage::Light`].
pub fn map_sleep_stage(code: Option<&str>) -> SleepStage {
    match code {
        Some("ASLEEPCORE") | Some("core") | Some("light") => SleepStage::Light,
        Some("ASLEEPDEEP") | Some("deep") => SleepStage::Deep,
        Some("ASLEEPREM") | Some("rem") => SleepStage::Rem,
        Some("INBED") | Some("AWAKE") | Some("awake") => SleepStage::Awake,
        _ => SleepStage::Light,
    }
}
