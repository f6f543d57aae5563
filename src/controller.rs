//! Provider controller
//!
//! Drives one health data provider through authorization and sync. A sync
//! reads the seven record kinds concurrently, tolerates failures of the
//! supplementary reads, then runs the aggregator once over the result.

use crate::adapters::adapter_for;
use crate::aggregator::Aggregator;
use crate::config::validate_window;
use crate::error::{MetricsError, SourceError};
use crate::types::{
    ActiveEnergyRecord, DataSource, DaySummary, ExerciseMinutesRecord, HeartRateSample,
    ProviderSnapshot, SleepSession, StepRecord, WeightSample, WorkoutSession,
};
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Default sync window in days
pub const DEFAULT_SYNC_DAYS: u32 = 90;

/// Half-open UTC time range `[start, end)` handed to provider reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Range covering the calendar days `today - days` through `today`
    pub fn for_window(today: NaiveDate, days: u32) -> Self {
        let first = today
            .checked_sub_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        let after = today.succ_opt().unwrap_or(today);
        Self {
            start: first.and_time(NaiveTime::MIN).and_utc(),
            end: after.and_time(NaiveTime::MIN).and_utc(),
        }
    }
}

/// A health data provider the controller can read from
pub trait HealthSource: Send + Sync {
    fn provider(&self) -> DataSource;

    /// Request read permissions
    fn authorize(&self) -> Result<(), SourceError>;

    fn read_steps(&self, range: &TimeRange) -> Result<Vec<StepRecord>, SourceError>;
    fn read_heart_rate(&self, range: &TimeRange) -> Result<Vec<HeartRateSample>, SourceError>;
    fn read_sleep(&self, range: &TimeRange) -> Result<Vec<SleepSession>, SourceError>;
    fn read_workouts(&self, range: &TimeRange) -> Result<Vec<WorkoutSession>, SourceError>;
    fn read_active_energy(
        &self,
        range: &TimeRange,
    ) -> Result<Vec<ActiveEnergyRecord>, SourceError>;
    fn read_exercise_minutes(
        &self,
        range: &TimeRange,
    ) -> Result<Vec<ExerciseMinutesRecord>, SourceError>;
    fn read_weight(&self, range: &TimeRange) -> Result<Vec<WeightSample>, SourceError>;
}

/// Source serving a snapshot already read or parsed from an export.
///
/// Every read returns the full collection; the aggregator drops records
/// outside the window.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: ProviderSnapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: ProviderSnapshot) -> Self {
        Self { snapshot }
    }

    /// Parse a raw provider export with the provider's adapter
    pub fn from_json(source: DataSource, raw_json: &str) -> Result<Self, MetricsError> {
        Ok(Self::new(adapter_for(source).parse(raw_json)?))
    }
}

impl HealthSource for SnapshotSource {
    fn provider(&self) -> DataSource {
        self.snapshot.source
    }

    fn authorize(&self) -> Result<(), SourceError> {
        Ok(())
    }

    fn read_steps(&self, _: &TimeRange) -> Result<Vec<StepRecord>, SourceError> {
        Ok(self.snapshot.steps.clone())
    }

    fn read_heart_rate(&self, _: &TimeRange) -> Result<Vec<HeartRateSample>, SourceError> {
        Ok(self.snapshot.heart_rate.clone())
    }

    fn read_sleep(&self, _: &TimeRange) -> Result<Vec<SleepSession>, SourceError> {
        Ok(self.snapshot.sleep.clone())
    }

    fn read_workouts(&self, _: &TimeRange) -> Result<Vec<WorkoutSession>, SourceError> {
        Ok(self.snapshot.workouts.clone())
    }

    fn read_active_energy(&self, _: &TimeRange) -> Result<Vec<ActiveEnergyRecord>, SourceError> {
        Ok(self.snapshot.active_energy.clone())
    }

    fn read_exercise_minutes(
        &self,
        _: &TimeRange,
    ) -> Result<Vec<ExerciseMinutesRecord>, SourceError> {
        Ok(self.snapshot.exercise_minutes.clone())
    }

    fn read_weight(&self, _: &TimeRange) -> Result<Vec<WeightSample>, SourceError> {
        Ok(self.snapshot.weight.clone())
    }
}

/// Connection state shown next to a provider toggle
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "lowercase")]
pub enum ConnectionStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Error(String),
}

/// Result of a successful sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub provider: DataSource,
    pub days: Vec<DaySummary>,
    /// Weight readings are not part of a day summary; they feed the weight trend
    pub weights: Vec<WeightSample>,
    pub synced_at: DateTime<Utc>,
}

/// Controller for one provider integration
pub struct ProviderController<S: HealthSource> {
    source: S,
    aggregator: Aggregator,
    enabled: bool,
    status: ConnectionStatus,
    last_sync: Option<DateTime<Utc>>,
}

impl<S: HealthSource> ProviderController<S> {
    pub fn new(source: S) -> Self {
        Self::with_aggregator(source, Aggregator::default())
    }

    pub fn with_aggregator(source: S, aggregator: Aggregator) -> Self {
        Self {
            source,
            aggregator,
            enabled: false,
            status: ConnectionStatus::Idle,
            last_sync: None,
        }
    }

    pub fn provider(&self) -> DataSource {
        self.source.provider()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn status(&self) -> &ConnectionStatus {
        &self.status
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Request permissions. The status stays `Connecting` until a sync succeeds.
    pub fn connect(&mut self) -> Result<(), MetricsError> {
        self.status = ConnectionStatus::Connecting;
        match self.source.authorize() {
            Ok(()) => {
                info!(provider = self.provider().as_str(), "authorized");
                Ok(())
            }
            Err(e) => {
                self.fail(&e);
                Err(e.into())
            }
        }
    }

    /// Sync a window ending on the current local day
    pub fn sync(&mut self, days: u32) -> Result<SyncOutcome, MetricsError> {
        self.sync_ending(Local::now().date_naive(), days)
    }

    /// Read the window `today - days ..= today` and aggregate it
    pub fn sync_ending(&mut self, today: NaiveDate, days: u32) -> Result<SyncOutcome, MetricsError> {
        validate_window(days)?;
        let range = TimeRange::for_window(today, days);

        let mut snapshot = match self.read_all(&range) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.fail(&e);
                return Err(e.into());
            }
        };

        let weights = std::mem::take(&mut snapshot.weight);
        let summaries = self.aggregator.build(today, &snapshot.into_input(days));
        let synced_at = Utc::now();

        self.status = ConnectionStatus::Connected;
        self.last_sync = Some(synced_at);
        info!(
            provider = self.provider().as_str(),
            days = summaries.len(),
            "sync complete"
        );

        Ok(SyncOutcome {
            provider: self.provider(),
            days: summaries,
            weights,
            synced_at,
        })
    }

    /// Turn the integration on (connect, then sync) or off.
    ///
    /// Disabling returns `None` and leaves stored data to the caller.
    pub fn toggle(&mut self, enable: bool, days: u32) -> Result<Option<SyncOutcome>, MetricsError> {
        if !enable {
            self.enabled = false;
            self.status = ConnectionStatus::Idle;
            return Ok(None);
        }

        self.enabled = true;
        self.connect()?;
        self.sync(days).map(Some)
    }

    fn fail(&mut self, e: &SourceError) {
        error!(provider = self.provider().as_str(), error = %e, "provider sync failed");
        self.enabled = false;
        self.status = ConnectionStatus::Error(e.to_string());
    }

    /// Issue the seven reads concurrently.
    ///
    /// Steps, heart rate, sleep and workouts are required; the rest fall back
    /// to empty collections.
    fn read_all(&self, range: &TimeRange) -> Result<ProviderSnapshot, SourceError> {
        let source = &self.source;
        let provider = source.provider();

        let mut steps = Ok(Vec::new());
        let mut heart_rate = Ok(Vec::new());
        let mut sleep = Ok(Vec::new());
        let mut workouts = Ok(Vec::new());
        let mut active_energy = Ok(Vec::new());
        let mut exercise_minutes = Ok(Vec::new());
        let mut weight = Ok(Vec::new());

        rayon::scope(|s| {
            s.spawn(|_| steps = source.read_steps(range));
            s.spawn(|_| heart_rate = source.read_heart_rate(range));
            s.spawn(|_| sleep = source.read_sleep(range));
            s.spawn(|_| workouts = source.read_workouts(range));
            s.spawn(|_| active_energy = source.read_active_energy(range));
            s.spawn(|_| exercise_minutes = source.read_exercise_minutes(range));
            s.spawn(|_| weight = source.read_weight(range));
        });

        Ok(ProviderSnapshot {
            source: provider,
            steps: steps?,
            heart_rate: heart_rate?,
            sleep: sleep?,
            workouts: workouts?,
            active_energy: optional(provider, "active energy", active_energy),
            exercise_minutes: optional(provider, "exercise minutes", exercise_minutes),
            weight: optional(provider, "weight", weight),
        })
    }
}

fn optional<T>(provider: DataSource, kind: &str, result: Result<Vec<T>, SourceError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(provider = provider.as_str(), kind, error = %e, "optional read failed, using empty");
        Vec::new()
    })
}
