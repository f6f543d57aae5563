//! healthfold - Daily health metrics aggregation
//!
//! healthfold turns raw records from Apple Health and Android Health Connect
//! into one summary per calendar day for the dashboard's charts through a
//! deterministic pipeline: provider adaptation → daily aggregation → encoding.
//!
//! ## Modules
//!
//! - **Aggregation**: `build_daily_metrics` folds raw records into day summaries
//! - **Integrations**: payload adapters and per-provider sync controllers
//! - **History & Trends**: caller-owned day history and chart series built from it

pub mod adapters;
pub mod aggregator;
pub mod calendar;
pub mod config;
pub mod controller;
pub mod encoder;
pub mod error;
pub mod history;
pub mod mapping;
pub mod pipeline;
pub mod trends;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use aggregator::{build_daily_metrics, build_daily_metrics_ending, Aggregator};
pub use config::{AggregationConfig, DayBucketing};
pub use controller::{ConnectionStatus, HealthSource, ProviderController, SyncOutcome};
pub use error::{MetricsError, SourceError};
pub use history::MetricsHistory;
pub use mapping::{map_sleep_stage, map_workout_type};
pub use pipeline::{apple_to_daily_metrics, health_connect_to_daily_metrics, MetricsProcessor};
pub use types::{DataSource, DaySummary, MetricsInput, SleepStage, WorkoutType};

/// healthfold version embedded in all payloads
pub const HEALTHFOLD_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for payloads
pub const PRODUCER_NAME: &str = "healthfold";
