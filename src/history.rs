//! Metrics history
//!
//! Caller-owned store of computed day summaries. Entries are unique by date
//! and kept in ascending date order, so the store can be persisted as JSON and
//! handed back on the next launch.

use crate::error::MetricsError;
use crate::types::DaySummary;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Day summaries keyed by date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsHistory {
    days: BTreeMap<NaiveDate, DaySummary>,
}

impl MetricsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything and keep only `days`. Later duplicates win.
    pub fn replace(&mut self, days: Vec<DaySummary>) {
        self.days.clear();
        self.merge(days);
    }

    /// Insert `days`, overwriting any stored summary with the same date
    pub fn merge(&mut self, days: Vec<DaySummary>) {
        for day in days {
            self.days.insert(day.date, day);
        }
    }

    /// Up to `n` most recent summaries, oldest first
    pub fn last_n_days(&self, n: usize) -> Vec<DaySummary> {
        let skip = self.days.len().saturating_sub(n);
        self.days.values().skip(skip).cloned().collect()
    }

    /// Most recent summary
    pub fn latest(&self) -> Option<&DaySummary> {
        self.days.values().next_back()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DaySummary> {
        self.days.get(&date)
    }

    pub fn clear(&mut self) {
        self.days.clear();
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// All summaries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &DaySummary> {
        self.days.values()
    }

    /// Serialize as a JSON array of summaries, oldest first
    pub fn to_json(&self) -> Result<String, MetricsError> {
        let days: Vec<&DaySummary> = self.days.values().collect();
        Ok(serde_json::to_string(&days)?)
    }

    /// Load from a JSON array of summaries
    pub fn from_json(json: &str) -> Result<Self, MetricsError> {
        let days: Vec<DaySummary> = serde_json::from_str(json)?;
        let mut history = Self::new();
        history.merge(days);
        Ok(history)
    }
}
