//! Provider payload adapters
//!
//! This module provides adapters that parse raw provider exports (Apple Health,
//! Health Connect) and map them to the provider-neutral record types the
//! aggregator consumes.

mod apple;
mod health_connect;

pub use apple::AppleHealthAdapter;
pub use health_connect::HealthConnectAdapter;

use crate::error::MetricsError;
use crate::types::{DataSource, ProviderSnapshot};

/// Trait for provider payload adapters
pub trait ProviderPayloadAdapter {
    /// Provider tag stamped on every parsed record
    fn source(&self) -> DataSource;

    /// Parse a raw JSON export into a snapshot of records
    fn parse(&self, raw_json: &str) -> Result<ProviderSnapshot, MetricsError>;
}

/// Adapter for a provider
pub fn adapter_for(source: DataSource) -> Box<dyn ProviderPayloadAdapter + Send + Sync> {
    match source {
        DataSource::Apple => Box::new(AppleHealthAdapter),
        DataSource::Google => Box::new(HealthConnectAdapter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_for_matches_source() {
        assert_eq!(adapter_for(DataSource::Apple).source(), DataSource::Apple);
        assert_eq!(adapter_for(DataSource::Google).source(), DataSource::Google);
    }

    #[test]
    fn test_empty_object_parses_for_every_provider() {
        for source in [DataSource::Apple, DataSource::Google] {
            let snapshot = adapter_for(source).parse("{}").unwrap();
            assert_eq!(snapshot, ProviderSnapshot::empty(source));
        }
    }
}
