//! Collaborator interfaces towards the monitoring server.
//!
//! The pipeline only needs two capabilities from the remote side: listing the
//! metric catalogue of a measurement, and fetching raw samples for a set of
//! metric keys. Each is its own single-method trait so that callers can plug
//! in a REST client in production and in-memory fakes in tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BridgeResult;
use crate::query::{Metric, MetricQuery};
use crate::series::SeriesMap;
use crate::time::TimeRange;

/// Metric catalogue lookup used when expanding statistic links
#[async_trait]
pub trait MetricCatalog: Send + Sync {
    /// List every metric of a measurement, in server order
    async fn fetch_metrics_for_measurement(&self, measurement_obid: i64)
        -> BridgeResult<Vec<Metric>>;
}

/// Raw sample retrieval used when assembling frames
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetch samples for the requested keys. Keys the server has no data for
    /// may be absent from the result.
    async fn fetch_data_for_metrics(&self, options: &FetchDataOptions) -> BridgeResult<SeriesMap>;
}

/// Parameters of one raw data request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchDataOptions {
    pub measurement_obid: i64,
    pub metric_keys: Vec<String>,
    pub time_range: TimeRange,
    pub average_interval_ms: Option<u64>,
}

impl FetchDataOptions {
    /// Build options from a normalized query
    pub fn from_query(measurement_obid: i64, query: &MetricQuery) -> Self {
        Self {
            measurement_obid,
            metric_keys: query.metric_keys(),
            time_range: query.time_range,
            average_interval_ms: query.average_interval_ms,
        }
    }
}
