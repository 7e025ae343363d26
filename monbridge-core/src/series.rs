//! Raw time series samples as returned by the monitoring server

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::time::Timestamp;

/// One aggregated sample of a metric.
///
/// Statistic values are optional; a `None` means the server had no data for
/// that interval, which is distinct from a value of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSample {
    pub time: Timestamp,

    /// Length of the averaging interval this sample covers
    #[serde(default)]
    pub interval_ms: u64,

    #[serde(default)]
    pub min: Option<f64>,

    #[serde(default)]
    pub max: Option<f64>,

    #[serde(default)]
    pub avg: Option<f64>,
}

impl MetricSample {
    pub fn new(time: Timestamp, min: Option<f64>, max: Option<f64>, avg: Option<f64>) -> Self {
        Self {
            time,
            interval_ms: 0,
            min,
            max,
            avg,
        }
    }
}

/// Samples of one metric in server response order
pub type MetricDataSeries = Vec<MetricSample>;

/// Raw provider output keyed by metric key
pub type SeriesMap = HashMap<String, MetricDataSeries>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_values_stay_missing() {
        let sample: MetricSample = serde_json::from_str(
            r#"{"time": 1700000000000, "intervalMs": 60000, "min": null, "max": 0.0, "avg": 2.5}"#,
        )
        .unwrap();

        assert_eq!(sample.interval_ms, 60000);
        assert_eq!(sample.min, None);
        assert_eq!(sample.max, Some(0.0));
        assert_eq!(sample.avg, Some(2.5));
    }
}
