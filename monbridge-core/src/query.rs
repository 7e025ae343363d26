//! Panel query types exchanged with the dashboard front-end

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::error::{BridgeError, BridgeResult};
use crate::time::TimeRange;

/// A single metric of a measurement on the monitoring server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Stable server-side identifier, often a composite string such as `SNMP_12`
    pub key: String,

    /// Human readable name used to label the resulting frame
    #[serde(default)]
    pub name: String,
}

impl Metric {
    pub fn new<K: Into<String>, N: Into<String>>(key: K, name: N) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

/// Batch of panel queries sent by the front-end for one data source
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// Data source the queries target, used to key the server validity cache
    #[serde(default)]
    pub datasource_id: Option<String>,

    /// Queries to resolve; the upper bound is a service limit
    #[validate(length(min = 1, message = "at least one query is required"))]
    pub queries: Vec<MetricQuery>,
}

/// One panel query.
///
/// Either `statistic_link` or `measurement_obid` with `metrics` selects the
/// data. After normalization only the latter form remains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricQuery {
    /// Correlation identifier echoed back with the frames
    #[serde(default)]
    pub ref_id: String,

    pub time_range: TimeRange,

    /// Averaging interval requested from the server; `None` leaves it to the server
    #[serde(default)]
    pub average_interval_ms: Option<u64>,

    #[serde(default)]
    pub include_min_stats: bool,

    #[serde(default)]
    pub include_max_stats: bool,

    #[serde(default)]
    pub include_avg_stats: bool,

    /// Legacy chart link encoding one or more measurement selections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistic_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_obid: Option<i64>,

    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl MetricQuery {
    /// The statistic link, if one is set and non-blank
    pub fn link(&self) -> Option<&str> {
        self.statistic_link
            .as_deref()
            .map(str::trim)
            .filter(|link| !link.is_empty())
    }

    /// Keys of the selected metrics, in selection order
    pub fn metric_keys(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.key.clone()).collect()
    }

    /// Display name lookup by metric key
    pub fn display_names(&self) -> HashMap<&str, &str> {
        self.metrics
            .iter()
            .map(|m| (m.key.as_str(), m.name.as_str()))
            .collect()
    }

    /// Derive a concrete query for one measurement, keeping range and flags
    pub fn for_measurement(&self, measurement_obid: i64, metrics: Vec<Metric>) -> Self {
        Self {
            statistic_link: None,
            measurement_obid: Some(measurement_obid),
            metrics,
            ..self.clone()
        }
    }

    /// Validate the query
    pub fn validate_self(&self) -> BridgeResult<()> {
        self.time_range.validate()?;

        if self.average_interval_ms == Some(0) {
            return Err(BridgeError::validation(
                "Average interval must be greater than 0",
            ));
        }

        Ok(())
    }
}

impl QueryRequest {
    /// Validate the query request
    pub fn validate_self(&self) -> BridgeResult<()> {
        self.validate().map_err(|e| {
            let problems: Vec<String> = e
                .field_errors()
                .into_iter()
                .flat_map(|(field, errors)| {
                    errors.iter().map(move |err| match &err.message {
                        Some(message) => format!("{}: {}", field, message),
                        None => format!("{}: {}", field, err.code),
                    })
                })
                .collect();
            BridgeError::validation(format!("Invalid query: {}", problems.join(", ")))
        })?;

        for query in &self.queries {
            query.validate_self()?;
        }

        Ok(())
    }
}
