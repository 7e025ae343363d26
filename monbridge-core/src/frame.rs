//! Column-oriented frames for chart rendering and the assembler producing them

use serde::Serialize;
use tracing::debug;

use crate::datasource::{DataProvider, FetchDataOptions};
use crate::error::{BridgeError, BridgeResult};
use crate::query::MetricQuery;
use crate::series::{MetricDataSeries, MetricSample};
use crate::time::Timestamp;

pub const TIME_FIELD: &str = "Time";
pub const MIN_FIELD: &str = "Min";
pub const MAX_FIELD: &str = "Max";
pub const AVG_FIELD: &str = "Avg";

/// Named table with a leading time column, one row per sample
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub name: String,

    /// Panel query this frame answers
    pub ref_id: String,

    pub fields: Vec<Field>,
}

/// One column of a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub values: FieldValues,
}

/// Column storage. Missing statistic values are NaN, which serializes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum FieldValues {
    Time(Vec<Timestamp>),
    Float64(Vec<f64>),
}

/// Statistic column selectable through the include flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Statistic {
    Min,
    Max,
    Avg,
}

impl Statistic {
    fn field_name(self) -> &'static str {
        match self {
            Statistic::Min => MIN_FIELD,
            Statistic::Max => MAX_FIELD,
            Statistic::Avg => AVG_FIELD,
        }
    }

    fn value(self, sample: &MetricSample) -> f64 {
        let value = match self {
            Statistic::Min => sample.min,
            Statistic::Max => sample.max,
            Statistic::Avg => sample.avg,
        };
        value.unwrap_or(f64::NAN)
    }
}

/// Statistic columns enabled on a query, in fixed Min, Max, Avg order
fn selected_statistics(query: &MetricQuery) -> Vec<Statistic> {
    [
        (query.include_min_stats, Statistic::Min),
        (query.include_max_stats, Statistic::Max),
        (query.include_avg_stats, Statistic::Avg),
    ]
    .into_iter()
    .filter_map(|(enabled, statistic)| enabled.then_some(statistic))
    .collect()
}

impl Frame {
    /// Build a frame from one series, keeping sample order
    pub fn from_series(
        name: impl Into<String>,
        query: &MetricQuery,
        series: &MetricDataSeries,
    ) -> Self {
        let mut fields = Vec::with_capacity(4);
        fields.push(Field {
            name: TIME_FIELD.to_string(),
            values: FieldValues::Time(series.iter().map(|s| s.time).collect()),
        });

        for statistic in selected_statistics(query) {
            fields.push(Field {
                name: statistic.field_name().to_string(),
                values: FieldValues::Float64(
                    series.iter().map(|s| statistic.value(s)).collect(),
                ),
            });
        }

        Self {
            name: name.into(),
            ref_id: query.ref_id.clone(),
            fields,
        }
    }

    /// Number of rows in the frame
    pub fn len(&self) -> usize {
        self.fields.first().map_or(0, |f| f.values.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Column names in order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl FieldValues {
    pub fn len(&self) -> usize {
        match self {
            FieldValues::Time(values) => values.len(),
            FieldValues::Float64(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            FieldValues::Float64(values) => Some(values),
            FieldValues::Time(_) => None,
        }
    }

    pub fn as_time(&self) -> Option<&[Timestamp]> {
        match self {
            FieldValues::Time(values) => Some(values),
            FieldValues::Float64(_) => None,
        }
    }
}

/// Fetch the raw series of a normalized query and reshape them into frames.
///
/// Frames come out ordered by metric key so the result does not depend on
/// the provider's map ordering. A provider failure aborts with no frames.
pub async fn assemble(
    query: &MetricQuery,
    provider: &dyn DataProvider,
) -> BridgeResult<Vec<Frame>> {
    let measurement_obid = query.measurement_obid.ok_or_else(|| {
        BridgeError::validation(format!(
            "Query '{}' has no measurement; normalize it before assembling",
            query.ref_id
        ))
    })?;

    let options = FetchDataOptions::from_query(measurement_obid, query);
    let series = provider
        .fetch_data_for_metrics(&options)
        .await
        .map_err(BridgeError::data_fetch)?;

    let mut keys: Vec<&String> = series.keys().collect();
    keys.sort();

    let names = query.display_names();
    let frames: Vec<Frame> = keys
        .into_iter()
        .map(|key| {
            let name = names
                .get(key.as_str())
                .copied()
                .filter(|name| !name.is_empty())
                .unwrap_or(key.as_str());
            Frame::from_series(name, query, &series[key])
        })
        .collect();

    debug!(
        measurement_obid,
        ref_id = %query.ref_id,
        frames = frames.len(),
        "Assembled frames"
    );

    Ok(frames)
}
