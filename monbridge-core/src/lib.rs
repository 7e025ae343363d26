//! # Monitoring Bridge Core Library
//!
//! Query resolution and series assembly shared by the bridge services.
//!
//! ## Pipeline
//!
//! - **Normalization**: panel queries, either a direct measurement selection
//!   or a legacy statistic link, are expanded into concrete per-measurement
//!   queries ([`normalizer::normalize`])
//! - **Retrieval**: raw samples are fetched through the [`DataProvider`]
//!   collaborator
//! - **Assembly**: samples are reshaped into named, column-oriented frames
//!   ([`frame::assemble`])
//!
//! The remote side is only reached through the [`MetricCatalog`] and
//! [`DataProvider`] traits; this crate performs no I/O of its own.

pub mod datasource;
pub mod error;
pub mod frame;
pub mod metric_filter;
pub mod normalizer;
pub mod query;
pub mod series;
pub mod statistic_link;
pub mod time;

// Re-export commonly used types
pub use datasource::{DataProvider, FetchDataOptions, MetricCatalog};
pub use error::{BridgeError, BridgeResult};
pub use frame::{assemble, Field, FieldValues, Frame};
pub use metric_filter::filter_metrics;
pub use normalizer::normalize;
pub use query::{Metric, MetricQuery, QueryRequest};
pub use series::{MetricDataSeries, MetricSample, SeriesMap};
pub use statistic_link::parse_statistic_link;
pub use time::{TimeRange, Timestamp};

/// Version information for the bridge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
