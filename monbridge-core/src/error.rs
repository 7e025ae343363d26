//! Error types for bridge operations

use thiserror::Error;

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised while resolving queries and assembling frames
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid statistic link in query {position} (refId '{ref_id}'): {message}")]
    StatisticLink {
        position: usize,
        ref_id: String,
        message: String,
    },

    #[error("Failed to fetch metrics for measurement {measurement_obid}: {source}")]
    MetricLookup {
        measurement_obid: i64,
        #[source]
        source: Box<BridgeError>,
    },

    #[error("Could not retrieve metrics: {0}")]
    DataFetch(#[source] Box<BridgeError>),

    #[error("Remote server error{}: {message}", http_status_suffix(.status))]
    Remote { status: Option<u16>, message: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Remote server unavailable: {0}")]
    ServerUnavailable(String),

    #[error("Time range error: {0}")]
    TimeRange(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

}

fn http_status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl BridgeError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a statistic link error for the query at `position`
    pub fn statistic_link<R: Into<String>, S: Into<String>>(
        position: usize,
        ref_id: R,
        message: S,
    ) -> Self {
        Self::StatisticLink {
            position,
            ref_id: ref_id.into(),
            message: message.into(),
        }
    }

    /// Wrap a catalogue lookup failure with the measurement it was for
    pub fn metric_lookup(measurement_obid: i64, source: BridgeError) -> Self {
        Self::MetricLookup {
            measurement_obid,
            source: Box::new(source),
        }
    }

    /// Wrap a raw-data retrieval failure
    pub fn data_fetch(source: BridgeError) -> Self {
        Self::DataFetch(Box::new(source))
    }

    /// Create a new remote error
    pub fn remote<S: Into<String>>(status: Option<u16>, message: S) -> Self {
        Self::Remote {
            status,
            message: message.into(),
        }
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(message: S) -> Self {
        Self::Connection(message.into())
    }

    /// Create a new server-unavailable error
    pub fn server_unavailable<S: Into<String>>(message: S) -> Self {
        Self::ServerUnavailable(message.into())
    }

    /// Get the error category for monitoring/metrics
    pub fn category(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "validation",
            BridgeError::StatisticLink { .. } => "validation",
            BridgeError::MetricLookup { .. } => "upstream",
            BridgeError::DataFetch(_) => "upstream",
            BridgeError::Remote { .. } => "upstream",
            BridgeError::Connection(_) => "upstream",
            BridgeError::ServerUnavailable(_) => "unavailable",
            BridgeError::TimeRange(_) => "validation",
            BridgeError::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_lookup_names_measurement() {
        let err = BridgeError::metric_lookup(4000, BridgeError::connection("refused"));
        let message = err.to_string();
        assert!(message.contains("4000"));
        assert!(message.contains("refused"));
        assert_eq!(err.category(), "upstream");
    }

    #[test]
    fn test_remote_error_display() {
        let err = BridgeError::remote(Some(404), "no such measurement");
        assert_eq!(
            err.to_string(),
            "Remote server error (HTTP 404): no such measurement"
        );

        let err = BridgeError::remote(None, "bad payload");
        assert_eq!(err.to_string(), "Remote server error: bad payload");
    }

    #[test]
    fn test_data_fetch_embeds_source() {
        let err = BridgeError::data_fetch(BridgeError::remote(Some(500), "boom"));
        assert!(err.to_string().contains("Could not retrieve metrics"));
        assert!(err.to_string().contains("boom"));
    }
}
