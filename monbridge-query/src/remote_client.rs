//! REST client for the monitoring server
//!
//! Implements the core collaborator traits over HTTP:
//!
//! - `GET  {base}/api/version`
//! - `GET  {base}/api/measurements/{obid}/metrics`
//! - `POST {base}/api/measurements/{obid}/data`

use async_trait::async_trait;
use monbridge_core::{
    BridgeError, BridgeResult, DataProvider, FetchDataOptions, Metric, MetricCatalog, SeriesMap,
};
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RemoteConfig;

/// Version report of the monitoring server
#[derive(Debug, Clone, Deserialize)]
pub struct ServerVersion {
    pub version: String,
}

/// Body of a raw data request
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DataRequestBody<'a> {
    metric_keys: &'a [String],
    start: i64,
    end: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    average_interval_ms: Option<u64>,
}

/// HTTP client bound to one monitoring server
#[derive(Clone)]
pub struct RemoteClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl RemoteClient {
    /// Build a client from configuration
    pub fn new(config: &RemoteConfig) -> BridgeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| BridgeError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the server for its version
    pub async fn fetch_version(&self) -> BridgeResult<ServerVersion> {
        let request = self.client.get(self.url("/api/version"));
        self.send_json(request).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_ref()),
            None => request,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> BridgeResult<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|e| BridgeError::connection(e.to_string()))?;

        let response = check_status(response).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::connection(e.to_string()))?;

        serde_json::from_slice(&body).map_err(|e| {
            BridgeError::remote(None, format!("Unexpected response payload: {}", e))
        })
    }
}

async fn check_status(response: Response) -> BridgeResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    warn!(%url, status = status.as_u16(), "Monitoring server returned an error");

    let message = if body.trim().is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        body
    };
    Err(BridgeError::remote(Some(status.as_u16()), message))
}

#[async_trait]
impl MetricCatalog for RemoteClient {
    async fn fetch_metrics_for_measurement(
        &self,
        measurement_obid: i64,
    ) -> BridgeResult<Vec<Metric>> {
        let request = self
            .client
            .get(self.url(&format!("/api/measurements/{}/metrics", measurement_obid)));
        let metrics: Vec<Metric> = self.send_json(request).await?;

        debug!(
            measurement_obid,
            metrics = metrics.len(),
            "Fetched measurement catalogue"
        );
        Ok(metrics)
    }
}

#[async_trait]
impl DataProvider for RemoteClient {
    async fn fetch_data_for_metrics(&self, options: &FetchDataOptions) -> BridgeResult<SeriesMap> {
        let body = DataRequestBody {
            metric_keys: &options.metric_keys,
            start: options.time_range.start.timestamp_millis(),
            end: options.time_range.end.timestamp_millis(),
            average_interval_ms: options.average_interval_ms,
        };

        let request = self
            .client
            .post(self.url(&format!(
                "/api/measurements/{}/data",
                options.measurement_obid
            )))
            .json(&body);
        let series: SeriesMap = self.send_json(request).await?;

        debug!(
            measurement_obid = options.measurement_obid,
            requested = options.metric_keys.len(),
            returned = series.len(),
            "Fetched raw series"
        );
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let config = RemoteConfig {
            base_url: "https://monitor.example/".to_string(),
            ..RemoteConfig::default()
        };
        let client = RemoteClient::new(&config).unwrap();

        assert_eq!(client.base_url(), "https://monitor.example");
        assert_eq!(
            client.url("/api/version"),
            "https://monitor.example/api/version"
        );
    }

    #[test]
    fn test_data_request_body_shape() {
        let keys = vec!["SNMP_1".to_string()];
        let body = DataRequestBody {
            metric_keys: &keys,
            start: 1000,
            end: 2000,
            average_interval_ms: None,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["metricKeys"][0], "SNMP_1");
        assert_eq!(json["start"], 1000);
        assert!(json.get("averageIntervalMs").is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_is_connection_error() {
        let config = RemoteConfig {
            // Reserved port, nothing listens there
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 2000,
            ..RemoteConfig::default()
        };
        let client = RemoteClient::new(&config).unwrap();

        let err = client.fetch_metrics_for_measurement(1).await.unwrap_err();
        assert!(matches!(err, BridgeError::Connection(_)));
    }
}
