use monbridge_core::{
    assemble, normalize, BridgeError, BridgeResult, DataProvider, Frame, Metric, MetricCatalog,
    QueryRequest,
};
use serde::Serialize;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, error, info, warn};

use crate::{
    config::QueryConfig,
    metrics::{QueryMetricsCollector, QueryTimer},
    remote_client::RemoteClient,
    validity::{ServerStatus, ValidityGate, VersionSource},
};

/// Data source id used when the request does not name one
pub const DEFAULT_DATASOURCE_ID: &str = "default";

/// Frames grouped by the panel query they answer
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub results: BTreeMap<String, RefIdResult>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RefIdResult {
    pub frames: Vec<Frame>,
}

impl QueryResponse {
    /// Total number of frames across all panel queries
    pub fn frame_count(&self) -> usize {
        self.results.values().map(|r| r.frames.len()).sum()
    }
}

/// Result of a data source connectivity check
#[derive(Debug, Clone, Serialize)]
pub struct DatasourceCheck {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Runs the normalize → fetch → assemble pipeline for incoming requests
pub struct QueryEngine {
    config: Arc<QueryConfig>,
    catalog: Arc<dyn MetricCatalog>,
    provider: Arc<dyn DataProvider>,
    version_source: Arc<dyn VersionSource>,
    validity: Arc<ValidityGate>,
    metrics: QueryMetricsCollector,
}

impl QueryEngine {
    /// Create a query engine talking to the configured monitoring server
    pub fn new(config: Arc<QueryConfig>) -> BridgeResult<Self> {
        let client = Arc::new(RemoteClient::new(&config.remote)?);
        info!(base_url = %client.base_url(), "Remote client initialized");

        let validity = Arc::new(ValidityGate::new(&config.validity, &config.remote)?);

        Self::with_backends(config, client.clone(), client.clone(), client, validity)
    }

    /// Create a query engine over arbitrary collaborators and a validity
    /// gate that may be shared with other engines
    pub fn with_backends(
        config: Arc<QueryConfig>,
        catalog: Arc<dyn MetricCatalog>,
        provider: Arc<dyn DataProvider>,
        version_source: Arc<dyn VersionSource>,
        validity: Arc<ValidityGate>,
    ) -> BridgeResult<Self> {
        config
            .validate()
            .map_err(|e| BridgeError::Configuration(e.to_string()))?;

        Ok(Self {
            config,
            catalog,
            provider,
            version_source,
            validity,
            metrics: QueryMetricsCollector::new(),
        })
    }

    /// Execute a batch of panel queries
    pub async fn execute(&self, request: QueryRequest) -> BridgeResult<QueryResponse> {
        let timer = QueryTimer::start();

        match self.run_pipeline(request).await {
            Ok((response, expanded)) => {
                let elapsed = timer.elapsed();
                let frames = response.frame_count();
                self.metrics.record_query(
                    elapsed,
                    expanded,
                    frames,
                    self.config.metrics.slow_query_threshold_ms,
                );

                if elapsed.as_millis() as u64 > self.config.metrics.slow_query_threshold_ms {
                    warn!(?elapsed, expanded, frames, "Slow query request");
                } else {
                    info!(?elapsed, expanded, frames, "Query request completed");
                }
                Ok(response)
            }
            Err(err) => {
                self.metrics.record_error();
                error!(category = err.category(), "Query request failed: {}", err);
                Err(err)
            }
        }
    }

    async fn run_pipeline(&self, request: QueryRequest) -> BridgeResult<(QueryResponse, usize)> {
        request.validate_self()?;
        self.validate_query_limits(&request)?;

        let datasource_id = request
            .datasource_id
            .as_deref()
            .unwrap_or(DEFAULT_DATASOURCE_ID);
        let cached = self
            .validity
            .ensure_usable(datasource_id, self.version_source.as_ref())
            .await?;
        self.metrics.record_validity_check(cached);

        let mut results: BTreeMap<String, RefIdResult> = request
            .queries
            .iter()
            .map(|q| (q.ref_id.clone(), RefIdResult::default()))
            .collect();

        let normalized = normalize(request.queries, self.catalog.as_ref()).await?;
        let expanded = normalized.len();
        debug!(datasource_id, expanded, "Normalized panel queries");

        for query in &normalized {
            let frames = assemble(query, self.provider.as_ref()).await?;
            results
                .entry(query.ref_id.clone())
                .or_default()
                .frames
                .extend(frames);
        }

        Ok((QueryResponse { results }, expanded))
    }

    /// Metric catalogue of one measurement, for query editors
    pub async fn metric_catalogue(&self, measurement_obid: i64) -> BridgeResult<Vec<Metric>> {
        self.catalog
            .fetch_metrics_for_measurement(measurement_obid)
            .await
            .map_err(|err| BridgeError::metric_lookup(measurement_obid, err))
    }

    /// Check the data source against the server, refreshing its cached verdict
    pub async fn check_datasource(&self, datasource_id: &str) -> DatasourceCheck {
        self.validity.invalidate(datasource_id).await;
        self.metrics.record_validity_check(false);

        match self.validity.check(self.version_source.as_ref()).await {
            ServerStatus::Usable { version } => {
                self.validity.mark_usable(datasource_id).await;
                DatasourceCheck {
                    status: "ok",
                    message: format!("Monitoring server {} is supported", version),
                    version: Some(version),
                }
            }
            ServerStatus::Unusable { reason } => DatasourceCheck {
                status: "error",
                message: reason,
                version: None,
            },
        }
    }

    /// Validate query limits
    fn validate_query_limits(&self, request: &QueryRequest) -> BridgeResult<()> {
        if request.queries.len() > self.config.query.max_queries_per_request {
            return Err(BridgeError::validation(format!(
                "Too many queries in request: {} > {}",
                request.queries.len(),
                self.config.query.max_queries_per_request
            )));
        }

        for query in &request.queries {
            if query.time_range.duration_millis() > self.config.query.max_query_range_ms {
                return Err(BridgeError::validation(format!(
                    "Query '{}' time range too large: {} > {} ms",
                    query.ref_id,
                    query.time_range.duration_millis(),
                    self.config.query.max_query_range_ms
                )));
            }
        }

        Ok(())
    }

    pub fn metrics(&self) -> &QueryMetricsCollector {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use monbridge_core::{FetchDataOptions, MetricQuery, MetricSample, SeriesMap, TimeRange, Timestamp};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubServer {
        version: &'static str,
        version_calls: AtomicUsize,
        data_calls: AtomicUsize,
    }

    impl StubServer {
        fn new(version: &'static str) -> Arc<Self> {
            Arc::new(Self {
                version,
                version_calls: AtomicUsize::new(0),
                data_calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetricCatalog for StubServer {
        async fn fetch_metrics_for_measurement(&self, obid: i64) -> BridgeResult<Vec<Metric>> {
            Ok(vec![
                Metric::new(format!("SNMP_{}1", obid), "first"),
                Metric::new(format!("SNMP_{}2", obid), "second"),
            ])
        }
    }

    #[async_trait]
    impl DataProvider for StubServer {
        async fn fetch_data_for_metrics(&self, options: &FetchDataOptions) -> BridgeResult<SeriesMap> {
            self.data_calls.fetch_add(1, Ordering::SeqCst);
            Ok(options
                .metric_keys
                .iter()
                .map(|key| {
                    let sample = MetricSample::new(
                        Timestamp::from_millis(0).unwrap(),
                        None,
                        None,
                        Some(1.0),
                    );
                    (key.clone(), vec![sample])
                })
                .collect())
        }
    }

    #[async_trait]
    impl VersionSource for StubServer {
        async fn server_version(&self) -> BridgeResult<String> {
            self.version_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.version.to_string())
        }
    }

    fn gate(config: &QueryConfig) -> Arc<ValidityGate> {
        Arc::new(ValidityGate::new(&config.validity, &config.remote).unwrap())
    }

    fn engine_with(
        server: Arc<StubServer>,
        config: QueryConfig,
        validity: Arc<ValidityGate>,
    ) -> QueryEngine {
        QueryEngine::with_backends(
            Arc::new(config),
            server.clone(),
            server.clone(),
            server,
            validity,
        )
        .unwrap()
    }

    fn engine(server: Arc<StubServer>) -> QueryEngine {
        let config = QueryConfig::default();
        let validity = gate(&config);
        engine_with(server, config, validity)
    }

    fn request(queries: Vec<MetricQuery>) -> QueryRequest {
        QueryRequest {
            datasource_id: Some("ds-1".to_string()),
            queries,
        }
    }

    fn link_query(ref_id: &str, link: &str) -> MetricQuery {
        MetricQuery {
            ref_id: ref_id.to_string(),
            time_range: TimeRange::from_millis(0, 60_000).unwrap(),
            average_interval_ms: None,
            include_min_stats: false,
            include_max_stats: false,
            include_avg_stats: true,
            statistic_link: Some(link.to_string()),
            measurement_obid: None,
            metrics: vec![],
        }
    }

    #[tokio::test]
    async fn test_execute_groups_frames_by_ref_id() {
        let server = StubServer::new("5.0.0");
        let engine = engine(server.clone());

        let response = engine
            .execute(request(vec![
                link_query("A", "?0id=7&1id=8&1value0=82"),
                link_query("B", "?id=9&value=1"),
            ]))
            .await
            .unwrap();

        assert_eq!(response.results["A"].frames.len(), 3);
        assert_eq!(response.results["B"].frames.len(), 1);
        assert_eq!(response.frame_count(), 4);
        assert_eq!(server.data_calls.load(Ordering::SeqCst), 3);

        let snapshot = engine.metrics().snapshot();
        assert_eq!(snapshot.requests_total, 1);
        assert_eq!(snapshot.expanded_queries_total, 3);
        assert_eq!(snapshot.frames_returned_total, 4);
    }

    #[tokio::test]
    async fn test_ref_id_without_frames_still_reported() {
        let engine = engine(StubServer::new("5.0.0"));

        let response = engine
            .execute(request(vec![link_query("A", "?id=7&value=999")]))
            .await
            .unwrap();

        assert!(response.results["A"].frames.is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_server_blocks_queries() {
        let server = StubServer::new("0.1");
        let engine = engine(server.clone());

        let err = engine
            .execute(request(vec![link_query("A", "?id=7")]))
            .await
            .unwrap_err();

        assert_eq!(err.category(), "unavailable");
        assert_eq!(server.data_calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.metrics().snapshot().errors_total, 1);
    }

    #[tokio::test]
    async fn test_query_limits() {
        let engine = engine(StubServer::new("5.0.0"));

        let mut query = link_query("A", "?id=7");
        query.time_range = TimeRange::from_millis(0, 400 * 24 * 60 * 60 * 1000).unwrap();

        let err = engine.execute(request(vec![query])).await.unwrap_err();
        assert_eq!(err.category(), "validation");
    }

    #[tokio::test]
    async fn test_query_count_follows_configured_limit() {
        let mut config = QueryConfig::default();
        config.query.max_queries_per_request = 500;
        let validity = gate(&config);
        let engine = engine_with(StubServer::new("5.0.0"), config, validity);

        let queries = (0..150)
            .map(|i| link_query(&format!("Q{}", i), "?id=7&value=1"))
            .collect();
        let response = engine.execute(request(queries)).await.unwrap();
        assert_eq!(response.results.len(), 150);
        assert_eq!(response.frame_count(), 150);

        let mut config = QueryConfig::default();
        config.query.max_queries_per_request = 2;
        let validity = gate(&config);
        let engine = engine_with(StubServer::new("5.0.0"), config, validity);

        let queries = (0..3)
            .map(|i| link_query(&format!("Q{}", i), "?id=7"))
            .collect();
        let err = engine.execute(request(queries)).await.unwrap_err();
        assert_eq!(err.category(), "validation");
        assert!(err.to_string().contains("Too many queries in request: 3 > 2"));
    }

    #[tokio::test]
    async fn test_engines_share_injected_validity_gate() {
        let server = StubServer::new("5.0.0");
        let validity = gate(&QueryConfig::default());
        let first = engine_with(server.clone(), QueryConfig::default(), validity.clone());
        let second = engine_with(server.clone(), QueryConfig::default(), validity);

        first
            .execute(request(vec![link_query("A", "?id=7")]))
            .await
            .unwrap();
        second
            .execute(request(vec![link_query("A", "?id=7")]))
            .await
            .unwrap();

        assert_eq!(server.version_calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.metrics().snapshot().validity_cache_hits_total, 1);
    }

    #[tokio::test]
    async fn test_check_datasource() {
        let engine = engine(StubServer::new("2.3.4"));
        let check = engine.check_datasource("ds-1").await;
        assert_eq!(check.status, "ok");
        assert_eq!(check.version.as_deref(), Some("2.3.4"));

        let engine = self::engine(StubServer::new("0.9"));
        let check = engine.check_datasource("ds-1").await;
        assert_eq!(check.status, "error");
        assert!(check.version.is_none());
    }
}
