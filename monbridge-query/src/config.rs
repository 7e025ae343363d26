use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;

/// Configuration for the query service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Address to bind the HTTP server to
    pub bind_address: String,

    /// Monitoring server connection
    pub remote: RemoteConfig,

    /// Server validity gate
    pub validity: ValidityConfig,

    /// Query limits and settings
    pub query: QueryLimitsConfig,

    /// Metrics and monitoring configuration
    pub metrics: MetricsConfig,
}

/// Monitoring server connection configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the monitoring server REST API
    pub base_url: String,

    /// Username for basic authentication
    pub username: Option<String>,

    /// Password for basic authentication
    pub password: Option<String>,

    /// Request timeout in milliseconds
    pub timeout_ms: u64,

    /// Accept self-signed or otherwise invalid TLS certificates
    pub accept_invalid_certs: bool,

    /// Oldest server version the bridge can talk to
    pub min_version: String,
}

/// Server validity cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidityConfig {
    /// How long a validity verdict is reused, in seconds
    pub cache_ttl_seconds: u64,

    /// Maximum number of data sources tracked
    pub max_datasources: u64,
}

/// Query limits and configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLimitsConfig {
    /// Maximum number of panel queries per request
    pub max_queries_per_request: usize,

    /// Maximum query time range in milliseconds
    pub max_query_range_ms: i64,
}

/// Metrics and monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics endpoint
    pub enable_prometheus: bool,

    /// Slow query threshold in milliseconds
    pub slow_query_threshold_ms: u64,
}

// Keeps the password out of the startup log
impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout_ms", &self.timeout_ms)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("min_version", &self.min_version)
            .finish()
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8090".to_string(),
            remote: RemoteConfig::default(),
            validity: ValidityConfig::default(),
            query: QueryLimitsConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            username: None,
            password: None,
            timeout_ms: 30000,
            accept_invalid_certs: false,
            min_version: "1.0.0".to_string(),
        }
    }
}

impl Default for ValidityConfig {
    fn default() -> Self {
        Self {
            cache_ttl_seconds: 300, // 5 minutes
            max_datasources: 1000,
        }
    }
}

impl Default for QueryLimitsConfig {
    fn default() -> Self {
        Self {
            max_queries_per_request: 100,
            max_query_range_ms: 366 * 24 * 60 * 60 * 1000, // 1 year
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enable_prometheus: true,
            slow_query_threshold_ms: 1000, // 1 second
        }
    }
}

impl QueryConfig {
    /// Load configuration from environment variables and defaults
    pub fn load() -> Result<Self> {
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration, resolving `MONBRIDGE_*` variables through `lookup`
    pub fn load_from<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        // Override with environment variables if present
        if let Some(bind_addr) = lookup("MONBRIDGE_BIND_ADDRESS") {
            config.bind_address = bind_addr;
        }

        if let Some(base_url) = lookup("MONBRIDGE_REMOTE_URL") {
            config.remote.base_url = base_url.trim_end_matches('/').to_string();
        }

        if let Some(username) = lookup("MONBRIDGE_REMOTE_USERNAME") {
            config.remote.username = Some(username);
        }

        if let Some(password) = lookup("MONBRIDGE_REMOTE_PASSWORD") {
            config.remote.password = Some(password);
        }

        if let Some(timeout) = lookup("MONBRIDGE_REMOTE_TIMEOUT_MS") {
            config.remote.timeout_ms = timeout.parse()?;
        }

        if let Some(insecure) = lookup("MONBRIDGE_REMOTE_ACCEPT_INVALID_CERTS") {
            config.remote.accept_invalid_certs = insecure.parse()?;
        }

        if let Some(min_version) = lookup("MONBRIDGE_REMOTE_MIN_VERSION") {
            config.remote.min_version = min_version;
        }

        if let Some(ttl) = lookup("MONBRIDGE_VALIDITY_TTL_SECONDS") {
            config.validity.cache_ttl_seconds = ttl.parse()?;
        }

        if let Some(max_datasources) = lookup("MONBRIDGE_VALIDITY_MAX_DATASOURCES") {
            config.validity.max_datasources = max_datasources.parse()?;
        }

        if let Some(max_queries) = lookup("MONBRIDGE_MAX_QUERIES_PER_REQUEST") {
            config.query.max_queries_per_request = max_queries.parse()?;
        }

        if let Some(max_range) = lookup("MONBRIDGE_MAX_QUERY_RANGE_MS") {
            config.query.max_query_range_ms = max_range.parse()?;
        }

        if let Some(enabled) = lookup("MONBRIDGE_ENABLE_PROMETHEUS") {
            config.metrics.enable_prometheus = enabled.parse()?;
        }

        if let Some(threshold) = lookup("MONBRIDGE_SLOW_QUERY_THRESHOLD_MS") {
            config.metrics.slow_query_threshold_ms = threshold.parse()?;
        }

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.remote.base_url.is_empty() {
            return Err(anyhow::anyhow!("Remote server URL is required"));
        }

        if !self.remote.base_url.starts_with("http://")
            && !self.remote.base_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "Remote server URL must start with http:// or https://"
            ));
        }

        if self.remote.username.is_some() != self.remote.password.is_some() {
            return Err(anyhow::anyhow!(
                "Remote username and password must be set together"
            ));
        }

        if self.remote.timeout_ms == 0 {
            return Err(anyhow::anyhow!("Remote timeout must be greater than 0"));
        }

        if crate::validity::parse_version(&self.remote.min_version).is_none() {
            return Err(anyhow::anyhow!(
                "Minimum server version '{}' is not a dotted version number",
                self.remote.min_version
            ));
        }

        if self.validity.max_datasources == 0 {
            return Err(anyhow::anyhow!("Validity cache size must be greater than 0"));
        }

        if self.query.max_queries_per_request == 0 {
            return Err(anyhow::anyhow!(
                "Max queries per request must be greater than 0"
            ));
        }

        if self.query.max_query_range_ms <= 0 {
            return Err(anyhow::anyhow!("Max query range must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_is_valid() {
        assert!(QueryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_remote_settings() {
        let mut config = QueryConfig::default();
        config.remote.base_url = "monitor.local".to_string();
        assert!(config.validate().is_err());

        let mut config = QueryConfig::default();
        config.remote.username = Some("admin".to_string());
        assert!(config.validate().is_err());

        let mut config = QueryConfig::default();
        config.remote.min_version = "latest".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_environment() {
        let vars = HashMap::from([
            ("MONBRIDGE_REMOTE_URL", "https://monitor.local/"),
            ("MONBRIDGE_VALIDITY_MAX_DATASOURCES", "16"),
            ("MONBRIDGE_MAX_QUERIES_PER_REQUEST", "500"),
            ("MONBRIDGE_MAX_QUERY_RANGE_MS", "86400000"),
            ("MONBRIDGE_ENABLE_PROMETHEUS", "false"),
        ]);

        let config =
            QueryConfig::load_from(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.remote.base_url, "https://monitor.local");
        assert_eq!(config.validity.max_datasources, 16);
        assert_eq!(config.query.max_queries_per_request, 500);
        assert_eq!(config.query.max_query_range_ms, 86_400_000);
        assert!(!config.metrics.enable_prometheus);
        assert_eq!(config.metrics.slow_query_threshold_ms, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_malformed_values() {
        let result = QueryConfig::load_from(|key| {
            (key == "MONBRIDGE_ENABLE_PROMETHEUS").then(|| "maybe".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_hides_password() {
        let mut config = RemoteConfig::default();
        config.username = Some("admin".to_string());
        config.password = Some("hunter2".to_string());

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }
}
