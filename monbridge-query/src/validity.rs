//! Remote server validity gate
//!
//! Before data is requested the service checks that the monitoring server is
//! reachable and recent enough. Verdicts are cached per data source so that
//! concurrent requests do not hammer the version endpoint.

use async_trait::async_trait;
use moka::future::Cache;
use monbridge_core::{BridgeError, BridgeResult};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::{RemoteConfig, ValidityConfig};
use crate::remote_client::RemoteClient;

/// Source of the remote server version
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn server_version(&self) -> BridgeResult<String>;
}

#[async_trait]
impl VersionSource for RemoteClient {
    async fn server_version(&self) -> BridgeResult<String> {
        Ok(self.fetch_version().await?.version)
    }
}

/// Outcome of a validity check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Usable { version: String },
    Unusable { reason: String },
}

/// Thread-safe, TTL-bounded validity verdicts keyed by data source id
pub struct ValidityGate {
    cache: Cache<String, bool>,
    min_version: Vec<u64>,
    min_version_raw: String,
}

impl ValidityGate {
    pub fn new(validity: &ValidityConfig, remote: &RemoteConfig) -> BridgeResult<Self> {
        let min_version = parse_version(&remote.min_version).ok_or_else(|| {
            BridgeError::Configuration(format!(
                "Invalid minimum server version '{}'",
                remote.min_version
            ))
        })?;

        let cache = Cache::builder()
            .max_capacity(validity.max_datasources)
            .time_to_live(Duration::from_secs(validity.cache_ttl_seconds))
            .build();

        Ok(Self {
            cache,
            min_version,
            min_version_raw: remote.min_version.clone(),
        })
    }

    /// Query the server and judge it, bypassing the cache
    pub async fn check(&self, source: &dyn VersionSource) -> ServerStatus {
        match source.server_version().await {
            Ok(version) => match parse_version(&version) {
                Some(parsed) if compare_versions(&parsed, &self.min_version).is_ge() => {
                    ServerStatus::Usable { version }
                }
                Some(_) => ServerStatus::Unusable {
                    reason: format!(
                        "server version {} is older than the supported minimum {}",
                        version, self.min_version_raw
                    ),
                },
                None => ServerStatus::Unusable {
                    reason: format!("server reported an unparseable version '{}'", version),
                },
            },
            Err(err) => ServerStatus::Unusable {
                reason: err.to_string(),
            },
        }
    }

    /// Fail unless the server behind `datasource_id` is usable. Returns
    /// whether the verdict came from the cache.
    ///
    /// Only positive verdicts are cached; an unusable server is checked again
    /// on the next request.
    pub async fn ensure_usable(
        &self,
        datasource_id: &str,
        source: &dyn VersionSource,
    ) -> BridgeResult<bool> {
        if self.cache.get(datasource_id).await.unwrap_or(false) {
            debug!(datasource_id, "Server validity served from cache");
            return Ok(true);
        }

        match self.check(source).await {
            ServerStatus::Usable { version } => {
                info!(datasource_id, %version, "Monitoring server is usable");
                self.mark_usable(datasource_id).await;
                Ok(false)
            }
            ServerStatus::Unusable { reason } => {
                warn!(datasource_id, %reason, "Monitoring server is not usable");
                Err(BridgeError::server_unavailable(reason))
            }
        }
    }

    /// Remember that the server behind `datasource_id` is usable
    pub async fn mark_usable(&self, datasource_id: &str) {
        self.cache.insert(datasource_id.to_string(), true).await;
    }

    /// Forget the verdict for one data source
    pub async fn invalidate(&self, datasource_id: &str) {
        self.cache.invalidate(datasource_id).await;
    }
}

/// Parse a dotted numeric version such as `21.4.2`; a `v` prefix and
/// pre-release suffixes (`-rc1`) are ignored.
pub fn parse_version(version: &str) -> Option<Vec<u64>> {
    let version = version.trim().trim_start_matches(['v', 'V']);
    let core = version.split(['-', '+', ' ']).next()?;
    if core.is_empty() {
        return None;
    }

    core.split('.').map(|part| part.parse().ok()).collect()
}

/// Compare versions component-wise, missing components count as 0
fn compare_versions(a: &[u64], b: &[u64]) -> std::cmp::Ordering {
    let len = a.len().max(b.len());
    for i in 0..len {
        let left = a.get(i).copied().unwrap_or(0);
        let right = b.get(i).copied().unwrap_or(0);
        match left.cmp(&right) {
            std::cmp::Ordering::Equal => continue,
            other => return other,
        }
    }
    std::cmp::Ordering::Equal
}
