//! Expansion of front-end queries into concrete measurement queries

use tracing::{debug, warn};

use crate::datasource::MetricCatalog;
use crate::error::{BridgeError, BridgeResult};
use crate::metric_filter::filter_metrics;
use crate::query::MetricQuery;
use crate::statistic_link::parse_statistic_link;

/// Turn raw panel queries into queries that each name one measurement and
/// its resolved metrics.
///
/// Queries carrying a statistic link are expanded into one query per
/// measurement in the link, in ascending measurement id order. Measurements
/// whose filtered metric set is empty are skipped. Queries without a link
/// pass through untouched, unless they select no metrics at all, in which
/// case they are dropped.
///
/// Lookups run one after another; the first failure aborts the whole batch.
pub async fn normalize(
    queries: Vec<MetricQuery>,
    catalog: &dyn MetricCatalog,
) -> BridgeResult<Vec<MetricQuery>> {
    let mut normalized = Vec::with_capacity(queries.len());

    for (position, query) in queries.into_iter().enumerate() {
        let Some(link) = query.link() else {
            if query.metrics.is_empty() {
                debug!(
                    position,
                    ref_id = %query.ref_id,
                    "Dropping query without statistic link or metrics"
                );
            } else {
                normalized.push(query);
            }
            continue;
        };

        let measurements = parse_statistic_link(link);
        if measurements.is_empty() {
            return Err(BridgeError::statistic_link(
                position,
                query.ref_id.clone(),
                "link carries no measurement id",
            ));
        }

        debug!(
            position,
            ref_id = %query.ref_id,
            measurements = measurements.len(),
            "Expanding statistic link"
        );

        for (measurement_obid, fragments) in measurements {
            let catalogue = catalog
                .fetch_metrics_for_measurement(measurement_obid)
                .await
                .map_err(|err| BridgeError::metric_lookup(measurement_obid, err))?;

            let metrics = filter_metrics(&catalogue, &fragments);
            if metrics.is_empty() {
                warn!(
                    measurement_obid,
                    ref_id = %query.ref_id,
                    ?fragments,
                    "No metrics of measurement match the statistic link, skipping"
                );
                continue;
            }

            normalized.push(query.for_measurement(measurement_obid, metrics));
        }
    }

    Ok(normalized)
}
