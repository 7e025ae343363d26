//! Parsing of legacy statistic links
//!
//! A statistic link is the chart-embedding URL produced by the monitoring
//! server. It selects measurements and metrics through positional query
//! parameters:
//!
//! ```text
//! https://monitor.example/chart?0id=4000&0value1=4&0value0=2&1id=4100
//! ```
//!
//! `{index}id=<measurement>` names a measurement and
//! `{index}value<n>=<fragment>` adds a metric key fragment to the measurement
//! with the same index. A missing index means index 0.

use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;
use tracing::debug;

static MEASUREMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d*)id=(\d+)").expect("valid measurement id pattern"));

static METRIC_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d*)value\d*=(\d+)").expect("valid metric fragment pattern"));

/// Parse a statistic link into measurement id -> requested metric fragments.
///
/// An empty fragment list means every metric of the measurement. An empty
/// map means the link carried no measurement id at all.
pub fn parse_statistic_link(link: &str) -> BTreeMap<i64, Vec<String>> {
    let mut measurements: BTreeMap<u64, i64> = BTreeMap::new();
    for caps in MEASUREMENT_ID.captures_iter(link) {
        let Some(measurement_obid) = caps.get(2).and_then(|m| m.as_str().parse::<i64>().ok())
        else {
            continue;
        };
        if let Some(index) = parse_index(caps.get(1).map_or("", |m| m.as_str())) {
            measurements.insert(index, measurement_obid);
        }
    }

    let mut fragments: HashMap<u64, Vec<String>> = HashMap::new();
    for caps in METRIC_FRAGMENT.captures_iter(link) {
        let (Some(index), Some(fragment)) = (
            parse_index(caps.get(1).map_or("", |m| m.as_str())),
            caps.get(2),
        ) else {
            continue;
        };
        fragments
            .entry(index)
            .or_default()
            .push(fragment.as_str().to_string());
    }

    let mut result: BTreeMap<i64, Vec<String>> = BTreeMap::new();
    for (index, measurement_obid) in measurements {
        let requested = fragments.remove(&index).unwrap_or_default();
        match result.get_mut(&measurement_obid) {
            // Same measurement under two indices: an unrestricted entry wins
            Some(existing) if existing.is_empty() => {}
            Some(_) if requested.is_empty() => {
                result.insert(measurement_obid, Vec::new());
            }
            Some(existing) => existing.extend(requested),
            None => {
                result.insert(measurement_obid, requested);
            }
        }
    }

    if !fragments.is_empty() {
        debug!(
            orphaned_indices = fragments.len(),
            "Ignoring statistic link values without a matching measurement id"
        );
    }

    result
}

fn parse_index(raw: &str) -> Option<u64> {
    if raw.is_empty() {
        Some(0)
    } else {
        raw.parse().ok()
    }
}
