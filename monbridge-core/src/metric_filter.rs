//! Selection of catalogue metrics by key fragment

use crate::query::Metric;

/// Select the metrics whose key contains any of `fragments`.
///
/// An empty fragment list selects the whole catalogue. Catalogue order is
/// preserved.
pub fn filter_metrics<S: AsRef<str>>(catalogue: &[Metric], fragments: &[S]) -> Vec<Metric> {
    if fragments.is_empty() {
        return catalogue.to_vec();
    }

    catalogue
        .iter()
        .filter(|metric| {
            fragments
                .iter()
                .any(|fragment| metric.key.contains(fragment.as_ref()))
        })
        .cloned()
        .collect()
}
