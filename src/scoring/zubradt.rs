//! Zubradt scoring: per-base mutation rate of the treated sample.

use crate::store::RcEntry;

pub fn score(treated: &RcEntry) -> Vec<f64> {
    treated
        .counts
        .iter()
        .zip(&treated.coverage)
        .map(|(&c, &cov)| if cov > 0 { c as f64 / cov as f64 } else { 0.0 })
        .collect()
}
