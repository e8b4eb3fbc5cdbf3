//! Rouskin scoring: raw stop counts. The normalization window
//! provides the scale.

use crate::store::RcEntry;

pub fn score(treated: &RcEntry) -> Vec<f64> {
    treated.counts.iter().map(|&c| c as f64).collect()
}
