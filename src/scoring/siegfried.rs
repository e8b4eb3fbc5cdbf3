//! Siegfried scoring: background-subtracted mutation rates, optionally
//! scaled by a denatured sample.
//!
//! Returns the scores together with the positions whose untreated
//! mutation rate exceeds the configured ceiling; those are forced to
//! NaN in the final profile.

use crate::config::NormConfig;
use crate::store::RcEntry;

pub fn score(
    treated: &RcEntry,
    untreated: &RcEntry,
    denatured: Option<&RcEntry>,
    cfg: &NormConfig,
) -> (Vec<f64>, Vec<bool>) {
    let len = treated.len();
    let mut scores = Vec::with_capacity(len);
    let mut umut_mask = vec![false; len];

    for i in 0..len {
        let mut t_rate = rate(treated, i);
        let mut u_rate = rate(untreated, i);
        let mut d_rate = denatured.map(|d| rate(d, i));

        if u_rate > cfg.max_untreated_mut {
            umut_mask[i] = true;
        }

        let below = treated.coverage[i] < cfg.nan_threshold
            || untreated.coverage[i] < cfg.nan_threshold
            || denatured.is_some_and(|d| d.coverage[i] < cfg.nan_threshold);
        if below || umut_mask[i] {
            t_rate = 0.0;
            u_rate = 0.0;
            d_rate = d_rate.map(|_| 0.0);
        }

        let score = match d_rate {
            Some(d) if d > 0.0 => ((t_rate - u_rate) / d).max(0.0),
            Some(_) => 0.0,
            None => (t_rate - u_rate).max(0.0),
        };
        scores.push(score);
    }

    (scores, umut_mask)
}

fn rate(entry: &RcEntry, i: usize) -> f64 {
    if entry.coverage[i] > 0 {
        entry.counts[i] as f64 / entry.coverage[i] as f64
    } else {
        0.0
    }
}
