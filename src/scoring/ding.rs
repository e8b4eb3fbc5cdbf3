//! Ding scoring: log-count ratio of treated over untreated, each
//! normalized by its transcript-wide log-count mean.

use crate::config::NormConfig;
use crate::math::stats;
use crate::scoring::Skip;
use crate::store::RcEntry;

pub fn score(treated: &RcEntry, untreated: &RcEntry, cfg: &NormConfig) -> Result<Vec<f64>, Skip> {
    let pc = cfg.pseudocount;
    let t_ln: Vec<f64> = treated.counts.iter().map(|&c| (c as f64 + pc).ln()).collect();
    let u_ln: Vec<f64> = untreated
        .counts
        .iter()
        .map(|&c| (c as f64 + pc).ln())
        .collect();

    let t_mean = stats::mean(&t_ln);
    let u_mean = stats::mean(&u_ln);
    if !(t_mean != 0.0 && t_mean.is_finite()) || !(u_mean != 0.0 && u_mean.is_finite()) {
        return Err(Skip::LowCoverage(
            "log-count mean is zero in treated or untreated sample".to_string(),
        ));
    }

    Ok(t_ln
        .iter()
        .zip(&u_ln)
        .map(|(&t, &u)| (t / t_mean - u / u_mean).max(0.0).min(cfg.max_score))
        .collect())
}
