//! Raw per-base scoring: the four published schemes plus the coverage
//! and mutation-rate gates every transcript passes before its profile
//! is built.

use thiserror::Error;

use crate::config::{NormConfig, Scoring};
use crate::store::RcEntry;

pub mod ding;
pub mod rouskin;
pub mod siegfried;
pub mod zubradt;

/// Non-fatal per-transcript rejection. Each variant maps onto exactly
/// one aggregate counter.
#[derive(Debug, Error)]
pub enum Skip {
    #[error("low coverage: {0}")]
    LowCoverage(String),
    #[error("sequence mismatch between treated and {0} samples")]
    SeqMismatch(&'static str),
    #[error("transcript missing from {0} sample")]
    Missing(&'static str),
    #[error("profile carries no numeric values")]
    NonNumeric,
}

/// Raw scores together with the positions that must end up NaN in the
/// final profile. Scores are always finite; masking is carried
/// separately so windowed normalization can skip masked positions
/// without poisoning class statistics.
#[derive(Debug)]
pub struct RawScores {
    pub scores: Vec<f64>,
    pub masked: Vec<bool>,
}

/// Per-transcript sample bundle. `untreated` doubles as the control
/// for Ding and Siegfried; `denatured` only applies to Siegfried.
pub struct Samples<'a> {
    pub treated: &'a RcEntry,
    pub untreated: Option<&'a RcEntry>,
    pub denatured: Option<&'a RcEntry>,
}

pub fn score(cfg: &NormConfig, samples: &Samples<'_>) -> Result<RawScores, Skip> {
    let treated = samples.treated;
    check_coverage(treated, cfg.mean_coverage, cfg.median_coverage, "treated")?;

    let untreated = if cfg.scoring.needs_untreated() {
        let untreated = samples.untreated.ok_or(Skip::Missing("untreated"))?;
        if untreated.sequence != treated.sequence {
            return Err(Skip::SeqMismatch("untreated"));
        }
        check_coverage(untreated, cfg.mean_coverage, cfg.median_coverage, "untreated")?;
        Some(untreated)
    } else {
        None
    };

    let denatured = if cfg.scoring.accepts_denatured() {
        if let Some(denatured) = samples.denatured {
            if denatured.sequence != treated.sequence {
                return Err(Skip::SeqMismatch("denatured"));
            }
            check_coverage(denatured, cfg.mean_coverage, cfg.median_coverage, "denatured")?;
            Some(denatured)
        } else {
            None
        }
    } else {
        None
    };

    let (scores, extra_mask) = match cfg.scoring {
        // untreated presence is guaranteed above for Ding/Siegfried
        Scoring::Ding => (ding::score(treated, untreated.ok_or(Skip::Missing("untreated"))?, cfg)?, None),
        Scoring::Rouskin => (rouskin::score(treated), None),
        Scoring::Siegfried => {
            let (scores, umut) =
                siegfried::score(treated, untreated.ok_or(Skip::Missing("untreated"))?, denatured, cfg);
            (scores, Some(umut))
        }
        Scoring::Zubradt => (zubradt::score(treated), None),
    };

    let mut masked: Vec<bool> = treated
        .coverage
        .iter()
        .map(|&cov| cov < cfg.nan_threshold)
        .collect();
    for control in [untreated, denatured].into_iter().flatten() {
        for (flag, &cov) in masked.iter_mut().zip(&control.coverage) {
            *flag |= cov < cfg.nan_threshold;
        }
    }
    if let Some(extra) = extra_mask {
        for (flag, umut) in masked.iter_mut().zip(extra) {
            *flag |= umut;
        }
    }

    Ok(RawScores { scores, masked })
}

pub fn check_coverage(
    entry: &RcEntry,
    mean_threshold: f64,
    median_threshold: f64,
    sample: &str,
) -> Result<(), Skip> {
    let mean = entry.mean_coverage();
    if mean < mean_threshold {
        return Err(Skip::LowCoverage(format!(
            "{} mean coverage {:.2} below {:.2}",
            sample, mean, mean_threshold
        )));
    }
    let median = entry.median_coverage();
    if median < median_threshold {
        return Err(Skip::LowCoverage(format!(
            "{} median coverage {:.2} below {:.2}",
            sample, median, median_threshold
        )));
    }
    Ok(())
}
