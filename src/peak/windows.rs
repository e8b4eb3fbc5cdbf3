//! Windowed enrichment over one transcript: tile, score, test, adjust,
//! filter, merge.

use crate::config::PeakConfig;
use crate::math::stats::{self, Combination, Tail};
use crate::store::RcEntry;

/// One merged enriched region, half-open on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct Peak {
    pub start: usize,
    pub end: usize,
    pub score: f64,
    pub pvalue: f64,
}

pub fn call(cfg: &PeakConfig, ip: &RcEntry, control: Option<&RcEntry>) -> Vec<Peak> {
    if ip.is_empty() {
        return Vec::new();
    }
    let len = ip.len();
    let window = cfg.window.min(len);

    let mut starts = Vec::new();
    let mut i = 0;
    while i + window <= len {
        starts.push(i);
        i += cfg.offset;
    }
    // clamp one trailing window onto the transcript end
    if starts.last().is_some_and(|&last| last + window < len) {
        starts.push(len - window);
    }

    let ip_cov: Vec<f64> = ip.coverage.iter().map(|&c| c as f64).collect();
    let ctl_cov: Option<Vec<f64>> =
        control.map(|c| c.coverage.iter().map(|&v| v as f64).collect());
    let ip_median = ip.median_coverage();
    let ctl_median = control.map(|c| c.median_coverage());

    let ip_means: Vec<f64> = starts
        .iter()
        .map(|&start| stats::mean(&ip_cov[start..start + window]))
        .collect();
    // stand-in background when no control sample was supplied
    let background = stats::mean(&ip_means);

    let pc = cfg.pseudocount;
    let mut scores = Vec::with_capacity(starts.len());
    let mut pvalues = Vec::with_capacity(starts.len());
    for (idx, &start) in starts.iter().enumerate() {
        let ip_mean = ip_means[idx];
        let (z, p) = match (&ctl_cov, ctl_median) {
            (Some(ctl_cov), Some(ctl_median)) => {
                let ctl_mean = stats::mean(&ctl_cov[start..start + window]);
                let ratio = ((ip_mean + pc) / (ip_median + pc)) / ((ctl_mean + pc) / (ctl_median + pc));
                let p = stats::fisher_exact(
                    ip_mean.round() as u64,
                    ip_median.round() as u64,
                    ctl_mean.round() as u64,
                    ctl_median.round() as u64,
                    Tail::Right,
                );
                (stats::log_base(ratio, 2.0), p)
            }
            _ => {
                let ratio = (ip_mean + pc) / (ip_median + pc);
                let p = stats::fisher_exact(
                    ip_mean.round() as u64,
                    ip_median.round() as u64,
                    background.round() as u64,
                    ip_median.round() as u64,
                    Tail::Right,
                );
                (stats::log_base(ratio, 2.0), p)
            }
        };
        scores.push(z);
        pvalues.push(p);
    }

    let adjusted = stats::bh_adjust(&pvalues);

    let mut peaks = Vec::new();
    let mut group: Option<(usize, usize, Vec<f64>, Vec<f64>)> = None;
    for (idx, &start) in starts.iter().enumerate() {
        if !(adjusted[idx] < cfg.pvalue && scores[idx] >= cfg.enrichment) {
            continue;
        }
        let end = start + window;
        group = match group.take() {
            // intersects [group.start, group.end + merge_distance]
            Some((group_start, group_end, mut group_scores, mut group_ps))
                if start <= group_end + cfg.merge_distance =>
            {
                group_scores.push(scores[idx]);
                group_ps.push(adjusted[idx]);
                Some((group_start, group_end.max(end), group_scores, group_ps))
            }
            done => {
                if let Some(done) = done {
                    peaks.push(finish(done));
                }
                Some((start, end, vec![scores[idx]], vec![adjusted[idx]]))
            }
        };
    }
    if let Some(done) = group.take() {
        peaks.push(finish(done));
    }
    peaks
}

fn finish((start, end, scores, pvalues): (usize, usize, Vec<f64>, Vec<f64>)) -> Peak {
    Peak {
        start,
        end,
        score: stats::mean(&scores),
        pvalue: stats::combine_p(&pvalues, Combination::Stouffer),
    }
}
