//! Windowed per-base-class normalization and the Zarringhalam remap.
//!
//! The engine slides a window over the raw score vector, normalizes
//! each reactive base class inside the window, and averages the
//! per-window contributions at every position. Masked and
//! non-reactive positions end up NaN.

use crate::config::{BaseSet, NormConfig, NormMethod};
use crate::math::stats;
use crate::scoring::{RawScores, Skip};

pub fn normalize(cfg: &NormConfig, sequence: &str, raw: &RawScores) -> Result<Vec<f64>, Skip> {
    let bases: Vec<char> = sequence.chars().collect();
    let mut profile = if cfg.raw {
        raw.scores.clone()
    } else {
        windowed(cfg, &bases, raw)
    };

    if cfg.remap {
        zarringhalam(&mut profile);
    }

    for (i, value) in profile.iter_mut().enumerate() {
        if raw.masked[i] || !cfg.reactive.is_reactive(bases[i]) {
            *value = f64::NAN;
        }
    }

    if profile.iter().all(|v| v.is_nan()) {
        return Err(Skip::LowCoverage(
            "no covered reactive positions left".to_string(),
        ));
    }
    Ok(profile)
}

fn windowed(cfg: &NormConfig, bases: &[char], raw: &RawScores) -> Vec<f64> {
    let len = bases.len();
    if len == 0 {
        return Vec::new();
    }
    let window = cfg.window.resolve(len);
    // a stride wider than the window leaves gaps; untouched positions
    // keep an empty accumulator and surface as NaN
    let offset = if window == len {
        window
    } else {
        cfg.offset.resolve(len)
    };

    let mut starts = Vec::new();
    let mut i = 0;
    while i + window <= len {
        starts.push(i);
        i += offset;
    }
    // one trailing window so the final bases are always covered
    if starts.last().is_some_and(|&last| last + window < len) {
        starts.push(len - window);
    }

    let classes = cfg.reactive.classes(cfg.independent);
    let mut accumulators: Vec<Vec<f64>> = vec![Vec::new(); len];

    for &start in &starts {
        for class in &classes {
            normalize_class(cfg.norm, class, start, window, bases, raw, &mut accumulators);
        }
    }

    (0..len)
        .map(|i| {
            if accumulators[i].is_empty() {
                f64::NAN
            } else {
                stats::mean(&accumulators[i])
            }
        })
        .collect()
}

fn normalize_class(
    method: NormMethod,
    class: &BaseSet,
    start: usize,
    window: usize,
    bases: &[char],
    raw: &RawScores,
    accumulators: &mut [Vec<f64>],
) {
    let mut positions = Vec::new();
    let mut values = Vec::new();
    for i in start..start + window {
        if raw.masked[i] || !class.is_reactive(bases[i]) {
            continue;
        }
        positions.push(i);
        values.push(raw.scores[i]);
    }
    if values.is_empty() {
        return;
    }

    let normalized = match method {
        NormMethod::TwoEight => norm_28(&values),
        NormMethod::Winsor90 => winsor_90(&values),
        NormMethod::BoxPlot => box_plot(&values),
    };
    // an undefined class carries no contribution for this window
    let Some(normalized) = normalized else {
        return;
    };
    for (&i, value) in positions.iter().zip(normalized) {
        accumulators[i].push(value);
    }
}

/// 2-8% normalization: divide by the average of the values ranked
/// between the top 2% and the top 2%+8% (inclusive) of the class.
fn norm_28(values: &[f64]) -> Option<Vec<f64>> {
    let k = values.len();
    let p2 = (0.02 * k as f64).round() as usize;
    let p8 = (0.08 * k as f64).round() as usize;
    if p8 == 0 {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
    let end = (p2 + p8).min(k - 1);
    let average = stats::mean(&sorted[p2..=end]);
    if !(average > 0.0) {
        return None;
    }
    Some(values.iter().map(|v| (v / average).max(0.0)).collect())
}

/// 90% Winsorizing: clamp below at the 5th percentile, scale by the
/// 95th, cap at 1.
fn winsor_90(values: &[f64]) -> Option<Vec<f64>> {
    let mut sorted = values.to_vec();
    let q05 = stats::quantile(&mut sorted, 0.05).max(0.0);
    let q95 = stats::quantile(&mut sorted, 0.95);
    if !(q95 > 0.0) {
        return None;
    }
    Some(values.iter().map(|&v| (v.max(q05) / q95).min(1.0)).collect())
}

/// Box-plot normalization: drop outliers above Q3 + 1.5 IQR, divide by
/// the average of the top decile of what remains.
fn box_plot(values: &[f64]) -> Option<Vec<f64>> {
    let k = values.len();
    let mut sorted = values.to_vec();
    let q25 = stats::quantile(&mut sorted, 0.25);
    let q75 = stats::quantile(&mut sorted, 0.75);
    let fence = q75 + 1.5 * (q75 - q25);

    let mut outliers = if k < 50 {
        (0.02 * k as f64).round() as usize
    } else {
        sorted.iter().filter(|&&v| v > fence).count()
    };
    if outliers == 0 {
        outliers = 1;
    }

    let remaining = &sorted[..k.saturating_sub(outliers)];
    if remaining.is_empty() {
        return None;
    }
    let p10 = if (50..100).contains(&k) {
        10
    } else {
        (0.10 * k as f64).round() as usize
    };
    if p10 == 0 {
        return None;
    }
    let top = &remaining[remaining.len().saturating_sub(p10)..];
    let average = stats::mean(top);
    if !(average > 0.0) {
        return None;
    }
    Some(values.iter().map(|v| (v / average).max(0.0)).collect())
}

/// Zarringhalam piecewise-linear remap onto [0, 1].
pub fn zarringhalam(profile: &mut [f64]) {
    let max = profile
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return;
    }
    for value in profile.iter_mut() {
        if !value.is_finite() {
            continue;
        }
        *value = if *value < 0.25 {
            stats::maprange(0.0, 0.25, 0.0, 0.35, *value)
        } else if *value < 0.30 {
            stats::maprange(0.25, 0.30, 0.35, 0.55, *value)
        } else if *value < 0.70 {
            stats::maprange(0.30, 0.70, 0.55, 0.85, *value)
        } else {
            stats::maprange(0.70, max, 0.85, 1.0, *value).min(1.0)
        };
    }
}
