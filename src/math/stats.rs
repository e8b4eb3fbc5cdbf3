//! Statistical primitives shared by the scoring, normalization,
//! peak-calling and combination passes.
//!
//! Note: Functions that need order statistics may reorder the input slice.

use libm::{erfc, lgamma};

/// Population mean. Returns NaN when the input is empty or carries a
/// non-finite element.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sum = 0.0;
    for v in values {
        if !v.is_finite() {
            return f64::NAN;
        }
        sum += *v;
    }
    sum / values.len() as f64
}

/// Population standard deviation (n divisor). NaN under the same
/// conditions as [`mean`].
pub fn stdev(values: &[f64]) -> f64 {
    let m = mean(values);
    if !m.is_finite() {
        return f64::NAN;
    }
    let mut acc = 0.0;
    for v in values {
        let d = *v - m;
        acc += d * d;
    }
    (acc / values.len() as f64).sqrt()
}

/// Quantile with linear interpolation at index `q * (n - 1)`.
/// Returns 0 for an empty slice.
pub fn quantile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let rank = q * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return values[lo];
    }
    let frac = rank - lo as f64;
    values[lo] * (1.0 - frac) + values[hi] * frac
}

pub fn median(values: &mut [f64]) -> f64 {
    quantile(values, 0.5)
}

/// Benjamini-Hochberg adjustment, rank-preserving.
///
/// Non-finite entries are carried through unchanged and excluded from
/// the hypothesis count.
pub fn bh_adjust(pvalues: &[f64]) -> Vec<f64> {
    let mut adjusted = pvalues.to_vec();
    let mut order: Vec<usize> = (0..pvalues.len())
        .filter(|&i| pvalues[i].is_finite())
        .collect();
    let m = order.len();
    if m == 0 {
        return adjusted;
    }
    order.sort_by(|&a, &b| pvalues[a].partial_cmp(&pvalues[b]).unwrap());

    let mut running = 1.0f64;
    for rank in (1..=m).rev() {
        let idx = order[rank - 1];
        let scaled = pvalues[idx] * m as f64 / rank as f64;
        running = running.min(scaled);
        adjusted[idx] = running.clamp(0.0, 1.0);
    }
    adjusted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combination {
    Stouffer,
    Fisher,
}

/// Combine p-values with equal weights. The result is clamped to (0, 1].
pub fn combine_p(pvalues: &[f64], method: Combination) -> f64 {
    if pvalues.is_empty() {
        return f64::NAN;
    }
    let m = pvalues.len() as f64;
    let combined = match method {
        Combination::Stouffer => {
            let z: f64 = pvalues
                .iter()
                .map(|&p| -inverse_normal_cdf(clamp_unit(p)))
                .sum();
            normal_sf(z / m.sqrt())
        }
        Combination::Fisher => {
            let x: f64 = pvalues.iter().map(|&p| -2.0 * clamp_unit(p).ln()).sum();
            chi_squared_sf(x, 2.0 * m)
        }
    };
    combined.clamp(f64::MIN_POSITIVE, 1.0)
}

fn clamp_unit(p: f64) -> f64 {
    p.clamp(1e-300, 1.0 - 1e-16)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tail {
    Left,
    Right,
    TwoSided,
}

/// Fisher's exact test on the 2x2 table
///
/// ```text
///   a  b
///   c  d
/// ```
///
/// `Tail::Right` is the enrichment tail: the probability of observing
/// `a` or more successes given the table margins.
pub fn fisher_exact(a: u64, b: u64, c: u64, d: u64, tail: Tail) -> f64 {
    let r1 = a + b;
    let r2 = c + d;
    let c1 = a + c;
    let n = r1 + r2;
    if n == 0 {
        return 1.0;
    }
    let lo = c1.saturating_sub(r2);
    let hi = r1.min(c1);

    let ln_pmf =
        |x: u64| -> f64 { ln_choose(r1, x) + ln_choose(r2, c1 - x) - ln_choose(n, c1) };
    let observed = ln_pmf(a);

    let mut p = 0.0;
    for x in lo..=hi {
        let lp = ln_pmf(x);
        let keep = match tail {
            Tail::Left => x <= a,
            Tail::Right => x >= a,
            Tail::TwoSided => lp <= observed + 1e-7,
        };
        if keep {
            p += lp.exp();
        }
    }
    p.clamp(0.0, 1.0)
}

pub fn log_base(x: f64, base: f64) -> f64 {
    x.ln() / base.ln()
}

/// Linear remap of `x` from `[old_lo, old_hi]` onto `[new_lo, new_hi]`.
/// A degenerate source interval maps everything onto `new_lo`.
pub fn maprange(old_lo: f64, old_hi: f64, new_lo: f64, new_hi: f64, x: f64) -> f64 {
    if old_hi == old_lo {
        return new_lo;
    }
    new_lo + (x - old_lo) * (new_hi - new_lo) / (old_hi - old_lo)
}

/// Upper tail of the standard normal distribution.
pub fn normal_sf(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Upper tail of the chi-squared distribution with `df` degrees of
/// freedom.
pub fn chi_squared_sf(x: f64, df: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    gamma_q(df / 2.0, x / 2.0)
}

fn ln_choose(n: u64, k: u64) -> f64 {
    lgamma((n + 1) as f64) - lgamma((k + 1) as f64) - lgamma((n - k + 1) as f64)
}

/// Inverse standard normal CDF (Acklam's rational approximation,
/// |relative error| < 1.2e-9 over (0, 1)).
fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -(((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    }
}

const GAMMA_ITMAX: usize = 200;
const GAMMA_EPS: f64 = 3.0e-14;

/// Regularized upper incomplete gamma Q(a, x).
fn gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    if x < a + 1.0 {
        1.0 - gamma_p_series(a, x)
    } else {
        gamma_q_continued_fraction(a, x)
    }
}

fn gamma_p_series(a: f64, x: f64) -> f64 {
    let mut ap = a;
    let mut sum = 1.0 / a;
    let mut del = sum;
    for _ in 0..GAMMA_ITMAX {
        ap += 1.0;
        del *= x / ap;
        sum += del;
        if del.abs() < sum.abs() * GAMMA_EPS {
            break;
        }
    }
    sum * (-x + a * x.ln() - lgamma(a)).exp()
}

fn gamma_q_continued_fraction(a: f64, x: f64) -> f64 {
    const FPMIN: f64 = 1.0e-300;
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / FPMIN;
    let mut d = 1.0 / b;
    let mut h = d;
    for i in 1..=GAMMA_ITMAX {
        let an = -(i as f64) * (i as f64 - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = b + an / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < GAMMA_EPS {
            break;
        }
    }
    (-x + a * x.ln() - lgamma(a)).exp() * h
}
