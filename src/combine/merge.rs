//! Per-transcript combination of K replicate profiles: strict header
//! compatibility checks, then per-base mean/stdev across replicates.

use thiserror::Error;

use crate::config::{BaseSet, CombineConfig};
use crate::io::xml::{Profile, ProfileHeader, TOOL_MODCALL};
use crate::math::stats;

/// Header disagreement between replicates; non-fatal per transcript.
#[derive(Debug, Error)]
pub enum Compat {
    #[error("tool differs across replicates")]
    Tool,
    #[error("scoring method differs across replicates")]
    Scoring,
    #[error("normalization differs across replicates")]
    Norm,
    #[error("window offset differs across replicates")]
    Offset,
    #[error("window differs across replicates")]
    Window,
    #[error("sequence differs across replicates")]
    Sequence,
}

/// Combine replicate profiles of one transcript. `sets` holds the
/// parsed reactive set of each profile, parallel to `profiles`.
pub fn combine(
    cfg: &CombineConfig,
    profiles: &[Profile],
    sets: &[BaseSet],
) -> Result<Profile, Compat> {
    let first = &profiles[0];
    for profile in &profiles[1..] {
        if profile.header.tool != first.header.tool {
            return Err(Compat::Tool);
        }
        if profile.sequence != first.sequence {
            return Err(Compat::Sequence);
        }
        if profile.header.win != first.header.win {
            return Err(Compat::Window);
        }
    }
    if first.header.tool != TOOL_MODCALL {
        for profile in &profiles[1..] {
            if profile.header.scoring != first.header.scoring {
                return Err(Compat::Scoring);
            }
            if profile.header.norm != first.header.norm
                || profile.header.remap != first.header.remap
            {
                return Err(Compat::Norm);
            }
            if profile.header.offset != first.header.offset {
                return Err(Compat::Offset);
            }
        }
    }
    // the algorithm attribute relaxes to "Combined" instead of rejecting
    let algorithm = if profiles
        .iter()
        .all(|p| p.header.algorithm == first.header.algorithm)
    {
        first.header.algorithm.clone()
    } else {
        Some("Combined".to_string())
    };

    let len = first.sequence.len();
    let bases: Vec<char> = first.sequence.chars().collect();
    let secondary = first.kind.element_names().1.is_some();

    let mut values1: Vec<Vec<f64>> = vec![Vec::new(); len];
    let mut values2: Vec<Vec<f64>> = if secondary {
        vec![Vec::new(); len]
    } else {
        Vec::new()
    };
    for (profile, set) in profiles.iter().zip(sets) {
        for i in 0..len {
            // positions outside this replicate's reactive set are
            // implicitly NaN and contribute nothing
            if !set.is_reactive(bases[i]) {
                continue;
            }
            values1[i].push(profile.values1[i]);
            if let Some(v2) = &profile.values2 {
                values2[i].push(v2[i]);
            }
        }
    }

    // mean() yields NaN for an empty or not-all-numeric accumulator
    let mean1: Vec<f64> = values1.iter().map(|acc| stats::mean(acc)).collect();
    let errors1 = cfg
        .stdev
        .then(|| values1.iter().map(|acc| stats::stdev(acc)).collect());
    let (mean2, errors2) = if secondary {
        (
            Some(values2.iter().map(|acc| stats::mean(acc)).collect()),
            cfg.stdev
                .then(|| values2.iter().map(|acc| stats::stdev(acc)).collect()),
        )
    } else {
        (None, None)
    };

    let mut union = sets[0].clone();
    for set in &sets[1..] {
        union = union.union(set);
    }

    let header = ProfileHeader {
        combined: true,
        tool: first.header.tool.clone(),
        reactive: union.spec().to_string(),
        keep_attr: first.header.keep_attr,
        scoring: first.header.scoring.clone(),
        norm: first.header.norm.clone(),
        win: first.header.win.clone(),
        offset: first.header.offset.clone(),
        remap: first.header.remap.clone(),
        max: first.header.max.clone(),
        pseudo: first.header.pseudo.clone(),
        maxumut: first.header.maxumut.clone(),
        algorithm,
    };

    Ok(Profile {
        header,
        kind: first.kind,
        id: first.id.clone(),
        sequence: first.sequence.clone(),
        values1: mean1,
        values2: mean2,
        errors1,
        errors2,
    })
}
