//! The replicate combiner: intersect the transcript universes of K
//! replicate inputs, check header compatibility, and emit one combined
//! document per transcript with per-base mean (and optional stdev).

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cli::CombineArgs;
use crate::config::{BaseSet, CombineConfig};
use crate::io::xml::{self, Profile, XmlError};
use crate::norm::sanitize;
use crate::pool::{self, Counter};

pub mod merge;

use merge::Compat;

#[derive(Debug, Default)]
pub struct CombineCounters {
    pub combined: Counter,
    pub difftool: Counter,
    pub diffseq: Counter,
    pub diffscore: Counter,
    pub diffnorm: Counter,
    pub diffoffset: Counter,
    pub diffwin: Counter,
    pub missing: Counter,
    pub nonnumeric: Counter,
    pub failed: Counter,
}

impl CombineCounters {
    fn record(&self, compat: &Compat) {
        match compat {
            Compat::Tool => self.difftool.bump(),
            Compat::Scoring => self.diffscore.bump(),
            Compat::Norm => self.diffnorm.bump(),
            Compat::Offset => self.diffoffset.bump(),
            Compat::Window => self.diffwin.bump(),
            Compat::Sequence => self.diffseq.bump(),
        }
    }
}

enum Reject {
    Compat(Compat),
    NonNumeric,
    Failed(anyhow::Error),
}

pub fn run(args: &CombineArgs) -> Result<CombineCounters> {
    let config = CombineConfig::new(args.decimals, args.stdev);
    config.validate()?;
    if args.inputs.len() < 2 {
        bail!("at least two replicate inputs are required");
    }
    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            args.output_dir.display()
        )
    })?;

    let counters = CombineCounters::default();
    let mut inputs: Vec<HashMap<String, PathBuf>> = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        inputs.push(enumerate(input, &counters)?);
    }

    let mut union: HashSet<&String> = HashSet::new();
    for input in &inputs {
        union.extend(input.keys());
    }
    let mut ids: Vec<String> = inputs[0]
        .keys()
        .filter(|id| inputs[1..].iter().all(|input| input.contains_key(*id)))
        .cloned()
        .collect();
    ids.sort();
    counters.missing.add((union.len() - ids.len()) as u64);

    info!(
        replicates = inputs.len(),
        transcripts = ids.len(),
        "combination_started"
    );

    let pool = pool::build(args.processors)?;
    pool.install(|| {
        ids.par_iter()
            .for_each(|id| process(id, &inputs, &config, args, &counters));
    });

    info!(
        combined = counters.combined.get(),
        difftool = counters.difftool.get(),
        diffseq = counters.diffseq.get(),
        diffscore = counters.diffscore.get(),
        diffnorm = counters.diffnorm.get(),
        diffoffset = counters.diffoffset.get(),
        diffwin = counters.diffwin.get(),
        missing = counters.missing.get(),
        nonnumeric = counters.nonnumeric.get(),
        failed = counters.failed.get(),
        "combination_finished"
    );
    Ok(counters)
}

fn enumerate(input: &Path, counters: &CombineCounters) -> Result<HashMap<String, PathBuf>> {
    let mut map = HashMap::new();
    if input.is_dir() {
        let entries = std::fs::read_dir(input)
            .with_context(|| format!("failed to read input directory {}", input.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("xml") {
                continue;
            }
            match xml::read_transcript_id(&path) {
                Ok(id) => {
                    map.insert(id, path);
                }
                Err(err) => {
                    counters.failed.bump();
                    warn!(document = %path.display(), error = %err, "document_unreadable");
                }
            }
        }
    } else {
        let id = xml::read_transcript_id(input)?;
        map.insert(id, input.to_path_buf());
    }
    if map.is_empty() {
        bail!("no profiles found in {}", input.display());
    }
    Ok(map)
}

fn process(
    id: &str,
    inputs: &[HashMap<String, PathBuf>],
    config: &CombineConfig,
    args: &CombineArgs,
    counters: &CombineCounters,
) {
    match combine_one(id, inputs, config) {
        Ok(profile) => {
            let path = args.output_dir.join(format!("{}.xml", sanitize(id)));
            match xml::write_profile(&path, &profile, config.decimals) {
                Ok(()) => {
                    // one count per replicate document folded in
                    counters.combined.add(inputs.len() as u64);
                    debug!(transcript = %id, "combined_profile_written");
                }
                Err(err) => {
                    counters.failed.bump();
                    warn!(transcript = %id, error = %err, "profile_write_failed");
                }
            }
        }
        Err(Reject::Compat(compat)) => {
            counters.record(&compat);
            debug!(transcript = %id, reason = %compat, "transcript_rejected");
        }
        Err(Reject::NonNumeric) => {
            counters.nonnumeric.bump();
            debug!(transcript = %id, "transcript_rejected_non_numeric");
        }
        Err(Reject::Failed(err)) => {
            counters.failed.bump();
            warn!(transcript = %id, error = %err, "transcript_failed");
        }
    }
}

fn combine_one(
    id: &str,
    inputs: &[HashMap<String, PathBuf>],
    config: &CombineConfig,
) -> Result<Profile, Reject> {
    let mut profiles = Vec::with_capacity(inputs.len());
    let mut sets = Vec::with_capacity(inputs.len());
    for input in inputs {
        let path = input
            .get(id)
            .ok_or_else(|| Reject::Failed(anyhow::anyhow!("transcript {} left the input set", id)))?;
        let profile = xml::read_profile(path).map_err(|err| match err {
            XmlError::BadValues(_) => Reject::NonNumeric,
            other => Reject::Failed(anyhow::Error::new(other)),
        })?;
        if profile.id != id {
            return Err(Reject::Failed(anyhow::anyhow!(
                "{} holds transcript {} instead of {}",
                path.display(),
                profile.id,
                id
            )));
        }
        let set = BaseSet::parse(&profile.header.reactive)
            .map_err(|err| Reject::Failed(anyhow::Error::new(err)))?;
        profiles.push(profile);
        sets.push(set);
    }
    merge::combine(config, &profiles, &sets).map_err(Reject::Compat)
}
