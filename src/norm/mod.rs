//! The normalization tool: score each transcript, normalize the scores
//! into a reactivity profile, and emit one XML document per covered
//! transcript.

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cli::NormArgs;
use crate::config::{BaseSet, NormConfig, NormMethod, Scoring, Window};
use crate::io::xml::{self, Profile, ProfileHeader, ValueKind};
use crate::pool::{self, Counter};
use crate::scoring::{self, Samples, Skip};
use crate::store::RcEntry;
use crate::store::reader::RcReader;

pub mod engine;

#[derive(Debug, Default)]
pub struct NormCounters {
    pub covered: Counter,
    pub incov: Counter,
    pub diffseq: Counter,
    pub missing: Counter,
    pub nonnumeric: Counter,
    pub failed: Counter,
}

impl NormCounters {
    fn record(&self, skip: &Skip) {
        match skip {
            Skip::LowCoverage(_) => self.incov.bump(),
            Skip::SeqMismatch(_) => self.diffseq.bump(),
            Skip::Missing(_) => self.missing.bump(),
            Skip::NonNumeric => self.nonnumeric.bump(),
        }
    }
}

enum Reject {
    Skip(Skip),
    Failed(anyhow::Error),
}

struct WorkerIo {
    treated: RcReader,
    untreated: Option<RcReader>,
    denatured: Option<RcReader>,
}

impl WorkerIo {
    fn open(args: &NormArgs) -> Result<Self> {
        Ok(Self {
            treated: RcReader::open(&args.treated)?,
            untreated: args.untreated.as_deref().map(RcReader::open).transpose()?,
            denatured: args.denatured.as_deref().map(RcReader::open).transpose()?,
        })
    }
}

pub fn run(args: &NormArgs) -> Result<NormCounters> {
    let config = build_config(args)?;
    if config.scoring.needs_untreated() && args.untreated.is_none() {
        bail!(
            "scoring method {} requires --untreated",
            config.scoring.name()
        );
    }
    if args.denatured.is_some() && !config.scoring.accepts_denatured() {
        bail!("--denatured only applies to Siegfried scoring");
    }
    if let Some(path) = &args.save_config {
        config.to_file(path)?;
        info!(config = %path.display(), "config_written");
    }

    // Opening on the main thread validates every store and builds any
    // missing index before the workers start.
    let treated = RcReader::open(&args.treated)?;
    let ids: Vec<String> = treated.ids().map(str::to_string).collect();
    drop(treated);
    if let Some(path) = &args.untreated {
        RcReader::open(path)?;
    }
    if let Some(path) = &args.denatured {
        RcReader::open(path)?;
    }

    std::fs::create_dir_all(&args.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            args.output_dir.display()
        )
    })?;

    info!(
        transcripts = ids.len(),
        scoring = config.scoring.name(),
        norm = config.norm.name(),
        "normalization_started"
    );

    let counters = NormCounters::default();
    let pool = pool::build(args.processors)?;
    pool.install(|| {
        ids.par_iter().for_each_init(
            || WorkerIo::open(args),
            |io, id| match io {
                Ok(io) => process(io, id, &config, args, &counters),
                Err(err) => {
                    warn!(transcript = %id, error = %err, "worker_stores_unavailable");
                    counters.failed.bump();
                }
            },
        );
    });

    info!(
        covered = counters.covered.get(),
        incov = counters.incov.get(),
        diffseq = counters.diffseq.get(),
        missing = counters.missing.get(),
        nonnumeric = counters.nonnumeric.get(),
        failed = counters.failed.get(),
        "normalization_finished"
    );
    Ok(counters)
}

fn process(io: &WorkerIo, id: &str, config: &NormConfig, args: &NormArgs, counters: &NormCounters) {
    match profile_one(io, id, config) {
        Ok(profile) => {
            let path = args.output_dir.join(format!("{}.xml", sanitize(id)));
            match xml::write_profile(&path, &profile, args.decimals) {
                Ok(()) => {
                    counters.covered.bump();
                    debug!(transcript = %id, "profile_written");
                }
                Err(err) => {
                    counters.failed.bump();
                    warn!(transcript = %id, error = %err, "profile_write_failed");
                }
            }
        }
        Err(Reject::Skip(skip)) => {
            counters.record(&skip);
            debug!(transcript = %id, reason = %skip, "transcript_skipped");
        }
        Err(Reject::Failed(err)) => {
            counters.failed.bump();
            warn!(transcript = %id, error = %err, "transcript_failed");
        }
    }
}

fn profile_one(io: &WorkerIo, id: &str, config: &NormConfig) -> Result<Profile, Reject> {
    let treated = io
        .treated
        .read(id)
        .map_err(Reject::Failed)?
        .ok_or(Reject::Skip(Skip::Missing("treated")))?;
    let untreated = read_paired(io.untreated.as_ref(), id, "untreated")?;
    let denatured = read_paired(io.denatured.as_ref(), id, "denatured")?;

    let raw = scoring::score(
        config,
        &Samples {
            treated: &treated,
            untreated: untreated.as_ref(),
            denatured: denatured.as_ref(),
        },
    )
    .map_err(Reject::Skip)?;
    let reactivity = engine::normalize(config, &treated.sequence, &raw).map_err(Reject::Skip)?;

    Ok(build_profile(config, treated, reactivity))
}

fn read_paired(
    reader: Option<&RcReader>,
    id: &str,
    sample: &'static str,
) -> Result<Option<RcEntry>, Reject> {
    match reader {
        Some(reader) => match reader.read(id).map_err(Reject::Failed)? {
            Some(entry) => Ok(Some(entry)),
            None => Err(Reject::Skip(Skip::Missing(sample))),
        },
        None => Ok(None),
    }
}

fn build_profile(config: &NormConfig, entry: RcEntry, reactivity: Vec<f64>) -> Profile {
    let header = ProfileHeader {
        combined: false,
        tool: xml::TOOL_NORM.to_string(),
        reactive: config.reactive.spec().to_string(),
        keep_attr: false,
        scoring: Some(config.scoring.name().to_string()),
        norm: Some(if config.raw {
            "raw".to_string()
        } else {
            config.norm.name().to_string()
        }),
        win: Some(config.window.to_string()),
        offset: Some(config.offset.to_string()),
        remap: Some(xml::bool_attr(config.remap).to_string()),
        max: Some(config.max_score.to_string()),
        pseudo: Some(config.pseudocount.to_string()),
        maxumut: Some(config.max_untreated_mut.to_string()),
        algorithm: None,
    };
    Profile {
        header,
        kind: ValueKind::Reactivity,
        id: entry.id,
        sequence: entry.sequence,
        values1: reactivity,
        values2: None,
        errors1: None,
        errors2: None,
    }
}

fn build_config(args: &NormArgs) -> Result<NormConfig> {
    let config = if let Some(path) = &args.config {
        NormConfig::from_file(path)?
    } else {
        let scoring = Scoring::from_value(&args.scoring_method)?;
        let norm = NormMethod::from_value(&args.norm_method)?;
        let mut config = NormConfig::new(scoring, norm);
        if let Some(window) = args.norm_window {
            config.window = Window::Bases(window);
            config.offset = Window::Bases(args.window_offset.unwrap_or(window));
        } else if let Some(offset) = args.window_offset {
            config.offset = Window::Bases(offset);
        }
        config.reactive = BaseSet::parse(&args.reactive_bases)?;
        config.independent = args.norm_independent;
        config.pseudocount = args.pseudocount;
        config.max_score = args.max_score;
        config.mean_coverage = args.mean_coverage;
        config.median_coverage = args.median_coverage;
        config.nan_threshold = args.nan;
        config.remap = args.remap_reactivities;
        config.max_untreated_mut = args.max_untreated_mut;
        config.raw = args.raw;
        config
    };
    config.validate()?;
    Ok(config)
}

/// Transcript ids become output file names; keep them path-safe.
pub fn sanitize(id: &str) -> String {
    id.replace(['/', '\\'], "_")
}
