//! The peak caller: scan every transcript of an immunoprecipitation
//! store for windows enriched over background and emit the merged
//! regions as sorted BED.

use std::sync::Mutex;

use anyhow::Result;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cli::PeakcallArgs;
use crate::config::PeakConfig;
use crate::io::bed::{self, PeakRecord};
use crate::pool::{self, Counter};
use crate::scoring::{self, Skip};
use crate::store::reader::RcReader;

pub mod windows;

#[derive(Debug, Default)]
pub struct PeakCounters {
    pub processed: Counter,
    pub incov: Counter,
    pub diffseq: Counter,
    pub missing: Counter,
    pub failed: Counter,
}

impl PeakCounters {
    fn record(&self, skip: &Skip) {
        match skip {
            Skip::LowCoverage(_) => self.incov.bump(),
            Skip::SeqMismatch(_) => self.diffseq.bump(),
            Skip::Missing(_) | Skip::NonNumeric => self.missing.bump(),
        }
    }
}

enum Reject {
    Skip(Skip),
    Failed(anyhow::Error),
}

struct WorkerIo {
    ip: RcReader,
    control: Option<RcReader>,
}

impl WorkerIo {
    fn open(args: &PeakcallArgs) -> Result<Self> {
        Ok(Self {
            ip: RcReader::open(&args.ip)?,
            control: args.control.as_deref().map(RcReader::open).transpose()?,
        })
    }
}

pub fn run(args: &PeakcallArgs) -> Result<PeakCounters> {
    let mut config = PeakConfig::new(args.window, args.offset);
    config.enrichment = args.enrichment;
    config.pvalue = args.p_value;
    config.pseudocount = args.pseudocount;
    config.merge_distance = args.merge_distance;
    config.mean_coverage = args.mean_coverage;
    config.median_coverage = args.median_coverage;
    config.validate()?;

    let ip = RcReader::open(&args.ip)?;
    let ids: Vec<String> = ip.ids().map(str::to_string).collect();
    drop(ip);
    if let Some(path) = &args.control {
        RcReader::open(path)?;
    }

    info!(
        transcripts = ids.len(),
        window = config.window,
        offset = config.offset,
        "peak_calling_started"
    );

    let counters = PeakCounters::default();
    let records = Mutex::new(Vec::new());
    let pool = pool::build(args.processors)?;
    pool.install(|| {
        ids.par_iter().for_each_init(
            || WorkerIo::open(args),
            |io, id| match io {
                Ok(io) => process(io, id, &config, &counters, &records),
                Err(err) => {
                    warn!(transcript = %id, error = %err, "worker_stores_unavailable");
                    counters.failed.bump();
                }
            },
        );
    });

    let mut records = records
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    bed::write_bed(&args.output, &mut records)?;

    info!(
        processed = counters.processed.get(),
        peaks = records.len(),
        incov = counters.incov.get(),
        diffseq = counters.diffseq.get(),
        missing = counters.missing.get(),
        failed = counters.failed.get(),
        output = %args.output.display(),
        "peak_calling_finished"
    );
    Ok(counters)
}

fn process(
    io: &WorkerIo,
    id: &str,
    config: &PeakConfig,
    counters: &PeakCounters,
    records: &Mutex<Vec<PeakRecord>>,
) {
    match call_one(io, id, config) {
        Ok(peaks) => {
            counters.processed.bump();
            if !peaks.is_empty() {
                let mut guard = records
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                for peak in peaks {
                    guard.push(PeakRecord {
                        id: id.to_string(),
                        start: peak.start,
                        end: peak.end,
                        score: peak.score,
                        pvalue: peak.pvalue,
                    });
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

fn call_one(io: &WorkerIo, id: &str, config: &PeakConfig) -> Result<Vec<windows::Peak>, Reject> {
    let ip = io
        .ip
        .read(id)
        .map_err(Reject::Failed)?
        .ok_or(Reject::Skip(Skip::Missing("ip")))?;
    scoring::check_coverage(&ip, config.mean_coverage, config.median_coverage, "ip")
        .map_err(Reject::Skip)?;

    let control = match &io.control {
        Some(reader) => match reader.read(id).map_err(Reject::Failed)? {
            Some(entry) => {
                if entry.len() != ip.len() {
                    return Err(Reject::Skip(Skip::SeqMismatch("control")));
                }
                scoring::check_coverage(
                    &entry,
                    config.mean_coverage,
                    config.median_coverage,
                    "control",
                )
                .map_err(Reject::Skip)?;
                Some(entry)
            }
            None => return Err(Reject::Skip(Skip::Missing("control"))),
        },
        None => None,
    };

    Ok(windows::call(config, &ip, control.as_ref()))
}
