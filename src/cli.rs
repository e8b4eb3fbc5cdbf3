use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rf-tools", version, about = "RNA structure probing toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Transform per-base count profiles into reactivity documents
    Norm(NormArgs),
    /// Call enriched regions in immunoprecipitation experiments
    Peakcall(PeakcallArgs),
    /// Merge replicate profiles with per-base statistics
    Combine(CombineArgs),
}

#[derive(Debug, Args)]
pub struct NormArgs {
    #[arg(long, help = "Treated sample RC file")]
    pub treated: PathBuf,

    #[arg(
        long,
        help = "Untreated sample RC file (required for Ding and Siegfried)"
    )]
    pub untreated: Option<PathBuf>,

    #[arg(long, help = "Denatured sample RC file (Siegfried only)")]
    pub denatured: Option<PathBuf>,

    #[arg(
        long,
        default_value = "rf_norm",
        help = "Output directory, one XML document per transcript"
    )]
    pub output_dir: PathBuf,

    #[arg(
        long,
        default_value = "1",
        help = "Scoring method: 1=Ding, 2=Rouskin, 3=Siegfried, 4=Zubradt (name or code)"
    )]
    pub scoring_method: String,

    #[arg(
        long,
        default_value = "1",
        help = "Normalization method: 1=2-8%, 2=90% Winsorizing, 3=Box-plot (name or code)"
    )]
    pub norm_method: String,

    #[arg(
        long,
        help = "Normalization window in bases (default: whole transcript for Ding/Siegfried, 50 otherwise)"
    )]
    pub norm_window: Option<usize>,

    #[arg(long, help = "Window offset in bases (default: the window length)")]
    pub window_offset: Option<usize>,

    #[arg(long, default_value = "N", help = "Reactive bases (N = all four)")]
    pub reactive_bases: String,

    #[arg(
        long,
        default_value_t = false,
        help = "Normalize each reactive base class independently"
    )]
    pub norm_independent: bool,

    #[arg(long, default_value_t = 1.0)]
    pub pseudocount: f64,

    #[arg(long, default_value_t = 10.0, help = "Score ceiling (Ding)")]
    pub max_score: f64,

    #[arg(
        long,
        default_value_t = 0.0,
        help = "Reject transcripts whose mean coverage falls below this"
    )]
    pub mean_coverage: f64,

    #[arg(
        long,
        default_value_t = 0.0,
        help = "Reject transcripts whose median coverage falls below this"
    )]
    pub median_coverage: f64,

    #[arg(
        long,
        default_value_t = 10,
        help = "Report NaN at positions covered by fewer reads than this"
    )]
    pub nan: u32,

    #[arg(
        long,
        default_value_t = false,
        help = "Zarringhalam remap of normalized reactivities onto [0, 1]"
    )]
    pub remap_reactivities: bool,

    #[arg(
        long,
        default_value_t = 0.05,
        help = "Maximum untreated mutation rate (Siegfried)"
    )]
    pub max_untreated_mut: f64,

    #[arg(
        long,
        default_value_t = false,
        help = "Skip normalization and emit raw scores"
    )]
    pub raw: bool,

    #[arg(long, default_value_t = 3, help = "Fractional digits in output values")]
    pub decimals: usize,

    #[arg(
        long,
        help = "Load scoring/normalization parameters from a key=value file (parameter flags are ignored)"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Write the validated parameter bundle to a key=value file")]
    pub save_config: Option<PathBuf>,

    #[arg(long, default_value_t = 1, help = "Worker threads (0 = all cores)")]
    pub processors: usize,
}

#[derive(Debug, Args)]
pub struct PeakcallArgs {
    #[arg(long, help = "Immunoprecipitated sample RC file")]
    pub ip: PathBuf,

    #[arg(long, help = "Control sample RC file")]
    pub control: Option<PathBuf>,

    #[arg(long, default_value = "peaks.bed", help = "Output BED file")]
    pub output: PathBuf,

    #[arg(long, default_value_t = 150, help = "Window length in bases")]
    pub window: usize,

    #[arg(long, help = "Window offset in bases (default: half the window)")]
    pub offset: Option<usize>,

    #[arg(long, default_value_t = 3.0, help = "Minimum log2 enrichment")]
    pub enrichment: f64,

    #[arg(long, default_value_t = 0.05, help = "Adjusted p-value cutoff")]
    pub p_value: f64,

    #[arg(long, default_value_t = 1.0)]
    pub pseudocount: f64,

    #[arg(
        long,
        default_value_t = 0,
        help = "Merge windows closer than this many bases"
    )]
    pub merge_distance: usize,

    #[arg(
        long,
        default_value_t = 0.0,
        help = "Reject transcripts whose mean coverage falls below this"
    )]
    pub mean_coverage: f64,

    #[arg(
        long,
        default_value_t = 0.0,
        help = "Reject transcripts whose median coverage falls below this"
    )]
    pub median_coverage: f64,

    #[arg(long, default_value_t = 1, help = "Worker threads (0 = all cores)")]
    pub processors: usize,
}

#[derive(Debug, Args)]
pub struct CombineArgs {
    #[arg(
        required = true,
        num_args = 2..,
        help = "Replicate inputs: XML profiles or directories of profiles"
    )]
    pub inputs: Vec<PathBuf>,

    #[arg(
        long,
        default_value = "rf_combine",
        help = "Output directory, one XML document per transcript"
    )]
    pub output_dir: PathBuf,

    #[arg(long, default_value_t = 3, help = "Fractional digits in output values")]
    pub decimals: usize,

    #[arg(
        long,
        default_value_t = false,
        help = "Emit per-base standard deviations alongside the means"
    )]
    pub stdev: bool,

    #[arg(long, default_value_t = 1, help = "Worker threads (0 = all cores)")]
    pub processors: usize,
}
