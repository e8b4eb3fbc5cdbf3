//! Typed parameter bundles for the three tools.
//!
//! The normalization bundle persists to a key=value file and loads
//! back losslessly; every validation failure is a [`ConfigError`]
//! raised before any worker starts.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown scoring method {0:?} (valid: 1=Ding, 2=Rouskin, 3=Siegfried, 4=Zubradt)")]
    UnknownScoring(String),
    #[error("unknown normalization method {0:?} (valid: 1=2-8%, 2=90% Winsorizing, 3=Box-plot)")]
    UnknownNorm(String),
    #[error("normalization window must be at least 3 bases, got {0}")]
    WindowTooSmall(usize),
    #[error("window offset must be at least 1, got {0}")]
    BadOffset(usize),
    #[error("reactive bases must be drawn from A, C, G, T, U, N, got {0:?}")]
    BadReactiveBase(char),
    #[error("reactive bases must not be empty")]
    EmptyReactiveBases,
    #[error("pseudocount must be positive and finite, got {0}")]
    BadPseudocount(f64),
    #[error("maximum score must be positive and finite, got {0}")]
    BadMaxScore(f64),
    #[error("coverage thresholds must be non-negative and finite, got {0}")]
    BadCoverageThreshold(f64),
    #[error("maximum untreated mutation rate must be within (0, 1], got {0}")]
    BadMaxUntreatedMut(f64),
    #[error("minimum per-base coverage must be at least 1")]
    BadNanThreshold,
    #[error("peak window must be at least 10 bases, got {0}")]
    PeakWindowTooSmall(usize),
    #[error("p-value cutoff must be within (0, 1], got {0}")]
    BadPvalue(f64),
    #[error("enrichment cutoff must be non-negative and finite, got {0}")]
    BadEnrichment(f64),
    #[error("decimals must be between 1 and 10, got {0}")]
    BadDecimals(usize),
    #[error("remap-reactivities cannot be combined with raw output")]
    RawRemap,
    #[error("{file}:{line}: malformed entry {entry:?} (expected key=value)")]
    Malformed {
        file: String,
        line: usize,
        entry: String,
    },
    #[error("{file}:{line}: unknown option {key:?}")]
    UnknownKey {
        file: String,
        line: usize,
        key: String,
    },
    #[error("{file}:{line}: invalid value {value:?} for {key}")]
    InvalidValue {
        file: String,
        line: usize,
        key: String,
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scoring {
    Ding,
    Rouskin,
    Siegfried,
    Zubradt,
}

impl Scoring {
    pub fn from_value(value: &str) -> Result<Self, ConfigError> {
        match value {
            "1" | "Ding" => Ok(Self::Ding),
            "2" | "Rouskin" => Ok(Self::Rouskin),
            "3" | "Siegfried" => Ok(Self::Siegfried),
            "4" | "Zubradt" => Ok(Self::Zubradt),
            other => Err(ConfigError::UnknownScoring(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ding => "Ding",
            Self::Rouskin => "Rouskin",
            Self::Siegfried => "Siegfried",
            Self::Zubradt => "Zubradt",
        }
    }

    /// Ding and Siegfried score treated against untreated; Rouskin and
    /// Zubradt use the treated sample alone.
    pub fn needs_untreated(self) -> bool {
        matches!(self, Self::Ding | Self::Siegfried)
    }

    pub fn accepts_denatured(self) -> bool {
        matches!(self, Self::Siegfried)
    }

    pub fn default_window(self) -> Window {
        match self {
            Self::Ding | Self::Siegfried => Window::Transcript,
            Self::Rouskin | Self::Zubradt => Window::Bases(50),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormMethod {
    TwoEight,
    Winsor90,
    BoxPlot,
}

impl NormMethod {
    pub fn from_value(value: &str) -> Result<Self, ConfigError> {
        match value {
            "1" | "2-8%" => Ok(Self::TwoEight),
            "2" | "90% Winsorizing" => Ok(Self::Winsor90),
            "3" | "Box-plot" => Ok(Self::BoxPlot),
            other => Err(ConfigError::UnknownNorm(other.to_string())),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::TwoEight => "2-8%",
            Self::Winsor90 => "90% Winsorizing",
            Self::BoxPlot => "Box-plot",
        }
    }
}

/// Window extent: a fixed base count, or the whole transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Transcript,
    Bases(usize),
}

impl Window {
    /// Effective length for a transcript of `len` bases.
    pub fn resolve(self, len: usize) -> usize {
        match self {
            Self::Transcript => len,
            Self::Bases(w) => w.min(len),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        if value == "transcript" {
            return Some(Self::Transcript);
        }
        value.parse::<usize>().ok().map(Self::Bases)
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transcript => write!(f, "transcript"),
            Self::Bases(w) => write!(f, "{}", w),
        }
    }
}

/// The set of nucleotide characters the experiment is informative on.
///
/// `N` means all four bases. U folds onto T, so RNA- and DNA-alphabet
/// specs behave identically. The spec string is kept in canonical form
/// (sorted, `N` for the full set) so persistence round-trips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseSet {
    spec: String,
    mask: [bool; 4],
}

impl BaseSet {
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        if spec.is_empty() {
            return Err(ConfigError::EmptyReactiveBases);
        }
        let mut mask = [false; 4];
        for ch in spec.chars() {
            match ch.to_ascii_uppercase() {
                'N' => mask = [true; 4],
                'A' => mask[0] = true,
                'C' => mask[1] = true,
                'G' => mask[2] = true,
                'T' | 'U' => mask[3] = true,
                other => return Err(ConfigError::BadReactiveBase(other)),
            }
        }
        Ok(Self::from_mask(mask))
    }

    pub fn all() -> Self {
        Self::from_mask([true; 4])
    }

    fn from_mask(mask: [bool; 4]) -> Self {
        let spec = if mask == [true; 4] {
            "N".to_string()
        } else {
            const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
            (0..4).filter(|&i| mask[i]).map(|i| BASES[i]).collect()
        };
        Self { spec, mask }
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn is_reactive(&self, base: char) -> bool {
        match base.to_ascii_uppercase() {
            'A' => self.mask[0],
            'C' => self.mask[1],
            'G' => self.mask[2],
            'T' | 'U' => self.mask[3],
            _ => false,
        }
    }

    /// Base classes for windowed normalization: one single-base class
    /// per member when `independent`, otherwise the whole set.
    pub fn classes(&self, independent: bool) -> Vec<BaseSet> {
        if !independent {
            return vec![self.clone()];
        }
        (0..4)
            .filter(|&i| self.mask[i])
            .map(|i| {
                let mut mask = [false; 4];
                mask[i] = true;
                Self::from_mask(mask)
            })
            .collect()
    }

    pub fn union(&self, other: &BaseSet) -> BaseSet {
        let mut mask = self.mask;
        for i in 0..4 {
            mask[i] |= other.mask[i];
        }
        Self::from_mask(mask)
    }
}

/// Parameter bundle for the normalization tool (scoring + windowed
/// normalization).
#[derive(Debug, Clone)]
pub struct NormConfig {
    pub scoring: Scoring,
    pub norm: NormMethod,
    pub window: Window,
    pub offset: Window,
    pub reactive: BaseSet,
    pub independent: bool,
    pub pseudocount: f64,
    pub max_score: f64,
    pub mean_coverage: f64,
    pub median_coverage: f64,
    pub nan_threshold: u32,
    pub remap: bool,
    pub max_untreated_mut: f64,
    pub raw: bool,
}

impl NormConfig {
    pub fn new(scoring: Scoring, norm: NormMethod) -> Self {
        let window = scoring.default_window();
        Self {
            scoring,
            norm,
            window,
            offset: window,
            reactive: BaseSet::all(),
            independent: false,
            pseudocount: 1.0,
            max_score: 10.0,
            mean_coverage: 0.0,
            median_coverage: 0.0,
            nan_threshold: 10,
            remap: false,
            max_untreated_mut: 0.05,
            raw: false,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Window::Bases(w) = self.window {
            if w < 3 {
                return Err(ConfigError::WindowTooSmall(w));
            }
        }
        if let Window::Bases(o) = self.offset {
            if o < 1 {
                return Err(ConfigError::BadOffset(o));
            }
        }
        if !(self.pseudocount > 0.0 && self.pseudocount.is_finite()) {
            return Err(ConfigError::BadPseudocount(self.pseudocount));
        }
        if !(self.max_score > 0.0 && self.max_score.is_finite()) {
            return Err(ConfigError::BadMaxScore(self.max_score));
        }
        for threshold in [self.mean_coverage, self.median_coverage] {
            if !(threshold >= 0.0 && threshold.is_finite()) {
                return Err(ConfigError::BadCoverageThreshold(threshold));
            }
        }
        if self.nan_threshold < 1 {
            return Err(ConfigError::BadNanThreshold);
        }
        if !(self.max_untreated_mut > 0.0 && self.max_untreated_mut <= 1.0) {
            return Err(ConfigError::BadMaxUntreatedMut(self.max_untreated_mut));
        }
        if self.raw && self.remap {
            return Err(ConfigError::RawRemap);
        }
        Ok(())
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        out.push_str(&format!("scoring={}\n", self.scoring.name()));
        out.push_str(&format!("norm={}\n", self.norm.name()));
        out.push_str(&format!("norm-window={}\n", self.window));
        out.push_str(&format!("window-offset={}\n", self.offset));
        out.push_str(&format!("reactive-bases={}\n", self.reactive.spec()));
        out.push_str(&format!("norm-independent={}\n", self.independent));
        out.push_str(&format!("pseudocount={}\n", self.pseudocount));
        out.push_str(&format!("max-score={}\n", self.max_score));
        out.push_str(&format!("mean-coverage={}\n", self.mean_coverage));
        out.push_str(&format!("median-coverage={}\n", self.median_coverage));
        out.push_str(&format!("nan={}\n", self.nan_threshold));
        out.push_str(&format!("remap-reactivities={}\n", self.remap));
        out.push_str(&format!("max-untreated-mut={}\n", self.max_untreated_mut));
        out.push_str(&format!("raw={}\n", self.raw));
        std::fs::write(path, out)
            .with_context(|| format!("failed to write config {}", path.display()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let file = path.display().to_string();

        let mut pairs = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let (key, value) = trimmed.split_once('=').ok_or_else(|| ConfigError::Malformed {
                file: file.clone(),
                line: line_no,
                entry: trimmed.to_string(),
            })?;
            pairs.push((line_no, key.trim().to_string(), value.trim().to_string()));
        }

        // Scoring seeds the window defaults, so resolve it first.
        let mut scoring = Scoring::Ding;
        let mut norm = NormMethod::TwoEight;
        for (_, key, value) in &pairs {
            match key.as_str() {
                "scoring" => scoring = Scoring::from_value(value)?,
                "norm" => norm = NormMethod::from_value(value)?,
                _ => {}
            }
        }

        let mut config = Self::new(scoring, norm);
        for (line_no, key, value) in &pairs {
            let invalid = || ConfigError::InvalidValue {
                file: file.clone(),
                line: *line_no,
                key: key.clone(),
                value: value.clone(),
            };
            match key.as_str() {
                "scoring" | "norm" => {}
                "norm-window" => config.window = Window::parse(value).ok_or_else(invalid)?,
                "window-offset" => config.offset = Window::parse(value).ok_or_else(invalid)?,
                "reactive-bases" => config.reactive = BaseSet::parse(value)?,
                "norm-independent" => config.independent = value.parse().map_err(|_| invalid())?,
                "pseudocount" => config.pseudocount = value.parse().map_err(|_| invalid())?,
                "max-score" => config.max_score = value.parse().map_err(|_| invalid())?,
                "mean-coverage" => config.mean_coverage = value.parse().map_err(|_| invalid())?,
                "median-coverage" => config.median_coverage = value.parse().map_err(|_| invalid())?,
                "nan" => config.nan_threshold = value.parse().map_err(|_| invalid())?,
                "remap-reactivities" => config.remap = value.parse().map_err(|_| invalid())?,
                "max-untreated-mut" => {
                    config.max_untreated_mut = value.parse().map_err(|_| invalid())?
                }
                "raw" => config.raw = value.parse().map_err(|_| invalid())?,
                _ => {
                    return Err(ConfigError::UnknownKey {
                        file: file.clone(),
                        line: *line_no,
                        key: key.clone(),
                    }
                    .into());
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parameter bundle for the peak caller.
#[derive(Debug, Clone)]
pub struct PeakConfig {
    pub window: usize,
    pub offset: usize,
    pub enrichment: f64,
    pub pvalue: f64,
    pub pseudocount: f64,
    pub merge_distance: usize,
    pub mean_coverage: f64,
    pub median_coverage: f64,
}

impl PeakConfig {
    pub fn new(window: usize, offset: Option<usize>) -> Self {
        Self {
            window,
            offset: offset.unwrap_or_else(|| (window / 2).max(1)),
            enrichment: 3.0,
            pvalue: 0.05,
            pseudocount: 1.0,
            merge_distance: 0,
            mean_coverage: 0.0,
            median_coverage: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 10 {
            return Err(ConfigError::PeakWindowTooSmall(self.window));
        }
        if self.offset < 1 {
            return Err(ConfigError::BadOffset(self.offset));
        }
        if !(self.pvalue > 0.0 && self.pvalue <= 1.0) {
            return Err(ConfigError::BadPvalue(self.pvalue));
        }
        if !(self.enrichment >= 0.0 && self.enrichment.is_finite()) {
            return Err(ConfigError::BadEnrichment(self.enrichment));
        }
        if !(self.pseudocount > 0.0 && self.pseudocount.is_finite()) {
            return Err(ConfigError::BadPseudocount(self.pseudocount));
        }
        for threshold in [self.mean_coverage, self.median_coverage] {
            if !(threshold >= 0.0 && threshold.is_finite()) {
                return Err(ConfigError::BadCoverageThreshold(threshold));
            }
        }
        Ok(())
    }
}

/// Parameter bundle for the replicate combiner.
#[derive(Debug, Clone)]
pub struct CombineConfig {
    pub decimals: usize,
    pub stdev: bool,
}

impl CombineConfig {
    pub fn new(decimals: usize, stdev: bool) -> Self {
        Self { decimals, stdev }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decimals < 1 || self.decimals > 10 {
            return Err(ConfigError::BadDecimals(self.decimals));
        }
        Ok(())
    }
}
