use std::cell::OnceCell;

use anyhow::{Result, bail};

use crate::math::stats;

pub mod index;
pub mod layout;
pub mod reader;
pub mod writer;

/// One transcript loaded from an RC store: per-base modification
/// counts and read coverage over the transcript sequence.
#[derive(Debug)]
pub struct RcEntry {
    pub id: String,
    pub sequence: String,
    pub counts: Vec<u32>,
    pub coverage: Vec<u32>,
    mean_cov: OnceCell<f64>,
    median_cov: OnceCell<f64>,
}

impl RcEntry {
    pub fn new(id: String, sequence: String, counts: Vec<u32>, coverage: Vec<u32>) -> Result<Self> {
        if counts.len() != sequence.len() || coverage.len() != sequence.len() {
            bail!(
                "transcript {}: vector lengths ({}, {}) do not match sequence length {}",
                id,
                counts.len(),
                coverage.len(),
                sequence.len()
            );
        }
        Ok(Self {
            id,
            sequence,
            counts,
            coverage,
            mean_cov: OnceCell::new(),
            median_cov: OnceCell::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn mean_coverage(&self) -> f64 {
        *self.mean_cov.get_or_init(|| {
            if self.coverage.is_empty() {
                return 0.0;
            }
            let sum: u64 = self.coverage.iter().map(|&c| c as u64).sum();
            sum as f64 / self.coverage.len() as f64
        })
    }

    pub fn median_coverage(&self) -> f64 {
        *self.median_cov.get_or_init(|| {
            let mut values: Vec<f64> = self.coverage.iter().map(|&c| c as f64).collect();
            stats::median(&mut values)
        })
    }
}
