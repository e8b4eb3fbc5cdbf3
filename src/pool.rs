//! Transcript-level worker pool and shared result counters.
//!
//! Work is embarrassingly parallel at transcript granularity: each
//! worker takes one identifier at a time, processes it to completion
//! on private file handles, and bumps shared counters. Counters are
//! atomics, so the increment never blocks a worker.

use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};

#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Build the fixed-size worker pool. `processors == 0` uses all cores.
pub fn build(processors: usize) -> Result<rayon::ThreadPool> {
    let threads = if processors == 0 {
        num_cpus::get()
    } else {
        processors
    };
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("failed to build worker pool")
}
