use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::store::index::RcIndex;
use crate::store::layout;

/// Sequential RC writer. Records are appended in call order; `finish`
/// emits the `.rci` index alongside the store.
pub struct RcWriter {
    w: BufWriter<File>,
    path: PathBuf,
    offset: u64,
    index: RcIndex,
}

impl RcWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create store {}", path.display()))?;
        Ok(Self {
            w: BufWriter::new(file),
            path: path.to_path_buf(),
            offset: 0,
            index: RcIndex::default(),
        })
    }

    pub fn write(
        &mut self,
        id: &str,
        sequence: &str,
        counts: &[u32],
        coverage: &[u32],
    ) -> Result<()> {
        if id.is_empty() {
            bail!("transcript id must not be empty");
        }
        if counts.len() != sequence.len() || coverage.len() != sequence.len() {
            bail!(
                "transcript {}: vector lengths ({}, {}) do not match sequence length {}",
                id,
                counts.len(),
                coverage.len(),
                sequence.len()
            );
        }

        let packed = layout::pack_sequence(sequence)?;
        self.index.insert(id.to_string(), self.offset)?;

        self.w.write_all(&(id.len() as u32).to_le_bytes())?;
        self.w.write_all(id.as_bytes())?;
        self.w.write_all(&(sequence.len() as u32).to_le_bytes())?;
        self.w.write_all(&packed)?;
        for value in counts {
            self.w.write_all(&value.to_le_bytes())?;
        }
        for value in coverage {
            self.w.write_all(&value.to_le_bytes())?;
        }

        self.offset += 4 + id.len() as u64 + 4 + packed.len() as u64 + sequence.len() as u64 * 8;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.w.flush()?;
        self.index.save(&RcIndex::path_for(&self.path))
    }
}
