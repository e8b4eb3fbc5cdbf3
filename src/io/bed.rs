use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// One merged enriched region. Coordinates are half-open on the right.
#[derive(Debug, Clone)]
pub struct PeakRecord {
    pub id: String,
    pub start: usize,
    pub end: usize,
    pub score: f64,
    pub pvalue: f64,
}

/// Write peak records as BED, sorted ascending by (transcript, start).
pub fn write_bed(path: &Path, records: &mut Vec<PeakRecord>) -> Result<()> {
    records.sort_by(|a, b| a.id.cmp(&b.id).then(a.start.cmp(&b.start)));

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut w = BufWriter::new(file);
    for record in records.iter() {
        writeln!(
            w,
            "{}\t{}\t{}\t{:.3}\t{:.3e}",
            record.id, record.start, record.end, record.score, record.pvalue
        )?;
    }
    w.flush()?;
    Ok(())
}
