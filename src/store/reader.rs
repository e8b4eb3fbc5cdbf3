use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use tracing::{info, warn};

use crate::store::RcEntry;
use crate::store::index::RcIndex;
use crate::store::layout;

/// Random-access reader over one RC store.
///
/// Each reader owns a private memory map; workers open their own
/// reader and never share file state.
pub struct RcReader {
    mmap: Mmap,
    index: RcIndex,
}

impl RcReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open store {}", path.display()))?;
        let mmap = unsafe {
            Mmap::map(&file).with_context(|| format!("failed to map store {}", path.display()))?
        };

        let index_path = RcIndex::path_for(path);
        let index = if index_path.exists() {
            match RcIndex::load(&index_path) {
                Ok(index) => index,
                Err(err) => {
                    warn!(index = %index_path.display(), error = %err, "index_unreadable_rebuilding");
                    Self::rebuild_index(&mmap, &index_path)?
                }
            }
        } else {
            info!(index = %index_path.display(), "index_missing_building");
            Self::rebuild_index(&mmap, &index_path)?
        };

        Ok(Self { mmap, index })
    }

    fn rebuild_index(mmap: &Mmap, index_path: &Path) -> Result<RcIndex> {
        let index = RcIndex::scan(mmap)?;
        if let Err(err) = index.save(index_path) {
            warn!(index = %index_path.display(), error = %err, "index_write_failed");
        }
        Ok(index)
    }

    /// Transcript identifiers in store order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.index.ids()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Random-access read of one transcript. `Ok(None)` when the id is
    /// not in the store; `Err` when the record exists but is corrupt.
    pub fn read(&self, id: &str) -> Result<Option<RcEntry>> {
        let Some(offset) = self.index.get(id) else {
            return Ok(None);
        };
        let (entry, _) = layout::read_record(&self.mmap, offset as usize)
            .with_context(|| format!("corrupt record for transcript {}", id))?;
        if entry.id != id {
            bail!(
                "index names transcript {} at offset {} but the record holds {}",
                id,
                offset,
                entry.id
            );
        }
        Ok(Some(entry))
    }
}
