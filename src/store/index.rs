//! RCI offset index: `name-length: u32 LE`, `name: bytes`,
//! `offset: u64 LE` per transcript, in store order.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::store::layout;

#[derive(Debug, Default)]
pub struct RcIndex {
    order: Vec<String>,
    offsets: HashMap<String, u64>,
}

impl RcIndex {
    /// Index file path for a store: the `.rci` sibling of the source.
    pub fn path_for(store: &Path) -> PathBuf {
        let mut os = store.as_os_str().to_owned();
        os.push(".rci");
        PathBuf::from(os)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("failed to read index {}", path.display()))?;
        let mut index = Self::default();
        let mut pos = 0usize;
        while pos < bytes.len() {
            let name_len = read_u32(&bytes, &mut pos)? as usize;
            let name_bytes = take(&bytes, &mut pos, name_len)?;
            let name = std::str::from_utf8(name_bytes)
                .map_err(|_| anyhow::anyhow!("non-UTF-8 name in index {}", path.display()))?
                .to_string();
            let raw = take(&bytes, &mut pos, 8)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(raw);
            index.insert(name, u64::from_le_bytes(buf))?;
        }
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create index {}", path.display()))?;
        let mut w = BufWriter::new(file);
        for name in &self.order {
            w.write_all(&(name.len() as u32).to_le_bytes())?;
            w.write_all(name.as_bytes())?;
            w.write_all(&self.offsets[name].to_le_bytes())?;
        }
        w.flush()?;
        Ok(())
    }

    /// Rebuild the index by scanning a store front to back.
    pub fn scan(store: &[u8]) -> Result<Self> {
        let mut index = Self::default();
        let mut pos = 0usize;
        while pos < store.len() {
            let offset = pos as u64;
            let (name, next) = layout::skip_record(store, pos)?;
            index.insert(name, offset)?;
            pos = next;
        }
        Ok(index)
    }

    pub fn insert(&mut self, name: String, offset: u64) -> Result<()> {
        if self.offsets.contains_key(&name) {
            bail!("duplicate transcript {} in store", name);
        }
        self.order.push(name.clone());
        self.offsets.insert(name, offset);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<u64> {
        self.offsets.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32> {
    let raw = take(bytes, pos, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| anyhow::anyhow!("truncated index entry at offset {}", pos))?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}
