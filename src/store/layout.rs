//! RC record codec.
//!
//! Each record is laid out as
//!
//! ```text
//! name-length: u32 LE
//! name:        bytes
//! seq-length:  u32 LE
//! sequence:    2-bit packed, ceil(L / 4) bytes
//! counts:      L x u32 LE
//! coverage:    L x u32 LE
//! ```
//!
//! Bases pack MSB-first within a byte (A=00, C=01, G=10, T/U=11).
//! The 2-bit alphabet cannot carry N; it is stored as A, and decoding
//! always yields the DNA alphabet.

use anyhow::{Result, bail};

use crate::store::RcEntry;

pub fn packed_len(seq_len: usize) -> usize {
    seq_len.div_ceil(4)
}

pub fn pack_sequence(seq: &str) -> Result<Vec<u8>> {
    let mut packed = vec![0u8; packed_len(seq.len())];
    for (i, base) in seq.bytes().enumerate() {
        let code = match base.to_ascii_uppercase() {
            b'A' | b'N' => 0u8,
            b'C' => 1,
            b'G' => 2,
            b'T' | b'U' => 3,
            other => bail!("unsupported sequence character {:?}", other as char),
        };
        packed[i / 4] |= code << (6 - 2 * (i % 4));
    }
    Ok(packed)
}

pub fn unpack_sequence(packed: &[u8], seq_len: usize) -> String {
    const BASES: [char; 4] = ['A', 'C', 'G', 'T'];
    let mut seq = String::with_capacity(seq_len);
    for i in 0..seq_len {
        let code = (packed[i / 4] >> (6 - 2 * (i % 4))) & 0b11;
        seq.push(BASES[code as usize]);
    }
    seq
}

/// Parse one record starting at `offset`. Returns the entry together
/// with the offset of the next record. Every segment is bounds-checked
/// so a truncated or corrupt store fails here rather than downstream.
pub fn read_record(bytes: &[u8], offset: usize) -> Result<(RcEntry, usize)> {
    let mut pos = offset;
    let name_len = read_u32(bytes, &mut pos)? as usize;
    if name_len == 0 {
        bail!("record at offset {} has an empty name", offset);
    }
    let name_bytes = take(bytes, &mut pos, name_len)?;
    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| anyhow::anyhow!("record at offset {} has a non-UTF-8 name", offset))?
        .to_string();

    let seq_len = read_u32(bytes, &mut pos)? as usize;
    let packed = take(bytes, &mut pos, packed_len(seq_len))?;
    let sequence = unpack_sequence(packed, seq_len);

    let counts = read_u32_block(bytes, &mut pos, seq_len)?;
    let coverage = read_u32_block(bytes, &mut pos, seq_len)?;

    let entry = RcEntry::new(name, sequence, counts, coverage)?;
    Ok((entry, pos))
}

/// Walk a record without materializing its vectors; used when scanning
/// a store to rebuild the index. Returns the record name and the
/// offset of the next record.
pub fn skip_record(bytes: &[u8], offset: usize) -> Result<(String, usize)> {
    let mut pos = offset;
    let name_len = read_u32(bytes, &mut pos)? as usize;
    if name_len == 0 {
        bail!("record at offset {} has an empty name", offset);
    }
    let name_bytes = take(bytes, &mut pos, name_len)?;
    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| anyhow::anyhow!("record at offset {} has a non-UTF-8 name", offset))?
        .to_string();

    let seq_len = read_u32(bytes, &mut pos)? as usize;
    let body = packed_len(seq_len) + seq_len * 4 * 2;
    take(bytes, &mut pos, body)?;
    Ok((name, pos))
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32> {
    let raw = take(bytes, pos, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn read_u32_block(bytes: &[u8], pos: &mut usize, n: usize) -> Result<Vec<u32>> {
    let raw = take(bytes, pos, n * 4)?;
    Ok(raw
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

fn take<'a>(bytes: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "truncated record: need {} bytes at offset {}, store is {} bytes",
                len,
                pos,
                bytes.len()
            )
        })?;
    let slice = &bytes[*pos..end];
    *pos = end;
    Ok(slice)
}
