// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Memory-mapped chunk reader.
//!
//! The whole chunk is mapped read-only and validated once: magic, byte
//! order, version, the size field against the file, and every table ref
//! against the chunk bounds. After that, `get` is a hash, a linear probe,
//! and one key comparison; values come back as borrowed slices into the
//! mapping, valid for as long as the reader lives.

use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{Error, Result};
use crate::hash::superfasthash;

use super::{BYTEORDER_CHECK, DATA_BEGIN, HEADER_SIZE, MAGIC, NUM_TABLES, VERSION};

#[derive(Clone, Copy, Default, Debug)]
struct TableRef {
    offset: u32,
    /// Slot count; twice the number of records in the table.
    num: u32,
}

/// Read-only view of one on-disk hash chunk.
#[derive(Debug)]
pub struct CdbReader {
    map: Mmap,
    tables: [TableRef; NUM_TABLES],
}

impl CdbReader {
    /// Map and validate a chunk file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let map = unsafe { Mmap::map(&file)? };
        Self::from_map(map).map_err(|e| match e {
            Error::OpenFailure(msg) => {
                Error::OpenFailure(format!("{}: {msg}", path.display()))
            }
            Error::FormatCorruption(msg) => {
                Error::FormatCorruption(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    fn from_map(map: Mmap) -> Result<Self> {
        let buf = &map[..];
        if buf.len() < DATA_BEGIN {
            return Err(Error::FormatCorruption(
                "chunk smaller than its header region".into(),
            ));
        }
        if buf[0..4] != MAGIC {
            return Err(Error::OpenFailure("wrong chunk magic".into()));
        }
        // Byte order first: no other field is meaningful if it differs.
        if read_u32(buf, 12) != BYTEORDER_CHECK {
            return Err(Error::OpenFailure(
                "byte-order sentinel mismatch; chunk written on an incompatible machine".into(),
            ));
        }
        let version = read_u32(buf, 4);
        if version != VERSION {
            return Err(Error::OpenFailure(format!(
                "unsupported chunk version {version} (expected {VERSION})"
            )));
        }
        let size = read_u32(buf, 8);
        if (size as usize) < DATA_BEGIN || (size as usize) > buf.len() {
            return Err(Error::FormatCorruption(format!(
                "chunk size field {size} disagrees with the {}-byte image",
                buf.len()
            )));
        }

        let mut tables = [TableRef::default(); NUM_TABLES];
        for (i, table) in tables.iter_mut().enumerate() {
            let offset = read_u32(buf, HEADER_SIZE + i * 8);
            let num = read_u32(buf, HEADER_SIZE + i * 8 + 4);
            if offset == 0 {
                continue;
            }
            let end = u64::from(offset) + 8 * u64::from(num);
            if (offset as usize) < DATA_BEGIN || end > u64::from(size) {
                return Err(Error::FormatCorruption(format!(
                    "hash table {i} lies outside the chunk"
                )));
            }
            *table = TableRef { offset, num };
        }

        Ok(Self { map, tables })
    }

    /// Look up a key. `Ok(None)` is a miss; `Err` means the chunk violates
    /// its own invariants.
    pub fn get(&self, key: &[u8]) -> Result<Option<&[u8]>> {
        let hash = superfasthash(key);
        let table = self.tables[(hash % NUM_TABLES as u32) as usize];
        if table.num == 0 {
            return Ok(None);
        }

        let buf = &self.map[..];
        let num = table.num as usize;
        let mut slot = ((hash >> 8) as usize) % num;
        for _ in 0..num {
            let base = table.offset as usize + slot * 8;
            let slot_hash = read_u32(buf, base);
            let offset = read_u32(buf, base + 4);
            if offset == 0 {
                return Ok(None);
            }
            if slot_hash == hash {
                if let Some(value) = self.record_value(offset, key)? {
                    return Ok(Some(value));
                }
            }
            slot = (slot + 1) % num;
        }
        // Every slot occupied: a well-formed writer leaves half of them
        // vacant, so the probe ring is corrupt.
        Err(Error::FormatCorruption(
            "hash table probe found no vacant slot".into(),
        ))
    }

    /// Check the record at `offset` against `key`; return its value slice
    /// on a match.
    fn record_value(&self, offset: u32, key: &[u8]) -> Result<Option<&[u8]>> {
        let buf = &self.map[..];
        let corrupt = || Error::FormatCorruption("record extends beyond the chunk".into());

        let pos = offset as usize;
        if pos.checked_add(4).map_or(true, |e| e > buf.len()) {
            return Err(corrupt());
        }
        let ksize = read_u32(buf, pos) as usize;
        let kstart = pos + 4;
        let kend = kstart.checked_add(ksize).ok_or_else(corrupt)?;
        if kend.checked_add(4).map_or(true, |e| e > buf.len()) {
            return Err(corrupt());
        }
        if ksize != key.len() || &buf[kstart..kend] != key {
            return Ok(None);
        }
        let vsize = read_u32(buf, kend) as usize;
        let vstart = kend + 4;
        let vend = vstart.checked_add(vsize).ok_or_else(corrupt)?;
        if vend > buf.len() {
            return Err(corrupt());
        }
        Ok(Some(&buf[vstart..vend]))
    }
}

fn read_u32(buf: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([buf[pos], buf[pos + 1], buf[pos + 2], buf[pos + 3]])
}
