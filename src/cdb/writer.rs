// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Streaming chunk writer.
//!
//! `put` writes each record to the data region immediately and only buffers
//! the (hash, offset) pair for its table. `finish` lays the tables out with
//! open addressing at twice their occupancy, appends them, and rewinds to
//! fill in the header and the 256 table refs. The tracked cursor is checked
//! against the real stream position before the tables are written; a
//! mismatch means some write went astray and the chunk must not be
//! finalized.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::hash::superfasthash;

use super::{BYTEORDER_CHECK, DATA_BEGIN, MAGIC, NUM_TABLES, VERSION};

/// Builder for one on-disk hash chunk. Records may be put in any order;
/// keys are expected to be unique (duplicates are not detected, matching
/// the constant-database contract).
pub struct CdbWriter {
    out: BufWriter<File>,
    /// Bytes written from the chunk start, tracked independently of the
    /// stream so close can verify write integrity.
    cursor: u32,
    /// Per-table (hash, record offset) pairs, resolved to slots on finish.
    tables: Vec<Vec<(u32, u32)>>,
}

impl CdbWriter {
    /// Create a chunk file, reserving the header and table-ref region.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        out.write_all(&[0u8; DATA_BEGIN])?;
        Ok(Self {
            out,
            cursor: DATA_BEGIN as u32,
            tables: vec![Vec::new(); NUM_TABLES],
        })
    }

    /// Append one record and remember where it landed.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        let record_len = 8 + key.len() as u64 + value.len() as u64;
        let end = u64::from(self.cursor) + record_len;
        if end > u64::from(u32::MAX) {
            return Err(Error::FormatCorruption(
                "hash chunk exceeds the 32-bit offset space".into(),
            ));
        }

        self.out.write_all(&(key.len() as u32).to_le_bytes())?;
        self.out.write_all(key)?;
        self.out.write_all(&(value.len() as u32).to_le_bytes())?;
        self.out.write_all(value)?;

        let hash = superfasthash(key);
        self.tables[(hash % NUM_TABLES as u32) as usize].push((hash, self.cursor));
        self.cursor = end as u32;
        Ok(())
    }

    /// Write the hash tables, the table refs, and the header.
    pub fn finish(self) -> Result<()> {
        let mut file = self
            .out
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;

        // The tracked cursor and the real stream position must agree before
        // anything else is written.
        let pos = file.stream_position()?;
        if pos != u64::from(self.cursor) {
            return Err(Error::FormatCorruption(format!(
                "inconsistent stream offset at close: tracked {}, actual {pos}",
                self.cursor
            )));
        }

        // Lay out each non-empty table at twice its occupancy. Offset 0 is
        // the vacancy sentinel; every record offset is >= DATA_BEGIN.
        let mut refs = [(0u32, 0u32); NUM_TABLES];
        let mut tail = Vec::new();
        let mut cursor = u64::from(self.cursor);
        for (i, entries) in self.tables.iter().enumerate() {
            if entries.is_empty() {
                continue;
            }
            let num = entries.len() * 2;
            let mut slots = vec![(0u32, 0u32); num];
            for &(hash, offset) in entries {
                let mut k = ((hash >> 8) as usize) % num;
                while slots[k].1 != 0 {
                    k = (k + 1) % num;
                }
                slots[k] = (hash, offset);
            }
            refs[i] = (cursor as u32, num as u32);
            for (hash, offset) in slots {
                tail.extend_from_slice(&hash.to_le_bytes());
                tail.extend_from_slice(&offset.to_le_bytes());
            }
            cursor += 8 * num as u64;
            if cursor > u64::from(u32::MAX) {
                return Err(Error::FormatCorruption(
                    "hash chunk exceeds the 32-bit offset space".into(),
                ));
            }
        }
        file.write_all(&tail)?;

        let mut head = Vec::with_capacity(DATA_BEGIN);
        head.extend_from_slice(&MAGIC);
        head.extend_from_slice(&VERSION.to_le_bytes());
        head.extend_from_slice(&(cursor as u32).to_le_bytes());
        head.extend_from_slice(&BYTEORDER_CHECK.to_le_bytes());
        for (offset, num) in refs {
            head.extend_from_slice(&offset.to_le_bytes());
            head.extend_from_slice(&num.to_le_bytes());
        }
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&head)?;
        file.sync_all()?;
        Ok(())
    }
}
