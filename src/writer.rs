// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Database writer.
//!
//! The writer owns the master output stream and one in-memory inverted
//! index per feature-set cardinality. Inserting a string appends it to the
//! master file (its byte offset becomes its identifier) and adds that
//! identifier to the posting list of every gram in its feature set, inside
//! the index for its cardinality. `close` serializes each non-empty index
//! to `<base>.<l>.cdb` and finalizes the master header.
//!
//! Posting lists come out sorted without ever sorting: identifiers are
//! byte offsets, offsets grow monotonically, and a feature set never
//! repeats a gram, so plain appends keep every list strictly ascending.
//!
//! The first write failure poisons the writer: later inserts and the close
//! report it, and no usable database is produced. Partially written files
//! are left on disk for external tooling to clean up.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::cdb::CdbWriter;
use crate::chars::{self, CharSize};
use crate::error::{Error, Result};
use crate::master::{self, MasterHeader, HEADER_SIZE};
use crate::ngram;

/// Builds a string database on disk.
pub struct Writer {
    base: PathBuf,
    out: BufWriter<File>,
    /// Next identifier: the master-file offset of the next string.
    offset: u32,
    entries: u32,
    /// `indexes[l - 1]` maps gram bytes to the posting list for
    /// cardinality l.
    indexes: Vec<BTreeMap<Vec<u8>, Vec<u32>>>,
    char_size: CharSize,
    ngram_unit: usize,
    padded: bool,
    first_error: Option<String>,
    closed: bool,
}

impl Writer {
    /// Create a database at `path`. The n-gram unit, the padding flag, and
    /// the character width are fixed for the database's lifetime and
    /// recorded in the master header.
    pub fn open(path: &Path, ngram_unit: usize, padded: bool, char_size: CharSize) -> Result<Self> {
        if ngram_unit == 0 {
            return Err(Error::OpenFailure("n-gram unit must be at least 1".into()));
        }
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);

        // Reserve the header region; the real values land on close.
        let placeholder = MasterHeader {
            size: 0,
            char_size,
            ngram_unit: ngram_unit as u32,
            padded,
            entry_count: 0,
            max_features: 0,
        };
        out.write_all(&placeholder.encode())?;

        Ok(Self {
            base: path.to_path_buf(),
            out,
            offset: HEADER_SIZE as u32,
            entries: 0,
            indexes: Vec::new(),
            char_size,
            ngram_unit,
            padded,
            first_error: None,
            closed: false,
        })
    }

    /// Insert one string. Fails with [`Error::EmptyFeatures`] if the string
    /// produces no n-grams; the entry count is unchanged in that case.
    pub fn insert(&mut self, s: &str) -> Result<()> {
        if self.closed {
            return Err(Error::Failed("writer is already closed".into()));
        }
        if let Some(msg) = &self.first_error {
            return Err(Error::Failed(msg.clone()));
        }

        let units = chars::encode_units(s, self.char_size);
        let features = ngram::feature_set(&units, self.ngram_unit, self.padded);
        if features.is_empty() {
            return Err(Error::EmptyFeatures);
        }

        let id = self.offset;
        let mut bytes = chars::units_to_bytes(&units, self.char_size);
        chars::push_unit(&mut bytes, 0, self.char_size);

        let end = u64::from(self.offset) + bytes.len() as u64;
        if end > u64::from(u32::MAX) {
            return self.fail("master file exceeds the 32-bit offset space");
        }
        if let Err(e) = self.out.write_all(&bytes) {
            return self.fail(&format!("failed to write to the master file: {e}"));
        }
        self.offset = end as u32;

        let cardinality = features.len();
        if self.indexes.len() < cardinality {
            self.indexes.resize_with(cardinality, BTreeMap::new);
        }
        let index = &mut self.indexes[cardinality - 1];
        for gram in &features {
            let key = chars::units_to_bytes(gram, self.char_size);
            index.entry(key).or_default().push(id);
        }
        self.entries += 1;
        Ok(())
    }

    /// Number of strings inserted so far.
    pub fn entry_count(&self) -> u32 {
        self.entries
    }

    /// Flush every per-cardinality index and finalize the master header.
    /// A no-op once it has succeeded.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if let Some(msg) = self.first_error.take() {
            self.closed = true;
            return Err(Error::Failed(msg));
        }

        for (i, index) in self.indexes.iter().enumerate() {
            if index.is_empty() {
                continue;
            }
            let path = master::index_path(&self.base, i + 1);
            let mut cdb = CdbWriter::create(&path)?;
            for (gram, ids) in index {
                let mut value = Vec::with_capacity(ids.len() * 4);
                for id in ids {
                    value.extend_from_slice(&id.to_le_bytes());
                }
                cdb.put(gram, &value)?;
            }
            cdb.finish()?;
        }

        self.out.flush()?;
        let header = MasterHeader {
            size: self.offset,
            char_size: self.char_size,
            ngram_unit: self.ngram_unit as u32,
            padded: self.padded,
            entry_count: self.entries,
            max_features: self.indexes.len() as u32,
        };
        let file = self.out.get_mut();
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&header.encode())?;
        file.sync_all()?;

        self.closed = true;
        Ok(())
    }

    fn fail(&mut self, msg: &str) -> Result<()> {
        self.first_error = Some(msg.to_string());
        Err(Error::Failed(msg.to_string()))
    }
}
