// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Immutable on-disk hash table ("CDBM" chunks).
//!
//! Each per-cardinality index is one chunk: a constant-database variant with
//! 256 open-addressing hash tables selected by the low byte of a
//! SuperFastHash value. Records are written straight to disk as they
//! arrive; the tables and the header are only materialized on close, so a
//! writer never buffers values in memory.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ HEADER (16 bytes)                                        │
//! │   magic: [u8; 4] = "CDBM"                                │
//! │   version: u32 = 1                                       │
//! │   size: u32 (whole chunk, including this header)         │
//! │   byteorder: u32 = 0x62445371                            │
//! ├──────────────────────────────────────────────────────────┤
//! │ 256 × TABLE REF { offset: u32, num: u32 }                │
//! ├──────────────────────────────────────────────────────────┤
//! │ DATA: repeated { ksize: u32, key, vsize: u32, value }    │
//! ├──────────────────────────────────────────────────────────┤
//! │ 256 × HASH TABLE: { hash: u32, offset: u32 } slots,      │
//! │   sized at twice the table's occupancy                   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Offset 0 marks a vacant slot. No record can ever sit at offset 0 (the
//! header region occupies it), so the sentinel is unambiguous. Lookups
//! probe linearly from `(hash >> 8) % num` and stop at the first vacant
//! slot; because every table keeps half its slots empty, the probe
//! terminates on any well-formed chunk.

mod reader;
mod writer;

pub use reader::CdbReader;
pub use writer::CdbWriter;

/// Chunk magic: "CDBM".
pub const MAGIC: [u8; 4] = *b"CDBM";

/// Chunk format version.
pub const VERSION: u32 = 1;

/// Byte-order sentinel; a mismatch means the file was written on a
/// machine with the opposite endianness and must be refused.
pub const BYTEORDER_CHECK: u32 = 0x6244_5371;

/// Number of hash tables per chunk.
pub const NUM_TABLES: usize = 256;

/// Chunk header size in bytes.
pub(crate) const HEADER_SIZE: usize = 16;

/// Offset of the first record: header plus the table-ref array.
pub(crate) const DATA_BEGIN: usize = HEADER_SIZE + 8 * NUM_TABLES;
