// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Approximate string retrieval over character n-gram feature sets.
//!
//! Strings are indexed at build time into an inverted index partitioned by
//! feature-set cardinality; queries return every indexed string whose
//! n-gram overlap with the query reaches a similarity threshold, without
//! scanning the collection. The retrieval algorithm is the CPMerge overlap
//! join of Okazaki & Tsujii.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌──────────────────────────┐
//! │ ngram.rs │──▶│ writer.rs │──▶│ <base>          (master)  │
//! │ (feature │   │ (indexer) │   │ <base>.<ℓ>.cdb (per-ℓ    │
//! │  sets)   │   └───────────┘   │     hash chunks, cdb/)    │
//! └──────────┘                   └──────────────────────────┘
//!       │          ┌────────────┐            │ mmap
//!       └─────────▶│ reader.rs  │◀───────────┘
//!                  │ (CPMerge,  │
//!   measure.rs ───▶│  retrieve) │
//!   (θ bounds, τ)  └────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use simdex::{CharSize, Measure, Reader, Writer};
//!
//! let mut writer = Writer::open("names.db".as_ref(), 3, false, CharSize::Byte)?;
//! writer.insert("Barack Hussein Obama II")?;
//! writer.insert("James Gordon Brown")?;
//! writer.close()?;
//!
//! let reader = Reader::open("names.db".as_ref())?;
//! let hits = reader.retrieve("Barack Obama", Measure::Cosine, 0.6)?;
//! assert_eq!(hits, vec!["Barack Hussein Obama II".to_string()]);
//! ```

pub mod cdb;
pub mod chars;
mod error;
pub mod hash;
mod master;
pub mod measure;
pub mod ngram;
mod reader;
mod writer;

pub use chars::CharSize;
pub use error::{Error, Result};
pub use measure::Measure;
pub use reader::{Hit, Reader};
pub use writer::Writer;
