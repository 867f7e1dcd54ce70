// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error types for the simdex engine.
//!
//! One enum for the whole crate. The variants mirror the failure surface of
//! the on-disk engine: opening a database can be refused, a mapped image can
//! turn out to be corrupt, an insert can yield nothing to index, and the
//! overlap join has one internal postcondition whose violation is a bug
//! rather than bad data.

use thiserror::Error;

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for simdex operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A file could not be opened as a database: wrong magic, refused
    /// byte order, unsupported stream version, or a bad character width.
    #[error("cannot open database: {0}")]
    OpenFailure(String),

    /// A mapped image violates the format's internal invariants.
    #[error("database corrupted: {0}")]
    FormatCorruption(String),

    /// The inserted string produced no n-gram features; the entry was not
    /// indexed and the entry count is unchanged.
    #[error("string yields an empty feature set")]
    EmptyFeatures,

    /// The candidate set survived a complete intersect phase. This is a
    /// bug in the overlap join, not a property of the data.
    #[error("overlap join postcondition violated: {0}")]
    LogicError(String),

    /// Invalid similarity measure name or threshold.
    #[error("invalid similarity parameters: {0}")]
    Measure(String),

    /// The writer saw an earlier failure and refuses further work.
    #[error("writer is unusable after an earlier failure: {0}")]
    Failed(String),
}
