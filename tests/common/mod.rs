//! Shared helpers for the integration tests: database fixtures and a
//! naïve O(|Σ|·|Q|) reference implementation to compare retrieval against.

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use simdex::{chars, ngram, CharSize, Measure, Writer};

/// Build a database under `dir` from the given strings.
pub fn build_db(
    dir: &Path,
    name: &str,
    strings: &[&str],
    n: usize,
    padded: bool,
    char_size: CharSize,
) -> PathBuf {
    let path = dir.join(name);
    let mut writer = Writer::open(&path, n, padded, char_size).unwrap();
    for s in strings {
        writer.insert(s).unwrap();
    }
    writer.close().unwrap();
    path
}

/// The feature set of a string, as a set of gram keys.
pub fn feature_keys(s: &str, n: usize, padded: bool, char_size: CharSize) -> HashSet<Vec<u32>> {
    ngram::feature_set(&chars::encode_units(s, char_size), n, padded)
        .into_iter()
        .collect()
}

/// Similarity computed by definition: featurize both strings, intersect,
/// and apply the measure. This is the reference the engine must agree
/// with.
pub fn naive_similarity(
    query: &str,
    target: &str,
    n: usize,
    padded: bool,
    char_size: CharSize,
    measure: Measure,
) -> f64 {
    let fq = feature_keys(query, n, padded, char_size);
    let ft = feature_keys(target, n, padded, char_size);
    if fq.is_empty() || ft.is_empty() {
        return 0.0;
    }
    let c = fq.intersection(&ft).count();
    measure.similarity(fq.len(), ft.len(), c)
}
