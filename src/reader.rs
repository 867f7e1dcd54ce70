//! Database reader and the CPMerge overlap join.
//!
//! Opening a database maps the master file and validates its header; the
//! per-cardinality hash chunks are mapped lazily, the first time a query
//! needs them. Each lazy slot is a one-shot initializer, so `retrieve` can
//! be called concurrently from several threads over one reader.
//!
//! A query with q features against candidates of cardinality ℓ must share
//! at least τ(q, ℓ, θ) grams. CPMerge exploits that bound twice:
//!
//! 1. **Union phase.** Any qualifying candidate misses at most q − τ of the
//!    query's grams, so it appears in at least one of any q − τ + 1 posting
//!    lists. Merging only the q − τ + 1 *shortest* lists (two-pointer, with
//!    per-candidate match counts) yields a complete candidate set while
//!    touching as few postings as possible.
//! 2. **Prune phase.** The remaining, longer lists are only binary-searched
//!    per surviving candidate. A candidate is dropped the moment even full
//!    matches in the unseen lists could no longer reach τ. Membership-only
//!    joins additionally admit it the moment its count reaches τ; scored
//!    retrieval instead carries it through every list, so the admitted
//!    count is the true intersection size rather than wherever the count
//!    stood at admission.
//!
//! In a membership join every candidate has been admitted or dropped after
//! the last list; a non-empty candidate set at that point is a bug in the
//! join, reported as [`Error::LogicError`].

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use memmap2::Mmap;

use crate::cdb::CdbReader;
use crate::chars::{self, CharSize};
use crate::error::{Error, Result};
use crate::master::{self, MasterHeader};
use crate::measure::Measure;
use crate::ngram;

/// A retrieved string together with its measured similarity.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    pub text: String,
    pub similarity: f64,
}

/// Mapped state of an open database; dropped on `close`.
#[derive(Debug)]
struct MapState {
    image: Mmap,
    /// `slots[l - 1]` holds the lazily opened index for cardinality l:
    /// `None` once probing found no index file for that cardinality.
    slots: Vec<OnceLock<Option<CdbReader>>>,
}

/// Read-only handle to a string database.
///
/// The configuration accessors remain usable after `close`; only retrieval
/// needs the mappings.
#[derive(Debug)]
pub struct Reader {
    base: PathBuf,
    char_size: CharSize,
    ngram_unit: usize,
    padded: bool,
    entry_count: u32,
    max_features: u32,
    state: Option<MapState>,
}

impl Reader {
    /// Open a database built by [`crate::Writer`].
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::OpenFailure(format!("{}: {e}", path.display()))
        })?;
        let len = file.metadata()?.len();
        let image = unsafe { Mmap::map(&file)? };
        let header = MasterHeader::decode(&image, len)?;

        let slots = (0..header.max_features).map(|_| OnceLock::new()).collect();
        Ok(Self {
            base: path.to_path_buf(),
            char_size: header.char_size,
            ngram_unit: header.ngram_unit as usize,
            padded: header.padded,
            entry_count: header.entry_count,
            max_features: header.max_features,
            state: Some(MapState { image, slots }),
        })
    }

    pub fn char_size(&self) -> CharSize {
        self.char_size
    }

    pub fn ngram_unit(&self) -> usize {
        self.ngram_unit
    }

    pub fn padded(&self) -> bool {
        self.padded
    }

    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    /// Largest feature-set cardinality in the database.
    pub fn max_feature_count(&self) -> u32 {
        self.max_features
    }

    /// Release every mapping. Further retrievals fail; closing again is a
    /// no-op.
    pub fn close(&mut self) {
        self.state = None;
    }

    /// Retrieve all strings whose similarity to `query` under `measure`
    /// reaches `threshold`. Results are ascending by identifier.
    pub fn retrieve(&self, query: &str, measure: Measure, threshold: f64) -> Result<Vec<String>> {
        let state = self.state()?;
        let matches =
            self.overlap_join(state, query, measure, threshold, JoinMode::Membership)?;
        matches
            .iter()
            .map(|m| master::resolve(&state.image, m.id, self.char_size))
            .collect()
    }

    /// Like [`Reader::retrieve`], but paired with the measured similarity
    /// of each hit, computed from the true overlap count.
    pub fn retrieve_scored(
        &self,
        query: &str,
        measure: Measure,
        threshold: f64,
    ) -> Result<Vec<Hit>> {
        let mut hits = Vec::new();
        self.retrieve_with(query, measure, threshold, |hit| hits.push(hit))?;
        Ok(hits)
    }

    /// Stream each hit into a consumer instead of collecting a vector.
    /// The consumer sees hits ascending by identifier.
    pub fn retrieve_with<F>(
        &self,
        query: &str,
        measure: Measure,
        threshold: f64,
        mut consumer: F,
    ) -> Result<()>
    where
        F: FnMut(Hit),
    {
        let state = self.state()?;
        // Full counting: the similarity reported per hit must come from
        // the complete intersection, not from wherever the count stood
        // when the candidate crossed τ.
        let matches = self.overlap_join(state, query, measure, threshold, JoinMode::FullCount)?;
        for m in &matches {
            let text = master::resolve(&state.image, m.id, self.char_size)?;
            consumer(Hit {
                text,
                similarity: measure.similarity(m.query_size, m.cardinality, m.overlap),
            });
        }
        Ok(())
    }

    /// True iff `retrieve` would return at least one string. Stops at the
    /// first admitted candidate.
    pub fn check(&self, query: &str, measure: Measure, threshold: f64) -> Result<bool> {
        let state = self.state()?;
        let matches =
            self.overlap_join(state, query, measure, threshold, JoinMode::FirstMatch)?;
        Ok(!matches.is_empty())
    }

    fn state(&self) -> Result<&MapState> {
        self.state
            .as_ref()
            .ok_or_else(|| Error::OpenFailure("reader is closed".into()))
    }

    /// Run the join for every admissible cardinality and collect admitted
    /// identifiers, ascending.
    fn overlap_join(
        &self,
        state: &MapState,
        query: &str,
        measure: Measure,
        threshold: f64,
        mode: JoinMode,
    ) -> Result<Vec<Match>> {
        measure.validate_threshold(threshold)?;

        let units = chars::encode_units(query, self.char_size);
        let features = ngram::feature_set(&units, self.ngram_unit, self.padded);
        let q = features.len();
        if q == 0 {
            return Ok(Vec::new());
        }
        let keys: Vec<Vec<u8>> = features
            .iter()
            .map(|gram| chars::units_to_bytes(gram, self.char_size))
            .collect();

        let lo = measure.min_feature_count(q, threshold).max(1);
        let hi = measure
            .max_feature_count(q, threshold)
            .min(self.max_features as usize);

        let mut admitted = Vec::new();
        for cardinality in lo..=hi {
            let Some(index) = self.index(state, cardinality)? else {
                continue;
            };

            let tau = measure.min_overlap(q, cardinality, threshold).max(1);
            if tau > q {
                // The bound already exceeds the query's own cardinality;
                // nothing at this ℓ can qualify.
                continue;
            }

            let mut posts = Vec::with_capacity(q);
            for key in &keys {
                posts.push(match index.get(key)? {
                    Some(value) => Postings::new(value)?,
                    None => Postings::empty(),
                });
            }
            // Short lists first: the union rounds then start from the
            // smallest candidate pool.
            posts.sort_by_key(Postings::len);

            let found = cpmerge(&posts, q, tau, mode)?;
            for (id, overlap) in found {
                admitted.push(Match {
                    id,
                    cardinality,
                    overlap,
                    query_size: q,
                });
            }
            if mode == JoinMode::FirstMatch && !admitted.is_empty() {
                return Ok(admitted);
            }
        }

        // Ids are unique across cardinalities (each string lives in exactly
        // one partition), so an ascending sort is the whole union step.
        admitted.sort_by_key(|m| m.id);
        Ok(admitted)
    }

    /// Fetch the index for one cardinality, opening and caching it on
    /// first use. A missing file is remembered as `None`; open errors are
    /// reported and retried on the next call.
    fn index<'a>(&self, state: &'a MapState, cardinality: usize) -> Result<Option<&'a CdbReader>> {
        let slot = &state.slots[cardinality - 1];
        if let Some(cached) = slot.get() {
            return Ok(cached.as_ref());
        }
        let path = master::index_path(&self.base, cardinality);
        let opened = match CdbReader::open(&path) {
            Ok(reader) => Some(reader),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e),
        };
        // Under a race the first stored value wins; a redundant mapping is
        // simply dropped.
        Ok(slot.get_or_init(|| opened).as_ref())
    }
}

/// How much counting the join does per candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum JoinMode {
    /// Return as soon as any candidate qualifies.
    FirstMatch,
    /// Admit candidates as soon as their count reaches τ; admitted counts
    /// may stop there.
    Membership,
    /// Carry every surviving candidate through all q lists, so admitted
    /// counts equal the true intersection size.
    FullCount,
}

/// One admitted candidate, before resolution to its string.
struct Match {
    id: u32,
    cardinality: usize,
    /// Matched-gram count. Exact only under [`JoinMode::FullCount`]; the
    /// other modes may stop counting at τ.
    overlap: usize,
    query_size: usize,
}

/// A posting list borrowed from a mapped chunk: packed little-endian u32
/// identifiers, strictly ascending.
struct Postings<'a> {
    bytes: &'a [u8],
}

impl<'a> Postings<'a> {
    fn new(bytes: &'a [u8]) -> Result<Self> {
        if bytes.len() % 4 != 0 {
            return Err(Error::FormatCorruption(
                "posting list size is not a multiple of 4".into(),
            ));
        }
        Ok(Self { bytes })
    }

    fn empty() -> Self {
        Self { bytes: &[] }
    }

    fn len(&self) -> usize {
        self.bytes.len() / 4
    }

    fn get(&self, i: usize) -> u32 {
        let p = i * 4;
        u32::from_le_bytes([
            self.bytes[p],
            self.bytes[p + 1],
            self.bytes[p + 2],
            self.bytes[p + 3],
        ])
    }

    fn contains(&self, id: u32) -> bool {
        let (mut lo, mut hi) = (0, self.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            match self.get(mid).cmp(&id) {
                std::cmp::Ordering::Less => lo = mid + 1,
                std::cmp::Ordering::Greater => hi = mid,
                std::cmp::Ordering::Equal => return true,
            }
        }
        false
    }
}

/// The overlap join over one cardinality's posting lists, sorted ascending
/// by length. Returns (id, overlap count) pairs with overlap ≥ `tau`.
fn cpmerge(
    posts: &[Postings<'_>],
    q: usize,
    tau: usize,
    mode: JoinMode,
) -> Result<Vec<(u32, usize)>> {
    debug_assert_eq!(posts.len(), q);
    debug_assert!(tau >= 1 && tau <= q);

    // Any qualifying candidate appears in at least one of the first k
    // lists.
    let k = q - tau + 1;

    // Union phase: two-pointer merges keep the candidate vector sorted by
    // id and count how many of the first k lists contain each candidate.
    let mut candidates: Vec<(u32, usize)> = Vec::new();
    for list in &posts[..k] {
        let mut merged = Vec::with_capacity(candidates.len() + list.len());
        let (mut a, mut b) = (0, 0);
        while a < candidates.len() || b < list.len() {
            if a == candidates.len() {
                merged.push((list.get(b), 1));
                b += 1;
            } else if b == list.len() {
                merged.push(candidates[a]);
                a += 1;
            } else {
                let id = list.get(b);
                match candidates[a].0.cmp(&id) {
                    std::cmp::Ordering::Less => {
                        merged.push(candidates[a]);
                        a += 1;
                    }
                    std::cmp::Ordering::Greater => {
                        merged.push((id, 1));
                        b += 1;
                    }
                    std::cmp::Ordering::Equal => {
                        merged.push((id, candidates[a].1 + 1));
                        a += 1;
                        b += 1;
                    }
                }
            }
        }
        candidates = merged;
    }

    // Prune phase: each remaining list contributes at most one match per
    // candidate, found by binary search.
    let mut results = Vec::new();
    let mut i = k;
    while i < q && !candidates.is_empty() {
        let remaining_after = q - i - 1;
        let mut surviving = Vec::with_capacity(candidates.len());
        for &(id, mut count) in &candidates {
            if posts[i].contains(id) {
                count += 1;
            }
            if count >= tau && mode != JoinMode::FullCount {
                results.push((id, count));
                if mode == JoinMode::FirstMatch {
                    return Ok(results);
                }
            } else if count + remaining_after >= tau {
                // Qualified candidates land here too under FullCount and
                // keep accumulating matches.
                surviving.push((id, count));
            }
        }
        candidates = surviving;
        i += 1;
    }

    if !candidates.is_empty() {
        if mode != JoinMode::FullCount && k < q {
            // The prune phase ran over every list yet failed to settle
            // every candidate; the final round always admits or drops.
            return Err(Error::LogicError(format!(
                "{} candidates left after the final round",
                candidates.len()
            )));
        }
        // Every count is final here: τ = 1 leaves the union-phase
        // candidates unexamined, and a full count carries qualifiers all
        // the way through the last list.
        for (id, count) in candidates {
            if count >= tau {
                results.push((id, count));
                if mode == JoinMode::FirstMatch {
                    return Ok(results);
                }
            }
        }
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn postings(lists: &[&[u32]]) -> Vec<Vec<u8>> {
        lists
            .iter()
            .map(|ids| {
                let mut bytes = Vec::with_capacity(ids.len() * 4);
                for id in *ids {
                    bytes.extend_from_slice(&id.to_le_bytes());
                }
                bytes
            })
            .collect()
    }

    fn run(lists: &[&[u32]], tau: usize) -> Vec<(u32, usize)> {
        let bytes = postings(lists);
        let mut posts: Vec<Postings<'_>> =
            bytes.iter().map(|b| Postings::new(b).unwrap()).collect();
        posts.sort_by_key(Postings::len);
        let mut out = cpmerge(&posts, lists.len(), tau, JoinMode::Membership).unwrap();
        out.sort_by_key(|&(id, _)| id);
        out
    }

    #[test]
    fn counts_overlaps_exactly() {
        // Candidate 10 appears in all three lists, 20 in two, 30 in one.
        let lists: [&[u32]; 3] = [&[10, 20], &[10, 20, 30], &[10]];
        assert_eq!(run(&lists, 3), vec![(10, 3)]);
        assert_eq!(run(&lists, 2), vec![(10, 3), (20, 2)]);
        assert_eq!(run(&lists, 1), vec![(10, 3), (20, 2), (30, 1)]);
    }

    #[test]
    fn tau_equal_to_q_uses_a_single_union_round() {
        let lists: [&[u32]; 4] = [&[1, 2, 3], &[2, 3], &[2, 3, 4], &[2]];
        assert_eq!(run(&lists, 4), vec![(2, 4)]);
    }

    #[test]
    fn empty_lists_prune_everything() {
        let lists: [&[u32]; 2] = [&[], &[]];
        assert_eq!(run(&lists, 1), vec![]);
    }

    #[test]
    fn first_match_stops_early() {
        let bytes = postings(&[&[1, 2, 3], &[1, 2, 3]]);
        let posts: Vec<Postings<'_>> =
            bytes.iter().map(|b| Postings::new(b).unwrap()).collect();
        let found = cpmerge(&posts, 2, 2, JoinMode::FirstMatch).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn full_count_mode_reports_true_intersections() {
        // Four singleton lists sharing one id. With τ = 3 a membership
        // join admits at count 3 and stops; the true intersection is 4.
        let lists: [&[u32]; 4] = [&[7], &[7], &[7], &[7]];
        let bytes = postings(&lists);
        let posts: Vec<Postings<'_>> =
            bytes.iter().map(|b| Postings::new(b).unwrap()).collect();

        let membership = cpmerge(&posts, 4, 3, JoinMode::Membership).unwrap();
        assert_eq!(membership, vec![(7, 3)]);

        let full = cpmerge(&posts, 4, 3, JoinMode::FullCount).unwrap();
        assert_eq!(full, vec![(7, 4)]);
    }

    #[test]
    fn misaligned_posting_bytes_are_corrupt() {
        assert!(matches!(
            Postings::new(&[1, 2, 3]),
            Err(Error::FormatCorruption(_))
        ));
    }

    #[test]
    fn postings_binary_search() {
        let bytes = postings(&[&[2, 4, 8, 16, 32]]);
        let list = Postings::new(&bytes[0]).unwrap();
        assert!(list.contains(2));
        assert!(list.contains(16));
        assert!(list.contains(32));
        assert!(!list.contains(1));
        assert!(!list.contains(5));
        assert!(!list.contains(64));
        assert!(!Postings::empty().contains(0));
    }
}
