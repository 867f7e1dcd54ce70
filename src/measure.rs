//! Similarity measures and the bounds they induce.
//!
//! For a query with q features and a candidate with ℓ features sharing c of
//! them, each measure defines a similarity in [0, 1] plus three derived
//! bounds that drive the search: the admissible candidate cardinality range
//! [ℓ_min, ℓ_max] for a threshold θ, and the minimum overlap τ(q, ℓ, θ) a
//! candidate of cardinality ℓ must reach. The bounds are tight: a candidate
//! outside the range, or below τ, cannot meet the threshold, and one at or
//! above τ always does.
//!
//! | measure | sim(q, ℓ, c)   |
//! |---------|----------------|
//! | exact   | 1 iff c = q = ℓ |
//! | dice    | 2c / (q + ℓ)   |
//! | cosine  | c / √(qℓ)      |
//! | jaccard | c / (q + ℓ − c) |
//! | overlap | c / min(q, ℓ)  |

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A similarity measure over n-gram feature sets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measure {
    Exact,
    Dice,
    Cosine,
    Jaccard,
    Overlap,
}

impl Measure {
    /// All measures, in CLI help order.
    pub const ALL: [Measure; 5] = [
        Measure::Exact,
        Measure::Dice,
        Measure::Cosine,
        Measure::Jaccard,
        Measure::Overlap,
    ];

    /// Smallest candidate cardinality that can reach the threshold.
    pub fn min_feature_count(self, q: usize, theta: f64) -> usize {
        match self {
            Measure::Exact => q,
            Measure::Dice => (theta * q as f64 / (2.0 - theta)).ceil() as usize,
            Measure::Cosine => (theta * theta * q as f64).ceil() as usize,
            Measure::Jaccard => (theta * q as f64).ceil() as usize,
            Measure::Overlap => 1,
        }
    }

    /// Largest candidate cardinality that can reach the threshold.
    /// Unbounded for the overlap coefficient; callers clamp to the largest
    /// cardinality present in the database.
    pub fn max_feature_count(self, q: usize, theta: f64) -> usize {
        match self {
            Measure::Exact => q,
            Measure::Dice => ((2.0 - theta) * q as f64 / theta).floor() as usize,
            Measure::Cosine => (q as f64 / (theta * theta)).floor() as usize,
            Measure::Jaccard => (q as f64 / theta).floor() as usize,
            Measure::Overlap => usize::MAX,
        }
    }

    /// Minimum shared-feature count τ(q, ℓ, θ) for a candidate of
    /// cardinality `l` to meet the threshold.
    pub fn min_overlap(self, q: usize, l: usize, theta: f64) -> usize {
        match self {
            Measure::Exact => q,
            Measure::Dice => (0.5 * theta * (q + l) as f64).ceil() as usize,
            Measure::Cosine => (theta * ((q * l) as f64).sqrt()).ceil() as usize,
            Measure::Jaccard => (theta * (q + l) as f64 / (1.0 + theta)).ceil() as usize,
            Measure::Overlap => (theta * q.min(l) as f64).ceil() as usize,
        }
    }

    /// The similarity value itself, computed from (q, ℓ, c).
    pub fn similarity(self, q: usize, l: usize, c: usize) -> f64 {
        match self {
            Measure::Exact => {
                if c == q && q == l {
                    1.0
                } else {
                    0.0
                }
            }
            Measure::Dice => 2.0 * c as f64 / (q + l) as f64,
            Measure::Cosine => c as f64 / ((q * l) as f64).sqrt(),
            Measure::Jaccard => c as f64 / (q + l - c) as f64,
            Measure::Overlap => c as f64 / q.min(l) as f64,
        }
    }

    /// θ must lie in (0, 1]; exact matching ignores it.
    pub fn validate_threshold(self, theta: f64) -> Result<()> {
        if self == Measure::Exact || (theta > 0.0 && theta <= 1.0) {
            Ok(())
        } else {
            Err(Error::Measure(format!(
                "threshold must be in (0, 1], got {theta}"
            )))
        }
    }
}

impl FromStr for Measure {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "exact" => Ok(Measure::Exact),
            "dice" => Ok(Measure::Dice),
            "cosine" => Ok(Measure::Cosine),
            "jaccard" => Ok(Measure::Jaccard),
            "overlap" => Ok(Measure::Overlap),
            other => Err(Error::Measure(format!(
                "unknown similarity measure '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Measure::Exact => "exact",
            Measure::Dice => "dice",
            Measure::Cosine => "cosine",
            Measure::Jaccard => "jaccard",
            Measure::Overlap => "overlap",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_pins_everything_to_q() {
        assert_eq!(Measure::Exact.min_feature_count(7, 0.3), 7);
        assert_eq!(Measure::Exact.max_feature_count(7, 0.3), 7);
        assert_eq!(Measure::Exact.min_overlap(7, 7, 0.3), 7);
        assert_eq!(Measure::Exact.similarity(7, 7, 7), 1.0);
        assert_eq!(Measure::Exact.similarity(7, 7, 6), 0.0);
        assert_eq!(Measure::Exact.similarity(7, 8, 7), 0.0);
    }

    #[test]
    fn cosine_bounds() {
        // q = 10, θ = 0.6: ℓ_min = ⌈3.6⌉ = 4, ℓ_max = ⌊27.7…⌋ = 27.
        assert_eq!(Measure::Cosine.min_feature_count(10, 0.6), 4);
        assert_eq!(Measure::Cosine.max_feature_count(10, 0.6), 27);
        // τ(10, 21) = ⌈0.6·√210⌉ = 9.
        assert_eq!(Measure::Cosine.min_overlap(10, 21, 0.6), 9);
    }

    #[test]
    fn dice_bounds() {
        // q = 5, θ = 0.5: ℓ_min = ⌈2.5/1.5⌉ = 2, ℓ_max = ⌊7.5/0.5⌋ = 15.
        assert_eq!(Measure::Dice.min_feature_count(5, 0.5), 2);
        assert_eq!(Measure::Dice.max_feature_count(5, 0.5), 15);
        assert_eq!(Measure::Dice.min_overlap(5, 7, 0.5), 3);
    }

    #[test]
    fn jaccard_bounds() {
        assert_eq!(Measure::Jaccard.min_feature_count(10, 0.5), 5);
        assert_eq!(Measure::Jaccard.max_feature_count(10, 0.5), 20);
        // τ(10, 14) = ⌈0.5·24/1.5⌉ = 8.
        assert_eq!(Measure::Jaccard.min_overlap(10, 14, 0.5), 8);
    }

    #[test]
    fn overlap_is_unbounded_above() {
        assert_eq!(Measure::Overlap.min_feature_count(10, 0.9), 1);
        assert_eq!(Measure::Overlap.max_feature_count(10, 0.9), usize::MAX);
        assert_eq!(Measure::Overlap.min_overlap(3, 21, 1.0), 3);
    }

    #[test]
    fn tau_is_tight_for_the_similarity() {
        // For every measure and a grid of (q, ℓ), c = τ meets the threshold
        // and c = τ − 1 does not.
        let theta = 0.6;
        for measure in [Measure::Dice, Measure::Cosine, Measure::Jaccard, Measure::Overlap] {
            for q in 1..=12usize {
                let lo = measure.min_feature_count(q, theta).max(1);
                let hi = measure.max_feature_count(q, theta).min(16);
                for l in lo..=hi {
                    let tau = measure.min_overlap(q, l, theta);
                    if tau <= q.min(l) {
                        assert!(
                            measure.similarity(q, l, tau) >= theta - 1e-9,
                            "{measure} q={q} l={l} tau={tau}"
                        );
                    }
                    if tau >= 1 {
                        assert!(
                            measure.similarity(q, l, tau - 1) < theta + 1e-9,
                            "{measure} q={q} l={l} tau={tau}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn parse_and_display_roundtrip() {
        for measure in Measure::ALL {
            assert_eq!(measure.to_string().parse::<Measure>().unwrap(), measure);
        }
        assert!("euclidean".parse::<Measure>().is_err());
    }

    #[test]
    fn threshold_validation() {
        assert!(Measure::Cosine.validate_threshold(0.0).is_err());
        assert!(Measure::Cosine.validate_threshold(1.1).is_err());
        assert!(Measure::Cosine.validate_threshold(1.0).is_ok());
        // Exact ignores the threshold entirely.
        assert!(Measure::Exact.validate_threshold(42.0).is_ok());
    }
}
