// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! CLI definitions for the simdex command-line interface.
//!
//! One binary, two modes. `--build` reads strings from stdin, one per
//! line, and writes a database; the default mode opens a database and runs
//! a retrieval for every stdin line. The remaining flags tune n-gram
//! generation at build time and the similarity measure at query time.

use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use simdex::Measure;

#[derive(Parser)]
#[command(
    name = "simdex",
    about = "Approximate string retrieval over character n-gram feature sets.\n\
             Finds database strings whose similarity to each query read from\n\
             STDIN reaches the threshold; with --build, indexes the strings\n\
             read from STDIN instead.",
    version,
    disable_version_flag = true
)]
pub struct Cli {
    /// Build a database from strings read from STDIN
    #[arg(short = 'b', long = "build")]
    pub build: bool,

    /// Database file
    #[arg(short = 'd', long = "database", value_name = "DB")]
    pub database: PathBuf,

    /// Store 4-byte code units (Unicode scalar values) when building
    #[arg(short = 'u', long = "unicode")]
    pub unicode: bool,

    /// Code unit width in bytes when building: 1, 2, or 4
    #[arg(long = "char-size", value_name = "N", conflicts_with = "unicode")]
    pub char_size: Option<u32>,

    /// Unit of n-grams
    #[arg(short = 'n', long = "ngram", value_name = "N", default_value_t = 3)]
    pub ngram: usize,

    /// Include marks for the begins and ends of strings
    #[arg(short = 'm', long = "mark")]
    pub mark: bool,

    /// Similarity measure: exact, dice, cosine, jaccard, or overlap
    #[arg(
        short = 's',
        long = "similarity",
        value_name = "SIM",
        default_value = "cosine",
        value_parser = parse_measure
    )]
    pub similarity: Measure,

    /// Similarity threshold
    #[arg(short = 't', long = "threshold", value_name = "TH", default_value_t = 0.7)]
    pub threshold: f64,

    /// Echo back query strings to the output
    #[arg(short = 'e', long = "echo-back")]
    pub echo_back: bool,

    /// Suppress supplemental information from the output
    #[arg(short = 'q', long = "quiet")]
    pub quiet: bool,

    /// Show benchmark results (retrieved strings are suppressed)
    #[arg(short = 'p', long = "benchmark")]
    pub benchmark: bool,

    /// Show version information and exit
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    pub version: Option<bool>,
}

fn parse_measure(s: &str) -> Result<Measure, String> {
    Measure::from_str(s).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_classic_frontend() {
        let cli = Cli::parse_from(["simdex", "-d", "names.db"]);
        assert!(!cli.build);
        assert_eq!(cli.ngram, 3);
        assert!(!cli.mark);
        assert_eq!(cli.similarity, Measure::Cosine);
        assert!((cli.threshold - 0.7).abs() < f64::EPSILON);
        assert!(!cli.unicode);
    }

    #[test]
    fn build_flags_parse() {
        let cli = Cli::parse_from([
            "simdex", "-b", "-d", "db", "-n", "2", "-m", "-u", "-q",
        ]);
        assert!(cli.build);
        assert_eq!(cli.ngram, 2);
        assert!(cli.mark);
        assert!(cli.unicode);
        assert!(cli.quiet);
    }

    #[test]
    fn measure_names_parse() {
        for name in ["exact", "dice", "cosine", "jaccard", "overlap"] {
            let cli = Cli::parse_from(["simdex", "-d", "db", "-s", name]);
            assert_eq!(cli.similarity.to_string(), name);
        }
        assert!(Cli::try_parse_from(["simdex", "-d", "db", "-s", "hamming"]).is_err());
    }

    #[test]
    fn unicode_conflicts_with_explicit_char_size() {
        assert!(Cli::try_parse_from(["simdex", "-d", "db", "-u", "--char-size", "2"]).is_err());
    }
}
