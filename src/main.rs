// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! simdex CLI: build and query approximate string retrieval databases.
//!
//! ```bash
//! # Build a database from one string per line
//! simdex --build -d names.db < names.txt
//!
//! # Retrieve similar strings for each query line
//! simdex -d names.db -s cosine -t 0.6 < queries.txt
//! ```

use std::io::{self, BufRead, Write};
use std::time::Instant;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use simdex::{CharSize, Error, Measure, Reader, Result, Writer};

mod cli;
use cli::Cli;

fn main() {
    let cli = Cli::parse();
    let outcome = if cli.build { build(&cli) } else { retrieve(&cli) };
    if let Err(e) = outcome {
        eprintln!("ERROR: {e}");
        std::process::exit(1);
    }
}

fn char_size_from_flags(cli: &Cli) -> Result<CharSize> {
    if cli.unicode {
        return Ok(CharSize::Utf32);
    }
    match cli.char_size {
        None => Ok(CharSize::Byte),
        Some(width) => CharSize::from_width(width).ok_or_else(|| {
            Error::OpenFailure(format!("invalid --char-size {width} (expected 1, 2, or 4)"))
        }),
    }
}

fn build(cli: &Cli) -> Result<()> {
    let char_size = char_size_from_flags(cli)?;
    if !cli.quiet {
        println!("Constructing the database");
        println!("Database name: {}", cli.database.display());
        println!("N-gram length: {}", cli.ngram);
        println!("Begin/end marks: {}", cli.mark);
        println!("Character width: {} byte(s)", char_size.width());
    }

    let started = Instant::now();
    let mut writer = Writer::open(&cli.database, cli.ngram, cli.mark, char_size)?;

    let progress = if cli.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {pos} strings indexed")
                .unwrap(),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        bar
    };

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        writer.insert(&line)?;
        progress.inc(1);
    }

    progress.set_message("flushing");
    writer.close()?;
    progress.finish_and_clear();

    if !cli.quiet {
        println!("Total number of strings: {}", writer.entry_count());
        println!("Seconds required: {:.3}", started.elapsed().as_secs_f64());
    }
    Ok(())
}

fn retrieve(cli: &Cli) -> Result<()> {
    let reader = Reader::open(&cli.database)?;
    let measure: Measure = cli.similarity;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut num_queries = 0u64;
    let mut num_retrieved = 0u64;
    let mut total = std::time::Duration::ZERO;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let clock = Instant::now();
        let results = reader.retrieve(&line, measure, cli.threshold)?;
        let elapsed = clock.elapsed();

        total += elapsed;
        num_retrieved += results.len() as u64;
        num_queries += 1;

        if !cli.benchmark {
            if cli.echo_back {
                writeln!(out, "{line}")?;
            }
            for hit in &results {
                writeln!(out, "\t{hit}")?;
            }
            out.flush()?;
        }
        if !cli.quiet {
            writeln!(
                out,
                "{} strings retrieved ({:.6} sec)",
                results.len(),
                elapsed.as_secs_f64()
            )?;
        }
    }

    if cli.benchmark && num_queries > 0 {
        writeln!(out, "Total number of queries: {num_queries}")?;
        writeln!(
            out,
            "Seconds per query: {:.6}",
            total.as_secs_f64() / num_queries as f64
        )?;
        writeln!(
            out,
            "Number of retrieved strings per query: {:.3}",
            num_retrieved as f64 / num_queries as f64
        )?;
    }
    Ok(())
}
