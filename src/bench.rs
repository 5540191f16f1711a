//! In-memory benchmark mode (`tsq benchmark`).
//!
//! Runs memory-to-memory jobs through the pipelines so there is no file
//! I/O in the measured path, across the level and extensions matrix, and
//! reports throughput and ratio per configuration.  Every run is verified
//! against the original bytes; a mismatch is a hard failure.

use crate::config::BLOCK_SIZE;
use crate::corpus;
use crate::pipeline::{Compressor, Decompressor, Sink, SinkResult, Source};
use crate::timefn::{clock_span_ns, get_time, rate_mb_per_s};

/// Levels exercised by the benchmark.
const LEVELS: [u32; 4] = [0, 1, 2, 3];

struct CorpusCase {
    name: &'static str,
    data: Vec<u8>,
}

fn corpus_cases() -> Vec<CorpusCase> {
    let mut paragraphs = Vec::with_capacity(4 * BLOCK_SIZE);
    while paragraphs.len() < 4 * BLOCK_SIZE {
        paragraphs.extend_from_slice(corpus::PLACEHOLDER_NAMES);
    }
    vec![
        CorpusCase {
            name: "sawtooth",
            data: corpus::sawtooth(1 << 24),
        },
        CorpusCase {
            name: "text",
            data: paragraphs,
        },
        CorpusCase {
            name: "random",
            data: corpus::random_bytes(0x5EED, 1 << 22),
        },
    ]
}

/// Run the full benchmark matrix.  Returns `false` when any round-trip
/// failed to reproduce its input.
pub fn run_benchmark(n_workers: Option<usize>) -> bool {
    let compressor = match n_workers {
        Some(n) => Compressor::with_workers(n),
        None => Compressor::new(),
    };
    let decompressor = match n_workers {
        Some(n) => Decompressor::with_workers(n),
        None => Decompressor::new(),
    };

    let mut all_ok = true;
    for case in corpus_cases() {
        for level in LEVELS {
            for extensions in [false, true] {
                all_ok &= run_case(&compressor, &decompressor, &case, level, extensions);
            }
        }
    }
    all_ok
}

fn run_case(
    compressor: &Compressor,
    decompressor: &Decompressor,
    case: &CorpusCase,
    level: u32,
    extensions: bool,
) -> bool {
    let start = get_time();
    let outcome = compressor.compress(
        Source::Memory(case.data.clone()),
        Sink::Memory,
        extensions,
        level,
    );
    let compress_ns = clock_span_ns(start);

    let compressed = match outcome.output {
        Some(SinkResult::Memory(buf)) if outcome.success => buf,
        _ => {
            println!("{:>9} L{} ext={}: compression failed", case.name, level, extensions);
            return false;
        }
    };
    let ratio = case.data.len() as f64 / compressed.len() as f64;

    let start = get_time();
    let outcome = decompressor.decompress(Source::Memory(compressed), Sink::Memory);
    let decompress_ns = clock_span_ns(start);

    let decoded = match outcome.output {
        Some(SinkResult::Memory(buf)) if outcome.success => buf,
        _ => {
            println!("{:>9} L{} ext={}: decompression failed", case.name, level, extensions);
            return false;
        }
    };
    if decoded != case.data {
        println!("{:>9} L{} ext={}: round-trip mismatch", case.name, level, extensions);
        return false;
    }

    println!(
        "{:>9} L{} ext={:<5} ratio {:6.2}x  enc {:8.1} MB/s  dec {:8.1} MB/s",
        case.name,
        level,
        extensions,
        ratio,
        rate_mb_per_s(case.data.len(), compress_ns),
        rate_mb_per_s(case.data.len(), decompress_ns),
    );
    true
}
