//! Command-line argument parsing and dispatch for the `tsq` binary.
//!
//! ```text
//! tsq compress <input> <output> [--no-ext] [-l N] [-T N] [-v] [-q]
//! tsq decompress <input> <output> [-T N] [-v] [-q]
//! tsq benchmark [-T N]
//! ```
//!
//! Exit code 0 on success, 1 on usage or processing errors.

use std::path::PathBuf;

use anyhow::anyhow;

use crate::bench::run_benchmark;
use crate::display::{display, set_display_level};
use crate::pipeline::{Compressor, Decompressor, ProgressFn, Sink, Source};

const USAGE: &str = "\
usage: tsq compress <input> <output> [--no-ext] [-l N] [-T N] [-v] [-q]
       tsq decompress <input> <output> [-T N] [-v] [-q]
       tsq benchmark [-T N]

  --no-ext    disable the extended match lengths (32/48/64)
  -l N        compression level (0 = fastest; higher levels track more
              match candidates per symbol)
  -T N        number of worker threads (default: all cores)
  -v          verbose (per-block progress)
  -q          quiet
";

enum Command {
    Compress {
        input: PathBuf,
        output: PathBuf,
        extensions: bool,
        level: u32,
    },
    Decompress {
        input: PathBuf,
        output: PathBuf,
    },
    Benchmark,
}

struct Parsed {
    command: Command,
    workers: Option<usize>,
}

fn usage_error(msg: &str) -> i32 {
    display(1, &format!("tsq: {msg}\n"));
    display(1, USAGE);
    1
}

fn parse(args: &[String]) -> anyhow::Result<Parsed> {
    let mut positional: Vec<&str> = Vec::new();
    let mut extensions = true;
    let mut level = 0u32;
    let mut workers: Option<usize> = None;

    let mut iter = args.iter().map(String::as_str);
    while let Some(arg) = iter.next() {
        match arg {
            "--no-ext" => extensions = false,
            "-v" => set_display_level(3),
            "-q" => set_display_level(1),
            "-l" => {
                let value = iter.next().ok_or_else(|| anyhow!("-l requires a value"))?;
                level = value.parse().map_err(|_| anyhow!("invalid level"))?;
            }
            "-T" => {
                let value = iter.next().ok_or_else(|| anyhow!("-T requires a value"))?;
                let n: usize = value
                    .parse()
                    .map_err(|_| anyhow!("invalid thread count"))?;
                if n == 0 {
                    return Err(anyhow!("thread count must be at least 1"));
                }
                workers = Some(n);
            }
            flag if flag.starts_with('-') => return Err(anyhow!("unknown option {flag}")),
            positional_arg => positional.push(positional_arg),
        }
    }

    let command = match positional.first().copied() {
        Some("compress") => {
            let &[_, input, output] = &positional[..] else {
                return Err(anyhow!("compress takes <input> <output>"));
            };
            Command::Compress {
                input: input.into(),
                output: output.into(),
                extensions,
                level,
            }
        }
        Some("decompress") => {
            let &[_, input, output] = &positional[..] else {
                return Err(anyhow!("decompress takes <input> <output>"));
            };
            Command::Decompress {
                input: input.into(),
                output: output.into(),
            }
        }
        Some("benchmark") => {
            if positional.len() != 1 {
                return Err(anyhow!("benchmark takes no positional arguments"));
            }
            Command::Benchmark
        }
        Some(other) => return Err(anyhow!("unknown command {other}")),
        None => return Err(anyhow!("missing command")),
    };

    Ok(Parsed { command, workers })
}

fn progress_bar() -> ProgressFn {
    Box::new(|job_id, progress| {
        display(3, &format!("\rjob {job_id}: {:5.1}%", progress * 100.0));
        if progress >= 1.0 {
            display(3, "\n");
        }
    })
}

/// Entry point used by `main`; returns the process exit code.
pub fn run(args: &[String]) -> i32 {
    let parsed = match parse(args) {
        Ok(parsed) => parsed,
        Err(err) => return usage_error(&err.to_string()),
    };

    match parsed.command {
        Command::Compress {
            input,
            output,
            extensions,
            level,
        } => {
            let compressor = match parsed.workers {
                Some(n) => Compressor::with_workers(n),
                None => Compressor::new(),
            };
            let (tx, rx) = crossbeam_channel::bounded(1);
            let id = compressor.compress_async(
                Source::File(input.clone()),
                Sink::File(output.clone()),
                extensions,
                level,
                Some(Box::new(move |outcome| {
                    let _ = tx.send(outcome);
                })),
                Some(progress_bar()),
            );
            let outcome = rx.recv().expect("completion callback never fired");
            if id == 0 || !outcome.success {
                display(1, &format!("tsq: compression of {} failed\n", input.display()));
                return 1;
            }
            display(
                2,
                &format!("{} -> {}\n", input.display(), output.display()),
            );
            0
        }
        Command::Decompress { input, output } => {
            let decompressor = match parsed.workers {
                Some(n) => Decompressor::with_workers(n),
                None => Decompressor::new(),
            };
            let (tx, rx) = crossbeam_channel::bounded(1);
            let id = decompressor.decompress_async(
                Source::File(input.clone()),
                Sink::File(output.clone()),
                Some(Box::new(move |outcome| {
                    let _ = tx.send(outcome);
                })),
                Some(progress_bar()),
            );
            let outcome = rx.recv().expect("completion callback never fired");
            if id == 0 || !outcome.success {
                display(
                    1,
                    &format!("tsq: decompression of {} failed\n", input.display()),
                );
                return 1;
            }
            display(
                2,
                &format!("{} -> {}\n", input.display(), output.display()),
            );
            0
        }
        Command::Benchmark => {
            if run_benchmark(parsed.workers) {
                0
            } else {
                1
            }
        }
    }
}
