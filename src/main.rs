//! Binary entry point for the `tsq` command-line tool.

use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    ExitCode::from(turbosqueeze::cli::run(&args) as u8)
}
