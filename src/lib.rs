//! `turbosqueeze` - a block-oriented lossless byte compressor with a fixed
//! wire format and a parallel reader / workers / writer pipeline.
//!
//! # Crate layout
//!
//! | Module      | Contents |
//! |-------------|----------|
//! | `block`     | Single-block codec: match index, encoder, decoder. |
//! | `container` | Stream header and per-block length prefixes. |
//! | `pipeline`  | Multi-threaded [`Compressor`] / [`Decompressor`] with sync and async submission. |
//! | `io`        | Single-threaded streaming and file-to-file helpers. |
//! | `config`    | Compile-time geometry and tuning constants. |
//! | `corpus`    | Deterministic test / benchmark data generators. |
//! | `bench`     | In-memory benchmark mode for the CLI. |
//! | `timefn`    | Monotonic timer used by the benchmark. |
//! | `display`   | Notification-level plumbing for the CLI. |
//! | `cli`       | Argument parsing and dispatch for `tsq`. |
//!
//! # Wire format
//!
//! A stream is a 16-byte header (`"TSQ1"`, little-endian block count,
//! little-endian total uncompressed size) followed by blocks.  Each block
//! carries a 24-bit little-endian length whose bit 23 flags the extended
//! match lengths, then its payload: a 3-byte uncompressed size and groups
//! of eight symbols - one control byte, and per symbol pair a size byte
//! followed by the pair's payloads.  Blocks are self-contained; nothing
//! references data across a block boundary.
//!
//! # Quick start
//!
//! ```no_run
//! use turbosqueeze::pipeline::{Compressor, Decompressor, Sink, SinkResult, Source};
//!
//! let compressor = Compressor::new();
//! let outcome = compressor.compress(
//!     Source::Memory(b"example payload".repeat(1000)),
//!     Sink::Memory,
//!     true, // extensions
//!     1,    // level
//! );
//! assert!(outcome.success);
//! let Some(SinkResult::Memory(compressed)) = outcome.output else {
//!     unreachable!()
//! };
//!
//! let decompressor = Decompressor::new();
//! let outcome = decompressor.decompress(Source::Memory(compressed), Sink::Memory);
//! assert!(outcome.success);
//! ```

pub mod bench;
pub mod block;
pub mod cli;
pub mod config;
pub mod container;
pub mod corpus;
pub mod display;
pub mod io;
pub mod pipeline;
pub mod timefn;

pub use block::{decode_block, encode_block, BlockContext, DecodeError};
pub use config::{encode_bound, BLOCK_SIZE, OUTPUT_SIZE};
pub use container::{ContainerError, ContainerHeader};
pub use pipeline::{
    Compressor, Decompressor, JobOutcome, Sink, SinkResult, Source,
};

/// Crate version string as compiled.
pub const VERSION_STRING: &str = env!("CARGO_PKG_VERSION");
