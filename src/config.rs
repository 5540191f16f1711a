//! Compile-time configuration constants for the TurboSqueeze codec and
//! pipeline.
//!
//! The block geometry is fixed at build time: the encoder, the decoder and
//! the multi-threaded pipeline all share the same `BLOCK_BITS`.

/// Log2 of the block size. Blocks are the unit of independent codec work.
pub const BLOCK_BITS: u32 = 18;

/// Maximum number of uncompressed bytes in one block (256 KiB).
pub const BLOCK_SIZE: usize = 1 << BLOCK_BITS;

/// Maximum number of compressed bytes one block may occupy, including the
/// 3-byte uncompressed-length header.  Sized so the per-block buffers of the
/// pipeline can always hold a worst-case (expanded) block.
pub const OUTPUT_SIZE: usize = BLOCK_SIZE + BLOCK_SIZE / 4;

/// Log2 of the FastRef bucket count.
pub const HASH_BITS: u32 = BLOCK_BITS - 1;

/// Number of FastRef buckets.
pub const HASH_SIZE: usize = 1 << HASH_BITS;

/// Number of MultiRef buckets.
pub const HASH_PLUS_SIZE: usize = 1 << BLOCK_BITS;

/// Entries per hash bucket (both index variants).
pub const BUCKET_WIDTH: usize = 4;

/// Number of `u32` slots in the MultiRef positions arena.
pub const POSITIONS_POOL: usize = 1 << 18;

/// Upper bound on the per-symbol occurrence slot width, `min(2^level, 1024)`.
pub const MAX_SLOT_WIDTH: u32 = 1 << 10;

/// Minimum back-reference length.
pub const MIN_MATCH: usize = 4;

/// Maximum literal run carried by a single symbol.
pub const MAX_LITERAL_RUN: usize = 16;

/// Candidate pre-filter window of the multi-occurrence index: stored
/// positions further than this from the scan-time anchor are not even
/// length-checked.  The margin below 65536 keeps every surviving candidate
/// encodable after the anchor drifts by up to one symbol pair.
pub const MAX_OFFSET: usize = (1 << 16) - 32;

/// Largest offset a back-reference may carry on the wire.  The encoder's
/// final acceptance check compares the exact emitted offset against this
/// bound, so the full window is usable without overflowing the 2-byte
/// offset field.
pub const MAX_BACKREF_OFFSET: usize = 0xFFFB;

/// Ring-buffer slots per worker side (input and output).
pub const RING_SLOTS: usize = 3;

/// Write slack required beyond the announced block size in pipeline decode
/// buffers so the fast decoder loop can run wide copies right up to its stop
/// margin.
pub const DECODE_PAD: usize = 544;

/// Worst-case encoded size for `n` input bytes, including the 3-byte block
/// header.  The encoder never writes past this bound: symbol overhead is one
/// control bit plus half a size byte per symbol, and literal symbols carry
/// 16 payload bytes each except at the very end of the block.
#[inline]
pub const fn encode_bound(n: usize) -> usize {
    n + n / 8 + 16
}
