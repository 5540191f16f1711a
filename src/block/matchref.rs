//! Dictionary structures used by the block encoder to find back-references.
//!
//! Two variants share one [`BlockContext`]:
//!
//! - **FastRef** (level 0): per-bucket list of up to four symbols, each
//!   remembering only the most recent position where the symbol was seen.
//! - **MultiRef** (level 1 and above): per-bucket list of up to four symbols
//!   with an occurrence counter.  Once a symbol has matched twice, its entry
//!   is promoted to a slot in a shared positions arena, which ring-buffers
//!   the last `L = min(2^level, 1024)` occurrences so the encoder can pick
//!   the best candidate among several.
//!
//! Buckets are keyed by the four little-endian bytes at a position.  The
//! index is reset between blocks by clearing the per-bucket count table and
//! the arena cursor; the bucket storage itself is never zeroed.

use crate::config::{
    BUCKET_WIDTH, HASH_BITS, HASH_PLUS_SIZE, HASH_SIZE, MAX_OFFSET, MAX_SLOT_WIDTH, MIN_MATCH,
    POSITIONS_POOL,
};

use super::types::{read_sym4, read_word};

// ─────────────────────────────────────────────────────────────────────────────
// Entry types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Default)]
struct FastEntry {
    sym4: u32,
    latest_pos: u32,
}

#[derive(Clone, Copy, Default)]
struct MultiEntry {
    sym4: u32,
    /// Input position while `occurrences == 1`; arena slot offset afterwards.
    position: u32,
    occurrences: u32,
}

/// A successful probe: `len` bytes at `pos` match the bytes at the probed
/// position.  `len` is the raw common-prefix length, before any clamping to
/// the encodable length set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit {
    pub len: u32,
    pub pos: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Hashing
// ─────────────────────────────────────────────────────────────────────────────

/// FastRef bucket index: fold the high bits of the symbol into the low
/// `HASH_BITS` bits by XOR.
#[inline(always)]
fn hash_fast(sym4: u32) -> usize {
    let mask = (HASH_SIZE - 1) as u32;
    (((sym4 & !mask) >> (32 - HASH_BITS)) ^ (sym4 & mask)) as usize
}

/// MultiRef bucket index: one extra bit of bucket space.
#[inline(always)]
fn hash_multi(sym4: u32) -> usize {
    let mask = (HASH_PLUS_SIZE - 1) as u32;
    (((sym4 & !mask) >> (32 - HASH_BITS - 1)) ^ (sym4 & mask)) as usize
}

// ─────────────────────────────────────────────────────────────────────────────
// Match length
// ─────────────────────────────────────────────────────────────────────────────

/// Length of the common prefix of `input[first..]` and `input[second..]`,
/// capped at `cap` and by three range constraints:
///
/// - `first + len <= anchor`, so the referenced range is decodable before
///   the current symbol pair begins;
/// - `second + len <= input.len()`;
/// - `len <= second - first`, so the ranges do not overlap.
///
/// Returns 0 unless at least [`MIN_MATCH`] bytes match.  The first four
/// bytes are known equal by the caller (same `sym4`).
fn match_len(input: &[u8], first: usize, second: usize, anchor: usize, cap: u32) -> u32 {
    debug_assert!(first < second);
    if first >= anchor {
        return 0;
    }
    let mut max = cap as usize;
    max = max.min(anchor - first);
    max = max.min(input.len() - second);
    max = max.min(second - first);
    if max < MIN_MATCH {
        return 0;
    }

    let mut n = MIN_MATCH;
    // 8-byte strides for the extended range; the trailing-zero count of the
    // XOR turns directly into a matching-byte count.
    while n + 8 <= max {
        let diff = read_word(input, first + n) ^ read_word(input, second + n);
        if diff != 0 {
            n += (diff.trailing_zeros() >> 3) as usize;
            return n.min(max) as u32;
        }
        n += 8;
    }
    while n < max && input[first + n] == input[second + n] {
        n += 1;
    }
    n as u32
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// Per-worker codec state: the match-index variant for the current level
/// plus the MultiRef positions arena.  The bucket arrays are allocated the
/// first time their level is selected and reused afterwards; reset between
/// blocks touches only the count table and the arena cursor.
pub struct BlockContext {
    level: u32,
    /// `min(2^level, 1024)`; 0 while level == 0 (FastRef takes over).
    slot_width: u32,
    counts: Box<[u8]>,
    fast: Box<[FastEntry]>,
    multi: Box<[MultiEntry]>,
    positions: Box<[u32]>,
    pos_cursor: u32,
}

impl BlockContext {
    /// Allocate a context for the given compression level.
    pub fn new(level: u32) -> Self {
        let mut ctx = BlockContext {
            level: 0,
            slot_width: 0,
            counts: vec![0u8; HASH_PLUS_SIZE].into_boxed_slice(),
            fast: Vec::new().into_boxed_slice(),
            multi: Vec::new().into_boxed_slice(),
            positions: Vec::new().into_boxed_slice(),
            pos_cursor: 0,
        };
        ctx.set_level(level);
        ctx
    }

    /// Change the compression level, allocating the level's index arrays on
    /// first use.
    pub fn set_level(&mut self, level: u32) {
        self.level = level;
        if level == 0 {
            self.slot_width = 0;
            if self.fast.is_empty() {
                self.fast =
                    vec![FastEntry::default(); HASH_SIZE * BUCKET_WIDTH].into_boxed_slice();
            }
        } else {
            self.slot_width =
                (1u32 << level.min(MAX_SLOT_WIDTH.trailing_zeros())).min(MAX_SLOT_WIDTH);
            if self.multi.is_empty() {
                self.multi =
                    vec![MultiEntry::default(); HASH_PLUS_SIZE * BUCKET_WIDTH].into_boxed_slice();
                self.positions = vec![0u32; POSITIONS_POOL].into_boxed_slice();
            }
        }
    }

    /// Current compression level.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Clear the index for a new block.  Only the count table and the arena
    /// cursor are touched; stale bucket entries are unreachable once their
    /// counts read zero.
    pub fn reset(&mut self) {
        let used = if self.level == 0 { HASH_SIZE } else { HASH_PLUS_SIZE };
        self.counts[..used].fill(0);
        self.pos_cursor = 0;
    }

    /// Look up the four bytes at `input[i..]`, remember the position for
    /// later probes, and return the best match found, if any.
    ///
    /// `anchor` is the back-reference origin of the current symbol pair and
    /// `cap` the maximum raw match length (16, or 64 with extensions).
    #[inline]
    pub(crate) fn probe(&mut self, input: &[u8], i: usize, anchor: usize, cap: u32) -> Option<Hit> {
        if i + 4 > input.len() {
            return None;
        }
        let sym4 = read_sym4(input, i);
        if self.level == 0 {
            self.probe_fast(sym4, input, i, anchor, cap)
        } else {
            self.probe_multi(sym4, input, i, anchor, cap)
        }
    }

    fn probe_fast(
        &mut self,
        sym4: u32,
        input: &[u8],
        i: usize,
        anchor: usize,
        cap: u32,
    ) -> Option<Hit> {
        let h = hash_fast(sym4);
        let base = h * BUCKET_WIDTH;
        let count = self.counts[h] as usize;

        for k in 0..count {
            if self.fast[base + k].sym4 != sym4 {
                continue;
            }
            let prev = self.fast[base + k].latest_pos as usize;
            let len = match_len(input, prev, i, anchor, cap);
            if len as usize >= MIN_MATCH {
                self.fast[base + k].latest_pos = i as u32;
                return Some(Hit {
                    len,
                    pos: prev as u32,
                });
            }
            // Known symbol, unusable match: keep the stored position.
            return None;
        }

        if count < BUCKET_WIDTH {
            self.fast[base + count] = FastEntry {
                sym4,
                latest_pos: i as u32,
            };
            self.counts[h] = (count + 1) as u8;
        }
        None
    }

    fn probe_multi(
        &mut self,
        sym4: u32,
        input: &[u8],
        i: usize,
        anchor: usize,
        cap: u32,
    ) -> Option<Hit> {
        let h = hash_multi(sym4);
        let base = h * BUCKET_WIDTH;
        let count = self.counts[h] as usize;
        let slot_width = self.slot_width as usize;

        for k in 0..count {
            if self.multi[base + k].sym4 != sym4 {
                continue;
            }
            let entry = self.multi[base + k];
            if entry.occurrences == 1 {
                let first = entry.position as usize;
                let len = match_len(input, first, i, anchor, cap);
                if (len as usize) < MIN_MATCH {
                    return None;
                }
                // Promote: move this symbol onto an arena slot holding both
                // known occurrences.  When the arena is full the entry stays
                // un-promoted and keeps serving its single position.
                if self.pos_cursor as usize + slot_width <= self.positions.len() {
                    let slot = self.pos_cursor;
                    self.positions[slot as usize] = entry.position;
                    self.positions[slot as usize + 1] = i as u32;
                    self.multi[base + k].position = slot;
                    self.multi[base + k].occurrences = 2;
                    self.pos_cursor += slot_width as u32;
                }
                return Some(Hit {
                    len,
                    pos: first as u32,
                });
            }

            // Several known occurrences: pick the longest match; on equal
            // length prefer the later (closer) position.
            let slot = entry.position as usize;
            let stored = (entry.occurrences as usize).min(slot_width);
            let mut best_len = 0u32;
            let mut best_pos = 0usize;
            for s in 0..stored {
                let cand = self.positions[slot + s] as usize;
                if cand >= anchor || anchor - cand >= MAX_OFFSET {
                    continue;
                }
                let len = match_len(input, cand, i, anchor, cap);
                if len > best_len || (len == best_len && len > 0 && cand > best_pos) {
                    best_len = len;
                    best_pos = cand;
                }
            }
            if (best_len as usize) < MIN_MATCH {
                return None;
            }
            let write_at = slot + (entry.occurrences as usize % slot_width);
            self.positions[write_at] = i as u32;
            self.multi[base + k].occurrences = entry.occurrences + 1;
            return Some(Hit {
                len: best_len,
                pos: best_pos as u32,
            });
        }

        if count < BUCKET_WIDTH {
            self.multi[base + count] = MultiEntry {
                sym4,
                position: i as u32,
                occurrences: 1,
            };
            self.counts[h] = (count + 1) as u8;
        }
        None
    }
}
