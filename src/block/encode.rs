//! Block encoder.
//!
//! Compressed block layout: a 3-byte little-endian uncompressed length,
//! followed by groups of eight symbols.  Each group holds one control byte
//! (one bit per symbol, MSB first, 1 = literal, 0 = back-reference) and, per
//! pair of symbols, one size byte (two 4-bit nibbles, high nibble first)
//! followed by the pair's payloads in order.  A literal payload is
//! `nibble + 1` raw bytes; a back-reference payload is a 2-byte
//! little-endian offset measured from the pair's anchor.
//!
//! With extensions enabled, back-reference nibbles 0, 1 and 2 stand for the
//! dilated lengths 32, 48 and 64; everything else is `nibble + 1` as usual.
//!
//! The final group may be partial: trailing control bits are filled with 1
//! and a trailing odd size nibble is shifted into the high half of its byte.

use crate::config::{encode_bound, BLOCK_SIZE, MAX_BACKREF_OFFSET, MAX_LITERAL_RUN};

use super::matchref::BlockContext;
use super::types::{copy16, write_le24};

/// Symbols per group.
const GROUP: usize = 8;

/// One pending symbol in the rolling group buffer.
#[derive(Clone, Copy, Default)]
struct SeqEntry {
    literal: bool,
    /// Emitted length: 1..=16 for literals, {4..=16, 32, 48, 64} for
    /// back-references.
    len: u32,
    /// Literal: start of the run in the input.  Back-reference: matched
    /// position in the input.
    pos: u32,
    /// Anchor at emission time; pairs always share the anchor of their
    /// first symbol.
    base: u32,
}

/// Clamp a raw match length to the closest encodable length below it.
#[inline(always)]
fn encodable_len(raw: u32) -> u32 {
    match raw {
        0..=16 => raw,
        17..=31 => 16,
        32..=47 => 32,
        48..=63 => 48,
        _ => 64,
    }
}

/// Size nibble for an emitted symbol length.
#[inline(always)]
fn len_nibble(entry: &SeqEntry) -> u8 {
    if entry.literal {
        (entry.len - 1) as u8
    } else {
        match entry.len {
            32 => 0,
            48 => 1,
            64 => 2,
            n => (n - 1) as u8,
        }
    }
}

/// Compress one block of `input` into `output`, returning the number of
/// compressed bytes written (3-byte length header included).
///
/// `output` must provide at least [`encode_bound`]`(input.len())` bytes; the
/// encoder never writes past that bound.  The context's match index is reset
/// before scanning, so a context can be reused across blocks without any
/// other ceremony.  Given the same level and extensions flag, the output is
/// a pure function of the input block.
pub fn encode_block(
    ctx: &mut BlockContext,
    input: &[u8],
    output: &mut [u8],
    extensions: bool,
) -> usize {
    let size = input.len();
    assert!(size <= BLOCK_SIZE, "input exceeds the block size");
    assert!(
        output.len() >= encode_bound(size),
        "output buffer below encode_bound"
    );

    write_le24(&mut output[..3], size as u32);
    ctx.reset();

    let cap = if extensions { 64 } else { 16 };
    let mut entries = [SeqEntry::default(); GROUP + 1];
    let mut pending = 0usize;

    let mut i = 0usize; // scan cursor
    let mut j = 3usize; // output cursor
    let mut anchor = 0usize; // back-reference origin of the current pair

    while i < size {
        let run_start = i;
        let mut hit: Option<(u32, u32)> = None; // (emitted len, pos)

        // Accumulate literals until a usable match shows up or the run
        // reaches a full symbol.
        while i < size && i - run_start < MAX_LITERAL_RUN {
            if let Some(m) = ctx.probe(input, i, anchor, cap) {
                let pos = m.pos as usize;
                let emit = encodable_len(m.len);
                // The anchor this symbol is actually packed against: a
                // pending literal that completes a pair moves it up to the
                // scan cursor before the match is recorded.
                let base = if i > run_start && (pending + 1) % 2 == 0 {
                    i
                } else {
                    anchor
                };
                if pos < base
                    && base - pos <= MAX_BACKREF_OFFSET
                    && pos + (emit as usize) < base
                {
                    hit = Some((emit, m.pos));
                    break;
                }
                // Out-of-range candidate: keep scanning as a literal.
            }
            i += 1;
        }

        if i > run_start {
            entries[pending] = SeqEntry {
                literal: true,
                len: (i - run_start) as u32,
                pos: run_start as u32,
                base: anchor as u32,
            };
            pending += 1;
            if pending % 2 == 0 {
                anchor = i;
            }
        }

        if let Some((len, pos)) = hit {
            entries[pending] = SeqEntry {
                literal: false,
                len,
                pos,
                base: anchor as u32,
            };
            pending += 1;
            i += len as usize;
            if pending % 2 == 0 {
                anchor = i;
            }
        }

        if pending >= GROUP {
            j += flush_group(&mut entries, &mut pending, input, output, j);
        }
    }

    // Drain the tail, padding the last group.
    while pending > 0 {
        j += flush_group(&mut entries, &mut pending, input, output, j);
    }

    j
}

/// Pack the first `min(pending, 8)` buffered symbols as one group at
/// `output[at..]` and slide any carried ninth entry to the front.  Returns
/// the number of bytes written.
fn flush_group(
    entries: &mut [SeqEntry; GROUP + 1],
    pending: &mut usize,
    input: &[u8],
    output: &mut [u8],
    at: usize,
) -> usize {
    let n = (*pending).min(GROUP);
    debug_assert!(n > 0);

    let mut control = 0u8;
    for idx in 0..GROUP {
        let bit = if idx < n { entries[idx].literal } else { true };
        control = control << 1 | bit as u8;
    }

    let mut w = at;
    output[w] = control;
    w += 1;

    let pairs = n.div_ceil(2);
    for p in 0..pairs {
        let a = entries[2 * p];
        let second = 2 * p + 1 < n;

        let mut size_byte = len_nibble(&a) << 4;
        if second {
            size_byte |= len_nibble(&entries[2 * p + 1]);
        }
        output[w] = size_byte;
        w += 1;

        w += write_payload(&a, a.base, input, output, w);
        if second {
            // The pair shares its first symbol's anchor.
            w += write_payload(&entries[2 * p + 1], a.base, input, output, w);
        }
    }

    if *pending > GROUP {
        entries[0] = entries[GROUP];
        *pending -= GROUP;
    } else {
        *pending = 0;
    }

    w - at
}

#[inline(always)]
fn write_payload(entry: &SeqEntry, base: u32, input: &[u8], output: &mut [u8], at: usize) -> usize {
    if entry.literal {
        let len = entry.len as usize;
        let src = entry.pos as usize;
        if src + 16 <= input.len() && at + 16 <= output.len() {
            // SAFETY: both ranges were just bounds-checked for 16 bytes.
            unsafe { copy16(output.as_mut_ptr().add(at), input.as_ptr().add(src)) };
        } else {
            output[at..at + len].copy_from_slice(&input[src..src + len]);
        }
        len
    } else {
        let offset = base - entry.pos;
        debug_assert!(offset >= 1 && offset as usize <= MAX_BACKREF_OFFSET);
        output[at] = offset as u8;
        output[at + 1] = (offset >> 8) as u8;
        2
    }
}
