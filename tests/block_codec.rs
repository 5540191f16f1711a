//! Single-block codec tests: round-trips across the level and extensions
//! matrix, wire-format details, and decoder behavior on hostile input.

use turbosqueeze::block::{decode_block, encode_block, BlockContext, DecodeError};
use turbosqueeze::config::{encode_bound, BLOCK_SIZE, DECODE_PAD};
use turbosqueeze::corpus;

const LEVELS: [u32; 5] = [0, 1, 2, 3, 4];

/// Encode + decode one block and require byte identity.  Returns the
/// compressed size.
fn roundtrip(data: &[u8], level: u32, extensions: bool) -> usize {
    let mut ctx = BlockContext::new(level);
    let mut packed = vec![0u8; encode_bound(data.len())];
    let n = encode_block(&mut ctx, data, &mut packed, extensions);
    assert!(n <= encode_bound(data.len()));

    let mut out = vec![0u8; data.len() + DECODE_PAD];
    let m = decode_block(&packed[..n], &mut out, extensions).expect("decode should succeed");
    assert_eq!(m, data.len());
    assert_eq!(&out[..m], data, "level {level} ext {extensions}");
    n
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trips
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn placeholder_paragraph_roundtrips_and_compresses() {
    // Natural-language sample, level 1 with extensions.
    let n = roundtrip(corpus::PLACEHOLDER_NAMES, 1, true);
    assert!(
        n < corpus::PLACEHOLDER_NAMES.len(),
        "text should compress, got {n}"
    );
}

#[test]
fn paragraph_roundtrips_at_every_level() {
    for level in LEVELS {
        for extensions in [false, true] {
            roundtrip(corpus::PLACEHOLDER_NAMES, level, extensions);
        }
    }
}

#[test]
fn sawtooth_block_compresses_hard_with_extensions() {
    let data = corpus::sawtooth(BLOCK_SIZE);
    let n = roundtrip(&data, 2, true);
    assert!(
        n * 10 <= data.len(),
        "256-byte periodicity should give at least 10x, got {}/{}",
        n,
        data.len()
    );
}

#[test]
fn sawtooth_roundtrips_at_every_level() {
    let data = corpus::sawtooth(1 << 16);
    for level in LEVELS {
        for extensions in [false, true] {
            roundtrip(&data, level, extensions);
        }
    }
}

#[test]
fn incompressible_data_expands_by_the_symbol_overhead_only() {
    let data = corpus::random_bytes(7, 1 << 16);
    let n = roundtrip(&data, 0, false);
    assert!(n >= data.len(), "random bytes should not shrink");
    assert!(
        n <= data.len() + data.len() / 8,
        "expansion must stay within the bound, got {n}"
    );
}

#[test]
fn random_data_roundtrips_at_every_level() {
    let data = corpus::random_bytes(1234, 50_000);
    for level in LEVELS {
        for extensions in [false, true] {
            roundtrip(&data, level, extensions);
        }
    }
}

#[test]
fn full_block_roundtrips() {
    // Exactly BLOCK_SIZE bytes with mixed structure.
    let mut data = corpus::sawtooth(BLOCK_SIZE / 2);
    data.extend_from_slice(&corpus::random_bytes(99, BLOCK_SIZE / 2));
    assert_eq!(data.len(), BLOCK_SIZE);
    for extensions in [false, true] {
        roundtrip(&data, 1, extensions);
    }
}

#[test]
fn tiny_inputs_roundtrip() {
    for len in [0usize, 1, 2, 3, 4, 5, 15, 16, 17, 31, 32, 33] {
        let data = corpus::random_bytes(len as u64 + 1, len);
        for level in [0, 2] {
            for extensions in [false, true] {
                roundtrip(&data, level, extensions);
            }
        }
    }
}

#[test]
fn repeated_byte_runs_roundtrip() {
    // Self-referential matches at minimal offsets.
    for len in [64usize, 600, 5000] {
        let data = vec![0xAAu8; len];
        for level in LEVELS {
            for extensions in [false, true] {
                roundtrip(&data, level, extensions);
            }
        }
    }
}

#[test]
fn long_distance_matches_stay_below_the_offset_bound() {
    // A repeated 32-byte record separated by ~64 KiB of noise: candidates
    // sit right around the offset acceptance boundary.
    let record = b"0123456789abcdefFEDCBA9876543210";
    let mut data = Vec::new();
    data.extend_from_slice(record);
    data.extend_from_slice(&corpus::random_bytes(5, 65_400));
    data.extend_from_slice(record);
    data.extend_from_slice(&corpus::random_bytes(6, 1000));
    data.extend_from_slice(record);
    for level in [0, 3] {
        for extensions in [false, true] {
            roundtrip(&data, level, extensions);
        }
    }
}

#[test]
fn decode_works_without_output_slack() {
    // The safe tail must finish a block whose output buffer is exactly the
    // announced size.
    let data = corpus::sawtooth(100_000);
    let mut ctx = BlockContext::new(2);
    let mut packed = vec![0u8; encode_bound(data.len())];
    let n = encode_block(&mut ctx, &data, &mut packed, true);

    let mut out = vec![0u8; data.len()];
    let m = decode_block(&packed[..n], &mut out, true).expect("decode");
    assert_eq!(m, data.len());
    assert_eq!(out, data);
}

#[test]
fn encoding_is_a_pure_function_of_the_block() {
    let data = corpus::random_bytes(11, 30_000);
    for level in [0, 2] {
        let mut ctx = BlockContext::new(level);
        let mut a = vec![0u8; encode_bound(data.len())];
        let na = encode_block(&mut ctx, &data, &mut a, true);
        // Same context reused: the reset must make the result identical.
        let mut b = vec![0u8; encode_bound(data.len())];
        let nb = encode_block(&mut ctx, &data, &mut b, true);
        assert_eq!(na, nb);
        assert_eq!(a[..na], b[..nb]);
    }
}

#[test]
fn extensions_flag_must_match_between_encode_and_decode() {
    // Decoding with the wrong flag may produce garbage or an error, but the
    // right flag must reproduce the input.
    let data = corpus::sawtooth(4096);
    let mut ctx = BlockContext::new(3);
    let mut packed = vec![0u8; encode_bound(data.len())];
    let n = encode_block(&mut ctx, &data, &mut packed, true);
    let mut out = vec![0u8; data.len() + DECODE_PAD];
    let m = decode_block(&packed[..n], &mut out, true).expect("matching flag");
    assert_eq!(&out[..m], &data[..]);
}

// ─────────────────────────────────────────────────────────────────────────────
// Hostile input
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn decoder_rejects_oversized_size_field() {
    let mut out = vec![0u8; BLOCK_SIZE + DECODE_PAD];
    // 0x7FFFFF exceeds BLOCK_SIZE for this geometry.
    let block = [0xFFu8, 0xFF, 0x7F, 0, 0, 0];
    assert_eq!(
        decode_block(&block, &mut out, false),
        Err(DecodeError::CorruptBlock)
    );
}

#[test]
fn decoder_rejects_truncated_stream() {
    let data = corpus::sawtooth(10_000);
    let mut ctx = BlockContext::new(0);
    let mut packed = vec![0u8; encode_bound(data.len())];
    let n = encode_block(&mut ctx, &data, &mut packed, false);

    let mut out = vec![0u8; data.len() + DECODE_PAD];
    for keep in [3usize, 4, n / 2, n - 1] {
        assert_eq!(
            decode_block(&packed[..keep], &mut out, false),
            Err(DecodeError::CorruptBlock),
            "truncated to {keep} bytes"
        );
    }
}

#[test]
fn decoder_survives_arbitrary_garbage() {
    let mut out = vec![0u8; BLOCK_SIZE + DECODE_PAD];
    for seed in 0..50u64 {
        let len = 3 + (seed as usize * 131) % 9000;
        let garbage = corpus::random_bytes(seed + 1, len);
        for extensions in [false, true] {
            // Must never panic; Err or garbage-Ok are both acceptable.
            let _ = decode_block(&garbage, &mut out, extensions);
        }
    }
}

#[test]
fn decoder_survives_bit_flips_in_valid_blocks() {
    let data = corpus::sawtooth(20_000);
    let mut ctx = BlockContext::new(1);
    let mut packed = vec![0u8; encode_bound(data.len())];
    let n = encode_block(&mut ctx, &data, &mut packed, true);

    let mut out = vec![0u8; BLOCK_SIZE + DECODE_PAD];
    for bit in (0..n * 8).step_by(97) {
        let mut mangled = packed[..n].to_vec();
        mangled[bit / 8] ^= 1 << (bit % 8);
        let _ = decode_block(&mangled, &mut out, true);
    }
}
