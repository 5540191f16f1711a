//! Fuzz target: the block decoder must never panic or touch memory out of
//! bounds, whatever bytes it is fed, with either extensions setting.

#![no_main]

use libfuzzer_sys::fuzz_target;

use turbosqueeze::block::decode_block;
use turbosqueeze::config::{BLOCK_SIZE, DECODE_PAD};

fuzz_target!(|data: &[u8]| {
    let mut out = vec![0u8; BLOCK_SIZE + DECODE_PAD];
    let _ = decode_block(data, &mut out, false);
    let _ = decode_block(data, &mut out, true);
});
