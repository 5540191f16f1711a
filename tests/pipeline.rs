//! Pipeline tests: multi-block round-trips, ordering guarantees, callback
//! contracts and submission-time validation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use turbosqueeze::config::BLOCK_SIZE;
use turbosqueeze::container::{ContainerHeader, HEADER_LEN};
use turbosqueeze::corpus;
use turbosqueeze::pipeline::{Compressor, Decompressor, Sink, SinkResult, Source};

fn compress_to_memory(
    compressor: &Compressor,
    data: &[u8],
    extensions: bool,
    level: u32,
) -> Vec<u8> {
    let outcome = compressor.compress(
        Source::Memory(data.to_vec()),
        Sink::Memory,
        extensions,
        level,
    );
    assert!(outcome.success, "compression failed");
    match outcome.output {
        Some(SinkResult::Memory(buf)) => buf,
        other => panic!("expected a memory result, got {other:?}"),
    }
}

fn decompress_to_memory(decompressor: &Decompressor, compressed: Vec<u8>) -> Vec<u8> {
    let outcome = decompressor.decompress(Source::Memory(compressed), Sink::Memory);
    assert!(outcome.success, "decompression failed");
    match outcome.output {
        Some(SinkResult::Memory(buf)) => buf,
        other => panic!("expected a memory result, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Round-trips
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn single_block_job_roundtrips() {
    let compressor = Compressor::new();
    let decompressor = Decompressor::new();
    let data = corpus::PLACEHOLDER_NAMES;

    let compressed = compress_to_memory(&compressor, data, true, 1);
    assert!(compressed.len() < HEADER_LEN + 3 + data.len());
    assert_eq!(decompress_to_memory(&decompressor, compressed), data);
}

#[test]
fn sawtooth_16mib_reaches_ten_to_one() {
    // 2^24 bytes of 256-periodic data, level 2 with extensions.
    let compressor = Compressor::new();
    let decompressor = Decompressor::new();
    let data = corpus::sawtooth(1 << 24);

    let compressed = compress_to_memory(&compressor, &data, true, 2);
    assert!(
        compressed.len() * 10 <= data.len(),
        "expected at least 10x, got {} / {}",
        compressed.len(),
        data.len()
    );
    assert_eq!(decompress_to_memory(&decompressor, compressed), data);
}

#[test]
fn multi_block_boundary_crossing_data_roundtrips() {
    // 3 blocks + 17 bytes; repeats crossing block boundaries must not leak
    // references across blocks.
    let compressor = Compressor::new();
    let decompressor = Decompressor::new();
    let data = corpus::random_bytes(3, 3 * BLOCK_SIZE + 17);

    for level in [0u32, 1, 3] {
        for extensions in [false, true] {
            let compressed = compress_to_memory(&compressor, &data, extensions, level);
            let header = ContainerHeader::parse(&compressed).expect("valid header");
            assert_eq!(header.block_count, 4);
            assert_eq!(header.total_size, data.len() as u64);
            assert_eq!(decompress_to_memory(&decompressor, compressed), data);
        }
    }
}

#[test]
fn worker_count_does_not_change_the_stream() {
    let data = corpus::sawtooth(2 * BLOCK_SIZE + 1000);
    let wide = Compressor::new();
    let narrow = Compressor::with_workers(1);
    let a = compress_to_memory(&wide, &data, true, 1);
    let b = compress_to_memory(&narrow, &data, true, 1);
    assert_eq!(a, b, "stream must not depend on worker count");
}

#[test]
fn pipelines_are_reusable_across_jobs() {
    let compressor = Compressor::with_workers(2);
    let decompressor = Decompressor::with_workers(2);
    for round in 0..5u64 {
        let data = corpus::random_bytes(round + 100, 100_000 + round as usize * 10_000);
        let compressed = compress_to_memory(&compressor, &data, round % 2 == 0, 1);
        assert_eq!(decompress_to_memory(&decompressor, compressed), data);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ordering and callback contracts
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn progress_is_monotonic_and_block_ordered() {
    let compressor = Compressor::new();
    let data = corpus::random_bytes(8, 3 * BLOCK_SIZE + 500);

    let seen: Arc<Mutex<Vec<f64>>> = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    let (tx, rx) = crossbeam_channel::bounded(1);

    let id = compressor.compress_async(
        Source::Memory(data),
        Sink::Memory,
        true,
        0,
        Some(Box::new(move |outcome| {
            let _ = tx.send(outcome);
        })),
        Some(Box::new(move |_, progress| {
            record.lock().unwrap().push(progress);
        })),
    );
    assert_ne!(id, 0);
    let outcome = rx.recv().unwrap();
    assert!(outcome.success);

    let seen = seen.lock().unwrap();
    // One progress call per block, strictly increasing, ending at 1.0.
    assert_eq!(seen.len(), 4);
    assert!(seen.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(*seen.last().unwrap(), 1.0);
}

#[test]
fn completion_fires_exactly_once_per_job() {
    let compressor = Compressor::new();
    let fired = Arc::new(AtomicU32::new(0));

    let mut receivers = Vec::new();
    for seed in 0..8u64 {
        let data = corpus::random_bytes(seed + 1, 50_000);
        let fired = Arc::clone(&fired);
        let (tx, rx) = crossbeam_channel::bounded(1);
        compressor.compress_async(
            Source::Memory(data),
            Sink::Memory,
            true,
            1,
            Some(Box::new(move |outcome| {
                fired.fetch_add(1, Ordering::SeqCst);
                let _ = tx.send(outcome);
            })),
            None,
        );
        receivers.push(rx);
    }
    for rx in receivers {
        assert!(rx.recv().unwrap().success);
    }
    assert_eq!(fired.load(Ordering::SeqCst), 8);
}

#[test]
fn jobs_complete_in_submission_order() {
    // FIFO queue: the first block of a later job is only dispatched after
    // the previous job's last block, so completions observe queue order.
    let compressor = Compressor::with_workers(2);
    let order: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));

    let mut receivers = Vec::new();
    let mut ids = Vec::new();
    for seed in 0..4u64 {
        // Big first job, small followers: a non-FIFO queue would finish the
        // small ones first.
        let len = if seed == 0 { 4 * BLOCK_SIZE } else { 10_000 };
        let data = corpus::random_bytes(seed + 21, len);
        let order = Arc::clone(&order);
        let (tx, rx) = crossbeam_channel::bounded(1);
        let id = compressor.compress_async(
            Source::Memory(data),
            Sink::Memory,
            false,
            0,
            Some(Box::new(move |outcome| {
                order.lock().unwrap().push(outcome.job_id);
                let _ = tx.send(outcome);
            })),
            None,
        );
        assert_ne!(id, 0);
        ids.push(id);
        receivers.push(rx);
    }
    for rx in receivers {
        assert!(rx.recv().unwrap().success);
    }
    assert_eq!(*order.lock().unwrap(), ids);
}

#[test]
fn async_fan_out_at_mixed_levels() {
    // Three async compressions of the same 1 MiB input at levels 0, 1, 3.
    let compressor = Compressor::new();
    let decompressor = Decompressor::new();
    let data = corpus::random_bytes(77, 1 << 20);

    let mut receivers = Vec::new();
    for level in [0u32, 1, 3] {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let id = compressor.compress_async(
            Source::Memory(data.clone()),
            Sink::Memory,
            true,
            level,
            Some(Box::new(move |outcome| {
                let _ = tx.send(outcome);
            })),
            None,
        );
        assert_ne!(id, 0);
        receivers.push(rx);
    }

    for rx in receivers {
        let outcome = rx.recv().unwrap();
        assert!(outcome.success);
        let Some(SinkResult::Memory(compressed)) = outcome.output else {
            panic!("expected memory output");
        };
        assert_eq!(decompress_to_memory(&decompressor, compressed), data);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Validation and error propagation
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn empty_input_is_rejected_up_front() {
    let compressor = Compressor::new();
    let outcome = compressor.compress(Source::Memory(Vec::new()), Sink::Memory, true, 0);
    assert_eq!(outcome.job_id, 0);
    assert!(!outcome.success);
}

#[test]
fn missing_input_file_is_rejected_up_front() {
    let compressor = Compressor::new();
    let outcome = compressor.compress(
        Source::File("/nonexistent/turbosqueeze-input".into()),
        Sink::Memory,
        true,
        0,
    );
    assert_eq!(outcome.job_id, 0);
    assert!(!outcome.success);
}

#[test]
fn bad_magic_is_rejected_up_front() {
    let decompressor = Decompressor::new();
    let mut container = vec![0u8; 64];
    container[..4].copy_from_slice(b"NOPE");
    let outcome = decompressor.decompress(Source::Memory(container), Sink::Memory);
    assert_eq!(outcome.job_id, 0);
    assert!(!outcome.success);
}

#[test]
fn zero_block_container_is_rejected_up_front() {
    let decompressor = Decompressor::new();
    // A well-formed header announcing zero blocks.
    let mut raw = vec![0u8; 16];
    raw[..4].copy_from_slice(b"TSQ1");
    let outcome = decompressor.decompress(Source::Memory(raw), Sink::Memory);
    assert_eq!(outcome.job_id, 0);
    assert!(!outcome.success);
}

#[test]
fn truncated_memory_container_fails_but_keeps_earlier_blocks() {
    let compressor = Compressor::new();
    let decompressor = Decompressor::new();
    let data = corpus::random_bytes(5, 2 * BLOCK_SIZE + 77);
    let compressed = compress_to_memory(&compressor, &data, true, 0);

    // Drop the last 50 bytes: the final block's payload is truncated.
    let truncated = compressed[..compressed.len() - 50].to_vec();
    let outcome = decompressor.decompress(Source::Memory(truncated), Sink::Memory);
    assert!(!outcome.success);
    // Everything before the damage was still decoded in order.
    let Some(SinkResult::Memory(partial)) = outcome.output else {
        panic!("expected memory output");
    };
    assert_eq!(partial.len(), 2 * BLOCK_SIZE);
    assert_eq!(partial[..], data[..2 * BLOCK_SIZE]);
}

#[test]
fn corrupt_length_prefix_poisons_the_rest_of_the_job() {
    let compressor = Compressor::new();
    let decompressor = Decompressor::new();
    let data = corpus::random_bytes(31, 3 * BLOCK_SIZE + 17);
    let mut compressed = compress_to_memory(&compressor, &data, false, 0);

    // Overwrite the second block's 3-byte prefix with 0xFFFFFF.
    let first_len = {
        let header = &compressed[HEADER_LEN..HEADER_LEN + 3];
        (header[0] as usize) | (header[1] as usize) << 8 | ((header[2] & 0x7F) as usize) << 16
    };
    let second_prefix = HEADER_LEN + 3 + first_len;
    compressed[second_prefix..second_prefix + 3].copy_from_slice(&[0xFF, 0xFF, 0xFF]);

    let outcome = decompressor.decompress(Source::Memory(compressed), Sink::Memory);
    assert!(!outcome.success);
    let Some(SinkResult::Memory(partial)) = outcome.output else {
        panic!("expected memory output");
    };
    // The first block precedes the corruption and must be intact.
    assert_eq!(partial.len(), BLOCK_SIZE);
    assert_eq!(partial[..], data[..BLOCK_SIZE]);
}

#[test]
fn decompressing_random_noise_never_panics() {
    let decompressor = Decompressor::new();
    for seed in 0..20u64 {
        let mut noise = corpus::random_bytes(seed + 900, 4096);
        if seed % 2 == 0 {
            // Valid magic, garbage afterwards.
            noise[..4].copy_from_slice(b"TSQ1");
            // Keep the block count small so the job is accepted.
            noise[4..8].copy_from_slice(&3u32.to_le_bytes());
            noise[8..16].copy_from_slice(&(BLOCK_SIZE as u64).to_le_bytes());
        }
        let outcome = decompressor.decompress(Source::Memory(noise), Sink::Memory);
        if seed % 2 == 1 {
            // Random magic bytes: rejected before the job is enqueued.
            assert_eq!(outcome.job_id, 0);
            assert!(!outcome.success);
        }
    }
}
