//! Per-worker ring buffers and their synchronization.
//!
//! Each worker owns two rings of [`RING_SLOTS`] block buffers: an input ring
//! filled by the reader thread and drained by the worker, and an output ring
//! filled by the worker and drained by the writer.  A ring is a pair of
//! monotonically increasing indices, `produced` and `consumed`, with
//! `consumed <= produced <= consumed + RING_SLOTS`.
//!
//! Slot ownership follows the indices: the producer owns the slot at
//! `produced % RING_SLOTS` while `produced - consumed < RING_SLOTS`, and the
//! consumer owns the slot at `consumed % RING_SLOTS` while
//! `produced > consumed`.  Each side sleeps on the ring's condition variable
//! with a predicate re-checked after every wakeup; a raised shutdown flag
//! releases every sleeper.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::config::RING_SLOTS;

use super::job::Job;

/// One block buffer travelling through a ring.
pub(crate) struct BlockSlot {
    pub data: Vec<u8>,
    /// Meaningful bytes in `data`.
    pub len: u32,
    pub extensions: bool,
    pub level: u32,
    /// Cleared when an upstream error turned this block into a hole; the
    /// writer converts holes into a failed job.
    pub valid: bool,
    pub job: Option<Arc<Job>>,
}

impl BlockSlot {
    fn with_capacity(capacity: usize) -> Self {
        BlockSlot {
            data: vec![0u8; capacity],
            len: 0,
            extensions: false,
            level: 0,
            valid: false,
            job: None,
        }
    }
}

/// Index pair plus the condition variable both sides sleep on.
pub(crate) struct Ring {
    produced: AtomicU64,
    consumed: AtomicU64,
    mtx: Mutex<()>,
    cv: Condvar,
}

impl Ring {
    fn new() -> Self {
        Ring {
            produced: AtomicU64::new(0),
            consumed: AtomicU64::new(0),
            mtx: Mutex::new(()),
            cv: Condvar::new(),
        }
    }

    /// Block until an item is available; returns its index, or `None` once
    /// the shutdown flag is raised.
    pub fn wait_item(&self, exit: &AtomicBool) -> Option<u64> {
        let mut guard = self.mtx.lock().unwrap();
        loop {
            if exit.load(Ordering::SeqCst) {
                return None;
            }
            let consumed = self.consumed.load(Ordering::SeqCst);
            if self.produced.load(Ordering::SeqCst) > consumed {
                return Some(consumed);
            }
            guard = self.cv.wait(guard).unwrap();
        }
    }

    /// Block until a free slot is available; returns the index to fill, or
    /// `None` once the shutdown flag is raised.
    pub fn wait_space(&self, exit: &AtomicBool) -> Option<u64> {
        let mut guard = self.mtx.lock().unwrap();
        loop {
            if exit.load(Ordering::SeqCst) {
                return None;
            }
            let produced = self.produced.load(Ordering::SeqCst);
            if produced - self.consumed.load(Ordering::SeqCst) < RING_SLOTS as u64 {
                return Some(produced);
            }
            guard = self.cv.wait(guard).unwrap();
        }
    }

    /// Make one filled slot visible to the consumer.
    pub fn publish(&self) {
        self.produced.fetch_add(1, Ordering::SeqCst);
        // Taking the lock orders the store before the wakeup; a sleeper is
        // either still checking its predicate or already waiting.
        let _guard = self.mtx.lock().unwrap();
        self.cv.notify_all();
    }

    /// Return one drained slot to the producer.
    pub fn retire(&self) {
        self.consumed.fetch_add(1, Ordering::SeqCst);
        let _guard = self.mtx.lock().unwrap();
        self.cv.notify_all();
    }

    /// Wake every sleeper (shutdown path).
    pub fn wake_all(&self) {
        let _guard = self.mtx.lock().unwrap();
        self.cv.notify_all();
    }
}

/// One worker: an input ring and an output ring.
pub(crate) struct Worker {
    pub input: Ring,
    pub inputs: Vec<Mutex<BlockSlot>>,
    pub output: Ring,
    pub outputs: Vec<Mutex<BlockSlot>>,
}

impl Worker {
    pub fn new(input_capacity: usize, output_capacity: usize) -> Self {
        Worker {
            input: Ring::new(),
            inputs: (0..RING_SLOTS)
                .map(|_| Mutex::new(BlockSlot::with_capacity(input_capacity)))
                .collect(),
            output: Ring::new(),
            outputs: (0..RING_SLOTS)
                .map(|_| Mutex::new(BlockSlot::with_capacity(output_capacity)))
                .collect(),
        }
    }

    pub fn input_slot(&self, index: u64) -> &Mutex<BlockSlot> {
        &self.inputs[(index % RING_SLOTS as u64) as usize]
    }

    pub fn output_slot(&self, index: u64) -> &Mutex<BlockSlot> {
        &self.outputs[(index % RING_SLOTS as u64) as usize]
    }

    pub fn wake_all(&self) {
        self.input.wake_all();
        self.output.wake_all();
    }
}
