//! Multi-threaded compression and decompression pipelines.
//!
//! A pipeline instance owns one reader thread, `W` worker threads and one
//! writer thread.  The reader slices a job's input into blocks and deals
//! them to the workers round-robin; each worker runs the block codec with
//! its own reusable context; the writer drains the workers in the same
//! round-robin order, so blocks are emitted in exactly the order they were
//! submitted.  Per-worker ring buffers (three slots per side) bound the
//! memory in flight and provide all inter-thread backpressure.
//!
//! | Module       | Contents |
//! |--------------|----------|
//! | `worker`     | Ring buffers and slot ownership. |
//! | `job`        | Job model, sources/sinks, callbacks. |
//! | `compress`   | Compression pipeline ([`Compressor`]). |
//! | `decompress` | Decompression pipeline ([`Decompressor`]). |

pub mod compress;
pub mod decompress;
pub mod job;
pub(crate) mod worker;

pub use compress::Compressor;
pub use decompress::Decompressor;
pub use job::{CompletionFn, JobOutcome, ProgressFn, Sink, SinkResult, Source};

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use job::{InFlight, Job};
use worker::Worker;

/// Number of logical cores available to the process, at least 1.
pub fn count_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared controller state
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) struct QueueState {
    jobs: VecDeque<Arc<Job>>,
    /// Monotonic global block counter; job `start_block`s are carved out of
    /// it at submission so the worker round-robin stays aligned across jobs.
    next_block: u64,
    next_job_id: u32,
}

/// State shared by every thread of one pipeline instance.
pub(crate) struct Control {
    pub workers: Vec<Worker>,
    queue: Mutex<QueueState>,
    queue_cv: Condvar,
    pub inflight: InFlight,
    pub exit: AtomicBool,
}

impl Control {
    pub fn new(n_workers: usize, input_capacity: usize, output_capacity: usize) -> Arc<Self> {
        Arc::new(Control {
            workers: (0..n_workers)
                .map(|_| Worker::new(input_capacity, output_capacity))
                .collect(),
            queue: Mutex::new(QueueState {
                jobs: VecDeque::new(),
                next_block: 0,
                next_job_id: 1,
            }),
            queue_cv: Condvar::new(),
            inflight: InFlight::new(),
            exit: AtomicBool::new(false),
        })
    }

    /// Assign a job id and block range, enqueue, and wake the reader.
    pub fn enqueue(&self, n_blocks: u64, make: impl FnOnce(u32, u64) -> Arc<Job>) -> u32 {
        let mut queue = self.queue.lock().unwrap();
        let id = queue.next_job_id;
        queue.next_job_id = queue.next_job_id.checked_add(1).unwrap_or(1);
        let start_block = queue.next_block;
        queue.next_block += n_blocks;
        let job = make(id, start_block);
        self.inflight.enter();
        queue.jobs.push_back(job);
        drop(queue);
        self.queue_cv.notify_all();
        id
    }

    /// Reader side: block until a job is queued, or shutdown.  The job stays
    /// at the queue front until [`Control::pop_job`].
    pub fn next_job(&self) -> Option<Arc<Job>> {
        let mut queue = self.queue.lock().unwrap();
        loop {
            if self.exit.load(Ordering::SeqCst) {
                return None;
            }
            if let Some(job) = queue.jobs.front() {
                return Some(Arc::clone(job));
            }
            queue = self.queue_cv.wait(queue).unwrap();
        }
    }

    /// Reader side: drop the fully dispatched front job.
    pub fn pop_job(&self) {
        let mut queue = self.queue.lock().unwrap();
        queue.jobs.pop_front();
        drop(queue);
        self.queue_cv.notify_all();
    }

    /// Cooperative shutdown: wait for in-flight jobs to drain, raise the
    /// exit flag, then wake every sleeper so all threads observe it.
    pub fn shutdown(&self) {
        self.inflight.drain();
        self.exit.store(true, Ordering::SeqCst);
        {
            let _guard = self.queue.lock().unwrap();
        }
        self.queue_cv.notify_all();
        for worker in &self.workers {
            worker.wake_all();
        }
    }
}
