//! Job model shared by the compression and decompression pipelines.
//!
//! A job is one top-level request spanning one or more blocks.  Inputs and
//! outputs are tagged variants over memory buffers and files; the completion
//! callback receives a [`JobOutcome`] that carries the memory output (or the
//! number of bytes written to the output file), which replaces the pointer
//! out-parameters of a C-style interface.

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Where a job's bytes come from.
pub enum Source {
    /// An owned in-memory buffer.
    Memory(Vec<u8>),
    /// A file path, opened at submission time.
    File(PathBuf),
}

/// Where a job's bytes go.
pub enum Sink {
    /// Collect into a single pre-sized in-memory buffer, handed to the
    /// completion callback.
    Memory,
    /// A file path, created at submission time.
    File(PathBuf),
}

/// The produced output of a finished job.
#[derive(Debug)]
pub enum SinkResult {
    /// The complete output buffer of a memory-sink job.
    Memory(Vec<u8>),
    /// Bytes written past the header for a file-sink job.
    File(u64),
}

/// Delivered to the completion callback, exactly once per accepted or
/// rejected submission.
#[derive(Debug)]
pub struct JobOutcome {
    /// The id returned by the asynchronous submission; 0 for submissions
    /// rejected before they were enqueued.
    pub job_id: u32,
    /// True iff every block of the job was processed and written.
    pub success: bool,
    /// Output of the job; `None` when the job failed before producing any.
    pub output: Option<SinkResult>,
}

/// Completion callback.  May run on the pipeline's writer thread; it must
/// not assume the submitting thread.
pub type CompletionFn = Box<dyn FnOnce(JobOutcome) + Send + 'static>;

/// Progress callback, invoked after every written block with a fraction in
/// `[0, 1]`.  Runs on the writer thread.
pub type ProgressFn = Box<dyn Fn(u32, f64) + Send + 'static>;

// ─────────────────────────────────────────────────────────────────────────────
// Internal job state
// ─────────────────────────────────────────────────────────────────────────────

/// Reader-side input state.
pub(crate) enum ReadSource {
    Memory { data: Vec<u8>, cursor: usize },
    File(File),
}

/// Writer-side output state.
pub(crate) enum WriteTarget {
    Memory(Vec<u8>),
    File(File),
}

pub(crate) struct WriteState {
    pub target: WriteTarget,
    /// Bytes appended past the container header.
    pub written: u64,
    pub completion: Option<CompletionFn>,
    pub progress: Option<ProgressFn>,
}

/// One in-flight request.  The reader and writer threads work on disjoint
/// halves; the error flag is the only state they share.
pub(crate) struct Job {
    pub id: u32,
    /// Global index of the job's first block; the queue hands out block
    /// indices from a single monotonic counter so the round-robin worker
    /// assignment stays aligned across jobs.
    pub start_block: u64,
    pub n_blocks: u64,
    pub extensions: bool,
    pub level: u32,
    /// Uncompressed input size (compression jobs only; decompression jobs
    /// learn their geometry from the container header).
    pub input_size: u64,
    /// Set on the first failed block; later blocks of the job are drained
    /// but not written.
    pub error: AtomicBool,
    pub reader: Mutex<ReadSource>,
    pub writer: Mutex<WriteState>,
}

impl Job {
    pub fn mark_error(&self) {
        self.error.store(true, Ordering::SeqCst);
    }

    pub fn has_error(&self) -> bool {
        self.error.load(Ordering::SeqCst)
    }

    /// Emit the progress callback for global block index `i`.
    pub fn emit_progress(&self, i: u64) {
        let state = self.writer.lock().unwrap();
        if let Some(progress) = &state.progress {
            let done = (i + 1 - self.start_block) as f64 / self.n_blocks as f64;
            progress(self.id, done.clamp(0.0, 1.0));
        }
    }

    /// Fire the completion callback with the final outcome and surrender the
    /// output.  Safe to call once; later calls are no-ops.
    pub fn complete(&self) {
        let (completion, outcome) = {
            let mut guard = self.writer.lock().unwrap();
            let state = &mut *guard;
            let completion = match state.completion.take() {
                Some(cb) => cb,
                None => return,
            };
            let success = !self.has_error();
            let written = state.written;
            let output = match &mut state.target {
                WriteTarget::Memory(buf) => Some(SinkResult::Memory(std::mem::take(buf))),
                WriteTarget::File(_) => Some(SinkResult::File(written)),
            };
            (
                completion,
                JobOutcome {
                    job_id: self.id,
                    success,
                    output,
                },
            )
        };
        completion(outcome);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-flight accounting
// ─────────────────────────────────────────────────────────────────────────────

/// Counts jobs between submission and completion so shutdown can wait for
/// the pipeline to drain.
pub(crate) struct InFlight {
    count: Mutex<u64>,
    cv: Condvar,
}

impl InFlight {
    pub fn new() -> Self {
        InFlight {
            count: Mutex::new(0),
            cv: Condvar::new(),
        }
    }

    pub fn enter(&self) {
        *self.count.lock().unwrap() += 1;
    }

    pub fn leave(&self) {
        let mut count = self.count.lock().unwrap();
        *count -= 1;
        if *count == 0 {
            self.cv.notify_all();
        }
    }

    /// Block until no job is in flight.
    pub fn drain(&self) {
        let mut count = self.count.lock().unwrap();
        while *count > 0 {
            count = self.cv.wait(count).unwrap();
        }
    }
}

/// Reject a submission before it is enqueued: fire the callback with a
/// failed outcome and return the zero job id.
pub(crate) fn reject(completion: Option<CompletionFn>) -> u32 {
    if let Some(cb) = completion {
        cb(JobOutcome {
            job_id: 0,
            success: false,
            output: None,
        });
    }
    0
}

/// Convenience used by the writer threads: `Arc<Job>` completion plus
/// in-flight bookkeeping.
pub(crate) fn finish_job(job: &Arc<Job>, inflight: &InFlight) {
    job.complete();
    inflight.leave();
}
