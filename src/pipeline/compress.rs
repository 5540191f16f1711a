//! Compression pipeline.
//!
//! Threads: reader (slices input into blocks), workers (block encoder) and
//! writer (length-prefixed output in submission order).  Job submission is
//! asynchronous with optional completion/progress callbacks; the synchronous
//! wrapper parks on a rendezvous channel until its trampoline completion
//! callback fires.

use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::block::{encode_block, BlockContext};
use crate::config::{BLOCK_SIZE, OUTPUT_SIZE};
use crate::container::{block_count_for, encode_block_prefix, ContainerHeader, HEADER_LEN};

use super::job::{
    finish_job, reject, CompletionFn, Job, JobOutcome, ProgressFn, ReadSource, Sink, Source,
    WriteState, WriteTarget,
};
use super::worker::BlockSlot;
use super::{count_cores, Control};

/// Multi-threaded compressor.  One instance owns its threads and buffers
/// for its whole lifetime; dropping it drains outstanding jobs, signals
/// shutdown and joins every thread.
pub struct Compressor {
    control: Arc<Control>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl Compressor {
    /// Pipeline with one worker per available core.
    pub fn new() -> Self {
        Self::with_workers(count_cores())
    }

    /// Pipeline with an explicit worker count (at least 1).
    pub fn with_workers(n_workers: usize) -> Self {
        let n_workers = n_workers.max(1);
        let control = Control::new(n_workers, BLOCK_SIZE, OUTPUT_SIZE);

        let reader = {
            let control = Arc::clone(&control);
            spawn_thread("tsq-comp-reader", move || reader_loop(&control))
        };
        let writer = {
            let control = Arc::clone(&control);
            spawn_thread("tsq-comp-writer", move || writer_loop(&control))
        };
        let workers = (0..n_workers)
            .map(|index| {
                let control = Arc::clone(&control);
                spawn_thread("tsq-comp-worker", move || worker_loop(&control, index))
            })
            .collect();

        Compressor {
            control,
            reader: Some(reader),
            writer: Some(writer),
            workers,
        }
    }

    /// Compress synchronously; blocks until the job completes and returns
    /// its outcome.
    pub fn compress(&self, source: Source, sink: Sink, extensions: bool, level: u32) -> JobOutcome {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let trampoline: CompletionFn = Box::new(move |outcome| {
            let _ = tx.send(outcome);
        });
        self.compress_async(source, sink, extensions, level, Some(trampoline), None);
        rx.recv().expect("completion callback never fired")
    }

    /// Submit a compression job.  Returns a non-zero job id, or 0 when the
    /// submission is rejected up front (empty input, unopenable file); the
    /// completion callback fires exactly once either way.
    pub fn compress_async(
        &self,
        source: Source,
        sink: Sink,
        extensions: bool,
        level: u32,
        completion: Option<CompletionFn>,
        progress: Option<ProgressFn>,
    ) -> u32 {
        let (read_source, input_size) = match source {
            Source::Memory(data) => {
                let len = data.len() as u64;
                (ReadSource::Memory { data, cursor: 0 }, len)
            }
            Source::File(path) => {
                let file = match File::open(&path) {
                    Ok(f) => f,
                    Err(_) => return reject(completion),
                };
                let len = match file.metadata() {
                    Ok(m) => m.len(),
                    Err(_) => return reject(completion),
                };
                (ReadSource::File(file), len)
            }
        };
        if input_size == 0 {
            return reject(completion);
        }

        let n_blocks = block_count_for(input_size) as u64;
        let header = ContainerHeader {
            block_count: n_blocks as u32,
            total_size: input_size,
        };
        let target = match sink {
            Sink::File(path) => {
                let mut file = match File::create(&path) {
                    Ok(f) => f,
                    Err(_) => return reject(completion),
                };
                if file.write_all(&header.encode()).is_err() {
                    return reject(completion);
                }
                WriteTarget::File(file)
            }
            Sink::Memory => {
                // One contiguous worst-case buffer for the whole job;
                // allocation failure is an immediate rejection, not an abort.
                let mut buf = Vec::new();
                if buf
                    .try_reserve_exact(HEADER_LEN + n_blocks as usize * OUTPUT_SIZE)
                    .is_err()
                {
                    return reject(completion);
                }
                buf.extend_from_slice(&header.encode());
                WriteTarget::Memory(buf)
            }
        };

        self.control.enqueue(n_blocks, |id, start_block| {
            Arc::new(Job {
                id,
                start_block,
                n_blocks,
                extensions,
                level,
                input_size,
                error: AtomicBool::new(false),
                reader: Mutex::new(read_source),
                writer: Mutex::new(WriteState {
                    target,
                    written: 0,
                    completion,
                    progress,
                }),
            })
        })
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Compressor {
    fn drop(&mut self) {
        self.control.shutdown();
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
        if let Some(handle) = self.writer.take() {
            let _ = handle.join();
        }
    }
}

pub(crate) fn spawn_thread(
    name: &str,
    body: impl FnOnce() + Send + 'static,
) -> JoinHandle<()> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .expect("failed to spawn pipeline thread")
}

// ─────────────────────────────────────────────────────────────────────────────
// Thread bodies
// ─────────────────────────────────────────────────────────────────────────────

fn reader_loop(control: &Control) {
    let n_workers = control.workers.len() as u64;
    while let Some(job) = control.next_job() {
        for b in job.start_block..job.start_block + job.n_blocks {
            let worker = &control.workers[(b % n_workers) as usize];
            let slot_index = match worker.input.wait_space(&control.exit) {
                Some(index) => index,
                None => return,
            };
            {
                let mut slot = worker.input_slot(slot_index).lock().unwrap();
                fill_input_slot(&job, b, &mut slot);
            }
            worker.input.publish();
        }
        control.pop_job();
    }
}

/// Load block `b` of `job` into `slot`.  Read failures leave the slot
/// invalid, which the writer later turns into a failed job.
fn fill_input_slot(job: &Arc<Job>, b: u64, slot: &mut BlockSlot) {
    let offset = (b - job.start_block) * BLOCK_SIZE as u64;
    let to_read = (job.input_size - offset).min(BLOCK_SIZE as u64) as usize;

    slot.job = Some(Arc::clone(job));
    slot.extensions = job.extensions;
    slot.level = job.level;
    slot.len = to_read as u32;
    slot.valid = false;

    let mut source = job.reader.lock().unwrap();
    match &mut *source {
        ReadSource::Memory { data, cursor } => {
            if *cursor + to_read <= data.len() {
                slot.data[..to_read].copy_from_slice(&data[*cursor..*cursor + to_read]);
                *cursor += to_read;
                slot.valid = true;
            }
        }
        ReadSource::File(file) => {
            if file.read_exact(&mut slot.data[..to_read]).is_ok() {
                slot.valid = true;
            }
        }
    }
}

fn worker_loop(control: &Control, index: usize) {
    let mut ctx = BlockContext::new(0);
    let worker = &control.workers[index];
    loop {
        let in_index = match worker.input.wait_item(&control.exit) {
            Some(index) => index,
            None => return,
        };
        let out_index = match worker.output.wait_space(&control.exit) {
            Some(index) => index,
            None => return,
        };
        debug_assert_eq!(in_index, out_index);

        {
            let mut input = worker.input_slot(in_index).lock().unwrap();
            let mut output = worker.output_slot(out_index).lock().unwrap();
            let output = &mut *output;
            output.job = input.job.take();
            output.extensions = input.extensions;
            output.valid = false;
            output.len = 0;
            if input.valid {
                ctx.set_level(input.level);
                let n = encode_block(
                    &mut ctx,
                    &input.data[..input.len as usize],
                    &mut output.data,
                    input.extensions,
                );
                output.len = n as u32;
                output.valid = true;
            }
        }

        worker.input.retire();
        worker.output.publish();
    }
}

fn writer_loop(control: &Control) {
    let n_workers = control.workers.len() as u64;
    let mut i = 0u64;
    loop {
        let worker = &control.workers[(i % n_workers) as usize];
        let out_index = match worker.output.wait_item(&control.exit) {
            Some(index) => index,
            None => return,
        };

        let job = {
            let mut slot = worker.output_slot(out_index).lock().unwrap();
            let job = slot.job.take().expect("output slot without a job");
            if slot.valid && !job.has_error() {
                if append_block(&job, &slot).is_err() {
                    job.mark_error();
                }
            } else {
                job.mark_error();
            }
            job
        };
        worker.output.retire();

        job.emit_progress(i);
        if i == job.start_block + job.n_blocks - 1 {
            finish_job(&job, &control.inflight);
        }
        i += 1;
    }
}

/// Append one compressed block, 3-byte length prefix first.
fn append_block(job: &Arc<Job>, slot: &BlockSlot) -> io::Result<()> {
    let prefix = encode_block_prefix(slot.len, slot.extensions);
    let payload = &slot.data[..slot.len as usize];
    let mut state = job.writer.lock().unwrap();
    match &mut state.target {
        WriteTarget::Memory(buf) => {
            buf.extend_from_slice(&prefix);
            buf.extend_from_slice(payload);
        }
        WriteTarget::File(file) => {
            file.write_all(&prefix)?;
            file.write_all(payload)?;
        }
    }
    state.written += (prefix.len() + payload.len()) as u64;
    Ok(())
}
