//! Decompression pipeline.
//!
//! The mirror image of the compression pipeline: the reader validates the
//! container header at submission time, then parses each block's 3-byte
//! length prefix (extensions flag in bit 23) and hands the payload to a
//! worker; workers run the block decoder; the writer appends decoded bytes
//! in submission order.  A corrupt block poisons the remainder of its job
//! while earlier blocks stay written.

use std::fs::File;
use std::io::{self, Read, Write};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::block::decode_block;
use crate::config::{BLOCK_SIZE, DECODE_PAD, OUTPUT_SIZE};
use crate::container::{
    block_len_in_range, parse_block_prefix, ContainerHeader, BLOCK_PREFIX_LEN, HEADER_LEN,
};

use super::compress::spawn_thread;
use super::job::{
    finish_job, reject, CompletionFn, Job, JobOutcome, ProgressFn, ReadSource, Sink, Source,
    WriteState, WriteTarget,
};
use super::worker::BlockSlot;
use super::{count_cores, Control};

/// Multi-threaded decompressor, the counterpart of
/// [`Compressor`](super::Compressor).
pub struct Decompressor {
    control: Arc<Control>,
    reader: Option<JoinHandle<()>>,
    writer: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl Decompressor {
    /// Pipeline with one worker per available core.
    pub fn new() -> Self {
        Self::with_workers(count_cores())
    }

    /// Pipeline with an explicit worker count (at least 1).
    pub fn with_workers(n_workers: usize) -> Self {
        let n_workers = n_workers.max(1);
        let control = Control::new(n_workers, OUTPUT_SIZE, BLOCK_SIZE + DECODE_PAD);

        let reader = {
            let control = Arc::clone(&control);
            spawn_thread("tsq-dec-reader", move || reader_loop(&control))
        };
        let writer = {
            let control = Arc::clone(&control);
            spawn_thread("tsq-dec-writer", move || writer_loop(&control))
        };
        let workers = (0..n_workers)
            .map(|index| {
                let control = Arc::clone(&control);
                spawn_thread("tsq-dec-worker", move || worker_loop(&control, index))
            })
            .collect();

        Decompressor {
            control,
            reader: Some(reader),
            writer: Some(writer),
            workers,
        }
    }

    /// Decompress synchronously; blocks until the job completes and returns
    /// its outcome.
    pub fn decompress(&self, source: Source, sink: Sink) -> JobOutcome {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let trampoline: CompletionFn = Box::new(move |outcome| {
            let _ = tx.send(outcome);
        });
        self.decompress_async(source, sink, Some(trampoline), None);
        rx.recv().expect("completion callback never fired")
    }

    /// Submit a decompression job.  The container header is validated here;
    /// a magic mismatch, zero block count or inconsistent sizes reject the
    /// submission immediately (id 0, completion fired with failure).
    pub fn decompress_async(
        &self,
        source: Source,
        sink: Sink,
        completion: Option<CompletionFn>,
        progress: Option<ProgressFn>,
    ) -> u32 {
        let (read_source, header) = match source {
            Source::Memory(data) => match ContainerHeader::parse(&data) {
                Ok(header) => (
                    ReadSource::Memory {
                        data,
                        cursor: HEADER_LEN,
                    },
                    header,
                ),
                Err(_) => return reject(completion),
            },
            Source::File(path) => {
                let mut file = match File::open(&path) {
                    Ok(f) => f,
                    Err(_) => return reject(completion),
                };
                let mut raw = [0u8; HEADER_LEN];
                if file.read_exact(&mut raw).is_err() {
                    return reject(completion);
                }
                match ContainerHeader::parse(&raw) {
                    Ok(header) => (ReadSource::File(file), header),
                    Err(_) => return reject(completion),
                }
            }
        };

        let n_blocks = header.block_count as u64;
        // A header announcing more content than its blocks can carry is
        // corrupt; rejecting here also bounds the output allocation.
        if header.total_size > n_blocks * BLOCK_SIZE as u64 {
            return reject(completion);
        }

        let target = match sink {
            Sink::File(path) => match File::create(&path) {
                Ok(file) => WriteTarget::File(file),
                Err(_) => return reject(completion),
            },
            Sink::Memory => {
                let mut buf = Vec::new();
                if buf.try_reserve_exact(header.total_size as usize).is_err() {
                    return reject(completion);
                }
                WriteTarget::Memory(buf)
            }
        };

        self.control.enqueue(n_blocks, |id, start_block| {
            Arc::new(Job {
                id,
                start_block,
                n_blocks,
                extensions: false,
                level: 0,
                input_size: header.total_size,
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

impl Default for Decompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Decompressor {
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
                fill_input_slot(&job, &mut slot);
            }
            worker.input.publish();
        }
        control.pop_job();
    }
}

/// Read the next block prefix and payload.  Truncation, a zero length or a
/// length beyond the block bound leave the slot invalid.
fn fill_input_slot(job: &Arc<Job>, slot: &mut BlockSlot) {
    slot.job = Some(Arc::clone(job));
    slot.level = 0;
    slot.valid = false;
    slot.len = 0;

    let mut source = job.reader.lock().unwrap();
    match &mut *source {
        ReadSource::Memory { data, cursor } => {
            if *cursor + BLOCK_PREFIX_LEN > data.len() {
                return;
            }
            let prefix: [u8; BLOCK_PREFIX_LEN] =
                data[*cursor..*cursor + BLOCK_PREFIX_LEN].try_into().unwrap();
            *cursor += BLOCK_PREFIX_LEN;
            let (len, extensions) = parse_block_prefix(prefix);
            if !block_len_in_range(len) {
                return;
            }
            let len = len as usize;
            if *cursor + len > data.len() {
                return;
            }
            slot.data[..len].copy_from_slice(&data[*cursor..*cursor + len]);
            *cursor += len;
            slot.len = len as u32;
            slot.extensions = extensions;
            slot.valid = true;
        }
        ReadSource::File(file) => {
            let mut prefix = [0u8; BLOCK_PREFIX_LEN];
            if file.read_exact(&mut prefix).is_err() {
                return;
            }
            let (len, extensions) = parse_block_prefix(prefix);
            if !block_len_in_range(len) {
                return;
            }
            let len = len as usize;
            if file.read_exact(&mut slot.data[..len]).is_err() {
                return;
            }
            slot.len = len as u32;
            slot.extensions = extensions;
            slot.valid = true;
        }
    }
}

fn worker_loop(control: &Control, index: usize) {
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
                match decode_block(
                    &input.data[..input.len as usize],
                    &mut output.data,
                    input.extensions,
                ) {
                    Ok(n) if n > 0 => {
                        output.len = n as u32;
                        output.valid = true;
                    }
                    _ => {}
                }
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
                if append_decoded(&job, &slot).is_err() {
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

fn append_decoded(job: &Arc<Job>, slot: &BlockSlot) -> io::Result<()> {
    let payload = &slot.data[..slot.len as usize];
    let mut state = job.writer.lock().unwrap();
    match &mut state.target {
        WriteTarget::Memory(buf) => buf.extend_from_slice(payload),
        WriteTarget::File(file) => file.write_all(payload)?,
    }
    state.written += payload.len() as u64;
    Ok(())
}
