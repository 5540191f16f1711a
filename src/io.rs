//! Single-threaded streaming compression and decompression over generic
//! `Read`/`Write` endpoints, plus path-based convenience wrappers.
//!
//! A minimal streaming path that reuses one [`BlockContext`] and a pair of
//! block buffers: read a block, run the codec, append the result.  The
//! multi-threaded pipeline in [`crate::pipeline`] is the fast path; these
//! helpers serve small tools, tests and adapters where thread startup is
//! not worth it.
//!
//! The container header carries the block count, so the uncompressed size
//! must be known when compression starts; arbitrary non-seekable streams
//! therefore pass it explicitly.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::block::{decode_block, encode_block, BlockContext};
use crate::config::{encode_bound, BLOCK_SIZE, DECODE_PAD, OUTPUT_SIZE};
use crate::container::{
    block_len_in_range, encode_block_prefix, parse_block_prefix, ContainerHeader,
    BLOCK_PREFIX_LEN, HEADER_LEN,
};

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// Compress exactly `total_size` bytes from `reader` into `writer` as a
/// complete container.  Returns the total number of bytes written.
///
/// Fails with `InvalidData` for a zero `total_size` (a zero-block container
/// could never be decompressed) and with `UnexpectedEof` when the reader
/// runs dry early.
pub fn compress_stream<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    total_size: u64,
    extensions: bool,
    level: u32,
) -> io::Result<u64> {
    if total_size == 0 {
        return Err(invalid_data("refusing to write a zero-block container"));
    }

    let header = ContainerHeader::for_size(total_size);
    writer.write_all(&header.encode())?;

    let mut ctx = BlockContext::new(level);
    let mut block = vec![0u8; BLOCK_SIZE];
    let mut packed = vec![0u8; encode_bound(BLOCK_SIZE)];
    let mut written = HEADER_LEN as u64;
    let mut remaining = total_size;

    while remaining > 0 {
        let to_read = remaining.min(BLOCK_SIZE as u64) as usize;
        reader.read_exact(&mut block[..to_read])?;
        let n = encode_block(&mut ctx, &block[..to_read], &mut packed, extensions);
        writer.write_all(&encode_block_prefix(n as u32, extensions))?;
        writer.write_all(&packed[..n])?;
        written += (BLOCK_PREFIX_LEN + n) as u64;
        remaining -= to_read as u64;
    }

    writer.flush()?;
    Ok(written)
}

/// Decompress a complete container from `reader` into `writer`.  Returns
/// the number of decoded bytes written.
///
/// Any framing or codec damage surfaces as `InvalidData`; a short read as
/// `UnexpectedEof`.
pub fn decompress_stream<R: Read, W: Write>(reader: &mut R, writer: &mut W) -> io::Result<u64> {
    let mut raw = [0u8; HEADER_LEN];
    reader.read_exact(&mut raw)?;
    let header =
        ContainerHeader::parse(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let mut packed = vec![0u8; OUTPUT_SIZE];
    let mut block = vec![0u8; BLOCK_SIZE + DECODE_PAD];
    let mut written = 0u64;

    for _ in 0..header.block_count {
        let mut prefix = [0u8; BLOCK_PREFIX_LEN];
        reader.read_exact(&mut prefix)?;
        let (len, extensions) = parse_block_prefix(prefix);
        if !block_len_in_range(len) {
            return Err(invalid_data("block length out of range"));
        }
        let len = len as usize;
        reader.read_exact(&mut packed[..len])?;
        let n = decode_block(&packed[..len], &mut block, extensions)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writer.write_all(&block[..n])?;
        written += n as u64;
    }

    if written != header.total_size {
        return Err(invalid_data("decoded size disagrees with the header"));
    }
    writer.flush()?;
    Ok(written)
}

/// Compress the file at `input` into a container at `output`.
pub fn compress_file(
    input: &Path,
    output: &Path,
    extensions: bool,
    level: u32,
) -> io::Result<u64> {
    let mut reader = File::open(input)?;
    let total_size = reader.metadata()?.len();
    if total_size == 0 {
        return Err(invalid_data("refusing to write a zero-block container"));
    }
    let mut writer = File::create(output)?;
    compress_stream(&mut reader, &mut writer, total_size, extensions, level)
}

/// Decompress the container at `input` into the file at `output`.
pub fn decompress_file(input: &Path, output: &Path) -> io::Result<u64> {
    let mut reader = File::open(input)?;
    let mut writer = File::create(output)?;
    decompress_stream(&mut reader, &mut writer)
}
