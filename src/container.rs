//! Container framing: the 16-byte stream header and the per-block length
//! prefix.
//!
//! A compressed stream is the header followed by `block_count` blocks, each
//! introduced by a 24-bit little-endian length whose top bit (bit 23)
//! carries the block's extensions flag; the low 23 bits give the payload
//! length in bytes.

use std::fmt;

use crate::config::{BLOCK_SIZE, OUTPUT_SIZE};
use crate::block::types::{read_le24, write_le24};

/// Stream magic, first four bytes of every container.
pub const MAGIC: [u8; 4] = *b"TSQ1";

/// Size of the container header in bytes.
pub const HEADER_LEN: usize = 16;

/// Size of the per-block length prefix in bytes.
pub const BLOCK_PREFIX_LEN: usize = 3;

/// Extensions flag bit inside a block length prefix.
const EXTENSIONS_BIT: u32 = 0x80_0000;

/// Payload-length mask of a block length prefix.
const LENGTH_MASK: u32 = 0x7F_FFFF;

/// Errors raised while reading a container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerError {
    /// Fewer than [`HEADER_LEN`] bytes available.
    TruncatedHeader,
    /// The magic bytes are not `"TSQ1"`.
    BadMagic,
    /// A well-formed header announcing zero blocks.
    EmptyContainer,
}

impl fmt::Display for ContainerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerError::TruncatedHeader => write!(f, "container header truncated"),
            ContainerError::BadMagic => write!(f, "container magic mismatch"),
            ContainerError::EmptyContainer => write!(f, "container announces zero blocks"),
        }
    }
}

impl std::error::Error for ContainerError {}

/// Parsed container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerHeader {
    /// Number of compressed blocks that follow the header.
    pub block_count: u32,
    /// Total uncompressed size of the stream in bytes.
    pub total_size: u64,
}

impl ContainerHeader {
    /// Header for a stream of `total_size` uncompressed bytes.
    pub fn for_size(total_size: u64) -> Self {
        ContainerHeader {
            block_count: block_count_for(total_size),
            total_size,
        }
    }

    /// Serialize to the 16-byte wire form.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[..4].copy_from_slice(&MAGIC);
        out[4..8].copy_from_slice(&self.block_count.to_le_bytes());
        out[8..16].copy_from_slice(&self.total_size.to_le_bytes());
        out
    }

    /// Parse and validate a header from the front of `buf`.
    pub fn parse(buf: &[u8]) -> Result<Self, ContainerError> {
        if buf.len() < HEADER_LEN {
            return Err(ContainerError::TruncatedHeader);
        }
        if buf[..4] != MAGIC {
            return Err(ContainerError::BadMagic);
        }
        let block_count = u32::from_le_bytes(buf[4..8].try_into().unwrap());
        let total_size = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        if block_count == 0 {
            return Err(ContainerError::EmptyContainer);
        }
        Ok(ContainerHeader {
            block_count,
            total_size,
        })
    }
}

/// Number of blocks needed to cover `len` uncompressed bytes.
pub fn block_count_for(len: u64) -> u32 {
    let blocks = len / BLOCK_SIZE as u64 + u64::from(len % BLOCK_SIZE as u64 != 0);
    blocks as u32
}

/// Build a block's 3-byte length prefix.
pub fn encode_block_prefix(payload_len: u32, extensions: bool) -> [u8; BLOCK_PREFIX_LEN] {
    debug_assert!(payload_len <= LENGTH_MASK);
    let mut word = payload_len;
    if extensions {
        word |= EXTENSIONS_BIT;
    }
    let mut out = [0u8; BLOCK_PREFIX_LEN];
    write_le24(&mut out, word);
    out
}

/// Split a block length prefix into `(payload_len, extensions)`.
pub fn parse_block_prefix(prefix: [u8; BLOCK_PREFIX_LEN]) -> (u32, bool) {
    let word = read_le24(&prefix);
    (word & LENGTH_MASK, word & EXTENSIONS_BIT != 0)
}

/// Whether a parsed block length is plausible for this geometry.
#[inline]
pub fn block_len_in_range(payload_len: u32) -> bool {
    payload_len > 0 && payload_len as usize <= OUTPUT_SIZE
}
