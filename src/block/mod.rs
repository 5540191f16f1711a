//! Single-block codec: matcher, encoder and decoder.
//!
//! | Module     | Contents |
//! |------------|----------|
//! | `types`    | Fixed-width copies and little-endian wire access. |
//! | `matchref` | FastRef / MultiRef match index and `BlockContext`. |
//! | `encode`   | Block encoder (groups of eight symbols). |
//! | `decode`   | Block decoder (fast loop plus safe tail). |

pub mod decode;
pub mod encode;
pub mod matchref;
pub mod types;

pub use decode::{decode_block, DecodeError};
pub use encode::encode_block;
pub use matchref::BlockContext;
