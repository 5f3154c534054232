//! # dynflate Core
//!
//! Core components shared by the dynflate codec and CLI:
//!
//! - [`bitstream`]: `BitReader` / `BitWriter` over byte readers and writers
//! - [`traits`]: the `BitSource` / `BitSink` seam the codec reads and writes through
//! - [`error`]: Error types
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ CLI: file handles, chunking, progress                   │
//! ├─────────────────────────────────────────────────────────┤
//! │ Codec: LZ77 matcher, Huffman builder, header/RLE,       │
//! │        block orchestration                              │
//! ├─────────────────────────────────────────────────────────┤
//! │ BitStream (this crate): BitReader/BitWriter, errors     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dynflate_core::bitstream::BitReader;
//! use std::io::Cursor;
//!
//! let mut reader = BitReader::new(Cursor::new(vec![0xAB, 0xCD]));
//! let bits = reader.read_bits(12).unwrap();
//! assert_eq!(bits, 0xDAB);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitstream;
pub mod error;
pub mod traits;

// Re-exports for convenience
pub use bitstream::{BitReader, BitWriter};
pub use error::{DynflateError, Result};
pub use traits::{BitSink, BitSource};
