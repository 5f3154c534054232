//! # dynflate codec
//!
//! A DEFLATE-style codec built from dynamic Huffman blocks:
//!
//! - **LZ77** ([`lz77`]): hash-chain match finder over a 32 KiB window
//! - **Huffman** ([`huffman`]): length-limited canonical codes
//! - **Header** ([`header`]): run-length encoded code lengths, HLIT/HDIST/HCLEN
//! - **Blocks** ([`block`]): BFINAL/BTYPE framing; stored and dynamic blocks
//! - **Orchestration** ([`deflate`], [`inflate`])
//!
//! Fixed-Huffman blocks (BTYPE=01) are neither produced nor accepted.
//!
//! ## Example
//!
//! ```rust
//! use dynflate_codec::{deflate, inflate};
//!
//! let original = b"Hello, World! Hello, World!";
//! let compressed = deflate(original).unwrap();
//!
//! let decompressed = inflate(&compressed).unwrap();
//! assert_eq!(&decompressed, original);
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use dynflate_codec::{DeflateConfig, deflate_with, inflate};
//!
//! let config = DeflateConfig::BEST.with_chunk_size(16 * 1024);
//! let data = vec![b'z'; 100_000];
//! let compressed = deflate_with(&data, config).unwrap();
//! assert_eq!(inflate(&compressed).unwrap(), data);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod block;
pub mod config;
pub mod deflate;
pub mod header;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod tables;

// Re-exports
pub use block::{BlockHeader, BlockType};
pub use config::DeflateConfig;
pub use deflate::{Deflater, deflate, deflate_with};
pub use header::{DynamicHeader, RleSymbol, rle_decode, rle_encode};
pub use huffman::{CanonicalCodeMap, HuffmanBuilder, HuffmanDecoder, build_length_limited_lengths};
pub use inflate::{DecodedBlock, Inflater, inflate};
pub use lz77::{EncodingResult, Lz77Matcher, MatchRecord};

pub use dynflate_core::{DynflateError, Result};
