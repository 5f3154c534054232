//! Command implementations for the dynflate CLI.

pub mod compress;
pub mod decompress;
pub mod info;

pub use compress::{CompressionLevel, cmd_compress};
pub use decompress::cmd_decompress;
pub use info::cmd_info;
