//! Compress command implementation.

use crate::utils::{create_progress_bar, init_logging, space_savings};
use clap::ValueEnum;
use dynflate_codec::{DeflateConfig, Deflater};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Compression level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum CompressionLevel {
    /// Short hash-chain walks
    Fast,
    /// Normal compression (default)
    #[default]
    Normal,
    /// Deep hash-chain walks
    Best,
}

impl CompressionLevel {
    /// Codec preset for this level.
    pub fn config(self) -> DeflateConfig {
        match self {
            Self::Fast => DeflateConfig::FAST,
            Self::Normal => DeflateConfig::DEFAULT,
            Self::Best => DeflateConfig::BEST,
        }
    }
}

pub fn cmd_compress(
    input: &Path,
    output: &Path,
    level: CompressionLevel,
    chunk_size: Option<usize>,
    no_stored: bool,
    verbose: bool,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(verbose);

    let mut config = level.config().with_allow_stored(!no_stored);
    if let Some(chunk_size) = chunk_size {
        config = config.with_chunk_size(chunk_size);
    }
    let mut deflater = Deflater::with_config(config)?;

    let input_len = std::fs::metadata(input)?.len();
    let pb = create_progress_bar(input_len, progress);
    let reader = pb.wrap_read(BufReader::new(File::open(input)?));
    let writer = BufWriter::new(File::create(output)?);

    let consumed = deflater.compress_reader(reader, writer)?;
    pb.finish_and_clear();

    if verbose {
        let compressed = std::fs::metadata(output)?.len();
        println!(
            "{} -> {}: {} -> {} bytes ({:.1}% saved, {} blocks, level {:?})",
            input.display(),
            output.display(),
            consumed,
            compressed,
            space_savings(consumed, compressed),
            deflater.blocks_written(),
            level
        );
    }

    Ok(())
}
