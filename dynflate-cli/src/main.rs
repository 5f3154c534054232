//! dynflate CLI
//!
//! Compresses and decompresses files with the dynflate codec and inspects
//! the block structure of compressed streams.

mod commands;
mod utils;

use clap::{Parser, Subcommand};
use commands::{CompressionLevel, cmd_compress, cmd_decompress, cmd_info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dynflate")]
#[command(author, version, about = "Dynamic-Huffman DEFLATE-style compressor")]
#[command(long_about = "
dynflate compresses files into dynamic-Huffman DEFLATE blocks (one block per
input chunk, stored blocks where compression does not pay) and decompresses
them again.

Examples:
  dynflate compress notes.txt notes.dfl
  dynflate compress --level best --chunk-size 131072 data.bin data.dfl
  dynflate decompress notes.dfl notes.txt
  dynflate info notes.dfl
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a file
    #[command(alias = "c")]
    Compress {
        /// File to compress
        input: PathBuf,

        /// Compressed output file
        output: PathBuf,

        /// Compression level
        #[arg(short = 'l', long, value_enum, default_value = "normal")]
        level: CompressionLevel,

        /// Input bytes per block
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Never fall back to stored blocks
        #[arg(long)]
        no_stored: bool,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// Decompress a file
    #[command(alias = "d")]
    Decompress {
        /// Compressed input file
        input: PathBuf,

        /// Decompressed output file
        output: PathBuf,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Show progress bar
        #[arg(short = 'P', long)]
        progress: bool,
    },

    /// List the blocks of a compressed file
    #[command(alias = "i")]
    Info {
        /// Compressed file to inspect
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            level,
            chunk_size,
            no_stored,
            verbose,
            progress,
        } => cmd_compress(
            &input, &output, level, chunk_size, no_stored, verbose, progress,
        ),
        Commands::Decompress {
            input,
            output,
            verbose,
            progress,
        } => cmd_decompress(&input, &output, verbose, progress),
        Commands::Info { input } => cmd_info(&input),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
