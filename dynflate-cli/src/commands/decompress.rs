//! Decompress command implementation.

use crate::utils::{create_progress_bar, init_logging, space_savings};
use dynflate_codec::Inflater;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

pub fn cmd_decompress(
    input: &Path,
    output: &Path,
    verbose: bool,
    progress: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(verbose);

    let input_len = std::fs::metadata(input)?.len();
    let pb = create_progress_bar(input_len, progress);
    let reader = pb.wrap_read(BufReader::new(File::open(input)?));
    let writer = BufWriter::new(File::create(output)?);

    let mut inflater = Inflater::new(reader);
    let result = inflater.inflate_to(writer);
    pb.finish_and_clear();

    let written = match result {
        Ok(written) => written,
        Err(e) => {
            // Don't leave a partial file behind.
            let _ = std::fs::remove_file(output);
            return Err(e.into());
        }
    };

    if verbose {
        println!(
            "{} -> {}: {} -> {} bytes ({:.1}% saved, {} blocks)",
            input.display(),
            output.display(),
            input_len,
            written,
            space_savings(written, input_len),
            inflater.blocks_decoded()
        );
    }

    Ok(())
}
