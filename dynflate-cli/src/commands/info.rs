//! Info command implementation.

use crate::utils::space_savings;
use dynflate_codec::Inflater;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

pub fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let metadata = std::fs::metadata(input)?;
    let mut inflater = Inflater::new(BufReader::new(File::open(input)?));

    println!("Stream Information");
    println!("==================");
    println!("File: {}", input.display());
    println!("Size: {} bytes", metadata.len());
    println!();
    println!(
        "{:>5} {:>5} {:>8} {:>5} {:>5} {:>5} {:>10} {:>10}",
        "Block", "Final", "Type", "HLIT", "HDIST", "HCLEN", "Bits", "Size"
    );
    println!("{}", "-".repeat(62));

    let mut index = 0u64;
    let mut total_size = 0u64;
    while let Some(block) = inflater.next_block()? {
        let (hlit, hdist, hclen) = match block.dynamic {
            Some(d) => (d.hlit.to_string(), d.hdist.to_string(), d.hclen.to_string()),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        println!(
            "{:>5} {:>5} {:>8} {:>5} {:>5} {:>5} {:>10} {:>10}",
            index,
            if block.header.is_final { "yes" } else { "no" },
            block.header.block_type,
            hlit,
            hdist,
            hclen,
            block.end_bit - block.start_bit,
            block.data.len()
        );
        index += 1;
        total_size += block.data.len() as u64;
    }

    println!("{}", "-".repeat(62));
    println!("Blocks: {}", index);
    println!("Decompressed size: {} bytes", total_size);
    if total_size > 0 {
        println!(
            "Space savings: {:.1}%",
            space_savings(total_size, metadata.len())
        );
    }

    Ok(())
}
