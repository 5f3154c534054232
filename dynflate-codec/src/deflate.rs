//! Compression: chunks in, blocks out.
//!
//! Each input chunk is parsed by the LZ77 matcher, its symbol frequencies
//! drive two length-limited Huffman codes, and the block is written as
//!
//! ```text
//! BFINAL BTYPE=10 | HLIT HDIST HCLEN | code-length lengths | RLE lengths | records | EOB
//! ```
//!
//! After a back-reference the next literal/length symbol is the record's
//! trailing literal, or end-of-block when the match ran to the end of the
//! chunk. When a dynamic block would be larger than storing the chunk, the
//! chunk goes out as stored blocks instead.

use crate::block::{BlockHeader, BlockType};
use crate::config::DeflateConfig;
use crate::header::DynamicHeader;
use crate::huffman::{
    CanonicalCodeMap, DISTANCE_ALPHABET_SIZE, END_OF_BLOCK, HuffmanBuilder, LITLEN_ALPHABET_SIZE,
    MAX_CODE_LENGTH,
};
use crate::lz77::{EncodingResult, Lz77Matcher, MatchRecord};
use crate::tables::{distance_to_code, length_to_code};
use dynflate_core::BitWriter;
use dynflate_core::error::Result;
use dynflate_core::traits::BitSink;
use std::io::{Read, Write};

/// Largest payload of one stored block.
pub const MAX_STORED_BLOCK: usize = 65535;

/// Huffman codes and header for one dynamic block.
struct DynamicBlock {
    litlen: CanonicalCodeMap,
    distance: CanonicalCodeMap,
    header: DynamicHeader,
}

impl DynamicBlock {
    fn build(records: &EncodingResult) -> Self {
        let mut litlen = HuffmanBuilder::new(LITLEN_ALPHABET_SIZE, MAX_CODE_LENGTH);
        let mut distance = HuffmanBuilder::new(DISTANCE_ALPHABET_SIZE, MAX_CODE_LENGTH);

        for record in records {
            if !record.is_literal() {
                litlen.add(length_to_code(record.length).symbol);
                distance.add(distance_to_code(record.offset).symbol);
            }
            if let Some(byte) = record.literal_after {
                litlen.add(byte as u16);
            }
        }
        // One end-of-block per block, whether it closes the record stream
        // or stands in for a missing trailing literal.
        litlen.add(END_OF_BLOCK);

        let litlen = litlen.build_codes();
        let distance = distance.build_codes();
        let header = DynamicHeader::build(&litlen.lengths(), &distance.lengths());

        Self {
            litlen,
            distance,
            header,
        }
    }

    /// Bits needed for the records and the end-of-block code.
    fn body_cost(&self, records: &EncodingResult) -> u64 {
        let mut bits = self.litlen.length(END_OF_BLOCK) as u64;
        for record in records {
            if !record.is_literal() {
                let len = length_to_code(record.length);
                let dist = distance_to_code(record.offset);
                bits += self.litlen.length(len.symbol) as u64 + len.extra_bits as u64;
                bits += self.distance.length(dist.symbol) as u64 + dist.extra_bits as u64;
            }
            if let Some(byte) = record.literal_after {
                bits += self.litlen.length(byte as u16) as u64;
            }
        }
        bits
    }

    /// Bits for the whole block, block header included.
    fn bit_cost(&self, records: &EncodingResult) -> u64 {
        BlockHeader::BITS + self.header.bit_cost() + self.body_cost(records)
    }

    fn write<S: BitSink>(&self, sink: &mut S, records: &EncodingResult, is_final: bool) -> Result<()> {
        BlockHeader::new(is_final, BlockType::DynamicHuffman).write(sink)?;
        self.header.write(sink)?;

        for (index, record) in records.iter().enumerate() {
            if !record.is_literal() {
                self.write_match(sink, record)?;
            }
            match record.literal_after {
                Some(byte) => self.litlen.write_symbol(sink, byte as u16)?,
                None => {
                    // The match reached the end of the chunk; EOB takes the
                    // trailing literal's place and closes the block.
                    debug_assert_eq!(index + 1, records.len());
                    return self.litlen.write_symbol(sink, END_OF_BLOCK);
                }
            }
        }

        self.litlen.write_symbol(sink, END_OF_BLOCK)
    }

    fn write_match<S: BitSink>(&self, sink: &mut S, record: &MatchRecord) -> Result<()> {
        let len = length_to_code(record.length);
        self.litlen.write_symbol(sink, len.symbol)?;
        sink.write_bits(len.extra_value as u32, len.extra_bits)?;

        let dist = distance_to_code(record.offset);
        self.distance.write_symbol(sink, dist.symbol)?;
        sink.write_bits(dist.extra_value as u32, dist.extra_bits)
    }
}

/// Bits needed to store `len` bytes starting at bit offset `start`.
fn stored_cost(start: u64, len: usize) -> u64 {
    let blocks = len.div_ceil(MAX_STORED_BLOCK).max(1);
    let mut pos = start;
    let mut remaining = len;
    for _ in 0..blocks {
        let size = remaining.min(MAX_STORED_BLOCK);
        pos = (pos + BlockHeader::BITS).div_ceil(8) * 8;
        pos += 32 + 8 * size as u64;
        remaining -= size;
    }
    pos - start
}

/// DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    matcher: Lz77Matcher,
    config: DeflateConfig,
    blocks_written: u64,
}

impl Deflater {
    /// Create a compressor with the default configuration.
    pub fn new() -> Self {
        Self {
            matcher: Lz77Matcher::with_max_chain(DeflateConfig::DEFAULT.max_chain),
            config: DeflateConfig::DEFAULT,
            blocks_written: 0,
        }
    }

    /// Create a compressor with a custom configuration.
    pub fn with_config(config: DeflateConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            matcher: Lz77Matcher::with_max_chain(config.max_chain),
            config,
            blocks_written: 0,
        })
    }

    /// Configuration in use.
    pub fn config(&self) -> &DeflateConfig {
        &self.config
    }

    /// Blocks emitted since this compressor was created.
    pub fn blocks_written(&self) -> u64 {
        self.blocks_written
    }

    /// Compress `data` as a complete stream into `writer`.
    pub fn compress<W: Write>(&mut self, data: &[u8], writer: W) -> Result<()> {
        let mut bit_writer = BitWriter::new(writer);

        if data.is_empty() {
            self.write_chunk(&mut bit_writer, data, true)?;
        } else {
            let chunk_count = data.len().div_ceil(self.config.chunk_size);
            for (index, chunk) in data.chunks(self.config.chunk_size).enumerate() {
                self.write_chunk(&mut bit_writer, chunk, index + 1 == chunk_count)?;
            }
        }

        bit_writer.flush()
    }

    /// Compress everything `reader` yields as a complete stream into
    /// `writer`. Returns the number of input bytes consumed.
    ///
    /// One chunk of lookahead is kept so the last block can carry BFINAL.
    pub fn compress_reader<R: Read, W: Write>(&mut self, mut reader: R, writer: W) -> Result<u64> {
        let chunk_size = self.config.chunk_size;
        let mut bit_writer = BitWriter::new(writer);

        let mut current = read_chunk(&mut reader, chunk_size)?;
        let mut total = current.len() as u64;

        loop {
            let next = if current.len() < chunk_size {
                Vec::new()
            } else {
                read_chunk(&mut reader, chunk_size)?
            };
            let is_final = next.is_empty();

            log::trace!(
                "chunk at input offset {}: {} bytes{}",
                total - current.len() as u64,
                current.len(),
                if is_final { " (last)" } else { "" }
            );
            self.write_chunk(&mut bit_writer, &current, is_final)?;

            if is_final {
                break;
            }
            total += next.len() as u64;
            current = next;
        }

        bit_writer.flush()?;
        Ok(total)
    }

    /// Compress `data` into a new vector.
    pub fn compress_to_vec(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() / 2 + 16);
        self.compress(data, &mut output)?;
        Ok(output)
    }

    /// Encode one chunk as a dynamic block, or as stored blocks when that
    /// is smaller and allowed.
    fn write_chunk<W: Write>(
        &mut self,
        writer: &mut BitWriter<W>,
        chunk: &[u8],
        is_final: bool,
    ) -> Result<()> {
        let records = self.matcher.encode(chunk);
        let block = DynamicBlock::build(&records);

        let dynamic_bits = block.bit_cost(&records);
        let stored_bits = stored_cost(writer.bits_written(), chunk.len());

        if self.config.allow_stored && stored_bits < dynamic_bits {
            log::debug!(
                "block {}: stored, final={}, {} bytes ({} bits, dynamic would be {})",
                self.blocks_written,
                is_final,
                chunk.len(),
                stored_bits,
                dynamic_bits
            );
            return self.write_stored(writer, chunk, is_final);
        }

        let start = writer.bits_written();
        block.write(writer, &records, is_final)?;
        debug_assert_eq!(writer.bits_written() - start, dynamic_bits);

        log::debug!(
            "block {}: dynamic, final={}, {} bytes, {} records, HLIT={} HDIST={} HCLEN={}, {} bits",
            self.blocks_written,
            is_final,
            chunk.len(),
            records.len(),
            block.header.hlit,
            block.header.hdist,
            block.header.hclen,
            dynamic_bits
        );
        self.blocks_written += 1;
        Ok(())
    }

    /// Write `data` as one or more stored blocks; BFINAL goes on the last.
    fn write_stored<W: Write>(
        &mut self,
        writer: &mut BitWriter<W>,
        data: &[u8],
        is_final: bool,
    ) -> Result<()> {
        let mut pieces = data.chunks(MAX_STORED_BLOCK).peekable();
        if pieces.peek().is_none() {
            return self.write_stored_block(writer, &[], is_final);
        }
        while let Some(piece) = pieces.next() {
            let last = pieces.peek().is_none();
            self.write_stored_block(writer, piece, is_final && last)?;
        }
        Ok(())
    }

    fn write_stored_block<W: Write>(
        &mut self,
        writer: &mut BitWriter<W>,
        piece: &[u8],
        is_final: bool,
    ) -> Result<()> {
        BlockHeader::new(is_final, BlockType::Stored).write(writer)?;
        writer.align_to_byte()?;

        let len = piece.len() as u16;
        writer.write_bits(len as u32, 16)?;
        writer.write_bits(!len as u32, 16)?;
        writer.write_bytes(piece)?;

        self.blocks_written += 1;
        Ok(())
    }
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new()
    }
}

/// Read up to `chunk_size` bytes; fewer only when the reader is exhausted.
fn read_chunk<R: Read>(reader: &mut R, chunk_size: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.by_ref().take(chunk_size as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Compress `data` with the default configuration.
pub fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    Deflater::new().compress_to_vec(data)
}

/// Compress `data` with the given configuration.
pub fn deflate_with(data: &[u8], config: DeflateConfig) -> Result<Vec<u8>> {
    Deflater::with_config(config)?.compress_to_vec(data)
}
