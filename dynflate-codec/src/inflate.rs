//! Decompression (inflate).
//!
//! The decoder is a small state machine over blocks:
//!
//! ```text
//! ExpectHeader ──BTYPE=00──▶ stored ─────┐
//!      │  ▲                              │
//!      │  └──────── BFINAL=0 ◀───────────┤
//!      └─────BTYPE=10──▶ dynamic ────────┤
//!                                        └── BFINAL=1 ──▶ Done
//! ```
//!
//! `BTYPE=01` and `BTYPE=11` fail with `UnsupportedBlockType`. Back-references
//! may reach into earlier blocks of the same stream; only the last 32 KiB of
//! output is retained for that.
//!
//! Dynamic blocks follow the trailing-literal rule: every match is followed by
//! exactly one literal (0-255) or by end-of-block. A length symbol directly
//! after a match is `MalformedBitstream`, so general DEFLATE streams that
//! place two matches back to back are rejected even though zlib accepts them.

use crate::block::{BlockHeader, BlockType};
use crate::header::DynamicHeader;
use crate::huffman::{END_OF_BLOCK, HuffmanDecoder};
use crate::lz77::{WINDOW_SIZE, copy_match};
use crate::tables::{decode_distance, decode_length, distance_symbol_info, length_symbol_info};
use dynflate_core::BitReader;
use dynflate_core::error::{DynflateError, Result};
use std::io::{Cursor, Read, Write};

/// Sizing fields of a dynamic block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicInfo {
    /// Literal/length code count minus 257.
    pub hlit: u8,
    /// Distance code count minus 1.
    pub hdist: u8,
    /// Code-length code count minus 4.
    pub hclen: u8,
    /// Size of the dynamic header in bits (after BFINAL/BTYPE).
    pub header_bits: u64,
}

/// One decoded block.
#[derive(Debug, Clone)]
pub struct DecodedBlock {
    /// BFINAL and BTYPE.
    pub header: BlockHeader,
    /// Header sizing fields, for dynamic blocks.
    pub dynamic: Option<DynamicInfo>,
    /// Bit offset of the block in the stream.
    pub start_bit: u64,
    /// Bit offset just past the block.
    pub end_bit: u64,
    /// Decoded bytes.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectHeader,
    Done,
}

/// Streaming DEFLATE decompressor.
#[derive(Debug)]
pub struct Inflater<R: Read> {
    reader: BitReader<R>,
    /// Tail of the output so far, at most `WINDOW_SIZE` bytes.
    history: Vec<u8>,
    state: State,
    blocks_decoded: u64,
}

impl<R: Read> Inflater<R> {
    /// Create a decompressor reading from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BitReader::new(reader),
            history: Vec::with_capacity(WINDOW_SIZE),
            state: State::ExpectHeader,
            blocks_decoded: 0,
        }
    }

    /// Whether the final block has been decoded (or decoding failed).
    pub fn is_finished(&self) -> bool {
        self.state == State::Done
    }

    /// Number of blocks decoded so far.
    pub fn blocks_decoded(&self) -> u64 {
        self.blocks_decoded
    }

    /// Bits consumed so far.
    pub fn bit_position(&self) -> u64 {
        self.reader.bit_position()
    }

    /// Decode the next block, or return `None` after the final one.
    ///
    /// Any error ends the stream: later calls return `None`.
    pub fn next_block(&mut self) -> Result<Option<DecodedBlock>> {
        if self.state == State::Done {
            return Ok(None);
        }

        match self.read_block() {
            Ok(block) => {
                log::debug!(
                    "block {}: {}, final={}, {} bytes, bits {}..{}",
                    self.blocks_decoded,
                    block.header.block_type,
                    block.header.is_final,
                    block.data.len(),
                    block.start_bit,
                    block.end_bit
                );
                self.blocks_decoded += 1;
                if block.header.is_final {
                    self.state = State::Done;
                }
                Ok(Some(block))
            }
            Err(e) => {
                log::warn!("inflate aborted in block {}: {}", self.blocks_decoded, e);
                self.state = State::Done;
                Err(e)
            }
        }
    }

    /// Decode every remaining block into `writer`. Returns the number of
    /// bytes written.
    pub fn inflate_to<W: Write>(&mut self, mut writer: W) -> Result<u64> {
        let mut total = 0u64;
        while let Some(block) = self.next_block()? {
            writer.write_all(&block.data)?;
            total += block.data.len() as u64;
        }
        writer.flush()?;
        Ok(total)
    }

    /// Decode every remaining block into a vector.
    pub fn inflate_all(&mut self) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        self.inflate_to(&mut output)?;
        Ok(output)
    }

    fn read_block(&mut self) -> Result<DecodedBlock> {
        let start_bit = self.reader.bit_position();
        let header = BlockHeader::read(&mut self.reader)?;

        // Decode onto the history so back-references resolve, then split
        // the new bytes off.
        let mut output = std::mem::take(&mut self.history);
        let base = output.len();

        let dynamic = match header.block_type {
            BlockType::Stored => {
                self.read_stored(&mut output)?;
                None
            }
            BlockType::DynamicHuffman => Some(self.read_dynamic(&mut output)?),
            BlockType::FixedHuffman => {
                return Err(DynflateError::unsupported_block_type(
                    BlockType::FixedHuffman.bits(),
                    self.reader.bit_position(),
                ));
            }
        };

        let data = output[base..].to_vec();
        if output.len() > WINDOW_SIZE {
            output.drain(..output.len() - WINDOW_SIZE);
        }
        self.history = output;

        Ok(DecodedBlock {
            header,
            dynamic,
            start_bit,
            end_bit: self.reader.bit_position(),
            data,
        })
    }

    fn read_stored(&mut self, output: &mut Vec<u8>) -> Result<()> {
        self.reader.align_to_byte();

        let len = self.reader.read_bits(16)? as u16;
        let nlen = self.reader.read_bits(16)? as u16;
        if len != !nlen {
            return Err(DynflateError::malformed(
                self.reader.bit_position(),
                format!("LEN/NLEN mismatch: {:#06x} vs {:#06x}", len, nlen),
            ));
        }

        let start = output.len();
        output.resize(start + len as usize, 0);
        self.reader.read_bytes(&mut output[start..])
    }

    fn read_dynamic(&mut self, output: &mut Vec<u8>) -> Result<DynamicInfo> {
        let header_start = self.reader.bit_position();
        let (header, lengths) = DynamicHeader::read(&mut self.reader)?;
        let info = DynamicInfo {
            hlit: header.hlit,
            hdist: header.hdist,
            hclen: header.hclen,
            header_bits: self.reader.bit_position() - header_start,
        };

        let litlen = HuffmanDecoder::from_lengths(&lengths.litlen)?;
        let distance = HuffmanDecoder::from_lengths(&lengths.distance)?;

        loop {
            let position = self.reader.bit_position();
            let symbol = litlen.decode(&mut self.reader)?;

            match symbol {
                0..=255 => output.push(symbol as u8),
                END_OF_BLOCK => break,
                _ => {
                    self.read_match(output, symbol, position, &distance)?;

                    // Exactly one symbol follows a match: its trailing
                    // literal, or end-of-block when there is none.
                    let position = self.reader.bit_position();
                    match litlen.decode(&mut self.reader)? {
                        byte @ 0..=255 => output.push(byte as u8),
                        END_OF_BLOCK => break,
                        other => {
                            return Err(DynflateError::malformed(
                                position,
                                format!("length symbol {} where a trailing literal belongs", other),
                            ));
                        }
                    }
                }
            }
        }

        Ok(info)
    }

    fn read_match(
        &mut self,
        output: &mut Vec<u8>,
        symbol: u16,
        position: u64,
        distance_decoder: &HuffmanDecoder,
    ) -> Result<()> {
        let Some((_, extra_bits)) = length_symbol_info(symbol) else {
            return Err(DynflateError::malformed(
                position,
                format!("literal/length symbol {} out of range", symbol),
            ));
        };
        let length = decode_length(symbol, self.reader.read_bits(extra_bits)? as u16) as usize;

        let position = self.reader.bit_position();
        let dist_symbol = distance_decoder.decode(&mut self.reader)?;
        let Some((_, dist_extra_bits)) = distance_symbol_info(dist_symbol) else {
            return Err(DynflateError::malformed(
                position,
                format!("distance symbol {} out of range", dist_symbol),
            ));
        };
        let distance =
            decode_distance(dist_symbol, self.reader.read_bits(dist_extra_bits)? as u16) as usize;

        if distance > output.len() {
            return Err(DynflateError::malformed(
                position,
                format!(
                    "distance {} reaches before the start of {} bytes of history",
                    distance,
                    output.len()
                ),
            ));
        }

        copy_match(output, distance, length);
        Ok(())
    }
}

/// Decompress a complete in-memory stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    Inflater::new(Cursor::new(data)).inflate_all()
}
