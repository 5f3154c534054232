//! Block framing: the 3-bit BFINAL/BTYPE header every block starts with.

use dynflate_core::error::{DynflateError, Result};
use dynflate_core::traits::{BitSink, BitSource};
use std::fmt;

/// Block compression type (BTYPE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockType {
    /// `00`: raw bytes with LEN/NLEN.
    Stored = 0,
    /// `01`: static code tables. Recognized but never decoded.
    FixedHuffman = 1,
    /// `10`: code tables carried in the block header.
    DynamicHuffman = 2,
}

impl BlockType {
    /// Parse a two-bit BTYPE value. `11` is reserved.
    pub fn from_bits(btype: u8, bit_position: u64) -> Result<Self> {
        match btype {
            0 => Ok(Self::Stored),
            1 => Ok(Self::FixedHuffman),
            2 => Ok(Self::DynamicHuffman),
            other => Err(DynflateError::unsupported_block_type(other, bit_position)),
        }
    }

    /// The two-bit BTYPE value.
    pub fn bits(self) -> u8 {
        self as u8
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::FixedHuffman => "fixed",
            Self::DynamicHuffman => "dynamic",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// BFINAL + BTYPE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Set on the last block of the stream.
    pub is_final: bool,
    /// How the block body is encoded.
    pub block_type: BlockType,
}

impl BlockHeader {
    /// Size of the header in bits.
    pub const BITS: u64 = 3;

    /// Create a block header.
    pub fn new(is_final: bool, block_type: BlockType) -> Self {
        Self {
            is_final,
            block_type,
        }
    }

    /// Read BFINAL (1 bit) then BTYPE (2 bits).
    pub fn read<S: BitSource>(source: &mut S) -> Result<Self> {
        let is_final = source.read_bit()?;
        let btype = source.read_bits(2)? as u8;
        let block_type = BlockType::from_bits(btype, source.bit_position())?;
        Ok(Self {
            is_final,
            block_type,
        })
    }

    /// Write BFINAL then BTYPE.
    pub fn write<S: BitSink>(&self, sink: &mut S) -> Result<()> {
        sink.write_bit(self.is_final)?;
        sink.write_bits(self.block_type.bits() as u32, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynflate_core::{BitReader, BitWriter};
    use std::io::Cursor;

    #[test]
    fn test_header_bit_layout() {
        let mut writer = BitWriter::new(Vec::new());
        BlockHeader::new(true, BlockType::DynamicHuffman)
            .write(&mut writer)
            .unwrap();
        assert_eq!(writer.bits_written(), BlockHeader::BITS);
        // BFINAL=1 in bit 0, BTYPE=10 in bits 1-2
        assert_eq!(writer.into_inner().unwrap(), vec![0b101]);
    }

    #[test]
    fn test_header_read() {
        let mut reader = BitReader::new(Cursor::new(vec![0b100]));
        let header = BlockHeader::read(&mut reader).unwrap();
        assert!(!header.is_final);
        assert_eq!(header.block_type, BlockType::DynamicHuffman);

        let mut reader = BitReader::new(Cursor::new(vec![0b011]));
        let header = BlockHeader::read(&mut reader).unwrap();
        assert!(header.is_final);
        assert_eq!(header.block_type, BlockType::FixedHuffman);
    }

    #[test]
    fn test_reserved_block_type() {
        let mut reader = BitReader::new(Cursor::new(vec![0b111]));
        let err = BlockHeader::read(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            DynflateError::UnsupportedBlockType {
                btype: 3,
                bit_position: 3
            }
        ));
    }

    #[test]
    fn test_block_type_names() {
        assert_eq!(BlockType::Stored.to_string(), "stored");
        assert_eq!(BlockType::DynamicHuffman.bits(), 2);
    }
}
