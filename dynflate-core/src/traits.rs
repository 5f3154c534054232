//! Bit-level source and sink traits.
//!
//! The codec only ever needs to read or write single bits and short
//! unsigned fields. These traits are the seam between the codec and
//! whatever owns the underlying bytes.

use crate::error::Result;

/// A source of bits, consumed LSB-first within each byte.
pub trait BitSource {
    /// Read a single bit.
    fn read_bit(&mut self) -> Result<bool>;

    /// Read `count` bits (0-32) as an unsigned integer; the first bit read
    /// lands in the least significant position.
    fn read_bits(&mut self, count: u8) -> Result<u32>;

    /// Discard bits up to the next byte boundary.
    fn align_to_byte(&mut self);

    /// Number of bits consumed so far.
    fn bit_position(&self) -> u64;
}

/// A sink of bits, packed LSB-first within each byte.
pub trait BitSink {
    /// Write a single bit.
    fn write_bit(&mut self, bit: bool) -> Result<()>;

    /// Write the low `count` bits (0-32) of `value`, least significant first.
    fn write_bits(&mut self, value: u32, count: u8) -> Result<()>;

    /// Pad with zero bits up to the next byte boundary.
    fn align_to_byte(&mut self) -> Result<()>;

    /// Number of bits written so far.
    fn bits_written(&self) -> u64;

    /// Write a Huffman code of `length` bits, most significant bit first.
    ///
    /// Huffman codes are defined MSB-first while every other field is
    /// LSB-first, so the code is reversed before packing.
    fn write_code(&mut self, code: u16, length: u8) -> Result<()> {
        debug_assert!(length <= 16, "Huffman code longer than 16 bits");
        if length == 0 {
            return Ok(());
        }
        let reversed = code.reverse_bits() >> (16 - length as u32);
        self.write_bits(reversed as u32, length)
    }
}
