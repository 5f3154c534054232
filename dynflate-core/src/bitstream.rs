//! Bit-level I/O over byte readers and writers.
//!
//! `BitReader` and `BitWriter` wrap any `Read`/`Write` and own the partial
//! byte state between calls. Fields are packed LSB-first within each byte,
//! as the block format requires; Huffman codes go through
//! [`BitSink::write_code`], which handles their MSB-first definition.
//!
//! # Example
//!
//! ```
//! use dynflate_core::bitstream::{BitReader, BitWriter};
//! use std::io::Cursor;
//!
//! let mut output = Vec::new();
//! {
//!     let mut writer = BitWriter::new(&mut output);
//!     writer.write_bits(0b101, 3).unwrap();
//!     writer.write_bits(0b1100, 4).unwrap();
//!     writer.flush().unwrap();
//! }
//!
//! let mut reader = BitReader::new(Cursor::new(&output));
//! assert_eq!(reader.read_bits(3).unwrap(), 0b101);
//! assert_eq!(reader.read_bits(4).unwrap(), 0b1100);
//! ```

use crate::error::{DynflateError, Result};
use crate::traits::{BitSink, BitSource};
use std::io::{self, Read, Write};

/// A bit-level reader that wraps any `Read` implementation.
#[derive(Debug)]
pub struct BitReader<R: Read> {
    /// Underlying reader.
    reader: R,
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of valid bits in buffer.
    bits_in_buffer: u8,
    /// Total bits consumed (for error reporting).
    total_bits_read: u64,
}

impl<R: Read> BitReader<R> {
    /// Create a new `BitReader` wrapping the given reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: 0,
            bits_in_buffer: 0,
            total_bits_read: 0,
        }
    }

    /// Get a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.reader
    }

    /// Consume this `BitReader` and return the underlying reader.
    ///
    /// Bits already pulled into the internal buffer are lost.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Ensure at least `count` bits are buffered, pulling whole bytes from
    /// the reader. Fails with `TruncatedInput` if the reader runs dry.
    #[inline]
    fn fill_buffer(&mut self, count: u8) -> Result<()> {
        debug_assert!(count <= 56, "Cannot buffer more than 56 bits at once");

        while self.bits_in_buffer < count {
            let bytes_needed = (count - self.bits_in_buffer).div_ceil(8) as usize;
            let mut temp = [0u8; 8];
            let n = match self.reader.read(&mut temp[..bytes_needed]) {
                Ok(0) => return Err(DynflateError::truncated(self.total_bits_read)),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            for &byte in &temp[..n] {
                self.buffer |= (byte as u64) << self.bits_in_buffer;
                self.bits_in_buffer += 8;
            }
        }

        Ok(())
    }

    /// Read up to 32 bits; the first bit read is the LSB of the result.
    #[inline]
    pub fn read_bits(&mut self, count: u8) -> Result<u32> {
        debug_assert!(count <= 32, "Cannot read more than 32 bits at once");

        if count == 0 {
            return Ok(0);
        }

        self.fill_buffer(count)?;

        let mask = (1u64 << count).wrapping_sub(1);
        let result = (self.buffer & mask) as u32;

        self.buffer >>= count;
        self.bits_in_buffer -= count;
        self.total_bits_read += count as u64;

        Ok(result)
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// Align to the next byte boundary by discarding partial bits.
    pub fn align_to_byte(&mut self) {
        let remainder = self.bits_in_buffer % 8;
        if remainder > 0 {
            self.buffer >>= remainder;
            self.bits_in_buffer -= remainder;
            self.total_bits_read += remainder as u64;
        }
    }

    /// Read whole bytes. The reader must be byte-aligned.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        debug_assert!(self.bits_in_buffer % 8 == 0, "read_bytes on unaligned reader");

        let mut offset = 0;
        while self.bits_in_buffer >= 8 && offset < buf.len() {
            buf[offset] = (self.buffer & 0xFF) as u8;
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
            self.total_bits_read += 8;
            offset += 1;
        }

        if offset < buf.len() {
            match self.reader.read_exact(&mut buf[offset..]) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    return Err(DynflateError::truncated(self.total_bits_read));
                }
                Err(e) => return Err(e.into()),
            }
            self.total_bits_read += (buf.len() - offset) as u64 * 8;
        }

        Ok(())
    }

    /// Number of bits consumed so far.
    pub fn bit_position(&self) -> u64 {
        self.total_bits_read
    }
}

impl<R: Read> BitSource for BitReader<R> {
    fn read_bit(&mut self) -> Result<bool> {
        BitReader::read_bit(self)
    }

    fn read_bits(&mut self, count: u8) -> Result<u32> {
        BitReader::read_bits(self, count)
    }

    fn align_to_byte(&mut self) {
        BitReader::align_to_byte(self)
    }

    fn bit_position(&self) -> u64 {
        self.total_bits_read
    }
}

/// A bit-level writer that wraps any `Write` implementation.
///
/// Complete bytes are handed to the writer as they fill up. The trailing
/// partial byte is padded with zeros by [`flush`](Self::flush), by
/// [`into_inner`](Self::into_inner), and, best effort, on drop.
#[derive(Debug)]
pub struct BitWriter<W: Write> {
    /// Underlying writer.
    writer: W,
    /// Bit buffer (LSB-first).
    buffer: u64,
    /// Number of bits in buffer.
    bits_in_buffer: u8,
    /// Total bits written.
    total_bits_written: u64,
}

impl<W: Write> BitWriter<W> {
    /// Create a new `BitWriter` wrapping the given writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            buffer: 0,
            bits_in_buffer: 0,
            total_bits_written: 0,
        }
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Flush, then consume this `BitWriter` and return the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        let this = std::mem::ManuallyDrop::new(self);
        // SAFETY: `this` is never dropped, so the writer is moved out exactly once.
        Ok(unsafe { std::ptr::read(&this.writer) })
    }

    /// Total bits written so far, padding included.
    pub fn bits_written(&self) -> u64 {
        self.total_bits_written
    }

    /// Hand complete bytes over to the writer.
    #[inline]
    fn flush_bytes(&mut self) -> Result<()> {
        if self.bits_in_buffer >= 32 {
            let word = (self.buffer as u32).to_le_bytes();
            self.writer.write_all(&word)?;
            self.buffer >>= 32;
            self.bits_in_buffer -= 32;
        }

        while self.bits_in_buffer >= 8 {
            self.writer.write_all(&[(self.buffer & 0xFF) as u8])?;
            self.buffer >>= 8;
            self.bits_in_buffer -= 8;
        }
        Ok(())
    }

    /// Write the low `count` bits (0-32) of `value`, LSB first.
    #[inline]
    pub fn write_bits(&mut self, value: u32, count: u8) -> Result<()> {
        debug_assert!(count <= 32, "Cannot write more than 32 bits at once");

        if count == 0 {
            return Ok(());
        }

        let mask = if count == 32 {
            u32::MAX
        } else {
            (1u32 << count).wrapping_sub(1)
        };

        self.buffer |= ((value & mask) as u64) << self.bits_in_buffer;
        self.bits_in_buffer += count;
        self.total_bits_written += count as u64;

        if self.bits_in_buffer >= 32 {
            self.flush_bytes()?;
        }
        Ok(())
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> Result<()> {
        self.write_bits(bit as u32, 1)
    }

    /// Pad to the next byte boundary with zeros.
    pub fn align_to_byte(&mut self) -> Result<()> {
        if self.bits_in_buffer % 8 != 0 {
            let padding = 8 - (self.bits_in_buffer % 8);
            self.write_bits(0, padding)?;
        }
        Ok(())
    }

    /// Write whole bytes. The writer should be byte-aligned first.
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.flush_bytes()?;

        if self.bits_in_buffer > 0 {
            for &byte in buf {
                self.write_bits(byte as u32, 8)?;
            }
        } else {
            self.writer.write_all(buf)?;
            self.total_bits_written += buf.len() as u64 * 8;
        }
        Ok(())
    }

    /// Pad the partial byte with zeros and flush everything to the writer.
    pub fn flush(&mut self) -> Result<()> {
        self.align_to_byte()?;
        self.flush_bytes()?;
        self.writer.flush()?;
        Ok(())
    }
}

impl<W: Write> BitSink for BitWriter<W> {
    fn write_bit(&mut self, bit: bool) -> Result<()> {
        BitWriter::write_bit(self, bit)
    }

    fn write_bits(&mut self, value: u32, count: u8) -> Result<()> {
        BitWriter::write_bits(self, value, count)
    }

    fn align_to_byte(&mut self) -> Result<()> {
        BitWriter::align_to_byte(self)
    }

    fn bits_written(&self) -> u64 {
        self.total_bits_written
    }
}

impl<W: Write> Drop for BitWriter<W> {
    fn drop(&mut self) {
        // Best-effort flush on drop
        let _ = self.flush();
    }
}
