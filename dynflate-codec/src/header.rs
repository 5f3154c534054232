//! Dynamic block header: code-length RLE and the HLIT/HDIST/HCLEN fields.
//!
//! The literal/length and distance code lengths are concatenated and
//! run-length encoded with the code-length alphabet:
//!
//! | Symbol | Meaning                         | Extra bits |
//! |--------|---------------------------------|------------|
//! | 0-15   | literal code length             | 0          |
//! | 16     | repeat previous length 3-6x     | 2          |
//! | 17     | repeat zero 3-10x               | 3          |
//! | 18     | repeat zero 11-138x             | 7          |
//!
//! The RLE symbols are themselves Huffman coded; that code's lengths are
//! sent first as 3-bit fields in [`CODE_LENGTH_ORDER`].

use crate::huffman::{
    CODELEN_ALPHABET_SIZE, CanonicalCodeMap, DISTANCE_ALPHABET_SIZE, END_OF_BLOCK,
    HuffmanDecoder, LITLEN_ALPHABET_SIZE, MAX_CODE_LENGTH, MAX_CODELEN_CODE_LENGTH,
    build_length_limited_lengths,
};
use crate::tables::CODE_LENGTH_ORDER;
use dynflate_core::error::{DynflateError, Result};
use dynflate_core::traits::{BitSink, BitSource};

/// Repeat previous length 3-6 times.
pub const REPEAT_PREVIOUS: u8 = 16;
/// Repeat zero 3-10 times.
pub const REPEAT_ZERO_SHORT: u8 = 17;
/// Repeat zero 11-138 times.
pub const REPEAT_ZERO_LONG: u8 = 18;

/// One code-length alphabet symbol with its extra-bit payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RleSymbol {
    /// Symbol 0-18.
    pub symbol: u8,
    /// Extra bits value (repeat count minus the symbol's minimum).
    pub extra: u8,
}

impl RleSymbol {
    /// A literal code length.
    pub fn length(length: u8) -> Self {
        Self {
            symbol: length,
            extra: 0,
        }
    }

    /// Number of extra bits following this symbol.
    pub fn extra_bits(&self) -> u8 {
        match self.symbol {
            REPEAT_PREVIOUS => 2,
            REPEAT_ZERO_SHORT => 3,
            REPEAT_ZERO_LONG => 7,
            _ => 0,
        }
    }

    /// Number of code lengths this symbol expands to.
    pub fn repeat_count(&self) -> usize {
        match self.symbol {
            REPEAT_PREVIOUS | REPEAT_ZERO_SHORT => 3 + self.extra as usize,
            REPEAT_ZERO_LONG => 11 + self.extra as usize,
            _ => 1,
        }
    }
}

/// Run-length encode a code-length sequence.
pub fn rle_encode(lengths: &[u8]) -> Vec<RleSymbol> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < lengths.len() {
        let len = lengths[i];
        let run = lengths[i..].iter().take_while(|&&l| l == len).count();
        i += run;

        if len == 0 {
            let mut left = run;
            while left >= 11 {
                let n = left.min(138);
                out.push(RleSymbol {
                    symbol: REPEAT_ZERO_LONG,
                    extra: (n - 11) as u8,
                });
                left -= n;
            }
            if left >= 3 {
                out.push(RleSymbol {
                    symbol: REPEAT_ZERO_SHORT,
                    extra: (left - 3) as u8,
                });
                left = 0;
            }
            out.extend(std::iter::repeat_n(RleSymbol::length(0), left));
        } else {
            out.push(RleSymbol::length(len));
            let mut left = run - 1;
            while left >= 3 {
                let n = left.min(6);
                out.push(RleSymbol {
                    symbol: REPEAT_PREVIOUS,
                    extra: (n - 3) as u8,
                });
                left -= n;
            }
            out.extend(std::iter::repeat_n(RleSymbol::length(len), left));
        }
    }

    out
}

/// Expand an RLE symbol sequence back into code lengths.
pub fn rle_decode(symbols: &[RleSymbol]) -> Result<Vec<u8>> {
    let mut lengths = Vec::with_capacity(symbols.len());

    for (index, rs) in symbols.iter().enumerate() {
        if rs.symbol > REPEAT_ZERO_LONG {
            return Err(DynflateError::corrupt_code_lengths(
                index,
                format!("symbol {} outside the code-length alphabet", rs.symbol),
            ));
        }
        if rs.extra >> rs.extra_bits() != 0 {
            return Err(DynflateError::corrupt_code_lengths(
                index,
                format!(
                    "extra value {} does not fit in {} bits",
                    rs.extra,
                    rs.extra_bits()
                ),
            ));
        }

        match rs.symbol {
            REPEAT_PREVIOUS => {
                let Some(&prev) = lengths.last() else {
                    return Err(DynflateError::corrupt_code_lengths(
                        index,
                        "repeat with no previous length",
                    ));
                };
                lengths.extend(std::iter::repeat_n(prev, rs.repeat_count()));
            }
            REPEAT_ZERO_SHORT | REPEAT_ZERO_LONG => {
                lengths.extend(std::iter::repeat_n(0, rs.repeat_count()));
            }
            len => lengths.push(len),
        }
    }

    Ok(lengths)
}

/// Literal/length and distance code lengths carried by one header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockCodeLengths {
    /// Literal/length code lengths, `hlit + 257` entries.
    pub litlen: Vec<u8>,
    /// Distance code lengths, `hdist + 1` entries.
    pub distance: Vec<u8>,
}

/// Everything between the block type and the first data symbol of a
/// dynamic Huffman block.
#[derive(Debug, Clone)]
pub struct DynamicHeader {
    /// Literal/length code count minus 257 (0-29).
    pub hlit: u8,
    /// Distance code count minus 1 (0-29).
    pub hdist: u8,
    /// Code-length code count minus 4 (0-15).
    pub hclen: u8,
    /// Code lengths of the code-length alphabet, indexed by symbol.
    pub code_length_lengths: [u8; CODELEN_ALPHABET_SIZE],
    /// RLE-encoded literal/length + distance code lengths.
    pub rle_symbols: Vec<RleSymbol>,
    /// Canonical codes for the code-length alphabet.
    pub code_length_codes: CanonicalCodeMap,
}

impl DynamicHeader {
    /// Build the header for the given literal/length and distance lengths.
    ///
    /// Trailing zero lengths are trimmed independently for each alphabet,
    /// down to the 257 / 1 code minimum.
    pub fn build(litlen_lengths: &[u8], distance_lengths: &[u8]) -> Self {
        debug_assert!(litlen_lengths.len() <= LITLEN_ALPHABET_SIZE);
        debug_assert!(distance_lengths.len() <= DISTANCE_ALPHABET_SIZE);

        let litlen_count = trimmed_len(litlen_lengths).clamp(257, LITLEN_ALPHABET_SIZE);
        let distance_count = trimmed_len(distance_lengths).clamp(1, DISTANCE_ALPHABET_SIZE);

        let mut combined = Vec::with_capacity(litlen_count + distance_count);
        combined.extend((0..litlen_count).map(|i| litlen_lengths.get(i).copied().unwrap_or(0)));
        combined.extend((0..distance_count).map(|i| distance_lengths.get(i).copied().unwrap_or(0)));
        let rle_symbols = rle_encode(&combined);

        let mut frequencies = [0u32; CODELEN_ALPHABET_SIZE];
        for rs in &rle_symbols {
            frequencies[rs.symbol as usize] += 1;
        }
        let mut code_length_lengths = [0u8; CODELEN_ALPHABET_SIZE];
        code_length_lengths
            .copy_from_slice(&build_length_limited_lengths(&frequencies, MAX_CODELEN_CODE_LENGTH));

        let code_length_count = CODE_LENGTH_ORDER
            .iter()
            .rposition(|&sym| code_length_lengths[sym] != 0)
            .map_or(0, |i| i + 1)
            .max(4);

        Self {
            hlit: (litlen_count - 257) as u8,
            hdist: (distance_count - 1) as u8,
            hclen: (code_length_count - 4) as u8,
            code_length_codes: CanonicalCodeMap::from_lengths(&code_length_lengths),
            code_length_lengths,
            rle_symbols,
        }
    }

    /// Number of literal/length code lengths transmitted.
    pub fn litlen_count(&self) -> usize {
        self.hlit as usize + 257
    }

    /// Number of distance code lengths transmitted.
    pub fn distance_count(&self) -> usize {
        self.hdist as usize + 1
    }

    /// Number of code-length code lengths transmitted.
    pub fn code_length_count(&self) -> usize {
        self.hclen as usize + 4
    }

    /// Write the header (after BFINAL/BTYPE).
    pub fn write<S: BitSink>(&self, sink: &mut S) -> Result<()> {
        sink.write_bits(self.hlit as u32, 5)?;
        sink.write_bits(self.hdist as u32, 5)?;
        sink.write_bits(self.hclen as u32, 4)?;

        for &sym in &CODE_LENGTH_ORDER[..self.code_length_count()] {
            sink.write_bits(self.code_length_lengths[sym] as u32, 3)?;
        }

        for rs in &self.rle_symbols {
            self.code_length_codes.write_symbol(sink, rs.symbol as u16)?;
            let extra_bits = rs.extra_bits();
            if extra_bits > 0 {
                sink.write_bits(rs.extra as u32, extra_bits)?;
            }
        }
        Ok(())
    }

    /// Read a header (after BFINAL/BTYPE) and the code lengths it carries.
    pub fn read<S: BitSource>(source: &mut S) -> Result<(Self, BlockCodeLengths)> {
        let hlit = source.read_bits(5)? as u8;
        let hdist = source.read_bits(5)? as u8;
        let hclen = source.read_bits(4)? as u8;

        if hlit > 29 {
            return Err(DynflateError::malformed(
                source.bit_position(),
                format!("HLIT {} exceeds 29", hlit),
            ));
        }
        if hdist > 29 {
            return Err(DynflateError::malformed(
                source.bit_position(),
                format!("HDIST {} exceeds 29", hdist),
            ));
        }

        let mut code_length_lengths = [0u8; CODELEN_ALPHABET_SIZE];
        for &sym in &CODE_LENGTH_ORDER[..hclen as usize + 4] {
            code_length_lengths[sym] = source.read_bits(3)? as u8;
        }

        let decoder = HuffmanDecoder::from_lengths(&code_length_lengths)?;
        if decoder.is_empty() {
            return Err(DynflateError::malformed(
                source.bit_position(),
                "code-length code has no symbols",
            ));
        }

        let litlen_count = hlit as usize + 257;
        let total = litlen_count + hdist as usize + 1;
        let mut lengths: Vec<u8> = Vec::with_capacity(total);
        let mut rle_symbols = Vec::new();

        while lengths.len() < total {
            let position = source.bit_position();
            let symbol = decoder.decode(source)? as u8;
            let rs = match symbol {
                0..=15 => RleSymbol::length(symbol),
                REPEAT_PREVIOUS | REPEAT_ZERO_SHORT | REPEAT_ZERO_LONG => {
                    let mut rs = RleSymbol { symbol, extra: 0 };
                    rs.extra = source.read_bits(rs.extra_bits())? as u8;
                    rs
                }
                _ => {
                    return Err(DynflateError::malformed(
                        position,
                        format!("code-length symbol {} out of range", symbol),
                    ));
                }
            };

            if lengths.len() + rs.repeat_count() > total {
                return Err(DynflateError::malformed(
                    position,
                    format!(
                        "code lengths overrun: {} + {} > {}",
                        lengths.len(),
                        rs.repeat_count(),
                        total
                    ),
                ));
            }

            match rs.symbol {
                REPEAT_PREVIOUS => {
                    let Some(&prev) = lengths.last() else {
                        return Err(DynflateError::malformed(
                            position,
                            "repeat with no previous length",
                        ));
                    };
                    lengths.extend(std::iter::repeat_n(prev, rs.repeat_count()));
                }
                REPEAT_ZERO_SHORT | REPEAT_ZERO_LONG => {
                    lengths.extend(std::iter::repeat_n(0, rs.repeat_count()));
                }
                len => lengths.push(len),
            }
            rle_symbols.push(rs);
        }

        debug_assert!(lengths.iter().all(|&l| l <= MAX_CODE_LENGTH));
        if lengths[END_OF_BLOCK as usize] == 0 {
            return Err(DynflateError::malformed(
                source.bit_position(),
                "no code for end-of-block",
            ));
        }

        let distance = lengths.split_off(litlen_count);
        let header = Self {
            hlit,
            hdist,
            hclen,
            code_length_codes: CanonicalCodeMap::from_lengths(&code_length_lengths),
            code_length_lengths,
            rle_symbols,
        };
        Ok((
            header,
            BlockCodeLengths {
                litlen: lengths,
                distance,
            },
        ))
    }

    /// Exact size of the header in bits.
    pub fn bit_cost(&self) -> u64 {
        let fixed = 5 + 5 + 4 + 3 * self.code_length_count() as u64;
        let rle: u64 = self
            .rle_symbols
            .iter()
            .map(|rs| {
                self.code_length_codes.length(rs.symbol as u16) as u64 + rs.extra_bits() as u64
            })
            .sum();
        fixed + rle
    }
}

/// Length of `lengths` without its trailing zeros.
fn trimmed_len(lengths: &[u8]) -> usize {
    lengths.iter().rposition(|&l| l != 0).map_or(0, |i| i + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynflate_core::{BitReader, BitWriter};
    use std::io::Cursor;

    fn roundtrip(lengths: &[u8]) -> Vec<RleSymbol> {
        let symbols = rle_encode(lengths);
        assert_eq!(rle_decode(&symbols).unwrap(), lengths);
        symbols
    }

    #[test]
    fn test_rle_all_zero() {
        let symbols = roundtrip(&[0; 300]);
        // 138 + 138 + 24
        assert_eq!(
            symbols,
            vec![
                RleSymbol { symbol: 18, extra: 127 },
                RleSymbol { symbol: 18, extra: 127 },
                RleSymbol { symbol: 18, extra: 13 },
            ]
        );
    }

    #[test]
    fn test_rle_short_zero_runs() {
        assert_eq!(roundtrip(&[0, 0]), vec![RleSymbol::length(0); 2]);
        assert_eq!(roundtrip(&[0; 3]), vec![RleSymbol { symbol: 17, extra: 0 }]);
        assert_eq!(roundtrip(&[0; 10]), vec![RleSymbol { symbol: 17, extra: 7 }]);
        assert_eq!(roundtrip(&[0; 11]), vec![RleSymbol { symbol: 18, extra: 0 }]);
        // 138 then a leftover pair
        let symbols = roundtrip(&[0; 140]);
        assert_eq!(symbols.len(), 3);
        assert_eq!(symbols[1], RleSymbol::length(0));
    }

    #[test]
    fn test_rle_nonzero_runs() {
        assert_eq!(
            roundtrip(&[8; 7]),
            vec![RleSymbol::length(8), RleSymbol { symbol: 16, extra: 3 }]
        );
        assert_eq!(
            roundtrip(&[8; 9]),
            vec![
                RleSymbol::length(8),
                RleSymbol { symbol: 16, extra: 3 },
                RleSymbol::length(8),
                RleSymbol::length(8),
            ]
        );
        assert_eq!(roundtrip(&[5, 5, 5]), vec![RleSymbol::length(5); 3]);
    }

    #[test]
    fn test_rle_mixed() {
        let mut lengths = vec![8u8; 144];
        lengths.extend([9; 112]);
        lengths.extend([7; 24]);
        lengths.extend([0, 0, 0, 3, 4, 4, 4, 4, 0, 15, 1]);
        roundtrip(&lengths);
        roundtrip(&[]);
    }

    #[test]
    fn test_rle_decode_rejects_leading_repeat() {
        let err = rle_decode(&[RleSymbol { symbol: 16, extra: 0 }]).unwrap_err();
        assert!(matches!(err, DynflateError::CorruptCodeLengths { index: 0, .. }));
    }

    #[test]
    fn test_rle_decode_rejects_bad_symbols() {
        assert!(rle_decode(&[RleSymbol { symbol: 19, extra: 0 }]).is_err());
        assert!(rle_decode(&[RleSymbol { symbol: 17, extra: 8 }]).is_err());
        assert!(rle_decode(&[RleSymbol::length(3), RleSymbol { symbol: 16, extra: 4 }]).is_err());
    }

    fn literal_only_lengths() -> (Vec<u8>, Vec<u8>) {
        let mut litlen = vec![0u8; LITLEN_ALPHABET_SIZE];
        litlen[b'a' as usize] = 1;
        litlen[END_OF_BLOCK as usize] = 1;
        (litlen, vec![0u8; DISTANCE_ALPHABET_SIZE])
    }

    #[test]
    fn test_build_sizing_fields() {
        let (litlen, distance) = literal_only_lengths();
        let header = DynamicHeader::build(&litlen, &distance);
        assert_eq!(header.hlit, 0);
        assert_eq!(header.hdist, 0);
        assert_eq!(header.litlen_count(), 257);
        assert_eq!(header.distance_count(), 1);
        assert!(header.code_length_count() >= 4);

        let mut litlen = litlen;
        litlen[285] = 2;
        litlen[b'a' as usize] = 2;
        let mut distance = distance;
        distance[29] = 1;
        let header = DynamicHeader::build(&litlen, &distance);
        assert_eq!(header.hlit, 29);
        assert_eq!(header.hdist, 29);
    }

    #[test]
    fn test_hclen_covers_last_used_symbol() {
        let (litlen, distance) = literal_only_lengths();
        let header = DynamicHeader::build(&litlen, &distance);
        let transmitted = &CODE_LENGTH_ORDER[..header.code_length_count()];
        for sym in 0..CODELEN_ALPHABET_SIZE {
            if header.code_length_lengths[sym] != 0 {
                assert!(transmitted.contains(&sym), "symbol {} not transmitted", sym);
            }
        }
    }

    #[test]
    fn test_header_write_read() {
        let mut litlen = vec![0u8; LITLEN_ALPHABET_SIZE];
        for (i, l) in litlen.iter_mut().enumerate().take(260) {
            *l = (i % 7 + 3) as u8;
        }
        let mut distance = vec![0u8; DISTANCE_ALPHABET_SIZE];
        distance[0] = 1;
        distance[4] = 2;
        distance[5] = 2;

        let header = DynamicHeader::build(&litlen, &distance);
        let mut writer = BitWriter::new(Vec::new());
        header.write(&mut writer).unwrap();
        assert_eq!(writer.bits_written(), header.bit_cost());
        let bytes = writer.into_inner().unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        let (decoded, lengths) = DynamicHeader::read(&mut reader).unwrap();
        assert_eq!(reader.bit_position(), header.bit_cost());
        assert_eq!(decoded.hlit, header.hlit);
        assert_eq!(decoded.hdist, header.hdist);
        assert_eq!(decoded.hclen, header.hclen);
        assert_eq!(decoded.rle_symbols, header.rle_symbols);
        assert_eq!(lengths.litlen, litlen[..260]);
        assert_eq!(lengths.distance, distance[..6]);
    }

    #[test]
    fn test_read_rejects_missing_end_of_block() {
        let mut litlen = vec![0u8; 257];
        litlen[0] = 1;
        litlen[1] = 1;
        let header = DynamicHeader::build(&litlen, &[0]);
        let mut writer = BitWriter::new(Vec::new());
        header.write(&mut writer).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        let err = DynamicHeader::read(&mut reader).unwrap_err();
        assert!(matches!(err, DynflateError::MalformedBitstream { .. }));
    }

    #[test]
    fn test_read_rejects_oversized_hlit() {
        let mut writer = BitWriter::new(Vec::new());
        writer.write_bits(30, 5).unwrap();
        writer.write_bits(0, 5).unwrap();
        writer.write_bits(0, 4).unwrap();
        let bytes = writer.into_inner().unwrap();

        let mut reader = BitReader::new(Cursor::new(bytes));
        assert!(matches!(
            DynamicHeader::read(&mut reader),
            Err(DynflateError::MalformedBitstream { .. })
        ));
    }

    #[test]
    fn test_read_truncated() {
        let mut reader = BitReader::new(Cursor::new(vec![0x00]));
        assert!(matches!(
            DynamicHeader::read(&mut reader),
            Err(DynflateError::TruncatedInput { .. })
        ));
    }
}
