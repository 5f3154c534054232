//! Length-limited canonical Huffman coding.
//!
//! Code lengths come from a classic Huffman merge; when that tree is deeper
//! than the alphabet's cap the lengths are recomputed with package-merge,
//! which is optimal under the cap. Codes are then assigned canonically
//! (RFC 1951 §3.2.2), so only the lengths need to be transmitted.
//!
//! # Alphabets
//!
//! - **Literal/Length**: 0-285 (0-255 literals, 256 end-of-block, 257-285 lengths), cap 15
//! - **Distance**: 0-29, cap 15
//! - **Code Length**: 0-18, cap 7

use dynflate_core::error::{DynflateError, Result};
use dynflate_core::traits::{BitSink, BitSource};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Maximum code length for literal/length and distance codes.
pub const MAX_CODE_LENGTH: u8 = 15;

/// Maximum code length for the code-length alphabet.
pub const MAX_CODELEN_CODE_LENGTH: u8 = 7;

/// Size of the literal/length alphabet (0-285).
pub const LITLEN_ALPHABET_SIZE: usize = 286;

/// Size of the distance alphabet (0-29).
pub const DISTANCE_ALPHABET_SIZE: usize = 30;

/// Size of the code length alphabet (0-18).
pub const CODELEN_ALPHABET_SIZE: usize = 19;

/// End of block symbol.
pub const END_OF_BLOCK: u16 = 256;

/// Compute prefix-free code lengths no longer than `max_bits`.
///
/// `frequencies[s]` is the weight of symbol `s`; the result has the same
/// length, with 0 for every unused symbol. A lone used symbol gets a 1-bit
/// code so it stays decodable.
pub fn build_length_limited_lengths(frequencies: &[u32], max_bits: u8) -> Vec<u8> {
    let mut lengths = vec![0u8; frequencies.len()];

    // (weight, symbol), ascending
    let mut leaves: Vec<(u64, usize)> = frequencies
        .iter()
        .enumerate()
        .filter(|&(_, &f)| f > 0)
        .map(|(s, &f)| (f as u64, s))
        .collect();
    leaves.sort_unstable();

    match leaves.len() {
        0 => return lengths,
        1 => {
            lengths[leaves[0].1] = 1;
            return lengths;
        }
        _ => {}
    }

    debug_assert!(
        leaves.len() <= 1usize << max_bits,
        "{} symbols cannot fit in {}-bit codes",
        leaves.len(),
        max_bits
    );

    let depths = huffman_depths(&leaves);
    let depths = if depths.iter().any(|&d| d > max_bits) {
        package_merge(&leaves, max_bits)
    } else {
        depths
    };

    for (&(_, symbol), depth) in leaves.iter().zip(depths) {
        lengths[symbol] = depth;
    }
    lengths
}

/// Unconstrained Huffman depths for sorted leaves, in leaf order.
fn huffman_depths(leaves: &[(u64, usize)]) -> Vec<u8> {
    let n = leaves.len();
    // Nodes 0..n are leaves, n.. are internal.
    let mut parent = vec![usize::MAX; 2 * n - 1];
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = leaves
        .iter()
        .enumerate()
        .map(|(i, &(weight, _))| Reverse((weight, i)))
        .collect();

    let mut next = n;
    while heap.len() > 1 {
        let (Some(Reverse((w1, a))), Some(Reverse((w2, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        parent[a] = next;
        parent[b] = next;
        heap.push(Reverse((w1 + w2, next)));
        next += 1;
    }

    // Parents always have larger ids, so walk from the root down.
    let mut depth = vec![0u8; 2 * n - 1];
    for node in (0..2 * n - 2).rev() {
        depth[node] = depth[parent[node]].saturating_add(1);
    }
    depth.truncate(n);
    depth
}

/// Package-merge: optimal code lengths bounded by `max_bits`.
fn package_merge(leaves: &[(u64, usize)], max_bits: u8) -> Vec<u8> {
    #[derive(Clone, Copy)]
    enum Item {
        Leaf(usize),
        Package(usize, usize),
    }

    let n = leaves.len();
    let mut arena: Vec<Item> = (0..n).map(Item::Leaf).collect();
    let mut weight: Vec<u64> = leaves.iter().map(|&(w, _)| w).collect();
    let leaf_ids: Vec<usize> = (0..n).collect();

    let mut current = leaf_ids.clone();
    for _ in 1..max_bits {
        let mut packages = Vec::with_capacity(current.len() / 2);
        for pair in current.chunks_exact(2) {
            arena.push(Item::Package(pair[0], pair[1]));
            weight.push(weight[pair[0]] + weight[pair[1]]);
            packages.push(arena.len() - 1);
        }

        // Merge by weight; leaves win ties so the result stays stable.
        let mut merged = Vec::with_capacity(n + packages.len());
        let (mut li, mut pi) = (0, 0);
        while li < n || pi < packages.len() {
            let take_leaf = pi == packages.len()
                || (li < n && weight[leaf_ids[li]] <= weight[packages[pi]]);
            if take_leaf {
                merged.push(leaf_ids[li]);
                li += 1;
            } else {
                merged.push(packages[pi]);
                pi += 1;
            }
        }
        current = merged;
    }

    // Each appearance of a leaf in the first 2n-2 items adds one bit.
    let mut depths = vec![0u8; n];
    let mut stack: Vec<usize> = current.iter().take(2 * n - 2).copied().collect();
    while let Some(id) = stack.pop() {
        match arena[id] {
            Item::Leaf(leaf) => depths[leaf] += 1,
            Item::Package(a, b) => {
                stack.push(a);
                stack.push(b);
            }
        }
    }
    depths
}

/// Accumulates symbol frequencies for one alphabet.
#[derive(Debug, Clone)]
pub struct HuffmanBuilder {
    frequencies: Vec<u32>,
    max_length: u8,
}

impl HuffmanBuilder {
    /// Create a builder for an alphabet of `alphabet_size` symbols.
    pub fn new(alphabet_size: usize, max_length: u8) -> Self {
        Self {
            frequencies: vec![0; alphabet_size],
            max_length,
        }
    }

    /// Count one occurrence of `symbol`.
    #[inline]
    pub fn add(&mut self, symbol: u16) {
        self.add_count(symbol, 1);
    }

    /// Count `count` occurrences of `symbol`.
    pub fn add_count(&mut self, symbol: u16, count: u32) {
        debug_assert!((symbol as usize) < self.frequencies.len());
        if let Some(freq) = self.frequencies.get_mut(symbol as usize) {
            *freq = freq.saturating_add(count);
        }
    }

    /// Frequencies collected so far.
    pub fn frequencies(&self) -> &[u32] {
        &self.frequencies
    }

    /// Whether no symbol has been counted.
    pub fn is_empty(&self) -> bool {
        self.frequencies.iter().all(|&f| f == 0)
    }

    /// Code lengths for the collected frequencies.
    pub fn build_lengths(&self) -> Vec<u8> {
        build_length_limited_lengths(&self.frequencies, self.max_length)
    }

    /// Canonical codes for the collected frequencies.
    pub fn build_codes(&self) -> CanonicalCodeMap {
        CanonicalCodeMap::from_lengths(&self.build_lengths())
    }
}

/// A canonical Huffman code: `length` bits of `code`, MSB first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanonicalCode {
    /// Code value.
    pub code: u16,
    /// Code length in bits; 0 means the symbol is unused.
    pub length: u8,
}

/// Symbol-indexed canonical codes for one alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalCodeMap {
    codes: Vec<CanonicalCode>,
}

impl CanonicalCodeMap {
    /// Assign canonical codes to `lengths` (0 = unused symbol).
    ///
    /// Codes of one length are consecutive in symbol order, and the first
    /// code of each length is `(last code of the previous length + 1)`
    /// shifted left by the length difference.
    pub fn from_lengths(lengths: &[u8]) -> Self {
        let mut bl_count = [0u16; MAX_CODE_LENGTH as usize + 1];
        for &len in lengths {
            if len > 0 {
                bl_count[len as usize] += 1;
            }
        }

        let mut next_code = [0u16; MAX_CODE_LENGTH as usize + 1];
        let mut code = 0u16;
        for bits in 1..=MAX_CODE_LENGTH as usize {
            code = (code + bl_count[bits - 1]) << 1;
            next_code[bits] = code;
        }

        let codes = lengths
            .iter()
            .map(|&length| {
                if length == 0 {
                    return CanonicalCode::default();
                }
                let code = next_code[length as usize];
                next_code[length as usize] += 1;
                CanonicalCode { code, length }
            })
            .collect();

        Self { codes }
    }

    /// Code for `symbol`, or `None` if the symbol is unused.
    pub fn get(&self, symbol: u16) -> Option<CanonicalCode> {
        self.codes
            .get(symbol as usize)
            .copied()
            .filter(|c| c.length > 0)
    }

    /// Code length of `symbol` (0 if unused).
    pub fn length(&self, symbol: u16) -> u8 {
        self.codes.get(symbol as usize).map_or(0, |c| c.length)
    }

    /// Symbol-indexed code lengths.
    pub fn lengths(&self) -> Vec<u8> {
        self.codes.iter().map(|c| c.length).collect()
    }

    /// Iterate over `(symbol, code)` for every used symbol.
    pub fn iter(&self) -> impl Iterator<Item = (u16, CanonicalCode)> + '_ {
        self.codes
            .iter()
            .enumerate()
            .filter(|(_, c)| c.length > 0)
            .map(|(s, &c)| (s as u16, c))
    }

    /// Alphabet size covered by this map.
    pub fn alphabet_size(&self) -> usize {
        self.codes.len()
    }

    /// Write the code for `symbol`.
    ///
    /// Emitting a symbol that has no code would corrupt the block, so that
    /// is a programming error rather than a stream condition.
    pub fn write_symbol<S: BitSink>(&self, sink: &mut S, symbol: u16) -> Result<()> {
        let code = self.codes[symbol as usize];
        debug_assert!(code.length > 0, "symbol {} has no code", symbol);
        sink.write_code(code.code, code.length)
    }
}

/// Bit-serial canonical decoder.
///
/// Accumulates one bit at a time and, after each bit, checks whether the
/// value falls inside the range of codes of that length.
#[derive(Debug, Clone)]
pub struct HuffmanDecoder {
    /// Number of codes of each length.
    counts: [u16; MAX_CODE_LENGTH as usize + 1],
    /// Symbols ordered by (length, symbol).
    symbols: Vec<u16>,
}

impl HuffmanDecoder {
    /// Build a decoder from symbol-indexed code lengths.
    ///
    /// Incomplete codes are accepted (a single used symbol is common);
    /// over-subscribed ones are rejected, naming the first symbol of the
    /// length at which the code overflows.
    pub fn from_lengths(lengths: &[u8]) -> Result<Self> {
        let mut counts = [0u16; MAX_CODE_LENGTH as usize + 1];
        for (symbol, &len) in lengths.iter().enumerate() {
            if len > MAX_CODE_LENGTH {
                return Err(DynflateError::corrupt_code_lengths(
                    symbol,
                    format!("code length {} exceeds {}", len, MAX_CODE_LENGTH),
                ));
            }
            if len > 0 {
                counts[len as usize] += 1;
            }
        }

        let mut left: i32 = 1;
        for (len, &count) in counts.iter().enumerate().skip(1) {
            left = (left << 1) - count as i32;
            if left < 0 {
                let symbol = lengths
                    .iter()
                    .position(|&l| l as usize == len)
                    .unwrap_or_default();
                return Err(DynflateError::corrupt_code_lengths(
                    symbol,
                    format!("over-subscribed at length {}", len),
                ));
            }
        }

        let mut symbols: Vec<u16> = (0..lengths.len() as u16)
            .filter(|&s| lengths[s as usize] > 0)
            .collect();
        symbols.sort_by_key(|&s| lengths[s as usize]);

        Ok(Self { counts, symbols })
    }

    /// Whether the code has no symbols at all.
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Decode one symbol.
    pub fn decode<S: BitSource>(&self, source: &mut S) -> Result<u16> {
        let start = source.bit_position();
        let mut code: i32 = 0;
        let mut first: i32 = 0;
        let mut index: i32 = 0;

        for len in 1..=MAX_CODE_LENGTH as usize {
            code |= source.read_bit()? as i32;
            let count = self.counts[len] as i32;
            if code - first < count {
                return Ok(self.symbols[(index + code - first) as usize]);
            }
            index += count;
            first = (first + count) << 1;
            code <<= 1;
        }

        Err(DynflateError::malformed(
            start,
            format!(
                "no code matches {:#b} after {} bits",
                code >> 1,
                MAX_CODE_LENGTH
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynflate_core::{BitReader, BitWriter};
    use std::io::Cursor;

    fn kraft_sum(lengths: &[u8]) -> f64 {
        lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 2f64.powi(-(l as i32)))
            .sum()
    }

    fn assert_prefix_free(map: &CanonicalCodeMap) {
        let codes: Vec<CanonicalCode> = map.iter().map(|(_, c)| c).collect();
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                if i == j || a.length > b.length {
                    continue;
                }
                let prefix = b.code >> (b.length - a.length);
                assert_ne!(prefix, a.code, "{:?} is a prefix of {:?}", a, b);
            }
        }
    }

    fn fibonacci_frequencies(n: usize) -> Vec<u32> {
        let mut freqs = vec![1u32, 1];
        while freqs.len() < n {
            let next = freqs[freqs.len() - 1] + freqs[freqs.len() - 2];
            freqs.push(next);
        }
        freqs
    }

    #[test]
    fn test_empty_frequencies() {
        let lengths = build_length_limited_lengths(&[0; 30], 15);
        assert!(lengths.iter().all(|&l| l == 0));
        assert_eq!(CanonicalCodeMap::from_lengths(&lengths).iter().count(), 0);
    }

    #[test]
    fn test_single_symbol_gets_one_bit() {
        let mut freqs = [0u32; 30];
        freqs[7] = 42;
        let lengths = build_length_limited_lengths(&freqs, 15);
        assert_eq!(lengths[7], 1);
        assert_eq!(lengths.iter().filter(|&&l| l > 0).count(), 1);
    }

    #[test]
    fn test_classic_huffman_lengths() {
        let lengths = build_length_limited_lengths(&[100, 50, 25, 25], 15);
        assert_eq!(lengths, vec![1, 2, 3, 3]);
        assert_eq!(kraft_sum(&lengths), 1.0);
    }

    #[test]
    fn test_length_limit_is_enforced() {
        // Fibonacci weights produce a maximally skewed tree (depth n-1).
        let freqs = fibonacci_frequencies(25);
        let unlimited = build_length_limited_lengths(&freqs, 24);
        assert_eq!(unlimited.iter().max(), Some(&24));

        let limited = build_length_limited_lengths(&freqs, 15);
        assert!(limited.iter().all(|&l| (1..=15).contains(&l)));
        assert_eq!(kraft_sum(&limited), 1.0);
        assert_prefix_free(&CanonicalCodeMap::from_lengths(&limited));
    }

    #[test]
    fn test_codelen_alphabet_cap() {
        let freqs = fibonacci_frequencies(19);
        let lengths = build_length_limited_lengths(&freqs, MAX_CODELEN_CODE_LENGTH);
        assert!(lengths.iter().all(|&l| (1..=7).contains(&l)));
        assert_eq!(kraft_sum(&lengths), 1.0);
    }

    #[test]
    fn test_package_merge_is_optimal_under_cap() {
        // Weighted cost of package-merge must not exceed a simple valid
        // alternative: a flat 3-bit code for 8 symbols.
        let freqs = [1u32, 1, 2, 4, 8, 16, 32, 64];
        let lengths = build_length_limited_lengths(&freqs, 3);
        assert!(lengths.iter().all(|&l| l <= 3));
        let cost: u32 = freqs.iter().zip(&lengths).map(|(&f, &l)| f * l as u32).sum();
        let flat: u32 = freqs.iter().map(|&f| f * 3).sum();
        assert!(cost <= flat);
        assert_eq!(kraft_sum(&lengths), 1.0);
    }

    #[test]
    fn test_canonical_assignment() {
        // RFC 1951 §3.2.2 example: ABCDEFGH with lengths (3,3,3,3,3,2,4,4).
        let map = CanonicalCodeMap::from_lengths(&[3, 3, 3, 3, 3, 2, 4, 4]);
        let codes: Vec<u16> = (0..8).map(|s| map.get(s).unwrap().code).collect();
        assert_eq!(
            codes,
            vec![0b010, 0b011, 0b100, 0b101, 0b110, 0b00, 0b1110, 0b1111]
        );
        assert_prefix_free(&map);
    }

    #[test]
    fn test_unused_symbols_have_no_code() {
        let map = CanonicalCodeMap::from_lengths(&[0, 1, 0, 1]);
        assert_eq!(map.get(0), None);
        assert_eq!(map.get(1), Some(CanonicalCode { code: 0, length: 1 }));
        assert_eq!(map.get(3), Some(CanonicalCode { code: 1, length: 1 }));
        assert_eq!(map.length(2), 0);
    }

    #[test]
    fn test_builder_prefix_free_for_literal_alphabet() {
        let mut builder = HuffmanBuilder::new(LITLEN_ALPHABET_SIZE, MAX_CODE_LENGTH);
        for (i, symbol) in (0..LITLEN_ALPHABET_SIZE as u16).enumerate() {
            builder.add_count(symbol, (i as u32 * 7919) % 1000 + 1);
        }
        let map = builder.build_codes();
        assert!(map.iter().all(|(_, c)| c.length <= MAX_CODE_LENGTH));
        assert_eq!(kraft_sum(&map.lengths()), 1.0);
        assert_prefix_free(&map);
    }

    #[test]
    fn test_encode_decode_symbols() {
        let mut builder = HuffmanBuilder::new(10, MAX_CODE_LENGTH);
        let message: Vec<u16> = vec![0, 1, 1, 2, 2, 2, 9, 9, 9, 9, 5, 0, 9];
        for &s in &message {
            builder.add(s);
        }
        let map = builder.build_codes();

        let mut writer = BitWriter::new(Vec::new());
        for &s in &message {
            map.write_symbol(&mut writer, s).unwrap();
        }
        let bytes = writer.into_inner().unwrap();

        let decoder = HuffmanDecoder::from_lengths(&map.lengths()).unwrap();
        let mut reader = BitReader::new(Cursor::new(bytes));
        let decoded: Vec<u16> = message
            .iter()
            .map(|_| decoder.decode(&mut reader).unwrap())
            .collect();
        assert_eq!(decoded, message);
    }

    #[test]
    fn test_decoder_rejects_unmatched_code() {
        // Only symbol 0 with code "0"; a run of ones never matches.
        let decoder = HuffmanDecoder::from_lengths(&[1, 0, 0]).unwrap();
        let mut reader = BitReader::new(Cursor::new(vec![0xFF, 0xFF]));
        let err = decoder.decode(&mut reader).unwrap_err();
        assert!(matches!(
            err,
            DynflateError::MalformedBitstream { bit_position: 0, .. }
        ));
    }

    #[test]
    fn test_decoder_rejects_oversubscribed() {
        assert!(matches!(
            HuffmanDecoder::from_lengths(&[0, 1, 1, 1]),
            Err(DynflateError::CorruptCodeLengths { index: 1, .. })
        ));
        assert!(matches!(
            HuffmanDecoder::from_lengths(&[2, 16]),
            Err(DynflateError::CorruptCodeLengths { index: 1, .. })
        ));
    }

    #[test]
    fn test_empty_decoder_fails_to_decode() {
        let decoder = HuffmanDecoder::from_lengths(&[0; 30]).unwrap();
        assert!(decoder.is_empty());
        let mut reader = BitReader::new(Cursor::new(vec![0u8; 4]));
        assert!(decoder.decode(&mut reader).is_err());
    }
}
