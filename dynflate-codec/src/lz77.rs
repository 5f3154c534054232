//! LZ77 match finding and reconstruction.
//!
//! The matcher walks the input once. At every position it looks up the
//! 3-byte prefix in a hash table, follows the chain of earlier positions
//! with the same hash (bounded by the window and a chain cap) and keeps the
//! longest match. Each emitted [`MatchRecord`] is either a single literal or
//! a back-reference followed by the byte right after the match.
//!
//! # Example
//!
//! ```rust
//! use dynflate_codec::lz77::{self, Lz77Matcher};
//!
//! let mut matcher = Lz77Matcher::new();
//! let records = matcher.encode(b"ABABABABAB");
//! assert!(records.iter().any(|r| r.offset == 2));
//! assert_eq!(lz77::decode(&records).unwrap(), b"ABABABABAB");
//! ```

use dynflate_core::error::{DynflateError, Result};

/// Sliding window size (32 KiB).
pub const WINDOW_SIZE: usize = 32768;

/// Minimum match length.
pub const MIN_MATCH: usize = 3;

/// Maximum match length.
pub const MAX_MATCH: usize = 258;

/// Default number of chain candidates examined per position.
pub const DEFAULT_MAX_CHAIN: usize = 256;

/// Number of hash heads (16-bit hash).
const HASH_SIZE: usize = 1 << 16;

const WINDOW_MASK: usize = WINDOW_SIZE - 1;

/// Empty slot marker in the hash arena.
const NIL: usize = usize::MAX;

/// One step of the LZ77 parse.
///
/// `offset == 0 && length == 0` is a plain literal carried in
/// `literal_after`. Otherwise the record copies `length` bytes from
/// `offset` bytes back and then appends `literal_after`, which is `None`
/// only when the match runs to the very end of the block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRecord {
    /// Distance back from the output cursor (1-32768), 0 for literals.
    pub offset: u16,
    /// Match length (3-258), 0 for literals.
    pub length: u16,
    /// Byte emitted after the copy.
    pub literal_after: Option<u8>,
}

impl MatchRecord {
    /// A single literal byte.
    pub fn literal(byte: u8) -> Self {
        Self {
            offset: 0,
            length: 0,
            literal_after: Some(byte),
        }
    }

    /// A back-reference, optionally followed by one literal byte.
    pub fn back_reference(offset: u16, length: u16, literal_after: Option<u8>) -> Self {
        debug_assert!(offset >= 1 && offset as usize <= WINDOW_SIZE);
        debug_assert!((MIN_MATCH..=MAX_MATCH).contains(&(length as usize)));
        Self {
            offset,
            length,
            literal_after,
        }
    }

    /// Whether this record is a plain literal.
    pub fn is_literal(&self) -> bool {
        self.length == 0
    }

    /// Number of bytes this record expands to.
    pub fn decoded_len(&self) -> usize {
        self.length as usize + usize::from(self.literal_after.is_some())
    }
}

/// The ordered records for one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodingResult {
    records: Vec<MatchRecord>,
}

impl EncodingResult {
    /// Create an empty result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty result with room for `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: Vec::with_capacity(capacity),
        }
    }

    /// Append a literal record.
    pub fn push_literal(&mut self, byte: u8) {
        self.records.push(MatchRecord::literal(byte));
    }

    /// Append a back-reference record.
    pub fn push_match(&mut self, offset: u16, length: u16, literal_after: Option<u8>) {
        self.records
            .push(MatchRecord::back_reference(offset, length, literal_after));
    }

    /// The records in order.
    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Iterate over the records.
    pub fn iter(&self) -> std::slice::Iter<'_, MatchRecord> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of bytes the records expand to.
    pub fn decoded_len(&self) -> usize {
        self.records.iter().map(MatchRecord::decoded_len).sum()
    }
}

impl<'a> IntoIterator for &'a EncodingResult {
    type Item = &'a MatchRecord;
    type IntoIter = std::slice::Iter<'a, MatchRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Hash-chain LZ77 matcher.
///
/// `head` maps a 3-byte prefix hash to the most recent position with that
/// hash, `prev` links each position (modulo the window) to the previous one.
/// Both are reset at the start of every [`encode`](Self::encode).
#[derive(Debug)]
pub struct Lz77Matcher {
    head: Vec<usize>,
    prev: Vec<usize>,
    max_chain: usize,
}

impl Lz77Matcher {
    /// Create a matcher with the default chain cap (256).
    pub fn new() -> Self {
        Self::with_max_chain(DEFAULT_MAX_CHAIN)
    }

    /// Create a matcher examining at most `max_chain` candidates per position.
    pub fn with_max_chain(max_chain: usize) -> Self {
        Self {
            head: vec![NIL; HASH_SIZE],
            prev: vec![NIL; WINDOW_SIZE],
            max_chain: max_chain.max(1),
        }
    }

    /// Chain cap in use.
    pub fn max_chain(&self) -> usize {
        self.max_chain
    }

    /// Forget all match history.
    pub fn reset(&mut self) {
        self.head.fill(NIL);
        self.prev.fill(NIL);
    }

    /// Hash the three bytes starting at `pos`.
    #[inline(always)]
    fn hash3(data: &[u8], pos: usize) -> usize {
        let key = (data[pos] as u32) << 16 | (data[pos + 1] as u32) << 8 | data[pos + 2] as u32;
        (key.wrapping_mul(0x9E37_79B1) >> 16) as usize
    }

    /// Link `pos` into its hash chain. Positions without three bytes ahead
    /// can never start a match and are skipped.
    #[inline]
    fn insert(&mut self, data: &[u8], pos: usize) {
        if pos + MIN_MATCH > data.len() {
            return;
        }
        let h = Self::hash3(data, pos);
        self.prev[pos & WINDOW_MASK] = self.head[h];
        self.head[h] = pos;
    }

    /// Longest match for `pos` as `(distance, length)`.
    fn longest_match(&self, data: &[u8], pos: usize) -> Option<(usize, usize)> {
        let limit = MAX_MATCH.min(data.len() - pos);
        if limit < MIN_MATCH {
            return None;
        }

        let mut candidate = self.head[Self::hash3(data, pos)];
        let mut best_len = 0;
        let mut best_dist = 0;
        let mut examined = 0;

        while candidate != NIL && examined < self.max_chain {
            // Chains only ever point backwards; anything else is a recycled slot.
            if candidate >= pos {
                break;
            }
            let distance = pos - candidate;
            if distance > WINDOW_SIZE {
                break;
            }

            // Cannot beat best_len unless the byte just past it matches too.
            if data[candidate + best_len] == data[pos + best_len] {
                let len = common_prefix(data, candidate, pos, limit);
                if len > best_len {
                    best_len = len;
                    best_dist = distance;
                    if len >= limit {
                        break;
                    }
                }
            }

            candidate = self.prev[candidate & WINDOW_MASK];
            examined += 1;
        }

        (best_len >= MIN_MATCH).then_some((best_dist, best_len))
    }

    /// Parse `data` into match records. History from previous calls is discarded.
    pub fn encode(&mut self, data: &[u8]) -> EncodingResult {
        self.reset();

        let mut result = EncodingResult::with_capacity(data.len() / 2 + 1);
        let mut pos = 0;

        while pos < data.len() {
            match self.longest_match(data, pos) {
                Some((distance, length)) => {
                    let next = pos + length;
                    let literal_after = data.get(next).copied();

                    // Every covered position, including the trailing literal,
                    // becomes a future match source.
                    for p in pos..=next.min(data.len() - 1) {
                        self.insert(data, p);
                    }

                    result.push_match(distance as u16, length as u16, literal_after);
                    pos = next + 1;
                }
                None => {
                    result.push_literal(data[pos]);
                    self.insert(data, pos);
                    pos += 1;
                }
            }
        }

        result
    }
}

impl Default for Lz77Matcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Length of the common run of `data[a..]` and `data[b..]`, capped at
/// `limit`. Compares eight bytes at a time before finishing byte by byte.
#[inline]
fn common_prefix(data: &[u8], a: usize, b: usize, limit: usize) -> usize {
    let mut len = 0;

    while len + 8 <= limit {
        let x = load_u64(data, a + len) ^ load_u64(data, b + len);
        if x != 0 {
            return len + (x.trailing_zeros() / 8) as usize;
        }
        len += 8;
    }

    while len < limit && data[a + len] == data[b + len] {
        len += 1;
    }
    len
}

#[inline(always)]
fn load_u64(data: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(word)
}

/// Reconstruct the bytes described by `records`.
pub fn decode(records: &EncodingResult) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(records.decoded_len());
    decode_into(records, &mut output)?;
    Ok(output)
}

/// Append `length` bytes starting `distance` bytes before the end of
/// `output`. The caller checks `1 <= distance <= output.len()`.
///
/// When the source overlaps the destination (distance smaller than length)
/// the copy runs byte by byte so the pattern repeats.
#[inline]
pub(crate) fn copy_match(output: &mut Vec<u8>, distance: usize, length: usize) {
    let start = output.len() - distance;
    if distance >= length {
        output.extend_from_within(start..start + length);
    } else {
        for i in 0..length {
            let byte = output[start + i];
            output.push(byte);
        }
    }
}

/// Append the bytes described by `records` to `output`.
///
/// Back-references may reach into whatever `output` already holds.
pub fn decode_into(records: &EncodingResult, output: &mut Vec<u8>) -> Result<()> {
    output.reserve(records.decoded_len());

    for record in records {
        if !record.is_literal() {
            let offset = record.offset as usize;
            if offset == 0 || offset > output.len() {
                return Err(DynflateError::malformed(
                    0,
                    format!(
                        "back-reference distance {} exceeds {} bytes of history",
                        offset,
                        output.len()
                    ),
                ));
            }
            copy_match(output, offset, record.length as usize);
        }
        if let Some(byte) = record.literal_after {
            output.push(byte);
        }
    }

    Ok(())
}
