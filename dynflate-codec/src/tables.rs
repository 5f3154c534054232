//! Length and distance code tables.
//!
//! Match lengths (3-258) travel as literal/length symbols 257-285 and match
//! distances (1-32768) as distance symbols 0-29, each followed by a small
//! number of extra bits added to the symbol's base value.

/// First literal/length symbol that denotes a match length.
pub const FIRST_LENGTH_SYMBOL: u16 = 257;

/// Last valid literal/length symbol.
pub const LAST_LENGTH_SYMBOL: u16 = 285;

/// Number of distance symbols.
pub const DISTANCE_SYMBOLS: usize = 30;

/// Length code base values, indexed by `symbol - 257`.
pub const LENGTH_BASE: [u16; 29] = [
    3, 4, 5, 6, 7, 8, 9, 10, // 257-264
    11, 13, 15, 17, // 265-268
    19, 23, 27, 31, // 269-272
    35, 43, 51, 59, // 273-276
    67, 83, 99, 115, // 277-280
    131, 163, 195, 227, // 281-284
    258, // 285
];

/// Number of extra bits for length codes 257-285.
pub const LENGTH_EXTRA_BITS: [u8; 29] = [
    0, 0, 0, 0, 0, 0, 0, 0, // 257-264
    1, 1, 1, 1, // 265-268
    2, 2, 2, 2, // 269-272
    3, 3, 3, 3, // 273-276
    4, 4, 4, 4, // 277-280
    5, 5, 5, 5, // 281-284
    0, // 285
];

/// Distance code base values, indexed by distance symbol.
pub const DISTANCE_BASE: [u16; 30] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

/// Number of extra bits for distance codes 0-29.
pub const DISTANCE_EXTRA_BITS: [u8; 30] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

/// Transmission order of the code-length alphabet's own code lengths.
pub const CODE_LENGTH_ORDER: [usize; 19] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

/// A value resolved to its symbol plus extra bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeEntry {
    /// Alphabet symbol.
    pub symbol: u16,
    /// Number of extra bits following the symbol.
    pub extra_bits: u8,
    /// Value of the extra bits (`value - base`).
    pub extra_value: u16,
}

/// Resolve a match length (3-258) to its literal/length symbol.
pub fn length_to_code(length: u16) -> CodeEntry {
    debug_assert!(
        (3..=258).contains(&length),
        "Length out of range: {}",
        length
    );

    // 258 shares a base range with 227..=257 but has its own zero-extra symbol.
    let index = if length == 258 {
        LENGTH_BASE.len() - 1
    } else {
        LENGTH_BASE[..LENGTH_BASE.len() - 1].partition_point(|&base| base <= length) - 1
    };

    CodeEntry {
        symbol: FIRST_LENGTH_SYMBOL + index as u16,
        extra_bits: LENGTH_EXTRA_BITS[index],
        extra_value: length - LENGTH_BASE[index],
    }
}

/// Resolve a distance (1-32768) to its distance symbol.
pub fn distance_to_code(distance: u16) -> CodeEntry {
    debug_assert!(
        (1..=32768).contains(&distance),
        "Distance out of range: {}",
        distance
    );

    let index = DISTANCE_BASE.partition_point(|&base| base <= distance) - 1;

    CodeEntry {
        symbol: index as u16,
        extra_bits: DISTANCE_EXTRA_BITS[index],
        extra_value: distance - DISTANCE_BASE[index],
    }
}

/// Base value and extra-bit count for a length symbol, or `None` outside 257-285.
pub fn length_symbol_info(symbol: u16) -> Option<(u16, u8)> {
    if !(FIRST_LENGTH_SYMBOL..=LAST_LENGTH_SYMBOL).contains(&symbol) {
        return None;
    }
    let index = (symbol - FIRST_LENGTH_SYMBOL) as usize;
    Some((LENGTH_BASE[index], LENGTH_EXTRA_BITS[index]))
}

/// Base value and extra-bit count for a distance symbol, or `None` outside 0-29.
pub fn distance_symbol_info(symbol: u16) -> Option<(u16, u8)> {
    let index = symbol as usize;
    if index >= DISTANCE_SYMBOLS {
        return None;
    }
    Some((DISTANCE_BASE[index], DISTANCE_EXTRA_BITS[index]))
}

/// Decode a length from a length symbol and its extra bits.
pub fn decode_length(symbol: u16, extra: u16) -> u16 {
    debug_assert!(
        (FIRST_LENGTH_SYMBOL..=LAST_LENGTH_SYMBOL).contains(&symbol),
        "Invalid length symbol: {}",
        symbol
    );
    LENGTH_BASE[(symbol - FIRST_LENGTH_SYMBOL) as usize] + extra
}

/// Decode a distance from a distance symbol and its extra bits.
pub fn decode_distance(symbol: u16, extra: u16) -> u16 {
    debug_assert!((symbol as usize) < DISTANCE_SYMBOLS, "Invalid distance symbol: {}", symbol);
    DISTANCE_BASE[symbol as usize] + extra
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_length_resolves() {
        for length in 3..=258u16 {
            let entry = length_to_code(length);
            assert!(entry.extra_value < (1 << entry.extra_bits).max(1));
            assert_eq!(decode_length(entry.symbol, entry.extra_value), length);
        }
    }

    #[test]
    fn test_every_distance_resolves() {
        for distance in 1..=32768u16 {
            let entry = distance_to_code(distance);
            assert!((entry.extra_value as u32) < (1u32 << entry.extra_bits));
            assert_eq!(decode_distance(entry.symbol, entry.extra_value), distance);
        }
    }

    #[test]
    fn test_specific_lengths() {
        let check = |length, symbol, extra_bits, extra_value| {
            assert_eq!(
                length_to_code(length),
                CodeEntry {
                    symbol,
                    extra_bits,
                    extra_value
                }
            );
        };
        check(3, 257, 0, 0);
        check(10, 264, 0, 0);
        check(11, 265, 1, 0);
        check(12, 265, 1, 1);
        check(257, 284, 5, 30);
        check(258, 285, 0, 0);
    }

    #[test]
    fn test_specific_distances() {
        assert_eq!(distance_to_code(1).symbol, 0);
        assert_eq!(distance_to_code(4).symbol, 3);
        assert_eq!(distance_to_code(5), CodeEntry { symbol: 4, extra_bits: 1, extra_value: 0 });
        assert_eq!(distance_to_code(6).extra_value, 1);
        assert_eq!(
            distance_to_code(32768),
            CodeEntry {
                symbol: 29,
                extra_bits: 13,
                extra_value: 8191
            }
        );
    }

    #[test]
    fn test_symbol_info_bounds() {
        assert_eq!(length_symbol_info(256), None);
        assert_eq!(length_symbol_info(257), Some((3, 0)));
        assert_eq!(length_symbol_info(285), Some((258, 0)));
        assert_eq!(length_symbol_info(286), None);
        assert_eq!(distance_symbol_info(29), Some((24577, 13)));
        assert_eq!(distance_symbol_info(30), None);
    }
}
