//! Streams produced here must decode with zlib's inflater (via flate2).

use dynflate_codec::{DeflateConfig, Deflater, deflate_with};
use flate2::read::DeflateDecoder;
use std::io::Read;

fn lcg(size: usize, seed: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed = seed;
    for _ in 0..size {
        seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        data.push((seed >> 16) as u8);
    }
    data
}

/// Low-entropy variant: only four distinct byte values.
fn lcg_low_entropy(size: usize, seed: u32) -> Vec<u8> {
    lcg(size, seed).into_iter().map(|b| b"ACGT"[(b & 3) as usize]).collect()
}

fn zlib_inflate(compressed: &[u8]) -> Vec<u8> {
    let mut output = Vec::new();
    DeflateDecoder::new(compressed)
        .read_to_end(&mut output)
        .unwrap();
    output
}

fn configs() -> [DeflateConfig; 5] {
    [
        DeflateConfig::FAST,
        DeflateConfig::DEFAULT,
        DeflateConfig::BEST,
        DeflateConfig::DEFAULT.with_allow_stored(false),
        DeflateConfig::FAST.with_chunk_size(1000),
    ]
}

fn check(input: &[u8]) {
    for config in configs() {
        let compressed = deflate_with(input, config).unwrap();
        assert_eq!(
            zlib_inflate(&compressed),
            input,
            "zlib disagrees with {:?}",
            config
        );
    }
}

#[test]
fn test_empty() {
    check(b"");
}

#[test]
fn test_single_zero_byte() {
    check(&[0]);
}

#[test]
fn test_abab() {
    check(b"ABABABABAB");
}

#[test]
fn test_run_of_one_byte() {
    check(b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
}

#[test]
fn test_match_followed_by_zero_byte() {
    check(b"abcabcabc\0");
    check(b"xyzxyzxyzxyz\0\0\0\0\0\0\0\0");
}

#[test]
fn test_text() {
    check(&b"The quick brown fox jumps over the lazy dog. ".repeat(500));
}

#[test]
fn test_low_entropy_multi_chunk() {
    check(&lcg_low_entropy(150_000, 7));
}

#[test]
fn test_noise_takes_stored_blocks() {
    check(&lcg(100_000, 42));
}

#[test]
fn test_streamed_output() {
    let data = lcg_low_entropy(70_000, 3);
    let mut compressed = Vec::new();
    Deflater::with_config(DeflateConfig::FAST.with_chunk_size(1000))
        .unwrap()
        .compress_reader(&data[..], &mut compressed)
        .unwrap();
    assert_eq!(zlib_inflate(&compressed), data);
}
