//! Compression parameters.

use crate::lz77::DEFAULT_MAX_CHAIN;
use dynflate_core::error::{DynflateError, Result};

/// Default input chunk size: one block per 64 KiB of input.
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

/// Compression parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeflateConfig {
    /// Bytes of input per block. The match window restarts at each chunk.
    pub chunk_size: usize,
    /// Hash-chain candidates examined per position.
    pub max_chain: usize,
    /// Emit stored blocks when they are smaller than the dynamic encoding.
    pub allow_stored: bool,
}

impl DeflateConfig {
    /// Short chain walks.
    pub const FAST: Self = Self {
        chunk_size: DEFAULT_CHUNK_SIZE,
        max_chain: 32,
        allow_stored: true,
    };

    /// Balanced search depth.
    pub const DEFAULT: Self = Self {
        chunk_size: DEFAULT_CHUNK_SIZE,
        max_chain: DEFAULT_MAX_CHAIN,
        allow_stored: true,
    };

    /// Deep chain walks.
    pub const BEST: Self = Self {
        chunk_size: DEFAULT_CHUNK_SIZE,
        max_chain: 4096,
        allow_stored: true,
    };

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the chain limit.
    pub fn with_max_chain(mut self, max_chain: usize) -> Self {
        self.max_chain = max_chain;
        self
    }

    /// Enable or disable the stored-block fallback.
    pub fn with_allow_stored(mut self, allow_stored: bool) -> Self {
        self.allow_stored = allow_stored;
        self
    }

    /// Check that the parameters are usable.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(DynflateError::invalid_config("chunk size must be non-zero"));
        }
        if self.max_chain == 0 {
            return Err(DynflateError::invalid_config(
                "chain limit must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(DeflateConfig::default(), DeflateConfig::DEFAULT);
        assert_eq!(DeflateConfig::DEFAULT.max_chain, 256);
        assert_eq!(DeflateConfig::DEFAULT.chunk_size, 65536);
        assert!(DeflateConfig::FAST.max_chain < DeflateConfig::BEST.max_chain);
        for config in [DeflateConfig::FAST, DeflateConfig::DEFAULT, DeflateConfig::BEST] {
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn test_validate_rejects_zero() {
        let err = DeflateConfig::DEFAULT
            .with_chunk_size(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, DynflateError::InvalidConfig { .. }));
        assert!(DeflateConfig::DEFAULT.with_max_chain(0).validate().is_err());
    }

    #[test]
    fn test_builders() {
        let config = DeflateConfig::FAST
            .with_chunk_size(4096)
            .with_allow_stored(false);
        assert_eq!(config.chunk_size, 4096);
        assert_eq!(config.max_chain, 32);
        assert!(!config.allow_stored);
    }
}
