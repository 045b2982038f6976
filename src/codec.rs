//! Value codec
//!
//! Encoding and decoding of stored values.
//!
//! ## Stored Format
//! ```text
//! ┌────────────┬──────────────┬──────────────────────────────┐
//! │ Version(1) │ CRC32 (4 BE) │ bincode(Value)               │
//! └────────────┴──────────────┴──────────────────────────────┘
//! ```
//!
//! The checksum covers the bincode payload only.

use bincode::Options;
use thiserror::Error;

use crate::value::Value;

/// Current format version
pub const FORMAT_VERSION: u8 = 1;

/// Header size: 1 byte version + 4 bytes CRC32
pub const HEADER_SIZE: usize = 5;

/// Codec failures, before operation/key context is attached
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("encoded value exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("truncated value: {len} bytes is shorter than the {} byte header", HEADER_SIZE)]
    Truncated { len: usize },

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),

    #[error("checksum mismatch: stored {stored:#010x}, computed {computed:#010x}")]
    ChecksumMismatch { stored: u32, computed: u32 },

    #[error("bincode: {0}")]
    Bincode(#[from] bincode::Error),
}

/// Converts values to stored bytes and back
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    max_size: u64,
}

impl Codec {
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    fn options(&self) -> impl Options {
        bincode::DefaultOptions::new()
            .with_fixint_encoding()
            .with_limit(self.max_size)
    }

    /// Encode a value to bytes
    ///
    /// Format: version (1) + crc32 (4) + payload
    pub fn encode(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let payload = self.options().serialize(value).map_err(|e| match *e {
            bincode::ErrorKind::SizeLimit => CodecError::TooLarge {
                limit: self.max_size,
            },
            _ => CodecError::Bincode(e),
        })?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.push(FORMAT_VERSION);
        bytes.extend_from_slice(&crc32fast::hash(&payload).to_be_bytes());
        bytes.extend_from_slice(&payload);
        Ok(bytes)
    }

    /// Decode a value from bytes produced by [`Codec::encode`]
    pub fn decode(&self, bytes: &[u8]) -> Result<Value, CodecError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CodecError::Truncated { len: bytes.len() });
        }
        if bytes[0] != FORMAT_VERSION {
            return Err(CodecError::UnsupportedVersion(bytes[0]));
        }

        let stored = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
        let payload = &bytes[HEADER_SIZE..];
        let computed = crc32fast::hash(payload);
        if stored != computed {
            return Err(CodecError::ChecksumMismatch { stored, computed });
        }

        Ok(self.options().deserialize(payload)?)
    }
}
