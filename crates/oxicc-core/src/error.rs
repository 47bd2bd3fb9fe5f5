//! Error types for oxicc

use thiserror::Error;

/// Result type for oxicc operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when parsing ICC profiles
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// Profile data is too small
    #[error("profile too small: expected {expected} bytes, got {actual}")]
    TooSmall { expected: usize, actual: usize },

    /// Invalid profile signature (should be 'acsp')
    #[error("invalid profile signature: 0x{0:08X} (expected 'acsp')")]
    InvalidSignature(u32),

    /// Profile size in header doesn't fit the data
    #[error("size mismatch: header says {header_size} bytes, data is {actual_size} bytes")]
    SizeMismatch {
        header_size: u32,
        actual_size: usize,
    },

    /// Unsupported profile version
    #[error("unsupported profile version: major {0}")]
    UnsupportedVersion(u8),

    /// PCS illuminant is not D50
    #[error("illuminant ({x}, {y}, {z}) is not D50")]
    IlluminantNotD50 { x: f64, y: f64, z: f64 },

    /// Tag directory entry is out of bounds
    #[error("tag '{tag:08X}' out of bounds: offset {offset} + size {size} > profile size {profile_size}")]
    TagOutOfBounds {
        tag: u32,
        offset: u32,
        size: u32,
        profile_size: u32,
    },

    /// Invalid tag type signature
    #[error("invalid type '{type_sig:08X}' for tag '{tag:08X}'")]
    InvalidTagType { tag: u32, type_sig: u32 },

    /// Corrupted or invalid payload data
    #[error("corrupted data: {0}")]
    CorruptedData(String),
}
