//! Error types for persist-common.

use thiserror::Error;

/// Structural errors raised by the primitive reader.
///
/// These are always fatal to the object being decoded: once a field is
/// truncated or malformed the cursor position can no longer be trusted.
#[derive(Debug, Error)]
pub enum Error {
    /// End of buffer reached while reading a field.
    #[error("truncated field at {offset:#x}: needed {needed} bytes but only {available} available")]
    TruncatedField {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A UTF-16 string was not followed by a `0x0000` terminator.
    #[error("invalid string terminator at {offset:#x}: {actual:#06x}")]
    InvalidTerminator { offset: usize, actual: u16 },

    /// A length prefix that cannot describe a valid field.
    #[error("invalid length {length} at {offset:#x}")]
    InvalidLength { offset: usize, length: u32 },

    /// Invalid CLSID text.
    #[error("invalid CLSID format: {0}")]
    InvalidClsid(String),

    /// Text that is not valid UTF-16.
    #[error("invalid UTF-16 text at {offset:#x}")]
    Utf16 { offset: usize },
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;
