//! Error types for color conversion.

use thiserror::Error;

/// Errors that can occur when converting colors.
#[derive(Debug, Error)]
pub enum Error {
    /// The LAB value maps outside the representable RGB range.
    #[error("LAB ({l}, {a}, {b}) has no RGB equivalent (channels {channels:?})")]
    InvalidColor {
        l: f64,
        a: f64,
        b: f64,
        channels: [f64; 3],
    },
}

/// Result type for color operations.
pub type Result<T> = std::result::Result<T, Error>;
