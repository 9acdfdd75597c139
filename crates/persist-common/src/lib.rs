//! Common utilities for persist.
//!
//! This crate provides the foundational types used across all persist crates:
//!
//! - [`BinaryReader`] - Zero-copy little-endian reading from byte slices
//! - [`Clsid`] - The 128-bit type identifier in its mixed-endian wire layout
//! - [`Error`] - Structural decoding errors (truncation, bad terminators)

mod clsid;
mod error;
mod reader;

pub use clsid::Clsid;
pub use error::{Error, Result};
pub use reader::BinaryReader;

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};
