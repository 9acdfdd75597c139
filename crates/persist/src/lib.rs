//! Persist - decoding library for legacy GIS persistent object streams.
//!
//! This crate provides a unified interface to the persist library ecosystem
//! for reading the binary object streams embedded in style and layer files.
//!
//! # Crates
//!
//! - [`persist_common`] - Common utilities (binary reading, CLSIDs)
//! - [`persist_color`] - CIELAB to RGB conversion
//! - [`persist_stream`] - Stream reader, variants, registry and object graph decoding
//! - [`persist_schemas`] - Shipped object schemas and the default registry
//!
//! # Example
//!
//! ```no_run
//! use persist::prelude::*;
//!
//! let registry = persist::schemas::registry();
//! let data = std::fs::read("symbol.bin")?;
//!
//! if let Some(root) = persist::decode(&data, &registry, Mode::Tolerant)? {
//!     println!("{}", root.to_tree().to_json_pretty()?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use persist_color as color;
pub use persist_common as common;
pub use persist_schemas as schemas;
pub use persist_stream as stream;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use persist_color::{cielab_to_rgb, Lab, Rgb};
    pub use persist_common::{BinaryReader, Clsid};
    pub use persist_schemas::{registry, shared_registry};
    pub use persist_stream::{
        Error, Instance, Mode, ObjectTree, PersistObject, Registry, Schema, SharedRegistry, SizedObject, Stream,
        Value, Variant,
    };
}

use persist_stream::{Instance, Mode, Registry, Result, Stream};

/// Decode the root object at the start of `data`.
pub fn decode(data: &[u8], registry: &Registry, mode: Mode) -> Result<Option<Instance>> {
    decode_at(data, 0, registry, mode)
}

/// Decode the root object starting at `offset`.
pub fn decode_at(data: &[u8], offset: usize, registry: &Registry, mode: Mode) -> Result<Option<Instance>> {
    Stream::new(data, registry)
        .with_mode(mode)
        .with_offset(offset)
        .read_object("root")
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
