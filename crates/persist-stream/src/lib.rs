//! Decoding engine for legacy GIS persistent object streams.
//!
//! A persistent stream holds one root object and everything it owns. Each
//! object starts with a 16-byte type id (CLSID) that selects a [`Schema`]
//! from a [`Registry`], usually followed by a u16 version and the object's
//! own fields.
//!
//! # Quick Start
//!
//! ```no_run
//! use persist_stream::{Mode, Registry, Stream};
//!
//! # fn schemas() -> Registry { Registry::builder().build() }
//! let registry = schemas();
//! let data = std::fs::read("symbol.bin")?;
//!
//! let mut stream = Stream::new(&data, &registry).with_mode(Mode::Strict);
//! if let Some(root) = stream.read_object("root")? {
//!     println!("{}", root.to_tree().to_json_pretty()?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - **Stream** (`Stream`): labeled primitive reads with strict/tolerant validation
//! - **Variants** (`Variant`): the closed set of tagged dynamic values
//! - **Objects** (`PersistObject`, `Schema`, `Instance`): per-type readers and their envelopes
//! - **Registry** (`Registry`, `SharedRegistry`): type id dispatch, licensed extensions
//! - **Property bags** (`PropertyEntry`): order-independent indexed fields
//! - **Values** (`Value`, `ObjectTree`): the inspectable output of a decode
//!
//! # Recovering from unknown objects
//!
//! When a container records the byte length of a child, use
//! [`Stream::read_object_sized`]: unknown type ids, unsupported versions and
//! licensed extensions are skipped and decoding continues after the span.

mod decode;
mod error;
mod object;
mod properties;
mod registry;
mod stream;
mod value;
pub mod variant;

pub use decode::{SizedObject, Skipped};
pub use error::{Error, LicensedExtension, Result};
pub use object::{Instance, PersistObject, Placeholder, Schema, Support, Versions, PLACEHOLDER};
pub use properties::{PropertyEntry, PROPERTY_TERMINATOR, UNSIZED_PROPERTY};
pub use registry::{Registry, RegistryBuilder, SharedRegistry};
pub use stream::{Mode, Stream, DEFAULT_MAX_DEPTH};
pub use value::{ObjectTree, Value, OFFSET_FIELD, TYPE_FIELD, VERSION_FIELD};
pub use variant::Variant;

pub use persist_common::Clsid;
