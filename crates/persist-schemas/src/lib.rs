//! Object schemas for legacy GIS persistent streams.
//!
//! Each module holds the readers for one family of objects together with
//! their static [`Schema`] descriptors. [`registry`] assembles all of them
//! into the default dispatch table.
//!
//! ```
//! use persist_schemas::registry;
//!
//! let registry = registry();
//! assert!(registry.schema_by_name("RgbColor").is_some());
//! ```

pub mod colors;
pub mod property_set;
pub mod range_domain;
pub mod uid;

use persist_stream::{Clsid, Registry, RegistryBuilder, Schema, SharedRegistry};

pub use colors::{CmykColor, ColorModel, LabColor};
pub use property_set::PropertySet;
pub use range_domain::RangeDomain;
pub use uid::Uid;

/// Every shipped schema, in registration order.
pub static SCHEMAS: &[&Schema] = &[
    &colors::RGB_COLOR,
    &colors::HSV_COLOR,
    &colors::HLS_COLOR,
    &colors::GRAY_COLOR,
    &colors::CMYK_COLOR,
    &uid::UID,
    &property_set::PROPERTY_SET,
    &range_domain::RANGE_DOMAIN,
];

/// Type ids of third-party extension objects known to be unreadable.
///
/// None are shipped; hosts add their own with
/// [`RegistryBuilder::licensed_extension`].
pub static LICENSED_EXTENSIONS: &[Clsid] = &[];

/// A builder preloaded with every shipped schema and licensed extension.
pub fn builder() -> RegistryBuilder {
    Registry::builder()
        .register_all(SCHEMAS)
        .licensed_extensions(LICENSED_EXTENSIONS)
}

/// The default registry.
pub fn registry() -> Registry {
    builder().build()
}

/// The default registry, wrapped for rebuild-and-swap reloads.
pub fn shared_registry() -> SharedRegistry {
    SharedRegistry::new(registry())
}
