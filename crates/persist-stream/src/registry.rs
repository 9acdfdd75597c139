//! Type id to schema dispatch.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use persist_common::Clsid;
use tracing::debug;

use crate::object::PLACEHOLDER;
use crate::{Error, Instance, LicensedExtension, ObjectTree, Placeholder, Result, Schema};

/// Builder for a [`Registry`].
#[derive(Debug)]
pub struct RegistryBuilder {
    by_clsid: HashMap<Clsid, &'static Schema>,
    by_name: HashMap<&'static str, &'static Schema>,
    licensed: HashSet<Clsid>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryBuilder {
    /// An empty builder. The placeholder schema is always known by name.
    pub fn new() -> Self {
        let mut by_name = HashMap::new();
        by_name.insert(PLACEHOLDER.name, &PLACEHOLDER);
        Self {
            by_clsid: HashMap::new(),
            by_name,
            licensed: HashSet::new(),
        }
    }

    /// Register a schema. Abstract schemas are ignored; a later schema for
    /// the same type id replaces the earlier one.
    pub fn register(mut self, schema: &'static Schema) -> Self {
        let Some(clsid) = schema.clsid else {
            return self;
        };

        if let Some(previous) = self.by_clsid.insert(clsid, schema) {
            debug!("{} replaces {} for {}", schema.name, previous.name, clsid);
            if previous.name != schema.name {
                self.by_name.remove(previous.name);
            }
        }
        self.by_name.insert(schema.name, schema);
        self
    }

    /// Register several schemas in order.
    pub fn register_all(self, schemas: &[&'static Schema]) -> Self {
        schemas.iter().fold(self, |builder, schema| builder.register(schema))
    }

    /// Mark a type id as a licensed extension.
    pub fn licensed_extension(mut self, clsid: Clsid) -> Self {
        self.licensed.insert(clsid);
        self
    }

    /// Mark several type ids as licensed extensions.
    pub fn licensed_extensions(self, clsids: &[Clsid]) -> Self {
        clsids.iter().fold(self, |builder, clsid| builder.licensed_extension(*clsid))
    }

    /// Freeze the registry.
    pub fn build(self) -> Registry {
        Registry {
            by_clsid: self.by_clsid,
            by_name: self.by_name,
            licensed: self.licensed,
        }
    }
}

/// Immutable schema lookup shared by all streams.
///
/// Each type id maps to at most one schema.
#[derive(Debug)]
pub struct Registry {
    by_clsid: HashMap<Clsid, &'static Schema>,
    by_name: HashMap<&'static str, &'static Schema>,
    licensed: HashSet<Clsid>,
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Look up a schema by type id.
    pub fn schema(&self, clsid: &Clsid) -> Option<&'static Schema> {
        self.by_clsid.get(clsid).copied()
    }

    /// Look up a schema by name.
    pub fn schema_by_name(&self, name: &str) -> Option<&'static Schema> {
        self.by_name.get(name).copied()
    }

    /// Check if a type id is a known licensed extension.
    pub fn is_licensed_extension(&self, clsid: &Clsid) -> bool {
        self.licensed.contains(clsid)
    }

    /// Number of registered type ids.
    pub fn len(&self) -> usize {
        self.by_clsid.len()
    }

    /// Check if no type ids are registered.
    pub fn is_empty(&self) -> bool {
        self.by_clsid.is_empty()
    }

    /// Iterate registered schemas in no particular order.
    pub fn schemas(&self) -> impl Iterator<Item = &'static Schema> + '_ {
        self.by_clsid.values().copied()
    }

    /// Create a fresh instance for a type id.
    ///
    /// The null id means "no object" and yields `Ok(None)`.
    pub fn create(&self, clsid: Clsid) -> Result<Option<Instance>> {
        if clsid.is_null() {
            return Ok(None);
        }

        if let Some(schema) = self.schema(&clsid) {
            return Ok(Some(Instance::new(clsid, (schema.create)())));
        }

        if self.is_licensed_extension(&clsid) {
            return Err(Error::LicensedExtension(Box::new(LicensedExtension {
                clsid,
                offset: None,
                placeholder: Placeholder::instance(clsid),
                partial: None,
            })));
        }

        Err(Error::UnknownTypeId { clsid, offset: None })
    }

    /// Rebuild an instance from its value tree.
    ///
    /// The tree must carry a `type` naming a known schema; `version`
    /// defaults to 1.
    pub fn decode_from_value(&self, tree: &ObjectTree) -> Result<Instance> {
        let name = tree.require_str(crate::value::TYPE_FIELD)?;
        let schema = self
            .schema_by_name(name)
            .ok_or_else(|| Error::UnknownSchemaName(name.to_string()))?;

        let object = (schema.from_tree)(self, tree)?;
        let clsid = match schema.clsid {
            Some(clsid) => clsid,
            None => tree.require_clsid("clsid").unwrap_or(Clsid::NULL),
        };
        Ok(Instance::new(clsid, object).with_version(tree.version().unwrap_or(1)))
    }
}

/// A registry that can be replaced while streams are decoding.
///
/// Readers take a snapshot with [`load`](Self::load); a swap only affects
/// snapshots taken afterwards.
#[derive(Debug)]
pub struct SharedRegistry {
    inner: ArcSwap<Registry>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        Self {
            inner: ArcSwap::from_pointee(registry),
        }
    }

    /// Snapshot the current registry.
    pub fn load(&self) -> Arc<Registry> {
        self.inner.load_full()
    }

    /// Replace the registry, returning the previous one.
    pub fn swap(&self, registry: Registry) -> Arc<Registry> {
        self.inner.swap(Arc::new(registry))
    }

    /// Build a new registry from a builder and swap it in.
    pub fn rebuild(&self, builder: RegistryBuilder) -> Arc<Registry> {
        self.swap(builder.build())
    }
}
