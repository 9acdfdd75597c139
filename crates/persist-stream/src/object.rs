//! Schema descriptors and decoded object instances.

use std::any::Any;
use std::fmt::{self, Debug};

use persist_common::Clsid;
use tracing::debug;

use crate::value::{OFFSET_FIELD, TYPE_FIELD, VERSION_FIELD};
use crate::{ObjectTree, Registry, Result, Stream};

const ENVELOPE_FIELDS: [&str; 3] = [TYPE_FIELD, VERSION_FIELD, OFFSET_FIELD];

/// Behavior shared by every decodable object type.
///
/// Implementations read their own fields; the decoder handles the type id,
/// version and diagnostics around them.
pub trait PersistObject: Debug + Send + Sync + 'static {
    /// The static descriptor for this type.
    fn schema(&self) -> &'static Schema;

    /// Read the object's fields from the stream.
    fn read(&mut self, stream: &mut Stream<'_>, version: u16) -> Result<()>;

    /// The object's own fields, without `type`/`version` tags.
    fn fields(&self) -> ObjectTree;

    /// Nested objects owned by this one.
    fn children(&self) -> Vec<&Instance> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;
}

/// Which persisted versions a schema accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Versions {
    /// A u16 version precedes the body and must be in the set.
    Exact(&'static [u16]),
    /// No version field is stored; the version is treated as 1.
    Exempt,
}

/// How far reading a schema is implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Support {
    Full,
    /// Reads are best effort and cannot be trusted to consume an exact span.
    Partial,
    /// The layout is unknown; any read fails with [`Error::Unimplemented`](crate::Error::Unimplemented).
    Unimplemented,
}

/// Static descriptor of one object type.
///
/// Schemas without a type id are abstract: they can be named but are never
/// dispatched from a stream.
pub struct Schema {
    pub name: &'static str,
    pub clsid: Option<Clsid>,
    pub versions: Versions,
    pub support: Support,
    pub create: fn() -> Box<dyn PersistObject>,
    pub from_tree: fn(&Registry, &ObjectTree) -> Result<Box<dyn PersistObject>>,
}

impl Schema {
    /// A fully supported, abstract schema accepting version 1.
    pub const fn new(
        name: &'static str,
        create: fn() -> Box<dyn PersistObject>,
        from_tree: fn(&Registry, &ObjectTree) -> Result<Box<dyn PersistObject>>,
    ) -> Self {
        Self {
            name,
            clsid: None,
            versions: Versions::Exact(&[1]),
            support: Support::Full,
            create,
            from_tree,
        }
    }

    /// Set the type id from its canonical string.
    pub const fn with_clsid(mut self, clsid: &str) -> Self {
        self.clsid = Some(Clsid::parse_const(clsid));
        self
    }

    /// Set the accepted versions.
    pub const fn with_versions(mut self, versions: &'static [u16]) -> Self {
        self.versions = Versions::Exact(versions);
        self
    }

    /// Mark the schema as having no version field.
    pub const fn exempt(mut self) -> Self {
        self.versions = Versions::Exempt;
        self
    }

    /// Mark reads as best effort.
    pub const fn partial(mut self) -> Self {
        self.support = Support::Partial;
        self
    }

    /// Mark the layout as unknown.
    pub const fn unimplemented(mut self) -> Self {
        self.support = Support::Unimplemented;
        self
    }

    /// Check if the schema has no type id.
    #[inline]
    pub const fn is_abstract(&self) -> bool {
        self.clsid.is_none()
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("clsid", &self.clsid)
            .field("versions", &self.versions)
            .field("support", &self.support)
            .finish_non_exhaustive()
    }
}

/// A decoded (or freshly created) object with its envelope.
#[derive(Debug)]
pub struct Instance {
    pub(crate) clsid: Clsid,
    pub(crate) version: u16,
    pub(crate) offset: Option<usize>,
    pub(crate) object: Box<dyn PersistObject>,
}

impl Instance {
    /// Wrap an object. The version starts at 1 until read.
    pub fn new(clsid: Clsid, object: Box<dyn PersistObject>) -> Self {
        Self {
            clsid,
            version: 1,
            offset: None,
            object,
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: u16) -> Self {
        self.version = version;
        self
    }

    /// The type id this instance was created for.
    #[inline]
    pub fn clsid(&self) -> Clsid {
        self.clsid
    }

    /// The version read from the stream, or 1 for exempt schemas.
    #[inline]
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Offset of the type id in the stream, when decoded from one.
    #[inline]
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// The object's schema.
    #[inline]
    pub fn schema(&self) -> &'static Schema {
        self.object.schema()
    }

    /// The schema name.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.object.schema().name
    }

    /// The wrapped object.
    #[inline]
    pub fn object(&self) -> &dyn PersistObject {
        self.object.as_ref()
    }

    /// Downcast the wrapped object to a concrete type.
    pub fn downcast_ref<T: PersistObject>(&self) -> Option<&T> {
        self.object.as_any().downcast_ref::<T>()
    }

    /// Render as a value tree tagged with `type`, `version` and, when known,
    /// `stream_offset`.
    ///
    /// The tags always come first and always win: an object field using one
    /// of their names is dropped.
    pub fn to_tree(&self) -> ObjectTree {
        let mut tree = ObjectTree::new()
            .with(TYPE_FIELD, self.name())
            .with(VERSION_FIELD, self.version);
        if let Some(offset) = self.offset {
            tree.insert(OFFSET_FIELD, format!("{offset:#x}"));
        }
        for (name, value) in &self.object.fields() {
            if ENVELOPE_FIELDS.iter().any(|field| *field == name) {
                debug!(offset = ?self.offset, "{}: dropping field {name:?} shadowed by the envelope", self.name());
                continue;
            }
            tree.insert(name, value.clone());
        }
        tree
    }

    /// Visit this instance and every nested instance, depth first.
    pub fn walk(&self, visit: &mut impl FnMut(&Instance, usize)) {
        self.walk_at(0, visit);
    }

    fn walk_at(&self, depth: usize, visit: &mut impl FnMut(&Instance, usize)) {
        visit(self, depth);
        for child in self.object.children() {
            child.walk_at(depth + 1, visit);
        }
    }
}

/// Stand-in for a licensed extension object whose layout is unknown.
///
/// Records only that an object of the given type was present.
#[derive(Debug, Default)]
pub struct Placeholder {
    pub clsid: Clsid,
}

impl Placeholder {
    pub fn new(clsid: Clsid) -> Self {
        Self { clsid }
    }

    /// Wrap a placeholder for `clsid` in an instance.
    pub fn instance(clsid: Clsid) -> Instance {
        Instance::new(clsid, Box::new(Self::new(clsid)))
    }
}

fn create_placeholder() -> Box<dyn PersistObject> {
    Box::<Placeholder>::default()
}

fn placeholder_from_tree(_: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    Ok(Box::new(Placeholder::new(tree.require_clsid("clsid")?)))
}

/// Schema for [`Placeholder`]. Never registered by type id.
pub static PLACEHOLDER: Schema = Schema::new("Placeholder", create_placeholder, placeholder_from_tree).exempt();

impl PersistObject for Placeholder {
    fn schema(&self) -> &'static Schema {
        &PLACEHOLDER
    }

    fn read(&mut self, _: &mut Stream<'_>, _: u16) -> Result<()> {
        Ok(())
    }

    fn fields(&self) -> ObjectTree {
        ObjectTree::new().with("clsid", self.clsid)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    const EXTENSION: &str = "5b2e9f16-0d3b-4d7f-9b4a-2f3c1a8e7d61";

    #[test]
    fn test_schema_builder() {
        static SCHEMA: Schema = Schema::new("Thing", create_placeholder, placeholder_from_tree)
            .with_clsid(EXTENSION)
            .with_versions(&[2, 3])
            .partial();

        assert_eq!(SCHEMA.clsid, Some(EXTENSION.parse().unwrap()));
        assert_eq!(SCHEMA.versions, Versions::Exact(&[2, 3]));
        assert_eq!(SCHEMA.support, Support::Partial);
        assert!(!SCHEMA.is_abstract());
        assert!(PLACEHOLDER.is_abstract());
    }

    #[test]
    fn test_placeholder_tree() {
        let clsid: Clsid = EXTENSION.parse().unwrap();
        let mut instance = Placeholder::instance(clsid);
        instance.offset = Some(0x20);

        let tree = instance.to_tree();
        let names: Vec<_> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(names, ["type", "version", "stream_offset", "clsid"]);
        assert_eq!(tree.get_str("stream_offset"), Some("0x20"));
        assert_eq!(tree.get("clsid"), Some(&Value::Str(EXTENSION.into())));
        assert_eq!(instance.downcast_ref::<Placeholder>().unwrap().clsid, clsid);
    }

    #[test]
    fn test_walk_visits_self() {
        let instance = Placeholder::instance(Clsid::NULL);
        let mut seen = Vec::new();
        instance.walk(&mut |i, depth| seen.push((i.name(), depth)));
        assert_eq!(seen, [("Placeholder", 0)]);
    }
}
