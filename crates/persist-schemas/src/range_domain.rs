//! Attribute range domains.

use std::any::Any;

use persist_stream::{ObjectTree, PersistObject, Registry, Result, Schema, Stream, Value, Variant};

pub static RANGE_DOMAIN: Schema = Schema::new("RangeDomain", create_range_domain, range_domain_from_tree)
    .with_clsid("f84c6c1a-47ff-11d2-9933-0000f80372b4");

/// A named numeric range constraining a field's values.
#[derive(Debug, Default)]
pub struct RangeDomain {
    pub domain_id: u32,
    pub merge_policy: u32,
    pub split_policy: u32,
    pub name: String,
    pub description: String,
    pub owner: String,
    pub field_type: u32,
    pub min: Option<Variant>,
    pub max: Option<Variant>,
}

/// Read a bound: its own u32 type tag, twelve reserved bytes, then the value.
fn read_bound(stream: &mut Stream<'_>, label: &str) -> Result<Variant> {
    let tag = stream.read_u32(label)?;
    for _ in 0..3 {
        stream.expect_u32("reserved", &[0])?;
    }
    stream.read_variant_as(label, tag)
}

impl PersistObject for RangeDomain {
    fn schema(&self) -> &'static Schema {
        &RANGE_DOMAIN
    }

    fn read(&mut self, stream: &mut Stream<'_>, _version: u16) -> Result<()> {
        stream.expect_u16("unknown", &[1])?;
        self.domain_id = stream.read_u32("domain id")?;
        self.merge_policy = stream.read_u32("merge policy")?;
        self.split_policy = stream.read_u32("split policy")?;
        self.name = stream.read_string("name")?;
        self.description = stream.read_string("description")?;
        self.owner = stream.read_string("owner")?;
        self.field_type = stream.read_u32("field type")?;

        self.min = Some(read_bound(stream, "min")?);
        self.max = Some(read_bound(stream, "max")?);
        Ok(())
    }

    fn fields(&self) -> ObjectTree {
        let bound = |v: &Option<Variant>| v.as_ref().map_or(Value::Null, Variant::to_value);
        ObjectTree::new()
            .with("name", self.name.as_str())
            .with("domain_id", self.domain_id)
            .with("merge_policy", self.merge_policy)
            .with("split_policy", self.split_policy)
            .with("description", self.description.as_str())
            .with("owner", self.owner.as_str())
            .with("field_type", self.field_type)
            .with("min", bound(&self.min))
            .with("max", bound(&self.max))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create_range_domain() -> Box<dyn PersistObject> {
    Box::<RangeDomain>::default()
}

fn range_domain_from_tree(registry: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    let bound = |field: &str| -> Result<Option<Variant>> {
        match tree.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Variant::from_value(registry, field, value).map(Some),
        }
    };

    Ok(Box::new(RangeDomain {
        domain_id: tree.require_uint("domain_id")?,
        merge_policy: tree.require_uint("merge_policy")?,
        split_policy: tree.require_uint("split_policy")?,
        name: tree.require_str("name")?.to_string(),
        description: tree.require_str("description")?.to_string(),
        owner: tree.require_str("owner")?.to_string(),
        field_type: tree.require_uint("field_type")?,
        min: bound("min")?,
        max: bound("max")?,
    }))
}
