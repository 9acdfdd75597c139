//! Property sets: string keys with variant values.

use std::any::Any;

use persist_stream::{
    Instance, ObjectTree, PersistObject, Registry, Result, Schema, Stream, Variant, OFFSET_FIELD, TYPE_FIELD,
    VERSION_FIELD,
};

pub static PROPERTY_SET: Schema = Schema::new("PropertySet", create_property_set, property_set_from_tree)
    .with_clsid("588e5a11-d09b-11d1-aa7c-00c04fa33a15");

/// An ordered set of named variant values.
///
/// Keys are kept in stream order; a repeated key replaces the earlier value
/// in place.
#[derive(Debug, Default)]
pub struct PropertySet {
    pub properties: Vec<(String, Variant)>,
}

impl PropertySet {
    /// Look up a property by key.
    pub fn get(&self, key: &str) -> Option<&Variant> {
        self.properties.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn insert(&mut self, key: String, value: Variant) {
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.properties.push((key, value)),
        }
    }
}

impl PersistObject for PropertySet {
    fn schema(&self) -> &'static Schema {
        &PROPERTY_SET
    }

    fn read(&mut self, stream: &mut Stream<'_>, _version: u16) -> Result<()> {
        let count = stream.read_u32("property count")?;
        for _ in 0..count {
            let key = stream.read_string("key")?;
            let value = stream.read_variant(&key)?;
            self.insert(key, value);
        }
        Ok(())
    }

    fn fields(&self) -> ObjectTree {
        self.properties
            .iter()
            .fold(ObjectTree::new(), |tree, (k, v)| tree.with(k, v.to_value()))
    }

    fn children(&self) -> Vec<&Instance> {
        self.properties
            .iter()
            .filter_map(|(_, v)| match v {
                Variant::Object(instance) => Some(instance.as_ref()),
                _ => None,
            })
            .collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create_property_set() -> Box<dyn PersistObject> {
    Box::<PropertySet>::default()
}

fn property_set_from_tree(registry: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    let mut set = PropertySet::default();
    for (key, value) in tree {
        if [TYPE_FIELD, VERSION_FIELD, OFFSET_FIELD].contains(&key) {
            continue;
        }
        set.insert(key.to_string(), Variant::from_value(registry, key, value)?);
    }
    Ok(Box::new(set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use persist_stream::{Error, RegistryBuilder, Value, DEFAULT_MAX_DEPTH};

    fn string_field(s: &str) -> Vec<u8> {
        let body: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut out = ((body.len() + 2) as u32).to_le_bytes().to_vec();
        out.extend(body);
        out.extend([0, 0]);
        out
    }

    #[test]
    fn test_read_property_set() {
        let registry = RegistryBuilder::new().register(&PROPERTY_SET).build();
        let mut data = PROPERTY_SET.clsid.unwrap().as_wire().to_vec();
        data.extend(1u16.to_le_bytes());
        data.extend(3u32.to_le_bytes());
        data.extend(string_field("Name"));
        data.extend(8u16.to_le_bytes());
        data.extend(string_field("roads"));
        data.extend(string_field("Visible"));
        data.extend(11u16.to_le_bytes());
        data.extend(0xFFFFu16.to_le_bytes());
        data.extend(string_field("Password"));
        data.extend(8209u16.to_le_bytes());
        data.extend(4u32.to_le_bytes());
        data.extend(b"hunt");
        let mut stream = Stream::new(&data, &registry);

        let instance = stream.read_object("properties").unwrap().unwrap();
        assert!(stream.is_at_end());

        let set = instance.downcast_ref::<PropertySet>().unwrap();
        assert!(matches!(set.get("Visible"), Some(Variant::Bool(true))));

        let tree = instance.to_tree();
        let keys: Vec<_> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["type", "version", "stream_offset", "Name", "Visible", "Password"]);
        assert_eq!(tree.get_str("Name"), Some("roads"));
        assert_eq!(tree.get("Password"), Some(&Value::Str("****".into())));
    }

    #[test]
    fn test_envelope_wins_over_colliding_keys() {
        let registry = RegistryBuilder::new().register(&PROPERTY_SET).build();
        let mut data = PROPERTY_SET.clsid.unwrap().as_wire().to_vec();
        data.extend(1u16.to_le_bytes());
        data.extend(3u32.to_le_bytes());
        data.extend(string_field("type"));
        data.extend(8u16.to_le_bytes());
        data.extend(string_field("Road"));
        data.extend(string_field("version"));
        data.extend(8u16.to_le_bytes());
        data.extend(string_field("2.1"));
        data.extend(string_field("Lanes"));
        data.extend(3u16.to_le_bytes());
        data.extend(4u32.to_le_bytes());
        let mut stream = Stream::new(&data, &registry);

        let instance = stream.read_object("properties").unwrap().unwrap();
        assert!(stream.is_at_end());

        let set = instance.downcast_ref::<PropertySet>().unwrap();
        assert!(matches!(set.get("type"), Some(Variant::Str(s)) if s == "Road"));

        let tree = instance.to_tree();
        assert_eq!(tree.schema_name(), Some("PropertySet"));
        assert_eq!(tree.version(), Some(1));
        assert_eq!(tree.get_str("stream_offset"), Some("0x0"));
        let keys: Vec<_> = tree.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["type", "version", "stream_offset", "Lanes"]);

        let rebuilt = registry.decode_from_value(&tree).unwrap();
        assert_eq!(rebuilt.name(), "PropertySet");
        assert!(matches!(
            rebuilt.downcast_ref::<PropertySet>().unwrap().get("Lanes"),
            Some(Variant::UInt(4))
        ));
    }

    #[test]
    fn test_deeply_nested_sets_fail_cleanly() {
        let registry = RegistryBuilder::new().register(&PROPERTY_SET).build();
        let mut data = Vec::new();
        for _ in 0..5_000 {
            data.extend(PROPERTY_SET.clsid.unwrap().as_wire());
            data.extend(1u16.to_le_bytes());
            data.extend(1u32.to_le_bytes());
            data.extend(string_field("k"));
            data.extend(13u16.to_le_bytes());
        }
        data.extend([0; 16]);
        let mut stream = Stream::new(&data, &registry);

        assert!(matches!(
            stream.read_object("properties"),
            Err(Error::DepthExceeded { depth, .. }) if depth == DEFAULT_MAX_DEPTH
        ));
        assert_eq!(stream.depth(), 0);
    }

    #[test]
    fn test_from_tree_skips_envelope() {
        let registry = RegistryBuilder::new().register(&PROPERTY_SET).build();
        let tree = ObjectTree::new()
            .with(TYPE_FIELD, "PropertySet")
            .with(VERSION_FIELD, 1u16)
            .with("Count", 5u32)
            .with("Label", "x");

        let instance = registry.decode_from_value(&tree).unwrap();
        let set = instance.downcast_ref::<PropertySet>().unwrap();
        assert_eq!(set.properties.len(), 2);
        assert!(matches!(set.get("Count"), Some(Variant::UInt(5))));
    }
}
