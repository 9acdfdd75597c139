//! Unique identifier objects.

use std::any::Any;

use persist_stream::{Clsid, ObjectTree, PersistObject, Registry, Result, Schema, Stream};

pub static UID: Schema =
    Schema::new("Uid", create_uid, uid_from_tree).with_clsid("78ff7fa1-fb2f-11d1-94a2-080009eebecb");

/// A persisted UID: a class id naming another component, plus a sub type.
#[derive(Debug, Clone, Default)]
pub struct Uid {
    pub value: Clsid,
    pub sub_type: u32,
}

impl PersistObject for Uid {
    fn schema(&self) -> &'static Schema {
        &UID
    }

    fn read(&mut self, stream: &mut Stream<'_>, _version: u16) -> Result<()> {
        stream.expect_u8("has value", &[0, 1])?;
        self.value = stream.read_raw_clsid("value")?;
        self.sub_type = stream.read_u32("sub type")?;
        Ok(())
    }

    fn fields(&self) -> ObjectTree {
        ObjectTree::new()
            .with("value", self.value)
            .with("sub_type", self.sub_type)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create_uid() -> Box<dyn PersistObject> {
    Box::<Uid>::default()
}

fn uid_from_tree(_: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    Ok(Box::new(Uid {
        value: tree.require_clsid("value")?,
        sub_type: tree.require_uint("sub_type")?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use persist_stream::{Error, Mode, RegistryBuilder};

    fn uid_bytes(has_value: u8) -> Vec<u8> {
        let mut data = UID.clsid.unwrap().as_wire().to_vec();
        data.extend(1u16.to_le_bytes());
        data.push(has_value);
        data.extend(Clsid::from_wire_hex("03e6147992c8d0118bb6080009ee4e41").unwrap().as_wire());
        data.extend(2u32.to_le_bytes());
        data
    }

    #[test]
    fn test_read_uid() {
        let registry = RegistryBuilder::new().register(&UID).build();
        let data = uid_bytes(1);
        let mut stream = Stream::new(&data, &registry);

        let instance = stream.read_object("uid").unwrap().unwrap();
        let tree = instance.to_tree();
        assert_eq!(tree.get_str("value"), Some("7914e603-c892-11d0-8bb6-080009ee4e41"));
        assert_eq!(tree.get_u64("sub_type"), Some(2));
    }

    #[test]
    fn test_has_value_flag_strictness() {
        let registry = RegistryBuilder::new().register(&UID).build();
        let data = uid_bytes(7);

        let mut strict = Stream::new(&data, &registry).with_mode(Mode::Strict);
        assert!(matches!(
            strict.read_object("uid"),
            Err(Error::UnexpectedValue { offset: 18, .. })
        ));

        let mut tolerant = Stream::new(&data, &registry);
        assert!(tolerant.read_object("uid").unwrap().is_some());
        assert!(tolerant.is_at_end());
    }
}
