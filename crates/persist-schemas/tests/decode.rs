use std::any::Any;

use persist_color::Rgb;
use persist_schemas::{builder, registry, CmykColor, LabColor, Uid};
use persist_stream::{
    Clsid, Error, Instance, Mode, ObjectTree, PersistObject, Registry, Result, Schema, SizedObject, Stream, Value,
};

const RGB_ID: &str = "7ee9c496-d123-11d0-8383-080009b996cc";
const CMYK_ID: &str = "7ee9c497-d123-11d0-8383-080009b996cc";
const UID_ID: &str = "78ff7fa1-fb2f-11d1-94a2-080009eebecb";
const GROUP_ID: &str = "c0ffee00-0000-4000-8000-000000000001";
const EXTENSION_ID: &str = "c0ffee00-0000-4000-8000-0000000000ee";

fn id(clsid: &str) -> Vec<u8> {
    clsid.parse::<Clsid>().unwrap().as_wire().to_vec()
}

fn rgb_color(lab: [f64; 3]) -> Vec<u8> {
    let mut data = id(RGB_ID);
    data.extend(1u16.to_le_bytes());
    data.extend([1, 0, 0]);
    for v in lab {
        data.extend(v.to_le_bytes());
    }
    data.extend([0, 0]);
    data
}

fn cmyk_color(c: u8, m: u8, y: u8, k: u8) -> Vec<u8> {
    let mut data = id(CMYK_ID);
    data.extend(4u16.to_le_bytes());
    data.extend([0, 0, c, m, y, k, 1, 0]);
    data
}

/// A container that size-prefixes its children, so unreadable ones can be
/// skipped.
#[derive(Debug, Default)]
struct Group {
    children: Vec<Instance>,
    skipped: Vec<usize>,
}

impl PersistObject for Group {
    fn schema(&self) -> &'static Schema {
        &GROUP
    }

    fn read(&mut self, stream: &mut Stream<'_>, _: u16) -> Result<()> {
        let count = stream.read_u32("child count")?;
        for _ in 0..count {
            let size = stream.read_u32("child size")? as usize;
            match stream.read_object_sized("child", size)? {
                SizedObject::Decoded(Some(child)) => self.children.push(child),
                SizedObject::Decoded(None) => {}
                SizedObject::Skipped(skipped) => {
                    self.skipped.push(skipped.offset);
                    if let Some(placeholder) = skipped.into_best_effort() {
                        self.children.push(placeholder);
                    }
                }
            }
        }
        Ok(())
    }

    fn fields(&self) -> ObjectTree {
        let children: Vec<Value> = self.children.iter().map(|c| c.to_tree().into()).collect();
        ObjectTree::new().with("children", children)
    }

    fn children(&self) -> Vec<&Instance> {
        self.children.iter().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create_group() -> Box<dyn PersistObject> {
    Box::<Group>::default()
}

fn group_from_tree(_: &Registry, _: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    Ok(Box::<Group>::default())
}

static GROUP: Schema = Schema::new("Group", create_group, group_from_tree).with_clsid(GROUP_ID);

fn group(children: &[Vec<u8>]) -> Vec<u8> {
    let mut data = id(GROUP_ID);
    data.extend(1u16.to_le_bytes());
    data.extend((children.len() as u32).to_le_bytes());
    for child in children {
        data.extend((child.len() as u32).to_le_bytes());
        data.extend(child);
    }
    data
}

fn test_registry() -> Registry {
    builder()
        .register(&GROUP)
        .licensed_extension(EXTENSION_ID.parse().unwrap())
        .build()
}

#[test]
fn test_distinct_ids_construct_distinct_types() {
    let registry = registry();

    let rgb = registry.create(RGB_ID.parse().unwrap()).unwrap().unwrap();
    let cmyk = registry.create(CMYK_ID.parse().unwrap()).unwrap().unwrap();

    assert!(rgb.downcast_ref::<LabColor>().is_some());
    assert!(cmyk.downcast_ref::<CmykColor>().is_some());
    assert!(rgb.downcast_ref::<CmykColor>().is_none());
}

#[test]
fn test_licensed_extension_has_placeholder() {
    let registry = test_registry();

    match registry.create(EXTENSION_ID.parse().unwrap()) {
        Err(Error::LicensedExtension(ext)) => {
            let placeholder = ext.best_effort();
            assert_eq!(placeholder.name(), "Placeholder");
            assert_eq!(placeholder.to_tree().get_str("clsid"), Some(EXTENSION_ID));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_group_skips_unreadable_children() {
    let registry = test_registry();

    let mut unknown = id("deadbeef-0000-4000-8000-000000000000");
    unknown.extend([0xAA; 6]);
    let mut licensed = id(EXTENSION_ID);
    licensed.extend([0x55; 3]);

    let data = group(&[
        rgb_color([56.547017615341, 76.8994334713463, 68.1034442713808]),
        unknown,
        licensed,
        cmyk_color(1, 2, 3, 4),
    ]);
    let mut stream = Stream::new(&data, &registry);

    let root = stream.read_object("root").unwrap().unwrap();
    assert!(stream.is_at_end());

    let group = root.downcast_ref::<Group>().unwrap();
    assert_eq!(group.skipped.len(), 2);
    let names: Vec<_> = group.children.iter().map(Instance::name).collect();
    assert_eq!(names, ["RgbColor", "Placeholder", "CmykColor"]);

    let red = group.children[0].downcast_ref::<LabColor>().unwrap();
    assert_eq!(red.rgb, Rgb::new(255, 0, 0));

    let mut depths = Vec::new();
    root.walk(&mut |_, depth| depths.push(depth));
    assert_eq!(depths, [0, 1, 1, 1]);
}

#[test]
fn test_licensed_variant_fails_without_size() {
    let registry = test_registry();
    let mut data = 13u16.to_le_bytes().to_vec();
    data.extend(id(EXTENSION_ID));
    let mut stream = Stream::new(&data, &registry);

    match stream.read_variant("value") {
        Err(Error::LicensedExtension(ext)) => {
            assert_eq!(ext.offset, Some(2));
            assert!(ext.partial.is_none());
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn test_strict_and_tolerant_on_same_input() {
    let registry = registry();
    let mut data = id(UID_ID);
    data.extend(1u16.to_le_bytes());
    data.push(9);
    data.extend([0; 16]);
    data.extend(0u32.to_le_bytes());

    let mut strict = Stream::new(&data, &registry).with_mode(Mode::Strict);
    assert!(matches!(strict.read_object("uid"), Err(Error::UnexpectedValue { .. })));

    let mut tolerant = Stream::new(&data, &registry).with_mode(Mode::Tolerant);
    let uid = tolerant.read_object("uid").unwrap().unwrap();
    assert!(uid.downcast_ref::<Uid>().unwrap().value.is_null());
}

#[test]
fn test_value_tree_round_trip() {
    let registry = registry();
    let data = cmyk_color(10, 20, 30, 40);
    let decoded = Stream::new(&data, &registry).read_object("color").unwrap().unwrap();

    let tree = decoded.to_tree();
    assert_eq!(tree.schema_name(), Some("CmykColor"));
    assert_eq!(tree.version(), Some(4));

    let rebuilt = registry.decode_from_value(&tree).unwrap();
    assert_eq!(rebuilt.clsid(), decoded.clsid());
    assert_eq!(rebuilt.version(), 4);

    let without_offset = |t: &ObjectTree| -> Vec<(String, Value)> {
        t.iter()
            .filter(|(k, _)| *k != "stream_offset")
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    };
    assert_eq!(without_offset(&rebuilt.to_tree()), without_offset(&tree));
}

#[test]
fn test_unknown_schema_name() {
    let tree = ObjectTree::new().with("type", "SimpleFillSymbol");
    assert!(matches!(
        registry().decode_from_value(&tree),
        Err(Error::UnknownSchemaName(name)) if name == "SimpleFillSymbol"
    ));
}

#[cfg(feature = "json")]
#[test]
fn test_json_output() {
    let registry = registry();
    let data = cmyk_color(1, 2, 3, 4);
    let decoded = Stream::new(&data, &registry).read_object("color").unwrap().unwrap();

    let json = decoded.to_tree().to_json_pretty().unwrap();
    assert!(json.contains("\"type\": \"CmykColor\""));
    assert!(json.contains("\"stream_offset\": \"0x0\""));
    assert!(json.contains("\"K\": 4"));
}
