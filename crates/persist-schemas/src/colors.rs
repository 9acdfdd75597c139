//! Color objects.
//!
//! Every color ends with a dither byte (`1` means dithered) and a null byte
//! (`0xFF` means "no color"). RGB, HSV, HLS and gray colors all persist the
//! color as CIELAB doubles, whatever model the user picked; CMYK stores its
//! four components directly.

use std::any::Any;

use persist_color::{cielab_to_rgb, Lab, Rgb};
use persist_stream::{Error, ObjectTree, PersistObject, Registry, Result, Schema, Stream, Value};
use tracing::trace;

/// Color model of a CIELAB-backed color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorModel {
    #[default]
    Rgb,
    Hsv,
    Hls,
    Gray,
}

impl ColorModel {
    fn schema(self) -> &'static Schema {
        match self {
            ColorModel::Rgb => &RGB_COLOR,
            ColorModel::Hsv => &HSV_COLOR,
            ColorModel::Hls => &HLS_COLOR,
            ColorModel::Gray => &GRAY_COLOR,
        }
    }
}

pub static RGB_COLOR: Schema =
    Schema::new("RgbColor", create_rgb, rgb_from_tree).with_clsid("7ee9c496-d123-11d0-8383-080009b996cc");
pub static HSV_COLOR: Schema =
    Schema::new("HsvColor", create_hsv, hsv_from_tree).with_clsid("7ee9c492-d123-11d0-8383-080009b996cc");
pub static HLS_COLOR: Schema =
    Schema::new("HlsColor", create_hls, hls_from_tree).with_clsid("7ee9c493-d123-11d0-8383-080009b996cc");
pub static GRAY_COLOR: Schema =
    Schema::new("GrayColor", create_gray, gray_from_tree).with_clsid("7ee9c495-d123-11d0-8383-080009b996cc");
pub static CMYK_COLOR: Schema = Schema::new("CmykColor", create_cmyk, cmyk_from_tree)
    .with_clsid("7ee9c497-d123-11d0-8383-080009b996cc")
    .with_versions(&[4]);

fn read_flags(stream: &mut Stream<'_>) -> Result<(bool, bool)> {
    let dither = stream.read_u8("dither")? == 1;
    let is_null = stream.read_u8("is null")? == 0xFF;
    Ok((dither, is_null))
}

/// A color persisted as CIELAB and exposed as RGB.
#[derive(Debug, Clone, Default)]
pub struct LabColor {
    pub model: ColorModel,
    pub rgb: Rgb,
    /// The stored CIELAB value; absent when rebuilt from a value tree.
    pub lab: Option<Lab>,
    pub dither: bool,
    pub is_null: bool,
}

impl LabColor {
    fn with_model(model: ColorModel) -> Self {
        Self {
            model,
            ..Default::default()
        }
    }

    fn from_tree(model: ColorModel, tree: &ObjectTree) -> Result<Self> {
        let lab = match tree.get("lab").and_then(Value::as_list) {
            Some([l, a, b]) => match (l.as_f64(), a.as_f64(), b.as_f64()) {
                (Some(l), Some(a), Some(b)) => Some(Lab::new(l, a, b)),
                _ => return Err(Error::invalid_field("lab", "expected three numbers")),
            },
            Some(_) => return Err(Error::invalid_field("lab", "expected three numbers")),
            None => None,
        };

        Ok(Self {
            model,
            rgb: Rgb::new(tree.require_uint("R")?, tree.require_uint("G")?, tree.require_uint("B")?),
            lab,
            dither: tree.require_bool("dither")?,
            is_null: tree.require_bool("is_null")?,
        })
    }
}

impl PersistObject for LabColor {
    fn schema(&self) -> &'static Schema {
        self.model.schema()
    }

    fn read(&mut self, stream: &mut Stream<'_>, _version: u16) -> Result<()> {
        stream.skip("unknown", 3)?;

        let lab = Lab::new(
            stream.read_f64("lab l")?,
            stream.read_f64("lab a")?,
            stream.read_f64("lab b")?,
        );
        self.rgb = cielab_to_rgb(lab)?;
        self.lab = Some(lab);
        (self.dither, self.is_null) = read_flags(stream)?;

        trace!(model = ?self.model, rgb = ?self.rgb, "read color");
        Ok(())
    }

    fn fields(&self) -> ObjectTree {
        let lab = self
            .lab
            .map(|lab| Value::List(vec![lab.l.into(), lab.a.into(), lab.b.into()]));
        ObjectTree::new()
            .with("R", self.rgb.r)
            .with("G", self.rgb.g)
            .with("B", self.rgb.b)
            .with("dither", self.dither)
            .with("is_null", self.is_null)
            .with("lab", lab)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create_rgb() -> Box<dyn PersistObject> {
    Box::new(LabColor::with_model(ColorModel::Rgb))
}

fn create_hsv() -> Box<dyn PersistObject> {
    Box::new(LabColor::with_model(ColorModel::Hsv))
}

fn create_hls() -> Box<dyn PersistObject> {
    Box::new(LabColor::with_model(ColorModel::Hls))
}

fn create_gray() -> Box<dyn PersistObject> {
    Box::new(LabColor::with_model(ColorModel::Gray))
}

fn rgb_from_tree(_: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    Ok(Box::new(LabColor::from_tree(ColorModel::Rgb, tree)?))
}

fn hsv_from_tree(_: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    Ok(Box::new(LabColor::from_tree(ColorModel::Hsv, tree)?))
}

fn hls_from_tree(_: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    Ok(Box::new(LabColor::from_tree(ColorModel::Hls, tree)?))
}

fn gray_from_tree(_: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    Ok(Box::new(LabColor::from_tree(ColorModel::Gray, tree)?))
}

/// A CMYK color. Components are stored as-is, 0-255.
#[derive(Debug, Clone, Default)]
pub struct CmykColor {
    pub cyan: u8,
    pub magenta: u8,
    pub yellow: u8,
    pub black: u8,
    pub dither: bool,
    pub is_null: bool,
}

impl PersistObject for CmykColor {
    fn schema(&self) -> &'static Schema {
        &CMYK_COLOR
    }

    fn read(&mut self, stream: &mut Stream<'_>, _version: u16) -> Result<()> {
        stream.skip("unknown", 2)?;

        self.cyan = stream.read_u8("cyan")?;
        self.magenta = stream.read_u8("magenta")?;
        self.yellow = stream.read_u8("yellow")?;
        self.black = stream.read_u8("black")?;
        (self.dither, self.is_null) = read_flags(stream)?;
        Ok(())
    }

    fn fields(&self) -> ObjectTree {
        ObjectTree::new()
            .with("C", self.cyan)
            .with("M", self.magenta)
            .with("Y", self.yellow)
            .with("K", self.black)
            .with("dither", self.dither)
            .with("is_null", self.is_null)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn create_cmyk() -> Box<dyn PersistObject> {
    Box::<CmykColor>::default()
}

fn cmyk_from_tree(_: &Registry, tree: &ObjectTree) -> Result<Box<dyn PersistObject>> {
    Ok(Box::new(CmykColor {
        cyan: tree.require_uint("C")?,
        magenta: tree.require_uint("M")?,
        yellow: tree.require_uint("Y")?,
        black: tree.require_uint("K")?,
        dither: tree.require_bool("dither")?,
        is_null: tree.require_bool("is_null")?,
    }))
}
