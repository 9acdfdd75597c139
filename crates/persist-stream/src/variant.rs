//! Tagged dynamic values.

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

use crate::{Error, Instance, Registry, Result, Stream, Value};

/// Variant type tags.
pub mod tag {
    pub const EMPTY: u32 = 0;
    pub const NULL: u32 = 1;
    pub const INTEGER: u32 = 2;
    pub const LONG: u32 = 3;
    pub const SINGLE: u32 = 4;
    pub const DOUBLE: u32 = 5;
    pub const DATE: u32 = 7;
    pub const STRING: u32 = 8;
    pub const BOOLEAN: u32 = 11;
    pub const DATA_OBJECT: u32 = 13;
    /// Length-prefixed secret bytes.
    pub const PASSWORD: u32 = 8209;
}

const MICROS_PER_DAY: f64 = 86_400_000_000.0;

/// Day zero of the date variant.
fn date_epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1899, 12, 30)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// A decoded variant value.
#[derive(Debug)]
pub enum Variant {
    None,
    UInt(u32),
    Float(f64),
    Str(String),
    Bool(bool),
    Timestamp(NaiveDateTime),
    /// A password; only its length is kept.
    Redacted(usize),
    Object(Box<Instance>),
}

impl Variant {
    /// Check if this is the empty variant.
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Variant::None)
    }

    /// Convert to a value tree node. Passwords become a run of `*`.
    pub fn to_value(&self) -> Value {
        match self {
            Variant::None => Value::Null,
            Variant::UInt(v) => Value::from(*v),
            Variant::Float(v) => Value::from(*v),
            Variant::Str(s) => Value::from(s.as_str()),
            Variant::Bool(v) => Value::from(*v),
            Variant::Timestamp(t) => Value::from(*t),
            Variant::Redacted(len) => Value::Str("*".repeat(*len)),
            Variant::Object(instance) => Value::Object(instance.to_tree()),
        }
    }

    /// Rebuild a variant from a value tree node.
    ///
    /// Redacted passwords come back as plain strings.
    pub fn from_value(registry: &Registry, field: &str, value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => Variant::None,
            Value::Bool(v) => Variant::Bool(*v),
            Value::UInt(_) | Value::Int(_) => value
                .as_u64()
                .and_then(|v| u32::try_from(v).ok())
                .map(Variant::UInt)
                .ok_or_else(|| Error::invalid_field(field, "integer outside u32 range"))?,
            Value::Float(v) => Variant::Float(*v),
            Value::Str(s) => Variant::Str(s.clone()),
            Value::Timestamp(t) => Variant::Timestamp(*t),
            Value::Object(tree) => Variant::Object(Box::new(registry.decode_from_value(tree)?)),
            Value::List(_) => return Err(Error::invalid_field(field, "lists are not variants")),
        })
    }
}

impl<'a> Stream<'a> {
    /// Read a u16 type tag followed by its payload.
    pub fn read_variant(&mut self, label: &str) -> Result<Variant> {
        let offset = self.position();
        let tag = self.read_u16(label)? as u32;
        self.read_variant_payload(label, tag, offset)
    }

    /// Read a payload whose type tag is known to the caller.
    pub fn read_variant_as(&mut self, label: &str, tag: u32) -> Result<Variant> {
        let offset = self.position();
        self.read_variant_payload(label, tag, offset)
    }

    fn read_variant_payload(&mut self, label: &str, tag: u32, offset: usize) -> Result<Variant> {
        Ok(match tag {
            tag::EMPTY | tag::NULL => Variant::None,
            tag::INTEGER => Variant::UInt(self.read_u16(label)? as u32),
            tag::LONG | tag::SINGLE => Variant::UInt(self.read_u32(label)?),
            tag::DOUBLE => Variant::Float(self.read_f64(label)?),
            tag::DATE => {
                let date_offset = self.position();
                let days = self.read_f64(label)?;
                if days == 0.0 {
                    Variant::None
                } else {
                    days_to_timestamp(days)
                        .map(Variant::Timestamp)
                        .ok_or(Error::InvalidDate {
                            days,
                            offset: date_offset,
                        })?
                }
            }
            tag::STRING => Variant::Str(self.read_string(label)?),
            tag::BOOLEAN => Variant::Bool(self.read_u16(label)? != 0),
            tag::DATA_OBJECT => match self.read_object(label)? {
                Some(instance) => Variant::Object(Box::new(instance)),
                None => Variant::None,
            },
            tag::PASSWORD => {
                let length = self.read_u32(label)? as usize;
                self.skip(label, length)?;
                Variant::Redacted(length)
            }
            _ => return Err(Error::UnsupportedVariant { tag, offset }),
        })
    }
}

/// Convert fractional days since 1899-12-30 to a timestamp, rounding to the
/// nearest microsecond.
fn days_to_timestamp(days: f64) -> Option<NaiveDateTime> {
    let micros = (days * MICROS_PER_DAY).round_ties_even();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return None;
    }
    date_epoch().checked_add_signed(TimeDelta::microseconds(micros as i64))
}
