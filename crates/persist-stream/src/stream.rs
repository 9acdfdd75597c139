//! Labeled, mode-aware reading on top of [`BinaryReader`].

use std::fmt::Debug;

use persist_common::{BinaryReader, Clsid};
use tracing::{debug, trace};

use crate::{Error, Registry, Result};

/// Default limit on object nesting.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// How validation mismatches are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Any value outside its expected set fails the read.
    Strict,
    /// Mismatches are logged and the read continues with the value found.
    #[default]
    Tolerant,
}

impl Mode {
    /// Check if this is strict mode.
    #[inline]
    pub fn is_strict(self) -> bool {
        matches!(self, Mode::Strict)
    }
}

/// A cursor over one persistent stream.
///
/// Every read takes a label naming the field, which appears in trace
/// output and in [`Error::UnexpectedValue`]. The stream borrows the
/// registry it dispatches nested objects through.
pub struct Stream<'a> {
    reader: BinaryReader<'a>,
    registry: &'a Registry,
    mode: Mode,
    pub(crate) depth: usize,
    max_depth: usize,
}

impl<'a> Stream<'a> {
    /// Create a tolerant stream over `data`, starting at offset 0.
    pub fn new(data: &'a [u8], registry: &'a Registry) -> Self {
        Self {
            reader: BinaryReader::new(data),
            registry,
            mode: Mode::default(),
            depth: 0,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Set the validation mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Start reading at `offset` instead of 0.
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.reader.seek(offset);
        self
    }

    /// Limit how many objects may be nested inside one another.
    ///
    /// Reading an object below this depth fails with
    /// [`Error::DepthExceeded`].
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// The registry nested objects are resolved through.
    #[inline]
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Current validation mode.
    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current object nesting depth.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Maximum object nesting depth.
    #[inline]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Current byte offset.
    #[inline]
    pub fn position(&self) -> usize {
        self.reader.position()
    }

    /// Move to an absolute offset.
    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.reader.seek(position);
    }

    /// Total length of the underlying buffer.
    #[inline]
    pub fn end(&self) -> usize {
        self.reader.len()
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// Check if the cursor is at the end of the buffer.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.reader.is_empty()
    }

    pub(crate) fn reader(&self) -> &BinaryReader<'a> {
        &self.reader
    }

    fn traced<T: Debug>(&self, label: &str, offset: usize, value: T) -> T {
        trace!(offset, depth = self.depth, "{label} = {value:?}");
        value
    }

    /// Validate `value` against `expected`.
    ///
    /// An empty `expected` accepts anything.
    fn check<T: PartialEq + Debug>(&self, label: &str, offset: usize, value: T, expected: &[T]) -> Result<T> {
        if expected.is_empty() || expected.contains(&value) {
            return Ok(value);
        }

        let (expected, actual) = (format!("{expected:?}"), format!("{value:?}"));
        if self.mode.is_strict() {
            return Err(Error::UnexpectedValue {
                label: label.to_string(),
                offset,
                expected,
                actual,
            });
        }

        debug!(offset, depth = self.depth, "{label}: got {actual}, expected {expected}");
        Ok(value)
    }

    /// Read a u8.
    pub fn read_u8(&mut self, label: &str) -> Result<u8> {
        let offset = self.position();
        let value = self.reader.read_u8()?;
        Ok(self.traced(label, offset, value))
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self, label: &str) -> Result<u16> {
        let offset = self.position();
        let value = self.reader.read_u16()?;
        Ok(self.traced(label, offset, value))
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self, label: &str) -> Result<u32> {
        let offset = self.position();
        let value = self.reader.read_u32()?;
        Ok(self.traced(label, offset, value))
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self, label: &str) -> Result<i32> {
        let offset = self.position();
        let value = self.reader.read_i32()?;
        Ok(self.traced(label, offset, value))
    }

    /// Read a little-endian f64.
    pub fn read_f64(&mut self, label: &str) -> Result<f64> {
        let offset = self.position();
        let value = self.reader.read_f64()?;
        Ok(self.traced(label, offset, value))
    }

    /// Read a u8 that should be one of `expected`.
    pub fn expect_u8(&mut self, label: &str, expected: &[u8]) -> Result<u8> {
        let offset = self.position();
        let value = self.read_u8(label)?;
        self.check(label, offset, value, expected)
    }

    /// Read a u16 that should be one of `expected`.
    pub fn expect_u16(&mut self, label: &str, expected: &[u16]) -> Result<u16> {
        let offset = self.position();
        let value = self.read_u16(label)?;
        self.check(label, offset, value, expected)
    }

    /// Read a u32 that should be one of `expected`.
    pub fn expect_u32(&mut self, label: &str, expected: &[u32]) -> Result<u32> {
        let offset = self.position();
        let value = self.read_u32(label)?;
        self.check(label, offset, value, expected)
    }

    /// Read an i32 that should be one of `expected`.
    pub fn expect_i32(&mut self, label: &str, expected: &[i32]) -> Result<i32> {
        let offset = self.position();
        let value = self.read_i32(label)?;
        self.check(label, offset, value, expected)
    }

    /// Read an f64 that should be one of `expected`.
    pub fn expect_f64(&mut self, label: &str, expected: &[f64]) -> Result<f64> {
        let offset = self.position();
        let value = self.read_f64(label)?;
        self.check(label, offset, value, expected)
    }

    /// Read a length-prefixed UTF-16LE string.
    ///
    /// The u32 prefix counts bytes including the two-byte terminator, which
    /// must be `0x0000`. On failure the cursor is left at the prefix.
    pub fn read_string(&mut self, label: &str) -> Result<String> {
        let offset = self.position();
        let value = self.read_string_body(offset).inspect_err(|_| self.seek(offset))?;
        Ok(self.traced(label, offset, value))
    }

    fn read_string_body(&mut self, offset: usize) -> Result<String> {
        let length = self.reader.read_u32()?;
        if length < 2 || length % 2 != 0 {
            return Err(persist_common::Error::InvalidLength { offset, length }.into());
        }
        self.read_terminated_utf16(length as usize / 2 - 1)
    }

    /// Read a string that should be one of `expected`.
    pub fn expect_string(&mut self, label: &str, expected: &[&str]) -> Result<String> {
        let offset = self.position();
        let value = self.read_string(label)?;
        self.check(label, offset, value.as_str(), expected)?;
        Ok(value)
    }

    /// Read a UTF-16LE string whose u32 prefix counts code units.
    ///
    /// A zero length is the empty string with no terminator. On failure the
    /// cursor is left at the prefix.
    pub fn read_string_v2(&mut self, label: &str) -> Result<String> {
        let offset = self.position();
        let units = self.reader.read_u32()? as usize;
        let value = if units == 0 {
            String::new()
        } else {
            self.read_terminated_utf16(units).inspect_err(|_| self.seek(offset))?
        };
        Ok(self.traced(label, offset, value))
    }

    fn read_terminated_utf16(&mut self, units: usize) -> Result<String> {
        let value = self.reader.read_utf16(units)?;
        let terminator_offset = self.position();
        let terminator = self.reader.read_u16()?;
        if terminator != 0 {
            return Err(persist_common::Error::InvalidTerminator {
                offset: terminator_offset,
                actual: terminator,
            }
            .into());
        }
        Ok(value)
    }

    /// Read a u32-prefixed Latin-1 string with no terminator.
    pub fn read_ascii(&mut self, label: &str) -> Result<String> {
        let offset = self.position();
        let length = self.reader.read_u32()? as usize;
        let value = self
            .reader
            .read_latin1(length)
            .inspect_err(|_| self.seek(offset))?;
        Ok(self.traced(label, offset, value))
    }

    /// Read 16 raw bytes as a CLSID, without resolving it.
    pub fn read_raw_clsid(&mut self, label: &str) -> Result<Clsid> {
        let offset = self.position();
        let value: Clsid = self.reader.read_struct()?;
        Ok(self.traced(label, offset, value))
    }

    /// Read a raw CLSID that should be one of `expected`.
    pub fn expect_raw_clsid(&mut self, label: &str, expected: &[Clsid]) -> Result<Clsid> {
        let offset = self.position();
        let value = self.read_raw_clsid(label)?;
        self.check(label, offset, value, expected)
    }

    /// Read `count` raw bytes.
    pub fn read_bytes(&mut self, label: &str, count: usize) -> Result<&'a [u8]> {
        let offset = self.position();
        let bytes = self.reader.read_bytes(count)?;
        trace!(offset, depth = self.depth, "{label} = {} bytes", bytes.len());
        Ok(bytes)
    }

    /// Skip `count` bytes that carry no known meaning.
    pub fn skip(&mut self, label: &str, count: usize) -> Result<()> {
        self.read_bytes(label, count).map(|_| ())
    }

    /// Read a u32-length-prefixed embedded blob.
    pub fn read_embedded(&mut self, label: &str) -> Result<&'a [u8]> {
        let length = self.read_u32(label)? as usize;
        self.read_bytes(label, length)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegistryBuilder;

    fn utf16(s: &str) -> Vec<u8> {
        s.encode_utf16().flat_map(u16::to_le_bytes).collect()
    }

    fn string_field(s: &str) -> Vec<u8> {
        let body = utf16(s);
        let mut out = ((body.len() + 2) as u32).to_le_bytes().to_vec();
        out.extend(body);
        out.extend([0, 0]);
        out
    }

    #[test]
    fn test_read_primitives() {
        let registry = RegistryBuilder::new().build();
        let mut data = vec![0x2A];
        data.extend(0x1234u16.to_le_bytes());
        data.extend((-5i32).to_le_bytes());
        data.extend(1.5f64.to_le_bytes());
        let mut stream = Stream::new(&data, &registry);

        assert_eq!(stream.read_u8("a").unwrap(), 0x2A);
        assert_eq!(stream.read_u16("b").unwrap(), 0x1234);
        assert_eq!(stream.read_i32("c").unwrap(), -5);
        assert_eq!(stream.read_f64("d").unwrap(), 1.5);
        assert!(stream.is_at_end());
        assert!(matches!(
            stream.read_u8("e"),
            Err(Error::Common(persist_common::Error::TruncatedField { .. }))
        ));
    }

    #[test]
    fn test_read_string() {
        let registry = RegistryBuilder::new().build();
        let data = string_field("Hello");
        let mut stream = Stream::new(&data, &registry);

        assert_eq!(stream.read_string("name").unwrap(), "Hello");
        assert_eq!(stream.position(), data.len());
    }

    #[test]
    fn test_read_empty_string() {
        let registry = RegistryBuilder::new().build();
        let data = string_field("");
        let mut stream = Stream::new(&data, &registry);

        assert_eq!(stream.read_string("name").unwrap(), "");
    }

    #[test]
    fn test_bad_terminator_fails() {
        let registry = RegistryBuilder::new().build();
        let mut data = string_field("ab");
        let len = data.len();
        data[len - 2] = 0x41;
        let mut stream = Stream::new(&data, &registry);

        assert!(matches!(
            stream.read_string("name"),
            Err(Error::Common(persist_common::Error::InvalidTerminator { actual: 0x41, .. }))
        ));
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_invalid_utf16_rewinds_to_prefix() {
        let registry = RegistryBuilder::new().build();
        let mut data = vec![0xEE, 0xEE];
        data.extend(4u32.to_le_bytes());
        data.extend(0xD800u16.to_le_bytes());
        data.extend([0, 0]);
        let mut stream = Stream::new(&data, &registry).with_offset(2);

        assert!(matches!(
            stream.read_string("name"),
            Err(Error::Common(persist_common::Error::Utf16 { offset: 6 }))
        ));
        assert_eq!(stream.position(), 2);

        let mut v2 = 1u32.to_le_bytes().to_vec();
        v2.extend(0xDC00u16.to_le_bytes());
        v2.extend([0, 0]);
        let mut stream = Stream::new(&v2, &registry);
        assert!(stream.read_string_v2("name").is_err());
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn test_short_length_fails() {
        let registry = RegistryBuilder::new().build();
        let data = 1u32.to_le_bytes();
        let mut stream = Stream::new(&data, &registry);

        assert!(matches!(
            stream.read_string("name"),
            Err(Error::Common(persist_common::Error::InvalidLength { length: 1, offset: 0 }))
        ));
    }

    #[test]
    fn test_read_string_v2() {
        let registry = RegistryBuilder::new().build();
        let mut data = 3u32.to_le_bytes().to_vec();
        data.extend(utf16("abc"));
        data.extend([0, 0]);
        data.extend(0u32.to_le_bytes());
        let mut stream = Stream::new(&data, &registry);

        assert_eq!(stream.read_string_v2("a").unwrap(), "abc");
        assert_eq!(stream.read_string_v2("b").unwrap(), "");
        assert!(stream.is_at_end());
    }

    #[test]
    fn test_read_ascii() {
        let registry = RegistryBuilder::new().build();
        let mut data = 3u32.to_le_bytes().to_vec();
        data.extend([b'a', 0xE9, b'z']);
        let mut stream = Stream::new(&data, &registry);

        assert_eq!(stream.read_ascii("font").unwrap(), "aéz");
    }

    #[test]
    fn test_strict_raises_tolerant_continues() {
        let registry = RegistryBuilder::new().build();
        let data = 7u16.to_le_bytes();

        let mut strict = Stream::new(&data, &registry).with_mode(Mode::Strict);
        match strict.expect_u16("flag", &[0, 1]) {
            Err(Error::UnexpectedValue { label, offset, actual, .. }) => {
                assert_eq!(label, "flag");
                assert_eq!(offset, 0);
                assert_eq!(actual, "7");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let mut tolerant = Stream::new(&data, &registry);
        assert_eq!(tolerant.expect_u16("flag", &[0, 1]).unwrap(), 7);
        assert!(tolerant.is_at_end());
    }

    #[test]
    fn test_expect_string() {
        let registry = RegistryBuilder::new().build();
        let data = string_field("x");

        let mut strict = Stream::new(&data, &registry).with_mode(Mode::Strict);
        assert!(strict.expect_string("s", &["y", "z"]).is_err());

        let mut strict = Stream::new(&data, &registry).with_mode(Mode::Strict);
        assert_eq!(strict.expect_string("s", &["x"]).unwrap(), "x");
    }

    #[test]
    fn test_read_embedded_and_offset() {
        let registry = RegistryBuilder::new().build();
        let mut data = vec![0xFF, 0xFF];
        data.extend(2u32.to_le_bytes());
        data.extend([9, 8]);
        let mut stream = Stream::new(&data, &registry).with_offset(2);

        assert_eq!(stream.read_embedded("blob").unwrap(), &[9, 8]);
        assert_eq!(stream.remaining(), 0);
    }
}
