//! Indexed property bags.
//!
//! A bag is a short header followed by `(reference, size, payload)` entries
//! in any order, closed by a reference of `0xFFFFFFFF`. Payloads are only
//! meaningful to the caller, so every reference must be handled: skipping an
//! unknown one would desynchronize the rest of the stream.

use tracing::trace;

use crate::{Error, Result, Stream};

/// Reference value that closes a bag.
pub const PROPERTY_TERMINATOR: u32 = 0xFFFF_FFFF;

/// Size value some writers use for entries holding a nested object, whose
/// length is not recorded.
pub const UNSIZED_PROPERTY: u32 = 0xFFFF_FFFF;

const HEADER_FIRST: [u16; 3] = [250, 255, 34125];
const HEADER_SECOND: [u16; 3] = [255, 4351, 34419];
const SNIFF_SECOND: [u16; 2] = [255, 34419];

/// One entry of a property bag, positioned at its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEntry {
    pub reference: u32,
    pub size: u32,
    /// Offset of the first payload byte.
    pub offset: usize,
}

impl PropertyEntry {
    /// Check if the writer left the payload size unrecorded.
    #[inline]
    pub fn is_unsized(&self) -> bool {
        self.size == UNSIZED_PROPERTY
    }
}

impl<'a> Stream<'a> {
    /// Check whether a bag header starts at the cursor, without moving it.
    pub fn sniff_indexed_properties(&self) -> bool {
        let mut reader = self.reader().clone();
        let (Ok(first), Ok(second), Ok(reserved)) = (reader.read_u16(), reader.read_u16(), reader.read_u32()) else {
            return false;
        };

        HEADER_FIRST.contains(&first) && SNIFF_SECOND.contains(&second) && reserved == 0
    }

    /// Read a property bag, passing each entry to `handler`.
    ///
    /// The handler returns `Ok(false)` for a reference it does not know,
    /// which fails the read. A handled entry with a recorded size must have
    /// consumed exactly that many bytes.
    pub fn read_indexed_properties<F>(&mut self, mut handler: F) -> Result<()>
    where
        F: FnMut(&mut Stream<'a>, &PropertyEntry) -> Result<bool>,
    {
        self.expect_u16("property bag header", &HEADER_FIRST)?;
        self.expect_u16("property bag version", &HEADER_SECOND)?;
        self.expect_u32("property bag reserved", &[0])?;

        loop {
            let reference = self.read_u32("property reference")?;
            if reference == PROPERTY_TERMINATOR {
                return Ok(());
            }
            let size = self.read_u32("property size")?;
            let entry = PropertyEntry {
                reference,
                size,
                offset: self.position(),
            };

            if !handler(self, &entry)? {
                return Err(Error::UnhandledProperty {
                    reference,
                    offset: entry.offset,
                });
            }

            let consumed = self.position().saturating_sub(entry.offset);
            if !entry.is_unsized() && consumed != size as usize {
                return Err(Error::PropertyLengthMismatch {
                    reference,
                    offset: entry.offset,
                    expected: size,
                    actual: consumed,
                });
            }
            trace!(offset = entry.offset, "property {reference}: {consumed} bytes");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Mode, RegistryBuilder};

    fn header(first: u16, second: u16) -> Vec<u8> {
        let mut data = first.to_le_bytes().to_vec();
        data.extend(second.to_le_bytes());
        data.extend(0u32.to_le_bytes());
        data
    }

    fn entry(data: &mut Vec<u8>, reference: u32, payload: &[u8]) {
        data.extend(reference.to_le_bytes());
        data.extend((payload.len() as u32).to_le_bytes());
        data.extend_from_slice(payload);
    }

    fn two_entry_bag() -> Vec<u8> {
        let mut data = header(250, 4351);
        entry(&mut data, 1, &7u32.to_le_bytes());
        entry(&mut data, 2, &1.5f64.to_le_bytes());
        data.extend(PROPERTY_TERMINATOR.to_le_bytes());
        data
    }

    #[test]
    fn test_two_entries_leave_cursor_past_terminator() {
        let registry = RegistryBuilder::new().build();
        let mut data = two_entry_bag();
        let bag_end = data.len();
        data.extend([0xAB; 3]);
        let mut stream = Stream::new(&data, &registry);

        let (mut count, mut scale) = (0, 0.0);
        stream
            .read_indexed_properties(|s, entry| {
                match entry.reference {
                    1 => count = s.read_u32("count")?,
                    2 => scale = s.read_f64("scale")?,
                    _ => return Ok(false),
                }
                Ok(true)
            })
            .unwrap();

        assert_eq!(count, 7);
        assert_eq!(scale, 1.5);
        assert_eq!(stream.position(), bag_end);
    }

    #[test]
    fn test_unhandled_reference_fails() {
        let registry = RegistryBuilder::new().build();
        let data = two_entry_bag();
        let mut stream = Stream::new(&data, &registry);

        let result = stream.read_indexed_properties(|s, entry| match entry.reference {
            1 => s.read_u32("count").map(|_| true),
            _ => Ok(false),
        });

        assert!(matches!(
            result,
            Err(Error::UnhandledProperty { reference: 2, offset: 28 })
        ));
    }

    #[test]
    fn test_short_handler_fails() {
        let registry = RegistryBuilder::new().build();
        let data = two_entry_bag();
        let mut stream = Stream::new(&data, &registry);

        let result = stream.read_indexed_properties(|s, _| s.read_u16("half").map(|_| true));

        assert!(matches!(
            result,
            Err(Error::PropertyLengthMismatch { reference: 1, expected: 4, actual: 2, .. })
        ));
    }

    #[test]
    fn test_unsized_entry_skips_length_check() {
        let registry = RegistryBuilder::new().build();
        let mut data = header(255, 255);
        data.extend(9u32.to_le_bytes());
        data.extend(UNSIZED_PROPERTY.to_le_bytes());
        data.extend([0; 16]);
        data.extend(PROPERTY_TERMINATOR.to_le_bytes());
        let mut stream = Stream::new(&data, &registry);

        let mut child_was_null = false;
        stream
            .read_indexed_properties(|s, entry| {
                assert!(entry.is_unsized());
                child_was_null = s.read_object("child")?.is_none();
                Ok(true)
            })
            .unwrap();

        assert!(child_was_null);
        assert!(stream.is_at_end());
    }

    #[test]
    fn test_header_mismatch_strict_vs_tolerant() {
        let registry = RegistryBuilder::new().build();
        let mut data = header(1, 255);
        data.extend(PROPERTY_TERMINATOR.to_le_bytes());

        let mut strict = Stream::new(&data, &registry).with_mode(Mode::Strict);
        assert!(matches!(
            strict.read_indexed_properties(|_, _| Ok(false)),
            Err(Error::UnexpectedValue { offset: 0, .. })
        ));

        let mut tolerant = Stream::new(&data, &registry);
        tolerant.read_indexed_properties(|_, _| Ok(false)).unwrap();
        assert!(tolerant.is_at_end());
    }

    #[test]
    fn test_sniff() {
        let registry = RegistryBuilder::new().build();

        let bag = header(34125, 34419);
        let stream = Stream::new(&bag, &registry);
        assert!(stream.sniff_indexed_properties());
        assert_eq!(stream.position(), 0);

        let other = header(250, 4351);
        assert!(!Stream::new(&other, &registry).sniff_indexed_properties());
        assert!(!Stream::new(&bag[..4], &registry).sniff_indexed_properties());

        let mut reserved = header(250, 255);
        reserved[4] = 1;
        assert!(!Stream::new(&reserved, &registry).sniff_indexed_properties());
    }
}
