//! CLSID type - the 128-bit type identifier that prefixes every persisted object.
//!
//! A CLSID is stored on the wire in the native GUID layout of the platform
//! that produced the files: the first three fields (`u32`, `u16`, `u16`) are
//! little-endian, the trailing eight bytes are stored verbatim.

use std::fmt;
use std::str::FromStr;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::Error;

/// Wire byte index for each byte of the canonical string, in string order.
///
/// Canonical `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` prints the wire bytes as
/// `3 2 1 0 - 5 4 - 7 6 - 8 9 - 10 11 12 13 14 15`.
const WIRE_ORDER: [usize; 16] = [3, 2, 1, 0, 5, 4, 7, 6, 8, 9, 10, 11, 12, 13, 14, 15];

/// Character offset of each byte's hex pair within the canonical string.
const TEXT_OFFSETS: [usize; 16] = [0, 2, 4, 6, 9, 11, 14, 16, 19, 21, 24, 26, 28, 30, 32, 34];

/// A 16-byte class identifier, held in wire order.
///
/// # Example
///
/// ```
/// use persist_common::Clsid;
///
/// let clsid = Clsid::from_wire_hex("03e6147992c8d0118bb6080009ee4e41").unwrap();
/// assert_eq!(clsid.to_string(), "7914e603-c892-11d0-8bb6-080009ee4e41");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct Clsid {
    bytes: [u8; 16],
}

impl Clsid {
    /// The all-zero id, which marks "no object" in a stream.
    pub const NULL: Self = Self { bytes: [0; 16] };

    /// Create a CLSID from its 16 wire bytes.
    #[inline]
    pub const fn from_wire(bytes: [u8; 16]) -> Self {
        Self { bytes }
    }

    /// Get the wire bytes.
    #[inline]
    pub const fn as_wire(&self) -> &[u8; 16] {
        &self.bytes
    }

    /// Check if this is the null id.
    #[inline]
    pub const fn is_null(&self) -> bool {
        let mut i = 0;
        while i < 16 {
            if self.bytes[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Parse a canonical string at compile time.
    ///
    /// Intended for schema tables; panics (a compile error in const context)
    /// on malformed input.
    pub const fn parse_const(s: &str) -> Self {
        match parse_canonical(s.as_bytes()) {
            Some(bytes) => Self { bytes },
            None => panic!("malformed CLSID literal"),
        }
    }

    /// Parse the 32-character hex dump of the wire bytes.
    pub fn from_wire_hex(hex: &str) -> Result<Self, Error> {
        let hex = hex.as_bytes();
        if hex.len() != 32 {
            return Err(Error::InvalidClsid(format!(
                "expected 32 hex characters, got {}",
                hex.len()
            )));
        }

        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = hex_pair(hex, i * 2)
                .ok_or_else(|| Error::InvalidClsid(format!("invalid hex at position {}", i * 2)))?;
        }
        Ok(Self { bytes })
    }

    /// Format the wire bytes as a 32-character lowercase hex dump.
    pub fn to_wire_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

const fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

const fn hex_pair(text: &[u8], at: usize) -> Option<u8> {
    match (hex_digit(text[at]), hex_digit(text[at + 1])) {
        (Some(hi), Some(lo)) => Some(hi << 4 | lo),
        _ => None,
    }
}

const fn parse_canonical(text: &[u8]) -> Option<[u8; 16]> {
    if text.len() != 36 || text[8] != b'-' || text[13] != b'-' || text[18] != b'-' || text[23] != b'-' {
        return None;
    }

    let mut bytes = [0u8; 16];
    let mut i = 0;
    while i < 16 {
        match hex_pair(text, TEXT_OFFSETS[i]) {
            Some(b) => bytes[WIRE_ORDER[i]] = b,
            None => return None,
        }
        i += 1;
    }
    Some(bytes)
}

impl fmt::Debug for Clsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Clsid({})", self)
    }
}

impl fmt::Display for Clsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &wire) in WIRE_ORDER.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                f.write_str("-")?;
            }
            write!(f, "{:02x}", self.bytes[wire])?;
        }
        Ok(())
    }
}

impl FromStr for Clsid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 36 {
            return Err(Error::InvalidClsid(format!(
                "expected 36 characters, got {}",
                s.len()
            )));
        }

        parse_canonical(s.as_bytes())
            .map(|bytes| Self { bytes })
            .ok_or_else(|| Error::InvalidClsid(s.to_string()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Clsid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Clsid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
