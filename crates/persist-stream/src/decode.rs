//! Object graph decoding.

use persist_common::Clsid;
use tracing::{debug, warn};

use crate::{Error, Instance, Result, Stream, Support, Versions};

/// Outcome of reading an object whose byte length is known.
#[derive(Debug)]
pub enum SizedObject {
    /// The object decoded and ended where expected (or was repositioned).
    Decoded(Option<Instance>),
    /// The object could not be decoded and its span was skipped.
    Skipped(Skipped),
}

impl SizedObject {
    /// The decoded instance, or the best-effort instance of a skipped
    /// licensed extension.
    pub fn into_instance(self) -> Option<Instance> {
        match self {
            SizedObject::Decoded(instance) => instance,
            SizedObject::Skipped(skipped) => skipped.into_best_effort(),
        }
    }

    /// Check if the span was skipped.
    pub fn is_skipped(&self) -> bool {
        matches!(self, SizedObject::Skipped(_))
    }
}

/// A span that was skipped instead of decoded.
#[derive(Debug)]
pub struct Skipped {
    /// Type id at the start of the span, when there were 16 bytes to read.
    pub clsid: Option<Clsid>,
    pub offset: usize,
    pub size: usize,
    pub reason: Error,
}

impl Skipped {
    /// The placeholder or partial parent, for licensed extensions.
    pub fn best_effort(&self) -> Option<&Instance> {
        match &self.reason {
            Error::LicensedExtension(ext) => Some(ext.best_effort()),
            _ => None,
        }
    }

    /// Take the placeholder or partial parent, for licensed extensions.
    pub fn into_best_effort(self) -> Option<Instance> {
        match self.reason {
            Error::LicensedExtension(ext) => Some(ext.into_best_effort()),
            _ => None,
        }
    }
}

/// Fill in the stream offset of a resolution error raised by the registry.
fn at_offset(error: Error, at: usize) -> Error {
    match error {
        Error::UnknownTypeId { clsid, offset: None } => Error::UnknownTypeId {
            clsid,
            offset: Some(at),
        },
        Error::LicensedExtension(mut ext) => {
            ext.offset.get_or_insert(at);
            ext.placeholder.offset.get_or_insert(at);
            Error::LicensedExtension(ext)
        }
        other => other,
    }
}

impl<'a> Stream<'a> {
    /// Read a type id and the object it introduces.
    ///
    /// Returns `Ok(None)` for the null id.
    pub fn read_object(&mut self, label: &str) -> Result<Option<Instance>> {
        self.read_object_inner(label, false)
    }

    /// Read an object that occupies exactly `size` bytes.
    ///
    /// Objects that cannot be resolved or read are skipped and the cursor
    /// is left at the end of the span. Structural errors still fail.
    pub fn read_object_sized(&mut self, label: &str, size: usize) -> Result<SizedObject> {
        let start = self.position();
        if size > self.remaining() {
            return Err(persist_common::Error::TruncatedField {
                offset: start,
                needed: size,
                available: self.remaining(),
            }
            .into());
        }
        let end = start + size;
        let clsid = self
            .reader()
            .peek_bytes(16)
            .ok()
            .and_then(|bytes| <[u8; 16]>::try_from(bytes).ok())
            .map(Clsid::from_wire);

        match self.read_object_inner(label, true) {
            Ok(decoded) => {
                let actual = self.position().saturating_sub(start);
                if actual != size {
                    if self.mode().is_strict() {
                        return Err(Error::LengthMismatch {
                            label: label.to_string(),
                            offset: start,
                            expected: size,
                            actual,
                        });
                    }
                    warn!(offset = start, "{label}: read {actual} of {size} bytes, repositioning");
                    self.seek(end);
                }
                Ok(SizedObject::Decoded(decoded))
            }
            Err(reason) if reason.is_recoverable() => {
                warn!(offset = start, "skipping {size} bytes of {label}: {reason}");
                self.seek(end);
                Ok(SizedObject::Skipped(Skipped {
                    clsid,
                    offset: start,
                    size,
                    reason,
                }))
            }
            Err(e) => Err(e),
        }
    }

    fn read_object_inner(&mut self, label: &str, sized: bool) -> Result<Option<Instance>> {
        let offset = self.position();
        let clsid = self.read_raw_clsid(label)?;
        let mut instance = match self.registry().create(clsid) {
            Ok(Some(instance)) => instance,
            Ok(None) => return Ok(None),
            Err(e) => return Err(at_offset(e, offset)),
        };
        instance.offset = Some(offset);

        let schema = instance.schema();
        // Partial readers cannot promise to consume a declared span exactly.
        let unreadable = match schema.support {
            Support::Full => false,
            Support::Partial => sized,
            Support::Unimplemented => true,
        };
        if unreadable {
            return Err(Error::Unimplemented {
                schema: schema.name,
                offset: Some(offset),
            });
        }

        let version = match (schema.support, schema.versions) {
            (Support::Partial, _) | (_, Versions::Exempt) => 1,
            (_, Versions::Exact(supported)) => {
                let version_offset = self.position();
                let version = self.read_u16("version")?;
                if !supported.contains(&version) {
                    return Err(Error::UnsupportedVersion {
                        schema: schema.name,
                        version,
                        supported,
                        offset: version_offset,
                    });
                }
                version
            }
        };
        instance.version = version;

        debug!(offset, depth = self.depth, "{label}: {} version {version}", schema.name);
        if self.depth >= self.max_depth() {
            return Err(Error::DepthExceeded {
                offset,
                depth: self.depth,
            });
        }
        self.depth += 1;
        let result = instance.object.read(self, version);
        self.depth -= 1;

        match result {
            Ok(()) => Ok(Some(instance)),
            Err(Error::LicensedExtension(mut ext)) => {
                debug!(offset, "{} left partially read by {}", schema.name, ext.clsid);
                ext.partial = Some(instance);
                Err(Error::LicensedExtension(ext))
            }
            Err(e) => Err(e),
        }
    }
}
