//! Error types for object stream decoding.

use persist_common::Clsid;
use thiserror::Error;

use crate::Instance;

/// Errors that can occur while decoding a persistent stream.
#[derive(Debug, Error)]
pub enum Error {
    /// Structural error from the primitive reader (truncation, bad terminator).
    #[error("{0}")]
    Common(#[from] persist_common::Error),

    /// A color that has no RGB equivalent.
    #[error("{0}")]
    Color(#[from] persist_color::Error),

    /// No schema is registered for the type id.
    #[error("unknown type id {clsid}{}", at(.offset))]
    UnknownTypeId { clsid: Clsid, offset: Option<usize> },

    /// A known third-party extension whose layout cannot be read.
    #[error("{0}")]
    LicensedExtension(Box<LicensedExtension>),

    /// The persisted version is not one the schema understands.
    #[error("cannot read {schema} version {version} at {offset:#x}, only support version(s) {supported:?}")]
    UnsupportedVersion {
        schema: &'static str,
        version: u16,
        supported: &'static [u16],
        offset: usize,
    },

    /// A variant type tag outside the supported set.
    #[error("unsupported variant type {tag} at {offset:#x}")]
    UnsupportedVariant { tag: u32, offset: usize },

    /// A value that did not match its expected set (strict mode only).
    #[error("unexpected value for {label} at {offset:#x}: got {actual}, expected {expected}")]
    UnexpectedValue {
        label: String,
        offset: usize,
        expected: String,
        actual: String,
    },

    /// A value tree names a schema the registry does not know.
    #[error("unknown schema name: {0}")]
    UnknownSchemaName(String),

    /// The schema is known but reading it is not implemented.
    #[error("reading {schema} objects is not implemented{}", at(.offset))]
    Unimplemented { schema: &'static str, offset: Option<usize> },

    /// An indexed property reference with no handler.
    #[error("unhandled property reference {reference} at {offset:#x}")]
    UnhandledProperty { reference: u32, offset: usize },

    /// A property handler consumed a different number of bytes than declared.
    #[error("property {reference} at {offset:#x} declared {expected} bytes but {actual} were read")]
    PropertyLengthMismatch {
        reference: u32,
        offset: usize,
        expected: u32,
        actual: usize,
    },

    /// A sized object did not end where its length prefix said it would.
    #[error("{label} at {offset:#x} declared {expected} bytes but {actual} were read")]
    LengthMismatch {
        label: String,
        offset: usize,
        expected: usize,
        actual: usize,
    },

    /// Objects nested deeper than the stream allows.
    #[error("object at {offset:#x} nested {depth} levels deep, beyond the limit")]
    DepthExceeded { offset: usize, depth: usize },

    /// A date variant outside the representable calendar range.
    #[error("invalid date value {days} at {offset:#x}")]
    InvalidDate { days: f64, offset: usize },

    /// A value tree field that is missing or has the wrong type.
    #[error("invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },
}

fn at(offset: &Option<usize>) -> String {
    offset.map(|o| format!(" at {o:#x}")).unwrap_or_default()
}

impl Error {
    /// Whether a caller that knows the object's byte length can skip it and
    /// continue with the rest of the stream.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnknownTypeId { .. }
                | Error::UnsupportedVersion { .. }
                | Error::Unimplemented { .. }
                | Error::LicensedExtension(_)
        )
    }

    /// Stream offset the error was raised at, when known.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::Common(e) => match e {
                persist_common::Error::TruncatedField { offset, .. }
                | persist_common::Error::InvalidTerminator { offset, .. }
                | persist_common::Error::InvalidLength { offset, .. }
                | persist_common::Error::Utf16 { offset } => Some(*offset),
                persist_common::Error::InvalidClsid(_) => None,
            },
            Error::UnknownTypeId { offset, .. } | Error::Unimplemented { offset, .. } => *offset,
            Error::LicensedExtension(ext) => ext.offset,
            Error::UnsupportedVersion { offset, .. }
            | Error::UnsupportedVariant { offset, .. }
            | Error::UnexpectedValue { offset, .. }
            | Error::UnhandledProperty { offset, .. }
            | Error::PropertyLengthMismatch { offset, .. }
            | Error::LengthMismatch { offset, .. }
            | Error::DepthExceeded { offset, .. }
            | Error::InvalidDate { offset, .. } => Some(*offset),
            Error::Color(_) | Error::UnknownSchemaName(_) | Error::InvalidField { .. } => None,
        }
    }

    /// Shorthand for [`Error::InvalidField`].
    pub fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        Error::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// A licensed or custom extension object that cannot be decoded.
///
/// Carries a [`Placeholder`](crate::Placeholder) instance recording that an
/// object of this type existed, and, when the extension was met while
/// reading a parent, the parent as far as it could be read.
#[derive(Debug, Error)]
#[error("licensed extension {clsid} cannot be read{}", at(.offset))]
pub struct LicensedExtension {
    pub clsid: Clsid,
    pub offset: Option<usize>,
    pub placeholder: Instance,
    pub partial: Option<Instance>,
}

impl LicensedExtension {
    /// The most complete value available: the partial parent if any,
    /// otherwise the placeholder.
    pub fn best_effort(&self) -> &Instance {
        self.partial.as_ref().unwrap_or(&self.placeholder)
    }

    /// Take ownership of the most complete value available.
    pub fn into_best_effort(self) -> Instance {
        self.partial.unwrap_or(self.placeholder)
    }
}

/// Result type for stream operations.
pub type Result<T> = std::result::Result<T, Error>;
