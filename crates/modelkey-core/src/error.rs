//! Decode error taxonomy.
//!
//! A decode failure aborts the whole model: byte offsets after a misread are
//! meaningless, so there is no partial-result recovery.

use modelkey_buffers::ReadError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    /// Malformed container: bad magic, bad offsets, version constraint
    /// violations, out-of-range string ids.
    #[error("{0}")]
    Format(String),
    /// The loader signature is not in the component catalog.
    #[error("unknown loader signature `{0}`")]
    UnknownLoaderSignature(String),
    /// A recognized but deliberately unsupported case (affine regression
    /// trees, legacy multi-column layouts, unexpected item kinds).
    #[error("unsupported {0}")]
    Unsupported(String),
    /// A column-type codec tag outside the recognized set.
    #[error("unknown codec `{0}`")]
    UnknownCodec(String),
    /// The leading `cbFloat` field of a parameter block was not 4.
    #[error("invalid float size {0}, expected 4")]
    FloatSize(i32),
    #[error(transparent)]
    Read(#[from] ReadError),
}
