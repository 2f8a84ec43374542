//! Reader error type.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    #[error("unexpected end of input at offset {offset}, needed {needed} bytes")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("invalid `{0}` signature")]
    Signature(String),
    #[error("invalid UTF-8 string")]
    InvalidUtf8,
    #[error("varint overflows 64 bits")]
    VarintOverflow,
}
