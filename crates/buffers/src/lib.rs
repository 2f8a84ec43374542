//! Little-endian binary cursor used by the modelkey decoder.
//!
//! The ML.NET archive format is read strictly sequentially with occasional
//! absolute seeks into offset tables, so the reader exposes its position
//! directly instead of hiding it behind an iterator.

mod error;
mod reader;

pub use error::ReadError;
pub use reader::Reader;
