//! The IDV columnar-data schema block.
//!
//! Binary loaders persist their training schema as an IDV file: open magic,
//! two version quads, a table-of-contents offset, a tail magic, then one
//! descriptor per column.

use std::fmt;

use modelkey_buffers::Reader;

use crate::util::count;
use crate::{Codec, ModelError};

const OPEN_MAGIC: &[u8] = b"CML\0DVB\0";
const CLOSE_MAGIC: &[u8] = b"\0BVD\0LMC";

/// A 4x16-bit IDV format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaVersion {
    pub major: i16,
    pub minor: i16,
    pub build: i16,
    pub revision: i16,
}

impl SchemaVersion {
    pub(crate) fn decode(reader: &mut Reader<'_>) -> Result<SchemaVersion, ModelError> {
        Ok(SchemaVersion {
            major: reader.i16()?,
            minor: reader.i16()?,
            build: reader.i16()?,
            revision: reader.i16()?,
        })
    }

    /// Packed comparison value, one byte per component.
    pub fn value(&self) -> i32 {
        (i32::from(self.major) << 24)
            | (i32::from(self.minor) << 16)
            | (i32::from(self.build) << 8)
            | i32::from(self.revision)
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}",
            self.major, self.minor, self.build, self.revision
        )
    }
}

/// One column descriptor from the schema's table of contents.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaColumn {
    pub name: String,
    pub kind: Codec,
    /// 0 = none, 1 = deflate. Preserved but never expanded here.
    pub compression: u8,
    pub rows_per_block: u64,
    pub lookup_offset: i64,
    pub metadata_toc_offset: i64,
}

/// Decoded column schema of an IDV block.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub version: SchemaVersion,
    pub row_count: i64,
    pub columns: Vec<SchemaColumn>,
}

impl Schema {
    pub fn decode(reader: &mut Reader<'_>) -> Result<Schema, ModelError> {
        reader.expect(OPEN_MAGIC)?;
        let version = SchemaVersion::decode(reader)?;
        let compatible = SchemaVersion::decode(reader)?;
        if compatible.value() > version.value() {
            return Err(ModelError::Format(format!(
                "compatibility version `{compatible}` cannot be greater than file version `{version}`"
            )));
        }
        let table_of_contents_offset = reader.u64()?;
        let tail_offset = reader.i64()?;
        let row_count = reader.i64()?;
        let column_count = count(reader.i32()?)?;
        reader.set_position(tail_offset as usize);
        reader.expect(CLOSE_MAGIC)?;
        reader.set_position(table_of_contents_offset as usize);
        let mut columns = Vec::with_capacity(column_count);
        for _ in 0..column_count {
            columns.push(SchemaColumn {
                name: reader.string()?,
                kind: Codec::decode(reader)?,
                compression: reader.u8()?,
                rows_per_block: reader.leb128()?,
                lookup_offset: reader.i64()?,
                metadata_toc_offset: reader.i64()?,
            });
        }
        Ok(Schema {
            version,
            row_count,
            columns,
        })
    }
}
