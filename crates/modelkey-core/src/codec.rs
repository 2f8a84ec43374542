//! Self-describing column-type descriptors.
//!
//! A codec is serialized as its name, a ULEB128 byte length, and the type's
//! own fields inside exactly that many bytes. Unrecognized trailing bytes
//! inside the declared length belong to forward-compatible extensions and
//! are discarded; the outer cursor always lands exactly past the declared
//! length.

use modelkey_buffers::Reader;

use crate::util::count;
use crate::ModelError;

/// Value-type descriptor for a stored column.
#[derive(Debug, Clone, PartialEq)]
pub enum Codec {
    Boolean,
    Single,
    Double,
    UInt32,
    TextSpan,
    VBuffer { item: Box<Codec>, dims: Vec<i32> },
    Key2 { item: Box<Codec>, count: u64 },
}

impl Codec {
    pub fn decode(reader: &mut Reader<'_>) -> Result<Codec, ModelError> {
        let name = reader.string()?;
        let size = reader.leb128()? as usize;
        let data = reader.bytes(size)?;
        let mut body = Reader::new(data);
        match name.as_str() {
            "Boolean" => Ok(Codec::Boolean),
            "Single" => Ok(Codec::Single),
            "Double" => Ok(Codec::Double),
            "UInt32" => Ok(Codec::UInt32),
            "TextSpan" => Ok(Codec::TextSpan),
            "VBuffer" => {
                let item = Box::new(Codec::decode(&mut body)?);
                let n = count(body.i32()?)?;
                let dims = body.i32s(n)?;
                Ok(Codec::VBuffer { item, dims })
            }
            "Key2" => {
                let item = Box::new(Codec::decode(&mut body)?);
                let count = body.u64()?;
                Ok(Codec::Key2 { item, count })
            }
            _ => Err(ModelError::UnknownCodec(name)),
        }
    }

    /// The codec's tag name as written in the format.
    pub fn name(&self) -> &'static str {
        match self {
            Codec::Boolean => "Boolean",
            Codec::Single => "Single",
            Codec::Double => "Double",
            Codec::UInt32 => "UInt32",
            Codec::TextSpan => "TextSpan",
            Codec::VBuffer { .. } => "VBuffer",
            Codec::Key2 { .. } => "Key2",
        }
    }

    /// Decodes `count` values of this codec's scalar type from `reader`.
    ///
    /// Only `Single` columns occur in value position in the sample corpus;
    /// every other tag is an unknown read operation.
    pub fn read_values(&self, reader: &mut Reader<'_>, count: usize) -> Result<Vec<f32>, ModelError> {
        match self {
            Codec::Single => Ok(reader.f32s(count)?),
            _ => Err(ModelError::UnknownCodec(self.name().to_owned())),
        }
    }
}
