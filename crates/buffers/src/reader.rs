//! Binary buffer reader with cursor tracking.

use crate::ReadError;

/// A little-endian binary reader over a borrowed byte slice.
///
/// The reader maintains a cursor position and provides methods for reading
/// fixed-width integers, IEEE floats, ULEB128 varints, and raw byte spans.
/// The position can be read and set directly; offset-table formats seek to
/// absolute positions mid-decode.
///
/// # Example
///
/// ```
/// use modelkey_buffers::Reader;
///
/// let data = [0x01, 0x02, 0x03, 0x04];
/// let mut reader = Reader::new(&data);
///
/// assert_eq!(reader.u8().unwrap(), 0x01);
/// assert_eq!(reader.u16().unwrap(), 0x0302);
/// ```
pub struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader positioned at the start of the slice.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current cursor position in bytes from the start of the slice.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor to an absolute offset.
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Advances the cursor by `length` bytes without reading them.
    pub fn skip(&mut self, length: usize) {
        self.position += length;
    }

    /// Number of bytes between the cursor and the end of the slice.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ReadError> {
        let end = self
            .position
            .checked_add(n)
            .filter(|end| *end <= self.data.len());
        match end {
            Some(end) => {
                let span = &self.data[self.position..end];
                self.position = end;
                Ok(span)
            }
            None => Err(ReadError::UnexpectedEof {
                offset: self.position,
                needed: n,
            }),
        }
    }

    /// Reads a raw byte span and advances the cursor.
    pub fn bytes(&mut self, count: usize) -> Result<&'a [u8], ReadError> {
        self.take(count)
    }

    /// Attempts to consume a literal byte sequence.
    ///
    /// Returns `true` and advances past the literal on a match; restores the
    /// cursor and returns `false` on a mismatch or insufficient input.
    pub fn matches(&mut self, literal: &[u8]) -> bool {
        let start = self.position;
        match self.take(literal.len()) {
            Ok(span) if span == literal => true,
            _ => {
                self.position = start;
                false
            }
        }
    }

    /// Consumes a literal byte sequence, failing with [`ReadError::Signature`]
    /// naming the literal (NUL bytes stripped) if it is not present.
    pub fn expect(&mut self, literal: &[u8]) -> Result<(), ReadError> {
        if self.matches(literal) {
            return Ok(());
        }
        let name: String = literal
            .iter()
            .filter(|b| **b != 0)
            .map(|b| *b as char)
            .collect();
        Err(ReadError::Signature(name))
    }

    #[inline]
    pub fn u8(&mut self) -> Result<u8, ReadError> {
        Ok(self.take(1)?[0])
    }

    #[inline]
    pub fn i8(&mut self) -> Result<i8, ReadError> {
        Ok(self.take(1)?[0] as i8)
    }

    /// Reads one byte as a boolean (`byte != 0`).
    #[inline]
    pub fn boolean(&mut self) -> Result<bool, ReadError> {
        Ok(self.u8()? != 0)
    }

    #[inline]
    pub fn u16(&mut self) -> Result<u16, ReadError> {
        let span = self.take(2)?;
        Ok(u16::from_le_bytes([span[0], span[1]]))
    }

    #[inline]
    pub fn i16(&mut self) -> Result<i16, ReadError> {
        let span = self.take(2)?;
        Ok(i16::from_le_bytes([span[0], span[1]]))
    }

    #[inline]
    pub fn u32(&mut self) -> Result<u32, ReadError> {
        let span = self.take(4)?;
        Ok(u32::from_le_bytes([span[0], span[1], span[2], span[3]]))
    }

    #[inline]
    pub fn i32(&mut self) -> Result<i32, ReadError> {
        let span = self.take(4)?;
        Ok(i32::from_le_bytes([span[0], span[1], span[2], span[3]]))
    }

    /// Reads an unsigned 64-bit integer over its full range.
    #[inline]
    pub fn u64(&mut self) -> Result<u64, ReadError> {
        let span = self.take(8)?;
        Ok(u64::from_le_bytes([
            span[0], span[1], span[2], span[3], span[4], span[5], span[6], span[7],
        ]))
    }

    /// Reads a signed 64-bit integer as plain two's complement.
    #[inline]
    pub fn i64(&mut self) -> Result<i64, ReadError> {
        let span = self.take(8)?;
        Ok(i64::from_le_bytes([
            span[0], span[1], span[2], span[3], span[4], span[5], span[6], span[7],
        ]))
    }

    #[inline]
    pub fn f32(&mut self) -> Result<f32, ReadError> {
        let span = self.take(4)?;
        Ok(f32::from_le_bytes([span[0], span[1], span[2], span[3]]))
    }

    #[inline]
    pub fn f64(&mut self) -> Result<f64, ReadError> {
        let span = self.take(8)?;
        Ok(f64::from_le_bytes([
            span[0], span[1], span[2], span[3], span[4], span[5], span[6], span[7],
        ]))
    }

    /// Reads a ULEB128-encoded unsigned integer.
    pub fn leb128(&mut self) -> Result<u64, ReadError> {
        let mut result: u64 = 0;
        let mut shift: u32 = 0;
        loop {
            let byte = self.u8()?;
            if shift == 63 && byte > 1 || shift > 63 {
                return Err(ReadError::VarintOverflow);
            }
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
        }
    }

    /// Reads a ULEB128 length prefix followed by that many UTF-8 bytes.
    pub fn string(&mut self) -> Result<String, ReadError> {
        let size = self.leb128()? as usize;
        let span = self.take(size)?;
        String::from_utf8(span.to_vec()).map_err(|_| ReadError::InvalidUtf8)
    }

    pub fn booleans(&mut self, count: usize) -> Result<Vec<bool>, ReadError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.boolean()?);
        }
        Ok(values)
    }

    pub fn u16s(&mut self, count: usize) -> Result<Vec<u16>, ReadError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.u16()?);
        }
        Ok(values)
    }

    pub fn i32s(&mut self, count: usize) -> Result<Vec<i32>, ReadError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.i32()?);
        }
        Ok(values)
    }

    pub fn u32s(&mut self, count: usize) -> Result<Vec<u32>, ReadError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.u32()?);
        }
        Ok(values)
    }

    pub fn f32s(&mut self, count: usize) -> Result<Vec<f32>, ReadError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.f32()?);
        }
        Ok(values)
    }

    pub fn f64s(&mut self, count: usize) -> Result<Vec<f64>, ReadError> {
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.f64()?);
        }
        Ok(values)
    }
}
