//! Shared decode helpers for count fields and self-length-prefixed arrays.

use modelkey_buffers::Reader;

use crate::ModelError;

/// Converts a decoded i32 count field into a usable length.
pub(crate) fn count(n: i32) -> Result<usize, ModelError> {
    usize::try_from(n).map_err(|_| ModelError::Format(format!("negative count {n}")))
}

/// Many predictor blocks open with a float width field that must be 4.
pub(crate) fn expect_float_size(reader: &mut Reader<'_>) -> Result<(), ModelError> {
    let cb_float = reader.i32()?;
    if cb_float != 4 {
        return Err(ModelError::FloatSize(cb_float));
    }
    Ok(())
}

pub(crate) fn i32_array(reader: &mut Reader<'_>) -> Result<Vec<i32>, ModelError> {
    let n = count(reader.i32()?)?;
    Ok(reader.i32s(n)?)
}

pub(crate) fn u32_array(reader: &mut Reader<'_>) -> Result<Vec<u32>, ModelError> {
    let n = count(reader.i32()?)?;
    Ok(reader.u32s(n)?)
}

pub(crate) fn f32_array(reader: &mut Reader<'_>) -> Result<Vec<f32>, ModelError> {
    let n = count(reader.i32()?)?;
    Ok(reader.f32s(n)?)
}

pub(crate) fn f64_array(reader: &mut Reader<'_>) -> Result<Vec<f64>, ModelError> {
    let n = count(reader.i32()?)?;
    Ok(reader.f64s(n)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_rejects_negative() {
        assert_eq!(count(3).unwrap(), 3);
        assert!(count(-1).is_err());
    }

    #[test]
    fn test_expect_float_size() {
        let data = 4i32.to_le_bytes();
        let mut reader = Reader::new(&data);
        assert!(expect_float_size(&mut reader).is_ok());

        let data = 8i32.to_le_bytes();
        let mut reader = Reader::new(&data);
        assert!(matches!(
            expect_float_size(&mut reader),
            Err(ModelError::FloatSize(8))
        ));
    }

    #[test]
    fn test_self_prefixed_arrays() {
        let mut data = Vec::new();
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&7i32.to_le_bytes());
        data.extend_from_slice(&(-9i32).to_le_bytes());
        let mut reader = Reader::new(&data);
        assert_eq!(i32_array(&mut reader).unwrap(), vec![7, -9]);

        let mut data = Vec::new();
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&0.5f64.to_le_bytes());
        let mut reader = Reader::new(&data);
        assert_eq!(f64_array(&mut reader).unwrap(), vec![0.5]);
    }
}
