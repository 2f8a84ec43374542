//! Time-series anomaly detectors over i.i.d. inputs.

use modelkey_buffers::Reader;

use crate::header::ModelHeader;
use crate::util::count;
use crate::{Codec, ModelError};

/// Fixed-size queue persisted as capacity, live count, then the live items.
#[derive(Debug, Clone, PartialEq)]
pub struct RingBuffer<T> {
    pub capacity: i32,
    pub items: Vec<T>,
}

impl<T> RingBuffer<T> {
    fn decode<'a>(
        reader: &mut Reader<'a>,
        read: impl Fn(&mut Reader<'a>) -> Result<T, modelkey_buffers::ReadError>,
    ) -> Result<Self, ModelError> {
        let capacity = reader.i32()?;
        let n = count(reader.i32()?)?;
        let mut items = Vec::with_capacity(n);
        for _ in 0..n {
            items.push(read(reader)?);
        }
        Ok(Self { capacity, items })
    }
}

/// Shared base of windowed sequential transforms: window sizes, column
/// bindings, and the input column's type codec.
#[derive(Debug, Clone, PartialEq)]
pub struct SequentialTransformer {
    pub window_size: i32,
    pub initial_window_size: i32,
    pub input: String,
    pub output: String,
    pub confidence_lower_bound_column: String,
    pub confidence_upper_bound_column: String,
    pub kind: Codec,
}

impl SequentialTransformer {
    fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let window_size = ctx.reader.i32()?;
        let initial_window_size = ctx.reader.i32()?;
        let input = ctx.string()?;
        let output = ctx.string()?;
        // Bound column names are inline strings, not pool ids.
        let confidence_lower_bound_column = ctx.reader.string()?;
        let confidence_upper_bound_column = ctx.reader.string()?;
        let kind = Codec::decode(&mut ctx.reader)?;
        Ok(Self {
            window_size,
            initial_window_size,
            input,
            output,
            confidence_lower_bound_column,
            confidence_upper_bound_column,
            kind,
        })
    }
}

/// Martingale state carried between scored rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AnomalyDetectionState {
    pub log_martingale_update_buffer: RingBuffer<f64>,
    pub raw_score_buffer: RingBuffer<f64>,
    pub log_martingale_value: f64,
    pub sum_squared_distance: f64,
    pub martingale_alert_counter: i32,
}

impl AnomalyDetectionState {
    fn decode(reader: &mut Reader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            log_martingale_update_buffer: RingBuffer::decode(reader, |r| r.f64())?,
            raw_score_buffer: RingBuffer::decode(reader, |r| r.f64())?,
            log_martingale_value: reader.f64()?,
            sum_squared_distance: reader.f64()?,
            martingale_alert_counter: reader.i32()?,
        })
    }
}

/// Spike and change-point detectors share this serialized form; the loader
/// signature distinguishes them through [`crate::Record::kind`].
#[derive(Debug, Clone, PartialEq)]
pub struct IidAnomalyDetector {
    pub transform: SequentialTransformer,
    pub martingale: u8,
    pub threshold_score: u8,
    pub side: u8,
    pub power_martingale_epsilon: f64,
    pub alert_threshold: f64,
    pub state: AnomalyDetectionState,
    pub windowed_buffer: RingBuffer<f32>,
    pub initial_windowed_buffer: RingBuffer<f32>,
}

impl IidAnomalyDetector {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let transform = SequentialTransformer::decode(ctx)?;
        let martingale = ctx.reader.u8()?;
        let threshold_score = ctx.reader.u8()?;
        let side = ctx.reader.u8()?;
        let power_martingale_epsilon = ctx.reader.f64()?;
        let alert_threshold = ctx.reader.f64()?;
        let state = AnomalyDetectionState::decode(&mut ctx.reader)?;
        let windowed_buffer = RingBuffer::decode(&mut ctx.reader, |r| r.f32())?;
        let initial_windowed_buffer = RingBuffer::decode(&mut ctx.reader, |r| r.f32())?;
        Ok(Self {
            transform,
            martingale,
            threshold_score,
            side,
            power_martingale_epsilon,
            alert_threshold,
            state,
            windowed_buffer,
            initial_windowed_buffer,
        })
    }
}
