//! Predictor parameter blocks, calibration, and prediction-transformer
//! wrappers.

use crate::header::ModelHeader;
use crate::record::{Record, RecordBody};
use crate::schema::Schema;
use crate::util::{count, expect_float_size, f32_array, i32_array};
use crate::ModelError;

/// Sparse linear model: bias plus index/weight pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearParameters {
    pub bias: f32,
    pub indices: Vec<i32>,
    pub weights: Vec<f32>,
    pub statistics: Option<Box<Record>>,
}

impl LinearParameters {
    /// Binary classifiers persist an optional `ModelStats` child from
    /// 0x00020002 on; regression variants never do.
    pub(crate) fn decode(
        ctx: &mut ModelHeader<'_>,
        read_statistics: bool,
    ) -> Result<Self, ModelError> {
        expect_float_size(&mut ctx.reader)?;
        let bias = ctx.reader.f32()?;
        let _weight_length = ctx.reader.i32()?;
        let indices = i32_array(&mut ctx.reader)?;
        let weights = f32_array(&mut ctx.reader)?;
        let statistics = if read_statistics && ctx.model_version_written > 0x00020001 {
            ctx.open("ModelStats")?.map(Box::new)
        } else {
            None
        };
        Ok(Self {
            bias,
            indices,
            weights,
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MulticlassLinearParameters {
    pub biases: Vec<f32>,
    /// Per-class weight vectors; parallel to `indices` when sparse.
    pub weights: Vec<Vec<f32>>,
    pub indices: Option<Vec<Vec<i32>>>,
    pub label_names: Option<Vec<String>>,
    pub statistics: Option<Box<Record>>,
}

impl MulticlassLinearParameters {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        expect_float_size(&mut ctx.reader)?;
        let num_features = count(ctx.reader.i32()?)?;
        let num_classes = count(ctx.reader.i32()?)?;
        let biases = ctx.reader.f32s(num_classes)?;
        let num_starts = ctx.reader.i32()?;
        let (weights, indices) = if num_starts == 0 {
            let _num_indices = ctx.reader.i32()?;
            let _num_weights = ctx.reader.i32()?;
            let mut weights = Vec::with_capacity(num_classes);
            for _ in 0..num_classes {
                weights.push(ctx.reader.f32s(num_features)?);
            }
            (weights, None)
        } else {
            let starts = i32_array(&mut ctx.reader)?;
            if starts.len() < num_classes + 1 {
                return Err(ModelError::Format(format!(
                    "weight start table has {} entries, expected {}",
                    starts.len(),
                    num_classes + 1
                )));
            }
            let class_len = |i: usize| {
                let len = starts[i + 1].checked_sub(starts[i]).ok_or_else(|| {
                    ModelError::Format("weight start table overflows".to_owned())
                })?;
                count(len)
            };
            let _num_indices = ctx.reader.i32()?;
            let mut indices = Vec::with_capacity(num_classes);
            for i in 0..num_classes {
                indices.push(ctx.reader.i32s(class_len(i)?)?);
            }
            let _num_values = ctx.reader.i32()?;
            let mut weights = Vec::with_capacity(num_classes);
            for i in 0..num_classes {
                weights.push(ctx.reader.f32s(class_len(i)?)?);
            }
            (weights, Some(indices))
        };
        let label_names = match ctx.open_binary("LabelNames") {
            Some(mut reader) => {
                let mut names = Vec::with_capacity(num_classes);
                for _ in 0..num_classes {
                    let id = reader.i32()?;
                    names.push(ctx.lookup_string(id)?);
                }
                Some(names)
            }
            None => None,
        };
        let statistics = ctx.open("ModelStats")?.map(Box::new);
        Ok(Self {
            biases,
            weights,
            indices,
            label_names,
            statistics,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Centroid {
    /// Present only when the centroid is sparse.
    pub indices: Option<Vec<i32>>,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct KMeansParameters {
    pub k: i32,
    pub dimensionality: i32,
    pub centroids: Vec<Centroid>,
}

impl KMeansParameters {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        expect_float_size(&mut ctx.reader)?;
        let k = ctx.reader.i32()?;
        let dimensionality = ctx.reader.i32()?;
        let mut centroids = Vec::with_capacity(count(k)?);
        for _ in 0..count(k)? {
            let n = if ctx.model_version_written >= 0x00010002 {
                ctx.reader.i32()?
            } else {
                dimensionality
            };
            let indices = if n < dimensionality {
                Some(ctx.reader.i32s(count(n)?)?)
            } else {
                None
            };
            let values = ctx.reader.f32s(count(n)?)?;
            centroids.push(Centroid { indices, values });
        }
        Ok(Self {
            k,
            dimensionality,
            centroids,
        })
    }
}

/// PCA-based anomaly model: mean vector (when centered) plus the top-rank
/// eigenvectors.
#[derive(Debug, Clone, PartialEq)]
pub struct PcaParameters {
    pub dimension: i32,
    pub rank: i32,
    pub mean: Vec<f32>,
    pub eigenvectors: Vec<Vec<f32>>,
}

impl PcaParameters {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        expect_float_size(&mut ctx.reader)?;
        let dimension = ctx.reader.i32()?;
        let rank = ctx.reader.i32()?;
        let center = ctx.reader.boolean()?;
        let mean = if center {
            ctx.reader.f32s(count(dimension)?)?
        } else {
            Vec::new()
        };
        let mut eigenvectors = Vec::with_capacity(count(rank)?);
        for _ in 0..count(rank)? {
            eigenvectors.push(ctx.reader.f32s(count(dimension)?)?);
        }
        Ok(Self {
            dimension,
            rank,
            mean,
            eigenvectors,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FactorizationMachineParameters {
    pub norm: bool,
    pub field_count: i32,
    pub feature_count: i32,
    pub latent_dimension: i32,
    pub linear_weights: Vec<f32>,
    pub latent_weights: Vec<f32>,
}

impl FactorizationMachineParameters {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            norm: ctx.reader.boolean()?,
            field_count: ctx.reader.i32()?,
            feature_count: ctx.reader.i32()?,
            latent_dimension: ctx.reader.i32()?,
            linear_weights: f32_array(&mut ctx.reader)?,
            latent_weights: f32_array(&mut ctx.reader)?,
        })
    }
}

/// Sigmoid output calibration: `1 / (1 + exp(a * score + b))`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlattCalibrator {
    pub param_a: f64,
    pub param_b: f64,
}

impl PlattCalibrator {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            param_a: ctx.reader.f64()?,
            param_b: ctx.reader.f64()?,
        })
    }
}

/// A predictor paired with its output calibrator, both as sub-models.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibrated {
    pub predictor: Option<Box<Record>>,
    pub calibrator: Option<Box<Record>>,
}

impl Calibrated {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            predictor: ctx.open("Predictor")?.map(Box::new),
            calibrator: ctx.open("Calibrator")?.map(Box::new),
        })
    }
}

/// Wraps a trained model with the column bindings it scores through.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionTransformer {
    pub model: Box<Record>,
    pub train_schema: Option<Schema>,
    pub feature_column: Option<String>,
    pub field_columns: Vec<String>,
    pub threshold: Option<f32>,
    pub threshold_column: Option<String>,
    pub train_label_column: Option<String>,
}

impl PredictionTransformer {
    /// Type tag of the wrapped model, without reaching through the box.
    pub fn model_kind(&self) -> &str {
        &self.model.kind
    }

    fn base(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let model = ctx
            .open("Model")?
            .ok_or_else(|| ModelError::Format("missing `Model` entry".to_owned()))?;
        let train_schema = match ctx.open_binary("TrainSchema") {
            Some(mut reader) => Some(Schema::decode(&mut reader)?),
            None => None,
        };
        Ok(Self {
            model: Box::new(model),
            train_schema,
            feature_column: None,
            field_columns: Vec::new(),
            threshold: None,
            threshold_column: None,
            train_label_column: None,
        })
    }

    fn single_feature(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let mut this = Self::base(ctx)?;
        this.feature_column = ctx.opt_string()?;
        Ok(this)
    }

    /// Clustering and regression wrappers carry no fields of their own.
    pub(crate) fn decode_plain(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        Self::single_feature(ctx)
    }

    /// Binary classification and anomaly wrappers add a decision threshold.
    pub(crate) fn decode_thresholded(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let mut this = Self::single_feature(ctx)?;
        this.threshold = Some(ctx.reader.f32()?);
        this.threshold_column = Some(ctx.string()?);
        Ok(this)
    }

    pub(crate) fn decode_multiclass(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let mut this = Self::single_feature(ctx)?;
        this.train_label_column = ctx.opt_string()?;
        Ok(this)
    }

    /// The factorization-machine wrapper names one input column per field;
    /// the field count lives in the wrapped parameter block.
    pub(crate) fn decode_factorization_machine(
        ctx: &mut ModelHeader<'_>,
    ) -> Result<Self, ModelError> {
        let mut this = Self::base(ctx)?;
        let field_count = match &this.model.body {
            RecordBody::FactorizationMachineParameters(parameters) => {
                count(parameters.field_count)?
            }
            _ => {
                return Err(ModelError::Format(
                    "unexpected `Model` child type".to_owned(),
                ));
            }
        };
        let mut field_columns = Vec::with_capacity(field_count);
        for _ in 0..field_count {
            field_columns.push(ctx.string()?);
        }
        this.field_columns = field_columns;
        this.threshold = Some(ctx.reader.f32()?);
        this.threshold_column = Some(ctx.string()?);
        Ok(this)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::header::build_model_key;

    fn decode_header<'a>(entries: &'a [Entry], data: &'a [u8]) -> ModelHeader<'a> {
        ModelHeader::parse(entries, String::new(), data).unwrap()
    }

    #[test]
    fn test_linear_parameters() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes());
        payload.extend_from_slice(&1.5f32.to_le_bytes());
        payload.extend_from_slice(&3i32.to_le_bytes()); // declared weight length
        payload.extend_from_slice(&2i32.to_le_bytes());
        payload.extend_from_slice(&0i32.to_le_bytes());
        payload.extend_from_slice(&2i32.to_le_bytes());
        payload.extend_from_slice(&2i32.to_le_bytes());
        payload.extend_from_slice(&0.5f32.to_le_bytes());
        payload.extend_from_slice(&(-0.25f32).to_le_bytes());
        let data = build_model_key("Linear2CExec", 0x00020001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = decode_header(&entries, &data);
        let model = LinearParameters::decode(&mut ctx, true).unwrap();
        assert_eq!(model.bias, 1.5);
        assert_eq!(model.indices, vec![0, 2]);
        assert_eq!(model.weights, vec![0.5, -0.25]);
        assert_eq!(model.statistics, None);
    }

    #[test]
    fn test_linear_parameters_bad_float_size() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&8i32.to_le_bytes());
        let data = build_model_key("Linear2CExec", 0x00010001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = decode_header(&entries, &data);
        assert!(matches!(
            LinearParameters::decode(&mut ctx, false),
            Err(ModelError::FloatSize(8))
        ));
    }

    #[test]
    fn test_multiclass_sparse_weights() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes()); // cbFloat
        payload.extend_from_slice(&4i32.to_le_bytes()); // features
        payload.extend_from_slice(&2i32.to_le_bytes()); // classes
        payload.extend_from_slice(&0.1f32.to_le_bytes());
        payload.extend_from_slice(&0.2f32.to_le_bytes());
        payload.extend_from_slice(&3i32.to_le_bytes()); // numStarts != 0: sparse
        payload.extend_from_slice(&3i32.to_le_bytes());
        for start in [0i32, 2, 3] {
            payload.extend_from_slice(&start.to_le_bytes());
        }
        payload.extend_from_slice(&3i32.to_le_bytes()); // total indices
        for index in [0i32, 3, 1] {
            payload.extend_from_slice(&index.to_le_bytes());
        }
        payload.extend_from_slice(&3i32.to_le_bytes()); // total values
        for value in [1.0f32, 2.0, 3.0] {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        let data = build_model_key("MulticlassLinear", 0x00010001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = decode_header(&entries, &data);
        let model = MulticlassLinearParameters::decode(&mut ctx).unwrap();
        assert_eq!(model.biases, vec![0.1, 0.2]);
        assert_eq!(model.indices, Some(vec![vec![0, 3], vec![1]]));
        assert_eq!(model.weights, vec![vec![1.0, 2.0], vec![3.0]]);
        assert_eq!(model.label_names, None);
    }

    #[test]
    fn test_multiclass_overflowing_start_table() {
        // A start span wider than i32 must fail as a format error, not wrap.
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes()); // cbFloat
        payload.extend_from_slice(&4i32.to_le_bytes()); // features
        payload.extend_from_slice(&1i32.to_le_bytes()); // classes
        payload.extend_from_slice(&0.1f32.to_le_bytes());
        payload.extend_from_slice(&2i32.to_le_bytes()); // numStarts != 0: sparse
        payload.extend_from_slice(&2i32.to_le_bytes());
        for start in [i32::MIN, i32::MAX] {
            payload.extend_from_slice(&start.to_le_bytes());
        }
        payload.extend_from_slice(&0i32.to_le_bytes()); // total indices
        let data = build_model_key("MulticlassLinear", 0x00010001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = decode_header(&entries, &data);
        assert!(matches!(
            MulticlassLinearParameters::decode(&mut ctx),
            Err(ModelError::Format(_))
        ));
    }

    #[test]
    fn test_multiclass_dense_weights() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes());
        payload.extend_from_slice(&3i32.to_le_bytes()); // features
        payload.extend_from_slice(&2i32.to_le_bytes()); // classes
        payload.extend_from_slice(&0.0f32.to_le_bytes());
        payload.extend_from_slice(&0.0f32.to_le_bytes());
        payload.extend_from_slice(&0i32.to_le_bytes()); // numStarts == 0: dense
        payload.extend_from_slice(&0i32.to_le_bytes()); // declared index total
        payload.extend_from_slice(&6i32.to_le_bytes()); // declared weight total
        for value in [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0] {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        let data = build_model_key("MultiClassLRExec", 0x00010001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = decode_header(&entries, &data);
        let model = MulticlassLinearParameters::decode(&mut ctx).unwrap();
        assert_eq!(model.indices, None);
        assert_eq!(model.weights.len(), 2);
        assert!(model.weights.iter().all(|row| row.len() == 3));
        assert_eq!(model.weights[1], vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_kmeans_dense_centroids() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes());
        payload.extend_from_slice(&2i32.to_le_bytes()); // k
        payload.extend_from_slice(&2i32.to_le_bytes()); // dimensionality
        for value in [1.0f32, 2.0, 3.0, 4.0] {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        // Pre-0x00010002 layout has no per-centroid count field.
        let data = build_model_key("KMeansPredictor", 0x00010001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = decode_header(&entries, &data);
        let model = KMeansParameters::decode(&mut ctx).unwrap();
        assert_eq!(model.centroids.len(), 2);
        assert_eq!(model.centroids[0].indices, None);
        assert_eq!(model.centroids[1].values, vec![3.0, 4.0]);
    }

    #[test]
    fn test_platt_calibrator() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&(-1.75f64).to_le_bytes());
        payload.extend_from_slice(&0.125f64.to_le_bytes());
        let data = build_model_key("PlattCaliExec", 0x00010001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = decode_header(&entries, &data);
        let calibrator = PlattCalibrator::decode(&mut ctx).unwrap();
        assert_eq!(calibrator.param_a, -1.75);
        assert_eq!(calibrator.param_b, 0.125);
    }

    #[test]
    fn test_pca_without_center() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes());
        payload.extend_from_slice(&3i32.to_le_bytes()); // dimension
        payload.extend_from_slice(&1i32.to_le_bytes()); // rank
        payload.push(0); // not centered
        for value in [0.5f32, 0.5, 0.5] {
            payload.extend_from_slice(&value.to_le_bytes());
        }
        let data = build_model_key("pcaAnomExec", 0x00010001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = decode_header(&entries, &data);
        let model = PcaParameters::decode(&mut ctx).unwrap();
        assert!(model.mean.is_empty());
        assert_eq!(model.eigenvectors, vec![vec![0.5, 0.5, 0.5]]);
    }
}
