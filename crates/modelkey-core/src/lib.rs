//! Decoder for the ML.NET model archive format.
//!
//! An ML.NET model is a zip archive of directories, each holding a
//! `Model.key` blob: a versioned binary container with a string pool, an
//! 8-character loader signature selecting the decoder, and a type-specific
//! payload. This crate takes the archive's flat `{name, data}` entry list
//! (produced by an external zip reader) and reconstructs the typed tree of
//! transformers, predictors, and numeric parameter blocks. It is read-only:
//! nothing is scored, executed, or written back.

mod anomaly;
mod codec;
mod entry;
mod error;
mod header;
mod predictors;
mod reader;
mod record;
mod registry;
mod schema;
mod transforms;
mod trees;
mod util;

pub use modelkey_buffers::{ReadError, Reader};

pub use codec::Codec;
pub use entry::Entry;
pub use error::ModelError;
pub use header::ModelHeader;
pub use reader::ModelReader;
pub use record::{Record, RecordBody};
pub use schema::{Schema, SchemaColumn, SchemaVersion};

pub use anomaly::{AnomalyDetectionState, IidAnomalyDetector, RingBuffer, SequentialTransformer};
pub use predictors::{
    Calibrated, Centroid, FactorizationMachineParameters, KMeansParameters, LinearParameters,
    MulticlassLinearParameters, PcaParameters, PlattCalibrator, PredictionTransformer,
};
pub use transforms::{
    AffineNormalizer, Anchor, BinaryLoader, CaseMode, ChainLink, ColorOrder, ColumnConcatenating,
    ColumnPairs, ColumnSelecting, CompositeDataLoader, ConcatColumn, ConcatInput, ImageLoading,
    ImagePixelExtracting, ImageResizing, KeyToVectorMapping, LpNormNormalizing, NgramExtracting,
    Normalizing, NormalizerColumn, NormalizerItemKind, OneVersusAll, Onnx, OnnxShapeInfo,
    PcaTransformInfo, PixelExtractOptions, PrincipalComponentAnalysis, ResizeOptions,
    ResizingKind, SequencePool, TensorFlow, TermManager, TermMap, TextFeaturizing, TextLoader,
    TextNormalizing, TokenizingByCharacters, TransformerChain, ValueToKeyMapping, WordTokenizing,
};
pub use trees::{CategoricalSplit, Tree, TreeEnsemble, TreeEnsembleParameters, TreeKind};
