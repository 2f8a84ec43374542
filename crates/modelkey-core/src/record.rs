//! Decoded records: the polymorphic result of dispatching a container
//! through the component catalog.

use crate::anomaly::IidAnomalyDetector;
use crate::predictors::{
    Calibrated, FactorizationMachineParameters, KMeansParameters, LinearParameters,
    MulticlassLinearParameters, PcaParameters, PlattCalibrator, PredictionTransformer,
};
use crate::transforms::{
    AffineNormalizer, BinaryLoader, ColumnConcatenating, ColumnPairs, ColumnSelecting,
    CompositeDataLoader, ImageLoading, ImagePixelExtracting, ImageResizing, KeyToVectorMapping,
    LpNormNormalizing, NgramExtracting, Normalizing, Onnx, OneVersusAll,
    PrincipalComponentAnalysis, TensorFlow, TermManager, TextFeaturizing, TextLoader,
    TextNormalizing, TokenizingByCharacters, TransformerChain, ValueToKeyMapping, WordTokenizing,
};
use crate::trees::TreeEnsembleParameters;

/// One decoded directory node.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Resolved type tag. Usually the loader signature that produced the
    /// record; a row-to-row mapper adopts the tag of its inner mapper.
    pub kind: String,
    /// Directory path of the node inside the archive.
    pub name: String,
    pub body: RecordBody,
}

/// Closed set of decoded payloads, one variant per structural family.
///
/// Signatures that are registered but serialize no fields decode to
/// [`RecordBody::Empty`]; their identity lives in [`Record::kind`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBody {
    // Loaders.
    BinaryLoader(BinaryLoader),
    TextLoader(TextLoader),
    CompositeDataLoader(CompositeDataLoader),
    // Chain containers.
    TransformerChain(TransformerChain),
    TextFeaturizing(TextFeaturizing),
    OneVersusAll(OneVersusAll),
    // Column transforms.
    ColumnPairs(ColumnPairs),
    ColumnConcatenating(ColumnConcatenating),
    ColumnSelecting(ColumnSelecting),
    TokenizingByCharacters(TokenizingByCharacters),
    NgramExtracting(NgramExtracting),
    WordTokenizing(WordTokenizing),
    TextNormalizing(TextNormalizing),
    PrincipalComponentAnalysis(PrincipalComponentAnalysis),
    LpNormNormalizing(LpNormNormalizing),
    KeyToVectorMapping(KeyToVectorMapping),
    ImageLoading(ImageLoading),
    ImageResizing(ImageResizing),
    ImagePixelExtracting(ImagePixelExtracting),
    Normalizing(Normalizing),
    ValueToKeyMapping(ValueToKeyMapping),
    TermManager(TermManager),
    AffineNormalizer(AffineNormalizer),
    // Row-to-row wrappers.
    RowToRowMapper(Box<Record>),
    Onnx(Onnx),
    TensorFlow(TensorFlow),
    // Prediction transformers and calibration.
    Prediction(PredictionTransformer),
    Calibrated(Calibrated),
    PlattCalibrator(PlattCalibrator),
    // Parameter blocks.
    LinearParameters(LinearParameters),
    MulticlassLinearParameters(MulticlassLinearParameters),
    TreeEnsembleParameters(TreeEnsembleParameters),
    KMeansParameters(KMeansParameters),
    PcaParameters(PcaParameters),
    FactorizationMachineParameters(FactorizationMachineParameters),
    IidAnomalyDetector(IidAnomalyDetector),
    // Registered signatures with no serialized fields.
    Empty,
}

impl RecordBody {
    /// The inner type tag a wrapper resolves to, if any.
    pub(crate) fn resolved_kind(&self) -> Option<&str> {
        match self {
            RecordBody::RowToRowMapper(mapper) => Some(&mapper.kind),
            _ => None,
        }
    }
}
