//! Loader-signature dispatch: maps each signature baked into a container
//! header to its payload decoder.

use crate::anomaly::IidAnomalyDetector;
use crate::header::ModelHeader;
use crate::predictors::{
    Calibrated, FactorizationMachineParameters, KMeansParameters, LinearParameters,
    MulticlassLinearParameters, PcaParameters, PlattCalibrator, PredictionTransformer,
};
use crate::record::RecordBody;
use crate::transforms::{
    self, AffineNormalizer, BinaryLoader, ColumnConcatenating, ColumnPairs, ColumnSelecting,
    CompositeDataLoader, ImageLoading, ImagePixelExtracting, ImageResizing, KeyToVectorMapping,
    LpNormNormalizing, NgramExtracting, Normalizing, OneVersusAll, Onnx,
    PrincipalComponentAnalysis, TensorFlow, TermManager, TextFeaturizing, TextLoader,
    TextNormalizing, TokenizingByCharacters, TransformerChain, ValueToKeyMapping, WordTokenizing,
};
use crate::trees::{self, TreeEnsembleParameters};
use crate::ModelError;

/// Dispatches a parsed header to the decoder registered for its loader
/// signature.
pub(crate) fn create(
    signature: &str,
    ctx: &mut ModelHeader<'_>,
) -> Result<RecordBody, ModelError> {
    match signature {
        // Loaders.
        "BinaryLoader" => Ok(RecordBody::BinaryLoader(BinaryLoader::decode(ctx)?)),
        "TextLoader" => Ok(RecordBody::TextLoader(TextLoader::decode(ctx)?)),
        "PipeDataLoader" => Ok(RecordBody::CompositeDataLoader(CompositeDataLoader::decode(
            ctx,
        )?)),
        // Chain containers.
        "TransformerChain" => Ok(RecordBody::TransformerChain(TransformerChain::decode(ctx)?)),
        "Text" => Ok(RecordBody::TextFeaturizing(TextFeaturizing::decode(ctx)?)),
        "OVAExec" => Ok(RecordBody::OneVersusAll(OneVersusAll::decode(ctx)?)),
        // Column transforms.
        "CopyTransform" => Ok(RecordBody::ColumnPairs(ColumnPairs::decode_unsigned(ctx)?)),
        "ConvertTransform" | "KeyToValueTransform" | "ValueMappingTransformer" => {
            Ok(RecordBody::ColumnPairs(ColumnPairs::decode(ctx)?))
        }
        "ConcatTransform" => Ok(RecordBody::ColumnConcatenating(ColumnConcatenating::decode(
            ctx,
        )?)),
        "SelectColumnsTransform" => {
            Ok(RecordBody::ColumnSelecting(ColumnSelecting::decode(ctx)?))
        }
        "CharToken" => Ok(RecordBody::TokenizingByCharacters(
            TokenizingByCharacters::decode(ctx)?,
        )),
        "NgramTransform" => Ok(RecordBody::NgramExtracting(NgramExtracting::decode(ctx)?)),
        "TokenizeTextTransform" => Ok(RecordBody::WordTokenizing(WordTokenizing::decode(ctx)?)),
        "TextNormalizerTransform" => {
            Ok(RecordBody::TextNormalizing(TextNormalizing::decode(ctx)?))
        }
        "PcaTransform" => Ok(RecordBody::PrincipalComponentAnalysis(
            PrincipalComponentAnalysis::decode(ctx)?,
        )),
        "GcnTransform" => Ok(RecordBody::LpNormNormalizing(LpNormNormalizing::decode(
            ctx,
        )?)),
        "KeyToVectorTransform" => Ok(RecordBody::KeyToVectorMapping(KeyToVectorMapping::decode(
            ctx,
        )?)),
        "ImageLoaderTransform" => Ok(RecordBody::ImageLoading(ImageLoading::decode(ctx)?)),
        "ImageScalerTransform" => Ok(RecordBody::ImageResizing(ImageResizing::decode(ctx)?)),
        "ImagePixelExtractor" => Ok(RecordBody::ImagePixelExtracting(
            ImagePixelExtracting::decode(ctx)?,
        )),
        "Normalizer" => Ok(RecordBody::Normalizing(Normalizing::decode(ctx)?)),
        "TermTransform" => Ok(RecordBody::ValueToKeyMapping(ValueToKeyMapping::decode(
            ctx,
        )?)),
        "TermManager" => Ok(RecordBody::TermManager(TermManager::decode(ctx)?)),
        "AffineNormExec" => Ok(RecordBody::AffineNormalizer(AffineNormalizer::decode(ctx)?)),
        // Row-to-row wrappers.
        "RowToRowMapper" => transforms::decode_row_to_row_mapper(ctx),
        "OnnxTransform" => Ok(RecordBody::Onnx(Onnx::decode(ctx)?)),
        "TensorFlowTransform" => Ok(RecordBody::TensorFlow(TensorFlow::decode(ctx)?)),
        // Prediction transformers.
        "ClusteringPredXfer" | "RegressionPredXfer" => Ok(RecordBody::Prediction(
            PredictionTransformer::decode_plain(ctx)?,
        )),
        "AnomalyPredXfer" | "BinaryPredXfer" => Ok(RecordBody::Prediction(
            PredictionTransformer::decode_thresholded(ctx)?,
        )),
        "MulticlassPredXfer" => Ok(RecordBody::Prediction(
            PredictionTransformer::decode_multiclass(ctx)?,
        )),
        "FAFMPredXfer" => Ok(RecordBody::Prediction(
            PredictionTransformer::decode_factorization_machine(ctx)?,
        )),
        // Calibration.
        "CaliPredExec" | "FeatWCaliPredExec" | "PMixCaliPredExec" => {
            Ok(RecordBody::Calibrated(Calibrated::decode(ctx)?))
        }
        "PlattCaliExec" => Ok(RecordBody::PlattCalibrator(PlattCalibrator::decode(ctx)?)),
        // Parameter blocks.
        "Linear2CExec" => Ok(RecordBody::LinearParameters(LinearParameters::decode(
            ctx, true,
        )?)),
        "LinearRegressionExec" | "PoissonRegressionExec" => Ok(RecordBody::LinearParameters(
            LinearParameters::decode(ctx, false)?,
        )),
        "MulticlassLinear" | "MultiClassLRExec" => Ok(RecordBody::MulticlassLinearParameters(
            MulticlassLinearParameters::decode(ctx)?,
        )),
        "FastTreeBinaryExec" | "FastTreeRegressionExec" | "LightGBMBinaryExec"
        | "LightGBMRegressionExec" => Ok(RecordBody::TreeEnsembleParameters(
            TreeEnsembleParameters::decode(ctx, trees::FAST_TREE)?,
        )),
        "FastTreeTweedieExec" => Ok(RecordBody::TreeEnsembleParameters(
            TreeEnsembleParameters::decode(ctx, trees::TWEEDIE)?,
        )),
        "KMeansPredictor" => Ok(RecordBody::KMeansParameters(KMeansParameters::decode(ctx)?)),
        "pcaAnomExec" => Ok(RecordBody::PcaParameters(PcaParameters::decode(ctx)?)),
        "FieldAwareFactMacPredict" => Ok(RecordBody::FactorizationMachineParameters(
            FactorizationMachineParameters::decode(ctx)?,
        )),
        "IidChangePointDetector" | "IidSpikeDetector" => Ok(RecordBody::IidAnomalyDetector(
            IidAnomalyDetector::decode(ctx)?,
        )),
        // Registered signatures with no serialized fields.
        "CSharpTransform" | "DropColumnsTransform" | "FastForestBinaryExec"
        | "GenericScoreTransform" | "MultiClassNetPredictor" | "NltTokenizeTransform"
        | "NormalizeTransform" | "ProtonNNMCPred" | "StopWordsTransform"
        | "XGBoostMulticlass" => Ok(RecordBody::Empty),
        _ => Err(ModelError::UnknownLoaderSignature(signature.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::header::build_model_key;

    #[test]
    fn test_unknown_signature() {
        let data = build_model_key("ZZZZZZZZ", 1, &[], &[]);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        assert!(matches!(
            create("ZZZZZZZZ", &mut ctx),
            Err(ModelError::UnknownLoaderSignature(signature)) if signature == "ZZZZZZZZ"
        ));
    }

    #[test]
    fn test_fieldless_signature() {
        let data = build_model_key("StopWordsTransform", 1, &[], &[]);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        assert_eq!(
            create("StopWordsTransform", &mut ctx).unwrap(),
            RecordBody::Empty
        );
    }

    #[test]
    fn test_copy_transform_unsigned_count() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1u32.to_le_bytes());
        payload.extend_from_slice(&0i32.to_le_bytes()); // output id
        payload.extend_from_slice(&1i32.to_le_bytes()); // input id
        let data = build_model_key("CopyTransform", 1, &["Copy", "Source"], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        let body = create("CopyTransform", &mut ctx).unwrap();
        match body {
            RecordBody::ColumnPairs(pairs) => {
                assert_eq!(pairs.outputs, vec!["Copy".to_owned()]);
                assert_eq!(pairs.inputs, vec!["Source".to_owned()]);
            }
            _ => panic!("expected column pairs"),
        }
    }
}
