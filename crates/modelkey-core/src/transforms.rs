//! Transform and loader decoders.
//!
//! Every decoder receives a [`ModelHeader`] whose cursor sits at the start
//! of the model block and leaves it exactly past its own fields; bytes of
//! nested sub-models belong to separately opened child headers.

use crate::header::ModelHeader;
use crate::record::{Record, RecordBody};
use crate::schema::Schema;
use crate::util::{count, f32_array, f64_array};
use crate::{Codec, ModelError};

/// Shared base of one-to-one column transforms: parallel output/input
/// column-name lists decoded as string-pool id pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnPairs {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl ColumnPairs {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let n = count(ctx.reader.i32()?)?;
        Self::decode_pairs(ctx, n)
    }

    /// Column-copy serializes its count unsigned; everything else signed.
    pub(crate) fn decode_unsigned(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let n = ctx.reader.u32()? as usize;
        Self::decode_pairs(ctx, n)
    }

    fn decode_pairs(ctx: &mut ModelHeader<'_>, n: usize) -> Result<Self, ModelError> {
        let mut inputs = Vec::with_capacity(n);
        let mut outputs = Vec::with_capacity(n);
        for _ in 0..n {
            outputs.push(ctx.string()?);
            inputs.push(ctx.string()?);
        }
        Ok(Self { inputs, outputs })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TokenizingByCharacters {
    pub columns: ColumnPairs,
    pub use_marker_chars: bool,
    pub is_separator_start_end: bool,
}

impl TokenizingByCharacters {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        let use_marker_chars = ctx.reader.boolean()?;
        let is_separator_start_end = if ctx.model_version_readable < 0x00010002 {
            true
        } else {
            ctx.reader.boolean()?
        };
        Ok(Self {
            columns,
            use_marker_chars,
            is_separator_start_end,
        })
    }
}

/// Compact vocabulary representation: per-term start offsets into a packed
/// byte pool.
#[derive(Debug, Clone, PartialEq)]
pub struct SequencePool {
    pub id_limit: i32,
    pub starts: Vec<i32>,
    pub bytes: Vec<u8>,
}

impl SequencePool {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let id_limit = ctx.reader.i32()?;
        let starts = ctx.reader.i32s(count(id_limit)? + 1)?;
        let total = count(starts[starts.len() - 1])?;
        let bytes = ctx.reader.bytes(total)?.to_vec();
        Ok(Self {
            id_limit,
            starts,
            bytes,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NgramExtracting {
    pub columns: ColumnPairs,
    pub ngram_length: i32,
    pub skip_length: i32,
    pub weighting: Option<i32>,
    pub non_empty_levels: Vec<bool>,
    pub ngram_map: SequencePool,
    pub inv_doc_freqs: Option<Vec<f64>>,
}

impl NgramExtracting {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        if columns.inputs.len() != 1 {
            return Err(ModelError::Unsupported(
                "multi-column n-gram transform".to_owned(),
            ));
        }
        let read_weighting = ctx.model_version_readable >= 0x00010002;
        let ngram_length = ctx.reader.i32()?;
        let skip_length = ctx.reader.i32()?;
        let weighting = if read_weighting {
            Some(ctx.reader.i32()?)
        } else {
            None
        };
        let non_empty_levels = ctx.reader.booleans(count(ngram_length)?)?;
        let ngram_map = SequencePool::decode(ctx)?;
        let inv_doc_freqs = if read_weighting {
            Some(f64_array(&mut ctx.reader)?)
        } else {
            None
        };
        Ok(Self {
            columns,
            ngram_length,
            skip_length,
            weighting,
            non_empty_levels,
            ngram_map,
            inv_doc_freqs,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WordTokenizing {
    pub columns: ColumnPairs,
    pub separators: Vec<char>,
}

impl WordTokenizing {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        if columns.inputs.len() != 1 {
            return Err(ModelError::Unsupported(
                "multi-column word tokenizer".to_owned(),
            ));
        }
        let n = count(ctx.reader.i32()?)?;
        let mut separators = Vec::with_capacity(n);
        for _ in 0..n {
            let unit = ctx.reader.u16()?;
            separators.push(char::from_u32(u32::from(unit)).unwrap_or('\u{fffd}'));
        }
        Ok(Self {
            columns,
            separators,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMode {
    Lower,
    Upper,
    None,
}

impl TryFrom<u8> for CaseMode {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, ModelError> {
        match value {
            0 => Ok(CaseMode::Lower),
            1 => Ok(CaseMode::Upper),
            2 => Ok(CaseMode::None),
            _ => Err(ModelError::Format(format!("unknown case mode {value}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextNormalizing {
    pub columns: ColumnPairs,
    pub case_mode: CaseMode,
    pub keep_diacritics: bool,
    pub keep_punctuations: bool,
    pub keep_numbers: bool,
}

impl TextNormalizing {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        let case_mode = CaseMode::try_from(ctx.reader.u8()?)?;
        let keep_diacritics = ctx.reader.boolean()?;
        let keep_punctuations = ctx.reader.boolean()?;
        let keep_numbers = ctx.reader.boolean()?;
        Ok(Self {
            columns,
            case_mode,
            keep_diacritics,
            keep_punctuations,
            keep_numbers,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PcaTransformInfo {
    pub dimension: i32,
    pub rank: i32,
    pub eigenvectors: Vec<Vec<f32>>,
    pub mean_projected: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrincipalComponentAnalysis {
    pub columns: ColumnPairs,
    pub transforms: Vec<PcaTransformInfo>,
}

impl PrincipalComponentAnalysis {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        if ctx.model_version_readable == 0x00010001 {
            let cb_float = ctx.reader.i32()?;
            if cb_float != 4 {
                return Err(ModelError::FloatSize(cb_float));
            }
        }
        let mut transforms = Vec::with_capacity(columns.inputs.len());
        for _ in 0..columns.inputs.len() {
            let dimension = ctx.reader.i32()?;
            let rank = ctx.reader.i32()?;
            let mut eigenvectors = Vec::with_capacity(count(rank)?);
            for _ in 0..count(rank)? {
                eigenvectors.push(ctx.reader.f32s(count(dimension)?)?);
            }
            let mean_projected = f32_array(&mut ctx.reader)?;
            transforms.push(PcaTransformInfo {
                dimension,
                rank,
                eigenvectors,
                mean_projected,
            });
        }
        Ok(Self {
            columns,
            transforms,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LpNormNormalizing {
    pub columns: ColumnPairs,
    pub ensure_zero_mean: bool,
    pub norm: u8,
    pub scale: f32,
}

impl LpNormNormalizing {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        if ctx.model_version_written <= 0x00010002 {
            let _cb_float = ctx.reader.i32()?;
        }
        if columns.inputs.len() != 1 {
            return Err(ModelError::Unsupported(
                "multi-column Lp-norm normalizer".to_owned(),
            ));
        }
        Ok(Self {
            ensure_zero_mean: ctx.reader.boolean()?,
            norm: ctx.reader.u8()?,
            scale: ctx.reader.f32()?,
            columns,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KeyToVectorMapping {
    pub columns: ColumnPairs,
    pub bags: Vec<bool>,
}

impl KeyToVectorMapping {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        if ctx.model_version_written == 0x00010001 {
            let _cb_float = ctx.reader.i32()?;
        }
        let bags = ctx.reader.booleans(columns.inputs.len())?;
        Ok(Self { columns, bags })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageLoading {
    pub columns: ColumnPairs,
    pub image_folder: Option<String>,
}

impl ImageLoading {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        let image_folder = ctx.opt_string()?;
        Ok(Self {
            columns,
            image_folder,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizingKind {
    IsoPad,
    IsoCrop,
    Fill,
}

impl TryFrom<u8> for ResizingKind {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, ModelError> {
        match value {
            0 => Ok(ResizingKind::IsoPad),
            1 => Ok(ResizingKind::IsoCrop),
            2 => Ok(ResizingKind::Fill),
            _ => Err(ModelError::Format(format!("unknown resizing kind {value}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Right,
    Left,
    Top,
    Bottom,
    Center,
}

impl TryFrom<u8> for Anchor {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, ModelError> {
        match value {
            0 => Ok(Anchor::Right),
            1 => Ok(Anchor::Left),
            2 => Ok(Anchor::Top),
            3 => Ok(Anchor::Bottom),
            4 => Ok(Anchor::Center),
            _ => Err(ModelError::Format(format!("unknown resize anchor {value}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResizeOptions {
    pub width: i32,
    pub height: i32,
    pub resizing: ResizingKind,
    pub anchor: Anchor,
}

impl ResizeOptions {
    fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        Ok(Self {
            width: ctx.reader.i32()?,
            height: ctx.reader.i32()?,
            resizing: ResizingKind::try_from(ctx.reader.u8()?)?,
            anchor: Anchor::try_from(ctx.reader.u8()?)?,
        })
    }
}

/// Image resizing supports multiple columns: one option block per input.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageResizing {
    pub columns: ColumnPairs,
    pub options: Vec<ResizeOptions>,
}

impl ImageResizing {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        let mut options = Vec::with_capacity(columns.inputs.len());
        for _ in 0..columns.inputs.len() {
            options.push(ResizeOptions::decode(ctx)?);
        }
        Ok(Self { columns, options })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorOrder {
    Argb,
    Arbg,
    Abrg,
    Abgr,
    Agrb,
    Agbr,
}

impl TryFrom<u8> for ColorOrder {
    type Error = ModelError;

    fn try_from(value: u8) -> Result<Self, ModelError> {
        match value {
            1 => Ok(ColorOrder::Argb),
            2 => Ok(ColorOrder::Arbg),
            3 => Ok(ColorOrder::Abrg),
            4 => Ok(ColorOrder::Abgr),
            5 => Ok(ColorOrder::Agrb),
            6 => Ok(ColorOrder::Agbr),
            _ => Err(ModelError::Format(format!("unknown color order {value}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PixelExtractOptions {
    /// Bit set over alpha (0x01), red (0x02), green (0x04), blue (0x08).
    pub colors: u8,
    pub order: ColorOrder,
    /// Number of extracted planes: popcount of the color bits.
    pub planes: u8,
    pub output_as_float_array: bool,
    pub offset_image: f32,
    pub scale_image: f32,
    pub interleave_pixel_colors: bool,
}

impl PixelExtractOptions {
    fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let colors = ctx.reader.u8()?;
        let order = if ctx.model_version_written <= 0x00010002 {
            ColorOrder::Argb
        } else {
            ColorOrder::try_from(ctx.reader.u8()?)?
        };
        Ok(Self {
            colors,
            order,
            planes: (colors & 0x0f).count_ones() as u8,
            output_as_float_array: ctx.reader.boolean()?,
            offset_image: ctx.reader.f32()?,
            scale_image: ctx.reader.f32()?,
            interleave_pixel_colors: ctx.reader.boolean()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImagePixelExtracting {
    pub columns: ColumnPairs,
    pub options: Vec<PixelExtractOptions>,
}

impl ImagePixelExtracting {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        let mut options = Vec::with_capacity(columns.inputs.len());
        for _ in 0..columns.inputs.len() {
            options.push(PixelExtractOptions::decode(ctx)?);
        }
        Ok(Self { columns, options })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizerItemKind {
    Single,
    Double,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizerColumn {
    pub item_kind: NormalizerItemKind,
    /// The per-column normalizer function sub-model (`Normalizer_NNN`).
    pub function: Option<Record>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalizing {
    pub columns: ColumnPairs,
    pub normalizers: Vec<NormalizerColumn>,
}

impl Normalizing {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        let mut normalizers = Vec::with_capacity(columns.inputs.len());
        for i in 0..columns.inputs.len() {
            let _is_vector = ctx.reader.boolean()?;
            let _vector_size = ctx.reader.i32()?;
            let item_kind = match ctx.reader.u8()? {
                9 => NormalizerItemKind::Single,
                10 => NormalizerItemKind::Double,
                kind => {
                    return Err(ModelError::Unsupported(format!("item kind {kind}")));
                }
            };
            let function = ctx.open(&format!("Normalizer_{i:03}"))?;
            normalizers.push(NormalizerColumn {
                item_kind,
                function,
            });
        }
        Ok(Self {
            columns,
            normalizers,
        })
    }
}

/// Vocabulary term list: either pool strings or codec-described values.
#[derive(Debug, Clone, PartialEq)]
pub enum TermMap {
    Text(Vec<String>),
    Values { codec: Codec, values: Vec<f32> },
}

impl TermMap {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        match ctx.reader.u8()? {
            0 => {
                let n = count(ctx.reader.i32()?)?;
                let mut values = Vec::with_capacity(n);
                for _ in 0..n {
                    values.push(ctx.string()?);
                }
                Ok(TermMap::Text(values))
            }
            1 => {
                let codec = Codec::decode(&mut ctx.reader)?;
                let n = count(ctx.reader.i32()?)?;
                let values = codec.read_values(&mut ctx.reader, n)?;
                Ok(TermMap::Values { codec, values })
            }
            kind => Err(ModelError::Unsupported(format!("term map type {kind}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermManager {
    pub maps: Vec<TermMap>,
}

impl TermManager {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let n = count(ctx.reader.i32()?)?;
        if ctx.model_version_written < 0x00010002 {
            return Err(ModelError::Unsupported(
                "legacy text-only term manager".to_owned(),
            ));
        }
        let mut maps = Vec::with_capacity(n);
        for _ in 0..n {
            maps.push(TermMap::decode(ctx)?);
        }
        Ok(Self { maps })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueToKeyMapping {
    pub columns: ColumnPairs,
    pub text_metadata: Vec<bool>,
    pub term_maps: Option<Vec<TermMap>>,
}

impl ValueToKeyMapping {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let columns = ColumnPairs::decode(ctx)?;
        let text_metadata = if ctx.model_version_written >= 0x00010003 {
            ctx.reader
                .booleans(columns.outputs.len() + columns.inputs.len())?
        } else {
            vec![false; columns.inputs.len()]
        };
        let term_maps = match ctx.open("Vocabulary")? {
            Some(record) => match record.body {
                RecordBody::TermManager(manager) => Some(manager.maps),
                _ => {
                    return Err(ModelError::Format(
                        "unexpected `Vocabulary` child type".to_owned(),
                    ));
                }
            },
            None => None,
        };
        Ok(Self {
            columns,
            text_metadata,
            term_maps,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatInput {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatColumn {
    pub output: String,
    pub inputs: Vec<ConcatInput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConcatenating {
    pub columns: Vec<ConcatColumn>,
}

impl ColumnConcatenating {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        if ctx.model_version_readable >= 0x00010003 {
            let n = count(ctx.reader.i32()?)?;
            let mut columns = Vec::with_capacity(n);
            for _ in 0..n {
                let output = ctx.string()?;
                let sources = count(ctx.reader.i32()?)?;
                let mut inputs = Vec::with_capacity(sources);
                for _ in 0..sources {
                    let name = ctx.string()?;
                    let alias = ctx.opt_string()?;
                    inputs.push(ConcatInput { name, alias });
                }
                columns.push(ConcatColumn { output, inputs });
            }
            Ok(Self { columns })
        } else {
            Self::decode_legacy(ctx)
        }
    }

    // Pre-0x00010003 layout: precision, per-column source lists, then an
    // id-keyed alias table.
    fn decode_legacy(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let _precision = ctx.reader.i32()?;
        let n = count(ctx.reader.i32()?)?;
        let mut names = Vec::with_capacity(n);
        let mut inputs = Vec::with_capacity(n);
        for _ in 0..n {
            names.push(ctx.string()?);
            let sources = count(ctx.reader.i32()?)?;
            let mut column = Vec::with_capacity(sources);
            for _ in 0..sources {
                column.push(ctx.string()?);
            }
            inputs.push(column);
        }
        if ctx.model_version_readable >= 0x00010002 {
            for _ in 0..n {
                loop {
                    let j = ctx.reader.i32()?;
                    if j == -1 {
                        break;
                    }
                    let _alias = ctx.string()?;
                }
            }
        }
        if n > 1 {
            return Err(ModelError::Unsupported(
                "legacy multi-output column concatenation".to_owned(),
            ));
        }
        let columns = names
            .into_iter()
            .zip(inputs)
            .map(|(output, sources)| ConcatColumn {
                output,
                inputs: sources
                    .into_iter()
                    .map(|name| ConcatInput { name, alias: None })
                    .collect(),
            })
            .collect();
        Ok(Self { columns })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSelecting {
    pub keep_hidden: bool,
    pub ignore_missing: bool,
    /// `true`: `columns` is the keep list; `false`: the drop list.
    pub keep: bool,
    pub columns: Vec<String>,
}

impl ColumnSelecting {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let keep = ctx.reader.boolean()?;
        let keep_hidden = ctx.reader.boolean()?;
        let ignore_missing = ctx.reader.boolean()?;
        let n = count(ctx.reader.i32()?)?;
        let mut columns = Vec::with_capacity(n);
        for _ in 0..n {
            columns.push(ctx.string()?);
        }
        Ok(Self {
            keep_hidden,
            ignore_missing,
            keep,
            columns,
        })
    }
}

/// One step of a transformer chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainLink {
    /// 0x01 = training, 0x02 = testing, 0x04 = scoring.
    pub scope: i32,
    pub transform: Option<Record>,
}

/// Ordered chain of transformers; decoding order is execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformerChain {
    pub links: Vec<ChainLink>,
}

impl TransformerChain {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let n = count(ctx.reader.i32()?)?;
        let mut links = Vec::with_capacity(n);
        for i in 0..n {
            let scope = ctx.reader.i32()?;
            let transform = ctx.open(&format!("Transform_{i:03}"))?;
            links.push(ChainLink { scope, transform });
        }
        Ok(Self { links })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextFeaturizing {
    pub chain: Vec<Option<Record>>,
}

impl TextFeaturizing {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        if ctx.model_version_readable == 0x00010001 {
            let n = count(ctx.reader.i32()?)?;
            let _loader = ctx.open("Loader")?;
            let mut chain = Vec::with_capacity(n);
            for i in 0..n {
                chain.push(ctx.open(&format!("Step_{i:03}"))?);
            }
            Ok(Self { chain })
        } else {
            let record = ctx.open("Chain")?.ok_or_else(|| {
                ModelError::Format("missing `Chain` entry".to_owned())
            })?;
            match record.body {
                RecordBody::TransformerChain(inner) => Ok(Self {
                    chain: inner.links.into_iter().map(|link| link.transform).collect(),
                }),
                _ => Err(ModelError::Format(
                    "unexpected `Chain` child type".to_owned(),
                )),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeDataLoader {
    pub float_size: i32,
    /// Per-step tag and optional arguments, present from 0x00010002 on.
    pub tags: Vec<(String, Option<String>)>,
    pub chain: Vec<Option<Record>>,
}

impl CompositeDataLoader {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let _loader = ctx.open("Loader")?;
        let float_size = ctx.reader.i32()?;
        let n = count(ctx.reader.i32()?)?;
        let mut tags = Vec::with_capacity(n);
        if ctx.model_version_readable >= 0x00010002 {
            for _ in 0..n {
                let tag = ctx.string()?;
                let args = ctx.opt_string()?;
                tags.push((tag, args));
            }
        }
        let mut chain = Vec::with_capacity(n);
        for i in 0..n {
            chain.push(ctx.open(&format!("Transform_{i:03}"))?);
        }
        Ok(Self {
            float_size,
            tags,
            chain,
        })
    }
}

/// One-versus-all ensemble: a sub-predictor per class.
#[derive(Debug, Clone, PartialEq)]
pub struct OneVersusAll {
    pub use_distance: bool,
    pub predictors: Vec<Option<Record>>,
}

impl OneVersusAll {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        crate::util::expect_float_size(&mut ctx.reader)?;
        let use_distance = ctx.reader.boolean()?;
        let n = count(ctx.reader.i32()?)?;
        let mut predictors = Vec::with_capacity(n);
        for i in 0..n {
            predictors.push(ctx.open(&format!("SubPredictor_{i:03}"))?);
        }
        Ok(Self {
            use_distance,
            predictors,
        })
    }
}

/// Opens the `Mapper` child and adopts it; the wrapper's resolved kind is
/// the mapper's.
pub(crate) fn decode_row_to_row_mapper(
    ctx: &mut ModelHeader<'_>,
) -> Result<RecordBody, ModelError> {
    let mapper = ctx
        .open("Mapper")?
        .ok_or_else(|| ModelError::Format("missing `Mapper` entry".to_owned()))?;
    Ok(RecordBody::RowToRowMapper(Box::new(mapper)))
}

#[derive(Debug, Clone, PartialEq)]
pub struct OnnxShapeInfo {
    pub name: String,
    pub shape: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Onnx {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    pub custom_shape_infos: Vec<OnnxShapeInfo>,
}

impl Onnx {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let num_inputs = if ctx.model_version_written > 0x00010001 {
            count(ctx.reader.i32()?)?
        } else {
            1
        };
        let mut inputs = Vec::with_capacity(num_inputs);
        for _ in 0..num_inputs {
            inputs.push(ctx.string()?);
        }
        let num_outputs = if ctx.model_version_written > 0x00010001 {
            count(ctx.reader.i32()?)?
        } else {
            1
        };
        let mut outputs = Vec::with_capacity(num_outputs);
        for _ in 0..num_outputs {
            outputs.push(ctx.string()?);
        }
        let mut custom_shape_infos = Vec::new();
        if ctx.model_version_written > 0x0001000c {
            let n = count(ctx.reader.i32()?)?;
            for _ in 0..n {
                let name = ctx.string()?;
                let len = count(ctx.reader.i32()?)?;
                let shape = ctx.reader.i32s(len)?;
                custom_shape_infos.push(OnnxShapeInfo { name, shape });
            }
        }
        Ok(Self {
            inputs,
            outputs,
            custom_shape_infos,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TensorFlow {
    pub is_frozen: bool,
    pub add_batch_dimension_input: bool,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

impl TensorFlow {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let is_frozen = if ctx.model_version_readable >= 0x00010002 {
            ctx.reader.boolean()?
        } else {
            true
        };
        let add_batch_dimension_input = if ctx.model_version_readable >= 0x00010003 {
            ctx.reader.boolean()?
        } else {
            true
        };
        let num_inputs = count(ctx.reader.i32()?)?;
        let mut inputs = Vec::with_capacity(num_inputs);
        for _ in 0..num_inputs {
            inputs.push(ctx.string()?);
        }
        let num_outputs = if ctx.model_version_readable >= 0x00010002 {
            count(ctx.reader.i32()?)?
        } else {
            1
        };
        let mut outputs = Vec::with_capacity(num_outputs);
        for _ in 0..num_outputs {
            outputs.push(ctx.string()?);
        }
        Ok(Self {
            is_frozen,
            add_batch_dimension_input,
            inputs,
            outputs,
        })
    }
}

/// Binary data loader: context fields plus its persisted `Schema.idv`.
#[derive(Debug, Clone, PartialEq)]
pub struct BinaryLoader {
    pub threads: Option<i32>,
    pub generated_row_index_name: Option<String>,
    pub shuffle_blocks: Option<f64>,
    pub schema: Schema,
}

impl BinaryLoader {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let (threads, generated_row_index_name) = if ctx.model_version_written >= 0x00010002 {
            (Some(ctx.reader.i32()?), ctx.opt_string()?)
        } else {
            (None, None)
        };
        let shuffle_blocks = if ctx.model_version_written >= 0x00010003 {
            Some(ctx.reader.f64()?)
        } else {
            None
        };
        let mut reader = ctx
            .open_binary("Schema.idv")
            .ok_or_else(|| ModelError::Format("missing `Schema.idv` entry".to_owned()))?;
        let schema = Schema::decode(&mut reader)?;
        Ok(Self {
            threads,
            generated_row_index_name,
            shuffle_blocks,
            schema,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLoader {
    pub float_size: i32,
    pub max_rows: i64,
    pub flags: u32,
    pub input_size: i32,
    pub separators: Vec<char>,
    pub binding_count: i32,
}

impl TextLoader {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let float_size = ctx.reader.i32()?;
        let max_rows = ctx.reader.i64()?;
        let flags = ctx.reader.u32()?;
        let input_size = ctx.reader.i32()?;
        let n = count(ctx.reader.i32()?)?;
        let mut separators = Vec::with_capacity(n);
        for _ in 0..n {
            let unit = ctx.reader.u16()?;
            separators.push(char::from_u32(u32::from(unit)).unwrap_or('\u{fffd}'));
        }
        let binding_count = ctx.reader.i32()?;
        Ok(Self {
            float_size,
            max_rows,
            flags,
            input_size,
            separators,
            binding_count,
        })
    }
}

/// Affine normalization block: sparse scales and offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct AffineNormalizer {
    pub num_features: i32,
    pub scales_sparse: Option<Vec<f32>>,
    pub offsets_sparse: Option<Vec<f32>>,
}

impl AffineNormalizer {
    pub(crate) fn decode(ctx: &mut ModelHeader<'_>) -> Result<Self, ModelError> {
        let _cb_float = ctx.reader.i32()?;
        let num_features = ctx.reader.i32()?;
        let morph_count = ctx.reader.i32()?;
        let (scales_sparse, offsets_sparse) = if morph_count == -1 {
            (
                Some(f32_array(&mut ctx.reader)?),
                Some(f32_array(&mut ctx.reader)?),
            )
        } else {
            (None, None)
        };
        Ok(Self {
            num_features,
            scales_sparse,
            offsets_sparse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::header::build_model_key;

    fn parse<'a>(entries: &'a [Entry], data: &'a [u8]) -> ModelHeader<'a> {
        ModelHeader::parse(entries, String::new(), data).unwrap()
    }

    #[test]
    fn test_column_concatenating_modern() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1i32.to_le_bytes()); // one output
        payload.extend_from_slice(&0i32.to_le_bytes()); // "Features"
        payload.extend_from_slice(&2i32.to_le_bytes()); // two sources
        payload.extend_from_slice(&1i32.to_le_bytes()); // "Age"
        payload.extend_from_slice(&(-1i32).to_le_bytes()); // no alias
        payload.extend_from_slice(&2i32.to_le_bytes()); // "Fare"
        payload.extend_from_slice(&1i32.to_le_bytes()); // alias "Age"
        let data = build_model_key(
            "ConcatTransform",
            0x00010003,
            &["Features", "Age", "Fare"],
            &payload,
        );
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = parse(&entries, &data);
        let concat = ColumnConcatenating::decode(&mut ctx).unwrap();
        assert_eq!(concat.columns.len(), 1);
        assert_eq!(concat.columns[0].output, "Features");
        assert_eq!(concat.columns[0].inputs[0].name, "Age");
        assert_eq!(concat.columns[0].inputs[0].alias, None);
        assert_eq!(concat.columns[0].inputs[1].alias.as_deref(), Some("Age"));
    }

    #[test]
    fn test_text_normalizing_case_mode() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.extend_from_slice(&0i32.to_le_bytes());
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.push(1); // upper
        payload.push(0);
        payload.push(1);
        payload.push(0);
        let data = build_model_key("TextNormalizerTransform", 1, &["Out", "In"], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = parse(&entries, &data);
        let normalizing = TextNormalizing::decode(&mut ctx).unwrap();
        assert_eq!(normalizing.case_mode, CaseMode::Upper);
        assert!(!normalizing.keep_diacritics);
        assert!(normalizing.keep_punctuations);
        assert!(!normalizing.keep_numbers);

        let mut bad = payload.clone();
        bad[12] = 9; // out-of-range case mode
        let data = build_model_key("TextNormalizerTransform", 1, &["Out", "In"], &bad);
        let mut ctx = parse(&entries, &data);
        assert!(TextNormalizing::decode(&mut ctx).is_err());
    }

    #[test]
    fn test_tokenizing_version_gate() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.extend_from_slice(&0i32.to_le_bytes());
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.push(1); // use marker chars
        // Pre-0x00010002: no separator flag byte in the payload.
        let data = build_model_key("CharToken", 0x00010001, &["Chars", "Text"], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = parse(&entries, &data);
        let tokenizing = TokenizingByCharacters::decode(&mut ctx).unwrap();
        assert!(tokenizing.use_marker_chars);
        assert!(tokenizing.is_separator_start_end);
    }

    #[test]
    fn test_pixel_extract_planes() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.extend_from_slice(&0i32.to_le_bytes());
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.push(0x0e); // red | green | blue
        payload.push(1); // ARGB
        payload.push(1); // float output
        payload.extend_from_slice(&0.0f32.to_le_bytes());
        payload.extend_from_slice(&(1.0f32 / 255.0).to_le_bytes());
        payload.push(0);
        let data = build_model_key("ImagePixelExtractor", 0x00010003, &["Pixels", "Image"], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = parse(&entries, &data);
        let extracting = ImagePixelExtracting::decode(&mut ctx).unwrap();
        assert_eq!(extracting.options.len(), 1);
        let option = &extracting.options[0];
        assert_eq!(option.planes, 3);
        assert_eq!(option.order, ColorOrder::Argb);
        assert!(option.output_as_float_array);
        assert!(!option.interleave_pixel_colors);
    }

    #[test]
    fn test_value_to_key_with_vocabulary() {
        // Vocabulary child: one text term map with two pool strings.
        let mut vocabulary_payload = Vec::new();
        vocabulary_payload.extend_from_slice(&1i32.to_le_bytes()); // one map
        vocabulary_payload.push(0); // text map
        vocabulary_payload.extend_from_slice(&2i32.to_le_bytes());
        vocabulary_payload.extend_from_slice(&0i32.to_le_bytes());
        vocabulary_payload.extend_from_slice(&1i32.to_le_bytes());
        let vocabulary = build_model_key(
            "TermManager",
            0x00010002,
            &["cat", "dog"],
            &vocabulary_payload,
        );

        let mut payload = Vec::new();
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.extend_from_slice(&0i32.to_le_bytes());
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.push(1); // text metadata for output
        payload.push(0); // text metadata for input
        let data = build_model_key("TermTransform", 0x00010003, &["Key", "Label"], &payload);

        let entries = vec![Entry::new("Vocabulary/Model.key", vocabulary)];
        let mut ctx = parse(&entries, &data);
        let mapping = ValueToKeyMapping::decode(&mut ctx).unwrap();
        assert_eq!(mapping.text_metadata, vec![true, false]);
        let maps = mapping.term_maps.unwrap();
        assert_eq!(
            maps,
            vec![TermMap::Text(vec!["cat".to_owned(), "dog".to_owned()])]
        );
    }

    #[test]
    fn test_binary_loader_requires_schema_blob() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes()); // threads
        payload.extend_from_slice(&(-1i32).to_le_bytes()); // no row index name
        payload.extend_from_slice(&1.0f64.to_le_bytes()); // shuffle blocks
        let data = build_model_key("BinaryLoader", 0x00010003, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = parse(&entries, &data);
        assert!(matches!(
            BinaryLoader::decode(&mut ctx),
            Err(ModelError::Format(_))
        ));
    }

    #[test]
    fn test_ngram_multi_column_unsupported() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&2i32.to_le_bytes());
        for id in [0i32, 1, 1, 0] {
            payload.extend_from_slice(&id.to_le_bytes());
        }
        let data = build_model_key("NgramTransform", 0x00010002, &["A", "B"], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = parse(&entries, &data);
        assert!(matches!(
            NgramExtracting::decode(&mut ctx),
            Err(ModelError::Unsupported(_))
        ));
    }
}
