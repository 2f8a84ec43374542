//! Gradient-boosted and random-forest tree ensembles.
//!
//! The ensemble layout is shared across the FastTree and LightGBM families;
//! only the versions that gate optional sections differ per family.

use crate::header::ModelHeader;
use crate::util::{count, expect_float_size, f32_array, f64_array, i32_array, u32_array};
use crate::ModelError;

/// Version thresholds that gate optional ensemble sections, fixed per
/// signature family.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeVersions {
    pub num_features: u32,
    pub default_values: u32,
    pub categorical_splits: u32,
}

pub(crate) const FAST_TREE: TreeVersions = TreeVersions {
    num_features: 0x00010002,
    default_values: 0x00010004,
    categorical_splits: 0x00010005,
};

pub(crate) const TWEEDIE: TreeVersions = TreeVersions {
    num_features: 0x00010001,
    default_values: 0x00010002,
    categorical_splits: 0x00010003,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    Regression,
    /// Quantile regression trees from random forests; same serialized
    /// layout as regression trees.
    FastForest,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoricalSplit {
    pub node: i32,
    pub features: Vec<i32>,
    pub range: [i32; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub kind: TreeKind,
    pub num_leaves: i32,
    pub max_output: f64,
    pub weight: f64,
    pub lte_child: Vec<i32>,
    pub gt_child: Vec<i32>,
    pub split_features: Vec<i32>,
    pub categorical_splits: Vec<CategoricalSplit>,
    pub thresholds: Vec<u32>,
    pub raw_thresholds: Vec<f32>,
    pub default_value_for_missing: Option<Vec<f32>>,
    pub leaf_values: Vec<f64>,
    pub split_gain: Vec<f64>,
    pub gain_p_value: Vec<f64>,
    pub previous_leaf_value: Vec<f64>,
}

impl Tree {
    fn decode(
        ctx: &mut ModelHeader<'_>,
        kind: TreeKind,
        using_default_values: bool,
        categorical: bool,
    ) -> Result<Self, ModelError> {
        let reader = &mut ctx.reader;
        let num_leaves = reader.i32()?;
        let max_output = reader.f64()?;
        let weight = reader.f64()?;
        let lte_child = i32_array(reader)?;
        let gt_child = i32_array(reader)?;
        let split_features = i32_array(reader)?;
        let mut categorical_splits = Vec::new();
        if categorical {
            let nodes = i32_array(reader)?;
            for node in nodes {
                let features = i32_array(reader)?;
                let range = reader.i32s(2)?;
                categorical_splits.push(CategoricalSplit {
                    node,
                    features,
                    range: [range[0], range[1]],
                });
            }
        }
        let thresholds = u32_array(reader)?;
        let raw_thresholds = f32_array(reader)?;
        let default_value_for_missing = if using_default_values {
            Some(f32_array(reader)?)
        } else {
            None
        };
        let leaf_values = f64_array(reader)?;
        let split_gain = f64_array(reader)?;
        let gain_p_value = f64_array(reader)?;
        let previous_leaf_value = f64_array(reader)?;
        Ok(Self {
            kind,
            num_leaves,
            max_output,
            weight,
            lte_child,
            gt_child,
            split_features,
            categorical_splits,
            thresholds,
            raw_thresholds,
            default_value_for_missing,
            leaf_values,
            split_gain,
            gain_p_value,
            previous_leaf_value,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsemble {
    pub trees: Vec<Tree>,
    pub bias: f64,
    pub first_input_initialization_content: Option<String>,
}

impl TreeEnsemble {
    fn decode(
        ctx: &mut ModelHeader<'_>,
        using_default_values: bool,
        categorical: bool,
    ) -> Result<Self, ModelError> {
        let num_trees = count(ctx.reader.i32()?)?;
        let mut trees = Vec::with_capacity(num_trees);
        for _ in 0..num_trees {
            let kind = match ctx.reader.u8()? {
                0 => TreeKind::Regression,
                2 => TreeKind::FastForest,
                1 => {
                    return Err(ModelError::Unsupported(
                        "affine regression tree".to_owned(),
                    ));
                }
                tag => {
                    return Err(ModelError::Format(format!(
                        "unknown ensemble tree type {tag}"
                    )));
                }
            };
            trees.push(Tree::decode(ctx, kind, using_default_values, categorical)?);
        }
        let bias = ctx.reader.f64()?;
        let first_input_initialization_content = ctx.opt_string()?;
        Ok(Self {
            trees,
            bias,
            first_input_initialization_content,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeEnsembleParameters {
    pub ensemble: TreeEnsemble,
    pub inner_options: Option<String>,
    pub num_features: Option<i32>,
}

impl TreeEnsembleParameters {
    pub(crate) fn decode(
        ctx: &mut ModelHeader<'_>,
        versions: TreeVersions,
    ) -> Result<Self, ModelError> {
        expect_float_size(&mut ctx.reader)?;
        let using_default_values = ctx.model_version_written >= versions.default_values;
        let categorical = ctx.model_version_written >= versions.categorical_splits;
        let ensemble = TreeEnsemble::decode(ctx, using_default_values, categorical)?;
        let inner_options = ctx.opt_string()?;
        let num_features = if ctx.model_version_written >= versions.num_features {
            Some(ctx.reader.i32()?)
        } else {
            None
        };
        Ok(Self {
            ensemble,
            inner_options,
            num_features,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::Entry;
    use crate::header::build_model_key;

    fn push_i32s(payload: &mut Vec<u8>, values: &[i32]) {
        payload.extend_from_slice(&(values.len() as i32).to_le_bytes());
        for value in values {
            payload.extend_from_slice(&value.to_le_bytes());
        }
    }

    fn push_f64s(payload: &mut Vec<u8>, values: &[f64]) {
        payload.extend_from_slice(&(values.len() as i32).to_le_bytes());
        for value in values {
            payload.extend_from_slice(&value.to_le_bytes());
        }
    }

    // One single-split regression tree at version 0x00010002 with FastTree
    // gates: feature count present, no default values, no categorical data.
    #[test]
    fn test_fast_tree_ensemble() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes()); // cbFloat
        payload.extend_from_slice(&1i32.to_le_bytes()); // one tree
        payload.push(0); // regression
        payload.extend_from_slice(&2i32.to_le_bytes()); // leaves
        payload.extend_from_slice(&0.9f64.to_le_bytes()); // max output
        payload.extend_from_slice(&1.0f64.to_le_bytes()); // weight
        push_i32s(&mut payload, &[-1]); // lte child
        push_i32s(&mut payload, &[-2]); // gt child
        push_i32s(&mut payload, &[7]); // split feature
        push_i32s(&mut payload, &[42]); // thresholds (u32 layout matches)
        payload.extend_from_slice(&1i32.to_le_bytes()); // raw thresholds
        payload.extend_from_slice(&0.5f32.to_le_bytes());
        push_f64s(&mut payload, &[-0.9, 0.9]); // leaf values
        push_f64s(&mut payload, &[0.1]); // split gain
        push_f64s(&mut payload, &[0.05]); // gain p-value
        push_f64s(&mut payload, &[0.0]); // previous leaf value
        payload.extend_from_slice(&0.25f64.to_le_bytes()); // ensemble bias
        payload.extend_from_slice(&(-1i32).to_le_bytes()); // no init content
        payload.extend_from_slice(&(-1i32).to_le_bytes()); // no inner options
        payload.extend_from_slice(&10i32.to_le_bytes()); // feature count

        let data = build_model_key("FastTreeBinaryExec", 0x00010002, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        let model = TreeEnsembleParameters::decode(&mut ctx, FAST_TREE).unwrap();
        assert_eq!(model.ensemble.trees.len(), 1);
        let tree = &model.ensemble.trees[0];
        assert_eq!(tree.kind, TreeKind::Regression);
        assert_eq!(tree.split_features, vec![7]);
        assert_eq!(tree.thresholds, vec![42]);
        assert_eq!(tree.default_value_for_missing, None);
        assert_eq!(tree.leaf_values, vec![-0.9, 0.9]);
        assert_eq!(model.ensemble.bias, 0.25);
        assert_eq!(model.num_features, Some(10));
    }

    #[test]
    fn test_affine_tree_rejected() {
        let mut payload = Vec::new();
        payload.extend_from_slice(&4i32.to_le_bytes());
        payload.extend_from_slice(&1i32.to_le_bytes());
        payload.push(1); // affine
        let data = build_model_key("FastTreeTweedieExec", 0x00010001, &[], &payload);
        let entries: Vec<Entry> = Vec::new();
        let mut ctx = ModelHeader::parse(&entries, String::new(), &data).unwrap();
        assert!(matches!(
            TreeEnsembleParameters::decode(&mut ctx, TWEEDIE),
            Err(ModelError::Unsupported(_))
        ));
    }
}
