use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::math::tensor::Tensor;
use crate::sample::sample::Sample;

/// Suffix tying a mask field to its label ("depth" pairs with "depth_mask").
pub const MASK_SUFFIX: &str = "_mask";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SpecError {
    #[error("field \"{0}\" is declared more than once")]
    Duplicate(String),
    #[error("mask \"{mask}\" is bound to undeclared label \"{label}\"")]
    UnknownLabel { label: String, mask: String },
    #[error("schema declares no labels")]
    NoLabels,
    #[error("label \"{0}\" is missing from the sample")]
    MissingLabel(String),
    #[error("field \"{0}\" matches no declared role")]
    Unclassified(String),
    #[error("sample is missing declared field \"{0}\"")]
    MissingField(String),
}

/// Role classification of a sample's fields into inputs, labels and masks.
///
/// The schema is explicit: input names, label names and the label-to-mask
/// pairing are declared once and validated up front, so nothing downstream
/// depends on the iteration order of a field map. [`SampleSpec::infer`]
/// offers the conventional shortcut of deriving the schema from one
/// representative sample's field names plus the declared label list.
///
/// Invariant: the model's predictions correspond positionally to
/// [`SampleSpec::labels`] order, and the schema is stable for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleSpec {
    inputs: Vec<String>,
    labels: Vec<String>,
    masks: Vec<String>,
    mask_index: BTreeMap<String, usize>,
}

impl SampleSpec {
    /// Builds a validated schema from explicit role lists.
    ///
    /// `label_masks` pairs a label name with its mask field name; labels
    /// absent from it are unmasked. Fails on duplicate names across roles or
    /// a mask bound to an undeclared label.
    pub fn new(
        inputs: Vec<String>,
        labels: Vec<String>,
        label_masks: Vec<(String, String)>,
    ) -> Result<SampleSpec, SpecError> {
        if labels.is_empty() {
            return Err(SpecError::NoLabels);
        }

        let mut masks = Vec::with_capacity(label_masks.len());
        let mut mask_index = BTreeMap::new();
        for (label, mask) in label_masks {
            if !labels.contains(&label) {
                return Err(SpecError::UnknownLabel { label, mask });
            }
            mask_index.insert(label, masks.len());
            masks.push(mask);
        }

        let mut seen = BTreeSet::new();
        for name in inputs.iter().chain(labels.iter()).chain(masks.iter()) {
            if !seen.insert(name.clone()) {
                return Err(SpecError::Duplicate(name.clone()));
            }
        }

        Ok(SampleSpec {
            inputs,
            labels,
            masks,
            mask_index,
        })
    }

    /// Derives the schema from one sample's field-name set.
    ///
    /// `label_names` must be declared; a field named `"{label}_mask"` becomes
    /// that label's mask, and every remaining field is an input. Field names
    /// are visited in sorted order so the derived input list is
    /// deterministic. Fails if a declared label is absent or a `*_mask`
    /// field pairs with no declared label (classification is ambiguous).
    pub fn infer<'a>(
        field_names: impl IntoIterator<Item = &'a str>,
        label_names: &[&str],
    ) -> Result<SampleSpec, SpecError> {
        let fields: BTreeSet<&str> = field_names.into_iter().collect();

        let mut labels = Vec::with_capacity(label_names.len());
        let mut label_masks = Vec::new();
        for &label in label_names {
            if !fields.contains(label) {
                return Err(SpecError::MissingLabel(label.to_string()));
            }
            labels.push(label.to_string());
            let mask = format!("{label}{MASK_SUFFIX}");
            if fields.contains(mask.as_str()) {
                label_masks.push((label.to_string(), mask));
            }
        }

        let mut inputs = Vec::new();
        for name in fields {
            if label_names.contains(&name) {
                continue;
            }
            if let Some(stem) = name.strip_suffix(MASK_SUFFIX) {
                if label_names.contains(&stem) {
                    continue;
                }
                // A mask-shaped name with no matching label is ambiguous.
                return Err(SpecError::Unclassified(name.to_string()));
            }
            inputs.push(name.to_string());
        }

        SampleSpec::new(inputs, labels, label_masks)
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn masks(&self) -> &[String] {
        &self.masks
    }

    pub fn has_mask(&self, label: &str) -> bool {
        self.mask_index.contains_key(label)
    }

    /// Position of `label`'s mask within [`SampleSpec::masks`], if any.
    pub fn mask_index(&self, label: &str) -> Option<usize> {
        self.mask_index.get(label).copied()
    }

    /// Checks that every declared field is present and every sample field is
    /// classified by some role.
    pub fn check_sample(&self, sample: &Sample) -> Result<(), SpecError> {
        for name in self
            .inputs
            .iter()
            .chain(self.labels.iter())
            .chain(self.masks.iter())
        {
            if !sample.contains(name) {
                return Err(SpecError::MissingField(name.clone()));
            }
        }
        for name in sample.field_names() {
            if !self.inputs.iter().any(|n| n == name)
                && !self.labels.iter().any(|n| n == name)
                && !self.masks.iter().any(|n| n == name)
            {
                return Err(SpecError::Unclassified(name.to_string()));
            }
        }
        Ok(())
    }

    /// Extracts `(inputs, labels, masks)` tensors in schema order.
    pub fn split(&self, sample: &Sample) -> Result<(Vec<Tensor>, Vec<Tensor>, Vec<Tensor>), SpecError> {
        let extract = |names: &[String]| -> Result<Vec<Tensor>, SpecError> {
            names
                .iter()
                .map(|name| {
                    sample
                        .get(name)
                        .cloned()
                        .ok_or_else(|| SpecError::MissingField(name.clone()))
                })
                .collect()
        };
        Ok((
            extract(&self.inputs)?,
            extract(&self.labels)?,
            extract(&self.masks)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn infer_classifies_roles() {
        let spec = SampleSpec::infer(
            ["image", "depth", "depth_mask", "score"],
            &["depth", "score"],
        )
        .unwrap();
        assert_eq!(spec.inputs(), &["image".to_string()]);
        assert_eq!(spec.labels(), &names(&["depth", "score"]));
        assert_eq!(spec.masks(), &names(&["depth_mask"]));
        assert!(spec.has_mask("depth"));
        assert!(!spec.has_mask("score"));
        assert_eq!(spec.mask_index("depth"), Some(0));
        assert_eq!(spec.mask_index("score"), None);
    }

    #[test]
    fn infer_rejects_orphan_mask() {
        let err = SampleSpec::infer(["image", "depth", "weird_mask"], &["depth"]).unwrap_err();
        assert_eq!(err, SpecError::Unclassified("weird_mask".to_string()));
    }

    #[test]
    fn infer_rejects_missing_label() {
        let err = SampleSpec::infer(["image"], &["depth"]).unwrap_err();
        assert_eq!(err, SpecError::MissingLabel("depth".to_string()));
    }

    #[test]
    fn new_rejects_duplicates_across_roles() {
        let err = SampleSpec::new(
            names(&["depth"]),
            names(&["depth"]),
            vec![],
        )
        .unwrap_err();
        assert_eq!(err, SpecError::Duplicate("depth".to_string()));
    }

    #[test]
    fn new_rejects_mask_for_unknown_label() {
        let err = SampleSpec::new(
            names(&["image"]),
            names(&["depth"]),
            vec![("edges".to_string(), "edges_mask".to_string())],
        )
        .unwrap_err();
        assert!(matches!(err, SpecError::UnknownLabel { .. }));
    }

    #[test]
    fn split_preserves_schema_order() {
        let spec = SampleSpec::new(
            names(&["image"]),
            names(&["depth", "score"]),
            vec![("depth".to_string(), "depth_mask".to_string())],
        )
        .unwrap();
        let sample = Sample::new()
            .with_field("score", Tensor::from_vec(vec![4.0]))
            .with_field("image", Tensor::from_vec(vec![1.0, 2.0]))
            .with_field("depth", Tensor::from_vec(vec![3.0]))
            .with_field("depth_mask", Tensor::from_vec(vec![1.0]));
        spec.check_sample(&sample).unwrap();

        let (inputs, labels, masks) = spec.split(&sample).unwrap();
        assert_eq!(inputs[0].data, vec![1.0, 2.0]);
        assert_eq!(labels[0].data, vec![3.0]);
        assert_eq!(labels[1].data, vec![4.0]);
        assert_eq!(masks[0].data, vec![1.0]);
    }

    #[test]
    fn check_sample_flags_stray_field() {
        let spec = SampleSpec::new(names(&["image"]), names(&["depth"]), vec![]).unwrap();
        let sample = Sample::new()
            .with_field("image", Tensor::zeros(&[2]))
            .with_field("depth", Tensor::zeros(&[2]))
            .with_field("extra", Tensor::zeros(&[2]));
        assert_eq!(
            spec.check_sample(&sample).unwrap_err(),
            SpecError::Unclassified("extra".to_string())
        );
    }
}
