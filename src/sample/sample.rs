use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::tensor::Tensor;

/// One unit of training data: a mapping from field name to array value.
///
/// As produced by a sample source, fields carry no batch dimension; the
/// fetcher calls [`Sample::batch_of_one`] so every field enters the model
/// with a leading dimension of size 1. Fields are kept in a `BTreeMap` so
/// iteration order never depends on insertion or hashing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sample {
    fields: BTreeMap<String, Tensor>,
}

impl Sample {
    pub fn new() -> Sample {
        Sample {
            fields: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Tensor) {
        self.fields.insert(name.into(), value);
    }

    /// Builder-style insert, convenient when scripting samples.
    pub fn with_field(mut self, name: impl Into<String>, value: Tensor) -> Sample {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Tensor> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Gives every field a new leading dimension of size 1 (unit batch).
    pub fn batch_of_one(&mut self) {
        for value in self.fields.values_mut() {
            *value = value.unsqueeze0();
        }
    }
}
