// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ordered class label table
//!
//! Label `i` names model output `i`. The table is checked once at startup
//! against the loaded model so a mismatched artifact never serves traffic.

use std::collections::HashSet;
use std::path::Path;

use super::ClassifierError;

/// HAM10000 label order used by the bundled MobileNetV2 export
pub const DEFAULT_LABELS: [&str; 7] = ["akiec", "bcc", "bkl", "df", "nv", "vasc", "mel"];

/// Model metadata key that may carry the training-time label order
pub const LABELS_METADATA_KEY: &str = "labels";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl Default for LabelTable {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl LabelTable {
    /// Build a table from an ordered list of names
    ///
    /// Rejects empty tables, blank names and duplicates.
    pub fn new(labels: Vec<String>) -> Result<Self, ClassifierError> {
        if labels.is_empty() {
            return Err(ClassifierError::InvalidLabels(
                "label table is empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if label.trim().is_empty() {
                return Err(ClassifierError::InvalidLabels(
                    "label names must not be blank".to_string(),
                ));
            }
            if !seen.insert(label.as_str()) {
                return Err(ClassifierError::InvalidLabels(format!(
                    "duplicate label '{}'",
                    label
                )));
            }
        }

        Ok(Self { labels })
    }

    /// Load a table from a JSON array of strings
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ClassifierError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            ClassifierError::InvalidLabels(format!("cannot read {}: {}", path.display(), e))
        })?;
        let labels: Vec<String> = serde_json::from_str(&data).map_err(|e| {
            ClassifierError::InvalidLabels(format!(
                "{} is not a JSON array of strings: {}",
                path.display(),
                e
            ))
        })?;
        Self::new(labels)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// The table must name every model output, no more and no fewer
    pub fn validate_output_dim(&self, output_dim: usize) -> Result<(), ClassifierError> {
        if self.labels.len() != output_dim {
            return Err(ClassifierError::LabelMismatch(format!(
                "{} labels configured but model produces {} outputs",
                self.labels.len(),
                output_dim
            )));
        }
        Ok(())
    }

    /// Compare against a comma-separated label list from model metadata
    ///
    /// `None` means the model carries no label metadata and nothing can be
    /// checked.
    pub fn validate_metadata(&self, metadata_labels: Option<&str>) -> Result<(), ClassifierError> {
        let Some(raw) = metadata_labels else {
            return Ok(());
        };

        let declared: Vec<&str> = raw.split(',').map(str::trim).collect();
        if !declared.iter().copied().eq(self.iter()) {
            return Err(ClassifierError::LabelMismatch(format!(
                "model metadata declares labels [{}] but table is [{}]",
                declared.join(", "),
                self.labels.join(", ")
            )));
        }
        Ok(())
    }
}
