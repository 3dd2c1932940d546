// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Skin lesion classifier
//!
//! Components:
//! - `labels` - Ordered label table, validated against the model at startup
//! - `onnx` - MobileNetV2 ONNX Runtime session (CPU)
//! - `postprocess` - Softmax and percentage mapping

pub mod labels;
pub mod onnx;
pub mod postprocess;

use ndarray::Array4;
use thiserror::Error;

pub use labels::{LabelTable, DEFAULT_LABELS};
pub use onnx::OnnxLesionClassifier;
pub use postprocess::{softmax, Predictions};

/// Errors raised by the classifier and its label table
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Invalid input shape: {0:?}, expected [1, 3, 224, 224]")]
    InputShape(Vec<usize>),

    #[error("Model produced {actual} outputs, expected {expected}")]
    OutputShape { expected: usize, actual: usize },

    #[error("Model produced a non-finite score: {0}")]
    NonFiniteOutput(f32),

    #[error("Inference failed: {0}")]
    Runtime(#[from] ort::Error),

    #[error("Classifier session lock poisoned")]
    Poisoned,

    #[error("Invalid label table: {0}")]
    InvalidLabels(String),

    #[error("Label table does not match model: {0}")]
    LabelMismatch(String),
}

/// A frozen image classifier
///
/// Implementations are immutable once built and shared across requests.
pub trait LesionClassifier: Send + Sync {
    /// Labels for each output index
    fn labels(&self) -> &LabelTable;

    /// Run one forward pass on a [1, 3, 224, 224] tensor and return raw logits
    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError>;

    /// Model name for logging
    fn name(&self) -> &str {
        "lesion-classifier"
    }
}
