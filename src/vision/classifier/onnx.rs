// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! MobileNetV2 lesion classifier on ONNX Runtime
//!
//! The model is an eval-mode ONNX export of the PyTorch classifier with a
//! 7-logit head. Runs on CPU only.

use anyhow::{Context, Result};
use ndarray::Array4;
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use super::labels::LABELS_METADATA_KEY;
use super::{ClassifierError, LabelTable, LesionClassifier};
use crate::vision::preprocessing::classifier_input_shape;

/// Default intra-op thread count for the classifier session
pub const DEFAULT_INTRA_THREADS: usize = 4;

/// ONNX Runtime backed [`LesionClassifier`]
#[derive(Clone)]
pub struct OnnxLesionClassifier {
    /// ONNX Runtime session (`run` needs exclusive access)
    session: Arc<Mutex<Session>>,
    /// Model input name
    input_name: String,
    /// Output labels, validated against the model
    labels: LabelTable,
    /// Where the model was loaded from
    model_path: PathBuf,
}

impl std::fmt::Debug for OnnxLesionClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxLesionClassifier")
            .field("input_name", &self.input_name)
            .field("labels", &self.labels)
            .field("model_path", &self.model_path)
            .finish_non_exhaustive()
    }
}

impl OnnxLesionClassifier {
    /// Load the classifier and validate it against `labels`
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - A probe inference fails
    /// - The model's output width differs from the label count
    /// - The model's `labels` metadata disagrees with the table
    pub fn new<P: AsRef<Path>>(
        model_path: P,
        labels: LabelTable,
        intra_threads: usize,
    ) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("Classifier model not found: {}", model_path.display());
        }

        info!("Loading lesion classifier from {}", model_path.display());

        let mut session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(intra_threads.max(1))
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load classifier model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "input".to_string());

        debug!("Classifier input: {}", input_name);

        let metadata_labels = session
            .metadata()
            .ok()
            .and_then(|metadata| metadata.custom(LABELS_METADATA_KEY).ok().flatten());
        labels.validate_metadata(metadata_labels.as_deref())?;

        // Probe with a blank image to learn the output width
        let output_dim = {
            let probe = Array4::<f32>::zeros(classifier_input_shape());
            let outputs = session
                .run(ort::inputs![input_name.as_str() => Value::from_array(probe)?])
                .context("Classifier probe inference failed")?;
            let output_tensor = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract probe output tensor")?;
            debug!("Classifier output shape: {:?}", output_tensor.shape());
            output_tensor.len()
        };
        labels.validate_output_dim(output_dim)?;

        info!(
            "✅ Lesion classifier loaded ({} classes, CPU-only)",
            labels.len()
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            labels,
            model_path: model_path.to_path_buf(),
        })
    }
}

impl LesionClassifier for OnnxLesionClassifier {
    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        if input.shape() != classifier_input_shape() {
            return Err(ClassifierError::InputShape(input.shape().to_vec()));
        }

        let input_value = Value::from_array(input.to_owned())?;

        let mut session = self.session.lock().map_err(|_| ClassifierError::Poisoned)?;
        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_value])?;
        let logits: Vec<f32> = outputs[0].try_extract_array::<f32>()?.iter().copied().collect();

        if logits.len() != self.labels.len() {
            return Err(ClassifierError::OutputShape {
                expected: self.labels.len(),
                actual: logits.len(),
            });
        }

        Ok(logits)
    }

    fn name(&self) -> &str {
        "mobilenet_v2"
    }
}
