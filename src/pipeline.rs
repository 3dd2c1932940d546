// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-stage prediction pipeline: skin gate, then classifier
//!
//! decode -> gate -> (reject | preprocess -> forward -> softmax -> labels)

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, info};

use crate::vision::classifier::{ClassifierError, LesionClassifier, Predictions};
use crate::vision::image_utils::{decode_image_bytes, ImageError};
use crate::vision::preprocessing::preprocess_for_classification;
use crate::vision::skin_gate::{GateOutcome, SkinGate};

/// Why a prediction did not produce scores
#[derive(Debug, Error)]
pub enum PredictError {
    #[error(transparent)]
    Decode(#[from] ImageError),

    #[error("Image rejected by skin gate ({ratio:.2}% skin pixels)")]
    NotSkin { ratio: f64 },

    #[error(transparent)]
    Inference(#[from] ClassifierError),
}

impl PredictError {
    /// Whether the caller sent something unusable, as opposed to a server fault
    pub fn is_client_error(&self) -> bool {
        matches!(self, PredictError::NotSkin { .. })
    }
}

/// Gate + classifier, shared read-only across requests
#[derive(Clone)]
pub struct SkinLesionPredictor {
    gate: SkinGate,
    classifier: Arc<dyn LesionClassifier>,
}

impl std::fmt::Debug for SkinLesionPredictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkinLesionPredictor")
            .field("gate", &self.gate)
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl SkinLesionPredictor {
    pub fn new(classifier: Arc<dyn LesionClassifier>, gate: SkinGate) -> Self {
        Self { gate, classifier }
    }

    /// Run the gate alone on raw bytes
    pub fn check_skin(&self, image_bytes: &[u8]) -> Result<GateOutcome, PredictError> {
        Ok(self.gate.check_bytes(image_bytes)?)
    }

    /// Score an uploaded image
    ///
    /// The classifier only runs when the gate accepts. Blocking; call from a
    /// blocking-friendly context.
    pub fn predict(&self, image_bytes: &[u8]) -> Result<Predictions, PredictError> {
        let start = Instant::now();

        let (image, info) = decode_image_bytes(image_bytes)?;
        debug!(
            "Decoded image: {}x{} {:?}, {} bytes",
            info.width, info.height, info.format, info.size_bytes
        );

        let outcome = self.gate.evaluate(&image);
        if !outcome.accepted {
            return Err(PredictError::NotSkin {
                ratio: outcome.ratio,
            });
        }

        let tensor = preprocess_for_classification(&image);
        let logits = self.classifier.forward(&tensor)?;
        let predictions = Predictions::from_logits(self.classifier.labels(), &logits)?;

        if let Some((label, score)) = predictions.top() {
            info!(
                "Prediction complete: top={} ({:.2}%), skin={:.2}%, {}ms",
                label,
                score,
                outcome.ratio,
                start.elapsed().as_millis()
            );
        }

        Ok(predictions)
    }
}
