// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict response types

use serde::{Deserialize, Serialize};

use crate::vision::Predictions;

/// Response from POST /predict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Label -> percentage (0-100, two decimals)
    pub predictions: Predictions,
}

impl PredictResponse {
    pub fn new(predictions: Predictions) -> Self {
        Self { predictions }
    }
}
