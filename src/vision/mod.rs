// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based image analysis
//!
//! This module provides:
//! - Upload decoding with format sniffing
//! - A heuristic HSV skin-presence gate
//! - Skin lesion classification via a MobileNetV2 ONNX model

pub mod classifier;
pub mod image_utils;
pub mod preprocessing;
pub mod skin_gate;

pub use classifier::{
    ClassifierError, LabelTable, LesionClassifier, OnnxLesionClassifier, Predictions,
};
pub use image_utils::{decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use preprocessing::preprocess_for_classification;
pub use skin_gate::{GateOutcome, HsvRange, SkinGate, SkinGateConfig, SkinMask};
