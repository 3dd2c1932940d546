// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for the MobileNetV2 lesion classifier

use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array4;

/// Classifier input edge length
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;

/// Mean values for normalization (ImageNet)
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Std values for normalization (ImageNet)
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Resampling filter used for the fixed-size resize (bilinear)
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Shape of the tensor produced by [`preprocess_for_classification`]
pub fn classifier_input_shape() -> [usize; 4] {
    let size = CLASSIFIER_INPUT_SIZE as usize;
    [1, 3, size, size]
}

/// Preprocess an image for the lesion classifier
///
/// Steps:
/// 1. Convert to RGB
/// 2. Resize to exactly 224x224 (bilinear, aspect ratio not preserved)
/// 3. Scale to [0, 1] and normalize with ImageNet mean/std
/// 4. Lay out as NCHW [1, 3, 224, 224]
///
/// Pure function of the input pixels: the same image always yields the
/// same tensor.
pub fn preprocess_for_classification(image: &DynamicImage) -> Array4<f32> {
    let rgb = image.to_rgb8();
    let resized = imageops::resize(
        &rgb,
        CLASSIFIER_INPUT_SIZE,
        CLASSIFIER_INPUT_SIZE,
        RESIZE_FILTER,
    );

    let size = CLASSIFIER_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }

    tensor
}
