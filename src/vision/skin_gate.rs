// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Heuristic skin-presence gate
//!
//! Converts an image to 8-bit HSV, marks pixels whose hue/saturation/value
//! fall inside a warm skin-tone range, and accepts the image when the marked
//! share exceeds a percentage threshold.
//!
//! This is a coarse pre-filter, not a classifier: wood, sand and other
//! warm-toned surfaces pass it as readily as skin does.

use image::{DynamicImage, Rgb, RgbImage};
use tracing::debug;

use super::image_utils::{decode_image_bytes, ImageError};

/// Fixed-point shift used by the 8-bit HSV conversion tables
const HSV_SHIFT: u32 = 12;

/// Hue range for 8-bit HSV is [0, 180)
const HUE_RANGE: i32 = 180;

/// Default lower HSV bound for skin-like pixels
pub const DEFAULT_SKIN_LOWER: [u8; 3] = [0, 20, 70];

/// Default upper HSV bound for skin-like pixels
pub const DEFAULT_SKIN_UPPER: [u8; 3] = [20, 255, 255];

/// Default minimum skin percentage (exclusive)
pub const DEFAULT_MIN_SKIN_PERCENT: f64 = 5.0;

/// Inclusive HSV bounds, each channel on the 8-bit scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }
}

impl Default for HsvRange {
    fn default() -> Self {
        Self {
            lower: DEFAULT_SKIN_LOWER,
            upper: DEFAULT_SKIN_UPPER,
        }
    }
}

/// Gate tuning
///
/// The defaults are uncalibrated; they are kept as-is so the gate's
/// sensitivity stays where it has always been.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinGateConfig {
    /// Accepted HSV range
    pub range: HsvRange,
    /// Images must have strictly more than this percentage of skin pixels
    pub min_skin_percent: f64,
}

impl Default for SkinGateConfig {
    fn default() -> Self {
        Self {
            range: HsvRange::default(),
            min_skin_percent: DEFAULT_MIN_SKIN_PERCENT,
        }
    }
}

/// Convert one RGB pixel to 8-bit HSV (H in [0,180), S and V in [0,255])
///
/// Integer arithmetic with rounded reciprocal tables, matching the common
/// computer-vision convention for 8-bit images so thresholds carry over.
pub fn rgb_to_hsv(pixel: Rgb<u8>) -> [u8; 3] {
    let [r, g, b] = pixel.0.map(i32::from);

    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let round_shift = 1 << (HSV_SHIFT - 1);

    let s = (diff * sat_divisor(v) + round_shift) >> HSV_SHIFT;

    let h = if v == r {
        g - b
    } else if v == g {
        b - r + 2 * diff
    } else {
        r - g + 4 * diff
    };
    let mut h = (h * hue_divisor(diff) + round_shift) >> HSV_SHIFT;
    if h < 0 {
        h += HUE_RANGE;
    }

    [h as u8, s as u8, v as u8]
}

/// round((255 << 12) / v), 0 for black
fn sat_divisor(v: i32) -> i32 {
    if v == 0 {
        return 0;
    }
    ((255i64 << HSV_SHIFT) as f64 / v as f64).round() as i32
}

/// round((180 << 12) / (6 * diff)), 0 for grey
fn hue_divisor(diff: i32) -> i32 {
    if diff == 0 {
        return 0;
    }
    (((HUE_RANGE as i64) << HSV_SHIFT) as f64 / (6.0 * diff as f64)).round() as i32
}

/// Binary mask of skin-like pixels
#[derive(Debug, Clone)]
pub struct SkinMask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl SkinMask {
    /// Build the mask by testing every pixel against `range`
    pub fn from_rgb(image: &RgbImage, range: &HsvRange) -> Self {
        let bits = image
            .pixels()
            .map(|pixel| range.contains(rgb_to_hsv(*pixel)))
            .collect();

        Self {
            width: image.width(),
            height: image.height(),
            bits,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Whether the pixel at (x, y) is skin-like
    pub fn get(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.bits[(y as usize) * (self.width as usize) + x as usize]
    }

    /// Number of set pixels
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&set| set).count()
    }

    /// Percentage of set pixels, always within [0, 100]
    pub fn ratio(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        self.count() as f64 / self.bits.len() as f64 * 100.0
    }
}

/// Result of running the gate on one image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateOutcome {
    /// Skin pixel percentage
    pub ratio: f64,
    /// Whether the image may proceed to classification
    pub accepted: bool,
}

/// Skin-presence gate
#[derive(Debug, Clone, Copy, Default)]
pub struct SkinGate {
    config: SkinGateConfig,
}

impl SkinGate {
    pub fn new(config: SkinGateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SkinGateConfig {
        &self.config
    }

    /// Build the skin mask for a decoded image
    pub fn mask(&self, image: &DynamicImage) -> SkinMask {
        SkinMask::from_rgb(&image.to_rgb8(), &self.config.range)
    }

    /// Decide whether a decoded image is plausibly a photo of skin
    pub fn evaluate(&self, image: &DynamicImage) -> GateOutcome {
        let ratio = self.mask(image).ratio();
        let accepted = ratio > self.config.min_skin_percent;

        debug!(
            "Skin gate: {:.2}% skin pixels (threshold {:.2}%) -> {}",
            ratio,
            self.config.min_skin_percent,
            if accepted { "accepted" } else { "rejected" }
        );

        GateOutcome { ratio, accepted }
    }

    /// Decode `bytes` and evaluate the gate on the result
    ///
    /// Undecodable input is an error, never a rejection.
    pub fn check_bytes(&self, bytes: &[u8]) -> Result<GateOutcome, ImageError> {
        let (image, _info) = decode_image_bytes(bytes)?;
        Ok(self.evaluate(&image))
    }
}
