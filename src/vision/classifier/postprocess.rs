// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Turning raw logits into labelled percentages

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ClassifierError, LabelTable};

/// Softmax over raw scores
///
/// Shifted by the maximum so large logits do not overflow.
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    if logits.is_empty() {
        return Vec::new();
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&v| (v - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.into_iter().map(|v| v / sum).collect()
}

/// Probability as a percentage rounded to two decimals
pub fn to_percentage(probability: f32) -> f64 {
    round_two_places(f64::from(probability * 100.0))
}

/// Round to two decimals, exact ties going to the even digit
pub fn round_two_places(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Label -> percentage map returned to clients
///
/// Keys serialize in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Predictions(BTreeMap<String, f64>);

impl Predictions {
    /// Apply softmax to `logits` and pair each value with its label
    pub fn from_logits(labels: &LabelTable, logits: &[f32]) -> Result<Self, ClassifierError> {
        if logits.len() != labels.len() {
            return Err(ClassifierError::OutputShape {
                expected: labels.len(),
                actual: logits.len(),
            });
        }
        if let Some(bad) = logits.iter().find(|v| !v.is_finite()) {
            return Err(ClassifierError::NonFiniteOutput(*bad));
        }

        let scores = labels
            .iter()
            .zip(softmax(logits))
            .map(|(label, p)| (label.to_string(), to_percentage(p)))
            .collect();

        Ok(Self(scores))
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all percentages (about 100 up to rounding)
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }

    /// Label with the highest score
    pub fn top(&self) -> Option<(&str, f64)> {
        self.0
            .iter()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(label, score)| (label.as_str(), *score))
    }
}
