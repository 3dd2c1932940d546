// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Predict endpoint tests for POST /predict
//!
//! These tests drive the full router with a counting classifier double so
//! no model file is needed. They verify that:
//! - Missing or non-multipart uploads return 400 "No file uploaded"
//! - Non-skin images return 400 and never reach the classifier
//! - Skin images return all 7 labels with percentages summing to ~100
//! - Undecodable uploads and worker panics return 500 "An error occurred: ..."
//! - Uploads are not capped unless a limit is configured

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
};
use fabstir_skin_node::{
    api::{create_app, AppState},
    pipeline::SkinLesionPredictor,
    vision::{ClassifierError, LabelTable, LesionClassifier, SkinGate},
};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use ndarray::Array4;
use serde_json::Value;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

const BOUNDARY: &str = "----FabstirSkinNodeBoundary";

const SKIN_TONE: [u8; 3] = [220, 170, 150];

/// Classifier double that returns fixed logits and counts forward passes
struct CountingClassifier {
    labels: LabelTable,
    logits: Vec<f32>,
    calls: AtomicUsize,
}

impl CountingClassifier {
    fn new(logits: Vec<f32>) -> Arc<Self> {
        Arc::new(Self {
            labels: LabelTable::default(),
            logits,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LesionClassifier for CountingClassifier {
    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn forward(&self, _input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.logits.clone())
    }
}

/// Classifier double whose forward pass always fails
struct FailingClassifier {
    labels: LabelTable,
}

impl LesionClassifier for FailingClassifier {
    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn forward(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        Err(ClassifierError::InputShape(vec![input.len()]))
    }
}

/// Classifier double whose forward pass panics
struct PanickingClassifier {
    labels: LabelTable,
}

impl LesionClassifier for PanickingClassifier {
    fn labels(&self) -> &LabelTable {
        &self.labels
    }

    fn forward(&self, _input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        panic!("session exploded");
    }
}

/// Helper: AppState around a classifier double
fn setup_state(classifier: Arc<dyn LesionClassifier>) -> AppState {
    AppState::new(SkinLesionPredictor::new(classifier, SkinGate::default()))
}

/// Helper: solid-colour image in the given format
fn solid_image(width: u32, height: u32, rgb: [u8; 3], format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(rgb)))
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

fn solid_png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    solid_image(width, height, rgb, ImageFormat::Png)
}

/// Helper: multipart body with one file part
fn multipart_body(field_name: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field_name, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn predict_request(body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/predict")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(state: AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = create_app(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[cfg(test)]
mod predict_endpoint_tests {
    use super::*;

    // =============================================================================
    // Client Errors
    // =============================================================================

    /// Test 1: Multipart body without a `file` part
    #[tokio::test]
    async fn test_missing_file_field() {
        let classifier = CountingClassifier::new(vec![0.0; 7]);
        let state = setup_state(classifier.clone());

        let body = multipart_body("image", "skin.png", &solid_png(8, 8, SKIN_TONE));
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file uploaded");
        assert_eq!(classifier.calls(), 0);
    }

    /// Test 2: Request that is not multipart at all
    #[tokio::test]
    async fn test_non_multipart_request() {
        let state = setup_state(CountingClassifier::new(vec![0.0; 7]));

        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"file": "abc"}"#))
            .unwrap();
        let (status, json) = send(state, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file uploaded");
    }

    /// Test 3: All-black 50x50 image is rejected by the gate
    #[tokio::test]
    async fn test_black_image_rejected() {
        let classifier = CountingClassifier::new(vec![0.0; 7]);
        let state = setup_state(classifier.clone());

        let body = multipart_body("file", "black.png", &solid_png(50, 50, [0, 0, 0]));
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            json["error"],
            "Uploaded image does not appear to be a skin-related image"
        );
        assert_eq!(classifier.calls(), 0, "classifier must not run on rejected images");
    }

    /// Test 4: Blue sky is not skin either
    #[tokio::test]
    async fn test_cool_toned_image_rejected() {
        let classifier = CountingClassifier::new(vec![0.0; 7]);
        let state = setup_state(classifier.clone());

        let body = multipart_body("file", "sky.png", &solid_png(64, 32, [90, 150, 230]));
        let (status, _json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(classifier.calls(), 0);
    }

    // =============================================================================
    // Success
    // =============================================================================

    /// Test 5: Skin-toned 224x224 image yields all seven labels
    #[tokio::test]
    async fn test_skin_image_returns_predictions() {
        let classifier = CountingClassifier::new(vec![0.3, -1.2, 0.8, -0.5, 2.4, -2.0, 1.1]);
        let state = setup_state(classifier.clone());

        let body = multipart_body("file", "lesion.png", &solid_png(224, 224, SKIN_TONE));
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(classifier.calls(), 1);

        let predictions = json["predictions"].as_object().expect("predictions object");
        let mut keys: Vec<&str> = predictions.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["akiec", "bcc", "bkl", "df", "mel", "nv", "vasc"]);

        let mut total = 0.0;
        for (label, value) in predictions {
            let pct = value.as_f64().expect("numeric percentage");
            assert!((0.0..=100.0).contains(&pct), "{} out of range: {}", label, pct);
            total += pct;
        }
        assert!((total - 100.0).abs() <= 0.7, "percentages sum to {}", total);

        // Highest logit is index 4 -> "nv"
        let top = predictions
            .iter()
            .max_by(|a, b| a.1.as_f64().partial_cmp(&b.1.as_f64()).unwrap())
            .map(|(label, _)| label.as_str());
        assert_eq!(top, Some("nv"));
    }

    /// Test 6: Other form fields before the file are skipped
    #[tokio::test]
    async fn test_extra_fields_are_ignored() {
        let classifier = CountingClassifier::new(vec![0.0; 7]);
        let state = setup_state(classifier.clone());

        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"note\"\r\n\r\nleft arm\r\n");
        body.extend_from_slice(&multipart_body("file", "lesion.png", &solid_png(32, 32, SKIN_TONE)));

        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["predictions"]["mel"], serde_json::json!(14.29));
        assert_eq!(classifier.calls(), 1);
    }

    // =============================================================================
    // Server Errors
    // =============================================================================

    /// Test 7: Non-image bytes produce a 500 with the decoder's message
    #[tokio::test]
    async fn test_malformed_image_bytes() {
        let classifier = CountingClassifier::new(vec![0.0; 7]);
        let state = setup_state(classifier.clone());

        let body = multipart_body("file", "notes.txt", b"this is not an image at all");
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let message = json["error"].as_str().unwrap();
        assert!(message.starts_with("An error occurred: "));
        assert!(message.contains("Unsupported image format"));
        assert_eq!(classifier.calls(), 0);
    }

    /// Test 8: Truncated PNG surfaces the decode failure text
    #[tokio::test]
    async fn test_truncated_png() {
        let state = setup_state(CountingClassifier::new(vec![0.0; 7]));

        let png = solid_png(40, 40, SKIN_TONE);
        let body = multipart_body("file", "cut.png", &png[..png.len() / 2]);
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .contains("Failed to decode image"));
    }

    /// Test 9: Inference failure becomes a 500, not a crash
    #[tokio::test]
    async fn test_inference_failure() {
        let state = setup_state(Arc::new(FailingClassifier {
            labels: LabelTable::default(),
        }));

        let body = multipart_body("file", "lesion.png", &solid_png(16, 16, SKIN_TONE));
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("An error occurred: Invalid input shape"));
    }

    /// Test 10: Empty upload is a decode failure
    #[tokio::test]
    async fn test_empty_file() {
        let state = setup_state(CountingClassifier::new(vec![0.0; 7]));

        let body = multipart_body("file", "empty.png", b"");
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "An error occurred: Image data is empty");
    }

    /// Test 11: Worker panic is reported as a processing error
    #[tokio::test]
    async fn test_classifier_panic_is_500() {
        let state = setup_state(Arc::new(PanickingClassifier {
            labels: LabelTable::default(),
        }));

        let body = multipart_body("file", "lesion.png", &solid_png(16, 16, SKIN_TONE));
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("An error occurred: "));
    }

    // =============================================================================
    // Upload Size and Form Shape
    // =============================================================================

    /// Test 12: Uploads over 10 MiB are classified like any other image
    #[tokio::test]
    async fn test_large_upload_is_classified() {
        let classifier = CountingClassifier::new(vec![0.0; 7]);
        let state = setup_state(classifier.clone());

        let bmp = solid_image(2000, 1900, SKIN_TONE, ImageFormat::Bmp);
        assert!(bmp.len() > 10 * 1024 * 1024);

        let body = multipart_body("file", "large.bmp", &bmp);
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["predictions"].as_object().unwrap().len(), 7);
        assert_eq!(classifier.calls(), 1);
    }

    /// Test 13: A configured limit turns oversized uploads into "No file uploaded"
    #[tokio::test]
    async fn test_configured_upload_limit() {
        let classifier = CountingClassifier::new(vec![0.0; 7]);
        let state = setup_state(classifier.clone()).with_max_upload_bytes(Some(1024));

        let bmp = solid_image(64, 64, SKIN_TONE, ImageFormat::Bmp);
        let body = multipart_body("file", "lesion.bmp", &bmp);
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file uploaded");
        assert_eq!(classifier.calls(), 0);
    }

    /// Test 14: A `file` form value without a filename is not an upload
    #[tokio::test]
    async fn test_file_part_without_filename() {
        let classifier = CountingClassifier::new(vec![0.0; 7]);
        let state = setup_state(classifier.clone());

        let mut body = Vec::new();
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(b"Content-Disposition: form-data; name=\"file\"\r\n\r\n");
        body.extend_from_slice(&solid_png(8, 8, SKIN_TONE));
        body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file uploaded");
        assert_eq!(classifier.calls(), 0);
    }

    /// Test 15: Truncated multipart framing is treated as no upload
    #[tokio::test]
    async fn test_truncated_multipart_body() {
        let state = setup_state(CountingClassifier::new(vec![0.0; 7]));

        let mut body = multipart_body("file", "lesion.png", &solid_png(8, 8, SKIN_TONE));
        body.truncate(body.len() - 12);
        let (status, json) = send(state, predict_request(body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file uploaded");
    }
}
