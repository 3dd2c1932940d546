// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Predict endpoint handler

use axum::{extract::State, Json};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use tracing::{debug, error, info, warn};

use super::response::PredictResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;

/// Multipart field carrying the image
pub const FILE_FIELD: &str = "file";

/// POST /predict - Classify a skin lesion photo
///
/// Accepts a multipart upload with the image under `file`. The image first
/// passes the HSV skin gate; only accepted images reach the classifier.
///
/// # Response
/// - `predictions`: label -> percentage for every class
///
/// # Errors
/// - 400 Bad Request: no `file` upload (including unreadable or oversized
///   multipart bodies), or the image does not look like skin
/// - 500 Internal Server Error: decode or inference failure
pub async fn predict_handler(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        debug!("Predict request is not multipart: {}", e);
        ApiError::NoFileUploaded
    })?;

    // 1. Find the file part
    let image_bytes = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| {
            warn!("Predict request without '{}' field", FILE_FIELD);
            ApiError::NoFileUploaded
        })?;

    debug!("Predict request received: {} bytes", image_bytes.len());

    // 2. Gate + classify off the async workers
    let predictor = state.predictor.clone();
    let result = tokio::task::spawn_blocking(move || predictor.predict(&image_bytes))
        .await
        .map_err(|e| {
            error!("Prediction task failed: {}", e);
            ApiError::Processing(format!("prediction task failed: {}", e))
        })?;

    match result {
        Ok(predictions) => Ok(Json(PredictResponse::new(predictions))),
        Err(e) if e.is_client_error() => {
            info!("Predict rejected: {}", e);
            Err(e.into())
        }
        Err(e) => {
            warn!("Prediction failed: {}", e);
            Err(e.into())
        }
    }
}

/// Return the bytes of the first file part named `file`, skipping other parts
///
/// A `file` part without a filename is a plain form value, not an upload.
/// An unreadable multipart body counts as no upload at all.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<Vec<u8>>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        warn!("Failed to read multipart field: {}", e);
        ApiError::NoFileUploaded
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        if field.file_name().is_none() {
            debug!("Skipping '{}' part without a filename", FILE_FIELD);
            continue;
        }

        let bytes = field.bytes().await.map_err(|e| {
            warn!("Failed to read uploaded file: {}", e);
            ApiError::NoFileUploaded
        })?;
        return Ok(Some(bytes.to_vec()));
    }

    Ok(None)
}
