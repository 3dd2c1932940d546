// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::pipeline::PredictError;

pub const NO_FILE_MESSAGE: &str = "No file uploaded";
pub const NOT_SKIN_MESSAGE: &str = "Uploaded image does not appear to be a skin-related image";

/// JSON body of every error response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No `file` part in the request
    NoFileUploaded,
    /// The skin gate rejected the image
    NotSkinImage,
    /// Decode, preprocessing or inference failed
    Processing(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFileUploaded | ApiError::NotSkinImage => StatusCode::BAD_REQUEST,
            ApiError::Processing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NoFileUploaded => write!(f, "{}", NO_FILE_MESSAGE),
            ApiError::NotSkinImage => write!(f, "{}", NOT_SKIN_MESSAGE),
            ApiError::Processing(msg) => write!(f, "An error occurred: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        match err {
            PredictError::NotSkin { .. } => ApiError::NotSkinImage,
            other => ApiError::Processing(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_response())).into_response()
    }
}
