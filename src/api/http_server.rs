// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{extract::DefaultBodyLimit, routing::post, Router};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::predict::predict_handler;
use crate::pipeline::SkinLesionPredictor;

/// Shared handler state
///
/// Holds the read-only predictor; cloning is a reference count bump.
#[derive(Clone, Debug)]
pub struct AppState {
    pub predictor: Arc<SkinLesionPredictor>,
    /// Request body cap in bytes; `None` accepts uploads of any size
    pub max_upload_bytes: Option<usize>,
}

impl AppState {
    pub fn new(predictor: SkinLesionPredictor) -> Self {
        Self {
            predictor: Arc::new(predictor),
            max_upload_bytes: None,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: Option<usize>) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}

/// Build the router: POST /predict with permissive CORS
pub fn create_app(state: AppState) -> Router {
    let body_limit = match state.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    Router::new()
        .route("/predict", post(predict_handler))
        .layer(body_limit)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Bind `addr` and serve until the process is stopped
pub async fn start_server(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
