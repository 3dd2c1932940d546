// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{Context, Result};
use clap::Parser;
use fabstir_skin_node::{
    api::{start_server, AppState},
    config::ServerConfig,
    pipeline::SkinLesionPredictor,
    version,
    vision::{OnnxLesionClassifier, SkinGate},
};
use std::{env, sync::Arc};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let config = ServerConfig::parse();

    info!("🚀 Starting {}", version::get_version_string());
    info!("📦 BUILD VERSION: {}", version::VERSION);

    // The service never starts without a usable model
    let predictor = match build_predictor(&config) {
        Ok(predictor) => predictor,
        Err(e) => {
            error!("❌ Failed to initialize classifier: {:#}", e);
            std::process::exit(1);
        }
    };

    match config.max_upload_bytes {
        Some(limit) => info!("📏 Upload limit: {} bytes", limit),
        None => info!("📏 Upload limit: none"),
    }

    let addr = config.socket_addr()?;
    let state = AppState::new(predictor).with_max_upload_bytes(config.max_upload_bytes);
    start_server(addr, state).await
}

fn build_predictor(config: &ServerConfig) -> Result<SkinLesionPredictor> {
    let labels = config.load_labels()?;
    info!(
        "🏷️  Class labels: [{}]",
        labels.iter().collect::<Vec<_>>().join(", ")
    );

    let classifier = OnnxLesionClassifier::new(&config.model_path, labels, config.intra_threads)
        .with_context(|| format!("Cannot load model {}", config.model_path.display()))?;

    let gate = SkinGate::default();
    info!(
        "🩺 Skin gate: HSV {:?}..={:?}, > {:.1}% skin pixels",
        gate.config().range.lower,
        gate.config().range.upper,
        gate.config().min_skin_percent
    );

    Ok(SkinLesionPredictor::new(Arc::new(classifier), gate))
}
