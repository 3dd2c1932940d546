// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process startup configuration
//!
//! Every setting can be given as a flag or through the environment (a `.env`
//! file is honoured by `main`).

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::vision::classifier::onnx::DEFAULT_INTRA_THREADS;
use crate::vision::LabelTable;

/// Fabstir Skin Node - skin lesion classification API
#[derive(Parser, Debug, Clone)]
#[command(name = "fabstir-skin-node")]
#[command(version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "API_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port for the HTTP server
    #[arg(long, env = "API_PORT", default_value_t = 5000)]
    pub port: u16,

    /// Path to the MobileNetV2 ONNX model
    #[arg(long, env = "MODEL_PATH", default_value = "./models/mobinet_model.onnx")]
    pub model_path: PathBuf,

    /// Optional JSON array of class labels, in model output order
    #[arg(long, env = "LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "ORT_INTRA_THREADS", default_value_t = DEFAULT_INTRA_THREADS)]
    pub intra_threads: usize,

    /// Reject request bodies larger than this many bytes (unlimited if unset)
    #[arg(long, env = "MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,
}

impl ServerConfig {
    /// Socket address to listen on
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    /// Label table from `labels_path`, or the built-in HAM10000 order
    pub fn load_labels(&self) -> Result<LabelTable> {
        match &self.labels_path {
            Some(path) => LabelTable::from_file(path)
                .with_context(|| format!("Failed to load labels from {}", path.display())),
            None => Ok(LabelTable::default()),
        }
    }
}
