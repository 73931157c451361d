// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

pub mod builder;
pub mod client;
pub mod config;
pub mod geometry;
pub mod model;
pub mod normalize;
pub mod overrides;
pub mod registry;

use std::path::PathBuf;
use thiserror::Error;

pub use builder::{BuildReport, IndexBuilder};
pub use client::{ClientError, GeoIndexClient};
pub use model::{BoundingBox, LatLon, MunicipalityEntry, Position};

/// File name shared by the builder output and the client fetch path.
pub const INDEX_FILE_NAME: &str = "municipalities-index.json";

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for IndexError {
    fn from(e: reqwest::Error) -> Self {
        IndexError::Http(e.to_string())
    }
}

/// Root directory for persisted client state.
///
/// `MUNIDEX_CONFIG_DIR` wins when set; otherwise the platform config dir.
pub fn get_config_root() -> PathBuf {
    if let Ok(dir) = std::env::var("MUNIDEX_CONFIG_DIR") {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    directories::ProjectDirs::from("org", "munidex", "munidex")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".munidex"))
}
