// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Runtime side: load the Geo-Index once and answer lookups locally.

pub mod cache;
pub mod locate;
pub mod search;

use thiserror::Error;

pub use cache::{
    FileFetcher, FileStore, GeoIndexClient, HttpFetcher, IndexFetcher, IndexStore, NoStore,
    StoredIndex, CACHE_TTL,
};
pub use locate::{locate, point_in_ring};
pub use search::{search, DEFAULT_SEARCH_LIMIT};

/// Index load failure. `Clone` so every caller awaiting one shared fetch
/// receives the same error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Failed to load municipality index: {0}")]
    Http(String),
    #[error("Failed to parse municipality index: {0}")]
    Parse(String),
    #[error("Failed to read municipality index: {0}")]
    Io(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Parse(e.to_string())
        } else {
            ClientError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Io(e.to_string())
    }
}
