// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::geometry::DEFAULT_TOLERANCE;
use crate::registry::{DEFAULT_LABEL_MARKER, DEFAULT_PAGE_SIZE};
use crate::IndexError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings for one index build. Every field has a default so a config
/// file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub endpoint: String,
    pub project_id: String,
    pub database_id: String,
    pub collection: String,
    /// URL or local path of the municipal boundary FeatureCollection.
    pub geometry_url: String,
    pub label_marker: String,
    pub page_size: usize,
    pub tolerance: f64,
    pub output: PathBuf,
    /// Replacement override table; the embedded one is used when unset.
    pub overrides: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        let endpoint = "https://appwrite.sociest.org/v1".to_string();
        let project_id = "697ea96f003c3264105c".to_string();
        let geometry_url = format!(
            "{}/storage/buckets/6982ca130039bc0ee4e2/files/69925c22001112baddeb/view?project={}",
            endpoint, project_id
        );
        Self {
            endpoint,
            project_id,
            database_id: "69814c38002f0783976d".to_string(),
            collection: "entities".to_string(),
            geometry_url,
            label_marker: DEFAULT_LABEL_MARKER.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            tolerance: DEFAULT_TOLERANCE,
            output: PathBuf::from("public").join(crate::INDEX_FILE_NAME),
            overrides: None,
        }
    }
}

impl BuildConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: BuildConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), IndexError> {
        if self.page_size == 0 {
            return Err(IndexError::Config("page_size must be positive".to_string()));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(IndexError::Config(format!(
                "tolerance must be a non-negative number, got {}",
                self.tolerance
            )));
        }
        if self.endpoint.trim().is_empty() || self.geometry_url.trim().is_empty() {
            return Err(IndexError::Config(
                "endpoint and geometry_url are required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("munidex.json");
        fs::write(&path, r#"{"tolerance": 0.0005, "output": "out/index.json"}"#).unwrap();

        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config.tolerance, 0.0005);
        assert_eq!(config.output, PathBuf::from("out/index.json"));
        assert_eq!(config.page_size, 500);
        assert_eq!(config.collection, "entities");
        assert!(config.geometry_url.contains("project=697ea96f003c3264105c"));
    }

    #[test]
    fn test_validation() {
        let mut config = BuildConfig::default();
        assert!(config.validate().is_ok());

        config.page_size = 0;
        assert!(matches!(config.validate(), Err(IndexError::Config(_))));

        let mut config = BuildConfig::default();
        config.tolerance = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = BuildConfig::default();
        config.geometry_url = " ".to_string();
        assert!(config.validate().is_err());
    }
}
