// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Joins the geometry feed with the entity registry into the Geo-Index.

use crate::geometry::{compute_bbox, extract_exterior_ring, simplify_ring, FeatureCollection, DEFAULT_TOLERANCE};
use crate::model::{department_for_code, MunicipalityEntry};
use crate::normalize::geometry_name_key;
use crate::overrides::{OverrideTable, Resolution};
use crate::registry::EntityRegistry;
use crate::IndexError;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

const UNMATCHED_PREVIEW: usize = 30;
const UNUSED_KEYS_PREVIEW: usize = 20;

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub entries: Vec<MunicipalityEntry>,
    /// `"<NAME> (<code>)"` for each feature that found no registry entity.
    pub unmatched: Vec<String>,
    /// Features mapped to the no-entity sentinel.
    pub excluded: usize,
    /// Matched features whose ring was empty or collapsed below 4 points.
    pub degenerate: Vec<String>,
    /// Registry keys no feature resolved to, sorted.
    pub unused_registry_keys: Vec<String>,
    /// Override codes absent from the geometry feed.
    pub stale_override_codes: Vec<String>,
}

impl BuildReport {
    pub fn log_summary(&self) {
        info!("Municipalities indexed: {}", self.entries.len());
        info!("Unmatched geometry features: {}", self.unmatched.len());
        if self.excluded > 0 {
            info!("Excluded by sentinel override: {}", self.excluded);
        }

        if !self.unmatched.is_empty() {
            if self.unmatched.len() > UNMATCHED_PREVIEW {
                warn!("First {} unmatched:", UNMATCHED_PREVIEW);
            } else {
                warn!("Unmatched:");
            }
            for u in self.unmatched.iter().take(UNMATCHED_PREVIEW) {
                warn!("  - {}", u);
            }
        }

        if !self.degenerate.is_empty() {
            warn!("Degenerate geometries skipped ({}):", self.degenerate.len());
            for d in &self.degenerate {
                warn!("  - {}", d);
            }
        }

        if !self.unused_registry_keys.is_empty() {
            info!(
                "Entity names with no geometry match ({}):",
                self.unused_registry_keys.len()
            );
            for k in self.unused_registry_keys.iter().take(UNUSED_KEYS_PREVIEW) {
                info!("  - {:?}", k);
            }
        }

        if !self.stale_override_codes.is_empty() {
            warn!(
                "Override codes not present in the geometry feed: {}",
                self.stale_override_codes.join(", ")
            );
        }
    }
}

pub struct IndexBuilder {
    overrides: OverrideTable,
    tolerance: f64,
}

impl Default for IndexBuilder {
    fn default() -> Self {
        Self::new(OverrideTable::default())
    }
}

impl IndexBuilder {
    pub fn new(overrides: OverrideTable) -> Self {
        Self {
            overrides,
            tolerance: DEFAULT_TOLERANCE,
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn overrides(&self) -> &OverrideTable {
        &self.overrides
    }

    /// Builds the index. Entries keep the feed's feature order.
    pub fn build(&self, features: &FeatureCollection, registry: &EntityRegistry) -> BuildReport {
        let mut report = BuildReport::default();
        let mut used_keys: BTreeSet<String> = BTreeSet::new();
        let mut feed_codes: Vec<String> = Vec::with_capacity(features.features.len());

        for feature in &features.features {
            let ine_code = feature.ine_code();
            let raw_name = feature.raw_name();
            if !ine_code.is_empty() {
                feed_codes.push(ine_code.clone());
            }

            let geometry = match &feature.geometry {
                Some(g) if !ine_code.is_empty() && !raw_name.is_empty() => g,
                _ => continue,
            };

            let key = geometry_name_key(&raw_name, &self.overrides.geometry_prefixes);
            let entity_id = match self.overrides.resolve(&ine_code, &key, registry) {
                Resolution::Direct(id) => {
                    used_keys.extend(registry.keys_for_id(&id).map(str::to_string));
                    id
                }
                Resolution::Matched { id, key } => {
                    used_keys.insert(key);
                    id
                }
                Resolution::Excluded => {
                    debug!("Skipping sentinel override — code={} name={}", ine_code, raw_name);
                    report.excluded += 1;
                    continue;
                }
                Resolution::Unmatched => {
                    report.unmatched.push(format!("{} ({})", raw_name, ine_code));
                    continue;
                }
            };

            let ring = match extract_exterior_ring(geometry) {
                Some(r) if r.len() >= 4 => r,
                _ => {
                    report.degenerate.push(format!("{} ({})", raw_name, ine_code));
                    continue;
                }
            };

            let polygon = simplify_ring(&ring, self.tolerance);
            let bbox = match compute_bbox(&polygon) {
                Some(b) if polygon.len() >= 4 => b,
                _ => {
                    report.degenerate.push(format!("{} ({})", raw_name, ine_code));
                    continue;
                }
            };
            debug!(
                "Indexed {} ({}) — vertices {} -> {}",
                raw_name,
                ine_code,
                ring.len(),
                polygon.len()
            );

            report.entries.push(MunicipalityEntry {
                id: entity_id,
                name: raw_name,
                department: department_for_code(&ine_code).to_string(),
                ine_code,
                bbox,
                polygon,
            });
        }

        let mut unused: Vec<String> = registry
            .keys()
            .filter(|k| !used_keys.contains(*k))
            .map(str::to_string)
            .collect();
        unused.sort();
        report.unused_registry_keys = unused;
        report.stale_override_codes = self
            .overrides
            .stale_codes(feed_codes.iter().map(String::as_str));

        report
    }
}

/// Writes the index as a compact JSON array, atomically. Returns bytes written.
pub fn write_index<P: AsRef<Path>>(path: P, entries: &[MunicipalityEntry]) -> Result<u64, IndexError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::env::current_dir()?,
    };
    std::fs::create_dir_all(&dir)?;

    let content = serde_json::to_vec(entries)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
    tmp.write_all(&content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| IndexError::Io(e.error))?;

    info!(
        "Geo-Index written — path={} entries={} bytes={}",
        path.display(),
        entries.len(),
        content.len()
    );
    Ok(content.len() as u64)
}
