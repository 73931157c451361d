// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Manual corrections between geometry-feed names and registry labels.
//!
//! The tables are data, not code: the shipped defaults live in
//! `overrides.json` and a replacement file can be supplied at build time.

use crate::registry::EntityRegistry;
use crate::IndexError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Name-key value marking a code as deliberately absent from the registry.
pub const NO_ENTITY_SENTINEL: &str = "__no_entity__";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideTable {
    /// Prefixes stripped from geometry-feed names before normalizing.
    #[serde(default)]
    pub geometry_prefixes: Vec<String>,
    /// INE code -> registry lookup key (result of `entity_key_from_label`).
    #[serde(default)]
    pub name_keys: BTreeMap<String, String>,
    /// INE code -> registry id. Wins over `name_keys`.
    #[serde(default)]
    pub direct_ids: BTreeMap<String, String>,
}

impl Default for OverrideTable {
    fn default() -> Self {
        serde_json::from_str(include_str!("overrides.json"))
            .expect("Failed to parse embedded overrides.json")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Direct-id override, name matching skipped.
    Direct(String),
    /// Registry hit; `key` is the lookup key that matched.
    Matched { id: String, key: String },
    /// Code mapped to [`NO_ENTITY_SENTINEL`].
    Excluded,
    Unmatched,
}

impl Resolution {
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Resolution::Direct(id) | Resolution::Matched { id, .. } => Some(id),
            _ => None,
        }
    }
}

impl OverrideTable {
    /// An empty table: no prefixes, no overrides.
    pub fn empty() -> Self {
        Self {
            geometry_prefixes: Vec::new(),
            name_keys: BTreeMap::new(),
            direct_ids: BTreeMap::new(),
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, IndexError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let table: OverrideTable = serde_json::from_str(&content).map_err(|e| {
            log::error!("Override table parse error — path={} error={}", path.display(), e);
            e
        })?;
        log::debug!(
            "Loaded override table — path={} name_keys={} direct_ids={}",
            path.display(),
            table.name_keys.len(),
            table.direct_ids.len()
        );
        Ok(table)
    }

    /// Resolves one geometry feature to a registry id.
    ///
    /// `geometry_key` is the feature's own normalized name; it is the lookup
    /// key when no override exists and the fallback when the override misses.
    pub fn resolve(&self, ine_code: &str, geometry_key: &str, registry: &EntityRegistry) -> Resolution {
        if let Some(id) = self.direct_ids.get(ine_code) {
            return Resolution::Direct(id.clone());
        }

        let override_key = self.name_keys.get(ine_code).map(String::as_str);
        if override_key == Some(NO_ENTITY_SENTINEL) {
            return Resolution::Excluded;
        }

        let lookup_key = override_key.unwrap_or(geometry_key);
        if let Some(id) = registry.get(lookup_key) {
            return Resolution::Matched {
                id: id.to_string(),
                key: lookup_key.to_string(),
            };
        }

        if override_key.is_some() {
            if let Some(id) = registry.get(geometry_key) {
                return Resolution::Matched {
                    id: id.to_string(),
                    key: geometry_key.to_string(),
                };
            }
        }

        Resolution::Unmatched
    }

    /// Override codes that never occur in the geometry feed.
    pub fn stale_codes<'a, I>(&self, feed_codes: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let seen: BTreeSet<&str> = feed_codes.into_iter().collect();
        self.name_keys
            .keys()
            .chain(self.direct_ids.keys())
            .filter(|code| !seen.contains(code.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
