// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use crate::normalize::{entity_key_from_label, normalize};
use crate::IndexError;
use log::{debug, info};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 500;
pub const DEFAULT_LABEL_MARKER: &str = "municipio";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EntityRecord {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DocumentPage {
    #[serde(default)]
    documents: Vec<EntityRecord>,
}

/// One page of the entity collection, in ascending cursor order.
pub trait RegistrySource {
    fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<Vec<EntityRecord>, IndexError>;
}

/// Entity collection behind an Appwrite-style documents endpoint.
pub struct AppwriteRegistry {
    client: reqwest::blocking::Client,
    documents_url: String,
    project_id: String,
    marker: String,
}

impl AppwriteRegistry {
    pub fn new(
        endpoint: &str,
        project_id: &str,
        database_id: &str,
        collection: &str,
        marker: &str,
    ) -> Result<Self, IndexError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        let documents_url = format!(
            "{}/databases/{}/collections/{}/documents",
            endpoint.trim_end_matches('/'),
            database_id,
            collection
        );
        Ok(Self {
            client,
            documents_url,
            project_id: project_id.to_string(),
            marker: marker.to_string(),
        })
    }

    fn queries(&self, cursor: Option<&str>, limit: usize) -> Vec<(&'static str, String)> {
        let mut queries = vec![
            serde_json::json!({ "method": "limit", "values": [limit] }),
            serde_json::json!({ "method": "orderAsc", "attribute": "$sequence" }),
            serde_json::json!({ "method": "search", "attribute": "label", "values": [self.marker] }),
        ];
        if let Some(last_id) = cursor {
            queries.push(serde_json::json!({ "method": "cursorAfter", "values": [last_id] }));
        }
        queries
            .into_iter()
            .map(|q| ("queries[]", q.to_string()))
            .collect()
    }
}

impl RegistrySource for AppwriteRegistry {
    fn fetch_page(&self, cursor: Option<&str>, limit: usize) -> Result<Vec<EntityRecord>, IndexError> {
        let url = reqwest::Url::parse_with_params(&self.documents_url, self.queries(cursor, limit))
            .map_err(|e| IndexError::Config(format!("bad registry endpoint: {}", e)))?;
        let response = self
            .client
            .get(url)
            .header("X-Appwrite-Project", &self.project_id)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(IndexError::Http(format!(
                "entities fetch failed with {}: {}",
                status, body
            )));
        }

        let page: DocumentPage = response.json()?;
        Ok(page.documents)
    }
}

/// Normalized lookup key -> registry id.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    by_key: HashMap<String, String>,
}

impl EntityRegistry {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            by_key: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Pages through the whole collection until a short page.
    ///
    /// Only labels containing `marker` are kept. Any page failure aborts.
    pub fn collect<S: RegistrySource + ?Sized>(
        source: &S,
        page_size: usize,
        marker: &str,
    ) -> Result<Self, IndexError> {
        if page_size == 0 {
            return Err(IndexError::Config("page_size must be positive".to_string()));
        }

        let marker = normalize(marker);
        let mut registry = Self::default();
        let mut cursor: Option<String> = None;
        let mut page = 0usize;

        info!("Fetching registry entities — marker={:?} page_size={}", marker, page_size);
        loop {
            let docs = source.fetch_page(cursor.as_deref(), page_size)?;
            page += 1;

            for doc in &docs {
                registry.insert_record(doc, &marker);
            }
            debug!(
                "Registry page {} — docs={} total_keys={}",
                page,
                docs.len(),
                registry.len()
            );

            if docs.len() < page_size {
                break;
            }
            cursor = docs.last().map(|d| d.id.clone());
        }

        info!("Registry entities fetched — keys={} pages={}", registry.len(), page);
        Ok(registry)
    }

    fn insert_record(&mut self, record: &EntityRecord, marker: &str) {
        let label = match record.label.as_deref() {
            Some(l) if !l.trim().is_empty() => l,
            _ => return,
        };
        if !normalize(label).contains(marker) {
            return;
        }
        let key = entity_key_from_label(label);
        if !key.is_empty() {
            self.by_key.insert(key, record.id.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.by_key.keys().map(String::as_str)
    }

    /// Keys that resolve to `id`.
    pub fn keys_for_id<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.by_key
            .iter()
            .filter(move |(_, v)| v.as_str() == id)
            .map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
