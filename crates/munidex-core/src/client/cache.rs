// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

//! Memory -> persistent store -> network, with one shared in-flight fetch.

use super::ClientError;
use crate::model::MunicipalityEntry;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

pub const CACHE_KEY: &str = "municipality_index_v1";
pub const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

const CURRENT_STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredIndex {
    #[serde(default)]
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub entries: Vec<MunicipalityEntry>,
}

impl StoredIndex {
    pub fn new(entries: Vec<MunicipalityEntry>) -> Self {
        Self {
            version: CURRENT_STORE_VERSION,
            saved_at: Utc::now(),
            entries,
        }
    }

    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        match chrono::Duration::from_std(ttl) {
            Ok(ttl) => now.signed_duration_since(self.saved_at) <= ttl,
            Err(_) => true,
        }
    }
}

/// Survives process restarts. Read failures are misses, write failures are
/// logged and dropped.
pub trait IndexStore: Send + Sync {
    fn read(&self) -> Option<StoredIndex>;
    fn write(&self, stored: &StoredIndex);
}

impl<T: IndexStore + ?Sized> IndexStore for Box<T> {
    fn read(&self) -> Option<StoredIndex> {
        (**self).read()
    }

    fn write(&self, stored: &StoredIndex) {
        (**self).write(stored)
    }
}

/// Persistent tier disabled.
pub struct NoStore;

impl IndexStore for NoStore {
    fn read(&self) -> Option<StoredIndex> {
        None
    }

    fn write(&self, _stored: &StoredIndex) {}
}

pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    /// `<config root>/municipality_index_v1.json`
    pub fn in_config_root() -> Self {
        Self::new(crate::get_config_root().join(format!("{}.json", CACHE_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexStore for FileStore {
    fn read(&self) -> Option<StoredIndex> {
        if !self.path.exists() {
            return None;
        }
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str::<StoredIndex>(&content) {
            Ok(stored) if stored.version == CURRENT_STORE_VERSION => Some(stored),
            Ok(stored) => {
                debug!(
                    "Ignoring persisted index with version {} — path={}",
                    stored.version,
                    self.path.display()
                );
                None
            }
            Err(e) => {
                debug!("Ignoring malformed persisted index — path={} error={}", self.path.display(), e);
                None
            }
        }
    }

    fn write(&self, stored: &StoredIndex) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let content = serde_json::to_string(stored)?;
            std::fs::write(&self.path, content)
        })();
        if let Err(e) = result {
            warn!("Could not persist municipality index — path={} error={}", self.path.display(), e);
        }
    }
}

/// Source of the Geo-Index file.
pub trait IndexFetcher: Send + Sync {
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<MunicipalityEntry>, ClientError>>;
}

impl<T: IndexFetcher + ?Sized> IndexFetcher for Box<T> {
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<MunicipalityEntry>, ClientError>> {
        (**self).fetch()
    }
}

pub struct HttpFetcher {
    client: reqwest::Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// `<base><route>/municipalities-index.json`, trailing slashes collapsed.
    pub fn for_site(base_url: &str, base_route: &str) -> Result<Self, ClientError> {
        let url = format!(
            "{}{}/{}",
            base_url.trim_end_matches('/'),
            base_route.trim_end_matches('/'),
            crate::INDEX_FILE_NAME
        );
        Self::new(&url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl IndexFetcher for HttpFetcher {
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<MunicipalityEntry>, ClientError>> {
        let client = self.client.clone();
        let url = self.url.clone();
        async move {
            debug!("GET {}", url);
            let response = client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(ClientError::Http(format!(
                    "{} {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("")
                )));
            }
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        }
        .boxed()
    }
}

/// Reads a locally built Geo-Index file.
pub struct FileFetcher {
    path: PathBuf,
}

impl FileFetcher {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl IndexFetcher for FileFetcher {
    fn fetch(&self) -> BoxFuture<'static, Result<Vec<MunicipalityEntry>, ClientError>> {
        let path = self.path.clone();
        async move {
            let body = tokio::fs::read(&path).await?;
            Ok(serde_json::from_slice(&body)?)
        }
        .boxed()
    }
}

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Vec<MunicipalityEntry>>, ClientError>>>;

struct Inner {
    fetcher: Box<dyn IndexFetcher>,
    store: Box<dyn IndexStore>,
    ttl: Duration,
    memory: RwLock<Option<Arc<Vec<MunicipalityEntry>>>>,
    in_flight: Mutex<Option<SharedFetch>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn memory(&self) -> Option<Arc<Vec<MunicipalityEntry>>> {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_memory(&self, index: Option<Arc<Vec<MunicipalityEntry>>>) {
        *self.memory.write().unwrap_or_else(PoisonError::into_inner) = index;
    }

    fn promote_stored(&self) -> Option<Arc<Vec<MunicipalityEntry>>> {
        let stored = self.store.read()?;
        if !stored.is_fresh(self.ttl, Utc::now()) {
            debug!("Persisted index expired — saved_at={}", stored.saved_at);
            return None;
        }
        debug!("Promoting persisted index — entries={}", stored.entries.len());
        let index = Arc::new(stored.entries);
        self.set_memory(Some(Arc::clone(&index)));
        Some(index)
    }

    /// The returned future is the only writer of `memory` and `store`, and
    /// clears `in_flight` however it ends.
    fn start_fetch(self: &Arc<Self>) -> SharedFetch {
        let request = self.fetcher.fetch();
        let inner: Weak<Inner> = Arc::downgrade(self);
        async move {
            let result = request.await.map(Arc::new);
            if let Some(inner) = inner.upgrade() {
                match &result {
                    Ok(index) => {
                        inner.set_memory(Some(Arc::clone(index)));
                        inner.store.write(&StoredIndex::new(index.as_ref().clone()));
                        info!("Municipality index loaded — entries={}", index.len());
                    }
                    Err(e) => warn!("Municipality index fetch failed — {}", e),
                }
                lock(&inner.in_flight).take();
            }
            result
        }
        .boxed()
        .shared()
    }
}

/// Process-wide handle to the Geo-Index. Clones share one cache.
#[derive(Clone)]
pub struct GeoIndexClient {
    inner: Arc<Inner>,
}

impl GeoIndexClient {
    pub fn new<F, S>(fetcher: F, store: S) -> Self
    where
        F: IndexFetcher + 'static,
        S: IndexStore + 'static,
    {
        Self::with_ttl(fetcher, store, CACHE_TTL)
    }

    pub fn with_ttl<F, S>(fetcher: F, store: S, ttl: Duration) -> Self
    where
        F: IndexFetcher + 'static,
        S: IndexStore + 'static,
    {
        Self {
            inner: Arc::new(Inner {
                fetcher: Box::new(fetcher),
                store: Box::new(store),
                ttl,
                memory: RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// The memory tier, without touching the store or the network.
    pub fn memory_snapshot(&self) -> Option<Arc<Vec<MunicipalityEntry>>> {
        self.inner.memory()
    }

    /// Drops the memory tier. The persistent store is left alone.
    pub fn invalidate(&self) {
        self.inner.set_memory(None);
    }

    /// Full index: memory, then a fresh persisted copy, then the network.
    ///
    /// Concurrent callers share a single fetch and see the same outcome.
    /// A failed fetch is not retried here; the next call starts a new one.
    pub async fn get_index(&self) -> Result<Arc<Vec<MunicipalityEntry>>, ClientError> {
        if let Some(index) = self.inner.memory() {
            return Ok(index);
        }

        let fetch = {
            let mut in_flight = lock(&self.inner.in_flight);
            match in_flight.as_ref() {
                Some(fetch) => {
                    debug!("Joining in-flight index fetch");
                    fetch.clone()
                }
                None => {
                    // A fetch may have completed since the first check.
                    if let Some(index) = self.inner.memory() {
                        return Ok(index);
                    }
                    if let Some(index) = self.inner.promote_stored() {
                        return Ok(index);
                    }
                    info!("Fetching municipality index");
                    let fetch = self.inner.start_fetch();
                    *in_flight = Some(fetch.clone());
                    fetch
                }
            }
        };

        fetch.await
    }
}
