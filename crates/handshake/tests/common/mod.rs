//! Common test utilities shared across integration tests.
//!
//! Besides graph builders this provides store wrappers for observing and
//! disturbing the engine: counting batch sizes, failing after a number of
//! queries, and never answering.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use handshake::store::{ConnectionStore, InMemoryConnectionStore};
use handshake::{Connection, EngineConfig, Error, Result, TraversalEngine, UserId};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Build an in-memory store from undirected edges, all created now.
pub async fn graph(edges: &[(&str, &str)]) -> InMemoryConnectionStore {
    let store = InMemoryConnectionStore::new(1_000);
    let now = Utc::now();
    for (x, y) in edges {
        store
            .connect((*x).into(), (*y).into(), now)
            .await
            .expect("test edge should be valid");
    }
    store
}

/// Engine with default configuration over `store`.
pub fn engine<S: ConnectionStore + 'static>(store: S) -> TraversalEngine {
    engine_with(store, EngineConfig::default())
}

/// Engine with a custom configuration over `store`.
pub fn engine_with<S: ConnectionStore + 'static>(store: S, config: EngineConfig) -> TraversalEngine {
    engine_shared(Arc::new(store), config)
}

/// Engine over a store the test keeps a handle to.
pub fn engine_shared(store: Arc<dyn ConnectionStore>, config: EngineConfig) -> TraversalEngine {
    TraversalEngine::new(store, config).expect("test config should be valid")
}

/// `(id, depth)` pairs of a reachability result, for compact assertions.
pub fn pairs(reach: &handshake::Reachability) -> Vec<(String, u32)> {
    reach
        .entries
        .iter()
        .map(|r| (r.user_id.as_str().to_owned(), r.depth))
        .collect()
}

/// Owned ids from string literals.
pub fn ids(names: &[&str]) -> Vec<UserId> {
    names.iter().map(|n| UserId::new(*n)).collect()
}

/// Records the size of every `neighbors` batch it forwards.
pub struct CountingStore<S> {
    inner: S,
    batches: Mutex<Vec<usize>>,
}

impl<S> CountingStore<S> {
    pub fn new(inner: S) -> Arc<Self> {
        Arc::new(Self {
            inner,
            batches: Mutex::new(Vec::new()),
        })
    }

    /// Sizes of the `neighbors` batches seen so far, in call order.
    pub fn batches(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl<S: ConnectionStore> ConnectionStore for CountingStore<S> {
    async fn neighbors(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        self.batches.lock().unwrap().push(ids.len());
        self.inner.neighbors(ids).await
    }

    async fn edges_among(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        self.inner.edges_among(ids).await
    }

    async fn user_exists(&self, id: &UserId) -> Result<bool> {
        self.inner.user_exists(id).await
    }

    async fn connection_counts(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, u64>> {
        self.inner.connection_counts(ids).await
    }

    async fn connections_before(&self, id: &UserId, cutoff: DateTime<Utc>) -> Result<u64> {
        self.inner.connections_before(id, cutoff).await
    }

    async fn connections_by_day(
        &self,
        id: &UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, u64>> {
        self.inner.connections_by_day(id, from, until).await
    }
}

/// Lets `healthy_calls` neighbor lookups through, then fails every one after.
pub struct FlakyStore<S> {
    inner: S,
    remaining: AtomicUsize,
}

impl<S> FlakyStore<S> {
    pub fn new(inner: S, healthy_calls: usize) -> Self {
        Self {
            inner,
            remaining: AtomicUsize::new(healthy_calls),
        }
    }
}

#[async_trait]
impl<S: ConnectionStore> ConnectionStore for FlakyStore<S> {
    async fn neighbors(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        let healthy = self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if healthy {
            self.inner.neighbors(ids).await
        } else {
            Err(Error::StoreUnavailable("connection reset by peer".into()))
        }
    }

    async fn edges_among(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        self.inner.edges_among(ids).await
    }

    async fn user_exists(&self, id: &UserId) -> Result<bool> {
        self.inner.user_exists(id).await
    }

    async fn connection_counts(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, u64>> {
        self.inner.connection_counts(ids).await
    }

    async fn connections_before(&self, id: &UserId, cutoff: DateTime<Utc>) -> Result<u64> {
        self.inner.connections_before(id, cutoff).await
    }

    async fn connections_by_day(
        &self,
        id: &UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, u64>> {
        self.inner.connections_by_day(id, from, until).await
    }
}

/// Answers existence checks but never completes a neighbor lookup.
pub struct StalledStore<S> {
    inner: S,
}

impl<S> StalledStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ConnectionStore> ConnectionStore for StalledStore<S> {
    async fn neighbors(&self, _ids: &[UserId]) -> Result<Vec<Connection>> {
        std::future::pending().await
    }

    async fn edges_among(&self, _ids: &[UserId]) -> Result<Vec<Connection>> {
        std::future::pending().await
    }

    async fn user_exists(&self, id: &UserId) -> Result<bool> {
        self.inner.user_exists(id).await
    }

    async fn connection_counts(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, u64>> {
        self.inner.connection_counts(ids).await
    }

    async fn connections_before(&self, _id: &UserId, _cutoff: DateTime<Utc>) -> Result<u64> {
        std::future::pending().await
    }

    async fn connections_by_day(
        &self,
        _id: &UserId,
        _from: DateTime<Utc>,
        _until: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, u64>> {
        std::future::pending().await
    }
}
