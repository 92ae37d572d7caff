//! Connection store abstraction.
//!
//! The traversal engine never owns the graph. It reads it through the
//! [`ConnectionStore`] trait, which any persistence layer can implement:
//!
//! - **In-memory**: petgraph-backed store, loadable from JSONL snapshots
//! - **SQLite**: relational store queried with batched `IN (…)` lookups
//!
//! # Architecture
//!
//! The trait is async so that truly remote stores fit behind it, and it is
//! object-safe so the engine can hold an `Arc<dyn ConnectionStore>`.
//! Every method is a read: the engine only ever observes the snapshot the
//! store serves at query time.
//!
//! # Example
//!
//! ```no_run
//! use handshake::store::{open_store, StoreBackend};
//! use std::path::PathBuf;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let store = open_store(StoreBackend::Sqlite(PathBuf::from("handshake.db")), 150).await?;
//!     let exists = store.user_exists(&"alice".into()).await?;
//!     println!("alice registered: {exists}");
//!     Ok(())
//! }
//! ```

use crate::domain::{Connection, UserId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub mod in_memory;
pub mod sqlite;

pub use in_memory::{InMemoryConnectionStore, LoadWarning, load_from_jsonl, save_to_jsonl};
pub use sqlite::{ImportReport, SqliteConnectionStore};

/// Read-only view of the persisted connection graph.
///
/// # Error Handling
///
/// Implementations report any I/O or backend failure as
/// `Error::StoreUnavailable`. They never return partial results.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine issues several
/// queries concurrently for one BFS level and serves many calls at once.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// All connections incident to any id in `ids`.
    ///
    /// Callers keep `ids` within the store's query-size limit; the engine
    /// chunks frontiers before calling. Unknown ids contribute nothing.
    async fn neighbors(&self, ids: &[UserId]) -> Result<Vec<Connection>>;

    /// All connections whose both endpoints are in `ids`.
    async fn edges_among(&self, ids: &[UserId]) -> Result<Vec<Connection>>;

    /// Whether `id` is a registered user, connected or not.
    async fn user_exists(&self, id: &UserId) -> Result<bool>;

    /// Number of connections held by each id. Unknown ids map to zero.
    async fn connection_counts(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, u64>>;

    /// Connections of `id` created strictly before `cutoff`.
    async fn connections_before(&self, id: &UserId, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Connections of `id` created in `[from, until)`, bucketed by UTC day.
    async fn connections_by_day(
        &self,
        id: &UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, u64>>;
}

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    /// Empty in-memory store (ephemeral).
    InMemory,

    /// In-memory store loaded from a JSONL snapshot.
    Snapshot(PathBuf),

    /// SQLite database file.
    Sqlite(PathBuf),
}

impl StoreBackend {
    /// Returns the data file path for file-based backends.
    pub fn data_path(&self) -> Option<&std::path::Path> {
        match self {
            StoreBackend::Snapshot(path) | StoreBackend::Sqlite(path) => Some(path),
            StoreBackend::InMemory => None,
        }
    }
}

/// Open a store for the given backend.
///
/// Snapshot load warnings are logged and the usable remainder is served.
///
/// # Errors
///
/// - `Error::Io` if a snapshot file cannot be read
/// - `Error::StoreUnavailable` if the database cannot be opened
pub async fn open_store(
    backend: StoreBackend,
    max_connections_per_user: usize,
) -> Result<Arc<dyn ConnectionStore>> {
    match backend {
        StoreBackend::InMemory => Ok(Arc::new(InMemoryConnectionStore::new(
            max_connections_per_user,
        ))),
        StoreBackend::Snapshot(path) => {
            let (store, warnings) = load_from_jsonl(&path, max_connections_per_user).await?;
            for warning in &warnings {
                tracing::warn!(warning = ?warning, "snapshot load warning");
            }
            Ok(Arc::new(store))
        }
        StoreBackend::Sqlite(path) => {
            let store = SqliteConnectionStore::open(&path, max_connections_per_user).await?;
            Ok(Arc::new(store))
        }
    }
}

/// Bucket creation timestamps by UTC calendar day.
pub(crate) fn bucket_by_day<I>(timestamps: I) -> BTreeMap<NaiveDate, u64>
where
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut buckets = BTreeMap::new();
    for ts in timestamps {
        *buckets.entry(ts.date_naive()).or_insert(0) += 1;
    }
    buckets
}
