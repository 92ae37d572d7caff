//! In-memory connection store using petgraph.
//!
//! This module provides a fast, **ephemeral** store where the whole
//! connection graph lives in RAM. It is suitable for:
//!
//! - Testing and development
//! - Short-lived CLI sessions over a snapshot file
//! - Reference results for property tests
//!
//! # Persistence
//!
//! Snapshots are read with [`load_from_jsonl`] and written with
//! [`save_to_jsonl`]. Each line is one tagged record:
//!
//! ```text
//! {"type":"user","id":"alice"}
//! {"type":"connection","a":"alice","b":"bob","created_at":"2026-03-01T10:00:00Z"}
//! ```
//!
//! # Thread Safety
//!
//! The graph sits behind `Arc<RwLock<..>>`. Every [`ConnectionStore`] method
//! is a read and takes the shared lock, so the concurrent chunk queries of a
//! BFS level never serialize on each other.
//!
//! [`ConnectionStore`]: crate::store::ConnectionStore

mod graph;
mod inner;
mod jsonl;
mod trait_impl;

use crate::domain::{Connection, UserId};
use crate::error::Result;
use chrono::{DateTime, Utc};
use inner::InMemoryStoreInner;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use jsonl::{LoadWarning, load_from_jsonl, save_to_jsonl};

/// Thread-safe in-memory connection store.
///
/// Cloning is cheap and yields a handle to the same graph.
///
/// # Example
///
/// ```
/// use handshake::store::InMemoryConnectionStore;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> handshake::Result<()> {
///     let store = InMemoryConnectionStore::new(150);
///     store.connect("alice".into(), "bob".into(), chrono::Utc::now()).await?;
///     assert_eq!(store.connection_count().await, 1);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryConnectionStore {
    inner: Arc<RwLock<InMemoryStoreInner>>,
}

impl InMemoryConnectionStore {
    /// Create an empty store enforcing the given degree bound.
    pub fn new(max_connections_per_user: usize) -> Self {
        Self::from_inner(InMemoryStoreInner::new(max_connections_per_user))
    }

    fn from_inner(inner: InMemoryStoreInner) -> Self {
        Self {
            inner: Arc::new(RwLock::new(inner)),
        }
    }

    /// Register a user with no connections. Re-registering is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if the id is malformed.
    pub async fn add_user(&self, id: UserId) -> Result<()> {
        id.validate()?;
        self.inner.write().await.add_user(id);
        Ok(())
    }

    /// Connect two users, registering either endpoint if needed.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` for malformed ids
    /// - `Error::Connection` for self-connections, duplicates, or when an
    ///   endpoint has reached `max_connections_per_user`
    pub async fn connect(
        &self,
        x: UserId,
        y: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Connection> {
        x.validate()?;
        y.validate()?;
        let connection = self.inner.write().await.connect(x, y, created_at)?;
        tracing::trace!(a = %connection.a(), b = %connection.b(), "connection added");
        Ok(connection)
    }

    /// Remove the connection between two users. Returns whether one existed.
    pub async fn disconnect(&self, x: &UserId, y: &UserId) -> bool {
        self.inner.write().await.disconnect(x, y)
    }

    /// Delete a user together with all their connections.
    ///
    /// # Errors
    ///
    /// Returns `Error::Connection(ConnectionError::UnknownUser)` if the user
    /// is not registered.
    pub async fn remove_user(&self, id: &UserId) -> Result<usize> {
        let removed = self.inner.write().await.remove_user(id)?;
        tracing::debug!(user = %id, removed, "user removed");
        Ok(removed)
    }

    /// Number of registered users.
    pub async fn user_count(&self) -> usize {
        self.inner.read().await.node_map.len()
    }

    /// Number of connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.graph.edge_count()
    }

    /// Every user and connection, each sorted ascending.
    pub async fn export_all(&self) -> (Vec<UserId>, Vec<Connection>) {
        let inner = self.inner.read().await;

        let mut users: Vec<UserId> = inner.node_map.keys().cloned().collect();
        users.sort();

        let mut connections: Vec<Connection> = inner
            .graph
            .edge_indices()
            .filter_map(|edge| {
                let (x, y) = inner.graph.edge_endpoints(edge)?;
                Some(Connection::between(
                    inner.graph[x].clone(),
                    inner.graph[y].clone(),
                    inner.graph[edge],
                ))
            })
            .collect();
        connections.sort();

        (users, connections)
    }
}

impl std::fmt::Debug for InMemoryConnectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryConnectionStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, Error};

    #[tokio::test]
    async fn connect_rejects_invalid_ids() {
        let store = InMemoryConnectionStore::new(10);
        let err = store
            .connect("alice".into(), "bad id".into(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
        assert_eq!(store.user_count().await, 0);
    }

    #[tokio::test]
    async fn export_is_sorted() {
        let store = InMemoryConnectionStore::new(10);
        let at = Utc::now();
        store.add_user("zoe".into()).await.unwrap();
        store.connect("carl".into(), "bea".into(), at).await.unwrap();
        store.connect("abe".into(), "carl".into(), at).await.unwrap();

        let (users, connections) = store.export_all().await;
        let users: Vec<_> = users.iter().map(UserId::as_str).collect();
        assert_eq!(users, vec!["abe", "bea", "carl", "zoe"]);

        let pairs: Vec<_> = connections
            .iter()
            .map(|c| (c.a().as_str(), c.b().as_str()))
            .collect();
        assert_eq!(pairs, vec![("abe", "carl"), ("bea", "carl")]);
    }

    #[tokio::test]
    async fn disconnect_and_remove() {
        let store = InMemoryConnectionStore::new(10);
        let at = Utc::now();
        store.connect("a".into(), "b".into(), at).await.unwrap();

        assert!(store.disconnect(&"b".into(), &"a".into()).await);
        assert!(!store.disconnect(&"b".into(), &"a".into()).await);
        assert_eq!(store.remove_user(&"a".into()).await.unwrap(), 0);

        let err = store.remove_user(&"a".into()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Connection(ConnectionError::UnknownUser(_))
        ));
    }
}
