//! Core in-memory store data structures.
//!
//! This module contains the inner structure that holds the graph and is
//! wrapped in `Arc<RwLock<>>` for thread safety.

use crate::domain::{Connection, UserId};
use crate::error::ConnectionError;
use chrono::{DateTime, Utc};
use petgraph::stable_graph::{NodeIndex, StableUnGraph};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

/// Inner store structure (not thread-safe).
///
/// # Graph Representation
///
/// Users are nodes of an undirected `StableUnGraph`; each connection is a
/// single edge weighted by its creation time. A stable graph keeps node
/// indices valid across `remove_user`, so `node_map` never needs rebuilding.
pub(crate) struct InMemoryStoreInner {
    /// Connection graph. Node weights are user ids, edge weights creation times.
    pub(super) graph: StableUnGraph<UserId, DateTime<Utc>>,

    /// Mapping from user id to graph node.
    ///
    /// Every node in `graph` has exactly one entry here.
    pub(super) node_map: HashMap<UserId, NodeIndex>,

    /// Degree bound enforced by `connect`.
    pub(super) max_connections_per_user: usize,
}

impl InMemoryStoreInner {
    /// Create an empty store.
    pub(crate) fn new(max_connections_per_user: usize) -> Self {
        Self {
            graph: StableUnGraph::default(),
            node_map: HashMap::new(),
            max_connections_per_user,
        }
    }

    /// Register a user, returning its node. Registering twice is a no-op.
    pub(super) fn add_user(&mut self, id: UserId) -> NodeIndex {
        if let Some(&node) = self.node_map.get(&id) {
            return node;
        }
        let node = self.graph.add_node(id.clone());
        self.node_map.insert(id, node);
        node
    }

    /// Number of connections held by `node`.
    pub(super) fn degree(&self, node: NodeIndex) -> usize {
        self.graph.edges(node).count()
    }

    /// Create a connection, registering unknown endpoints once it is accepted.
    ///
    /// All checks run before anything is mutated, so a rejected connection
    /// leaves the store untouched. An unregistered endpoint counts as having
    /// no connections.
    pub(super) fn connect(
        &mut self,
        x: UserId,
        y: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Connection, ConnectionError> {
        let connection = Connection::new(x, y, created_at)?;

        let a = self.node_map.get(connection.a()).copied();
        let b = self.node_map.get(connection.b()).copied();

        if let (Some(a), Some(b)) = (a, b)
            && self.graph.find_edge(a, b).is_some()
        {
            return Err(ConnectionError::AlreadyConnected {
                a: connection.a().clone(),
                b: connection.b().clone(),
            });
        }

        for (node, id) in [(a, connection.a()), (b, connection.b())] {
            if node.map_or(0, |n| self.degree(n)) >= self.max_connections_per_user {
                return Err(ConnectionError::LimitReached {
                    user: id.clone(),
                    limit: self.max_connections_per_user,
                });
            }
        }

        let a = self.add_user(connection.a().clone());
        let b = self.add_user(connection.b().clone());
        self.graph.add_edge(a, b, created_at);
        Ok(connection)
    }

    /// Remove the connection between `x` and `y`. Returns whether one existed.
    pub(super) fn disconnect(&mut self, x: &UserId, y: &UserId) -> bool {
        let (Some(&a), Some(&b)) = (self.node_map.get(x), self.node_map.get(y)) else {
            return false;
        };
        match self.graph.find_edge(a, b) {
            Some(edge) => {
                self.graph.remove_edge(edge);
                true
            }
            None => false,
        }
    }

    /// Delete a user and every connection they hold.
    ///
    /// Returns the number of connections removed.
    pub(super) fn remove_user(&mut self, id: &UserId) -> Result<usize, ConnectionError> {
        let node = self
            .node_map
            .remove(id)
            .ok_or_else(|| ConnectionError::UnknownUser(id.clone()))?;
        let removed = self.degree(node);
        self.graph.remove_node(node);
        Ok(removed)
    }

    /// Every connection incident to `node`.
    pub(super) fn connections_of(&self, node: NodeIndex) -> impl Iterator<Item = Connection> + '_ {
        self.graph.edges(node).map(|edge| {
            Connection::between(
                self.graph[edge.source()].clone(),
                self.graph[edge.target()].clone(),
                *edge.weight(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        format!("2026-01-{day:02}T09:00:00Z").parse().unwrap()
    }

    #[test]
    fn connect_registers_endpoints() {
        let mut inner = InMemoryStoreInner::new(10);
        inner.connect("b".into(), "a".into(), at(1)).unwrap();

        assert_eq!(inner.node_map.len(), 2);
        assert_eq!(inner.graph.edge_count(), 1);
    }

    #[test]
    fn duplicate_connection_in_either_direction_is_rejected() {
        let mut inner = InMemoryStoreInner::new(10);
        inner.connect("a".into(), "b".into(), at(1)).unwrap();

        let err = inner.connect("b".into(), "a".into(), at(2)).unwrap_err();
        assert_eq!(
            err,
            ConnectionError::AlreadyConnected {
                a: "a".into(),
                b: "b".into()
            }
        );
        assert_eq!(inner.graph.edge_count(), 1);
    }

    #[test]
    fn limit_applies_to_both_endpoints() {
        let mut inner = InMemoryStoreInner::new(1);
        inner.connect("a".into(), "b".into(), at(1)).unwrap();

        let err = inner.connect("c".into(), "b".into(), at(2)).unwrap_err();
        assert_eq!(
            err,
            ConnectionError::LimitReached {
                user: "b".into(),
                limit: 1
            }
        );
        assert!(!inner.node_map.contains_key(&UserId::new("c")));
        assert_eq!(inner.graph.node_count(), 2);
    }

    #[test]
    fn zero_limit_rejects_without_registering() {
        let mut inner = InMemoryStoreInner::new(0);

        let err = inner.connect("a".into(), "b".into(), at(1)).unwrap_err();
        assert_eq!(
            err,
            ConnectionError::LimitReached {
                user: "a".into(),
                limit: 0
            }
        );
        assert!(inner.node_map.is_empty());
    }

    #[test]
    fn remove_user_cascades_connections() {
        let mut inner = InMemoryStoreInner::new(10);
        inner.connect("a".into(), "b".into(), at(1)).unwrap();
        inner.connect("a".into(), "c".into(), at(2)).unwrap();
        inner.connect("b".into(), "c".into(), at(3)).unwrap();

        assert_eq!(inner.remove_user(&"a".into()).unwrap(), 2);
        assert_eq!(inner.graph.edge_count(), 1);

        // Remaining indices stay valid after removal.
        let b = inner.node_map[&UserId::new("b")];
        assert_eq!(inner.degree(b), 1);

        assert_eq!(
            inner.remove_user(&"a".into()).unwrap_err(),
            ConnectionError::UnknownUser("a".into())
        );
    }

    #[test]
    fn connections_of_are_canonical() {
        let mut inner = InMemoryStoreInner::new(10);
        inner.connect("zed".into(), "amy".into(), at(4)).unwrap();

        let zed = inner.node_map[&UserId::new("zed")];
        let conns: Vec<_> = inner.connections_of(zed).collect();
        assert_eq!(conns.len(), 1);
        assert_eq!(conns[0].a().as_str(), "amy");
        assert_eq!(conns[0].b().as_str(), "zed");
        assert_eq!(conns[0].created_at(), at(4));
    }
}
