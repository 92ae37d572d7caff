//! Read queries over the in-memory connection graph.
//!
//! These back the `ConnectionStore` implementation:
//! - Batched incident-connection lookup
//! - Induced-subgraph edge lookup
//! - Per-user connection timestamps

use super::inner::InMemoryStoreInner;
use crate::domain::{Connection, UserId};
use chrono::{DateTime, Utc};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeSet, HashSet};

/// All connections touching any of `ids`, deduplicated.
///
/// A connection between two queried ids is reached from both endpoints;
/// the set keeps one copy.
pub(super) fn incident_connections(inner: &InMemoryStoreInner, ids: &[UserId]) -> Vec<Connection> {
    let mut found = BTreeSet::new();
    for id in ids {
        let Some(&node) = inner.node_map.get(id) else {
            continue;
        };
        found.extend(inner.connections_of(node));
    }
    found.into_iter().collect()
}

/// All connections with both endpoints in `ids`.
pub(super) fn induced_connections(inner: &InMemoryStoreInner, ids: &[UserId]) -> Vec<Connection> {
    let members: HashSet<&UserId> = ids.iter().collect();
    let mut found = BTreeSet::new();

    for id in ids {
        let Some(&node) = inner.node_map.get(id) else {
            continue;
        };
        for edge in inner.graph.edges(node) {
            let other = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            if members.contains(&inner.graph[other]) {
                found.insert(Connection::between(
                    id.clone(),
                    inner.graph[other].clone(),
                    *edge.weight(),
                ));
            }
        }
    }

    found.into_iter().collect()
}

/// Creation times of every connection held by `id`.
pub(super) fn connection_times(inner: &InMemoryStoreInner, id: &UserId) -> Vec<DateTime<Utc>> {
    inner
        .node_map
        .get(id)
        .map(|&node| inner.graph.edges(node).map(|e| *e.weight()).collect())
        .unwrap_or_default()
}
