//! Batched frontier expansion.
//!
//! One BFS level costs `ceil(frontier / batch_size)` store queries, issued
//! up to `level_fanout` at a time. Results land in ordered collections, so
//! the output never depends on which chunk finished first.

use super::TraversalEngine;
use crate::context::CallContext;
use crate::domain::{Connection, UserId};
use crate::error::Result;
use futures::{StreamExt, TryStreamExt, stream};
use std::collections::{BTreeMap, BTreeSet};
use tracing::trace;

impl TraversalEngine {
    /// Distinct neighbors of `frontier` that are not in `visited`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` if a frontier id is malformed
    /// - `Error::StoreUnavailable`, `Error::Cancelled` or
    ///   `Error::DeadlineExceeded` if a batch query fails
    pub async fn expand(
        &self,
        ctx: &CallContext,
        frontier: &BTreeSet<UserId>,
        visited: &BTreeSet<UserId>,
    ) -> Result<BTreeSet<UserId>> {
        for id in frontier {
            id.validate()?;
        }
        let ctx = self.call_context(ctx);
        self.expand_level(&ctx, frontier, visited).await
    }

    /// [`expand`](Self::expand) without validation, for callers holding a
    /// merged context.
    pub(super) async fn expand_level(
        &self,
        ctx: &CallContext,
        frontier: &BTreeSet<UserId>,
        visited: &BTreeSet<UserId>,
    ) -> Result<BTreeSet<UserId>> {
        let adjacency = self.adjacency(ctx, frontier).await?;
        Ok(adjacency
            .into_values()
            .flatten()
            .filter(|id| !visited.contains(id))
            .collect())
    }

    /// Sorted neighbor set of every frontier node.
    ///
    /// Every frontier id has an entry, empty when it has no connections.
    pub(super) async fn adjacency(
        &self,
        ctx: &CallContext,
        frontier: &BTreeSet<UserId>,
    ) -> Result<BTreeMap<UserId, BTreeSet<UserId>>> {
        let mut adjacency: BTreeMap<UserId, BTreeSet<UserId>> = frontier
            .iter()
            .map(|id| (id.clone(), BTreeSet::new()))
            .collect();
        if frontier.is_empty() {
            return Ok(adjacency);
        }

        let ids: Vec<UserId> = frontier.iter().cloned().collect();
        let chunks: Vec<&[UserId]> = ids.chunks(self.config.batch_size).collect();
        trace!(frontier = ids.len(), chunks = chunks.len(), "expanding frontier");

        // Build the (lazy) query futures up front so the spawned future's type
        // does not hold a higher-ranked closure, which breaks `Send` inference.
        let queries: Vec<_> = chunks
            .into_iter()
            .map(|chunk| self.query(ctx, self.store.neighbors(chunk)))
            .collect();
        let batches: Vec<Vec<Connection>> = stream::iter(queries)
            .buffer_unordered(self.config.level_fanout)
            .try_collect()
            .await?;

        for connection in batches.into_iter().flatten() {
            for own in [connection.a(), connection.b()] {
                if let (Some(neighbors), Some(other)) =
                    (adjacency.get_mut(own), connection.other(own))
                {
                    neighbors.insert(other.clone());
                }
            }
        }

        Ok(adjacency)
    }
}
