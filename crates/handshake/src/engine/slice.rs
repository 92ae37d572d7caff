//! Induced-subgraph slices for visualization.

use super::{TraversalEngine, check_bound};
use crate::context::CallContext;
use crate::domain::{Slice, SliceEdge, SliceNode, UserId};
use crate::error::Result;
use std::collections::BTreeSet;
use tracing::debug;

impl TraversalEngine {
    /// The neighborhood of `root` up to `depth` handshakes, with every
    /// connection among its members.
    ///
    /// The node set is the root (depth 0) plus a reachability scan capped so
    /// that the slice holds at most `slice_node_cap` nodes. Edges are not
    /// limited to the BFS tree: any connection whose endpoints are both in
    /// the node set is included.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` if `depth` is outside `1..=slice_max_depth`
    /// - `Error::RootNotFound` if `root` is not a registered user
    /// - `Error::StoreUnavailable`, `Error::Cancelled`, `Error::DeadlineExceeded`
    pub async fn slice(&self, ctx: &CallContext, root: &UserId, depth: u32) -> Result<Slice> {
        let limits = &self.config.limits;
        root.validate()?;
        check_bound(
            "depth",
            u64::from(depth),
            u64::from(limits.slice_max_depth),
        )?;

        let ctx = self.call_context(ctx);
        self.require_user(&ctx, root).await?;

        let cap = limits.slice_node_cap.saturating_sub(1);
        let reach = self
            .scan(&ctx, root, depth, cap, &BTreeSet::new())
            .await?;

        let mut nodes = Vec::with_capacity(reach.len() + 1);
        nodes.push(SliceNode {
            id: root.clone(),
            depth: 0,
        });
        nodes.extend(reach.entries.into_iter().map(|r| SliceNode {
            id: r.user_id,
            depth: r.depth,
        }));

        let ids: Vec<UserId> = nodes.iter().map(|n| n.id.clone()).collect();
        let members: BTreeSet<&UserId> = ids.iter().collect();
        let connections = self.query(&ctx, self.store.edges_among(&ids)).await?;

        // Canonical order on both sides makes the set sorted and duplicate-free.
        let edges: BTreeSet<SliceEdge> = connections
            .into_iter()
            .filter(|c| members.contains(c.a()) && members.contains(c.b()))
            .map(|c| SliceEdge {
                from: c.a().clone(),
                to: c.b().clone(),
            })
            .collect();

        debug!(
            root = %root,
            depth,
            nodes = nodes.len(),
            edges = edges.len(),
            truncated = reach.truncated,
            "slice complete"
        );

        Ok(Slice {
            nodes,
            edges: edges.into_iter().collect(),
            truncated: reach.truncated,
        })
    }
}
