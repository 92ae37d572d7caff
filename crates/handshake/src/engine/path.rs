//! Bidirectional BFS shortest path.
//!
//! Both ends grow one full level at a time. Each round expands whichever
//! frontier is smaller (the source side on ties) and then intersects the
//! newly discovered users with the other side's visited set. Because whole
//! levels are expanded, every meeting user found in the same round closes a
//! path of the same length, and that length is the true distance.

use super::{TraversalEngine, check_bound};
use crate::context::CallContext;
use crate::domain::{PathOutcome, UserId};
use crate::error::Result;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// One direction of the search.
struct SearchSide {
    /// Visited users mapped to the neighbor that discovered them.
    parents: BTreeMap<UserId, Option<UserId>>,
    frontier: BTreeSet<UserId>,
    depth: u32,
}

impl SearchSide {
    fn new(start: &UserId) -> Self {
        Self {
            parents: BTreeMap::from([(start.clone(), None)]),
            frontier: BTreeSet::from([start.clone()]),
            depth: 0,
        }
    }

    /// Chain from `from` back to this side's start, `from` first.
    fn walk_back(&self, from: &UserId) -> Vec<UserId> {
        let mut chain = vec![from.clone()];
        let mut current = from;
        while let Some(Some(parent)) = self.parents.get(current) {
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }
}

impl TraversalEngine {
    /// Shortest handshake chain from `source` to `target`.
    ///
    /// Returns `PathOutcome::NotFound` when no chain of at most `max_depth`
    /// hops exists. Among equally short chains the result is deterministic:
    /// lower ids are preferred both as discoverers and as meeting points.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` for an out-of-range `max_depth` or a
    ///   malformed id
    /// - `Error::RootNotFound` if either endpoint is not a registered user
    /// - `Error::StoreUnavailable`, `Error::Cancelled`, `Error::DeadlineExceeded`
    ///   if the search cannot finish
    pub async fn shortest_path(
        &self,
        ctx: &CallContext,
        source: &UserId,
        target: &UserId,
        max_depth: u32,
    ) -> Result<PathOutcome> {
        source.validate()?;
        target.validate()?;
        check_bound(
            "max_depth",
            u64::from(max_depth),
            u64::from(self.config.limits.max_depth),
        )?;

        let ctx = self.call_context(ctx);
        self.require_user(&ctx, source).await?;
        if source == target {
            return Ok(PathOutcome::Found(vec![source.clone()]));
        }
        self.require_user(&ctx, target).await?;

        let outcome = self.search(&ctx, source, target, max_depth).await?;
        debug!(
            source = %source,
            target = %target,
            hops = outcome.hops(),
            "shortest path complete"
        );
        Ok(outcome)
    }

    async fn search(
        &self,
        ctx: &CallContext,
        source: &UserId,
        target: &UserId,
        max_depth: u32,
    ) -> Result<PathOutcome> {
        let mut forward = SearchSide::new(source);
        let mut backward = SearchSide::new(target);

        while forward.depth + backward.depth < max_depth {
            if forward.frontier.is_empty() || backward.frontier.is_empty() {
                break;
            }

            let (near, far) = if backward.frontier.len() < forward.frontier.len() {
                (&mut backward, &forward)
            } else {
                (&mut forward, &backward)
            };
            self.advance(ctx, near).await?;

            let meeting = near
                .frontier
                .iter()
                .find(|id| far.parents.contains_key(*id))
                .cloned();
            if let Some(meeting) = meeting {
                let mut path = forward.walk_back(&meeting);
                path.reverse();
                path.extend(backward.walk_back(&meeting).into_iter().skip(1));
                return Ok(PathOutcome::Found(path));
            }
        }

        Ok(PathOutcome::NotFound)
    }

    /// Expand `side` by one level, recording the first discoverer of each user.
    async fn advance(&self, ctx: &CallContext, side: &mut SearchSide) -> Result<()> {
        let adjacency = self.adjacency(ctx, &side.frontier).await?;

        let mut next = BTreeSet::new();
        for (node, neighbors) in adjacency {
            for neighbor in neighbors {
                if !side.parents.contains_key(&neighbor) {
                    side.parents.insert(neighbor.clone(), Some(node.clone()));
                    next.insert(neighbor);
                }
            }
        }

        side.depth += 1;
        trace!(depth = side.depth, discovered = next.len(), "search side advanced");
        side.frontier = next;
        Ok(())
    }
}
