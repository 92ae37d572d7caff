//! Bounded BFS reachability.

use super::{TraversalEngine, check_bound};
use crate::context::CallContext;
use crate::domain::{Reachability, ReachabilityParams, Reached, UserId};
use crate::error::{Error, Result};
use std::collections::BTreeSet;
use tracing::{debug, trace};

impl TraversalEngine {
    /// Users within `params.max_depth` handshakes of `root`, nearest first.
    ///
    /// Each user is reported once, at their shortest distance. Excluded users
    /// are removed from the graph for this call: they are never reported and
    /// nothing is reached through them. When more than `params.max_total`
    /// users are reachable, the lowest ids of the cut level are kept and the
    /// result is flagged `truncated`.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` for out-of-range bounds, malformed ids, or
    ///   a root listed in the exclusion set
    /// - `Error::RootNotFound` if `root` is not a registered user
    /// - `Error::StoreUnavailable`, `Error::Cancelled`, `Error::DeadlineExceeded`
    ///   if the traversal cannot finish
    pub async fn reachability(
        &self,
        ctx: &CallContext,
        root: &UserId,
        params: &ReachabilityParams,
    ) -> Result<Reachability> {
        self.validate_reachability(root, params)?;

        let ctx = self.call_context(ctx);
        self.require_user(&ctx, root).await?;

        let result = self
            .scan(&ctx, root, params.max_depth, params.max_total, &params.exclude)
            .await?;

        debug!(
            root = %root,
            max_depth = params.max_depth,
            reached = result.len(),
            truncated = result.truncated,
            "reachability complete"
        );
        Ok(result)
    }

    /// Recipients for a fan-out notification from `root`, nearest first.
    ///
    /// This is the reachability id list. A truncated scan still yields its
    /// capped prefix; the cut is logged.
    ///
    /// # Errors
    ///
    /// Same as [`reachability`](Self::reachability).
    pub async fn notification_recipients(
        &self,
        ctx: &CallContext,
        root: &UserId,
        params: &ReachabilityParams,
    ) -> Result<Vec<UserId>> {
        let reach = self.reachability(ctx, root, params).await?;
        if reach.truncated {
            tracing::info!(
                root = %root,
                max_total = params.max_total,
                "notification fan-out capped"
            );
        }
        Ok(reach.ids().cloned().collect())
    }

    fn validate_reachability(&self, root: &UserId, params: &ReachabilityParams) -> Result<()> {
        let limits = &self.config.limits;
        root.validate()?;
        check_bound(
            "max_depth",
            u64::from(params.max_depth),
            u64::from(limits.max_depth),
        )?;
        check_bound(
            "max_total",
            params.max_total as u64,
            limits.max_total as u64,
        )?;
        for id in &params.exclude {
            id.validate()?;
        }
        if params.exclude.contains(root) {
            return Err(Error::invalid("exclude", "cannot contain the root"));
        }
        Ok(())
    }

    /// Level-synchronous BFS from `root`, stopping at `max_depth` levels or
    /// `max_total` users.
    ///
    /// A level that would overflow the cap is cut in ascending id order. When
    /// the cap is met exactly, the next level is still probed so that
    /// `truncated` is only set if some reachable user was actually left out.
    pub(super) async fn scan(
        &self,
        ctx: &CallContext,
        root: &UserId,
        max_depth: u32,
        max_total: usize,
        exclude: &BTreeSet<UserId>,
    ) -> Result<Reachability> {
        let mut visited = exclude.clone();
        visited.insert(root.clone());
        let mut frontier = BTreeSet::from([root.clone()]);
        let mut entries = Vec::new();
        let mut truncated = false;

        for depth in 1..=max_depth {
            let next = self.expand_level(ctx, &frontier, &visited).await?;
            if next.is_empty() {
                break;
            }

            let room = max_total.saturating_sub(entries.len());
            if next.len() > room {
                truncated = true;
            }
            let level: BTreeSet<UserId> = next.into_iter().take(room).collect();
            trace!(depth, found = level.len(), truncated, "level expanded");

            entries.extend(level.iter().map(|id| Reached {
                user_id: id.clone(),
                depth,
            }));
            if truncated {
                break;
            }

            visited.extend(level.iter().cloned());
            frontier = level;
        }

        Ok(Reachability { entries, truncated })
    }
}
