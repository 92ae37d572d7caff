//! Depth histograms and connection growth series.
//!
//! The folding steps are plain functions over already-fetched data, so they
//! can be tested and reused without a store.

use super::{TraversalEngine, check_bound};
use crate::context::CallContext;
use crate::domain::{DepthHistogram, GrowthPoint, Reachability, UserId};
use crate::error::{Error, Result};
use chrono::{Days, NaiveDate, NaiveTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Count reachability entries per depth.
///
/// Levels `1..=levels` are always present, zero when empty.
pub fn depth_histogram(reach: &Reachability, levels: u32) -> DepthHistogram {
    let mut counts: BTreeMap<u32, u64> = (1..=levels).map(|depth| (depth, 0)).collect();
    for entry in &reach.entries {
        *counts.entry(entry.depth).or_insert(0) += 1;
    }
    DepthHistogram {
        counts,
        truncated: reach.truncated,
    }
}

/// Running connection totals for `days` consecutive days starting at `start`.
///
/// `baseline` is the count held before `start`; `daily` holds new
/// connections per day. Days missing from `daily` carry the previous total.
pub fn cumulative_series(
    baseline: u64,
    daily: &BTreeMap<NaiveDate, u64>,
    start: NaiveDate,
    days: u32,
) -> Vec<GrowthPoint> {
    let mut cumulative = baseline;
    start
        .iter_days()
        .take(days as usize)
        .map(|date| {
            cumulative += daily.get(&date).copied().unwrap_or(0);
            GrowthPoint { date, cumulative }
        })
        .collect()
}

impl TraversalEngine {
    /// How many users `root` reaches at each handshake distance.
    ///
    /// Covers levels `1..=stats_depth` from the configured limits, capped at
    /// `max_total` users overall.
    ///
    /// # Errors
    ///
    /// Same as [`reachability`](Self::reachability).
    pub async fn stats_by_depth(&self, ctx: &CallContext, root: &UserId) -> Result<DepthHistogram> {
        root.validate()?;
        let limits = &self.config.limits;

        let ctx = self.call_context(ctx);
        self.require_user(&ctx, root).await?;

        let reach = self
            .scan(&ctx, root, limits.stats_depth, limits.max_total, &BTreeSet::new())
            .await?;
        let histogram = depth_histogram(&reach, limits.stats_depth);

        debug!(root = %root, total = histogram.total(), "depth stats complete");
        Ok(histogram)
    }

    /// Daily cumulative connection count of `root` over the last `days`
    /// UTC days, today included.
    ///
    /// # Errors
    ///
    /// Same as [`growth_series_until`](Self::growth_series_until).
    pub async fn growth_series(
        &self,
        ctx: &CallContext,
        root: &UserId,
        days: u32,
    ) -> Result<Vec<GrowthPoint>> {
        let today = Utc::now().date_naive();
        self.growth_series_until(ctx, root, days, today).await
    }

    /// Daily cumulative connection count of `root` over the `days` UTC days
    /// ending at `end` inclusive.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` if `days` is outside `1..=growth_max_days`
    ///   or the window leaves the supported calendar range
    /// - `Error::RootNotFound` if `root` is not a registered user
    /// - `Error::StoreUnavailable`, `Error::Cancelled`, `Error::DeadlineExceeded`
    pub async fn growth_series_until(
        &self,
        ctx: &CallContext,
        root: &UserId,
        days: u32,
        end: NaiveDate,
    ) -> Result<Vec<GrowthPoint>> {
        root.validate()?;
        check_bound(
            "days",
            u64::from(days),
            u64::from(self.config.limits.growth_max_days),
        )?;

        let out_of_range = || Error::invalid("end", "window is outside the supported date range");
        let start = end
            .checked_sub_days(Days::new(u64::from(days - 1)))
            .ok_or_else(out_of_range)?;
        let from = start.and_time(NaiveTime::MIN).and_utc();
        let until = end
            .succ_opt()
            .ok_or_else(out_of_range)?
            .and_time(NaiveTime::MIN)
            .and_utc();

        let ctx = self.call_context(ctx);
        self.require_user(&ctx, root).await?;

        let baseline = self
            .query(&ctx, self.store.connections_before(root, from))
            .await?;
        let daily = self
            .query(&ctx, self.store.connections_by_day(root, from, until))
            .await?;

        let series = cumulative_series(baseline, &daily, start, days);
        debug!(root = %root, days, baseline, "growth series complete");
        Ok(series)
    }
}
