//! The traversal engine.
//!
//! [`TraversalEngine`] drives every graph operation against a
//! [`ConnectionStore`]. It holds no graph state of its own: visited sets,
//! frontiers and parent maps are created per call and dropped with it.
//!
//! # Operations
//!
//! | Operation | Module |
//! |---|---|
//! | [`expand`](TraversalEngine::expand) | `frontier` |
//! | [`reachability`](TraversalEngine::reachability), [`notification_recipients`](TraversalEngine::notification_recipients) | `reachability` |
//! | [`shortest_path`](TraversalEngine::shortest_path) | `path` |
//! | [`slice`](TraversalEngine::slice) | `slice` |
//! | [`stats_by_depth`](TraversalEngine::stats_by_depth), [`growth_series`](TraversalEngine::growth_series) | `aggregate` |
//!
//! # Resource Model
//!
//! Clones of an engine share one semaphore of `max_in_flight_queries`
//! permits. Every store query holds a permit while it runs, so the store
//! never sees more concurrent queries than that, however many calls are
//! active. Waiting for a permit counts against the call's deadline.

mod aggregate;
mod frontier;
mod path;
mod reachability;
mod slice;

pub use aggregate::{cumulative_series, depth_histogram};

use crate::config::EngineConfig;
use crate::context::CallContext;
use crate::domain::UserId;
use crate::error::{Error, Result};
use crate::store::ConnectionStore;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounded graph traversals over a connection store.
#[derive(Clone)]
pub struct TraversalEngine {
    store: Arc<dyn ConnectionStore>,
    config: EngineConfig,
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for TraversalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraversalEngine")
            .field("config", &self.config)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl TraversalEngine {
    /// Create an engine over `store`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if `config` fails validation.
    pub fn new(store: Arc<dyn ConnectionStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let permits = Arc::new(Semaphore::new(config.max_in_flight_queries));
        Ok(Self {
            store,
            config,
            permits,
        })
    }

    /// The engine's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<dyn ConnectionStore> {
        &self.store
    }

    /// `ctx` with the configured call timeout applied if it has no deadline.
    fn call_context(&self, ctx: &CallContext) -> CallContext {
        ctx.or_timeout(self.config.call_timeout())
    }

    /// Run one store query under a permit, raced against `ctx`.
    async fn query<T, F>(&self, ctx: &CallContext, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        ctx.guard(async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| Error::StoreUnavailable("query permit pool closed".into()))?;
            fut.await
        })
        .await
    }

    /// Fail with `RootNotFound` unless `id` is a registered user.
    async fn require_user(&self, ctx: &CallContext, id: &UserId) -> Result<()> {
        if self.query(ctx, self.store.user_exists(id)).await? {
            Ok(())
        } else {
            Err(Error::RootNotFound(id.clone()))
        }
    }
}

/// Reject `value` unless it lies in `1..=max`.
fn check_bound(name: &'static str, value: u64, max: u64) -> Result<()> {
    if value == 0 {
        return Err(Error::invalid(name, "must be at least 1"));
    }
    if value > max {
        return Err(Error::invalid(name, format!("must not exceed {max}")));
    }
    Ok(())
}
