//! `ConnectionStore` trait implementation for the in-memory store.

use super::InMemoryConnectionStore;
use super::graph::{connection_times, incident_connections, induced_connections};
use crate::domain::{Connection, UserId};
use crate::error::Result;
use crate::store::{ConnectionStore, bucket_by_day};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

#[async_trait]
impl ConnectionStore for InMemoryConnectionStore {
    async fn neighbors(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        let inner = self.inner.read().await;
        Ok(incident_connections(&inner, ids))
    }

    async fn edges_among(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        let inner = self.inner.read().await;
        Ok(induced_connections(&inner, ids))
    }

    async fn user_exists(&self, id: &UserId) -> Result<bool> {
        Ok(self.inner.read().await.node_map.contains_key(id))
    }

    async fn connection_counts(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, u64>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .map(|id| {
                let count = inner
                    .node_map
                    .get(id)
                    .map_or(0, |&node| inner.degree(node) as u64);
                (id.clone(), count)
            })
            .collect())
    }

    async fn connections_before(&self, id: &UserId, cutoff: DateTime<Utc>) -> Result<u64> {
        let inner = self.inner.read().await;
        Ok(connection_times(&inner, id)
            .into_iter()
            .filter(|at| *at < cutoff)
            .count() as u64)
    }

    async fn connections_by_day(
        &self,
        id: &UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, u64>> {
        let inner = self.inner.read().await;
        Ok(bucket_by_day(
            connection_times(&inner, id)
                .into_iter()
                .filter(|at| *at >= from && *at < until),
        ))
    }
}
