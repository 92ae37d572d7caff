//! Handshake - bounded traversals over a social connection graph.
//!
//! This crate answers "who is near whom" questions on an undirected graph of
//! user connections: multi-level reachability, shortest handshake chains,
//! visualization slices, and depth/time statistics. The graph itself stays
//! in a [`store::ConnectionStore`]; the [`TraversalEngine`] only reads it,
//! in bounded batches.
//!
//! # Example
//!
//! ```
//! use handshake::{CallContext, EngineConfig, PathOutcome, TraversalEngine};
//! use handshake::store::InMemoryConnectionStore;
//! use std::sync::Arc;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> handshake::Result<()> {
//!     let store = InMemoryConnectionStore::new(150);
//!     let now = chrono::Utc::now();
//!     store.connect("ana".into(), "ben".into(), now).await?;
//!     store.connect("ben".into(), "cy".into(), now).await?;
//!
//!     let engine = TraversalEngine::new(Arc::new(store), EngineConfig::default())?;
//!     let path = engine
//!         .shortest_path(&CallContext::new(), &"ana".into(), &"cy".into(), 6)
//!         .await?;
//!     assert_eq!(path.hops(), Some(2));
//!     assert!(matches!(path, PathOutcome::Found(_)));
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod domain;
pub mod engine;
pub mod error;
pub mod store;

pub use config::{EngineConfig, HandshakeConfig, Limits, StoreConfig};
pub use context::{CallContext, CancelToken};
pub use domain::{
    Connection, DepthHistogram, GrowthPoint, PathOutcome, Reachability, ReachabilityParams,
    Reached, Slice, SliceEdge, SliceNode, UserId,
};
pub use engine::TraversalEngine;
pub use error::{ConnectionError, Error, Result};
