//! Configuration for the traversal engine and its store.
//!
//! Configuration lives in a YAML file (`handshake.yaml` by convention).
//! Every section and field is optional; anything left out takes the default
//! shown below.
//!
//! ```yaml
//! engine:
//!   batch_size: 500
//!   level_fanout: 4
//!   max_in_flight_queries: 16
//!   call_timeout_ms: 10000
//!   limits:
//!     max_depth: 6
//!     max_total: 10000
//!     slice_max_depth: 3
//!     slice_node_cap: 1000
//!     stats_depth: 3
//!     growth_max_days: 366
//! store:
//!   backend: sqlite
//!   path: handshake.db
//!   max_connections_per_user: 150
//! ```

use crate::error::{Error, Result};
use crate::store::StoreBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "handshake.yaml";

/// Hard upper bound on ids per neighbor query.
pub const MAX_BATCH_SIZE: usize = 1000;

/// Deepest slice the visualization supports.
pub const MAX_SLICE_DEPTH: u32 = 3;

/// Top-level configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HandshakeConfig {
    /// Traversal engine tuning and request limits.
    pub engine: EngineConfig,

    /// Connection store selection.
    pub store: StoreConfig,
}

/// Traversal engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Maximum ids per batched neighbor query.
    pub batch_size: usize,

    /// Concurrent chunk queries issued for a single BFS level.
    pub level_fanout: usize,

    /// Batch queries in flight across all calls sharing one engine.
    pub max_in_flight_queries: usize,

    /// Deadline applied to calls that do not bring their own; `null` disables it.
    pub call_timeout_ms: Option<u64>,

    /// Bounds enforced on request parameters.
    pub limits: Limits,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            level_fanout: 4,
            max_in_flight_queries: 16,
            call_timeout_ms: Some(10_000),
            limits: Limits::default(),
        }
    }
}

impl EngineConfig {
    /// The default call deadline, if any.
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(Error::Config(format!(
                "engine.batch_size must be between 1 and {MAX_BATCH_SIZE}, got {}",
                self.batch_size
            )));
        }
        if self.level_fanout == 0 {
            return Err(Error::Config("engine.level_fanout must be at least 1".into()));
        }
        if self.max_in_flight_queries == 0 {
            return Err(Error::Config(
                "engine.max_in_flight_queries must be at least 1".into(),
            ));
        }
        if self.call_timeout_ms == Some(0) {
            return Err(Error::Config(
                "engine.call_timeout_ms must be positive (use null to disable)".into(),
            ));
        }
        self.limits.validate()
    }
}

/// Request parameter bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Limits {
    /// Largest `max_depth` accepted by reachability and path queries.
    pub max_depth: u32,

    /// Largest `max_total` accepted by reachability queries.
    pub max_total: usize,

    /// Largest slice depth.
    pub slice_max_depth: u32,

    /// Node cap for visualization slices.
    pub slice_node_cap: usize,

    /// Levels reported by depth statistics.
    pub stats_depth: u32,

    /// Longest growth window in days.
    pub growth_max_days: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_depth: 6,
            max_total: 10_000,
            slice_max_depth: MAX_SLICE_DEPTH,
            slice_node_cap: 1000,
            stats_depth: 3,
            growth_max_days: 366,
        }
    }
}

impl Limits {
    fn validate(&self) -> Result<()> {
        let positive = [
            ("limits.max_depth", u64::from(self.max_depth)),
            ("limits.max_total", self.max_total as u64),
            ("limits.slice_max_depth", u64::from(self.slice_max_depth)),
            ("limits.slice_node_cap", self.slice_node_cap as u64),
            ("limits.stats_depth", u64::from(self.stats_depth)),
            ("limits.growth_max_days", u64::from(self.growth_max_days)),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, v)| *v == 0) {
            return Err(Error::Config(format!("engine.{name} must be at least 1")));
        }
        if self.slice_max_depth > MAX_SLICE_DEPTH {
            return Err(Error::Config(format!(
                "engine.limits.slice_max_depth cannot exceed {MAX_SLICE_DEPTH}"
            )));
        }
        if self.stats_depth > self.max_depth {
            return Err(Error::Config(
                "engine.limits.stats_depth cannot exceed engine.limits.max_depth".into(),
            ));
        }
        Ok(())
    }
}

/// Store section of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend type: `sqlite`, `snapshot` (JSONL loaded into memory) or `memory`.
    pub backend: String,

    /// Data file, relative to the configuration file's directory.
    pub path: String,

    /// Degree bound enforced on connection writes.
    pub max_connections_per_user: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: "handshake.db".to_string(),
            max_connections_per_user: 150,
        }
    }
}

impl StoreConfig {
    /// Resolve the configured backend, anchoring relative paths at `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for an unknown backend name.
    pub fn to_backend(&self, base_dir: &Path) -> Result<StoreBackend> {
        let path = base_dir.join(&self.path);
        match self.backend.as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite(path)),
            "snapshot" => Ok(StoreBackend::Snapshot(path)),
            "memory" => Ok(StoreBackend::InMemory),
            other => Err(Error::Config(format!(
                "unknown store backend '{other}' (expected sqlite, snapshot or memory)"
            ))),
        }
    }
}

impl HandshakeConfig {
    /// Parse and validate configuration from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for malformed YAML or invalid settings.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file cannot be read, `Error::Config` if it
    /// cannot be parsed or fails validation.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).await?;
        Self::from_yaml_str(&content)
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.store.max_connections_per_user == 0 {
            return Err(Error::Config(
                "store.max_connections_per_user must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
