//! Domain types for the connection graph and traversal results.
//!
//! The graph itself is deliberately thin: a user is nothing more than an
//! opaque [`UserId`], and a [`Connection`] is an unordered pair of users plus
//! the instant it was created. Everything else in this module describes what
//! the traversal engine hands back to callers.

use crate::error::{ConnectionError, Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Maximum length of a user id in bytes.
pub const MAX_USER_ID_LEN: usize = 64;

/// Opaque identifier of a user node.
///
/// Ordering is byte-wise on the underlying string; every deterministic
/// tie-break in the engine (frontier sort order, truncation order, path
/// parent selection) uses it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id without validation.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a user id, rejecting malformed input.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if the id is empty, longer than
    /// [`MAX_USER_ID_LEN`] bytes, or contains whitespace or control characters.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = Self(id.into());
        id.validate()?;
        Ok(id)
    }

    /// Check that this id is well-formed.
    ///
    /// # Errors
    ///
    /// See [`UserId::parse`].
    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(Error::invalid("user id", "must not be empty"));
        }
        if self.0.len() > MAX_USER_ID_LEN {
            let head: String = self.0.chars().take(8).collect();
            return Err(Error::invalid(
                "user id",
                format!("'{head}…' exceeds {MAX_USER_ID_LEN} bytes"),
            ));
        }
        if self
            .0
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(Error::invalid(
                "user id",
                format!("'{}' contains whitespace or control characters", self.0.escape_debug()),
            ));
        }
        Ok(())
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An undirected connection between two users.
///
/// The pair is stored canonically (`a < b`), so two connections over the
/// same users always compare equal regardless of who sent the request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Connection {
    a: UserId,
    b: UserId,
    created_at: DateTime<Utc>,
}

impl Connection {
    /// Create a canonical connection between `x` and `y`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError::SelfConnection` if `x == y`.
    pub fn new(
        x: UserId,
        y: UserId,
        created_at: DateTime<Utc>,
    ) -> std::result::Result<Self, ConnectionError> {
        match x.cmp(&y) {
            std::cmp::Ordering::Less => Ok(Self {
                a: x,
                b: y,
                created_at,
            }),
            std::cmp::Ordering::Greater => Ok(Self {
                a: y,
                b: x,
                created_at,
            }),
            std::cmp::Ordering::Equal => Err(ConnectionError::SelfConnection(x)),
        }
    }

    /// Canonical connection from endpoints already known to differ.
    pub(crate) fn between(x: UserId, y: UserId, created_at: DateTime<Utc>) -> Self {
        let (a, b) = if x <= y { (x, y) } else { (y, x) };
        Self { a, b, created_at }
    }

    /// The lower endpoint.
    pub fn a(&self) -> &UserId {
        &self.a
    }

    /// The higher endpoint.
    pub fn b(&self) -> &UserId {
        &self.b
    }

    /// When the connection was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The endpoint opposite `id`, or `None` if `id` is not an endpoint.
    pub fn other(&self, id: &UserId) -> Option<&UserId> {
        if &self.a == id {
            Some(&self.b)
        } else if &self.b == id {
            Some(&self.a)
        } else {
            None
        }
    }
}

// ========== Traversal Requests ==========

/// Bounds for a reachability scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReachabilityParams {
    /// Deepest level to report (1 = direct connections).
    pub max_depth: u32,
    /// Maximum number of users to report.
    pub max_total: usize,
    /// Users removed from the graph for this call.
    pub exclude: BTreeSet<UserId>,
}

impl ReachabilityParams {
    /// Bounds with an empty exclusion set.
    pub fn new(max_depth: u32, max_total: usize) -> Self {
        Self {
            max_depth,
            max_total,
            exclude: BTreeSet::new(),
        }
    }

    /// Add users to the exclusion set.
    #[must_use]
    pub fn excluding<I, U>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = U>,
        U: Into<UserId>,
    {
        self.exclude.extend(ids.into_iter().map(Into::into));
        self
    }
}

// ========== Traversal Results ==========

/// A user discovered by a reachability scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reached {
    /// The discovered user.
    pub user_id: UserId,
    /// Shortest number of handshakes from the root.
    pub depth: u32,
}

/// Ordered output of a reachability scan.
///
/// Entries are sorted by depth, then by id. `truncated` is set when
/// `max_total` cut off at least one user that was reachable within
/// `max_depth`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reachability {
    /// Discovered users, nearest first.
    pub entries: Vec<Reached>,
    /// Whether the result was capped by `max_total`.
    pub truncated: bool,
}

impl Reachability {
    /// Number of reported users.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no user was reported.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reported ids in result order.
    pub fn ids(&self) -> impl Iterator<Item = &UserId> {
        self.entries.iter().map(|r| &r.user_id)
    }
}

/// Result of a shortest-path query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "path", rename_all = "snake_case")]
pub enum PathOutcome {
    /// The hop chain from source to target, both endpoints included.
    Found(Vec<UserId>),
    /// No path exists within the requested depth.
    NotFound,
}

impl PathOutcome {
    /// The hop chain, if one was found.
    pub fn path(&self) -> Option<&[UserId]> {
        match self {
            Self::Found(path) => Some(path),
            Self::NotFound => None,
        }
    }

    /// Number of edges on the path (the handshake distance).
    pub fn hops(&self) -> Option<usize> {
        self.path().map(|p| p.len().saturating_sub(1))
    }

    /// Whether a path was found.
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// A node of a visualization slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceNode {
    /// The user.
    pub id: UserId,
    /// Shortest distance from the slice root (0 for the root).
    pub depth: u32,
}

/// An edge of a visualization slice, canonical (`from < to`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SliceEdge {
    /// Lower endpoint.
    pub from: UserId,
    /// Higher endpoint.
    pub to: UserId,
}

/// Induced subgraph around a root, for visualization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slice {
    /// Nodes ordered by depth, then id; the root comes first.
    pub nodes: Vec<SliceNode>,
    /// Every connection between two slice nodes, sorted.
    pub edges: Vec<SliceEdge>,
    /// Whether the node set hit the visualization cap.
    pub truncated: bool,
}

/// Number of users reachable at each handshake distance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DepthHistogram {
    /// Depth → user count, with every level from 1 present.
    pub counts: BTreeMap<u32, u64>,
    /// Whether the underlying scan was capped.
    pub truncated: bool,
}

impl DepthHistogram {
    /// Total number of users across all levels.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// One day of a cumulative growth series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GrowthPoint {
    /// UTC calendar day.
    pub date: NaiveDate,
    /// Connections held at the end of that day.
    pub cumulative: u64,
}
