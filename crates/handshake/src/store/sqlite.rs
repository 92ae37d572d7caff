//! `SQLite`-backed connection store.
//!
//! Users and connections live in two tables. Connections are stored once,
//! canonically (`user_a < user_b`), with `created_at` as unix milliseconds.
//! Frontier lookups become a single `IN (…)` query per chunk.
//!
//! `rusqlite` is synchronous, so every query runs on the blocking pool via
//! `spawn_blocking`. A query whose caller has been cancelled still runs to
//! completion there; its result is simply dropped.

// SQLite stores every integer as i64. Counts are never negative.
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection as SqlConnection, Transaction, params, params_from_iter};

use crate::domain::{Connection, UserId};
use crate::error::{ConnectionError, Error, Result};
use crate::store::{ConnectionStore, bucket_by_day};

/// Largest number of ids bound into one `IN (…)` list.
const MAX_IDS_PER_QUERY: usize = 500;

/// Database schema definition.
pub(crate) const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY
) WITHOUT ROWID;

-- One row per unordered pair; the primary key doubles as the user_a index.
CREATE TABLE IF NOT EXISTS connections (
    user_a TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    user_b TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (user_a, user_b),
    CHECK (user_a < user_b)
) WITHOUT ROWID;

CREATE INDEX IF NOT EXISTS idx_connections_b ON connections(user_b);
CREATE INDEX IF NOT EXISTS idx_connections_created ON connections(created_at);
";

/// Outcome of a bulk [`SqliteConnectionStore::import`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    /// Users that were not registered before.
    pub users_added: usize,
    /// Connections written.
    pub connections_added: usize,
    /// Connections refused, in input order.
    pub rejected: Vec<ConnectionError>,
}

/// Connection store persisted in a `SQLite` database.
///
/// Cloning yields another handle to the same database connection.
#[derive(Clone)]
pub struct SqliteConnectionStore {
    conn: Arc<Mutex<SqlConnection>>,
    max_connections_per_user: usize,
}

impl std::fmt::Debug for SqliteConnectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnectionStore")
            .field("max_connections_per_user", &self.max_connections_per_user)
            .finish_non_exhaustive()
    }
}

impl SqliteConnectionStore {
    /// Open or create the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the file cannot be opened or the
    /// schema cannot be applied.
    pub async fn open(path: &Path, max_connections_per_user: usize) -> Result<Self> {
        let path = path.to_path_buf();
        let conn = tokio::task::spawn_blocking(move || -> Result<SqlConnection> {
            let conn = SqlConnection::open(&path)?;
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
            Ok(conn)
        })
        .await??;

        Self::with_connection(conn, max_connections_per_user)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` if the schema cannot be applied.
    pub fn open_in_memory(max_connections_per_user: usize) -> Result<Self> {
        Self::with_connection(SqlConnection::open_in_memory()?, max_connections_per_user)
    }

    fn with_connection(conn: SqlConnection, max_connections_per_user: usize) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            max_connections_per_user,
        })
    }

    /// Run `f` against the locked connection on the blocking pool.
    async fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqlConnection) -> Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = lock(&conn)?;
            f(&mut guard)
        })
        .await?
    }

    /// Register a user. Returns `false` if they already existed.
    ///
    /// # Errors
    ///
    /// `Error::InvalidParameter` for a malformed id, `Error::StoreUnavailable`
    /// on database failure.
    pub async fn insert_user(&self, id: UserId) -> Result<bool> {
        id.validate()?;
        self.run(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO users (id) VALUES (?1)",
                [id.as_str()],
            )?;
            Ok(inserted == 1)
        })
        .await
    }

    /// Connect two users, registering either endpoint if needed.
    ///
    /// # Errors
    ///
    /// - `Error::InvalidParameter` for malformed ids
    /// - `Error::Connection` for self-connections, duplicates, or a saturated endpoint
    /// - `Error::StoreUnavailable` on database failure
    pub async fn insert_connection(
        &self,
        x: UserId,
        y: UserId,
        created_at: DateTime<Utc>,
    ) -> Result<Connection> {
        x.validate()?;
        y.validate()?;
        let connection = Connection::new(x, y, created_at)?;
        let max = self.max_connections_per_user;

        self.run(move |conn| {
            let tx = conn.transaction()?;
            ensure_user(&tx, connection.a())?;
            ensure_user(&tx, connection.b())?;
            try_connect(&tx, &connection, max)??;
            tx.commit()?;
            Ok(connection)
        })
        .await
    }

    /// Write many users and connections in one transaction.
    ///
    /// Connections that violate a store rule are skipped and reported; the
    /// rest are committed together.
    ///
    /// # Errors
    ///
    /// Returns `Error::StoreUnavailable` on database failure, in which case
    /// nothing is written.
    pub async fn import(
        &self,
        users: Vec<UserId>,
        connections: Vec<Connection>,
    ) -> Result<ImportReport> {
        let max = self.max_connections_per_user;

        let report = self
            .run(move |conn| {
                let tx = conn.transaction()?;
                let mut report = ImportReport::default();

                for id in &users {
                    if ensure_user(&tx, id)? {
                        report.users_added += 1;
                    }
                }
                for connection in &connections {
                    report.users_added += usize::from(ensure_user(&tx, connection.a())?);
                    report.users_added += usize::from(ensure_user(&tx, connection.b())?);
                    match try_connect(&tx, connection, max)? {
                        Ok(()) => report.connections_added += 1,
                        Err(rejection) => report.rejected.push(rejection),
                    }
                }

                tx.commit()?;
                Ok(report)
            })
            .await?;

        tracing::debug!(
            users = report.users_added,
            connections = report.connections_added,
            rejected = report.rejected.len(),
            "import committed"
        );
        Ok(report)
    }
}

fn lock(conn: &Mutex<SqlConnection>) -> Result<MutexGuard<'_, SqlConnection>> {
    conn.lock()
        .map_err(|e| Error::StoreUnavailable(format!("connection mutex poisoned: {e}")))
}

/// Insert `id` if missing. Returns whether a row was added.
fn ensure_user(tx: &Transaction<'_>, id: &UserId) -> Result<bool> {
    let inserted = tx.execute("INSERT OR IGNORE INTO users (id) VALUES (?1)", [id.as_str()])?;
    Ok(inserted == 1)
}

fn degree(tx: &Transaction<'_>, id: &UserId) -> Result<usize> {
    let count: i64 = tx.query_row(
        "SELECT COUNT(*) FROM connections WHERE user_a = ?1 OR user_b = ?1",
        [id.as_str()],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Insert a connection after checking duplicates and degree bounds.
///
/// The outer `Result` carries database failures, the inner one store-rule
/// rejections.
fn try_connect(
    tx: &Transaction<'_>,
    connection: &Connection,
    max: usize,
) -> Result<std::result::Result<(), ConnectionError>> {
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM connections WHERE user_a = ?1 AND user_b = ?2)",
        [connection.a().as_str(), connection.b().as_str()],
        |row| row.get(0),
    )?;
    if exists {
        return Ok(Err(ConnectionError::AlreadyConnected {
            a: connection.a().clone(),
            b: connection.b().clone(),
        }));
    }

    for id in [connection.a(), connection.b()] {
        if degree(tx, id)? >= max {
            return Ok(Err(ConnectionError::LimitReached {
                user: id.clone(),
                limit: max,
            }));
        }
    }

    tx.execute(
        "INSERT INTO connections (user_a, user_b, created_at) VALUES (?1, ?2, ?3)",
        params![
            connection.a().as_str(),
            connection.b().as_str(),
            connection.created_at().timestamp_millis()
        ],
    )?;
    Ok(Ok(()))
}

/// `?1, ?2, …, ?n` for an `IN (…)` list.
fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn timestamp(ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| Error::StoreUnavailable(format!("corrupt created_at value {ms}")))
}

/// Read `(user_a, user_b, created_at)` rows into connections.
fn collect_connections(
    conn: &SqlConnection,
    sql: &str,
    ids: &[String],
    out: &mut Vec<Connection>,
) -> Result<()> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params_from_iter(ids), |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
        ))
    })?;

    for row in rows {
        let (a, b, ms) = row?;
        out.push(Connection::between(UserId::new(a), UserId::new(b), timestamp(ms)?));
    }
    Ok(())
}

fn owned_ids(ids: &[UserId]) -> Vec<String> {
    ids.iter().map(|id| id.as_str().to_owned()).collect()
}

#[async_trait]
impl ConnectionStore for SqliteConnectionStore {
    async fn neighbors(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let ids = owned_ids(ids);

        self.run(move |conn| {
            let mut found = Vec::new();
            for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
                let list = placeholders(chunk.len());
                let sql = format!(
                    "SELECT user_a, user_b, created_at FROM connections
                     WHERE user_a IN ({list}) OR user_b IN ({list})"
                );
                collect_connections(conn, &sql, chunk, &mut found)?;
            }
            // Chunks can overlap on edges between ids of different chunks.
            found.sort();
            found.dedup();
            Ok(found)
        })
        .await
    }

    async fn edges_among(&self, ids: &[UserId]) -> Result<Vec<Connection>> {
        if ids.len() < 2 {
            return Ok(Vec::new());
        }
        let ids = owned_ids(ids);

        self.run(move |conn| {
            let members: HashSet<&str> = ids.iter().map(String::as_str).collect();
            let mut candidates = Vec::new();
            // Every induced edge has its lower endpoint in some chunk.
            for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
                let sql = format!(
                    "SELECT user_a, user_b, created_at FROM connections WHERE user_a IN ({})",
                    placeholders(chunk.len())
                );
                collect_connections(conn, &sql, chunk, &mut candidates)?;
            }

            let mut edges: Vec<Connection> = candidates
                .into_iter()
                .filter(|c| members.contains(c.b().as_str()))
                .collect();
            edges.sort();
            edges.dedup();
            Ok(edges)
        })
        .await
    }

    async fn user_exists(&self, id: &UserId) -> Result<bool> {
        let id = id.as_str().to_owned();
        self.run(move |conn| {
            let exists = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
                [&id],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
    }

    async fn connection_counts(&self, ids: &[UserId]) -> Result<BTreeMap<UserId, u64>> {
        let mut counts: BTreeMap<UserId, u64> = ids.iter().map(|id| (id.clone(), 0)).collect();
        if ids.is_empty() {
            return Ok(counts);
        }
        let ids = owned_ids(ids);

        let found = self
            .run(move |conn| {
                let mut found = Vec::new();
                for chunk in ids.chunks(MAX_IDS_PER_QUERY) {
                    let list = placeholders(chunk.len());
                    let sql = format!(
                        "SELECT uid, COUNT(*) FROM (
                             SELECT user_a AS uid FROM connections WHERE user_a IN ({list})
                             UNION ALL
                             SELECT user_b AS uid FROM connections WHERE user_b IN ({list})
                         ) GROUP BY uid"
                    );
                    let mut stmt = conn.prepare_cached(&sql)?;
                    let rows = stmt.query_map(params_from_iter(chunk), |row| {
                        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
                    })?;
                    for row in rows {
                        found.push(row?);
                    }
                }
                Ok(found)
            })
            .await?;

        for (id, count) in found {
            counts.insert(UserId::new(id), count as u64);
        }
        Ok(counts)
    }

    async fn connections_before(&self, id: &UserId, cutoff: DateTime<Utc>) -> Result<u64> {
        let id = id.as_str().to_owned();
        self.run(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM connections
                 WHERE (user_a = ?1 OR user_b = ?1) AND created_at < ?2",
                params![id, cutoff.timestamp_millis()],
                |row| row.get(0),
            )?;
            Ok(count as u64)
        })
        .await
    }

    async fn connections_by_day(
        &self,
        id: &UserId,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<BTreeMap<NaiveDate, u64>> {
        let id = id.as_str().to_owned();
        let stamps = self
            .run(move |conn| {
                let mut stmt = conn.prepare_cached(
                    "SELECT created_at FROM connections
                     WHERE (user_a = ?1 OR user_b = ?1)
                       AND created_at >= ?2 AND created_at < ?3",
                )?;
                let rows = stmt.query_map(
                    params![id, from.timestamp_millis(), until.timestamp_millis()],
                    |row| row.get::<_, i64>(0),
                )?;
                let mut stamps = Vec::new();
                for ms in rows {
                    stamps.push(timestamp(ms?)?);
                }
                Ok(stamps)
            })
            .await?;

        Ok(bucket_by_day(stamps))
    }
}
