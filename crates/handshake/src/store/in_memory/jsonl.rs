//! JSONL snapshots for the in-memory store.
//!
//! Loading is resilient: a bad line is skipped with a [`LoadWarning`] and
//! the rest of the file is still imported.

use super::InMemoryConnectionStore;
use super::inner::InMemoryStoreInner;
use crate::domain::UserId;
use crate::error::{ConnectionError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

/// One line of a snapshot file.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SnapshotRecord {
    User {
        id: String,
    },
    Connection {
        a: String,
        b: String,
        created_at: DateTime<Utc>,
    },
}

/// Non-fatal problems found while loading a snapshot.
///
/// The offending line is skipped; every other line is still imported.
/// Line numbers are 1-based file lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadWarning {
    /// The line is not a valid snapshot record.
    MalformedJson { line_number: usize, error: String },

    /// A user id on the line failed validation.
    InvalidUserId { line_number: usize, error: String },

    /// A connection names the same user at both ends.
    SelfConnection { line_number: usize, user: UserId },

    /// The pair was already connected earlier in the file.
    DuplicateConnection {
        line_number: usize,
        a: UserId,
        b: UserId,
    },

    /// Importing the connection would exceed the degree bound.
    ConnectionLimit {
        line_number: usize,
        user: UserId,
        limit: usize,
    },
}

/// Load a store from a JSONL snapshot.
///
/// Blank lines are ignored. Connections may appear before the users they
/// name; endpoints are registered with the first connection accepted for them.
///
/// # Errors
///
/// Returns `Error::Io` if the file cannot be opened or read. Content
/// problems never fail the load; they are returned as warnings.
pub async fn load_from_jsonl(
    path: &Path,
    max_connections_per_user: usize,
) -> Result<(InMemoryConnectionStore, Vec<LoadWarning>)> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut inner = InMemoryStoreInner::new(max_connections_per_user);
    let mut warnings = Vec::new();
    let mut line_number = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let record = match serde_json::from_str::<SnapshotRecord>(&line) {
            Ok(record) => record,
            Err(e) => {
                warnings.push(LoadWarning::MalformedJson {
                    line_number,
                    error: e.to_string(),
                });
                continue;
            }
        };

        if let Some(warning) = apply_record(&mut inner, record, line_number) {
            warnings.push(warning);
        }
    }

    tracing::debug!(
        path = %path.display(),
        users = inner.node_map.len(),
        connections = inner.graph.edge_count(),
        warnings = warnings.len(),
        "snapshot loaded"
    );

    Ok((InMemoryConnectionStore::from_inner(inner), warnings))
}

fn apply_record(
    inner: &mut InMemoryStoreInner,
    record: SnapshotRecord,
    line_number: usize,
) -> Option<LoadWarning> {
    let invalid = |e: crate::error::Error| LoadWarning::InvalidUserId {
        line_number,
        error: e.to_string(),
    };

    match record {
        SnapshotRecord::User { id } => match UserId::parse(id) {
            Ok(id) => {
                inner.add_user(id);
                None
            }
            Err(e) => Some(invalid(e)),
        },
        SnapshotRecord::Connection { a, b, created_at } => {
            let (a, b) = match (UserId::parse(a), UserId::parse(b)) {
                (Ok(a), Ok(b)) => (a, b),
                (Err(e), _) | (_, Err(e)) => return Some(invalid(e)),
            };
            match inner.connect(a, b, created_at) {
                Ok(_) => None,
                Err(ConnectionError::SelfConnection(user)) => {
                    Some(LoadWarning::SelfConnection { line_number, user })
                }
                Err(ConnectionError::AlreadyConnected { a, b }) => {
                    Some(LoadWarning::DuplicateConnection { line_number, a, b })
                }
                Err(ConnectionError::LimitReached { user, limit }) => {
                    Some(LoadWarning::ConnectionLimit {
                        line_number,
                        user,
                        limit,
                    })
                }
                Err(ConnectionError::UnknownUser(user)) => Some(LoadWarning::InvalidUserId {
                    line_number,
                    error: format!("unknown user {user}"),
                }),
            }
        }
    }
}

/// Save a store to a JSONL snapshot.
///
/// Users are written first, then connections, both in ascending order, so
/// saving an unchanged store produces an identical file. The write goes to
/// a temporary file that is renamed over `path` on success.
///
/// # Errors
///
/// Returns `Error::Io` on write failure.
pub async fn save_to_jsonl(store: &InMemoryConnectionStore, path: &Path) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let file = File::create(&temp_path).await?;
    let mut writer = BufWriter::new(file);

    let (users, connections) = store.export_all().await;

    let user_records = users.into_iter().map(|id| SnapshotRecord::User {
        id: id.as_str().to_owned(),
    });
    let connection_records = connections.iter().map(|c| SnapshotRecord::Connection {
        a: c.a().as_str().to_owned(),
        b: c.b().as_str().to_owned(),
        created_at: c.created_at(),
    });

    for record in user_records.chain(connection_records) {
        let json = serde_json::to_string(&record)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await?;
    tokio::fs::rename(&temp_path, path).await?;

    tracing::debug!(path = %path.display(), connections = connections.len(), "snapshot saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_file(dir: &TempDir, content: &str) -> std::path::PathBuf {
        let path = dir.path().join("graph.jsonl");
        tokio::fs::write(&path, content).await.unwrap();
        path
    }

    #[tokio::test]
    async fn load_skips_bad_lines_with_warnings() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            concat!(
                r#"{"type":"user","id":"alice"}"#, "\n",
                "not json\n",
                "\n",
                r#"{"type":"connection","a":"alice","b":"bob","created_at":"2026-03-01T10:00:00Z"}"#, "\n",
                r#"{"type":"connection","a":"bob","b":"alice","created_at":"2026-03-02T10:00:00Z"}"#, "\n",
                r#"{"type":"connection","a":"carl","b":"carl","created_at":"2026-03-02T10:00:00Z"}"#, "\n",
                r#"{"type":"user","id":"has space"}"#, "\n",
            ),
        )
        .await;

        let (store, warnings) = load_from_jsonl(&path, 10).await.unwrap();

        assert_eq!(store.user_count().await, 2);
        assert_eq!(store.connection_count().await, 1);
        assert_eq!(warnings.len(), 4);
        assert!(matches!(warnings[0], LoadWarning::MalformedJson { line_number: 2, .. }));
        assert!(matches!(warnings[1], LoadWarning::DuplicateConnection { line_number: 5, .. }));
        assert!(matches!(warnings[2], LoadWarning::SelfConnection { line_number: 6, .. }));
        assert!(matches!(warnings[3], LoadWarning::InvalidUserId { line_number: 7, .. }));
    }

    #[tokio::test]
    async fn load_enforces_connection_limit() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            concat!(
                r#"{"type":"connection","a":"hub","b":"x","created_at":"2026-03-01T10:00:00Z"}"#, "\n",
                r#"{"type":"connection","a":"hub","b":"y","created_at":"2026-03-01T10:00:00Z"}"#, "\n",
            ),
        )
        .await;

        let (store, warnings) = load_from_jsonl(&path, 1).await.unwrap();
        assert_eq!(store.connection_count().await, 1);
        // The refused line does not register its new endpoint.
        assert_eq!(store.user_count().await, 2);
        assert_eq!(
            warnings,
            vec![LoadWarning::ConnectionLimit {
                line_number: 2,
                user: "hub".into(),
                limit: 1
            }]
        );
    }

    #[tokio::test]
    async fn save_then_load_preserves_graph() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.jsonl");

        let store = InMemoryConnectionStore::new(10);
        let at: DateTime<Utc> = "2026-04-01T12:30:00Z".parse().unwrap();
        store.add_user("loner".into()).await.unwrap();
        store.connect("bob".into(), "alice".into(), at).await.unwrap();

        save_to_jsonl(&store, &path).await.unwrap();

        let text = tokio::fs::read_to_string(&path).await.unwrap();
        let first_connection = text
            .lines()
            .position(|l| l.contains("\"connection\""))
            .unwrap();
        assert_eq!(first_connection, 3, "users are written before connections");

        let (loaded, warnings) = load_from_jsonl(&path, 10).await.unwrap();
        assert!(warnings.is_empty());
        assert_eq!(loaded.export_all().await, store.export_all().await);
        assert!(!dir.path().join("out.tmp").exists());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let err = load_from_jsonl(&dir.path().join("absent.jsonl"), 10)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::Error::Io(_)));
    }
}
