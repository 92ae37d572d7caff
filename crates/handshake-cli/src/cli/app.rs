//! Configuration loading and engine construction shared by all commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use handshake::config::CONFIG_FILE_NAME;
use handshake::store::{StoreBackend, open_store};
use handshake::{HandshakeConfig, TraversalEngine};

/// Options accepted by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Explicit configuration file.
    pub config: Option<PathBuf>,
    /// Store override from the command line.
    pub store: Option<String>,
    /// Emit JSON instead of styled text.
    pub json: bool,
}

impl GlobalOpts {
    /// Read the configuration and return it with the directory that relative
    /// store paths are resolved against.
    ///
    /// Without `--config`, `handshake.yaml` in the current directory is used
    /// if it exists; otherwise defaults apply.
    pub async fn load_config(&self) -> Result<(HandshakeConfig, PathBuf)> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;

        let path = match &self.config {
            Some(path) => Some(path.clone()),
            None => {
                let candidate = cwd.join(CONFIG_FILE_NAME);
                tokio::fs::try_exists(&candidate)
                    .await
                    .unwrap_or(false)
                    .then_some(candidate)
            }
        };

        match path {
            Some(path) => {
                let config = HandshakeConfig::load(&path)
                    .await
                    .with_context(|| format!("failed to load config from {}", path.display()))?;
                let base = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map_or_else(|| cwd.clone(), Path::to_path_buf);
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok((config, base))
            }
            None => Ok((HandshakeConfig::default(), cwd)),
        }
    }

    /// Build a traversal engine over the configured (or overridden) store.
    pub async fn engine(&self) -> Result<TraversalEngine> {
        let (config, base) = self.load_config().await?;

        let backend = match &self.store {
            Some(spec) => parse_store_spec(spec)?,
            None => config.store.to_backend(&base)?,
        };
        tracing::debug!(backend = ?backend, "opening store");

        let store = open_store(backend.clone(), config.store.max_connections_per_user)
            .await
            .with_context(|| match backend.data_path() {
                Some(path) => format!("failed to open store at {}", path.display()),
                None => "failed to open store".to_string(),
            })?;

        Ok(TraversalEngine::new(store, config.engine)?)
    }
}

/// Parse a `--store` value.
pub fn parse_store_spec(spec: &str) -> Result<StoreBackend> {
    if spec == "memory" {
        return Ok(StoreBackend::InMemory);
    }
    let Some((kind, path)) = spec.split_once(':') else {
        bail!("invalid store '{spec}': expected sqlite:<path>, snapshot:<path> or memory");
    };
    if path.is_empty() {
        bail!("invalid store '{spec}': missing path");
    }
    match kind {
        "sqlite" => Ok(StoreBackend::Sqlite(PathBuf::from(path))),
        "snapshot" => Ok(StoreBackend::Snapshot(PathBuf::from(path))),
        other => bail!("unknown store kind '{other}' (expected sqlite or snapshot)"),
    }
}
