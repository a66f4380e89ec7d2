//! Live policy configuration: observe, decide and merge-patch updates.

use anyhow::Context;
use async_trait::async_trait;
use camino::Utf8PathBuf;
use policyscan_domain::policy::{FindingKey, PolicyDecision};
use policyscan_settings::{Overrides, ResolvedConfig};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

/// External configuration storage.
#[async_trait]
pub trait ConfigBackend: Send + Sync {
    /// Full `policyscan.toml` text. A missing file reads as empty.
    async fn read(&self) -> anyhow::Result<String>;

    /// Merge one decision into stored configuration. Must be idempotent.
    async fn merge_patch(&self, key: &FindingKey, decision: PolicyDecision) -> anyhow::Result<()>;
}

/// `policyscan.toml` on local disk.
pub struct FileConfigBackend {
    path: Utf8PathBuf,
    write_lock: Mutex<()>,
}

impl FileConfigBackend {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl ConfigBackend for FileConfigBackend {
    async fn read(&self) -> anyhow::Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e).with_context(|| format!("read {}", self.path)),
        }
    }

    async fn merge_patch(&self, key: &FindingKey, decision: PolicyDecision) -> anyhow::Result<()> {
        let _guard = self.write_lock.lock().await;
        let current = self.read().await?;
        let patched = policyscan_settings::apply_policy_patch(&current, key, decision)
            .with_context(|| format!("patch {}", self.path))?;
        tokio::fs::write(&self.path, patched)
            .await
            .with_context(|| format!("write {}", self.path))
    }
}

/// Holds the latest resolved configuration and re-emits it whenever it changes.
pub struct PolicyStore {
    backend: Arc<dyn ConfigBackend>,
    overrides: Overrides,
    tx: watch::Sender<Arc<ResolvedConfig>>,
}

impl PolicyStore {
    /// Read and resolve configuration from `backend`.
    pub async fn load(backend: Arc<dyn ConfigBackend>, overrides: Overrides) -> anyhow::Result<Self> {
        let text = backend.read().await.context("read configuration")?;
        let resolved = policyscan_settings::load_config_str(&text, overrides.clone())
            .context("resolve configuration")?;
        let (tx, _rx) = watch::channel(Arc::new(resolved));
        Ok(Self {
            backend,
            overrides,
            tx,
        })
    }

    /// Live sequence of configuration snapshots.
    ///
    /// The backend is not watched: edits made outside [`PolicyStore::apply_update`] are only
    /// seen after the host calls [`PolicyStore::reload`].
    pub fn observe(&self) -> watch::Receiver<Arc<ResolvedConfig>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Arc<ResolvedConfig> {
        self.tx.borrow().clone()
    }

    /// Lookup against the latest snapshot; missing keys are `Unreviewed`.
    pub fn decide(&self, key: &FindingKey) -> PolicyDecision {
        self.tx.borrow().policy.decide(key)
    }

    /// Re-read the backend. Observers are notified only when the resolved config changed.
    ///
    /// An invalid configuration is reported and the previous snapshot is kept.
    pub async fn reload(&self) -> anyhow::Result<bool> {
        let text = self.backend.read().await.context("read configuration")?;
        let resolved = policyscan_settings::load_config_str(&text, self.overrides.clone())
            .context("resolve configuration")?;
        let changed = self.tx.send_if_modified(|current| {
            if **current == resolved {
                false
            } else {
                *current = Arc::new(resolved);
                true
            }
        });
        if changed {
            tracing::info!(rules = self.current().policy.len(), "policy configuration changed");
        }
        Ok(changed)
    }

    /// Merge-patch one decision and reload. Completes once the write is visible to this store.
    pub async fn apply_update(&self, key: &FindingKey, decision: PolicyDecision) -> anyhow::Result<()> {
        self.backend
            .merge_patch(key, decision)
            .await
            .with_context(|| format!("update policy for {key}"))?;
        self.reload().await?;
        Ok(())
    }

    /// Fire-and-forget variant of [`PolicyStore::apply_update`].
    ///
    /// Callers must not assume the decision is visible on their next read.
    pub fn update(
        self: &Arc<Self>,
        key: FindingKey,
        decision: PolicyDecision,
    ) -> JoinHandle<anyhow::Result<()>> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let result = store.apply_update(&key, decision).await;
            if let Err(e) = &result {
                tracing::error!(key = %key, error = %format!("{e:#}"), "policy update failed");
            }
            result
        })
    }
}
