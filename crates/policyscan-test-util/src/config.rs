use async_trait::async_trait;
use policyscan_app::ConfigBackend;
use policyscan_domain::policy::{FindingKey, PolicyDecision};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

/// `policyscan.toml` held in memory; patches go through the same TOML editor as the file backend.
#[derive(Default)]
pub struct MemoryConfigBackend {
    text: Mutex<String>,
    writes: AtomicUsize,
}

impl MemoryConfigBackend {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
            writes: AtomicUsize::new(0),
        }
    }

    /// Simulate an edit made outside the store.
    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.lock().unwrap_or_else(PoisonError::into_inner) = text.into();
    }

    pub fn text(&self) -> String {
        self.text
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConfigBackend for MemoryConfigBackend {
    async fn read(&self) -> anyhow::Result<String> {
        Ok(self.text())
    }

    async fn merge_patch(&self, key: &FindingKey, decision: PolicyDecision) -> anyhow::Result<()> {
        let mut text = self.text.lock().unwrap_or_else(PoisonError::into_inner);
        *text = policyscan_settings::apply_policy_patch(&text, key, decision)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
