//! The Diagnostic Registry: the latest full diagnostic set, replaced wholesale per publish.

use policyscan_types::{Diagnostic, DiagnosticSet, DocumentUri};
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::broadcast;

const NOTIFY_CAPACITY: usize = 64;

/// Host surface that displays diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn set(&self, entries: &[(DocumentUri, Vec<Diagnostic>)]);
    fn clear(&self);
}

pub struct DiagnosticRegistry {
    current: RwLock<Arc<DiagnosticSet>>,
    tx: broadcast::Sender<Arc<DiagnosticSet>>,
    sink: Option<Arc<dyn DiagnosticSink>>,
}

impl Default for DiagnosticRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DiagnosticRegistry {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            current: RwLock::new(Arc::new(DiagnosticSet::new())),
            tx,
            sink: None,
        }
    }

    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new()
        }
    }

    /// Every publish is delivered, including repeated identical sets.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DiagnosticSet>> {
        self.tx.subscribe()
    }

    /// Replace the whole set and notify.
    pub fn publish(&self, set: DiagnosticSet) -> Arc<DiagnosticSet> {
        let set = Arc::new(set);
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            self.replace(&mut current, &set);
        }
        self.notify(&set);
        set
    }

    /// Replace the whole set only if `still_current()` holds while the write lock is held.
    ///
    /// Returns `None` (and leaves state untouched) when the guard fails.
    pub fn publish_if(
        &self,
        still_current: impl FnOnce() -> bool,
        set: DiagnosticSet,
    ) -> Option<Arc<DiagnosticSet>> {
        let set = Arc::new(set);
        {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            if !still_current() {
                return None;
            }
            self.replace(&mut current, &set);
        }
        self.notify(&set);
        Some(set)
    }

    fn replace(&self, current: &mut Arc<DiagnosticSet>, set: &Arc<DiagnosticSet>) {
        *current = Arc::clone(set);
        if let Some(sink) = &self.sink {
            sink.set(&set.to_entries());
        }
    }

    fn notify(&self, set: &Arc<DiagnosticSet>) {
        tracing::info!(
            documents = set.document_count(),
            diagnostics = set.diagnostic_count(),
            "diagnostics published"
        );
        // No subscribers is fine.
        let _ = self.tx.send(Arc::clone(set));
    }

    /// Snapshot of the current set.
    pub fn current(&self) -> Arc<DiagnosticSet> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Diagnostics for one document, or empty.
    pub fn query(&self, uri: &DocumentUri) -> Vec<Diagnostic> {
        self.current().get(uri).to_vec()
    }

    /// Drop all diagnostics and clear the sink. Subscribers are not notified.
    pub fn teardown(&self) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *current = Arc::new(DiagnosticSet::new());
        if let Some(sink) = &self.sink {
            sink.clear();
        }
    }
}
