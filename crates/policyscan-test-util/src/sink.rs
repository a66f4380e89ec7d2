use policyscan_app::DiagnosticSink;
use policyscan_types::{Diagnostic, DocumentUri};
use std::sync::{Mutex, PoisonError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SinkEvent {
    Set(Vec<(DocumentUri, Vec<Diagnostic>)>),
    Clear,
}

/// Records every call a registry makes to its host surface.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn push(&self, event: SinkEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

impl DiagnosticSink for RecordingSink {
    fn set(&self, entries: &[(DocumentUri, Vec<Diagnostic>)]) {
        self.push(SinkEvent::Set(entries.to_vec()));
    }

    fn clear(&self) {
        self.push(SinkEvent::Clear);
    }
}
