//! Status Reporter: live tri-state health summaries over the registry.

use crate::pipeline::Pipeline;
use policyscan_domain::model::FindingKind;
use policyscan_domain::status::{pending, summarize};
use policyscan_types::StatusSnapshot;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusScope {
    /// All kinds across the corpus.
    Corpus,
    Kind(FindingKind),
}

impl StatusScope {
    fn kind(self) -> Option<FindingKind> {
        match self {
            StatusScope::Corpus => None,
            StatusScope::Kind(kind) => Some(kind),
        }
    }
}

#[derive(Clone)]
pub struct StatusReporter {
    pipeline: Arc<Pipeline>,
}

impl StatusReporter {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Pending while any epoch runs; otherwise a summary of the current set.
    pub fn status(&self, scope: StatusScope) -> StatusSnapshot {
        if *self.pipeline.activity().borrow() > 0 {
            return pending(scope.kind());
        }
        let set = self.pipeline.registry().current();
        let policy = self.pipeline.policy().current();
        summarize(&set, &policy.policy, scope.kind())
    }

    /// Live sequence of snapshots for `scope`.
    ///
    /// The feed recomputes on every publish, scan start/finish and policy change, and stops
    /// once every receiver is dropped.
    pub fn provide_status(&self, scope: StatusScope) -> watch::Receiver<StatusSnapshot> {
        let (tx, rx) = watch::channel(self.status(scope));
        let reporter = self.clone();
        let mut published = self.pipeline.registry().subscribe();
        let mut activity = self.pipeline.activity();
        let mut policy = self.pipeline.policy().observe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    r = published.recv() => match r {
                        Ok(_) | Err(RecvError::Lagged(_)) => {}
                        Err(RecvError::Closed) => break,
                    },
                    r = activity.changed() => if r.is_err() { break },
                    r = policy.changed() => if r.is_err() { break },
                }
                tx.send_if_modified(|current| {
                    let next = reporter.status(scope);
                    if *current == next {
                        false
                    } else {
                        *current = next;
                        true
                    }
                });
            }
        });
        rx
    }
}
