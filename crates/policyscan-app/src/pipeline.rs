//! Scan pipeline controller.
//!
//! Every trigger starts a new epoch: scan, open, synthesize, publish. Older epochs are never
//! interrupted; their results are discarded at publish time when a newer epoch exists.

use crate::policy_store::PolicyStore;
use crate::registry::DiagnosticRegistry;
use futures::{StreamExt, TryStreamExt};
use policyscan_domain::checks;
use policyscan_domain::model::FindingKind;
use policyscan_domain::synthesize_document;
use policyscan_repo::{CorpusSearch, DocumentSource, ScanError};
use policyscan_settings::ResolvedConfig;
use policyscan_types::{DiagnosticSet, DocumentUri, Match, ScanSummary, Severity};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Documents opened and parsed concurrently per epoch.
const DOCUMENT_CONCURRENCY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    Startup,
    /// Workspace roots currently open in the host.
    RootsChanged { roots: Vec<String> },
    ConfigChanged,
}

#[derive(Clone, Debug)]
pub enum EpochOutcome {
    Published {
        summary: ScanSummary,
        set: Arc<DiagnosticSet>,
    },
    /// A newer epoch started, or the pipeline closed, before this one finished; its batch was
    /// dropped.
    Superseded { epoch: u64, latest: u64 },
}

impl EpochOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, EpochOutcome::Published { .. })
    }
}

/// An epoch number reserved for one trigger, in trigger arrival order.
///
/// The open-roots state is captured at reservation, so a later trigger always sees the roots
/// reported by earlier ones.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EpochTicket {
    epoch: u64,
    comparing: bool,
    trigger: Trigger,
}

impl EpochTicket {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }
}

/// The ports and shared state a pipeline runs against.
#[derive(Clone)]
pub struct PipelineDeps {
    pub search: Arc<dyn CorpusSearch>,
    pub documents: Arc<dyn DocumentSource>,
    pub policy: Arc<PolicyStore>,
    pub registry: Arc<DiagnosticRegistry>,
}

pub struct Pipeline {
    deps: PipelineDeps,
    epoch: AtomicU64,
    closed: AtomicBool,
    in_flight: watch::Sender<usize>,
    open_roots: Mutex<Vec<String>>,
}

/// Decrements the in-flight count on drop, including on error paths.
struct InFlight<'a>(&'a watch::Sender<usize>);

impl<'a> InFlight<'a> {
    fn enter(tx: &'a watch::Sender<usize>) -> Self {
        tx.send_modify(|n| *n += 1);
        Self(tx)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl Pipeline {
    pub fn new(deps: PipelineDeps) -> Self {
        let (in_flight, _rx) = watch::channel(0);
        Self {
            deps,
            epoch: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            in_flight,
            open_roots: Mutex::new(Vec::new()),
        }
    }

    pub fn deps(&self) -> &PipelineDeps {
        &self.deps
    }

    pub fn registry(&self) -> &Arc<DiagnosticRegistry> {
        &self.deps.registry
    }

    pub fn policy(&self) -> &Arc<PolicyStore> {
        &self.deps.policy
    }

    /// Latest epoch number handed out.
    pub fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Number of epochs still running. Non-zero means status is pending.
    pub fn activity(&self) -> watch::Receiver<usize> {
        self.in_flight.subscribe()
    }

    /// Whether [`Pipeline::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop accepting results. Every epoch still running completes as `Superseded`.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Reserve the next epoch number for `trigger` and record the roots it reports.
    pub fn begin_epoch(&self, trigger: Trigger) -> EpochTicket {
        let mut roots = self.open_roots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Trigger::RootsChanged { roots: reported } = &trigger {
            *roots = reported.clone();
        }
        // Numbered under the roots lock: epoch order and roots order agree.
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        EpochTicket {
            epoch,
            comparing: !roots.is_empty(),
            trigger,
        }
    }

    /// Run one full epoch for `trigger`.
    ///
    /// A scan or fetch failure fails the epoch; the registry keeps the previous set.
    pub async fn run_epoch(&self, trigger: Trigger) -> Result<EpochOutcome, ScanError> {
        let ticket = self.begin_epoch(trigger);
        self.run_ticket(ticket).await
    }

    /// Run the epoch reserved by `ticket`. It publishes only if no later ticket was issued and
    /// the pipeline is still open.
    pub async fn run_ticket(&self, ticket: EpochTicket) -> Result<EpochOutcome, ScanError> {
        let EpochTicket {
            epoch,
            comparing,
            trigger,
        } = ticket;
        let _in_flight = InFlight::enter(&self.in_flight);
        tracing::debug!(epoch, ?trigger, "epoch started");

        let cfg = self.deps.policy.current();
        let (set, mut summary) = if comparing {
            tracing::debug!(epoch, "workspace roots open; publishing empty set");
            (DiagnosticSet::new(), ScanSummary::default())
        } else {
            match self.collect(&cfg).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(epoch, error = %e, "scan epoch failed");
                    return Err(e);
                }
            }
        };
        summary.epoch = epoch;

        let published = self
            .deps
            .registry
            .publish_if(|| !self.is_closed() && self.current_epoch() == epoch, set);
        match published {
            Some(set) => Ok(EpochOutcome::Published { summary, set }),
            None => {
                let latest = self.current_epoch();
                tracing::debug!(epoch, latest, "epoch superseded; result discarded");
                Ok(EpochOutcome::Superseded { epoch, latest })
            }
        }
    }

    async fn collect(
        &self,
        cfg: &Arc<ResolvedConfig>,
    ) -> Result<(DiagnosticSet, ScanSummary), ScanError> {
        let mut targets: Vec<(FindingKind, DocumentUri)> = Vec::new();
        for kind in cfg.effective.enabled_kinds() {
            let query = checks::scan_query(kind, &cfg.effective);
            let matches: Vec<Match> = self.deps.search.search(&query).try_collect().await?;
            let uris: BTreeSet<DocumentUri> = matches.into_iter().map(|m| m.uri).collect();
            tracing::debug!(kind = %kind, documents = uris.len(), "scan matched");
            targets.extend(uris.into_iter().map(|uri| (kind, uri)));
        }

        let documents = Arc::clone(&self.deps.documents);
        let outcomes: Vec<_> = futures::stream::iter(targets)
            .map(|(kind, uri)| {
                let documents = Arc::clone(&documents);
                let cfg = Arc::clone(cfg);
                async move {
                    let doc = match documents.open_document(&uri).await {
                        Ok(doc) => doc,
                        Err(ScanError::NotFound(uri)) => {
                            tracing::warn!(document = %uri, "matched document vanished; skipping");
                            return Ok(None);
                        }
                        Err(e) => return Err(e),
                    };
                    let outcome = synthesize_document(kind, &doc.uri, &doc.text, &cfg.policy);
                    Ok(Some(outcome))
                }
            })
            .buffer_unordered(DOCUMENT_CONCURRENCY)
            .try_collect()
            .await?;

        let mut summary = ScanSummary::default();
        let mut entries = Vec::new();
        for outcome in outcomes.into_iter().flatten() {
            summary.documents_scanned += 1;
            if let Some(err) = &outcome.parse_error {
                summary.parse_failures += 1;
                tracing::warn!(document = %outcome.uri, error = %err, "failed to parse document");
            }
            entries.push((outcome.uri, outcome.diagnostics));
        }

        let set = DiagnosticSet::from_entries(entries);
        summary.documents_with_diagnostics = set.document_count() as u32;
        for diag in set.diagnostics() {
            summary.diagnostics_total += 1;
            match diag.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
        }
        Ok((set, summary))
    }

    /// Start the background loop.
    ///
    /// Each trigger, and each policy change, starts a new epoch without waiting for older ones.
    pub fn spawn(self: &Arc<Self>) -> PipelineHandle {
        let (trigger_tx, mut trigger_rx) = mpsc::unbounded_channel::<Trigger>();
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let mut policy_rx = self.deps.policy.observe();
        let pipeline = Arc::clone(self);

        let join = tokio::spawn(async move {
            loop {
                let trigger = tokio::select! {
                    _ = stop_rx.changed() => break,
                    t = trigger_rx.recv() => match t {
                        Some(t) => t,
                        None => break,
                    },
                    changed = policy_rx.changed() => match changed {
                        Ok(()) => Trigger::ConfigChanged,
                        Err(_) => break,
                    },
                };
                let ticket = pipeline.begin_epoch(trigger);
                let pipeline = Arc::clone(&pipeline);
                tokio::spawn(async move {
                    // Failures are logged inside run_ticket.
                    let _ = pipeline.run_ticket(ticket).await;
                });
            }
            tracing::debug!("pipeline loop stopped");
        });

        PipelineHandle {
            pipeline: Arc::clone(self),
            triggers: trigger_tx,
            stop: stop_tx,
            join,
        }
    }
}

/// Control handle for a spawned pipeline loop.
pub struct PipelineHandle {
    pipeline: Arc<Pipeline>,
    triggers: mpsc::UnboundedSender<Trigger>,
    stop: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl PipelineHandle {
    pub fn trigger(&self, trigger: Trigger) -> Result<(), crate::AppError> {
        self.triggers
            .send(trigger)
            .map_err(|_| crate::AppError::Stopped)
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    /// Stop the loop, close the pipeline, then clear the registry and its sink.
    ///
    /// Epochs still in flight finish as `Superseded` and never repopulate the registry.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.join.await {
            tracing::warn!(error = %e, "pipeline loop ended abnormally");
        }
        self.pipeline.close();
        self.pipeline.deps.registry.teardown();
    }
}
