//! Long-lived host wiring: one pipeline plus the fix, code action and status surfaces over it.

use crate::AppError;
use crate::actions::{CodeAction, CodeActionProvider, Command, CommandOutcome};
use crate::fixes::{BatchFix, FixGenerator};
use crate::pipeline::{Pipeline, PipelineDeps, PipelineHandle, Trigger};
use crate::policy_store::{ConfigBackend, PolicyStore};
use crate::registry::{DiagnosticRegistry, DiagnosticSink};
use crate::status::{StatusReporter, StatusScope};
use anyhow::Context;
use policyscan_domain::model::FindingKind;
use policyscan_repo::{CorpusSearch, DocumentSource};
use policyscan_settings::Overrides;
use policyscan_types::{Diagnostic, DocumentUri, FixEdit, Range, StatusSnapshot, TextDocument};
use std::sync::Arc;
use tokio::sync::watch;

/// External collaborators a service runs against.
pub struct ServicePorts {
    pub search: Arc<dyn CorpusSearch>,
    pub documents: Arc<dyn DocumentSource>,
    pub config: Arc<dyn ConfigBackend>,
    /// Receives every published set; cleared on shutdown.
    pub sink: Option<Arc<dyn DiagnosticSink>>,
}

pub struct PolicyService {
    handle: PipelineHandle,
    fixes: FixGenerator,
    actions: CodeActionProvider,
    status: StatusReporter,
}

impl PolicyService {
    /// Load configuration, start the pipeline loop and queue the startup scan.
    pub async fn start(ports: ServicePorts, overrides: Overrides) -> anyhow::Result<Self> {
        let policy = Arc::new(
            PolicyStore::load(ports.config, overrides)
                .await
                .context("load policy configuration")?,
        );
        let registry = Arc::new(match ports.sink {
            Some(sink) => DiagnosticRegistry::with_sink(sink),
            None => DiagnosticRegistry::new(),
        });
        let pipeline = Arc::new(Pipeline::new(PipelineDeps {
            search: ports.search,
            documents: Arc::clone(&ports.documents),
            policy: Arc::clone(&policy),
            registry: Arc::clone(&registry),
        }));

        let fixes = FixGenerator::new(ports.documents, registry, Arc::clone(&policy));
        let actions = CodeActionProvider::new(fixes.clone(), policy);
        let status = StatusReporter::new(Arc::clone(&pipeline));

        let handle = pipeline.spawn();
        handle.trigger(Trigger::Startup)?;
        tracing::info!("policy service started");

        Ok(Self {
            handle,
            fixes,
            actions,
            status,
        })
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        self.handle.pipeline()
    }

    pub fn trigger(&self, trigger: Trigger) -> Result<(), AppError> {
        self.handle.trigger(trigger)
    }

    /// Current diagnostics for one document.
    pub fn diagnostics(&self, uri: &DocumentUri) -> Vec<Diagnostic> {
        self.pipeline().registry().query(uri)
    }

    pub async fn code_actions(
        &self,
        document: &TextDocument,
        selection: Range,
        diagnostics: &[Diagnostic],
    ) -> Vec<CodeAction> {
        self.actions
            .provide_code_actions(document, selection, diagnostics)
            .await
    }

    pub fn execute_command(&self, command: &Command) -> Result<CommandOutcome, AppError> {
        self.actions.execute_command(command)
    }

    pub async fn compute_local_fix(&self, diagnostic: &Diagnostic) -> Result<FixEdit, AppError> {
        self.fixes.compute_local_fix(diagnostic).await
    }

    pub async fn compute_batch_fix(&self, kind: FindingKind) -> BatchFix {
        self.fixes.compute_batch_fix(kind).await
    }

    /// Re-read configuration the host saw change outside this service.
    ///
    /// Returns whether the resolved policy changed; a change starts a rescan. An invalid
    /// configuration is rejected and the previous snapshot stays in effect.
    pub async fn reload_policy(&self) -> Result<bool, AppError> {
        self.pipeline()
            .policy()
            .reload()
            .await
            .map_err(AppError::config)
    }

    pub fn status(&self, scope: StatusScope) -> StatusSnapshot {
        self.status.status(scope)
    }

    pub fn provide_status(&self, scope: StatusScope) -> watch::Receiver<StatusSnapshot> {
        self.status.provide_status(scope)
    }

    /// Stop the pipeline and clear every diagnostic the service published.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
        tracing::info!("policy service stopped");
    }
}
