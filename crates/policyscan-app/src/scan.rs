//! One-shot use cases over a corpus on disk: `scan`, `fix` and policy edits.

use crate::fixes::FixGenerator;
use crate::pipeline::{EpochOutcome, Pipeline, PipelineDeps, Trigger};
use crate::policy_store::{FileConfigBackend, PolicyStore};
use crate::registry::DiagnosticRegistry;
use crate::report::build_report;
use crate::status::{StatusReporter, StatusScope};
use anyhow::Context;
use camino::Utf8Path;
use policyscan_domain::model::FindingKind;
use policyscan_domain::policy::{FindingKey, PolicyDecision};
use policyscan_repo::{CacheStats, DocumentSource, FsCorpus, MemoizedScanner, ScanError};
use policyscan_settings::{Overrides, ResolvedConfig};
use policyscan_types::{DocumentUri, FixEdit, ScanReport};
use std::num::NonZeroUsize;
use std::sync::Arc;
use time::OffsetDateTime;

/// Input for the scan use case.
#[derive(Clone, Debug)]
pub struct ScanInput<'a> {
    /// Directory whose immediate subdirectories are repositories.
    pub corpus_root: &'a Utf8Path,
    /// Path to `policyscan.toml`; a missing file means defaults.
    pub config_path: &'a Utf8Path,
    pub overrides: Overrides,
}

#[derive(Clone, Debug)]
pub struct ScanOutput {
    pub report: ScanReport,
    pub resolved_config: Arc<ResolvedConfig>,
    pub cache: CacheStats,
}

/// Input for the fix use case.
#[derive(Clone, Debug)]
pub struct FixInput<'a> {
    pub corpus_root: &'a Utf8Path,
    pub config_path: &'a Utf8Path,
    pub overrides: Overrides,
    /// Kinds to fix; empty means every enabled kind.
    pub kinds: Vec<FindingKind>,
    /// Compute the edit without writing any document.
    pub dry_run: bool,
}

#[derive(Clone, Debug, Default)]
pub struct FixOutput {
    pub edit: FixEdit,
    /// Documents rewritten on disk (empty for a dry run).
    pub written: Vec<DocumentUri>,
    pub failures: Vec<(DocumentUri, String)>,
}

/// Everything a one-shot run needs, wired over one corpus directory.
struct Session {
    corpus: Arc<FsCorpus>,
    scanner: Arc<MemoizedScanner<FsCorpus>>,
    pipeline: Arc<Pipeline>,
}

impl Session {
    async fn open(
        corpus_root: &Utf8Path,
        config_path: &Utf8Path,
        overrides: Overrides,
    ) -> anyhow::Result<Self> {
        let backend = Arc::new(FileConfigBackend::new(config_path));
        let policy = Arc::new(PolicyStore::load(backend, overrides).await?);
        let capacity = NonZeroUsize::new(policy.current().cache_capacity)
            .context("cache capacity must be positive")?;

        let corpus = Arc::new(FsCorpus::new(corpus_root));
        let scanner = Arc::new(MemoizedScanner::from_arc(Arc::clone(&corpus), capacity));
        let pipeline = Arc::new(Pipeline::new(PipelineDeps {
            search: scanner.clone(),
            documents: scanner.clone(),
            policy,
            registry: Arc::new(DiagnosticRegistry::new()),
        }));
        Ok(Self {
            corpus,
            scanner,
            pipeline,
        })
    }

    async fn run(&self) -> anyhow::Result<ScanReport> {
        let started_at = OffsetDateTime::now_utc();
        let outcome = self
            .pipeline
            .run_epoch(Trigger::Startup)
            .await
            .context("scan corpus")?;
        let EpochOutcome::Published { summary, set } = outcome else {
            anyhow::bail!("scan was superseded before it published");
        };
        let status = StatusReporter::new(Arc::clone(&self.pipeline)).status(StatusScope::Corpus);
        let ended_at = OffsetDateTime::now_utc();
        Ok(build_report(
            summary,
            (*set).clone(),
            status,
            started_at,
            ended_at,
        ))
    }
}

/// Run the scan use case: load config, scan the corpus once, produce a report.
pub async fn run_scan(input: ScanInput<'_>) -> anyhow::Result<ScanOutput> {
    let session = Session::open(input.corpus_root, input.config_path, input.overrides).await?;
    let report = session.run().await?;
    Ok(ScanOutput {
        report,
        resolved_config: session.pipeline.policy().current(),
        cache: session.scanner.stats(),
    })
}

/// Run the fix use case: scan, then apply every offered remediation for the chosen kinds.
///
/// Per-document failures are collected; the remaining documents are still written.
pub async fn run_fix(input: FixInput<'_>) -> anyhow::Result<FixOutput> {
    let session = Session::open(input.corpus_root, input.config_path, input.overrides).await?;
    session.run().await?;

    let policy = Arc::clone(session.pipeline.policy());
    let kinds: Vec<FindingKind> = if input.kinds.is_empty() {
        policy.current().effective.enabled_kinds().collect()
    } else {
        input.kinds
    };
    let fixes = FixGenerator::new(
        session.scanner.clone(),
        Arc::clone(session.pipeline.registry()),
        policy,
    );

    let mut out = FixOutput::default();
    for kind in kinds {
        let batch = fixes.compute_batch_fix(kind).await;
        tracing::debug!(
            kind = %kind,
            documents = batch.affected_documents,
            edits = batch.edit.len(),
            "batch fix computed"
        );
        out.edit.extend(batch.edit);
        out.failures.extend(batch.failures);
    }

    if input.dry_run {
        return Ok(out);
    }

    let targets: Vec<DocumentUri> = out.edit.documents().into_iter().cloned().collect();
    for uri in targets {
        match write_fixed(&session.corpus, &out.edit, &uri).await {
            Ok(()) => out.written.push(uri),
            Err(e) => {
                tracing::warn!(document = %uri, error = %e, "failed to write fix");
                out.failures.push((uri, e.to_string()));
            }
        }
    }
    Ok(out)
}

async fn write_fixed(
    corpus: &FsCorpus,
    edit: &FixEdit,
    uri: &DocumentUri,
) -> Result<(), ScanError> {
    let document = corpus.open_document(uri).await?;
    let fixed = edit.apply_to(uri, &document.text);
    corpus.write_document(uri, &fixed).await
}

/// Record a decision for one finding in `policyscan.toml`, creating the file if needed.
///
/// The existing file is validated first so a broken config is never patched further.
pub async fn set_policy(
    config_path: &Utf8Path,
    key: &FindingKey,
    decision: PolicyDecision,
) -> anyhow::Result<()> {
    let backend = Arc::new(FileConfigBackend::new(config_path));
    let store = PolicyStore::load(backend, Overrides::default()).await?;
    store.apply_update(key, decision).await?;
    tracing::info!(key = %key, decision = %decision, "policy updated");
    Ok(())
}
