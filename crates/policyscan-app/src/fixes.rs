//! Fix Generator: local fixes against freshly opened documents, and corpus-wide batch fixes.

use crate::AppError;
use crate::policy_store::PolicyStore;
use crate::registry::DiagnosticRegistry;
use policyscan_domain::model::{Finding, FindingKind};
use policyscan_domain::{FixError, compute_local_fix, decode};
use policyscan_repo::DocumentSource;
use policyscan_types::{Diagnostic, DocumentUri, FixEdit, TextDocument};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Aggregate edit for one kind across the registry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchFix {
    pub edit: FixEdit,
    /// Distinct documents holding at least one diagnostic of the kind at call time.
    pub affected_documents: usize,
    /// Per-document failures; they do not abort the batch.
    pub failures: Vec<(DocumentUri, String)>,
}

#[derive(Clone)]
pub struct FixGenerator {
    documents: Arc<dyn DocumentSource>,
    registry: Arc<DiagnosticRegistry>,
    policy: Arc<PolicyStore>,
}

impl FixGenerator {
    pub fn new(
        documents: Arc<dyn DocumentSource>,
        registry: Arc<DiagnosticRegistry>,
        policy: Arc<PolicyStore>,
    ) -> Self {
        Self {
            documents,
            registry,
            policy,
        }
    }

    /// Fix `finding` against `document` as given (e.g. the text open in an editor).
    pub fn fix_in_text(&self, finding: &Finding, document: &TextDocument) -> Result<FixEdit, FixError> {
        let cfg = self.policy.current();
        let decision = cfg.policy.decide(&finding.key());
        compute_local_fix(finding, decision, document, &cfg.effective)
    }

    /// Re-open the diagnostic's document and fix it against its current text.
    pub async fn compute_local_fix(&self, diagnostic: &Diagnostic) -> Result<FixEdit, AppError> {
        let finding = decode(&diagnostic.identity)?;
        let document = self.documents.open_document(&diagnostic.uri).await?;
        Ok(self.fix_in_text(&finding, &document)?)
    }

    /// Union of local fixes for every document holding a `kind` diagnostic.
    ///
    /// Documents are re-opened concurrently. Findings whose decision offers no text fix are
    /// skipped; other failures are collected and the rest of the batch proceeds.
    pub async fn compute_batch_fix(&self, kind: FindingKind) -> BatchFix {
        let set = self.registry.current();

        let mut targets: BTreeMap<DocumentUri, Vec<Finding>> = BTreeMap::new();
        for diag in set.diagnostics() {
            let Ok(finding) = decode(&diag.identity) else {
                continue;
            };
            if finding.kind() == kind {
                targets.entry(diag.uri.clone()).or_default().push(finding);
            }
        }
        let affected_documents = targets.len();

        let results = futures::future::join_all(targets.into_iter().map(|(uri, findings)| {
            let this = self.clone();
            async move {
                let document = match this.documents.open_document(&uri).await {
                    Ok(doc) => doc,
                    Err(e) => return (uri, FixEdit::new(), vec![e.to_string()]),
                };
                let mut edit = FixEdit::new();
                let mut errors = Vec::new();
                for finding in &findings {
                    match this.fix_in_text(finding, &document) {
                        Ok(e) => edit.extend(e),
                        Err(FixError::NotOffered { .. }) => {}
                        Err(e) => errors.push(e.to_string()),
                    }
                }
                (uri, edit, errors)
            }
        }))
        .await;

        let mut batch = BatchFix {
            affected_documents,
            ..BatchFix::default()
        };
        for (uri, edit, errors) in results {
            batch.edit.extend(edit);
            for message in errors {
                tracing::warn!(document = %uri, error = %message, "fix failed");
                batch.failures.push((uri.clone(), message));
            }
        }
        batch
    }
}
