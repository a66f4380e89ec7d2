//! Code actions offered for diagnostics, and the commands they carry.

use crate::AppError;
use crate::fixes::FixGenerator;
use crate::policy_store::PolicyStore;
use crate::report::finding_url;
use policyscan_domain::model::{Finding, FindingKind};
use policyscan_domain::policy::{FindingKey, PolicyDecision, PolicyScope};
use policyscan_domain::{decode, offered_remediation};
use policyscan_types::{Diagnostic, FixEdit, Range, TextDocument};
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    UpdatePolicy {
        key: FindingKey,
        decision: PolicyDecision,
        scope: PolicyScope,
    },
    OpenUrl {
        url: String,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeAction {
    pub title: String,
    pub edit: Option<FixEdit>,
    pub command: Option<Command>,
}

impl CodeAction {
    fn edit(title: impl Into<String>, edit: FixEdit) -> Self {
        Self {
            title: title.into(),
            edit: Some(edit),
            command: None,
        }
    }

    fn command(title: impl Into<String>, command: Command) -> Self {
        Self {
            title: title.into(),
            edit: None,
            command: Some(command),
        }
    }
}

/// What executing a command did.
#[derive(Debug)]
pub enum CommandOutcome {
    /// The merge-patch was issued; the handle resolves once it is written and reloaded.
    PolicyUpdateQueued(JoinHandle<anyhow::Result<()>>),
    /// The host should open this URL.
    OpenUrl(String),
}

#[derive(Clone)]
pub struct CodeActionProvider {
    fixes: FixGenerator,
    policy: Arc<PolicyStore>,
}

impl CodeActionProvider {
    pub fn new(fixes: FixGenerator, policy: Arc<PolicyStore>) -> Self {
        Self { fixes, policy }
    }

    /// Actions for the first decodable diagnostic intersecting `selection`.
    ///
    /// Diagnostics from other producers are ignored. An allowed finding yields no actions.
    pub async fn provide_code_actions(
        &self,
        document: &TextDocument,
        selection: Range,
        diagnostics: &[Diagnostic],
    ) -> Vec<CodeAction> {
        let Some(finding) = diagnostics
            .iter()
            .filter(|d| d.uri == document.uri && d.range.intersects(&selection))
            .find_map(|d| decode(&d.identity).ok())
        else {
            return Vec::new();
        };

        let kind = finding.kind();
        let key = finding.key();
        let decision = self.policy.decide(&key);
        if decision == PolicyDecision::Allowed {
            return Vec::new();
        }

        let mut actions = Vec::new();

        if let Some(remediation) = offered_remediation(kind, decision) {
            match self.fixes.fix_in_text(&finding, document) {
                Ok(edit) if !edit.is_empty() => {
                    let cfg = self.policy.current();
                    actions.push(CodeAction::edit(remediation.title(&cfg.effective), edit));
                }
                Ok(_) => {}
                Err(e) => tracing::debug!(document = %document.uri, error = %e, "no local fix"),
            }
        }

        if kind == FindingKind::TravisGoVersion {
            let batch = self.fixes.compute_batch_fix(kind).await;
            if batch.affected_documents > 1 && !batch.edit.is_empty() {
                actions.push(CodeAction::edit(
                    format!("Fix in all {} repositories", batch.affected_documents),
                    batch.edit,
                ));
            }
        }

        let label = kind.label();
        let mut policy_action = |verb: &str, decision: PolicyDecision, scope: PolicyScope| {
            let place = match scope {
                PolicyScope::Repository => "in this repository",
                PolicyScope::Global => "globally",
            };
            actions.push(CodeAction::command(
                format!("{verb} {label} {place}"),
                Command::UpdatePolicy {
                    key: key.clone(),
                    decision,
                    scope,
                },
            ));
        };
        policy_action("Allow", PolicyDecision::Allowed, PolicyScope::Repository);
        policy_action("Allow", PolicyDecision::Allowed, PolicyScope::Global);
        if decision == PolicyDecision::Unreviewed {
            policy_action("Forbid", PolicyDecision::Forbidden, PolicyScope::Repository);
            policy_action("Forbid", PolicyDecision::Forbidden, PolicyScope::Global);
        }

        actions.push(view_action(&finding));
        actions
    }

    /// Execute a command carried by a code action.
    ///
    /// Global policy scope is not supported and is rejected rather than narrowed.
    pub fn execute_command(&self, command: &Command) -> Result<CommandOutcome, AppError> {
        match command {
            Command::UpdatePolicy {
                scope: PolicyScope::Global,
                key,
                ..
            } => Err(AppError::NotImplemented(format!(
                "global policy updates ({key})"
            ))),
            Command::UpdatePolicy {
                key,
                decision,
                scope: PolicyScope::Repository,
            } => Ok(CommandOutcome::PolicyUpdateQueued(
                self.policy.update(key.clone(), *decision),
            )),
            Command::OpenUrl { url } => Ok(CommandOutcome::OpenUrl(url.clone())),
        }
    }
}

fn view_action(finding: &Finding) -> CodeAction {
    let title = match finding {
        Finding::Dependency(_) => "View npm package",
        Finding::VersionDirective(_) => "View docs",
    };
    let url = finding_url(finding).unwrap_or_default();
    CodeAction::command(title, Command::OpenUrl { url })
}
