//! Aggregate a diagnostic set into a tri-state health summary.

use crate::identity::decode;
use crate::model::FindingKind;
use crate::policy::{FindingKey, PolicyConfig, PolicyDecision};
use policyscan_types::{
    DiagnosticSet, NotificationKind, StatusNotification, StatusResult, StatusSnapshot,
    StatusState,
};
use std::collections::{BTreeMap, BTreeSet};

fn title(kind: Option<FindingKind>) -> &'static str {
    match kind {
        None => "Dependency and CI policy",
        Some(FindingKind::NpmDependency) => "npm dependency security",
        Some(FindingKind::TravisGoVersion) => "Travis CI Go version",
    }
}

fn description(kind: Option<FindingKind>) -> &'static str {
    match kind {
        None => "Monitors and enforces rules about dependencies and CI configuration.",
        Some(kind) => kind.summary(),
    }
}

/// Snapshot shown while a scan epoch is in flight.
pub fn pending(kind: Option<FindingKind>) -> StatusSnapshot {
    StatusSnapshot {
        title: title(kind).to_string(),
        description: description(kind).to_string(),
        state: StatusState::Pending {
            message: "Scanning...".to_string(),
        },
        notifications: Vec::new(),
    }
}

/// Summarize `set`, optionally restricted to one kind.
///
/// Findings are classified with the current `policy`: one allowed since the last epoch counts
/// neither toward the total nor the notifications. Notifications are one per distinct offending
/// finding, sorted by name.
pub fn summarize(
    set: &DiagnosticSet,
    policy: &PolicyConfig,
    kind: Option<FindingKind>,
) -> StatusSnapshot {
    let mut count = 0usize;
    let mut documents = BTreeSet::new();
    let mut offending: BTreeMap<(String, FindingKind), PolicyDecision> = BTreeMap::new();

    for diag in set.diagnostics() {
        let Ok(finding) = decode(&diag.identity) else {
            continue;
        };
        if kind.is_some_and(|k| k != finding.kind()) {
            continue;
        }
        let key = FindingKey::new(finding.kind(), finding.name());
        let decision = policy.decide(&key);
        if decision == PolicyDecision::Allowed {
            continue;
        }
        count += 1;
        documents.insert(&diag.uri);
        offending.insert((key.name, key.kind), decision);
    }

    let state = if count == 0 {
        StatusState::Completed {
            result: StatusResult::Success,
            message: "All findings in use are approved".to_string(),
            count,
        }
    } else {
        StatusState::Completed {
            result: StatusResult::Failure,
            message: format!(
                "{count} unapproved finding{} in {} document{}",
                plural(count),
                documents.len(),
                plural(documents.len())
            ),
            count,
        }
    };

    let notifications = offending
        .into_iter()
        .map(|((name, finding_kind), decision)| {
            let (prefix, nkind) = match decision {
                PolicyDecision::Forbidden => ("Forbidden", NotificationKind::Error),
                _ => ("Unreviewed", NotificationKind::Warning),
            };
            StatusNotification {
                title: format!("{prefix} {} in use: {name}", finding_kind.label()),
                kind: nkind,
                finding_kind: finding_kind.id().to_string(),
                name,
            }
        })
        .collect();

    StatusSnapshot {
        title: title(kind).to_string(),
        description: description(kind).to_string(),
        state,
        notifications,
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
