//! Property-based tests for the domain crate.
//!
//! These tests use proptest to verify invariants around:
//! - Identity encode/decode being an exact pair
//! - Allowed findings never producing diagnostics
//! - Local fixes removing exactly the targeted declaration

use crate::engine::synthesize_document;
use crate::fix::compute_local_fix;
use crate::identity::{DiagnosticIdentity, decode, encode};
use crate::model::{DependencyFinding, Finding, FindingKind, VersionDirectiveFinding};
use crate::policy::{EffectiveConfig, FindingKey, PolicyConfig, PolicyDecision};
use policyscan_types::{DocumentUri, Range, Severity, TextDocument};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ============================================================================
// Strategies
// ============================================================================

/// npm package names, optionally scoped.
fn arb_dep_name() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z][a-z0-9._-]{0,20}").unwrap(),
        prop::string::string_regex("@[a-z][a-z0-9-]{0,8}/[a-z][a-z0-9-]{0,12}").unwrap(),
    ]
    .prop_filter("must not shadow the section key", |n| n != "dependencies")
}

fn arb_range() -> impl Strategy<Value = Range> {
    (0u32..10_000, 0u32..500, 0u32..50)
        .prop_map(|(line, col, len)| Range::new(line, col, line, col + len))
}

fn arb_finding() -> impl Strategy<Value = Finding> {
    prop_oneof![
        (any::<String>(), arb_range())
            .prop_map(|(name, range)| Finding::Dependency(DependencyFinding { name, range })),
        (any::<String>(), arb_range()).prop_map(|(name, range)| {
            Finding::VersionDirective(VersionDirectiveFinding { name, range })
        }),
    ]
}

fn arb_names() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(arb_dep_name(), 1..12)
}

/// One dependency per line.
fn manifest(names: &BTreeSet<String>) -> String {
    let body: Vec<String> = names
        .iter()
        .map(|n| format!("    \"{n}\": \"1.0.0\""))
        .collect();
    format!("{{\n  \"dependencies\": {{\n{}\n  }}\n}}\n", body.join(",\n"))
}

fn uri() -> DocumentUri {
    DocumentUri::new("acme/web#package.json")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn identity_round_trips(finding in arb_finding()) {
        let code = encode(&finding).expect("encode");
        prop_assert_eq!(decode(&code).expect("decode"), finding.clone());
        prop_assert!(DiagnosticIdentity::new(finding).is_ok());
    }

    #[test]
    fn allowed_findings_never_produce_diagnostics(names in arb_names()) {
        let text = manifest(&names);
        let policy: PolicyConfig = names
            .iter()
            .map(|n| (FindingKey::new(FindingKind::NpmDependency, n.as_str()), PolicyDecision::Allowed))
            .collect();

        let out = synthesize_document(FindingKind::NpmDependency, &uri(), &text, &policy);

        prop_assert!(out.parse_error.is_none());
        prop_assert_eq!(out.findings_total, names.len());
        prop_assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn unreviewed_findings_are_warnings_in_range_order(names in arb_names()) {
        let text = manifest(&names);
        let out = synthesize_document(FindingKind::NpmDependency, &uri(), &text, &PolicyConfig::new());

        prop_assert_eq!(out.diagnostics.len(), names.len());
        prop_assert!(out.diagnostics.iter().all(|d| d.severity == Severity::Warning));
        let starts: Vec<_> = out.diagnostics.iter().map(|d| d.range.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        prop_assert_eq!(starts, sorted);
        for diag in &out.diagnostics {
            let finding = decode(&diag.identity).expect("decode");
            prop_assert!(names.contains(finding.name()));
        }
    }

    #[test]
    fn removal_deletes_only_the_target(names in arb_names(), pick in any::<prop::sample::Index>()) {
        let text = manifest(&names);
        let target = pick.get(&names.iter().collect::<Vec<_>>()).to_string();
        let doc = TextDocument::new(uri(), text.clone());
        let finding = Finding::Dependency(DependencyFinding { name: target.clone(), range: Range::default() });

        let edit = compute_local_fix(&finding, PolicyDecision::Forbidden, &doc, &EffectiveConfig::default())
            .expect("fix");
        let fixed = edit.apply_to(&doc.uri, &doc.text);

        let quoted_target = format!("\"{target}\"");
        prop_assert!(!fixed.contains(&quoted_target));
        for other in names.iter().filter(|n| **n != target) {
            let quoted = format!("\"{other}\"");
            prop_assert!(fixed.contains(&quoted));
        }
        prop_assert_eq!(fixed.lines().count() + 1, text.lines().count());
    }
}
