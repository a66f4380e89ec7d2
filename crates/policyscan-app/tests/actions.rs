//! Code actions, command execution and fixes against the live registry.

use policyscan_app::{
    AppError, CodeAction, CodeActionProvider, Command, CommandOutcome, DiagnosticRegistry,
    FixGenerator, Pipeline, PipelineDeps, PolicyStore, Trigger,
};
use policyscan_domain::FixError;
use policyscan_domain::model::FindingKind;
use policyscan_domain::policy::{FindingKey, PolicyDecision, PolicyScope};
use policyscan_settings::Overrides;
use policyscan_test_util::{MemoryConfigBackend, MemoryCorpus, PACKAGE_JSON, TRAVIS_OLD_GO};
use policyscan_types::{Diagnostic, DocumentUri, Range, TextDocument};
use std::sync::Arc;

struct Fixture {
    corpus: MemoryCorpus,
    backend: Arc<MemoryConfigBackend>,
    pipeline: Arc<Pipeline>,
    fixes: FixGenerator,
    actions: CodeActionProvider,
}

async fn fixture(config: &str, docs: &[(&str, &str)]) -> Fixture {
    let corpus = MemoryCorpus::with_documents(docs.iter().copied());
    let backend = Arc::new(MemoryConfigBackend::new(config));
    let policy = Arc::new(
        PolicyStore::load(backend.clone(), Overrides::default())
            .await
            .expect("load policy"),
    );
    let registry = Arc::new(DiagnosticRegistry::new());
    let pipeline = Arc::new(Pipeline::new(PipelineDeps {
        search: Arc::new(corpus.clone()),
        documents: Arc::new(corpus.clone()),
        policy: Arc::clone(&policy),
        registry: Arc::clone(&registry),
    }));
    pipeline.run_epoch(Trigger::Startup).await.expect("epoch");

    let fixes = FixGenerator::new(Arc::new(corpus.clone()), registry, Arc::clone(&policy));
    let actions = CodeActionProvider::new(fixes.clone(), policy);
    Fixture {
        corpus,
        backend,
        pipeline,
        fixes,
        actions,
    }
}

impl Fixture {
    fn document(&self, uri: &str) -> (TextDocument, Vec<Diagnostic>) {
        let uri = DocumentUri::new(uri);
        let text = self.corpus.text(uri.as_str()).expect("document exists");
        let diagnostics = self.pipeline.registry().query(&uri);
        (TextDocument::new(uri, text), diagnostics)
    }

    async fn actions_at(&self, uri: &str, line: u32) -> Vec<CodeAction> {
        let (doc, diagnostics) = self.document(uri);
        self.actions
            .provide_code_actions(&doc, Range::new(line, 5, line, 5), &diagnostics)
            .await
    }
}

fn titles(actions: &[CodeAction]) -> Vec<&str> {
    actions.iter().map(|a| a.title.as_str()).collect()
}

#[tokio::test]
async fn unreviewed_dependency_offers_policy_choices_only() {
    let fx = fixture("", &[("web#package.json", PACKAGE_JSON)]).await;

    let actions = fx.actions_at("web#package.json", 3).await;

    assert_eq!(
        titles(&actions),
        vec![
            "Allow npm dependency in this repository",
            "Allow npm dependency globally",
            "Forbid npm dependency in this repository",
            "Forbid npm dependency globally",
            "View npm package",
        ]
    );
    assert_eq!(
        actions[4].command,
        Some(Command::OpenUrl {
            url: "https://www.npmjs.com/package/left-pad".to_string()
        })
    );
    assert_eq!(
        actions[0].command,
        Some(Command::UpdatePolicy {
            key: FindingKey::new(FindingKind::NpmDependency, "left-pad"),
            decision: PolicyDecision::Allowed,
            scope: PolicyScope::Repository,
        })
    );
}

#[tokio::test]
async fn forbidden_dependency_offers_removal_first() {
    let fx = fixture(
        "[rules.npm_dependency]\nleft-pad = \"forbid\"\n",
        &[("web#package.json", PACKAGE_JSON)],
    )
    .await;

    let actions = fx.actions_at("web#package.json", 3).await;

    assert_eq!(
        titles(&actions),
        vec![
            "Remove dependency from package.json (further edits required)",
            "Allow npm dependency in this repository",
            "Allow npm dependency globally",
            "View npm package",
        ]
    );
    let edit = actions[0].edit.as_ref().expect("edit");
    let uri = DocumentUri::new("web#package.json");
    let fixed = edit.apply_to(&uri, PACKAGE_JSON);
    assert!(!fixed.contains("left-pad"));
    assert!(fixed.contains("react"));
}

#[tokio::test]
async fn selection_outside_any_diagnostic_yields_nothing() {
    let fx = fixture("", &[("web#package.json", PACKAGE_JSON)]).await;
    assert!(fx.actions_at("web#package.json", 1).await.is_empty());
}

#[tokio::test]
async fn foreign_diagnostics_are_ignored() {
    let fx = fixture("", &[("web#package.json", PACKAGE_JSON)]).await;
    let (doc, mut diagnostics) = fx.document("web#package.json");
    for d in &mut diagnostics {
        d.identity = policyscan_types::DiagnosticCode::new("ESLINT:{}");
    }
    let actions = fx
        .actions
        .provide_code_actions(&doc, Range::new(3, 5, 3, 5), &diagnostics)
        .await;
    assert!(actions.is_empty());
}

#[tokio::test]
async fn directive_offers_local_and_corpus_wide_fix() {
    let fx = fixture(
        "",
        &[
            ("api#.travis.yml", TRAVIS_OLD_GO),
            ("cli#.travis.yml", TRAVIS_OLD_GO),
        ],
    )
    .await;

    let actions = fx.actions_at("api#.travis.yml", 0).await;

    assert_eq!(
        titles(&actions),
        vec![
            "Use current Go version (1.13.x)",
            "Fix in all 2 repositories",
            "Allow Travis CI Go version directive in this repository",
            "Allow Travis CI Go version directive globally",
            "Forbid Travis CI Go version directive in this repository",
            "Forbid Travis CI Go version directive globally",
            "View docs",
        ]
    );
    let batch = actions[1].edit.as_ref().expect("batch edit");
    assert_eq!(batch.documents().len(), 2);
    assert_eq!(
        actions[6].command,
        Some(Command::OpenUrl {
            url: "https://docs.travis-ci.com/user/languages/go/".to_string()
        })
    );
}

#[tokio::test]
async fn global_policy_update_is_rejected() {
    let fx = fixture("", &[("web#package.json", PACKAGE_JSON)]).await;
    let err = fx
        .actions
        .execute_command(&Command::UpdatePolicy {
            key: FindingKey::new(FindingKind::NpmDependency, "left-pad"),
            decision: PolicyDecision::Allowed,
            scope: PolicyScope::Global,
        })
        .unwrap_err();
    assert!(matches!(err, AppError::NotImplemented(_)));
    assert_eq!(fx.backend.write_count(), 0);
}

#[tokio::test]
async fn repository_policy_update_is_visible_once_awaited() {
    let fx = fixture("", &[("web#package.json", PACKAGE_JSON)]).await;
    let key = FindingKey::new(FindingKind::NpmDependency, "left-pad");

    let outcome = fx
        .actions
        .execute_command(&Command::UpdatePolicy {
            key: key.clone(),
            decision: PolicyDecision::Allowed,
            scope: PolicyScope::Repository,
        })
        .expect("command");
    let CommandOutcome::PolicyUpdateQueued(handle) = outcome else {
        panic!("expected a queued update");
    };
    handle.await.expect("join").expect("update");

    assert_eq!(fx.pipeline.policy().decide(&key), PolicyDecision::Allowed);
    assert!(fx.backend.text().contains("left-pad = \"allow\""));
    assert_eq!(fx.backend.write_count(), 1);

    // Allowed findings offer nothing once the registry is refreshed.
    fx.pipeline
        .run_epoch(Trigger::ConfigChanged)
        .await
        .expect("epoch");
    assert!(fx.actions_at("web#package.json", 3).await.is_empty());
}

#[tokio::test]
async fn open_url_command_is_handed_back() {
    let fx = fixture("", &[]).await;
    let outcome = fx
        .actions
        .execute_command(&Command::OpenUrl {
            url: "https://example.test".to_string(),
        })
        .expect("command");
    assert!(matches!(outcome, CommandOutcome::OpenUrl(url) if url == "https://example.test"));
}

#[tokio::test]
async fn local_fix_rereads_the_document() {
    let fx = fixture(
        "[rules.npm_dependency]\nleft-pad = \"forbid\"\n",
        &[("web#package.json", PACKAGE_JSON)],
    )
    .await;
    let (_, diagnostics) = fx.document("web#package.json");
    let diagnostic = diagnostics
        .iter()
        .find(|d| d.message.contains("left-pad"))
        .expect("diagnostic")
        .clone();

    fx.corpus
        .set_text("web#package.json", format!("\n{PACKAGE_JSON}"));
    let edit = fx.fixes.compute_local_fix(&diagnostic).await.expect("fix");
    assert_eq!(edit.edits()[0].range, Range::new(4, 0, 5, 0));

    fx.corpus.set_text("web#package.json", "{\"dependencies\": {}}\n");
    let err = fx.fixes.compute_local_fix(&diagnostic).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::Fix(FixError::TargetMissing { .. })
    ));
}

#[tokio::test]
async fn batch_fix_collects_failures_and_keeps_the_rest() {
    let fx = fixture(
        "",
        &[
            ("api#.travis.yml", TRAVIS_OLD_GO),
            ("cli#.travis.yml", TRAVIS_OLD_GO),
            ("web#package.json", PACKAGE_JSON),
        ],
    )
    .await;
    fx.corpus.remove("cli#.travis.yml");

    let batch = fx.fixes.compute_batch_fix(FindingKind::TravisGoVersion).await;

    assert_eq!(batch.affected_documents, 2);
    assert_eq!(batch.failures.len(), 1);
    assert_eq!(batch.failures[0].0, DocumentUri::new("cli#.travis.yml"));
    let docs: Vec<&str> = batch.edit.documents().into_iter().map(|u| u.as_str()).collect();
    assert_eq!(docs, vec!["api#.travis.yml"]);

    // Unreviewed dependencies offer no text fix, so the npm batch is empty without failures.
    let npm = fx.fixes.compute_batch_fix(FindingKind::NpmDependency).await;
    assert_eq!(npm.affected_documents, 1);
    assert!(npm.edit.is_empty());
    assert!(npm.failures.is_empty());
}

#[tokio::test]
async fn forbidden_dependencies_sharing_a_line_remove_it_once() {
    let manifest = "{\n  \"name\": \"web\",\n  \"dependencies\": {\"a\": \"1\", \"b\": \"2\"},\n  \"private\": true\n}\n";
    let fx = fixture(
        "[rules.npm_dependency]\na = \"forbid\"\nb = \"forbid\"\n",
        &[("web#package.json", manifest)],
    )
    .await;
    assert_eq!(fx.pipeline.registry().current().diagnostic_count(), 2);

    let batch = fx.fixes.compute_batch_fix(FindingKind::NpmDependency).await;

    assert!(batch.failures.is_empty());
    assert_eq!(batch.edit.len(), 1);
    assert_eq!(batch.edit.edits()[0].range, Range::new(2, 0, 3, 0));
    let uri = DocumentUri::new("web#package.json");
    let fixed = batch.edit.apply_to(&uri, manifest);
    assert_eq!(fixed, "{\n  \"name\": \"web\",\n  \"private\": true\n}\n");
    let parsed: serde_json::Value = serde_json::from_str(&fixed).expect("still valid json");
    assert_eq!(parsed["private"], true);
}
