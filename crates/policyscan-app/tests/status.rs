//! Status snapshots and the live status feed.

use policyscan_app::{
    AppError, DiagnosticRegistry, Pipeline, PipelineDeps, PolicyService, PolicyStore, ServicePorts,
    StatusReporter, StatusScope, Trigger,
};
use policyscan_domain::model::FindingKind;
use policyscan_domain::policy::{FindingKey, PolicyDecision};
use policyscan_settings::Overrides;
use policyscan_test_util::{
    MemoryConfigBackend, MemoryCorpus, PACKAGE_JSON, RecordingSink, SinkEvent, TRAVIS_OLD_GO,
};
use policyscan_types::{DocumentUri, NotificationKind, StatusResult};
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(5);

fn corpus() -> MemoryCorpus {
    MemoryCorpus::with_documents([
        ("web#package.json", PACKAGE_JSON),
        ("api#.travis.yml", TRAVIS_OLD_GO),
    ])
}

async fn pipeline(corpus: &MemoryCorpus, config: &str) -> Arc<Pipeline> {
    let backend = Arc::new(MemoryConfigBackend::new(config));
    let policy = Arc::new(
        PolicyStore::load(backend, Overrides::default())
            .await
            .expect("load policy"),
    );
    Arc::new(Pipeline::new(PipelineDeps {
        search: Arc::new(corpus.clone()),
        documents: Arc::new(corpus.clone()),
        policy,
        registry: Arc::new(DiagnosticRegistry::new()),
    }))
}

#[tokio::test]
async fn status_is_pending_while_an_epoch_runs() {
    let corpus = corpus();
    let pipeline = pipeline(&corpus, "").await;
    let reporter = StatusReporter::new(Arc::clone(&pipeline));
    assert_eq!(
        reporter.status(StatusScope::Corpus).state.result(),
        Some(StatusResult::Success)
    );

    let gate = corpus.gate("web#package.json");
    let epoch = {
        let pipeline = Arc::clone(&pipeline);
        tokio::spawn(async move { pipeline.run_epoch(Trigger::Startup).await })
    };
    gate.reached().await;
    let pending = reporter.status(StatusScope::Corpus);
    assert!(pending.state.is_pending());
    assert_eq!(pending.state.message(), "Scanning...");

    gate.release();
    epoch.await.expect("join").expect("epoch");

    let done = reporter.status(StatusScope::Corpus);
    assert_eq!(done.state.result(), Some(StatusResult::Failure));
    assert_eq!(done.state.message(), "3 unapproved findings in 2 documents");
    let names: Vec<&str> = done.notifications.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["go", "left-pad", "react"]);
}

#[tokio::test]
async fn kind_scope_counts_only_that_kind() {
    let corpus = corpus();
    let pipeline = pipeline(&corpus, "[rules.npm_dependency]\nreact = \"forbid\"\n").await;
    pipeline.run_epoch(Trigger::Startup).await.expect("epoch");
    let reporter = StatusReporter::new(Arc::clone(&pipeline));

    let npm = reporter.status(StatusScope::Kind(FindingKind::NpmDependency));
    assert_eq!(npm.state.message(), "2 unapproved findings in 1 document");
    let kinds: Vec<(&str, NotificationKind)> = npm
        .notifications
        .iter()
        .map(|n| (n.name.as_str(), n.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("left-pad", NotificationKind::Warning),
            ("react", NotificationKind::Error)
        ]
    );
}

#[tokio::test]
async fn feed_follows_publishes_and_policy_changes() {
    let corpus = corpus();
    let pipeline = pipeline(&corpus, "").await;
    let reporter = StatusReporter::new(Arc::clone(&pipeline));
    let mut feed = reporter.provide_status(StatusScope::Kind(FindingKind::NpmDependency));

    pipeline.run_epoch(Trigger::Startup).await.expect("epoch");
    let failing = tokio::time::timeout(
        WAIT,
        feed.wait_for(|s| s.state.result() == Some(StatusResult::Failure)),
    )
    .await
    .expect("feed update")
    .expect("feed open")
    .clone();
    assert_eq!(failing.notifications.len(), 2);

    // The breakdown is reclassified against the new policy before any rescan.
    pipeline
        .policy()
        .apply_update(
            &FindingKey::new(FindingKind::NpmDependency, "react"),
            PolicyDecision::Allowed,
        )
        .await
        .expect("update");
    let reclassified = tokio::time::timeout(WAIT, feed.wait_for(|s| s.notifications.len() == 1))
        .await
        .expect("feed update")
        .expect("feed open")
        .clone();
    assert_eq!(reclassified.notifications[0].name, "left-pad");
}

#[tokio::test]
async fn service_runs_startup_scan_and_clears_on_shutdown() {
    let corpus = corpus();
    let sink = Arc::new(RecordingSink::new());
    let service = PolicyService::start(
        ServicePorts {
            search: Arc::new(corpus.clone()),
            documents: Arc::new(corpus.clone()),
            config: Arc::new(MemoryConfigBackend::new("")),
            sink: Some(sink.clone()),
        },
        Overrides::default(),
    )
    .await
    .expect("start");

    let mut feed = service.provide_status(StatusScope::Corpus);
    tokio::time::timeout(
        WAIT,
        feed.wait_for(|s| s.state.result() == Some(StatusResult::Failure)),
    )
    .await
    .expect("startup scan")
    .expect("feed open");

    assert_eq!(
        service
            .diagnostics(&DocumentUri::new("web#package.json"))
            .len(),
        2
    );
    let batch = service
        .compute_batch_fix(FindingKind::TravisGoVersion)
        .await;
    assert_eq!(batch.affected_documents, 1);

    service.shutdown().await;
    assert_eq!(sink.events().last(), Some(&SinkEvent::Clear));
}

#[tokio::test]
async fn service_reload_rejects_invalid_config_and_applies_valid_edits() {
    let corpus = corpus();
    let backend = Arc::new(MemoryConfigBackend::new(""));
    let service = PolicyService::start(
        ServicePorts {
            search: Arc::new(corpus.clone()),
            documents: Arc::new(corpus.clone()),
            config: backend.clone(),
            sink: None,
        },
        Overrides::default(),
    )
    .await
    .expect("start");
    let mut feed = service.provide_status(StatusScope::Kind(FindingKind::NpmDependency));
    tokio::time::timeout(
        WAIT,
        feed.wait_for(|s| s.state.result() == Some(StatusResult::Failure)),
    )
    .await
    .expect("startup scan")
    .expect("feed open");

    backend.set_text("[rules.npm_dependency]\nleft-pad = \"maybe\"\n");
    let err = service.reload_policy().await.unwrap_err();
    assert!(matches!(err, AppError::Config(ref message) if message.contains("resolve configuration")));

    backend.set_text("[rules.npm_dependency]\nleft-pad = \"allow\"\nreact = \"allow\"\n");
    assert!(service.reload_policy().await.expect("reload"));
    assert!(!service.reload_policy().await.expect("reload again"));

    tokio::time::timeout(
        WAIT,
        feed.wait_for(|s| s.state.result() == Some(StatusResult::Success)),
    )
    .await
    .expect("edit outside the service took effect")
    .expect("feed open");

    service.shutdown().await;
}
