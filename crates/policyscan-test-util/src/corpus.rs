use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use policyscan_repo::{CompiledFilter, CorpusSearch, DocumentSource, MatchStream, ScanError};
use policyscan_types::{DocumentUri, Match, PatternKind, ScanQuery, TextDocument};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Notify, watch};

#[derive(Default)]
struct State {
    documents: BTreeMap<DocumentUri, String>,
    gates: HashMap<DocumentUri, (watch::Receiver<bool>, Arc<Notify>)>,
    failing: Option<String>,
}

/// Corpus held in memory. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryCorpus {
    state: Arc<Mutex<State>>,
    searches: Arc<AtomicUsize>,
    opens: Arc<AtomicUsize>,
}

/// Holds one pending `open_document` call for a URI until released.
///
/// The gate is consumed by the first open of its URI; later opens pass straight through.
pub struct Gate {
    open: watch::Sender<bool>,
    reached: Arc<Notify>,
}

impl Gate {
    /// Resolves once an open of the gated URI is waiting.
    pub async fn reached(&self) {
        self.reached.notified().await;
    }

    pub fn release(&self) {
        self.open.send_replace(true);
    }
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents<I, U, T>(docs: I) -> Self
    where
        I: IntoIterator<Item = (U, T)>,
        U: AsRef<str>,
        T: Into<String>,
    {
        let corpus = Self::new();
        for (uri, text) in docs {
            corpus.set_text(uri, text);
        }
        corpus
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_text(&self, uri: impl AsRef<str>, text: impl Into<String>) {
        self.state()
            .documents
            .insert(DocumentUri::new(uri), text.into());
    }

    pub fn remove(&self, uri: impl AsRef<str>) {
        self.state().documents.remove(&DocumentUri::new(uri));
    }

    pub fn text(&self, uri: impl AsRef<str>) -> Option<String> {
        self.state().documents.get(&DocumentUri::new(uri)).cloned()
    }

    pub fn gate(&self, uri: impl AsRef<str>) -> Gate {
        let (open, rx) = watch::channel(false);
        let reached = Arc::new(Notify::new());
        self.state()
            .gates
            .insert(DocumentUri::new(uri), (rx, Arc::clone(&reached)));
        Gate { open, reached }
    }

    /// Make every search fail with a backend error until cleared with `None`.
    pub fn fail_searches(&self, message: Option<&str>) {
        self.state().failing = message.map(str::to_string);
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn search_now(&self, query: &ScanQuery) -> Result<Vec<Match>, ScanError> {
        let state = self.state();
        if let Some(message) = &state.failing {
            return Err(ScanError::Backend(message.clone()));
        }
        let repos = CompiledFilter::compile(&query.repositories)?;
        let files = CompiledFilter::compile(&query.files)?;
        let source = match query.pattern.kind {
            PatternKind::Regexp => query.pattern.pattern.clone(),
            PatternKind::Literal => regex::escape(&query.pattern.pattern),
        };
        let content = Regex::new(&source).map_err(|e| ScanError::InvalidPattern {
            what: "content",
            pattern: query.pattern.pattern.clone(),
            message: e.to_string(),
        })?;

        Ok(state
            .documents
            .iter()
            .filter(|(uri, _)| repos.is_match(uri.repository()) && files.is_match(uri.path()))
            .filter_map(|(uri, text)| {
                let line = text.lines().find(|l| content.is_match(l))?;
                Some(Match {
                    uri: uri.clone(),
                    preview: line.trim().to_string(),
                })
            })
            .take(query.max_results)
            .collect())
    }
}

impl CorpusSearch for MemoryCorpus {
    fn search(&self, query: &ScanQuery) -> MatchStream {
        self.searches.fetch_add(1, Ordering::SeqCst);
        match self.search_now(query) {
            Ok(matches) => stream::iter(matches.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }
}

#[async_trait]
impl DocumentSource for MemoryCorpus {
    async fn open_document(&self, uri: &DocumentUri) -> Result<TextDocument, ScanError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let gate = self.state().gates.remove(uri);
        if let Some((mut rx, reached)) = gate {
            reached.notify_one();
            // A dropped gate counts as released.
            let _ = rx.wait_for(|open| *open).await;
        }
        let text = self.state().documents.get(uri).cloned();
        text.map(|text| TextDocument::new(uri.clone(), text))
            .ok_or_else(|| ScanError::NotFound(uri.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use policyscan_types::{PathFilter, PatternSpec};

    fn query(pattern: &str, files: &str) -> ScanQuery {
        ScanQuery {
            pattern: PatternSpec::regexp(pattern),
            repositories: PathFilter::default(),
            files: PathFilter::regexp([files]),
            max_results: 10,
        }
    }

    #[tokio::test]
    async fn search_filters_by_file_and_content() {
        let corpus = MemoryCorpus::with_documents([
            ("a#package.json", "{\n  \"dependencies\": {}\n}\n"),
            ("b#package.json", "{}\n"),
            ("b#.travis.yml", "language: go\n"),
        ]);
        let matches: Vec<Match> = corpus
            .search(&query("dependencies", r"(^|/)package\.json$"))
            .try_collect()
            .await
            .expect("search");
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].uri.as_str(), "a#package.json");
        assert_eq!(matches[0].preview, "\"dependencies\": {}");
        assert_eq!(corpus.search_count(), 1);
    }

    #[tokio::test]
    async fn gate_holds_first_open_only() {
        let corpus = MemoryCorpus::with_documents([("a#x", "1")]);
        let gate = corpus.gate("a#x");
        let held = {
            let corpus = corpus.clone();
            tokio::spawn(async move { corpus.open_document(&DocumentUri::new("a#x")).await })
        };
        gate.reached().await;
        let second = corpus
            .open_document(&DocumentUri::new("a#x"))
            .await
            .expect("ungated");
        assert_eq!(second.text, "1");
        gate.release();
        let first = held.await.expect("join").expect("open");
        assert_eq!(first.text, "1");
    }

    #[tokio::test]
    async fn failing_search_surfaces_backend_error() {
        let corpus = MemoryCorpus::new();
        corpus.fail_searches(Some("offline"));
        let err = corpus
            .search(&query("x", "y"))
            .try_collect::<Vec<_>>()
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::Backend(m) if m == "offline"));
    }
}
