use crate::{CompiledFilter, CorpusSearch, DocumentSource, MatchStream, ScanError, expand};
use async_trait::async_trait;
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use futures::StreamExt;
use futures::stream;
use policyscan_types::{DocumentUri, Match, PatternKind, ScanQuery, TextDocument};
use rayon::prelude::*;
use regex::Regex;
use std::io::ErrorKind;
use walkdir::WalkDir;

/// A corpus on local disk: every directory directly under `root` is one repository.
///
/// Document URIs are `<repository dir name>#<path relative to the repository>`.
#[derive(Clone, Debug)]
pub struct FsCorpus {
    root: Utf8PathBuf,
}

impl FsCorpus {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Repository names in stable order.
    pub fn repositories(&self) -> Result<Vec<String>, ScanError> {
        list_repositories(&self.root)
    }

    /// Run `query` synchronously. Results are sorted by URI and cut at `max_results`.
    pub fn search_blocking(&self, query: &ScanQuery) -> Result<Vec<Match>, ScanError> {
        search_tree(&self.root, query)
    }

    /// Replace a document's text on disk. The document must already exist.
    pub async fn write_document(&self, uri: &DocumentUri, text: &str) -> Result<(), ScanError> {
        let abs = self.resolve(uri)?;
        if !tokio::fs::try_exists(&abs).await.unwrap_or(false) {
            return Err(ScanError::NotFound(uri.clone()));
        }
        tokio::fs::write(&abs, text)
            .await
            .map_err(|source| ScanError::Io {
                path: abs.to_string(),
                source,
            })
    }

    fn resolve(&self, uri: &DocumentUri) -> Result<Utf8PathBuf, ScanError> {
        let repo = uri.repository();
        if repo.is_empty() || !is_plain_relative(Utf8Path::new(repo)) {
            return Err(ScanError::InvalidUri(uri.clone()));
        }
        let path = Utf8Path::new(uri.path());
        if path.as_str().is_empty() || !is_plain_relative(path) {
            return Err(ScanError::InvalidUri(uri.clone()));
        }
        Ok(self.root.join(repo).join(path))
    }
}

impl CorpusSearch for FsCorpus {
    fn search(&self, query: &ScanQuery) -> MatchStream {
        let root = self.root.clone();
        let query = query.clone();
        stream::once(async move {
            tokio::task::spawn_blocking(move || search_tree(&root, &query))
                .await
                .map_err(|e| ScanError::Backend(format!("scan task failed: {e}")))?
        })
        .flat_map(expand)
        .boxed()
    }
}

#[async_trait]
impl DocumentSource for FsCorpus {
    async fn open_document(&self, uri: &DocumentUri) -> Result<TextDocument, ScanError> {
        let abs = self.resolve(uri)?;
        match tokio::fs::read_to_string(&abs).await {
            Ok(text) => Ok(TextDocument::new(uri.clone(), text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ScanError::NotFound(uri.clone())),
            Err(source) => Err(ScanError::Io {
                path: abs.to_string(),
                source,
            }),
        }
    }
}

fn is_plain_relative(path: &Utf8Path) -> bool {
    path.components().all(|c| matches!(c, Utf8Component::Normal(_)))
}

fn list_repositories(root: &Utf8Path) -> Result<Vec<String>, ScanError> {
    let io = |source: std::io::Error| ScanError::Io {
        path: root.to_string(),
        source,
    };
    let mut out = Vec::new();
    for entry in std::fs::read_dir(root).map_err(io)? {
        let entry = entry.map_err(io)?;
        if !entry.file_type().map_err(io)?.is_dir() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string()
            && !name.starts_with('.')
        {
            out.push(name);
        }
    }
    out.sort();
    Ok(out)
}

fn content_regex(query: &ScanQuery) -> Result<Regex, ScanError> {
    let source = match query.pattern.kind {
        PatternKind::Regexp => query.pattern.pattern.clone(),
        PatternKind::Literal => regex::escape(&query.pattern.pattern),
    };
    Regex::new(&source).map_err(|e| ScanError::InvalidPattern {
        what: "content",
        pattern: query.pattern.pattern.clone(),
        message: e.to_string(),
    })
}

fn search_tree(root: &Utf8Path, query: &ScanQuery) -> Result<Vec<Match>, ScanError> {
    let repos = CompiledFilter::compile(&query.repositories)?;
    let files = CompiledFilter::compile(&query.files)?;
    let content = content_regex(query)?;
    let match_all = query.pattern.pattern.is_empty();

    let mut candidates: Vec<(DocumentUri, Utf8PathBuf)> = Vec::new();
    let repositories = list_repositories(root)?;
    for repo in repositories.iter().filter(|r| repos.is_match(r)) {
        let repo_root = root.join(repo);
        for entry in WalkDir::new(&repo_root)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let Ok(abs) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
                continue;
            };
            let rel = abs
                .strip_prefix(&repo_root)
                .unwrap_or(&abs)
                .as_str()
                .replace('\\', "/");
            if files.is_match(&rel) {
                candidates.push((DocumentUri::from_parts(repo, &rel), abs));
            }
        }
    }

    let scanned = candidates.len();
    let mut matches: Vec<Match> = candidates
        .into_par_iter()
        .map(|(uri, abs)| match_file(uri, &abs, &content, match_all))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();

    matches.sort_by(|a, b| a.uri.cmp(&b.uri));
    let total = matches.len();
    matches.truncate(query.max_results);
    tracing::debug!(
        repositories = repositories.len(),
        scanned,
        matched = total,
        returned = matches.len(),
        "corpus scan finished"
    );
    Ok(matches)
}

/// `Ok(None)` for files that vanished, are not UTF-8 or do not match.
fn match_file(
    uri: DocumentUri,
    abs: &Utf8Path,
    content: &Regex,
    match_all: bool,
) -> Result<Option<Match>, ScanError> {
    let bytes = match std::fs::read(abs) {
        Ok(b) => b,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ScanError::Io {
                path: abs.to_string(),
                source,
            });
        }
    };
    let Ok(text) = String::from_utf8(bytes) else {
        return Ok(None);
    };

    let preview = if match_all {
        Some(text.lines().next().unwrap_or("").trim().to_string())
    } else {
        text.lines()
            .find(|line| content.is_match(line))
            .map(|line| line.trim().to_string())
    };
    Ok(preview.map(|preview| Match { uri, preview }))
}
