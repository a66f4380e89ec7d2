//! Corpus adapters: the search and document ports, a filesystem corpus and the memoized scanner.
//!
//! This crate is allowed to do filesystem IO. Everything above it talks to the corpus through
//! [`CorpusSearch`] and [`DocumentSource`].

#![forbid(unsafe_code)]

mod filter;
mod fs;
mod memo;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use policyscan_types::{DocumentUri, Match, ScanQuery, TextDocument};

pub use filter::CompiledFilter;
pub use fs::FsCorpus;
pub use memo::{CacheStats, MemoizedScanner};

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("invalid {what} pattern `{pattern}`: {message}")]
    InvalidPattern {
        what: &'static str,
        pattern: String,
        message: String,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("document not found: {0}")]
    NotFound(DocumentUri),

    #[error("malformed document uri: {0}")]
    InvalidUri(DocumentUri),

    #[error("search backend failed: {0}")]
    Backend(String),
}

/// Lazy sequence of matches. A backend failure surfaces as an `Err` item and ends the scan.
pub type MatchStream = BoxStream<'static, Result<Match, ScanError>>;

/// Pattern search across a filtered set of repositories and files.
pub trait CorpusSearch: Send + Sync {
    /// Start a scan. At most `query.max_results` matches are yielded; ordering is unspecified.
    fn search(&self, query: &ScanQuery) -> MatchStream;
}

/// Full-text access to corpus documents.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    async fn open_document(&self, uri: &DocumentUri) -> Result<TextDocument, ScanError>;
}

/// Turn a collected scan result into a match stream.
pub(crate) fn expand(result: Result<Vec<Match>, ScanError>) -> MatchStream {
    match result {
        Ok(matches) => stream::iter(matches.into_iter().map(Ok)).boxed(),
        Err(e) => stream::iter(std::iter::once(Err(e))).boxed(),
    }
}
