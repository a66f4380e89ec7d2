use crate::{CorpusSearch, DocumentSource, MatchStream, ScanError, expand};
use async_trait::async_trait;
use futures::stream;
use futures::{StreamExt, TryStreamExt};
use lru::LruCache;
use policyscan_types::{DocumentUri, Match, ScanQuery, TextDocument};
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Cache = LruCache<ScanQuery, Arc<Vec<Match>>>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Serves structurally identical queries from a bounded LRU cache.
///
/// Only complete, successful scans are cached. There is no time-based invalidation; call
/// [`MemoizedScanner::clear`] to drop everything. Two concurrent misses for the same query both
/// reach the backend.
pub struct MemoizedScanner<S> {
    inner: Arc<S>,
    cache: Arc<Mutex<Cache>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
}

impl<S> MemoizedScanner<S>
where
    S: CorpusSearch + 'static,
{
    pub fn new(inner: S, capacity: NonZeroUsize) -> Self {
        Self::from_arc(Arc::new(inner), capacity)
    }

    pub fn from_arc(inner: Arc<S>, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: lock(&self.cache).len(),
        }
    }

    pub fn clear(&self) {
        lock(&self.cache).clear();
    }
}

fn lock(cache: &Mutex<Cache>) -> std::sync::MutexGuard<'_, Cache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S> CorpusSearch for MemoizedScanner<S>
where
    S: CorpusSearch + 'static,
{
    fn search(&self, query: &ScanQuery) -> MatchStream {
        let inner = Arc::clone(&self.inner);
        let cache = Arc::clone(&self.cache);
        let hits = Arc::clone(&self.hits);
        let misses = Arc::clone(&self.misses);
        let query = query.clone();

        stream::once(fetch(inner, cache, hits, misses, query))
            .flat_map(expand)
            .boxed()
    }
}

async fn fetch<S: CorpusSearch + ?Sized>(
    inner: Arc<S>,
    cache: Arc<Mutex<Cache>>,
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    query: ScanQuery,
) -> Result<Vec<Match>, ScanError> {
    let cached = lock(&cache).get(&query).cloned();
    if let Some(matches) = cached {
        hits.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(matches = matches.len(), "scan cache hit");
        return Ok(matches.as_ref().clone());
    }

    misses.fetch_add(1, Ordering::Relaxed);
    tracing::debug!("scan cache miss");
    let matches: Vec<Match> = inner
        .search(&query)
        .take(query.max_results)
        .try_collect()
        .await?;
    lock(&cache).put(query, Arc::new(matches.clone()));
    Ok(matches)
}

#[async_trait]
impl<S> DocumentSource for MemoizedScanner<S>
where
    S: CorpusSearch + DocumentSource + 'static,
{
    async fn open_document(&self, uri: &DocumentUri) -> Result<TextDocument, ScanError> {
        self.inner.open_document(uri).await
    }
}
