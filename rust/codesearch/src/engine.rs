//! Search engine facade.
//!
//! `Engine` owns the data directory: the current segment (memory-mapped,
//! swapped atomically on every ingestion) and the content store. Queries
//! take an `Arc` of the current segment under a short read lock and never
//! wait for ingestion; ingestions are serialized by a mutex.

use std::ops::Range;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use codesearch_core::key::normalize_locator;
use codesearch_core::search::Matcher;
use codesearch_core::snippet::{page_window, FileMatch, SearchResult, Snippet};
use codesearch_core::trigram::reader::FileRef;
use codesearch_core::trigram::build_trigram_query;

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::highlight::{Highlighter, PlainHtmlHighlighter};
use crate::ingest::{build_batch, publish_merged, IngestReport};
use crate::segment::{remove_stale_temp_files, SegmentReader, SEGMENT_FILE_NAME};
use crate::source::{LocalSource, RepositorySource};
use crate::store::{ContentStore, StoreError};

/// Page size when a request does not set one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Largest page a single request may ask for.
pub const MAX_PAGE_SIZE: usize = 100;

/// Content store file inside the data directory.
pub const CONTENT_STORE_FILE_NAME: &str = "content.redb";

/// Threshold for parallel candidate verification.
const PARALLEL_VERIFY_THRESHOLD: usize = 10;

/// Candidates verified per round; bounds the content held at once.
const VERIFY_CHUNK_SIZE: usize = 256;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A paginated search over every ingested repository, or one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Regular expression (or plain literal) to search for.
    pub pattern: String,
    /// Restrict results to this repository locator.
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub offset: usize,
    #[serde(default = "default_page_size")]
    pub count: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

impl SearchRequest {
    /// First page of results for `pattern` across all repositories.
    pub fn new(pattern: impl Into<String>) -> Self {
        SearchRequest {
            pattern: pattern.into(),
            repository: None,
            offset: 0,
            count: DEFAULT_PAGE_SIZE,
        }
    }

    /// Restrict to one repository. An empty locator means all repositories.
    pub fn repository(mut self, repository: &str) -> Self {
        self.repository = normalize_locator(repository).map(str::to_string);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Reject requests the engine will not run.
    pub fn validate(&self) -> Result<()> {
        if self.pattern.is_empty() {
            return Err(EngineError::InvalidRequest("empty pattern".to_string()));
        }
        if self.count > MAX_PAGE_SIZE {
            return Err(EngineError::InvalidRequest(format!(
                "count {} exceeds maximum page size {}",
                self.count, MAX_PAGE_SIZE
            )));
        }
        Ok(())
    }

    /// Repository filter with trailing slashes removed; `None` matches all.
    fn repository_filter(&self) -> Option<&str> {
        self.repository.as_deref().and_then(normalize_locator)
    }
}

/// Cancellation and deadline for one search.
///
/// Clones share the cancel flag, so another thread can stop a running
/// search through its own clone.
#[derive(Debug, Clone, Default)]
pub struct SearchControl {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl SearchControl {
    /// No deadline, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Ask every search using this control to stop.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// True once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Snapshot of the current index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub file_count: u32,
    pub trigram_count: u32,
    pub segment_bytes: u64,
    pub repositories: Vec<String>,
    pub stored_files: u64,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Multi-repository code search engine over one data directory.
pub struct Engine {
    config: Config,
    store: ContentStore,
    source: Arc<dyn RepositorySource>,
    highlighter: Arc<dyn Highlighter>,
    /// Current segment; `None` until the first ingestion.
    segment: RwLock<Option<Arc<SegmentReader>>>,
    /// Serializes build + merge + publish.
    ingest_lock: Mutex<()>,
}

impl Engine {
    /// Open the engine with local-directory sources and plain HTML snippets.
    pub fn open(config: Config) -> Result<Self> {
        Self::open_with(
            config,
            Arc::new(LocalSource::new()),
            Arc::new(PlainHtmlHighlighter),
        )
    }

    /// Open the engine with a custom file source and highlighter.
    ///
    /// Creates the data directory if needed, removes temporary files left
    /// by an interrupted publish, opens the current segment if there is
    /// one, and ingests `config.initial_repositories`.
    pub fn open_with(
        config: Config,
        source: Arc<dyn RepositorySource>,
        highlighter: Arc<dyn Highlighter>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let removed = remove_stale_temp_files(&config.data_dir)?;
        if removed > 0 {
            tracing::warn!(
                data_dir = %config.data_dir.display(),
                removed,
                "Removed temporary segment files from an interrupted publish"
            );
        }

        let store = ContentStore::open(config.data_dir.join(CONTENT_STORE_FILE_NAME))?;

        let segment_path = config.data_dir.join(SEGMENT_FILE_NAME);
        let segment = if segment_path.exists() {
            let reader = SegmentReader::open(&segment_path).map_err(|source| {
                EngineError::Index {
                    path: segment_path.clone(),
                    source,
                }
            })?;
            tracing::info!(
                files = reader.file_count(),
                trigrams = reader.trigram_count(),
                bytes = reader.size(),
                "Opened segment"
            );
            Some(Arc::new(reader))
        } else {
            tracing::info!(data_dir = %config.data_dir.display(), "No segment yet");
            None
        };

        let engine = Engine {
            config,
            store,
            source,
            highlighter,
            segment: RwLock::new(segment),
            ingest_lock: Mutex::new(()),
        };

        for locator in engine.config.initial_repositories.clone() {
            engine.add(&locator)?;
        }

        Ok(engine)
    }

    /// Configuration the engine was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn segment_path(&self) -> PathBuf {
        self.config.data_dir.join(SEGMENT_FILE_NAME)
    }

    /// The segment queries currently run against.
    fn current_segment(&self) -> Option<Arc<SegmentReader>> {
        self.segment.read().clone()
    }

    /// Ingest the repository at `locator` and publish the merged segment.
    ///
    /// Re-adding a repository replaces its previous files in the index.
    /// Concurrent calls queue; searches keep running against the previous
    /// segment until the new one is swapped in.
    pub fn add(&self, locator: &str) -> Result<IngestReport> {
        let locator =
            normalize_locator(locator).ok_or_else(|| EngineError::InvalidLocator(locator.to_string()))?;

        let _guard = self.ingest_lock.lock();
        let start = Instant::now();
        tracing::info!(repository = locator, "Ingesting repository");

        let (batch, mut report) = build_batch(self.source.as_ref(), &self.store, locator)?;

        let current = self.current_segment();
        let reader = publish_merged(&self.segment_path(), current.as_deref(), &batch, locator)?;
        report.segment_files = reader.file_count();

        *self.segment.write() = Some(Arc::new(reader));

        tracing::info!(
            repository = locator,
            files = report.files_stored,
            indexed = report.files_indexed,
            skipped = report.files_skipped,
            segment_files = report.segment_files,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ingestion done"
        );
        Ok(report)
    }

    /// Run a search without cancellation.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        self.search_with(request, &SearchControl::new())
    }

    /// Run a search, stopping with `Cancelled` when `control` says so.
    pub fn search_with(&self, request: &SearchRequest, control: &SearchControl) -> Result<SearchResult> {
        request.validate()?;
        let matcher = Matcher::compile(&request.pattern).map_err(EngineError::pattern)?;

        let Some(segment) = self.current_segment() else {
            return Ok(SearchResult::default());
        };
        let start = Instant::now();
        let view = segment.view();

        let repositories: Vec<String> = view.repositories().into_iter().map(str::to_string).collect();

        let query = build_trigram_query(&request.pattern);
        let candidate_ids = view.execute(&query).map_err(|source| EngineError::Index {
            path: segment.path().to_path_buf(),
            source,
        })?;

        // Resolve ids and apply the repository filter before touching content.
        let filter = request.repository_filter();
        let candidates: Vec<FileRef<'_>> = candidate_ids
            .iter()
            .filter_map(|id| {
                let file = view.file(id);
                if file.is_none() {
                    tracing::warn!(file_id = id, "Candidate has no file table entry");
                }
                file
            })
            .filter(|file| filter.is_none_or(|repo| file.repository() == repo))
            .collect();

        let wanted = request.offset..request.offset.saturating_add(request.count);
        let (count, page) = self.verify(&candidates, &matcher, control, wanted)?;

        let window = page_window(count, request.offset, request.count);
        debug_assert_eq!(window.len(), page.len());
        let snippets: Vec<Snippet> = page
            .into_iter()
            .map(|(m, content)| self.render(m, &content))
            .collect();

        tracing::debug!(
            pattern = %request.pattern,
            candidates = candidates.len(),
            matches = count,
            returned = snippets.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search done"
        );

        Ok(SearchResult {
            count,
            repositories,
            snippets,
        })
    }

    /// Verify candidates against their content, in ascending file-id order.
    ///
    /// Returns the number of matching files and, for the matches whose rank
    /// falls in `wanted`, the match with the exact bytes it was verified on.
    fn verify(
        &self,
        candidates: &[FileRef<'_>],
        matcher: &Matcher,
        control: &SearchControl,
        wanted: Range<usize>,
    ) -> Result<(usize, Vec<(FileMatch, Vec<u8>)>)> {
        let mut count = 0;
        let mut page = Vec::new();

        for chunk in candidates.chunks(VERIFY_CHUNK_SIZE) {
            let verified: Vec<Option<(FileMatch, Vec<u8>)>> = if chunk.len() < PARALLEL_VERIFY_THRESHOLD {
                chunk
                    .iter()
                    .map(|file| self.verify_file(file, matcher, control))
                    .collect::<Result<_>>()?
            } else {
                chunk
                    .par_iter()
                    .map(|file| self.verify_file(file, matcher, control))
                    .collect::<Result<_>>()?
            };

            for (m, content) in verified.into_iter().flatten() {
                if wanted.contains(&count) {
                    page.push((m, content));
                }
                count += 1;
            }
        }
        Ok((count, page))
    }

    /// Run the matcher over one candidate. `None` if it has no true match.
    fn verify_file(
        &self,
        file: &FileRef<'_>,
        matcher: &Matcher,
        control: &SearchControl,
    ) -> Result<Option<(FileMatch, Vec<u8>)>> {
        if control.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        let content = match self.store.get(file.key) {
            Ok(content) => content,
            Err(StoreError::NotFound(key)) => {
                tracing::warn!(key = %key, "Indexed file missing from content store");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let hits = matcher.hit_lines(&content);
        if hits.is_empty() {
            return Ok(None);
        }
        let m = FileMatch {
            file_id: file.file_id,
            repository: file.repository().to_string(),
            path: file.path().to_string(),
            hits,
        };
        Ok(Some((m, content)))
    }

    /// Turn a match on the current page into a rendered snippet.
    fn render(&self, m: FileMatch, content: &[u8]) -> Snippet {
        let mut snippet = Snippet::new(m, content);
        match self.highlighter.render(&snippet.path, &snippet.hits, content) {
            Ok(code) => snippet.code = code,
            Err(e) => tracing::warn!(error = %e, "Highlighting failed, returning snippet without code"),
        }
        snippet
    }

    /// Counts for the current segment and content store.
    pub fn stats(&self) -> Result<IndexStats> {
        let stored_files = self.store.len()?;
        let Some(segment) = self.current_segment() else {
            return Ok(IndexStats {
                stored_files,
                ..Default::default()
            });
        };
        let view = segment.view();
        Ok(IndexStats {
            file_count: segment.file_count(),
            trigram_count: segment.trigram_count(),
            segment_bytes: segment.size() as u64,
            repositories: view.repositories().into_iter().map(str::to_string).collect(),
            stored_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = SearchRequest::new("Foo");
        assert_eq!(req.offset, 0);
        assert_eq!(req.count, DEFAULT_PAGE_SIZE);
        assert!(req.repository.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_request_validation() {
        assert!(matches!(
            SearchRequest::new("").validate(),
            Err(EngineError::InvalidRequest(_))
        ));
        assert!(matches!(
            SearchRequest::new("x").count(MAX_PAGE_SIZE + 1).validate(),
            Err(EngineError::InvalidRequest(_))
        ));
        assert!(SearchRequest::new("x").count(0).validate().is_ok());
    }

    #[test]
    fn test_request_repository_normalized() {
        assert_eq!(
            SearchRequest::new("x").repository("r1/").repository,
            Some("r1".to_string())
        );
        assert!(SearchRequest::new("x").repository("").repository.is_none());

        let raw = SearchRequest {
            repository: Some("r1//".to_string()),
            ..SearchRequest::new("x")
        };
        assert_eq!(raw.repository_filter(), Some("r1"));
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let req: SearchRequest = serde_json::from_str(r#"{"pattern": "Foo"}"#).unwrap();
        assert_eq!(req, SearchRequest::new("Foo"));
    }

    #[test]
    fn test_control() {
        let control = SearchControl::new();
        assert!(!control.is_cancelled());
        let shared = control.clone();
        shared.cancel();
        assert!(control.is_cancelled());

        let expired = SearchControl::new().with_deadline(Instant::now());
        assert!(expired.is_cancelled());
        let later = SearchControl::new().with_timeout(Duration::from_secs(3600));
        assert!(!later.is_cancelled());
    }
}
