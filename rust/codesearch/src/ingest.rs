//! Ingestion: walk a repository, store its files, build and publish a segment.
//!
//! `build_batch` turns one repository listing into a committed content
//! batch plus an in-memory segment. `publish_merged` folds that segment into
//! the current one and atomically replaces the segment file. Callers hold
//! the engine's ingestion lock across both steps.

use std::path::Path;
use std::time::Instant;

use serde::Serialize;

use codesearch_core::key::file_key;
use codesearch_core::trigram::{merge_segments, write_index, IndexView, TrigramIndexBuilder};

use crate::error::{EngineError, Result};
use crate::segment::{publish_segment, SegmentReader};
use crate::source::RepositorySource;
use crate::store::ContentStore;

/// Outcome of ingesting one repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub repository: String,
    /// Files written to the content store.
    pub files_stored: usize,
    /// Files that received a file id (text files under the size limit).
    pub files_indexed: usize,
    /// Entries skipped: unreadable, or with a key the segment cannot hold.
    pub files_skipped: usize,
    /// Files in the published segment after the merge.
    pub segment_files: u32,
}

/// Walk `locator`, store every readable file and index the text ones.
///
/// The content batch is committed before returning, so every file id in
/// the returned segment already resolves in the store.
pub(crate) fn build_batch(
    source: &dyn RepositorySource,
    store: &ContentStore,
    locator: &str,
) -> Result<(TrigramIndexBuilder, IngestReport)> {
    let files = source
        .files(locator)
        .map_err(|source| EngineError::SourceUnavailable {
            locator: locator.to_string(),
            source,
        })?;

    let mut builder = TrigramIndexBuilder::new();
    let mut batch = store.batch()?;
    let mut report = IngestReport {
        repository: locator.to_string(),
        ..Default::default()
    };

    for file in files {
        let content = match file.content {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(repository = locator, path = %file.path, error = %e, "Skipping unreadable file");
                report.files_skipped += 1;
                continue;
            }
        };

        // Index first: a file the segment cannot hold is not stored either.
        let indexed = match builder.add_file(locator, &file.path, &content) {
            Ok(id) => id.is_some(),
            Err(e) => {
                tracing::warn!(repository = locator, path = %file.path, error = %e, "Skipping file the index cannot hold");
                report.files_skipped += 1;
                continue;
            }
        };

        batch.put(&file_key(locator, &file.path), &content)?;
        report.files_stored += 1;
        if indexed {
            report.files_indexed += 1;
        } else {
            tracing::debug!(repository = locator, path = %file.path, "Stored without indexing (binary or oversized)");
        }
    }

    batch.commit()?;
    Ok((builder, report))
}

/// Merge `batch` into `current` (if any) and publish the result at `target`.
///
/// Files of `locator` already in `current` are replaced by the batch.
/// Returns a reader over the newly published segment. On error the file at
/// `target` is unchanged.
pub(crate) fn publish_merged(
    target: &Path,
    current: Option<&SegmentReader>,
    batch: &TrigramIndexBuilder,
    locator: &str,
) -> Result<SegmentReader> {
    let start = Instant::now();

    let bytes = match current {
        Some(reader) => {
            let merged = merge_segments(&reader.view(), batch, Some(locator))
                .map_err(EngineError::MergeFailure)?;
            write_index(&merged)
        }
        None => write_index(batch),
    }
    .map_err(EngineError::MergeFailure)?;

    // Never publish bytes the reader would reject.
    IndexView::parse(&bytes).map_err(EngineError::MergeFailure)?;

    publish_segment(target, &bytes)
        .map_err(|e| EngineError::MergeFailure(e.into()))?;

    let reader = SegmentReader::open(target).map_err(|source| EngineError::Index {
        path: target.to_path_buf(),
        source,
    })?;

    tracing::debug!(
        repository = locator,
        files = reader.file_count(),
        trigrams = reader.trigram_count(),
        bytes = reader.size(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Published segment"
    );
    Ok(reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::SEGMENT_FILE_NAME;
    use crate::source::MemorySource;
    use tempfile::TempDir;

    #[test]
    fn test_build_batch_stores_and_indexes() {
        let store = ContentStore::open_temporary().unwrap();
        let source = MemorySource::new();
        source.insert("r1", "a.go", "func Foo() {}");
        source.insert("r1", "blob.bin", vec![0u8; 64]);

        let (builder, report) = build_batch(&source, &store, "r1").unwrap();
        assert_eq!(report.files_stored, 2);
        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.files_skipped, 0);
        assert_eq!(builder.file_count(), 1);
        assert_eq!(store.get("r1/a.go").unwrap(), b"func Foo() {}".to_vec());
        assert_eq!(store.get("r1/blob.bin").unwrap().len(), 64);
    }

    #[test]
    fn test_overlong_key_skips_only_that_file() {
        let store = ContentStore::open_temporary().unwrap();
        let source = MemorySource::new();
        let long_path = format!("{}.go", "d".repeat(u16::MAX as usize));
        source.insert("r1", "ok.go", "func Foo() {}");
        source.insert("r1", &long_path, "func Foo() {}");

        let (builder, report) = build_batch(&source, &store, "r1").unwrap();
        assert_eq!(report.files_stored, 1);
        assert_eq!(report.files_indexed, 1);
        assert_eq!(report.files_skipped, 1);
        assert_eq!(builder.file_count(), 1);
        assert!(store.get("r1/ok.go").is_ok());
        assert!(matches!(
            store.get(&file_key("r1", &long_path)),
            Err(crate::store::StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_repository_is_unavailable() {
        let store = ContentStore::open_temporary().unwrap();
        let err = build_batch(&MemorySource::new(), &store, "nowhere").unwrap_err();
        assert!(matches!(err, EngineError::SourceUnavailable { .. }));
    }

    #[test]
    fn test_publish_initial_then_merge() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join(SEGMENT_FILE_NAME);
        let store = ContentStore::open_temporary().unwrap();
        let source = MemorySource::new();
        source.insert("r1", "a.go", "func Foo() {}");
        source.insert("r2", "b.go", "func Bar() {}");

        let (batch, _) = build_batch(&source, &store, "r1").unwrap();
        let first = publish_merged(&target, None, &batch, "r1").unwrap();
        assert_eq!(first.file_count(), 1);

        let (batch, _) = build_batch(&source, &store, "r2").unwrap();
        let second = publish_merged(&target, Some(&first), &batch, "r2").unwrap();
        assert_eq!(second.file_count(), 2);
        assert_eq!(second.view().file(1).unwrap().key, "r2/b.go");

        // Re-ingesting r1 replaces its entry instead of duplicating it.
        let (batch, _) = build_batch(&source, &store, "r1").unwrap();
        let third = publish_merged(&target, Some(&second), &batch, "r1").unwrap();
        let keys: Vec<String> = third
            .view()
            .files()
            .map(|f| f.unwrap().key.to_string())
            .collect();
        assert_eq!(keys, vec!["r2/b.go", "r1/a.go"]);
    }
}
