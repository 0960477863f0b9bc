//! Merge a published segment with a freshly built batch.
//!
//! The merged segment numbers files by concatenating the base file table
//! (minus pruned entries) with the batch file table. Base postings are
//! remapped through the pruning table, batch postings are shifted by the
//! number of surviving base files, and lists for the same trigram are
//! unioned.

use super::builder::TrigramIndexBuilder;
use super::error::TrigramError;
use super::posting::PostingList;
use super::reader::IndexView;

/// Merge `base` and `batch` into a new in-memory segment.
///
/// When `replaced_repository` is set, every base file belonging to that
/// repository is dropped first, so re-ingesting a repository replaces its
/// old entries instead of duplicating them.
pub fn merge_segments(
    base: &IndexView<'_>,
    batch: &TrigramIndexBuilder,
    replaced_repository: Option<&str>,
) -> Result<TrigramIndexBuilder, TrigramError> {
    let mut merged = TrigramIndexBuilder::new();

    // Phase 1: surviving base files keep their relative order.
    let mut remap: Vec<Option<u32>> = Vec::with_capacity(base.file_count() as usize);
    for file in base.files() {
        let file = file?;
        if replaced_repository == Some(file.repository()) {
            remap.push(None);
            continue;
        }
        let id = merged.push_file(file.key.to_string(), file.repo_len)?;
        remap.push(Some(id));
    }
    let identity = remap.iter().all(Option::is_some);

    // Phase 2: base postings, remapped only when something was pruned.
    for entry in base.postings() {
        let (trigram, list) = entry?;
        if identity {
            merged.union_posting(trigram, &list.bitmap);
        } else {
            merged.union_posting(trigram, &list.remap(&remap).bitmap);
        }
    }

    // Phase 3: batch files appended after the base.
    let shift = merged.file_count();
    for file in batch.files() {
        merged.push_file(file.key.clone(), file.repo_len)?;
    }
    for (trigram, bitmap) in batch.sorted_posting_lists() {
        let shifted = PostingList::from_bitmap(bitmap.clone())
            .offset(shift)
            .ok_or(TrigramError::FileTableFull)?;
        merged.union_posting(trigram, &shifted.bitmap);
    }

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigram::write_index;

    fn segment(files: &[(&str, &str, &str)]) -> Vec<u8> {
        let mut builder = TrigramIndexBuilder::new();
        for (repo, path, content) in files {
            builder.add_file(repo, path, content.as_bytes()).unwrap();
        }
        write_index(&builder).unwrap()
    }

    fn batch(files: &[(&str, &str, &str)]) -> TrigramIndexBuilder {
        let mut builder = TrigramIndexBuilder::new();
        for (repo, path, content) in files {
            builder.add_file(repo, path, content.as_bytes()).unwrap();
        }
        builder
    }

    fn keys(builder: &TrigramIndexBuilder) -> Vec<String> {
        builder.files().iter().map(|f| f.key.clone()).collect()
    }

    #[test]
    fn test_merge_concatenates_and_offsets() {
        let base = segment(&[("r1", "a.go", "func Foo() {}"), ("r1", "b.go", "var x")]);
        let view = IndexView::parse(&base).unwrap();
        let new = batch(&[("r2", "c.go", "func Bar() {}")]);

        let merged = merge_segments(&view, &new, None).unwrap();
        assert_eq!(keys(&merged), vec!["r1/a.go", "r1/b.go", "r2/c.go"]);

        let func: Vec<u32> = merged.posting(b"fun").unwrap().iter().collect();
        assert_eq!(func, vec![0, 2]);
        let bar: Vec<u32> = merged.posting(b"Bar").unwrap().iter().collect();
        assert_eq!(bar, vec![2]);
        let var: Vec<u32> = merged.posting(b"var").unwrap().iter().collect();
        assert_eq!(var, vec![1]);
    }

    #[test]
    fn test_merge_prunes_replaced_repository() {
        let base = segment(&[
            ("r1", "old.go", "stale content"),
            ("r2", "keep.go", "keep content"),
        ]);
        let view = IndexView::parse(&base).unwrap();
        let new = batch(&[("r1", "new.go", "fresh content")]);

        let merged = merge_segments(&view, &new, Some("r1")).unwrap();
        assert_eq!(keys(&merged), vec!["r2/keep.go", "r1/new.go"]);
        assert!(merged.posting(b"sta").is_none());

        let content: Vec<u32> = merged.posting(b"con").unwrap().iter().collect();
        assert_eq!(content, vec![0, 1]);
    }

    #[test]
    fn test_prune_matches_whole_repository_only() {
        // "r1" must not prune "r10".
        let base = segment(&[("r10", "a", "abcdef")]);
        let view = IndexView::parse(&base).unwrap();
        let merged = merge_segments(&view, &batch(&[]), Some("r1")).unwrap();
        assert_eq!(keys(&merged), vec!["r10/a"]);
    }

    #[test]
    fn test_merge_empty_base() {
        let base = segment(&[]);
        let view = IndexView::parse(&base).unwrap();
        let new = batch(&[("r1", "a", "hello")]);
        let merged = merge_segments(&view, &new, None).unwrap();
        assert_eq!(write_index(&merged).unwrap(), write_index(&new).unwrap());
    }

    #[test]
    fn test_merged_segment_serializes() {
        let base = segment(&[("r1", "a", "hello world")]);
        let view = IndexView::parse(&base).unwrap();
        let merged = merge_segments(&view, &batch(&[("r2", "b", "hello there")]), None).unwrap();
        let bytes = write_index(&merged).unwrap();
        let merged_view = IndexView::parse(&bytes).unwrap();
        assert_eq!(merged_view.lookup(b"hel").unwrap().unwrap().to_vec(), vec![0, 1]);
        assert_eq!(merged_view.file(1).unwrap().repository(), "r2");
    }
}
