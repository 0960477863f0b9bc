//! Pagination and per-file snippet metadata.
//!
//! A search produces one `FileMatch` per verified file. Only the files that
//! fall inside the requested page window are turned into `Snippet`s, which
//! is also the only point where rendered code is attached.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::search::line_count;

/// A verified match: a file with at least one hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMatch {
    pub file_id: u32,
    pub repository: String,
    pub path: String,
    /// 0-indexed line of every match start, in match order.
    pub hits: Vec<usize>,
}

/// Index range of the page `[offset, offset + count)` clamped to `[0, total)`.
///
/// An offset at or past the end yields an empty range.
pub fn page_window(total: usize, offset: usize, count: usize) -> Range<usize> {
    let start = offset.min(total);
    let end = start.saturating_add(count).min(total);
    start..end
}

/// Rendered representation of one matching file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    #[serde(rename = "repo")]
    pub repository: String,
    pub path: String,
    pub code: String,
    pub line_count: usize,
    pub hit_count: usize,
    pub first_hit: usize,
    #[serde(skip)]
    pub hits: Vec<usize>,
}

impl Snippet {
    /// Compute snippet metadata for a match over `content`. `code` starts
    /// empty and is filled in by the highlighter.
    pub fn new(m: FileMatch, content: &[u8]) -> Self {
        Snippet {
            repository: m.repository,
            path: m.path,
            code: String::new(),
            line_count: line_count(content),
            hit_count: m.hits.len(),
            first_hit: m.hits.first().copied().unwrap_or(0),
            hits: m.hits,
        }
    }
}

/// Response envelope of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Number of matching files, independent of pagination.
    pub count: usize,
    /// Every repository in the current segment, sorted.
    pub repositories: Vec<String>,
    pub snippets: Vec<Snippet>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_match(path: &str, hits: Vec<usize>) -> FileMatch {
        FileMatch {
            file_id: 0,
            repository: "r1".to_string(),
            path: path.to_string(),
            hits,
        }
    }

    #[test]
    fn window_inside() {
        assert_eq!(page_window(25, 10, 10), 10..20);
        assert_eq!(page_window(25, 20, 10), 20..25);
    }

    #[test]
    fn window_past_end_is_empty() {
        assert!(page_window(5, 5, 10).is_empty());
        assert!(page_window(5, 100, 10).is_empty());
        assert!(page_window(0, 0, 10).is_empty());
    }

    #[test]
    fn window_zero_count() {
        assert!(page_window(5, 0, 0).is_empty());
    }

    #[test]
    fn window_no_overflow() {
        assert_eq!(page_window(3, 1, usize::MAX), 1..3);
    }

    #[test]
    fn snippet_metadata() {
        let content = b"package main\n\nfunc Foo() {}\nfunc Bar() { Foo() }\n";
        let s = Snippet::new(file_match("a.go", vec![2, 3]), content);
        assert_eq!(s.line_count, 5);
        assert_eq!(s.hit_count, 2);
        assert_eq!(s.first_hit, 2);
        assert_eq!(s.hits, vec![2, 3]);
        assert!(s.code.is_empty());
    }

    #[test]
    fn snippet_wire_shape() {
        let mut s = Snippet::new(file_match("a.go", vec![0]), b"func Foo() {}");
        s.code = "<pre>x</pre>".to_string();
        let result = SearchResult {
            count: 1,
            repositories: vec!["r1".to_string()],
            snippets: vec![s],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "count": 1,
                "repositories": ["r1"],
                "snippets": [{
                    "repo": "r1",
                    "path": "a.go",
                    "code": "<pre>x</pre>",
                    "line_count": 1,
                    "hit_count": 1,
                    "first_hit": 0
                }]
            })
        );
    }
}
