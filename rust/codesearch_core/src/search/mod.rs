//! True-match verification over whole-file content.
//!
//! The trigram filter only proposes candidates; `Matcher::hit_lines` runs
//! the real pattern against a candidate's bytes and reports the 0-indexed
//! line of every match start.

pub mod literal;

use literal::is_literal_pattern;
use memchr::memmem;
use regex::bytes::{Regex, RegexBuilder};

use crate::trigram::error::TrigramError;

/// Compiled size limit for query regexes (10 MB).
const REGEX_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// Compiled pattern: a SIMD-accelerated literal or a full regex.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Case-sensitive literal search using memchr.
    Literal(memmem::Finder<'static>),
    /// Full regex search for complex patterns.
    Regex(Regex),
}

impl Matcher {
    /// Compile a pattern. Fails with `InvalidPattern` if it is not a valid regex.
    pub fn compile(pattern: &str) -> Result<Self, TrigramError> {
        if is_literal_pattern(pattern) {
            return Ok(Matcher::Literal(
                memmem::Finder::new(pattern.as_bytes()).into_owned(),
            ));
        }
        let regex = RegexBuilder::new(pattern)
            .size_limit(REGEX_SIZE_LIMIT)
            .build()?;
        Ok(Matcher::Regex(regex))
    }

    /// Start offset of the first match at or after `from`.
    fn find_from(&self, content: &[u8], from: usize) -> Option<usize> {
        match self {
            Matcher::Literal(finder) => finder.find(&content[from..]).map(|at| from + at),
            Matcher::Regex(regex) => regex.find_at(content, from).map(|m| m.start()),
        }
    }

    /// Returns true if the pattern matches anywhere in `content`.
    pub fn is_match(&self, content: &[u8]) -> bool {
        self.find_from(content, 0).is_some()
    }

    /// Line numbers (0-indexed) of every match start in `content`.
    ///
    /// Each search resumes one byte after the previous match's start, so
    /// overlapping occurrences are each counted once per start position and
    /// a line appears once per match on it.
    pub fn hit_lines(&self, content: &[u8]) -> Vec<usize> {
        let mut lines = Vec::new();
        let mut from = 0;
        let mut line = 0;
        let mut counted_to = 0;

        while from <= content.len() {
            let Some(start) = self.find_from(content, from) else {
                break;
            };
            line += memchr::memchr_iter(b'\n', &content[counted_to..start]).count();
            counted_to = start;
            lines.push(line);
            from = start + 1;
        }

        lines
    }
}

/// Number of lines in `content`: newline count plus one.
pub fn line_count(content: &[u8]) -> usize {
    memchr::memchr_iter(b'\n', content).count() + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_hits() {
        let m = Matcher::compile("Foo").unwrap();
        assert!(matches!(m, Matcher::Literal(_)));
        assert_eq!(m.hit_lines(b"func Foo() {}"), vec![0]);
        assert_eq!(m.hit_lines(b"Foo\nbar\nFoo Foo"), vec![0, 2, 2]);
    }

    #[test]
    fn regex_hits() {
        let m = Matcher::compile(r"fn\s+\w+").unwrap();
        assert!(matches!(m, Matcher::Regex(_)));
        let content = b"fn main() {\n  let x = 1;\n}\nfn helper() {";
        assert_eq!(m.hit_lines(content), vec![0, 3]);
    }

    #[test]
    fn overlapping_starts_each_count() {
        // "aa" occurs at offsets 0, 1 and 2 of "aaaa".
        let m = Matcher::compile("aa").unwrap();
        assert_eq!(m.hit_lines(b"aaaa"), vec![0, 0, 0]);
        let m = Matcher::compile("a+").unwrap();
        assert_eq!(m.hit_lines(b"aaa\na"), vec![0, 0, 0, 1]);
    }

    #[test]
    fn no_match_is_empty() {
        let m = Matcher::compile("zzz").unwrap();
        assert!(m.hit_lines(b"hello world").is_empty());
        assert!(!m.is_match(b"hello world"));
    }

    #[test]
    fn anchors_respect_context() {
        // `^` needs multi-line mode; without it only the file start matches.
        let m = Matcher::compile("^b").unwrap();
        assert!(m.hit_lines(b"a\nb").is_empty());
        let m = Matcher::compile("(?m)^b").unwrap();
        assert_eq!(m.hit_lines(b"a\nb\nb"), vec![1, 2]);
    }

    #[test]
    fn unicode_content() {
        let m = Matcher::compile("世界").unwrap();
        assert_eq!(m.hit_lines("你好世界\nhello\n世界和平".as_bytes()), vec![0, 2]);
    }

    #[test]
    fn invalid_pattern() {
        assert!(matches!(
            Matcher::compile("foo("),
            Err(TrigramError::InvalidPattern(_))
        ));
    }

    #[test]
    fn counts_lines() {
        assert_eq!(line_count(b""), 1);
        assert_eq!(line_count(b"one"), 1);
        assert_eq!(line_count(b"one\ntwo\n"), 3);
    }
}
