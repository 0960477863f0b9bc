//! Literal pattern detection.

/// Bytes that give a pattern regex meaning.
const REGEX_META: &[u8] = b".*+?()[]{}|^$\\";

/// True if `pattern` contains no regex metacharacters, so it matches exactly
/// its own bytes.
///
/// Such patterns take their trigrams directly instead of going through
/// syntax analysis, and are verified with `memchr::memmem`.
pub fn is_literal_pattern(pattern: &str) -> bool {
    !pattern.bytes().any(|b| REGEX_META.contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_literal() {
        for p in ["hello", "func Foo", "path/to/file_go", "a-b_c = 1;", "世界", "#include <stdio>"] {
            assert!(is_literal_pattern(p), "{p}");
        }
    }

    #[test]
    fn each_metachar_makes_a_regex() {
        for p in [
            "foo.bar", "path/to/file.go", "a*", "a+", "a?", "(x)", "[ab]", "x{2}", "a|b", "^a", "a$", r"\d",
        ] {
            assert!(!is_literal_pattern(p), "{p}");
        }
    }
}
