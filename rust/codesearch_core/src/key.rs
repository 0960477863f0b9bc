//! File keys.
//!
//! A file is identified by a single string `<repository>/<path>`. The
//! segment file table stores the length of the repository prefix next to
//! each key, so splitting never has to guess where the locator ends.

/// Join a repository locator and a relative path into a file key.
pub fn file_key(repository: &str, path: &str) -> String {
    let mut key = String::with_capacity(repository.len() + 1 + path.len());
    key.push_str(repository);
    key.push('/');
    key.push_str(path);
    key
}

/// Split a key at a known repository prefix length.
///
/// Returns `None` if `repo_len` is out of range, does not fall on a char
/// boundary, or is not followed by the `/` separator.
pub fn split_key(key: &str, repo_len: usize) -> Option<(&str, &str)> {
    if repo_len >= key.len() || !key.is_char_boundary(repo_len) {
        return None;
    }
    if key.as_bytes()[repo_len] != b'/' {
        return None;
    }
    Some((&key[..repo_len], &key[repo_len + 1..]))
}

/// Normalize a repository locator: surrounding whitespace and trailing
/// slashes are removed. Returns `None` for an empty locator.
pub fn normalize_locator(locator: &str) -> Option<&str> {
    let trimmed = locator.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Normalize a relative path to `/` separators without a leading slash.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_and_split() {
        let repo = "https://github.com/acme/widgets";
        let key = file_key(repo, "src/main.go");
        assert_eq!(key, "https://github.com/acme/widgets/src/main.go");
        assert_eq!(split_key(&key, repo.len()), Some((repo, "src/main.go")));
    }

    #[test]
    fn split_rejects_bad_prefix() {
        assert_eq!(split_key("r1/a.go", 1), None);
        assert_eq!(split_key("r1/a.go", 10), None);
        assert_eq!(split_key("r1", 2), None);
    }

    #[test]
    fn locator_normalization() {
        assert_eq!(normalize_locator(" r1/ "), Some("r1"));
        assert_eq!(normalize_locator("/srv/repo//"), Some("/srv/repo"));
        assert_eq!(normalize_locator("///"), None);
        assert_eq!(normalize_locator(""), None);
    }

    #[test]
    fn path_normalization() {
        assert_eq!(normalize_path("src\\lib.rs"), "src/lib.rs");
        assert_eq!(normalize_path("/a/b"), "a/b");
    }
}
