//! Trigram extraction from byte content.

use ahash::AHashSet;

use super::Trigram;

/// Ratio of null bytes above which a file is considered binary.
const BINARY_NULL_RATIO: f64 = 0.10;

/// Maximum content size for trigram extraction (1 GB).
pub const MAX_CONTENT_SIZE: usize = 1024 * 1024 * 1024;

/// Bytes sampled by the binary check.
const BINARY_SAMPLE: usize = 8192;

/// Extract the distinct trigrams of a file's content, sorted.
///
/// Returns an empty Vec for:
/// - Content shorter than 3 bytes
/// - Binary content (high null-byte ratio)
/// - Content exceeding 1 GB
pub fn extract_trigrams(content: &[u8]) -> Vec<Trigram> {
    if content.len() > MAX_CONTENT_SIZE || is_binary(content) {
        return Vec::new();
    }
    literal_trigrams(content)
}

/// Distinct trigrams of a byte string, sorted, with no content filtering.
///
/// Used for query literals, where every byte is significant.
pub fn literal_trigrams(bytes: &[u8]) -> Vec<Trigram> {
    if bytes.len() < 3 {
        return Vec::new();
    }

    let mut seen = AHashSet::new();
    for window in bytes.windows(3) {
        seen.insert([window[0], window[1], window[2]]);
    }

    let mut trigrams: Vec<Trigram> = seen.into_iter().collect();
    trigrams.sort_unstable();
    trigrams
}

/// Check if content appears to be binary (high null-byte ratio).
pub fn is_binary(content: &[u8]) -> bool {
    if content.is_empty() {
        return false;
    }
    let sample = &content[..content.len().min(BINARY_SAMPLE)];
    let null_count = sample.iter().filter(|&&b| b == 0).count();
    (null_count as f64 / sample.len() as f64) > BINARY_NULL_RATIO
}
