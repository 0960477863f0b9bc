//! Trigram segment builder — accumulates files and their trigrams.

use ahash::AHashMap;
use roaring::RoaringBitmap;

use super::error::TrigramError;
use super::extract::{extract_trigrams, is_binary, MAX_CONTENT_SIZE};
use super::Trigram;
use crate::key::{file_key, split_key};

/// Entry for a file in the segment file table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub file_id: u32,
    /// `<repository>/<path>`.
    pub key: String,
    /// Byte length of the repository prefix of `key`.
    pub repo_len: u16,
}

impl FileEntry {
    /// Repository locator part of the key.
    pub fn repository(&self) -> &str {
        split_key(&self.key, self.repo_len as usize)
            .map(|(repo, _)| repo)
            .unwrap_or(&self.key)
    }

    /// Relative path part of the key.
    pub fn path(&self) -> &str {
        split_key(&self.key, self.repo_len as usize)
            .map(|(_, path)| path)
            .unwrap_or("")
    }
}

/// Builder for constructing a trigram segment in memory.
///
/// Accumulates files and their trigrams, then serializes to the binary format
/// via `writer::write_index()`. File IDs are dense and assigned in insertion
/// order.
#[derive(Debug)]
pub struct TrigramIndexBuilder {
    /// Registered files in insertion order.
    files: Vec<FileEntry>,
    /// Trigram → set of file IDs containing this trigram.
    posting_lists: AHashMap<Trigram, RoaringBitmap>,
    /// Next file ID to assign.
    next_file_id: u32,
}

impl TrigramIndexBuilder {
    /// Create a new empty builder.
    pub fn new() -> Self {
        TrigramIndexBuilder {
            files: Vec::new(),
            posting_lists: AHashMap::new(),
            next_file_id: 0,
        }
    }

    /// Add a file of `repository` at `path` to the segment.
    ///
    /// Returns the assigned file ID, or `None` if the file was skipped
    /// (binary or over the size limit). Files shorter than 3 bytes are
    /// registered but contribute no trigrams, so only a "match all" filter
    /// ever selects them.
    pub fn add_file(
        &mut self,
        repository: &str,
        path: &str,
        content: &[u8],
    ) -> Result<Option<u32>, TrigramError> {
        if content.len() > MAX_CONTENT_SIZE || is_binary(content) {
            return Ok(None);
        }

        let repo_len: u16 = repository
            .len()
            .try_into()
            .map_err(|_| TrigramError::KeyTooLong {
                len: repository.len(),
            })?;
        let file_id = self.push_file(file_key(repository, path), repo_len)?;

        for trigram in extract_trigrams(content) {
            self.posting_lists
                .entry(trigram)
                .or_default()
                .insert(file_id);
        }

        Ok(Some(file_id))
    }

    /// Register a file table entry and return its ID.
    pub(crate) fn push_file(&mut self, key: String, repo_len: u16) -> Result<u32, TrigramError> {
        if key.len() > u16::MAX as usize {
            return Err(TrigramError::KeyTooLong { len: key.len() });
        }
        let file_id = self.next_file_id;
        self.next_file_id = self
            .next_file_id
            .checked_add(1)
            .ok_or(TrigramError::FileTableFull)?;
        self.files.push(FileEntry {
            file_id,
            key,
            repo_len,
        });
        Ok(file_id)
    }

    /// Union `ids` into the posting list of `trigram`.
    pub(crate) fn union_posting(&mut self, trigram: Trigram, ids: &RoaringBitmap) {
        if ids.is_empty() {
            return;
        }
        *self.posting_lists.entry(trigram).or_default() |= ids;
    }

    /// Number of files in the segment.
    pub fn file_count(&self) -> u32 {
        self.files.len() as u32
    }

    /// Number of unique trigrams in the segment.
    pub fn trigram_count(&self) -> u32 {
        self.posting_lists.len() as u32
    }

    /// Returns true if no file has been registered.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Get the file entries (for serialization).
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    /// Posting list of one trigram, if any file contains it.
    pub fn posting(&self, trigram: &Trigram) -> Option<&RoaringBitmap> {
        self.posting_lists.get(trigram)
    }

    /// Get the posting lists (for serialization).
    /// Returns entries sorted by trigram bytes for binary search.
    pub fn sorted_posting_lists(&self) -> Vec<(Trigram, &RoaringBitmap)> {
        let mut entries: Vec<(Trigram, &RoaringBitmap)> =
            self.posting_lists.iter().map(|(k, v)| (*k, v)).collect();
        entries.sort_by_key(|(trigram, _)| *trigram);
        entries
    }
}

impl Default for TrigramIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}
