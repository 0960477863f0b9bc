//! Zero-copy view over serialized segment bytes.
//!
//! `IndexView` validates a segment once (header, section bounds, section
//! CRCs) and then answers file table lookups, posting list lookups and
//! filter evaluation straight from the byte slice. The I/O layer wraps it
//! around a memory map; tests wrap it around a `Vec<u8>`.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use roaring::RoaringBitmap;

use super::error::TrigramError;
use super::format::{
    read_u16, read_u32, IndexHeader, FILE_ENTRY_SIZE, HEADER_SIZE, SECTION_CRC_SIZE,
    TRIGRAM_ENTRY_SIZE, VERSION,
};
use super::posting::{intersect, union, PostingList};
use super::query::TrigramQuery;
use super::Trigram;
use crate::key::split_key;

/// A borrowed file table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRef<'a> {
    pub file_id: u32,
    pub key: &'a str,
    pub repo_len: u16,
}

impl<'a> FileRef<'a> {
    /// Repository locator part of the key.
    pub fn repository(&self) -> &'a str {
        split_key(self.key, self.repo_len as usize)
            .map(|(repo, _)| repo)
            .unwrap_or(self.key)
    }

    /// Relative path part of the key.
    pub fn path(&self) -> &'a str {
        split_key(self.key, self.repo_len as usize)
            .map(|(_, path)| path)
            .unwrap_or("")
    }
}

/// Validated, read-only view over a serialized segment.
#[derive(Debug, Clone)]
pub struct IndexView<'a> {
    data: &'a [u8],
    header: IndexHeader,
}

/// Verify a section's CRC32 checksum.
///
/// Each section is laid out as: `[data bytes][crc32 (4 bytes)]`.
fn verify_section_crc(
    data: &[u8],
    section_start: usize,
    section_end: usize,
    name: &str,
) -> Result<(), TrigramError> {
    if section_end < section_start + SECTION_CRC_SIZE || section_end > data.len() {
        return Err(TrigramError::CorruptIndex {
            reason: format!("{} section too small for CRC", name),
        });
    }
    let crc_start = section_end - SECTION_CRC_SIZE;
    let stored_crc = read_u32(data, crc_start);
    let computed_crc = crc32fast::hash(&data[section_start..crc_start]);
    if stored_crc != computed_crc {
        return Err(TrigramError::CorruptIndex {
            reason: format!(
                "{} CRC mismatch (stored={:#010x}, computed={:#010x})",
                name, stored_crc, computed_crc
            ),
        });
    }
    Ok(())
}

impl<'a> IndexView<'a> {
    /// Validate segment bytes and build a view over them.
    pub fn parse(data: &'a [u8]) -> Result<Self, TrigramError> {
        if data.len() < HEADER_SIZE {
            return Err(TrigramError::CorruptIndex {
                reason: "File too small for header".to_string(),
            });
        }

        let header = IndexHeader::from_bytes(data).ok_or(TrigramError::InvalidMagic)?;
        if header.version != VERSION {
            return Err(TrigramError::VersionMismatch {
                expected: VERSION,
                found: header.version,
            });
        }

        let len = data.len() as u64;
        if header.file_table_offset != HEADER_SIZE as u64
            || header.trigram_table_offset > len
            || header.posting_offset > len
            || header.file_table_offset > header.trigram_table_offset
            || header.trigram_table_offset > header.posting_offset
        {
            return Err(TrigramError::CorruptIndex {
                reason: "Section offset exceeds file size or offsets not ordered".to_string(),
            });
        }

        let ft_start = header.file_table_offset as usize;
        let tt_start = header.trigram_table_offset as usize;
        let ps_start = header.posting_offset as usize;

        verify_section_crc(data, ft_start, tt_start, "File table")?;
        verify_section_crc(data, tt_start, ps_start, "Trigram table")?;
        verify_section_crc(data, ps_start, data.len(), "Posting section")?;

        let entries_end = ft_start + header.file_count as usize * FILE_ENTRY_SIZE;
        let trigrams_end = tt_start + header.trigram_count as usize * TRIGRAM_ENTRY_SIZE;
        if entries_end + SECTION_CRC_SIZE > tt_start || trigrams_end + SECTION_CRC_SIZE != ps_start
        {
            return Err(TrigramError::CorruptIndex {
                reason: "Table sizes disagree with header counts".to_string(),
            });
        }

        Ok(IndexView { data, header })
    }

    /// Rebuild a view from bytes and the header an earlier `parse` of the
    /// same bytes returned, skipping the CRC pass.
    ///
    /// Used by long-lived readers that validate a memory map once on open.
    pub fn from_parsed(data: &'a [u8], header: IndexHeader) -> Self {
        IndexView { data, header }
    }

    /// Header of the viewed segment.
    pub fn header(&self) -> &IndexHeader {
        &self.header
    }

    /// Number of files in the segment.
    pub fn file_count(&self) -> u32 {
        self.header.file_count
    }

    /// Number of unique trigrams in the segment.
    pub fn trigram_count(&self) -> u32 {
        self.header.trigram_count
    }

    /// Segment size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Look up a file table entry by ID.
    pub fn file(&self, file_id: u32) -> Option<FileRef<'a>> {
        if file_id >= self.header.file_count {
            return None;
        }

        let ft_offset = self.header.file_table_offset as usize;
        let entry = ft_offset + file_id as usize * FILE_ENTRY_SIZE;
        let key_offset = read_u32(self.data, entry + 4) as usize;
        let key_len = read_u16(self.data, entry + 8) as usize;
        let repo_len = read_u16(self.data, entry + 10);

        // Key bytes are relative to the start of the file table and must stay
        // inside it (before the section CRC).
        let start = ft_offset + key_offset;
        let end = start + key_len;
        let table_end = self.header.trigram_table_offset as usize - SECTION_CRC_SIZE;
        if end > table_end {
            return None;
        }

        let key = std::str::from_utf8(&self.data[start..end]).ok()?;
        Some(FileRef {
            file_id,
            key,
            repo_len,
        })
    }

    /// Iterate over every file table entry in ID order.
    pub fn files(&self) -> impl Iterator<Item = Result<FileRef<'a>, TrigramError>> + '_ {
        (0..self.header.file_count).map(move |id| {
            self.file(id).ok_or_else(|| TrigramError::CorruptIndex {
                reason: format!("Unreadable file table entry {}", id),
            })
        })
    }

    /// Distinct repositories in the file table, sorted.
    pub fn repositories(&self) -> BTreeSet<&'a str> {
        self.files()
            .filter_map(Result::ok)
            .map(|f| f.repository())
            .collect()
    }

    /// Trigram at table position `index` plus its posting bytes.
    fn trigram_entry(&self, index: usize) -> Option<(Trigram, &'a [u8])> {
        let entry = self.header.trigram_table_offset as usize + index * TRIGRAM_ENTRY_SIZE;
        let e = &self.data[entry..entry + TRIGRAM_ENTRY_SIZE];
        let trigram = [e[0], e[1], e[2]];
        let p_offset = read_u32(e, 3) as usize;
        let p_len = read_u32(e, 7) as usize;

        let start = self.header.posting_offset as usize + p_offset;
        let end = start + p_len;
        if end > self.data.len() - SECTION_CRC_SIZE {
            return None;
        }
        Some((trigram, &self.data[start..end]))
    }

    fn decode_posting(bytes: &[u8]) -> Result<PostingList, TrigramError> {
        RoaringBitmap::deserialize_from(bytes)
            .map(PostingList::from_bitmap)
            .map_err(|e| TrigramError::CorruptIndex {
                reason: format!("Undecodable posting list: {}", e),
            })
    }

    /// Look up the posting list for a trigram using binary search.
    pub fn lookup(&self, trigram: &Trigram) -> Result<Option<PostingList>, TrigramError> {
        let mut lo = 0usize;
        let mut hi = self.header.trigram_count as usize;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let (entry_trigram, bytes) =
                self.trigram_entry(mid)
                    .ok_or_else(|| TrigramError::CorruptIndex {
                        reason: format!("Posting bounds out of range at entry {}", mid),
                    })?;

            match entry_trigram.cmp(trigram) {
                Ordering::Equal => return Self::decode_posting(bytes).map(Some),
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
            }
        }

        Ok(None)
    }

    /// Iterate over every `(trigram, posting list)` in trigram order.
    pub fn postings(
        &self,
    ) -> impl Iterator<Item = Result<(Trigram, PostingList), TrigramError>> + '_ {
        (0..self.header.trigram_count as usize).map(move |i| {
            let (trigram, bytes) =
                self.trigram_entry(i)
                    .ok_or_else(|| TrigramError::CorruptIndex {
                        reason: format!("Posting bounds out of range at entry {}", i),
                    })?;
            Ok((trigram, Self::decode_posting(bytes)?))
        })
    }

    /// Evaluate a trigram filter, returning the candidate file IDs.
    pub fn execute(&self, query: &TrigramQuery) -> Result<PostingList, TrigramError> {
        match query {
            TrigramQuery::All => Ok(PostingList::from_bitmap(
                (0..self.header.file_count).collect(),
            )),
            TrigramQuery::And(trigrams) => {
                if trigrams.is_empty() {
                    return self.execute(&TrigramQuery::All);
                }
                let mut lists = Vec::with_capacity(trigrams.len());
                for trigram in trigrams {
                    match self.lookup(trigram)? {
                        Some(pl) => lists.push(pl),
                        // Trigram not in segment → no file can match.
                        None => return Ok(PostingList::new()),
                    }
                }
                Ok(intersect(&lists))
            }
            TrigramQuery::AndAll(subs) => {
                let mut lists = Vec::with_capacity(subs.len());
                for sub in subs {
                    let pl = self.execute(sub)?;
                    if pl.is_empty() {
                        return Ok(pl);
                    }
                    lists.push(pl);
                }
                if lists.is_empty() {
                    return self.execute(&TrigramQuery::All);
                }
                Ok(intersect(&lists))
            }
            TrigramQuery::Or(subs) => {
                let lists = subs
                    .iter()
                    .map(|sub| self.execute(sub))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(union(&lists))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigram::query::build_trigram_query;
    use crate::trigram::{write_index, TrigramIndexBuilder};

    fn sample() -> Vec<u8> {
        let mut builder = TrigramIndexBuilder::new();
        builder.add_file("r1", "a.txt", b"hello world").unwrap();
        builder.add_file("r1", "b.txt", b"foo bar baz").unwrap();
        builder.add_file("https://git.example/r2", "src/c.txt", b"hello foo").unwrap();
        write_index(&builder).unwrap()
    }

    #[test]
    fn test_parse_and_file_table() {
        let bytes = sample();
        let view = IndexView::parse(&bytes).unwrap();
        assert_eq!(view.file_count(), 3);
        let c = view.file(2).unwrap();
        assert_eq!(c.key, "https://git.example/r2/src/c.txt");
        assert_eq!(c.repository(), "https://git.example/r2");
        assert_eq!(c.path(), "src/c.txt");
        assert!(view.file(3).is_none());
    }

    #[test]
    fn test_repositories() {
        let bytes = sample();
        let view = IndexView::parse(&bytes).unwrap();
        let repos: Vec<&str> = view.repositories().into_iter().collect();
        assert_eq!(repos, vec!["https://git.example/r2", "r1"]);
    }

    #[test]
    fn test_lookup() {
        let bytes = sample();
        let view = IndexView::parse(&bytes).unwrap();
        assert_eq!(view.lookup(b"hel").unwrap().unwrap().to_vec(), vec![0, 2]);
        assert!(view.lookup(b"zzz").unwrap().is_none());
    }

    #[test]
    fn test_execute_queries() {
        let bytes = sample();
        let view = IndexView::parse(&bytes).unwrap();
        let run = |p: &str| view.execute(&build_trigram_query(p)).unwrap().to_vec();
        assert_eq!(run("hello"), vec![0, 2]);
        assert_eq!(run("hello foo"), vec![2]);
        assert_eq!(run("world|baz"), vec![0, 1]);
        assert_eq!(run("missing"), Vec::<u32>::new());
        assert_eq!(run("h.*"), vec![0, 1, 2]);
    }

    #[test]
    fn test_postings_in_order() {
        let bytes = sample();
        let view = IndexView::parse(&bytes).unwrap();
        let all: Vec<_> = view.postings().collect::<Result<_, _>>().unwrap();
        assert_eq!(all.len(), view.trigram_count() as usize);
        assert!(all.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn test_corrupt_posting_section_detected() {
        let mut bytes = sample();
        let last = bytes.len() - 6;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            IndexView::parse(&bytes),
            Err(TrigramError::CorruptIndex { .. })
        ));
    }

    #[test]
    fn test_corrupt_magic_detected() {
        let mut bytes = sample();
        bytes[0] = b'X';
        assert!(matches!(
            IndexView::parse(&bytes),
            Err(TrigramError::InvalidMagic)
        ));
    }

    #[test]
    fn test_truncated_detected() {
        let bytes = sample();
        assert!(IndexView::parse(&bytes[..10]).is_err());
        assert!(IndexView::parse(&bytes[..bytes.len() - 1]).is_err());
    }
}
