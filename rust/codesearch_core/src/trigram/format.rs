//! Binary format constants and header for a trigram segment.
//!
//! Layout:
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Header (48 bytes)                           │
//! │  magic: [u8; 4] = "TRGM"                    │
//! │  version: u32 = 2                           │
//! │  flags: u32                                 │
//! │  file_count: u32                            │
//! │  trigram_count: u32                         │
//! │  file_table_offset: u64                     │
//! │  trigram_table_offset: u64                  │
//! │  posting_offset: u64                        │
//! │  header_crc32: u32                          │
//! ├─────────────────────────────────────────────┤
//! │ File Table                                  │
//! │  entries + key bytes + section_crc32        │
//! ├─────────────────────────────────────────────┤
//! │ Trigram Table                               │
//! │  sorted trigram entries + section_crc32     │
//! ├─────────────────────────────────────────────┤
//! │ Posting Lists                               │
//! │  Roaring bitmap serialized + section_crc32  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Version 2 added `repo_len` to the file table entry so that a key can be
//! split back into `(repository, path)` without parsing the locator.

/// Magic bytes identifying a trigram segment file.
pub const MAGIC: [u8; 4] = *b"TRGM";

/// Current format version.
pub const VERSION: u32 = 2;

/// Header size in bytes (fixed).
pub const HEADER_SIZE: usize = 48;

/// File table entry: file_id (u32) + key_offset (u32) + key_len (u16) + repo_len (u16) = 12 bytes.
pub const FILE_ENTRY_SIZE: usize = 12;

/// Trigram table entry: trigram (3 bytes) + posting_offset (u32) + posting_len (u32) = 11 bytes.
pub const TRIGRAM_ENTRY_SIZE: usize = 11;

/// Size of the CRC32 trailer on every section.
pub const SECTION_CRC_SIZE: usize = 4;

/// Segment header parsed from bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHeader {
    pub version: u32,
    pub flags: u32,
    pub file_count: u32,
    pub trigram_count: u32,
    pub file_table_offset: u64,
    pub trigram_table_offset: u64,
    pub posting_offset: u64,
}

impl IndexHeader {
    /// Serialize header to bytes (48 bytes, little-endian).
    /// CRC32 is computed over the first 44 bytes and appended as bytes 44-47.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[0..4].copy_from_slice(&MAGIC);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.flags.to_le_bytes());
        buf[12..16].copy_from_slice(&self.file_count.to_le_bytes());
        buf[16..20].copy_from_slice(&self.trigram_count.to_le_bytes());
        buf[20..28].copy_from_slice(&self.file_table_offset.to_le_bytes());
        buf[28..36].copy_from_slice(&self.trigram_table_offset.to_le_bytes());
        buf[36..44].copy_from_slice(&self.posting_offset.to_le_bytes());
        let crc = crc32fast::hash(&buf[..44]);
        buf[44..48].copy_from_slice(&crc.to_le_bytes());
        buf
    }

    /// Parse header from bytes. Returns None on short input, bad magic or
    /// checksum mismatch. The version is returned as-is for the caller to check.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_SIZE || data[0..4] != MAGIC {
            return None;
        }

        let stored_crc = read_u32(data, 44);
        if stored_crc != crc32fast::hash(&data[..44]) {
            return None;
        }

        Some(IndexHeader {
            version: read_u32(data, 4),
            flags: read_u32(data, 8),
            file_count: read_u32(data, 12),
            trigram_count: read_u32(data, 16),
            file_table_offset: read_u64(data, 20),
            trigram_table_offset: read_u64(data, 28),
            posting_offset: read_u64(data, 36),
        })
    }
}

/// Read a little-endian u16 at `at`. Caller guarantees bounds.
pub(crate) fn read_u16(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

/// Read a little-endian u32 at `at`. Caller guarantees bounds.
pub(crate) fn read_u32(data: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

/// Read a little-endian u64 at `at`. Caller guarantees bounds.
pub(crate) fn read_u64(data: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[at..at + 8]);
    u64::from_le_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(file_count: u32) -> IndexHeader {
        IndexHeader {
            version: VERSION,
            flags: 0,
            file_count,
            trigram_count: 5000,
            file_table_offset: 48,
            trigram_table_offset: 1234,
            posting_offset: 5678,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let bytes = header(100).to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], &MAGIC);

        let parsed = IndexHeader::from_bytes(&bytes).expect("Should parse valid header");
        assert_eq!(parsed, header(100));
    }

    #[test]
    fn test_header_invalid_magic() {
        let mut bytes = header(0).to_bytes();
        bytes[0] = b'X';
        assert!(IndexHeader::from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_header_corrupt_crc() {
        let mut bytes = header(42).to_bytes();
        bytes[44] ^= 0xFF;
        assert!(IndexHeader::from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_header_corrupt_body() {
        let mut bytes = header(42).to_bytes();
        bytes[12] ^= 0x01;
        assert!(IndexHeader::from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_header_too_short() {
        assert!(IndexHeader::from_bytes(&[0u8; 10]).is_none());
    }
}
