//! Trigram segment writer — serializes a built segment to bytes.
//!
//! No file I/O here; publishing the bytes is the caller's job.

use super::builder::TrigramIndexBuilder;
use super::error::TrigramError;
use super::format::{
    IndexHeader, FILE_ENTRY_SIZE, HEADER_SIZE, SECTION_CRC_SIZE, TRIGRAM_ENTRY_SIZE, VERSION,
};

/// Serialize a built trigram segment to bytes.
///
/// Returns the complete segment file content as a `Vec<u8>`.
pub fn write_index(builder: &TrigramIndexBuilder) -> Result<Vec<u8>, TrigramError> {
    let files = builder.files();
    let sorted_postings = builder.sorted_posting_lists();

    // Phase 1: Compute sizes for all sections.

    let key_bytes_total: usize = files.iter().map(|f| f.key.len()).sum();
    let file_table_size = files.len() * FILE_ENTRY_SIZE + key_bytes_total + SECTION_CRC_SIZE;
    let trigram_table_size = sorted_postings.len() * TRIGRAM_ENTRY_SIZE + SECTION_CRC_SIZE;

    let mut serialized_postings: Vec<Vec<u8>> = Vec::with_capacity(sorted_postings.len());
    let mut posting_data_size: usize = 0;
    for (_, bitmap) in &sorted_postings {
        let mut buf = Vec::with_capacity(bitmap.serialized_size());
        bitmap
            .serialize_into(&mut buf)
            .map_err(|e| TrigramError::CorruptIndex {
                reason: format!("Failed to serialize posting list: {}", e),
            })?;
        posting_data_size += buf.len();
        serialized_postings.push(buf);
    }
    let posting_section_size = posting_data_size + SECTION_CRC_SIZE;

    if files.len() * FILE_ENTRY_SIZE + key_bytes_total > u32::MAX as usize
        || posting_data_size > u32::MAX as usize
    {
        return Err(TrigramError::CorruptIndex {
            reason: "Segment sections exceed 4 GiB".to_string(),
        });
    }

    // Phase 2: Compute offsets.
    let file_table_offset = HEADER_SIZE as u64;
    let trigram_table_offset = file_table_offset + file_table_size as u64;
    let posting_offset = trigram_table_offset + trigram_table_size as u64;
    let total_size = HEADER_SIZE + file_table_size + trigram_table_size + posting_section_size;

    let mut output = Vec::with_capacity(total_size);

    // Phase 3: Header.
    let header = IndexHeader {
        version: VERSION,
        flags: 0,
        file_count: builder.file_count(),
        trigram_count: builder.trigram_count(),
        file_table_offset,
        trigram_table_offset,
        posting_offset,
    };
    output.extend_from_slice(&header.to_bytes());

    // Phase 4: File table. Key offsets are relative to the table start.
    let file_table_start = output.len();
    let mut key_offset = (files.len() * FILE_ENTRY_SIZE) as u32;
    let mut all_keys = Vec::with_capacity(key_bytes_total);
    for f in files {
        let key_len: u16 = f
            .key
            .len()
            .try_into()
            .map_err(|_| TrigramError::KeyTooLong { len: f.key.len() })?;
        output.extend_from_slice(&f.file_id.to_le_bytes());
        output.extend_from_slice(&key_offset.to_le_bytes());
        output.extend_from_slice(&key_len.to_le_bytes());
        output.extend_from_slice(&f.repo_len.to_le_bytes());
        all_keys.extend_from_slice(f.key.as_bytes());
        key_offset += key_len as u32;
    }
    output.extend_from_slice(&all_keys);
    let file_table_crc = crc32fast::hash(&output[file_table_start..]);
    output.extend_from_slice(&file_table_crc.to_le_bytes());

    // Phase 5: Trigram table, sorted for binary search.
    let trigram_table_start = output.len();
    let mut current_posting_offset: u32 = 0;
    for ((trigram, _), serialized) in sorted_postings.iter().zip(&serialized_postings) {
        let posting_len = serialized.len() as u32;
        output.extend_from_slice(trigram);
        output.extend_from_slice(&current_posting_offset.to_le_bytes());
        output.extend_from_slice(&posting_len.to_le_bytes());
        current_posting_offset += posting_len;
    }
    let trigram_table_crc = crc32fast::hash(&output[trigram_table_start..]);
    output.extend_from_slice(&trigram_table_crc.to_le_bytes());

    // Phase 6: Posting lists.
    let posting_start = output.len();
    for serialized in &serialized_postings {
        output.extend_from_slice(serialized);
    }
    let posting_crc = crc32fast::hash(&output[posting_start..]);
    output.extend_from_slice(&posting_crc.to_le_bytes());

    debug_assert_eq!(output.len(), total_size);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_empty_index() {
        let builder = TrigramIndexBuilder::new();
        let bytes = write_index(&builder).expect("Should serialize empty index");
        // Header + three section CRCs.
        assert_eq!(bytes.len(), HEADER_SIZE + 3 * SECTION_CRC_SIZE);
        assert_eq!(&bytes[0..4], b"TRGM");
    }

    #[test]
    fn test_write_preserves_header() {
        let mut builder = TrigramIndexBuilder::new();
        for i in 0..10 {
            builder
                .add_file(
                    "r1",
                    &format!("file_{}.txt", i),
                    format!("content of file {}", i).as_bytes(),
                )
                .unwrap();
        }
        let bytes = write_index(&builder).expect("Should serialize");

        let header = IndexHeader::from_bytes(&bytes).expect("Should parse header");
        assert_eq!(header.version, VERSION);
        assert_eq!(header.file_count, 10);
        assert_eq!(header.trigram_count, builder.trigram_count());
        assert_eq!(header.file_table_offset, HEADER_SIZE as u64);
        assert!(header.trigram_table_offset > header.file_table_offset);
        assert!(header.posting_offset > header.trigram_table_offset);
    }
}
