//! Segment files on disk: memory-mapped reader and atomic publish.
//!
//! There is at most one current segment per data directory. A new segment
//! is written to a temporary file in the same directory, synced, and
//! renamed over the current one. A crash before the rename leaves the
//! previous segment untouched; the leftover temporary file is removed the
//! next time the engine opens the directory.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use codesearch_core::trigram::error::TrigramError;
use codesearch_core::trigram::format::IndexHeader;
use codesearch_core::trigram::IndexView;
use memmap2::Mmap;

/// File name of the current segment inside the data directory.
pub const SEGMENT_FILE_NAME: &str = "index.trgm";

/// Prefix and suffix of in-flight segment files.
const TEMP_PREFIX: &str = ".segment-";
const TEMP_SUFFIX: &str = ".tmp";

/// Memory-mapped segment reader.
///
/// Validated once on open (header, offsets, section CRCs). Thread-safe:
/// `Send + Sync` (read-only mmap). A reader keeps its mapping alive after a
/// newer segment has been renamed over its path, so queries holding an
/// `Arc<SegmentReader>` finish against the segment they started with.
pub struct SegmentReader {
    mmap: Mmap,
    header: IndexHeader,
    path: PathBuf,
}

impl SegmentReader {
    /// Open and validate a segment file.
    pub fn open(path: &Path) -> Result<Self, TrigramError> {
        if !path.exists() {
            return Err(TrigramError::IndexNotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;

        // SAFETY: Read-only mmap. Segments are never modified in place; a
        // replacement is a rename, which leaves this mapping intact.
        let mmap = unsafe { Mmap::map(&file)? };

        let header = IndexView::parse(&mmap)?.header().clone();

        Ok(SegmentReader {
            mmap,
            header,
            path: path.to_path_buf(),
        })
    }

    /// Zero-copy view over the mapped segment.
    pub fn view(&self) -> IndexView<'_> {
        IndexView::from_parsed(&self.mmap, self.header.clone())
    }

    /// Path the segment was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of files in the segment.
    pub fn file_count(&self) -> u32 {
        self.header.file_count
    }

    /// Number of unique trigrams in the segment.
    pub fn trigram_count(&self) -> u32 {
        self.header.trigram_count
    }

    /// Segment file size in bytes.
    pub fn size(&self) -> usize {
        self.mmap.len()
    }
}

impl std::fmt::Debug for SegmentReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentReader")
            .field("path", &self.path)
            .field("file_count", &self.header.file_count)
            .field("trigram_count", &self.header.trigram_count)
            .field("size", &self.mmap.len())
            .finish()
    }
}

/// Atomically replace the segment at `target` with `bytes`.
///
/// The bytes go to a temporary file next to `target`, are synced, and the
/// file is renamed over `target`. The parent directory is synced afterwards
/// so the rename itself is durable. On any error before the rename the
/// temporary file is removed and `target` is unchanged.
pub fn publish_segment(target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;

    sync_dir(dir)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Whether `name` is an in-flight segment file left by `publish_segment`.
fn is_temp_segment(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX)
}

/// Remove leftover temporary segment files from an interrupted publish.
///
/// Returns the number of files removed. Only called while no publish is
/// running.
pub fn remove_stale_temp_files(dir: &Path) -> std::io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_temp_segment(name) && entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    Ok(removed)
}
