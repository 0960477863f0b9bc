//! Trigram posting index for regex search over many repositories.
//!
//! Follows the design of [Google Code Search](https://swtch.com/~rsc/regexp/regexp4.html):
//! every file is decomposed into its distinct 3-byte windows, a query regex
//! is turned into a boolean trigram filter, and the filter selects a superset
//! of the matching files which is then verified against real content.
//!
//! # Architecture
//!
//! - **extract** — Trigram extraction from byte content
//! - **query** — Conservative trigram filters derived from regex syntax
//! - **posting** — Posting list operations using Roaring bitmaps
//! - **format** — Binary segment format with CRC32 integrity checks
//! - **builder** — In-memory segment construction
//! - **writer** — Serialize a segment to bytes
//! - **reader** — Validated, zero-copy view over serialized segment bytes
//! - **merge** — Combine a published segment with a new batch
//! - **error** — Error types

pub mod builder;
pub mod error;
pub mod extract;
pub mod format;
pub mod merge;
pub mod posting;
pub mod query;
pub mod reader;
pub mod writer;

pub use builder::TrigramIndexBuilder;
pub use error::TrigramError;
pub use merge::merge_segments;
pub use query::{build_trigram_query, TrigramQuery};
pub use reader::IndexView;
pub use writer::write_index;

/// A trigram: three raw bytes.
pub type Trigram = [u8; 3];
