//! `codesearch_core` — portable core of the codesearch engine.
//!
//! Everything in this crate works on byte slices: no file I/O, no mmap,
//! no database. The I/O layer (segment files, content store, ingestion)
//! lives in the `codesearch` crate.
//!
//! Modules:
//! - `trigram` — trigram extraction, query derivation, segment format,
//!   builder, writer, byte-level reader and merge
//! - `search`  — true-match verification and hit line computation
//! - `snippet` — pagination window and per-file snippet metadata
//! - `key`     — `<repository>/<path>` file key helpers

pub mod key;
pub mod search;
pub mod snippet;
pub mod trigram;
