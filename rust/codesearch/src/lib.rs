//! `codesearch` — multi-repository regex code search over a trigram index.
//!
//! This crate is the I/O layer around `codesearch_core`:
//! - `segment` — memory-mapped segment reader and atomic publish
//! - `store`   — redb content store (file key → bytes)
//! - `source`  — repository file sources (local directories, in-memory)
//! - `ingest`  — walk, store, build and merge one repository
//! - `engine`  — the search/ingest facade
//! - `highlight` — snippet rendering
//! - `config`  — data directory and startup repositories
//!
//! ```rust,ignore
//! use codesearch::{Config, Engine, SearchRequest};
//!
//! let engine = Engine::open(Config::new("/var/lib/codesearch"))?;
//! engine.add("/src/widgets")?;
//! let result = engine.search(&SearchRequest::new(r"func \w+\(").count(20))?;
//! println!("{} files match", result.count);
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod ingest;
pub mod segment;
pub mod source;
pub mod store;

pub use codesearch_core::snippet::{SearchResult, Snippet};
pub use config::Config;
pub use engine::{Engine, IndexStats, SearchControl, SearchRequest, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use error::EngineError;
pub use ingest::IngestReport;
