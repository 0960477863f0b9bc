#![allow(clippy::result_large_err)]
//! Content store: file key → raw bytes, backed by redb.
//!
//! Every indexed file id resolves to a key, and every key resolves here to
//! the bytes used for match verification and snippet rendering. Values are
//! overwritten on re-ingestion; nothing is ever deleted.
//!
//! # Example
//!
//! ```rust,ignore
//! use codesearch::store::ContentStore;
//!
//! let store = ContentStore::open("/tmp/files.redb").unwrap();
//!
//! let mut batch = store.batch().unwrap();
//! batch.put("r1/a.go", b"func Foo() {}").unwrap();
//! batch.put("r1/b.go", b"func Bar() {}").unwrap();
//! batch.commit().unwrap();
//!
//! assert_eq!(store.get("r1/a.go").unwrap(), b"func Foo() {}");
//! ```

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTableMetadata, TableDefinition, WriteTransaction};
use thiserror::Error;

/// Single table holding every file's content.
const FILES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

/// Errors that can occur during content store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("redb database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("redb table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("redb transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("redb commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("redb storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("file not found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Durable key → bytes store shared by ingestion and search.
///
/// Cheap to clone. Reads run concurrently under redb's MVCC; writers are
/// serialized by redb.
#[derive(Clone)]
pub struct ContentStore {
    db: Arc<Database>,
}

impl ContentStore {
    /// Open or create the store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Database::create(path)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Open a store backed by a temporary file (for testing).
    pub fn open_temporary() -> Result<Self> {
        let tmpfile = tempfile::NamedTempFile::new()
            .map_err(|e| StoreError::Storage(redb::StorageError::Io(e)))?;
        let db = Database::create(tmpfile.path())?;
        // redb owns the file handle; the OS reclaims the file at exit.
        std::mem::forget(tmpfile);
        Ok(Self { db: Arc::new(db) })
    }

    /// Fetch the content stored under `key`.
    pub fn get(&self, key: &str) -> Result<Vec<u8>> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(FILES_TABLE) {
            Ok(table) => table,
            Err(redb::TableError::TableDoesNotExist(_)) => {
                return Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        match table.get(key)? {
            Some(value) => Ok(value.value().to_vec()),
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    /// Store `content` under `key` in its own transaction, replacing any
    /// prior value.
    pub fn put(&self, key: &str, content: &[u8]) -> Result<()> {
        let mut batch = self.batch()?;
        batch.put(key, content)?;
        batch.commit()
    }

    /// Start a batch whose writes become durable together on `commit`.
    ///
    /// The batch holds redb's write transaction, so other writers wait
    /// until it is committed or dropped. Readers are not blocked.
    pub fn batch(&self) -> Result<ContentBatch> {
        Ok(ContentBatch {
            txn: self.db.begin_write()?,
            len: 0,
        })
    }

    /// Number of stored files.
    pub fn len(&self) -> Result<u64> {
        let read_txn = self.db.begin_read()?;
        match read_txn.open_table(FILES_TABLE) {
            Ok(table) => Ok(table.len()?),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Check if the store holds no files.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Writes for one ingestion, applied in a single write transaction.
///
/// Each `put` goes straight into the open transaction; nothing becomes
/// visible until `commit`. Dropping a batch without committing aborts it.
pub struct ContentBatch {
    txn: WriteTransaction,
    len: usize,
}

impl ContentBatch {
    /// Write `content` under `key`. A later put of the same key wins.
    pub fn put(&mut self, key: &str, content: &[u8]) -> Result<()> {
        {
            let mut table = self.txn.open_table(FILES_TABLE)?;
            table.insert(key, content)?;
        }
        self.len += 1;
        Ok(())
    }

    /// Number of puts so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Make every write of the batch durable at once.
    pub fn commit(self) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }
}
