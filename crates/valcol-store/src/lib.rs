//! SQL-backed persistence for stale ledger validations.
//!
//! This crate provides a minimal storage abstraction and a SQLite
//! implementation for archiving validations that have aged out of the
//! in-memory collection.
//!
//! # Design Notes
//!
//! The storage layer is intentionally minimal and write-oriented:
//! - One table, `LedgerValidations`, no indexes or uniqueness constraints
//! - One transaction per batch; a batch either lands fully or not at all
//! - The collection never reads validations back; rows are archival
//!
//! ## Persisted Format
//!
//! `LedgerValidations(LedgerHash TEXT, NodePubKey TEXT, Flags INT,
//! CloseTime INT, Signature BLOB)`:
//!
//! - `LedgerHash`: lowercase hex of the 32-byte ledger hash
//! - `NodePubKey`: the signer's canonical human-readable encoding
//! - `Signature`: raw signature bytes, bound as a BLOB parameter
//!
//! Parameter binding is used throughout; no SQL text is assembled from row
//! values.

use std::fmt;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection};

use valcol_types::{LedgerHash, NodePublicKey};

// ============================================================================
// ValidationRow
// ============================================================================

/// The persisted shape of a single validation.
///
/// This is the storage-layer view: just the columns of `LedgerValidations`,
/// with no trust or currency state. The core layer converts its in-memory
/// validations into rows when batching them for the writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationRow {
    /// Hash of the ledger this validation attests to.
    pub ledger_hash: LedgerHash,
    /// The signer's public key.
    pub node_public: NodePublicKey,
    /// Raw validation flags.
    pub flags: u32,
    /// Consensus close time, seconds.
    pub close_time: u32,
    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

// ============================================================================
// StoreError
// ============================================================================

/// Error type for store operations.
///
/// This is a non-leaky error type that abstracts away SQLite-specific
/// details.
#[derive(Debug)]
pub enum StoreError {
    /// I/O or database error.
    Io(String),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Io(msg) => write!(f, "store I/O error: {}", msg),
            StoreError::Other(msg) => write!(f, "store error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Io(err.to_string())
    }
}

// ============================================================================
// ValidationStore trait
// ============================================================================

/// Minimal storage trait for validation persistence.
///
/// Implementations must be safe to call from the writer thread while other
/// threads keep ingesting; the caller guarantees at most one in-flight
/// `write_batch` at a time.
pub trait ValidationStore: Send + Sync {
    /// Persist a batch of validations atomically.
    ///
    /// Either every row in the batch is stored or none is. Rows within a
    /// batch are stored in the order given.
    fn write_batch(&self, rows: &[ValidationRow]) -> Result<(), StoreError>;
}

// ============================================================================
// SqliteValidationStore
// ============================================================================

/// SQLite-backed implementation of [`ValidationStore`].
///
/// The connection is guarded by a mutex; the collection's writer thread is
/// the only batch producer, so contention is not a concern here.
pub struct SqliteValidationStore {
    conn: Mutex<Connection>,
}

impl fmt::Debug for SqliteValidationStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteValidationStore").finish_non_exhaustive()
    }
}

impl SqliteValidationStore {
    /// Open or create the database at the given path.
    ///
    /// Creates the `LedgerValidations` table if it does not exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a private in-memory database. Useful for tests and tooling.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS LedgerValidations (
                LedgerHash  TEXT,
                NodePubKey  TEXT,
                Flags       INT,
                CloseTime   INT,
                Signature   BLOB
            );",
            [],
        )?;
        Ok(SqliteValidationStore {
            conn: Mutex::new(conn),
        })
    }

    /// Number of rows currently in `LedgerValidations`.
    pub fn row_count(&self) -> Result<u64, StoreError> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM LedgerValidations;", [], |row| {
                row.get(0)
            })?;
        Ok(count as u64)
    }
}

impl ValidationStore for SqliteValidationStore {
    fn write_batch(&self, rows: &[ValidationRow]) -> Result<(), StoreError> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO LedgerValidations \
                 (LedgerHash, NodePubKey, Flags, CloseTime, Signature) \
                 VALUES (?1, ?2, ?3, ?4, ?5);",
            )?;
            for row in rows {
                stmt.execute(params![
                    row.ledger_hash.to_hex(),
                    row.node_public.human(),
                    row.flags,
                    row.close_time,
                    row.signature,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

// ============================================================================
// MemoryValidationStore (for testing)
// ============================================================================

use std::sync::RwLock;

/// In-memory implementation of [`ValidationStore`] for testing.
///
/// Stores every batch in arrival order and is useful for unit tests that
/// don't need actual disk persistence.
#[derive(Debug, Default)]
pub struct MemoryValidationStore {
    rows: RwLock<Vec<ValidationRow>>,
    batches: RwLock<Vec<usize>>,
}

impl MemoryValidationStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored row, in insertion order.
    pub fn rows(&self) -> Vec<ValidationRow> {
        self.rows.read().expect("store lock poisoned").clone()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.read().expect("store lock poisoned").len()
    }

    /// Returns true if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sizes of the batches received so far, in arrival order.
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.read().expect("store lock poisoned").clone()
    }
}

impl ValidationStore for MemoryValidationStore {
    fn write_batch(&self, rows: &[ValidationRow]) -> Result<(), StoreError> {
        let mut stored = self
            .rows
            .write()
            .map_err(|e| StoreError::Other(format!("lock poisoned: {}", e)))?;
        stored.extend_from_slice(rows);
        self.batches
            .write()
            .map_err(|e| StoreError::Other(format!("lock poisoned: {}", e)))?
            .push(rows.len());
        Ok(())
    }
}

// ============================================================================
// Test helpers
// ============================================================================

/// A store that fails every batch, for testing the writer's failure path.
#[derive(Debug, Default)]
pub struct FailingValidationStore;

impl ValidationStore for FailingValidationStore {
    fn write_batch(&self, _rows: &[ValidationRow]) -> Result<(), StoreError> {
        Err(StoreError::Io("injected write failure".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(seed: u8) -> ValidationRow {
        ValidationRow {
            ledger_hash: LedgerHash::new([seed; 32]),
            node_public: NodePublicKey::new(vec![seed, seed + 1]),
            flags: 1,
            close_time: 100 + seed as u32,
            signature: vec![9, 9, seed],
        }
    }

    #[test]
    fn sqlite_write_batch_and_count() {
        let store = SqliteValidationStore::open_in_memory().unwrap();
        assert_eq!(store.row_count().unwrap(), 0);

        store.write_batch(&[make_row(1), make_row(2)]).unwrap();
        assert_eq!(store.row_count().unwrap(), 2);

        store.write_batch(&[make_row(3)]).unwrap();
        assert_eq!(store.row_count().unwrap(), 3);
    }

    #[test]
    fn sqlite_persists_expected_columns() {
        let store = SqliteValidationStore::open_in_memory().unwrap();
        let row = make_row(0xab);
        store.write_batch(&[row.clone()]).unwrap();

        let conn = store.conn.lock();
        let (hash, pubkey, flags, close, sig): (String, String, u32, u32, Vec<u8>) = conn
            .query_row(
                "SELECT LedgerHash, NodePubKey, Flags, CloseTime, Signature \
                 FROM LedgerValidations;",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
            )
            .unwrap();

        assert_eq!(hash, row.ledger_hash.to_hex());
        assert_eq!(hash, hash.to_lowercase());
        assert_eq!(pubkey, row.node_public.human());
        assert_eq!(flags, row.flags);
        assert_eq!(close, row.close_time);
        assert_eq!(sig, row.signature);
    }

    #[test]
    fn sqlite_empty_batch_is_a_noop() {
        let store = SqliteValidationStore::open_in_memory().unwrap();
        store.write_batch(&[]).unwrap();
        assert_eq!(store.row_count().unwrap(), 0);
    }

    #[test]
    fn memory_store_tracks_batches() {
        let store = MemoryValidationStore::new();
        assert!(store.is_empty());

        store.write_batch(&[make_row(1), make_row(2)]).unwrap();
        store.write_batch(&[make_row(3)]).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.batch_sizes(), vec![2, 1]);
        assert_eq!(store.rows()[2], make_row(3));
    }

    #[test]
    fn failing_store_always_errors() {
        let store = FailingValidationStore;
        let err = store.write_batch(&[make_row(1)]).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
