//! Store Facade
//!
//! Composes the `KeyIndex` and `BlockAllocator` into the public key-value
//! API and owns the open → closed lifecycle.
//!
//! ## Responsibilities
//! - Validate configuration and load persisted state on open
//! - Route reads through the index to lazy block streams
//! - Order upsert/delete so freed space is reusable immediately
//! - Persist index and allocator state on close
//!
//! ## Lifecycle
//! `Open → Closed`, terminal. Every operation on a closed store fails with
//! `StoreError::Closed`. Calling `close` again on an already-closed store
//! is a no-op returning `Ok(())` — state was already persisted and nothing
//! has mutated since.

use std::io::Read;
use std::path::Path;

use crate::alloc::{BlockAllocator, ValueReader};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::index::{KeyIndex, MAX_KEY_LEN};

/// A disk-resident key-value store over one working directory
///
/// Single-threaded, blocking I/O. One open instance owns the index, free
/// pool, and segment counter exclusively; pointing two instances at the
/// same directory corrupts their metadata (no file locking is performed).
pub struct Store {
    /// Engine configuration
    config: Config,

    /// Durable key → layout mapping
    index: KeyIndex,

    /// Segment files, free pool, segment counter
    alloc: BlockAllocator,

    /// Set once by `close`; gates every operation
    closed: bool,
}

impl Store {
    /// Open a store with the given config
    ///
    /// Validates that the working directory exists and is a directory and
    /// that the segment size is positive, then loads the persisted index
    /// and allocator state if present.
    pub fn open(config: Config) -> Result<Self> {
        if !config.data_dir.is_dir() {
            return Err(StoreError::Config(format!(
                "working directory {} does not exist or is not a directory",
                config.data_dir.display()
            )));
        }

        if config.segment_size == 0 {
            return Err(StoreError::Config(
                "segment size must be positive".to_string(),
            ));
        }

        let index = KeyIndex::open(&config.data_dir)?;
        let alloc = BlockAllocator::open(&config.data_dir, config.segment_size)?;

        tracing::debug!(
            dir = %config.data_dir.display(),
            segment_size = config.segment_size,
            keys = index.len(),
            "store opened"
        );

        Ok(Self {
            config,
            index,
            alloc,
            closed: false,
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified working directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Whether `key` has a stored value
    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        self.check_open()?;
        Ok(self.index.contains(key))
    }

    /// Open a lazy byte stream over the value stored for `key`
    ///
    /// The stream concatenates the key's blocks in layout order, opening
    /// one segment file at a time; its total length equals the stored
    /// value's length. Fails with `KeyNotFound` if the key is absent.
    pub fn open_value_stream(&self, key: &[u8]) -> Result<ValueReader> {
        self.check_open()?;

        let layout = self.index.lookup(key).ok_or(StoreError::KeyNotFound)?;

        Ok(ValueReader::new(
            self.config.data_dir.clone(),
            layout.clone(),
        ))
    }

    /// Load the full value stored for `key`
    pub fn load_value(&self, key: &[u8]) -> Result<Vec<u8>> {
        let mut stream = self.open_value_stream(key)?;
        let mut value = Vec::new();
        stream.read_to_end(&mut value)?;
        Ok(value)
    }

    /// Store `value` under `key`, replacing any previous value (upsert)
    ///
    /// Steps:
    /// 1. Free the old layout and drop the old mapping, if any
    /// 2. Write the new value (may reuse the space just vacated)
    /// 3. Install the new mapping
    ///
    /// The old value is unrecoverable from the moment step 1 completes: if
    /// step 2 fails partway, the key is left unmapped and already-written
    /// blocks are not rolled back. This ordering is what makes immediate
    /// space reuse possible and is a known correctness gap, not an
    /// oversight.
    pub fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.check_open()?;

        if key.len() > MAX_KEY_LEN {
            return Err(StoreError::KeyTooLarge(key.len()));
        }

        if let Some(old_layout) = self.index.lookup(key) {
            let old_layout = old_layout.clone();
            self.alloc.remove(old_layout);
            self.index.remove(key);
        }

        let layout = self.alloc.add(value)?;
        tracing::trace!(key_len = key.len(), blocks = layout.len(), "value stored");
        self.index.add(key.to_vec(), layout)?;

        Ok(())
    }

    /// Delete the value stored for `key`
    ///
    /// Returns true and frees the value's blocks if the key was present;
    /// returns false without mutating anything otherwise.
    pub fn delete(&mut self, key: &[u8]) -> Result<bool> {
        self.check_open()?;

        let Some(layout) = self.index.lookup(key) else {
            return Ok(false);
        };

        let layout = layout.clone();
        self.alloc.remove(layout);
        self.index.remove(key);

        Ok(true)
    }

    /// Persist the index and allocator state, then transition to Closed
    ///
    /// Persistence happens only here — there is no incremental persistence
    /// between open and close. Idempotent: a second call is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.index.persist()?;
        self.alloc.persist()?;
        self.closed = true;

        tracing::debug!(keys = self.index.len(), "store closed");

        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether the store has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Number of keys currently mapped
    pub fn key_count(&self) -> usize {
        self.index.len()
    }

    /// Number of entries in the free pool
    pub fn free_block_count(&self) -> usize {
        self.alloc.free_block_count()
    }

    /// Total bytes reclaimable from the free pool
    pub fn free_bytes(&self) -> u64 {
        self.alloc.free_bytes()
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Fail with `Closed` once `close` has run
    fn check_open(&self) -> Result<()> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }
}
