//! Key Index
//!
//! The durable mapping from key to the ordered block layout that
//! reconstructs that key's value. Keys are unique byte sequences of 0–255
//! bytes; no ordering is guaranteed beyond uniqueness.
//!
//! ## Index File Format (`index.bin`)
//! ```text
//! ┌────────────────┬────────────────────────────────────────────┐
//! │ EntryCount u32 │ EntryCount × Entry                         │
//! └────────────────┴────────────────────────────────────────────┘
//! Entry:
//! ┌────────────┬─────┬────────────────┬───────────────────────┐
//! │ KeyLen u8  │ Key │ BlockCount u32 │ BlockCount × Block    │
//! └────────────┴─────┴────────────────┴───────────────────────┘
//! ```
//! Block encoding as in [`crate::block`]. All integers big-endian. The
//! single-byte key length prefix is what caps keys at 255 bytes.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::block::{read_exact_or_corrupt, read_u32_or_corrupt, write_u32, BlockDescriptor};
use crate::error::{Result, StoreError};

/// Maximum key length representable by the index format
pub const MAX_KEY_LEN: usize = 255;

/// In-memory key → layout mapping with explicit persistence
pub struct KeyIndex {
    /// Path of the persisted index file
    path: PathBuf,

    /// The live mapping; mutated freely between persist calls
    entries: HashMap<Vec<u8>, Vec<BlockDescriptor>>,
}

impl KeyIndex {
    const INDEX_FILENAME: &'static str = "index.bin";

    /// Open an index over the given working directory
    ///
    /// Loads `index.bin` if it exists, otherwise starts empty. A truncated
    /// or over-declared length prefix fails the whole load with
    /// `CorruptedIndex`; no partial recovery is attempted.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(Self::INDEX_FILENAME);

        let mut entries = HashMap::new();

        if path.exists() {
            let mut reader = BufReader::new(File::open(&path)?);

            let entry_count = read_u32_or_corrupt(&mut reader, "index entry count")?;

            for _ in 0..entry_count {
                let key = Self::read_key(&mut reader)?;

                let block_count = read_u32_or_corrupt(&mut reader, "block count")?;
                let mut layout = Vec::with_capacity(block_count as usize);
                for _ in 0..block_count {
                    layout.push(BlockDescriptor::decode_from(&mut reader)?);
                }

                entries.insert(key, layout);
            }
        }

        tracing::debug!(keys = entries.len(), "key index opened");

        Ok(Self { path, entries })
    }

    /// Insert or replace the layout mapped to `key`
    ///
    /// Fails with `KeyTooLarge` for keys the u8 length prefix cannot
    /// represent; letting one in would truncate its length at persist time
    /// and corrupt the file. Freeing a replaced layout first is the
    /// caller's responsibility.
    pub fn add(&mut self, key: Vec<u8>, layout: Vec<BlockDescriptor>) -> Result<()> {
        if key.len() > MAX_KEY_LEN {
            return Err(StoreError::KeyTooLarge(key.len()));
        }
        self.entries.insert(key, layout);
        Ok(())
    }

    /// Delete the mapping for `key`; no-op if absent
    pub fn remove(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }

    /// Look up the layout for `key`
    pub fn lookup(&self, key: &[u8]) -> Option<&Vec<BlockDescriptor>> {
        self.entries.get(key)
    }

    /// Whether `key` has a mapping
    pub fn contains(&self, key: &[u8]) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of mapped keys
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index has no mappings
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize the full mapping to `index.bin`
    ///
    /// Invoked once at store close; the matching load happens in `open`.
    pub fn persist(&self) -> Result<()> {
        let mut writer = BufWriter::new(File::create(&self.path)?);

        write_u32(&mut writer, self.entries.len() as u32)?;

        for (key, layout) in &self.entries {
            // `add` guarantees every key fits the u8 prefix
            writer.write_all(&[key.len() as u8])?;
            writer.write_all(key)?;

            write_u32(&mut writer, layout.len() as u32)?;
            for block in layout {
                block.encode_to(&mut writer)?;
            }
        }

        writer.flush()?;
        Ok(())
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Read one length-prefixed key
    fn read_key<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
        let mut len_buf = [0u8; 1];
        read_exact_or_corrupt(reader, &mut len_buf, "key length")?;

        let mut key = vec![0u8; len_buf[0] as usize];
        read_exact_or_corrupt(reader, &mut key, "key bytes")?;

        Ok(key)
    }
}
