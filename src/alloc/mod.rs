//! Block Allocator
//!
//! Owns the segment files, the free-block pool, and the monotonic segment
//! counter. Converts a value into an ordered list of block descriptors and
//! reconstructs byte ranges from descriptors.
//!
//! ## Responsibilities
//! - Place value bytes: reuse freed space first, then grow new segments
//! - Split partially consumed free blocks (no coalescing of adjacent ranges)
//! - Name new segment files deterministically from the segment counter
//! - Persist/load the counter and free pool across restarts
//!
//! ## State File Format (`value-index.bin`)
//! ```text
//! ┌──────────────────┬────────────────┬─────────────────────────┐
//! │ LastSegment u32  │ FreeCount u32  │ FreeCount × Block       │
//! └──────────────────┴────────────────┴─────────────────────────┘
//! ```
//! Block encoding as in [`crate::block`]. All integers big-endian.

mod reader;

use std::cmp::min;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::block::{read_u32_or_corrupt, write_u32, BlockDescriptor};
use crate::error::Result;

pub use reader::{BlockReader, ValueReader};

/// Allocates and reclaims block-sized ranges inside segment files
///
/// The free pool is a LIFO stack: `remove` pushes descriptors, `add` pops
/// them. Retrieval order is an implementation detail callers must not rely
/// on. Freed ranges are never merged; a partially reused range is split and
/// its remainder pushed back.
pub struct BlockAllocator {
    /// Working directory holding segment files and the state file
    data_dir: PathBuf,

    /// Upper bound on the size of a newly created segment file
    segment_size: u32,

    /// Number of the next segment file to create ("data<N>")
    next_segment: u32,

    /// Reclaimed, currently-unused byte ranges (LIFO, unmerged)
    free_pool: Vec<BlockDescriptor>,
}

impl BlockAllocator {
    // =========================================================================
    // Internal Path Constants
    // =========================================================================
    const STATE_FILENAME: &'static str = "value-index.bin";
    const SEGMENT_PREFIX: &'static str = "data";

    /// Open an allocator over the given working directory
    ///
    /// Loads the segment counter and free pool from `value-index.bin` if it
    /// exists, otherwise starts with an empty pool and counter 0.
    pub fn open(data_dir: &Path, segment_size: u32) -> Result<Self> {
        let state_path = data_dir.join(Self::STATE_FILENAME);

        let (next_segment, free_pool) = if state_path.exists() {
            let mut reader = BufReader::new(File::open(&state_path)?);

            let next_segment = read_u32_or_corrupt(&mut reader, "segment counter")?;
            let free_count = read_u32_or_corrupt(&mut reader, "free block count")?;

            let mut free_pool = Vec::with_capacity(free_count as usize);
            for _ in 0..free_count {
                free_pool.push(BlockDescriptor::decode_from(&mut reader)?);
            }

            (next_segment, free_pool)
        } else {
            (0, Vec::new())
        };

        tracing::debug!(
            next_segment,
            free_blocks = free_pool.len(),
            "block allocator opened"
        );

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            segment_size,
            next_segment,
            free_pool,
        })
    }

    /// Write `value` into storage and return its layout
    ///
    /// Placement policy:
    /// 1. Pop free blocks and fill them with `min(remaining, block.size)`
    ///    bytes each, pushing back the unused remainder of a split block.
    /// 2. Once the pool is exhausted (or not needed), create new segment
    ///    files of at most `segment_size` bytes each until all bytes are
    ///    written. The last segment for a value may be shorter.
    ///
    /// The returned descriptor order is the reconstruction order. On I/O
    /// failure, blocks already written to disk are not rolled back.
    pub fn add(&mut self, value: &[u8]) -> Result<Vec<BlockDescriptor>> {
        let mut blocks = Vec::new();
        let mut written = 0usize;

        // Phase 1: reuse freed ranges
        while written < value.len() {
            let Some(free) = self.free_pool.pop() else {
                break;
            };

            let to_write = min(value.len() - written, free.size as usize);

            let mut file = OpenOptions::new()
                .write(true)
                .open(self.resolve(&free.file_name))?;
            file.seek(SeekFrom::Start(free.offset as u64))?;
            file.write_all(&value[written..written + to_write])?;

            blocks.push(BlockDescriptor::new(
                free.file_name.clone(),
                free.offset,
                to_write as u32,
            ));

            // Split: return the unused tail of the free block to the pool
            if free.size as usize > to_write {
                tracing::trace!(
                    file = %free.file_name,
                    offset = free.offset + to_write as u32,
                    size = free.size - to_write as u32,
                    "free block split"
                );
                self.free_pool.push(BlockDescriptor::new(
                    free.file_name,
                    free.offset + to_write as u32,
                    free.size - to_write as u32,
                ));
            }

            written += to_write;
        }

        // Phase 2: grow new segment files
        while written < value.len() {
            let name = format!("{}{}", Self::SEGMENT_PREFIX, self.next_segment);
            self.next_segment += 1;

            let to_write = min(value.len() - written, self.segment_size as usize);

            let mut file = File::create(self.resolve(&name))?;
            file.write_all(&value[written..written + to_write])?;

            tracing::trace!(file = %name, size = to_write, "segment file created");

            blocks.push(BlockDescriptor::new(name, 0, to_write as u32));
            written += to_write;
        }

        Ok(blocks)
    }

    /// Open a lazy reader over one block's byte range
    pub fn open_block_stream(&self, block: &BlockDescriptor) -> Result<BlockReader> {
        BlockReader::open(&self.data_dir, block)
    }

    /// Return every descriptor in `layout` to the free pool
    ///
    /// Adjacent freed ranges stay separate entries; segment files are never
    /// truncated even when all of their blocks become free. The bytes on
    /// disk are left untouched.
    pub fn remove(&mut self, layout: Vec<BlockDescriptor>) {
        self.free_pool.extend(layout);
    }

    /// Serialize the segment counter and free pool to `value-index.bin`
    ///
    /// Invoked once at store close; the matching load happens in `open`.
    pub fn persist(&self) -> Result<()> {
        let state_path = self.data_dir.join(Self::STATE_FILENAME);
        let mut writer = BufWriter::new(File::create(state_path)?);

        write_u32(&mut writer, self.next_segment)?;
        write_u32(&mut writer, self.free_pool.len() as u32)?;
        for block in &self.free_pool {
            block.encode_to(&mut writer)?;
        }

        writer.flush()?;
        Ok(())
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Number of entries currently in the free pool
    pub fn free_block_count(&self) -> usize {
        self.free_pool.len()
    }

    /// Total bytes currently held in the free pool
    pub fn free_bytes(&self) -> u64 {
        self.free_pool.iter().map(|b| b.size as u64).sum()
    }

    /// The number the next created segment file will be named from
    pub fn next_segment_id(&self) -> u32 {
        self.next_segment
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Resolve a stored relative segment file name against the working dir
    fn resolve(&self, file_name: &str) -> PathBuf {
        self.data_dir.join(file_name)
    }
}
