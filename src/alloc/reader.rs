//! Block and value readers
//!
//! Lazy, finite, forward-only byte streams over stored blocks. A
//! `BlockReader` yields exactly one block's bytes; a `ValueReader` chains
//! block readers in layout order, opening each segment file only when the
//! previous block is exhausted. Neither is restartable.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::block::BlockDescriptor;
use crate::error::Result;

/// Reads exactly one block's byte range from its segment file
///
/// The file handle is released as soon as the range is exhausted, not only
/// when the reader is dropped.
pub struct BlockReader {
    file: Option<File>,
    remaining: u64,
}

impl BlockReader {
    /// Open the block's segment file and position at its offset
    pub(crate) fn open(data_dir: &Path, block: &BlockDescriptor) -> Result<Self> {
        let mut file = File::open(data_dir.join(&block.file_name))?;
        file.seek(SeekFrom::Start(block.offset as u64))?;

        Ok(Self {
            file: Some(file),
            remaining: block.size as u64,
        })
    }
}

impl Read for BlockReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        let Some(file) = self.file.as_mut() else {
            return Ok(0);
        };

        let limit = self.remaining.min(buf.len() as u64) as usize;
        if limit == 0 {
            self.file = None;
            return Ok(0);
        }

        let n = file.read(&mut buf[..limit])?;
        self.remaining -= n as u64;

        if self.remaining == 0 || n == 0 {
            // Exhausted (or the segment file ended early) — drop the handle
            self.file = None;
        }

        Ok(n)
    }
}

/// Lazy concatenation of block readers over one value layout
///
/// Yields the stored value's bytes in layout order as a single finite
/// stream. At most one segment file handle is open at a time.
pub struct ValueReader {
    data_dir: PathBuf,
    blocks: VecDeque<BlockDescriptor>,
    current: Option<BlockReader>,
}

impl ValueReader {
    /// Create a reader over `layout`; no file is opened until the first read
    pub(crate) fn new(data_dir: PathBuf, layout: Vec<BlockDescriptor>) -> Self {
        Self {
            data_dir,
            blocks: layout.into(),
            current: None,
        }
    }
}

impl Read for ValueReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if let Some(reader) = self.current.as_mut() {
                let n = reader.read(buf)?;
                if n > 0 {
                    return Ok(n);
                }
                self.current = None;
            }

            // Advance to the next block, or signal end of value
            match self.blocks.pop_front() {
                Some(block) => {
                    let reader = BlockReader::open(&self.data_dir, &block)
                        .map_err(|e| match e {
                            crate::error::StoreError::Io(io) => io,
                            other => io::Error::new(io::ErrorKind::Other, other.to_string()),
                        })?;
                    self.current = Some(reader);
                }
                None => return Ok(0),
            }
        }
    }
}
