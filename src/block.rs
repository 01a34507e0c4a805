//! Block descriptors and their on-disk encoding.
//!
//! A `BlockDescriptor` names a contiguous byte range inside one segment
//! file. An ordered list of descriptors (a value layout) reconstructs a
//! stored value by concatenating the referenced ranges in order.
//!
//! ## Wire Format
//! ```text
//! ┌─────────────┬──────────────┬────────────┬──────────┐
//! │ NameLen u16 │ Name (UTF-8) │ Offset u32 │ Size u32 │
//! └─────────────┴──────────────┴────────────┴──────────┘
//! ```
//! All multi-byte integers are big-endian. File names are stored relative
//! to the working directory and re-resolved against it on load, so a
//! working directory can be relocated between runs.

use std::io::{Read, Write};

use crate::error::{Result, StoreError};

/// A reference to a contiguous byte range within one segment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Segment file name, relative to the working directory (e.g. "data0")
    pub file_name: String,
    /// Byte offset of the range within the segment file
    pub offset: u32,
    /// Length of the range in bytes (always positive for live blocks)
    pub size: u32,
}

impl BlockDescriptor {
    /// Create a new descriptor
    pub fn new(file_name: impl Into<String>, offset: u32, size: u32) -> Self {
        Self {
            file_name: file_name.into(),
            offset,
            size,
        }
    }

    /// Encode this descriptor to a writer
    pub fn encode_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let name = self.file_name.as_bytes();
        writer.write_all(&(name.len() as u16).to_be_bytes())?;
        writer.write_all(name)?;
        writer.write_all(&self.offset.to_be_bytes())?;
        writer.write_all(&self.size.to_be_bytes())?;
        Ok(())
    }

    /// Decode a descriptor from a reader
    ///
    /// Fails with `CorruptedIndex` if the name length prefix declares more
    /// bytes than the reader can provide, or if the name is not valid UTF-8.
    pub fn decode_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut len_buf = [0u8; 2];
        read_exact_or_corrupt(reader, &mut len_buf, "block name length")?;
        let name_len = u16::from_be_bytes(len_buf) as usize;

        let mut name = vec![0u8; name_len];
        read_exact_or_corrupt(reader, &mut name, "block name")?;
        let file_name = String::from_utf8(name).map_err(|_| {
            StoreError::CorruptedIndex("block name is not valid UTF-8".to_string())
        })?;

        let offset = read_u32_or_corrupt(reader, "block offset")?;
        let size = read_u32_or_corrupt(reader, "block size")?;

        Ok(Self {
            file_name,
            offset,
            size,
        })
    }
}

// =============================================================================
// Shared Codec Helpers (used by index and allocator persistence)
// =============================================================================

/// Write a big-endian u32
pub(crate) fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<()> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

/// Read a big-endian u32, treating a short read as index corruption
pub(crate) fn read_u32_or_corrupt<R: Read>(reader: &mut R, what: &str) -> Result<u32> {
    let mut buf = [0u8; 4];
    read_exact_or_corrupt(reader, &mut buf, what)?;
    Ok(u32::from_be_bytes(buf))
}

/// Fill `buf` from the reader, mapping a premature EOF to `CorruptedIndex`
///
/// A truncated persisted file means some length prefix declared more bytes
/// than were actually written; that load is fatal and not partially
/// recovered. Other I/O errors propagate unchanged.
pub(crate) fn read_exact_or_corrupt<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    what: &str,
) -> Result<()> {
    reader.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            StoreError::CorruptedIndex(format!("unexpected end of file reading {}", what))
        } else {
            StoreError::Io(e)
        }
    })
}
