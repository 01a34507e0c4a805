//! # BlockKV
//!
//! A single-process, disk-resident key-value store with:
//! - Arbitrary byte keys (up to 255 bytes) and arbitrary byte values
//! - Values split into blocks across append-only segment files
//! - A reclaimable free-block pool reusing space after delete/overwrite
//! - A compact big-endian binary index persisted at close
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Store                                │
//! │        (facade: contains / get / put / delete / close)       │
//! └──────────────┬──────────────────────────┬───────────────────┘
//!                │                          │
//!                ▼                          ▼
//!        ┌──────────────┐          ┌─────────────────┐
//!        │   KeyIndex   │          │  BlockAllocator  │
//!        │ key → layout │          │ segments + pool  │
//!        └──────┬───────┘          └────────┬─────────┘
//!               │                           │
//!               ▼                           ▼
//!          index.bin              value-index.bin, data<N>
//! ```
//!
//! The `Store` never touches files directly: it asks the `BlockAllocator`
//! to place and read value bytes and the `KeyIndex` to map keys to the
//! ordered block lists that reconstruct them.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod block;
pub mod alloc;
pub mod index;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, StoreError};
pub use config::Config;
pub use block::BlockDescriptor;
pub use store::Store;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of BlockKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
