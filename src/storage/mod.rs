//! Durable state backends
//!
//! This module provides a trait-based abstraction over where the history
//! cache, the achievement ledger and archived reports are kept.
//!
//! ## Backends
//!
//! - **Files** (default): JSON files in a state directory, atomic rename on write
//! - **Memory**: no persistence, for tests
//! - **None**: discards writes, loads nothing
//!
//! ## Usage
//!
//! ```no_run
//! use node_storyteller::config::StorageConfig;
//! use node_storyteller::storage::backend_from_config;
//!
//! let backend = backend_from_config(&StorageConfig::default());
//! println!("state kept in {}", backend.describe());
//! ```

pub mod backend;
pub mod error;
pub mod files;
pub mod memory;

use std::sync::Arc;

pub use backend::{NullBackend, StateBackend};
pub use error::{StorageError, StorageResult};
pub use files::FileBackend;
pub use memory::MemoryBackend;

use crate::config::StorageConfig;

/// Build the configured backend
pub fn backend_from_config(config: &StorageConfig) -> Arc<dyn StateBackend> {
    match config {
        StorageConfig::None => Arc::new(NullBackend),
        StorageConfig::Files { dir } => Arc::new(FileBackend::new(dir)),
    }
}
