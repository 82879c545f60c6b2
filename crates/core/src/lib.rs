//! bt-core: Core library for the bt backend tool
//!
//! This crate provides the protocol-independent parts of the tool:
//! - The `Backend` trait every storage protocol implements
//! - File entries and backend option parsing
//! - Configuration loading
//! - The one-way sync engine (listing differ, transfer strategy,
//!   retrying executor and orchestrator)
//!
//! Concrete backends live in bt-backends; the core never depends on them.

pub mod config;
pub mod entry;
pub mod error;
pub mod options;
pub mod retry;
pub mod sync;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::{Config, ConfigManager, SyncSettings};
pub use entry::{FileEntry, UNKNOWN_SIZE};
pub use error::{Error, Result};
pub use options::BackendOptions;
pub use retry::{RetryPolicy, retry_with_backoff};
pub use sync::{SyncEngine, SyncEvent, SyncObserver, SyncOptions, SyncPlan, SyncReport};
pub use traits::Backend;
