//! One-way synchronization between two backends

pub mod engine;
pub mod plan;
pub mod progress;
pub mod transfer;

pub use engine::{SyncEngine, SyncOptions};
pub use plan::SyncPlan;
pub use progress::{
    ItemAction, NullObserver, Progress, SyncEvent, SyncObserver, SyncReport, SyncState,
};
pub use transfer::TransferStrategy;
