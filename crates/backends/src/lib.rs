//! bt-backends: storage backends for the bt backend tool
//!
//! Each module implements [`bt_core::Backend`] for one protocol. Callers
//! open backends through [`Registry`] and never name a concrete type.

pub mod local;
pub mod registry;
pub mod s3;

pub use local::LocalBackend;
pub use registry::{BackendConfig, BackendFactory, Registry};
pub use s3::{S3Backend, S3Location};
