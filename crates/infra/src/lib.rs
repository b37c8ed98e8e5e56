//! Infrastructure layer: directory storage, snapshots, configuration.

pub mod config;
pub mod directory;
pub mod snapshot;


pub use config::{ConfigError, GatehouseConfig};
pub use directory::{InMemoryDirectory, UserAccount};
pub use snapshot::{DirectorySnapshot, SnapshotError};
