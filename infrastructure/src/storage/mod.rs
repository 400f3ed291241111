//! Snapshot store adapters.
//!
//! - [`MemorySnapshotStore`]: process-local, for tests and `--no-config` runs
//! - [`FileSnapshotStore`]: one JSON file per key in a data directory

mod file;
mod memory;

pub use file::FileSnapshotStore;
pub use memory::MemorySnapshotStore;
