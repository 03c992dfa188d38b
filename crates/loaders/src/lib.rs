pub mod error;
pub mod file_loader;
pub mod float_json;
pub mod snapshot;

pub use error::{Result, SnapshotError};
pub use file_loader::{FileLoader, load, save};
pub use snapshot::{SNAPSHOT_VERSION, Snapshot, WeightsRecord};
