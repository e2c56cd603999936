//! Account snapshot records and loading

mod data;
mod schema;
pub mod loader;

pub use data::{parse_date, AccountRecord, AccountSnapshot};
pub use schema::{SnapshotKind, SnapshotSchema, ACCOUNT_KEY, DEFAULT_CARRIED_COLUMNS};
pub use loader::{load_snapshot, load_snapshot_from_reader};
