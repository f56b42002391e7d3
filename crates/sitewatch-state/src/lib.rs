//! sitewatch-state: persisted status records and the execution lock.
//!
//! # Architecture
//!
//! ```text
//! StatusStore (trait)
//!   ├── FileStatusStore   one `<url> <status> <since> <count>` line per target
//!   └── MemoryStatusStore in-process map (for testing)
//!
//! ExecutionLock
//!   ├── LockMarker (trait)   FileLockMarker: single-line PID file
//!   └── ProcessTable (trait) OsProcessTable: kill(pid, 0)
//! ```
//!
//! Unix only: liveness checks use kill(2) and marker swaps use flock(2).
//!
//! A regular run holds the lock for its whole load → probe → save cycle.
//! The store is always replaced as a whole file, so readers that skip the
//! lock (summary runs) see either the old or the new contents.

#[cfg(not(unix))]
compile_error!("sitewatch-state requires a Unix target (kill(2) and flock(2))");

pub mod error;
pub mod lock;
pub mod store;

pub use error::{StateError, StateResult};
pub use lock::{ExecutionLock, FileLockMarker, LockGuard, LockMarker, OsProcessTable, ProcessTable};
pub use store::{FileStatusStore, MemoryStatusStore, StatusMap, StatusStore};
