//! Transition repositories
//!
//! - [`memory`]: in-process store, one lock per repository
//! - [`file`]: JSON workspace persisted between command-line runs, with its lock file
//! - `sqlite`: durable store behind the `database` feature

pub mod file;
pub mod memory;
mod slot;

#[cfg(feature = "database")]
pub mod sqlite;

pub use file::{InvoiceWorkspace, WorkspaceGuard, WorkspaceLock};
pub use memory::{InMemoryTransitionRepository, RepositorySnapshot};
pub use slot::{PendingSlot, SlotEvent};

#[cfg(feature = "database")]
pub use sqlite::SqliteTransitionRepository;
