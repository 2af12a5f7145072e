//! Answer cache reconciliation between the local cache and the remote
//! document store

mod merge;
mod reconciler;

pub use merge::{merge, MergeInput, Merged, Repair};
pub use reconciler::{Reconciler, SyncOutcome, SyncStatus};
