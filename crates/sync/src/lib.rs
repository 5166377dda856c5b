//! `locasync-sync`: reconciliation core for a grid-backed translation database.
//!
//! Pure engine crate: classifies header rows, extracts grids into typed
//! records, merges fresh pulls into the persisted database and serializes
//! sub-databases back into grids. Transport and persistence are reached
//! only through the traits in [`remote`].

pub mod config;
pub mod edit;
pub mod error;
pub mod extract;
pub mod header;
pub mod hooks;
pub mod index;
pub mod locale;
pub mod model;
pub mod orchestrator;
pub mod reconcile;
pub mod remote;
pub mod search;
pub mod serialize;

pub use config::SyncConfig;
pub use error::SyncError;
pub use model::{Database, Grid, Record, SubDatabase};
pub use reconcile::{merge_database, MergeReport};
pub use orchestrator::Syncer;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
