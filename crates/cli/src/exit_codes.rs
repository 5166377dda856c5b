//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Scripts and editor integrations rely on them.
//!
//! # Exit Code Ranges
//!
//! | Range   | Domain    | Description                               |
//! |---------|-----------|-------------------------------------------|
//! | 0       | Universal | Success                                   |
//! | 1       | Universal | General error (unspecified)               |
//! | 2       | Universal | CLI usage error (bad args)                |
//! | 3-9     | local     | Config, store and export failures         |
//! | 10-19   | sync      | Pull/push against the remote spreadsheet  |
//! | 20-29   | edit      | Local edits addressed at missing entries  |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant in the appropriate range
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Map it in `sync_exit_code` if a `SyncError` produces it

use locasync_sync::SyncError;

// =============================================================================
// Universal (0-2)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Local (3-9)
// =============================================================================

/// Local IO failure (store file, export destination).
pub const EXIT_IO: u8 = 3;

/// Config file could not be parsed or failed validation.
pub const EXIT_CONFIG: u8 = 4;

/// Nothing to export or push: the local database is empty.
pub const EXIT_EMPTY_DATABASE: u8 = 5;

// =============================================================================
// Sync (10-19)
// =============================================================================

/// Another sync holds the flag.
pub const EXIT_SYNC_BUSY: u8 = 10;

/// Remote modification time unavailable; the operation was not attempted.
pub const EXIT_SYNC_FRESHNESS: u8 = 11;

/// Remote changed between the checks of a push. Retry manually.
pub const EXIT_SYNC_REMOTE_CHANGED: u8 = 12;

/// Reading or writing a remote grid failed.
pub const EXIT_SYNC_TRANSPORT: u8 = 13;

/// `status --check`: the remote is ahead of the local database.
pub const EXIT_SYNC_STALE: u8 = 14;

// =============================================================================
// Edit (20-29)
// =============================================================================

/// Sheet, key or column not found.
pub const EXIT_EDIT_NOT_FOUND: u8 = 20;

/// An edit hook refused the change.
pub const EXIT_EDIT_REJECTED: u8 = 21;

/// Map a sync error to its exit code.
pub fn sync_exit_code(err: &SyncError) -> u8 {
    match err {
        SyncError::ConfigParse(_) | SyncError::ConfigValidation(_) => EXIT_CONFIG,
        SyncError::MissingColumn { .. } => EXIT_SYNC_TRANSPORT,
        SyncError::UnknownSheet(_) | SyncError::UnknownKey(_) | SyncError::UnknownColumn(_) => {
            EXIT_EDIT_NOT_FOUND
        }
        SyncError::Rejected(_) => EXIT_EDIT_REJECTED,
        SyncError::FreshnessUnavailable => EXIT_SYNC_FRESHNESS,
        SyncError::RemoteChanged => EXIT_SYNC_REMOTE_CHANGED,
        SyncError::Busy => EXIT_SYNC_BUSY,
        SyncError::EmptyDatabase => EXIT_EMPTY_DATABASE,
        SyncError::Transport(_) => EXIT_SYNC_TRANSPORT,
        SyncError::Io(_) => EXIT_IO,
    }
}
