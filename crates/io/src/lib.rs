// File I/O operations

pub mod csv;
pub mod json;
pub mod native;

use locasync_sync::SyncError;

/// Native store format version
/// Increment when schema changes in a way that old versions can't read
pub const NATIVE_FORMAT_VERSION: u32 = 1;

/// File-name-safe form of a sheet name.
pub fn file_stem(sheet_name: &str) -> String {
    sheet_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | ' ' | '.') { c } else { '_' })
        .collect()
}

pub(crate) fn io_err(e: impl std::fmt::Display) -> SyncError {
    SyncError::Io(e.to_string())
}
