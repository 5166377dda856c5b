use std::fmt;

#[derive(Debug)]
pub enum SyncError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty sheet name, duplicate sheet, etc.).
    ConfigValidation(String),
    /// A sheet's header row lacks a required column.
    MissingColumn { sheet: String, column: String },
    /// No sub-database with this sheet name.
    UnknownSheet(String),
    /// No record with this key in the addressed sub-database.
    UnknownKey(String),
    /// No language or misc column with this name in the addressed sub-database.
    UnknownColumn(String),
    /// An edit hook refused the change.
    Rejected(String),
    /// Remote modification time could not be determined.
    FreshnessUnavailable,
    /// The remote changed between the freshness checks of a push.
    RemoteChanged,
    /// Another sync is in progress.
    Busy,
    /// Nothing to export or push.
    EmptyDatabase,
    /// Grid transport fault (read/write/timeout).
    Transport(String),
    /// Local IO error (database file, export, etc.).
    Io(String),
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { sheet, column } => {
                write!(f, "sheet '{sheet}': unable to find column '{column}'")
            }
            Self::UnknownSheet(sheet) => write!(f, "unknown sheet: {sheet}"),
            Self::UnknownKey(key) => write!(f, "unknown key: {key}"),
            Self::UnknownColumn(column) => write!(f, "unknown column: {column}"),
            Self::Rejected(msg) => write!(f, "edit rejected: {msg}"),
            Self::FreshnessUnavailable => write!(f, "unable to determine remote modification time"),
            Self::RemoteChanged => {
                write!(f, "remote changed during save, retry manually")
            }
            Self::Busy => write!(f, "a sync is already in progress"),
            Self::EmptyDatabase => write!(f, "database is empty"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for SyncError {}
