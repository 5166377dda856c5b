//! Contracts for the remote side: grid transport and freshness.

use crate::error::SyncError;
use crate::model::Grid;

/// Part of a sheet to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridRange {
    /// Every row and column.
    All,
    /// Row 0 only.
    HeaderRow,
    /// One column, all rows.
    Column(usize),
}

impl GridRange {
    /// Cut `grid` down to this range.
    pub fn apply(self, grid: Grid) -> Grid {
        match self {
            GridRange::All => grid,
            GridRange::HeaderRow => grid.into_iter().take(1).collect(),
            GridRange::Column(column) => grid
                .into_iter()
                .map(|row| vec![row.get(column).cloned().unwrap_or_default()])
                .collect(),
        }
    }
}

/// Read/write access to named sheets of a remote spreadsheet.
pub trait GridSource {
    /// `Ok(None)` when the sheet does not exist or has no cells.
    fn read_grid(&self, source: &str, sheet: &str, range: GridRange) -> Result<Option<Grid>, SyncError>;

    /// Remove every cell of the sheet.
    fn clear_grid(&self, source: &str, sheet: &str) -> Result<(), SyncError>;

    /// Overwrite the sheet starting at the top-left cell.
    fn write_grid(&self, source: &str, sheet: &str, grid: &Grid) -> Result<(), SyncError>;
}

/// Outcome of a remote modification-time query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Known(i64),
    /// Timeout, transport fault or unparseable answer. Never "unchanged".
    Undetermined,
}

pub trait FreshnessSource {
    fn remote_modified(&self) -> Freshness;

    /// Best-effort notification after a successful write.
    fn mark_remote_changed(&self) {}
}
