// CSV directory as a remote spreadsheet
//
// Layout: <root>/<source>/<sheet>.csv, one file per sheet. The source
// directory's newest file modification time stands in for the remote
// "last modified" timestamp.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use locasync_sync::remote::{Freshness, FreshnessSource, GridRange, GridSource};
use locasync_sync::{Grid, SyncError};

use crate::file_stem;

fn transport_err(e: impl std::fmt::Display) -> SyncError {
    SyncError::Transport(e.to_string())
}

#[derive(Debug, Clone)]
pub struct CsvGridSource {
    root: PathBuf,
}

impl CsvGridSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sheet_path(&self, source: &str, sheet: &str) -> PathBuf {
        self.root
            .join(file_stem(source))
            .join(format!("{}.csv", file_stem(sheet)))
    }

    /// Freshness of one source directory.
    pub fn freshness(&self, source: &str) -> CsvFreshness {
        CsvFreshness {
            dir: self.root.join(file_stem(source)),
        }
    }
}

impl GridSource for CsvGridSource {
    fn read_grid(&self, source: &str, sheet: &str, range: GridRange) -> Result<Option<Grid>, SyncError> {
        let path = self.sheet_path(source, sheet);
        if !path.exists() {
            log::debug!("{} does not exist", path.display());
            return Ok(None);
        }

        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)
            .map_err(transport_err)?;

        let mut grid = Grid::new();
        for result in reader.records() {
            let record = result.map_err(transport_err)?;
            grid.push(record.iter().map(str::to_string).collect());
        }

        if grid.is_empty() {
            return Ok(None);
        }
        Ok(Some(range.apply(grid)))
    }

    /// Truncates the sheet in place; the file itself stays.
    fn clear_grid(&self, source: &str, sheet: &str) -> Result<(), SyncError> {
        let path = self.sheet_path(source, sheet);
        if path.exists() {
            fs::File::create(&path).map_err(transport_err)?;
        }
        Ok(())
    }

    fn write_grid(&self, source: &str, sheet: &str, grid: &Grid) -> Result<(), SyncError> {
        let path = self.sheet_path(source, sheet);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(transport_err)?;
        }

        // Build next to the target, then swap in.
        let tmp = path.with_extension("csv-tmp");
        let written =
            write_rows(&tmp, grid).and_then(|()| fs::rename(&tmp, &path).map_err(transport_err));
        if written.is_err() && tmp.exists() {
            if let Err(e) = fs::remove_file(&tmp) {
                log::warn!("{}: {e}", tmp.display());
            }
        }
        written
    }
}

fn write_rows(path: &Path, grid: &Grid) -> Result<(), SyncError> {
    let mut writer = ::csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(transport_err)?;
    for row in grid {
        writer.write_record(row).map_err(transport_err)?;
    }
    writer.flush().map_err(transport_err)
}

/// Newest `.csv` modification time in a source directory, in milliseconds.
#[derive(Debug, Clone)]
pub struct CsvFreshness {
    dir: PathBuf,
}

impl CsvFreshness {
    fn newest_mtime(&self) -> std::io::Result<Option<i64>> {
        let mut newest = None;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let modified = fs::metadata(&path)?.modified()?;
            let millis = modified
                .duration_since(UNIX_EPOCH)
                .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
                .unwrap_or(0);
            newest = Some(newest.map_or(millis, |n: i64| n.max(millis)));
        }
        Ok(newest)
    }
}

impl FreshnessSource for CsvFreshness {
    fn remote_modified(&self) -> Freshness {
        match self.newest_mtime() {
            Ok(Some(millis)) => Freshness::Known(millis),
            Ok(None) => Freshness::Known(0),
            Err(e) => {
                log::warn!("{}: {e}", self.dir.display());
                Freshness::Undetermined
            }
        }
    }
}
