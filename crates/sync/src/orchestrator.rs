use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::{PollSettings, SyncConfig};
use crate::error::SyncError;
use crate::extract::{extract_keys, extract_sub_database, ExtractOptions};
use crate::header::HeaderClassifier;
use crate::model::{Database, SubDatabase};
use crate::reconcile::{merge_database, MergeReport};
use crate::remote::{Freshness, FreshnessSource, GridRange, GridSource};
use crate::serialize::to_grid;

// ---------------------------------------------------------------------------
// Mutual exclusion
// ---------------------------------------------------------------------------

/// "Currently syncing" flag. Attempts made while it is held are skipped,
/// never queued.
#[derive(Debug, Clone, Default)]
pub struct SyncFlag(Arc<AtomicBool>);

impl SyncFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Take the flag, or `None` if someone else holds it.
    pub fn try_acquire(&self) -> Option<SyncGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SyncGuard(Arc::clone(&self.0)))
    }
}

/// Releases the flag on drop.
#[derive(Debug)]
pub struct SyncGuard(Arc<AtomicBool>);

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Local database vs. remote modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    UpToDate,
    Stale,
    Undetermined,
}

/// What a polling tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another sync held the flag.
    Busy,
    /// Auto-update off or the database is in edit mode.
    Disabled,
    UpToDate,
    Stale,
    Undetermined,
    Pulled(MergeReport),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    /// A pull was needed before writing.
    pub pulled: Option<MergeReport>,
    pub sheets_written: usize,
    pub records_written: usize,
}

// ---------------------------------------------------------------------------
// Poll schedule
// ---------------------------------------------------------------------------

/// Due times of the two polling ticks.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    check_modified_ms: i64,
    check_update_ms: i64,
    next_modified: i64,
    next_update: i64,
}

impl PollSchedule {
    /// Both ticks fire on the first poll.
    pub fn new(settings: &PollSettings, now: i64) -> Self {
        Self {
            check_modified_ms: interval(settings.check_modified_ms),
            check_update_ms: interval(settings.check_update_ms),
            next_modified: now,
            next_update: now,
        }
    }

    /// True when the check-modified tick is due; schedules the next one.
    pub fn modified_due(&mut self, now: i64) -> bool {
        due(&mut self.next_modified, self.check_modified_ms, now)
    }

    /// True when the check-update tick is due; schedules the next one.
    pub fn update_due(&mut self, now: i64) -> bool {
        due(&mut self.next_update, self.check_update_ms, now)
    }

    /// Milliseconds until the next tick of either kind.
    pub fn sleep_hint(&self, now: i64) -> u64 {
        let next = self.next_modified.min(self.next_update);
        u64::try_from(next - now).unwrap_or(0)
    }
}

fn interval(ms: u64) -> i64 {
    i64::try_from(ms).unwrap_or(i64::MAX).max(1)
}

fn due(next: &mut i64, every: i64, now: i64) -> bool {
    if now < *next {
        return false;
    }
    *next = now.saturating_add(every);
    true
}

// ---------------------------------------------------------------------------
// Syncer
// ---------------------------------------------------------------------------

/// Drives pulls and pushes between a [`Database`] and a remote spreadsheet.
///
/// All database mutation happens on the caller's thread; the flag only
/// guards against overlapping sync attempts.
pub struct Syncer<G, F> {
    config: SyncConfig,
    grids: G,
    freshness: F,
    flag: SyncFlag,
    clock: fn() -> i64,
}

impl<G: GridSource, F: FreshnessSource> Syncer<G, F> {
    pub fn new(config: SyncConfig, grids: G, freshness: F) -> Self {
        Self {
            config,
            grids,
            freshness,
            flag: SyncFlag::new(),
            clock: crate::now_millis,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn grids(&self) -> &G {
        &self.grids
    }

    pub fn freshness(&self) -> &F {
        &self.freshness
    }

    /// A handle on the flag, e.g. for a UI that greys out while syncing.
    pub fn flag(&self) -> SyncFlag {
        self.flag.clone()
    }

    pub fn now(&self) -> i64 {
        (self.clock)()
    }

    /// Compare the remote modification time with the watermark.
    pub fn local_is_up_to_date(&self, db: &Database) -> LocalState {
        match self.freshness.remote_modified() {
            Freshness::Known(remote) if remote <= db.last_modified_online => LocalState::UpToDate,
            Freshness::Known(_) => LocalState::Stale,
            Freshness::Undetermined => LocalState::Undetermined,
        }
    }

    /// Frequent tick: refresh `has_online_changes`.
    pub fn check_modified(&self, db: &mut Database) -> TickOutcome {
        let Some(_guard) = self.flag.try_acquire() else {
            log::debug!("check modified: sync in progress, tick skipped");
            return TickOutcome::Busy;
        };

        match self.local_is_up_to_date(db) {
            LocalState::UpToDate => {
                db.has_online_changes = false;
                TickOutcome::UpToDate
            }
            LocalState::Stale => {
                db.has_online_changes = true;
                TickOutcome::Stale
            }
            LocalState::Undetermined => {
                log::warn!("unable to determine remote modification time");
                TickOutcome::Undetermined
            }
        }
    }

    /// Auto-update tick: pull when the remote moved on.
    pub fn check_update(&self, db: &mut Database) -> Result<TickOutcome, SyncError> {
        if !self.config.poll.auto_update || db.is_in_edit_mode {
            return Ok(TickOutcome::Disabled);
        }
        let Some(_guard) = self.flag.try_acquire() else {
            log::debug!("check update: sync in progress, tick skipped");
            return Ok(TickOutcome::Busy);
        };

        match self.local_is_up_to_date(db) {
            LocalState::UpToDate => Ok(TickOutcome::UpToDate),
            LocalState::Undetermined => {
                log::warn!("unable to determine remote modification time, update skipped");
                Ok(TickOutcome::Undetermined)
            }
            LocalState::Stale => self.pull_locked(db).map(TickOutcome::Pulled),
        }
    }

    /// Full pull of every configured writable sheet, merged into `db`.
    pub fn pull(&self, db: &mut Database) -> Result<MergeReport, SyncError> {
        let _guard = self.flag.try_acquire().ok_or(SyncError::Busy)?;
        self.pull_locked(db)
    }

    fn pull_locked(&self, db: &mut Database) -> Result<MergeReport, SyncError> {
        // Read freshness before the grids: edits landing in between are
        // picked up by the next pull rather than hidden by the watermark.
        let remote = match self.freshness.remote_modified() {
            Freshness::Known(remote) => remote,
            Freshness::Undetermined => return Err(SyncError::FreshnessUnavailable),
        };

        let now = self.now();
        let remote_cfg = &self.config.remote;
        let mut incoming = Vec::with_capacity(remote_cfg.sheets.len());
        for sheet in &remote_cfg.sheets {
            let Some(grid) = self.grids.read_grid(&remote_cfg.spreadsheet, sheet, GridRange::All)? else {
                log::info!("no data in '{sheet}' found");
                continue;
            };
            let options = ExtractOptions { use_timestamp: true, now };
            match extract_sub_database(sheet, &grid, &self.config.header, options) {
                Ok(Some(sub)) => incoming.push(sub),
                Ok(None) => log::info!("no data in '{sheet}' found"),
                Err(e) => {
                    log::warn!("{e}, sheet skipped");
                    if let Some(existing) = db.sub_database(sheet) {
                        incoming.push(existing.clone());
                    }
                }
            }
        }

        Ok(merge_database(db, incoming, Some(remote)))
    }

    /// Key-only pull to seed an empty database. Records carry timestamp 0
    /// and empty content; the watermark is left alone so the next full
    /// pull replaces them. Returns the number of sheets loaded.
    pub fn pull_keys(&self, db: &mut Database) -> Result<usize, SyncError> {
        let _guard = self.flag.try_acquire().ok_or(SyncError::Busy)?;
        if !db.is_empty() {
            log::info!("database already populated, key pull skipped");
            return Ok(0);
        }

        let remote_cfg = &self.config.remote;
        let mut subs = Vec::new();
        for sheet in &remote_cfg.sheets {
            match self.read_keys(&remote_cfg.spreadsheet, sheet, true)? {
                Some(sub) => subs.push(sub),
                None => log::info!("no keys in '{sheet}' found"),
            }
        }

        let loaded = subs.len();
        merge_database(db, subs, None);
        Ok(loaded)
    }

    fn read_keys(&self, source: &str, sheet: &str, use_timestamp: bool) -> Result<Option<SubDatabase>, SyncError> {
        let Some(header) = self.grids.read_grid(source, sheet, GridRange::HeaderRow)? else {
            return Ok(None);
        };
        let Some(header_row) = header.first() else {
            return Ok(None);
        };
        let Some(key_column) = HeaderClassifier::new(&self.config.header)
            .classify(header_row)
            .key_column
        else {
            log::warn!(
                "sheet '{sheet}': unable to find column '{}', sheet skipped",
                self.config.header.key_column
            );
            return Ok(None);
        };

        let Some(keys) = self.grids.read_grid(source, sheet, GridRange::Column(key_column))? else {
            return Ok(None);
        };
        match extract_keys(sheet, header_row, &keys, &self.config.header, use_timestamp) {
            Ok(sub) => Ok(sub),
            Err(e) => {
                log::warn!("{e}, sheet skipped");
                Ok(None)
            }
        }
    }

    /// Pull every read-only source and replace `db.read_only` wholesale.
    pub fn pull_read_only(&self, db: &mut Database) -> Result<usize, SyncError> {
        let _guard = self.flag.try_acquire().ok_or(SyncError::Busy)?;
        let now = self.now();

        let mut subs = Vec::new();
        for source in &self.config.read_only {
            for sheet in &source.sheets {
                let Some(grid) = self.grids.read_grid(&source.spreadsheet, sheet, GridRange::All)? else {
                    log::info!("no data in '{}/{sheet}' found", source.name);
                    continue;
                };
                let options = ExtractOptions { use_timestamp: false, now };
                match extract_sub_database(sheet, &grid, &self.config.header, options) {
                    Ok(Some(mut sub)) => {
                        sub.name = source.name.clone();
                        sub.is_read_only = true;
                        subs.push(sub);
                    }
                    Ok(None) => log::info!("no data in '{}/{sheet}' found", source.name),
                    Err(e) => log::warn!("{}: {e}, sheet skipped", source.name),
                }
            }
        }

        let loaded = subs.len();
        db.read_only = subs;
        Ok(loaded)
    }

    /// Write every writable sub-database back to the remote.
    ///
    /// Aborts when freshness cannot be determined. Pulls first when the
    /// remote is ahead, then checks again and gives up with
    /// [`SyncError::RemoteChanged`] if someone pushed in between.
    pub fn push(&self, db: &mut Database) -> Result<PushReport, SyncError> {
        let _guard = self.flag.try_acquire().ok_or(SyncError::Busy)?;
        let mut report = PushReport::default();

        match self.local_is_up_to_date(db) {
            LocalState::Undetermined => return Err(SyncError::FreshnessUnavailable),
            LocalState::Stale => {
                log::info!("remote has changes, updating before save");
                report.pulled = Some(self.pull_locked(db)?);
            }
            LocalState::UpToDate => {}
        }

        match self.local_is_up_to_date(db) {
            LocalState::Undetermined => return Err(SyncError::FreshnessUnavailable),
            LocalState::Stale => return Err(SyncError::RemoteChanged),
            LocalState::UpToDate => {}
        }

        let spreadsheet = &self.config.remote.spreadsheet;
        for sub in db.sub_databases() {
            let grid = to_grid(sub, &self.config.header);
            self.grids.clear_grid(spreadsheet, &sub.sheet_name)?;
            self.grids.write_grid(spreadsheet, &sub.sheet_name, &grid)?;
            report.sheets_written += 1;
            report.records_written += sub.len();
        }

        db.reset_change_flags();
        db.has_local_changes = false;
        self.freshness.mark_remote_changed();

        log::info!(
            "push: {} sheet(s), {} record(s) written",
            report.sheets_written,
            report.records_written
        );
        Ok(report)
    }
}
