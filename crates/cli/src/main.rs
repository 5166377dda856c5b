// locasync - keep a local translation database in sync with a shared spreadsheet

mod exit_codes;
mod freshness;
mod project;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

use locasync_io::json;
use locasync_sync::hooks::NoopHook;
use locasync_sync::orchestrator::{LocalState, PollSchedule, TickOutcome};
use locasync_sync::{Database, MergeReport, SyncError};

use exit_codes::{sync_exit_code, EXIT_IO, EXIT_SUCCESS, EXIT_SYNC_STALE, EXIT_USAGE};
use project::Project;

#[derive(Parser)]
#[command(name = "locasync")]
#[command(about = "Sync a local translation database with a shared spreadsheet")]
#[command(version)]
#[command(long_version = long_version())]
struct Cli {
    /// Project directory: config lookup and export root
    #[arg(long, short = 'p', global = true, default_value = ".")]
    project: PathBuf,

    /// Config file, relative to the project directory
    #[arg(long, global = true, default_value = "locasync.toml")]
    config: PathBuf,

    /// Directory holding the remote spreadsheets as CSV files
    #[arg(long, global = true, env = "LOCASYNC_REMOTE")]
    remote: Option<PathBuf>,

    /// Local database file (default: per-project file in the data directory)
    #[arg(long, global = true, env = "LOCASYNC_STORE")]
    store: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pull the remote sheets and merge them into the local database
    #[command(after_help = "\
Examples:
  locasync pull
  locasync pull --keys-only     # seed an empty database with keys only")]
    Pull {
        /// Only read the key column; ignored once the database has content
        #[arg(long)]
        keys_only: bool,
    },

    /// Write local changes back to the remote, pulling first if it moved on
    Push,

    /// Show the local database and how it compares to the remote
    Status {
        /// Exit 14 when the remote is ahead
        #[arg(long)]
        check: bool,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Export the runtime and editor JSON files
    Export,

    /// Create an empty entry
    Add {
        key: String,

        /// Target sheet (default: first sheet)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Rename an entry in every sheet that has it
    Rename { old: String, new: String },

    /// Remove an entry
    Remove {
        key: String,

        /// Sheet holding the key (default: first sheet that has it)
        #[arg(long)]
        sheet: Option<String>,
    },

    /// Set the text of one language (or misc column with --misc)
    #[command(after_help = "\
Examples:
  locasync set menu.start de 'Spiel starten'
  locasync set menu.start comment 'title screen' --misc")]
    Set {
        key: String,
        column: String,
        text: String,

        /// Sheet holding the key (default: first sheet that has it)
        #[arg(long)]
        sheet: Option<String>,

        /// COLUMN names a misc column instead of a language
        #[arg(long)]
        misc: bool,
    },

    /// Sort a sheet by key
    Sort {
        sheet: String,

        #[arg(long)]
        descending: bool,
    },

    /// Find entries by key or text
    Find {
        term: String,

        /// Machine-readable output
        #[arg(long)]
        json: bool,
    },

    /// Poll the remote and pull automatically when auto_update is on
    Watch {
        /// Stop after this many check-modified ticks
        #[arg(long)]
        ticks: Option<u32>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = Project::open(cli.project, &cli.config, cli.remote, cli.store)
        .and_then(|project| run(&project, cli.command));

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            eprintln!("error: {}", message);
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("LOCASYNC_COMMIT"), ")",
        "\ntarget:  ", env!("LOCASYNC_TARGET"),
    )
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

fn run(project: &Project, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Pull { keys_only } => cmd_pull(project, keys_only),
        Commands::Push => cmd_push(project),
        Commands::Status { check, json } => cmd_status(project, check, json),
        Commands::Export => cmd_export(project),
        Commands::Add { key, sheet } => cmd_add(project, &key, sheet.as_deref()),
        Commands::Rename { old, new } => cmd_rename(project, &old, &new),
        Commands::Remove { key, sheet } => cmd_remove(project, &key, sheet),
        Commands::Set { key, column, text, sheet, misc } => {
            cmd_set(project, &key, &column, &text, sheet, misc)
        }
        Commands::Sort { sheet, descending } => cmd_sort(project, &sheet, descending),
        Commands::Find { term, json } => cmd_find(project, &term, json),
        Commands::Watch { ticks } => cmd_watch(project, ticks),
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Create error from a sync error with the registry's exit code.
    pub fn sync(err: SyncError) -> Self {
        let code = sync_exit_code(&err);
        let hint = match &err {
            SyncError::FreshnessUnavailable => {
                Some("check remote.modified_url or the --remote directory".to_string())
            }
            SyncError::RemoteChanged => Some("someone pushed meanwhile; push again".to_string()),
            SyncError::Busy => Some("another sync is running; retry later".to_string()),
            SyncError::EmptyDatabase => Some("run `locasync pull` first".to_string()),
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<SyncError> for CliError {
    fn from(err: SyncError) -> Self {
        Self::sync(err)
    }
}

// ============================================================================
// pull / push
// ============================================================================

fn cmd_pull(project: &Project, keys_only: bool) -> Result<(), CliError> {
    let syncer = project.syncer()?;
    let mut db = project.load_db()?;

    if keys_only {
        let loaded = syncer.pull_keys(&mut db)?;
        project.save_db(&db)?;
        println!("{} sheet(s) seeded with keys", loaded);
        return Ok(());
    }

    let report = syncer.pull(&mut db)?;
    if !project.config.read_only.is_empty() {
        let loaded = syncer.pull_read_only(&mut db)?;
        println!("{} read-only sheet(s) loaded", loaded);
    }
    project.save_db(&db)?;
    print_merge(&report);
    Ok(())
}

fn cmd_push(project: &Project) -> Result<(), CliError> {
    let syncer = project.syncer()?;
    let mut db = project.load_db()?;
    if db.is_empty() {
        return Err(SyncError::EmptyDatabase.into());
    }

    // Keep whatever a pre-push pull merged, even when the push itself fails.
    let result = syncer.push(&mut db);
    project.save_db(&db)?;
    let report = result?;

    if let Some(pulled) = &report.pulled {
        print_merge(pulled);
    }
    println!(
        "pushed {} sheet(s), {} record(s)",
        report.sheets_written, report.records_written
    );
    Ok(())
}

fn print_merge(report: &MergeReport) {
    println!(
        "merged: {} added, {} replaced, {} kept, {} removed, {} ignored ({} new sheet(s), {} dropped)",
        report.records_added,
        report.records_replaced,
        report.records_kept,
        report.records_removed,
        report.records_ignored,
        report.sheets_added,
        report.sheets_removed,
    );
}

// ============================================================================
// status / export
// ============================================================================

fn cmd_status(project: &Project, check: bool, as_json: bool) -> Result<(), CliError> {
    let syncer = project.syncer()?;
    let db = project.load_db()?;
    let state = syncer.local_is_up_to_date(&db);
    let state_label = match state {
        LocalState::UpToDate => "up to date",
        LocalState::Stale => "remote has changes",
        LocalState::Undetermined => "unknown",
    };

    if as_json {
        let sheets: Vec<_> = db
            .sub_databases()
            .iter()
            .chain(db.read_only.iter())
            .map(|sub| {
                serde_json::json!({
                    "sheet": sub.sheet_name,
                    "name": sub.name,
                    "read_only": sub.is_read_only,
                    "records": sub.len(),
                    "languages": sub.languages(),
                    "miscs": sub.miscs(),
                })
            })
            .collect();
        let out = serde_json::json!({
            "remote": state_label,
            "last_modified_online": db.last_modified_online,
            "last_modified_local": db.last_modified_local,
            "has_local_changes": db.has_local_changes,
            "has_online_changes": db.has_online_changes,
            "sheets": sheets,
        });
        let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
    } else {
        println!("store:   {}", project.store.display());
        println!("remote:  {}", state_label);
        println!(
            "synced:  {}{}",
            db.last_modified_online,
            if db.has_online_changes { " (remote changed since)" } else { "" }
        );
        println!(
            "local:   {}{}",
            db.last_modified_local,
            if db.has_local_changes { " (unpushed changes)" } else { "" }
        );
        for sub in db.sub_databases().iter().chain(db.read_only.iter()) {
            println!(
                "  {:<20} {:>6} record(s)  [{}]{}",
                sub.sheet_name,
                sub.len(),
                sub.languages().join(", "),
                if sub.is_read_only { " read-only" } else { "" }
            );
        }
    }

    if check && state == LocalState::Stale {
        return Err(CliError {
            code: EXIT_SYNC_STALE,
            message: "remote is ahead of the local database".to_string(),
            hint: Some("run `locasync pull`".to_string()),
        });
    }
    Ok(())
}

fn cmd_export(project: &Project) -> Result<(), CliError> {
    let syncer = project.syncer()?;
    let mut db = project.load_db()?;

    match syncer.local_is_up_to_date(&db) {
        LocalState::Stale => {
            log::info!("remote has changes, updating before export");
            let report = syncer.pull(&mut db)?;
            project.save_db(&db)?;
            print_merge(&report);
        }
        LocalState::Undetermined => log::warn!("remote state unknown, exporting local data"),
        LocalState::UpToDate => {}
    }

    let report = json::export(&db, &project.config.export, &project.root, &NoopHook)?;
    println!(
        "exported {} file(s), removed {}, skipped {} record(s)",
        report.files_written, report.files_removed, report.records_skipped
    );
    Ok(())
}

// ============================================================================
// edits
// ============================================================================

/// `sheet` if given, otherwise the first writable sheet holding `key`.
fn resolve_sheet(db: &Database, key: &str, sheet: Option<String>) -> Result<String, CliError> {
    if let Some(sheet) = sheet {
        return Ok(sheet);
    }
    db.sub_databases()
        .iter()
        .find(|sub| sub.contains_key(key))
        .map(|sub| sub.sheet_name.clone())
        .ok_or_else(|| SyncError::UnknownKey(key.to_string()).into())
}

fn cmd_add(project: &Project, key: &str, sheet: Option<&str>) -> Result<(), CliError> {
    let mut db = project.load_db()?;
    let now = locasync_sync::now_millis();
    if !db.create_entry(key, sheet, now)? {
        return Err(CliError::args(format!("'{}' is empty or already exists", key.trim())));
    }
    project.save_db(&db)?;
    println!("added {}", key.trim());
    Ok(())
}

fn cmd_rename(project: &Project, old: &str, new: &str) -> Result<(), CliError> {
    let mut db = project.load_db()?;
    if !db.rename_entry(old, new, locasync_sync::now_millis()) {
        return Err(CliError::sync(SyncError::UnknownKey(old.to_string()))
            .with_hint("the new key may already exist in that sheet"));
    }
    project.save_db(&db)?;
    println!("renamed {} -> {}", old, new.trim());
    Ok(())
}

fn cmd_remove(project: &Project, key: &str, sheet: Option<String>) -> Result<(), CliError> {
    let mut db = project.load_db()?;
    let sheet = resolve_sheet(&db, key, sheet)?;
    db.remove_entry(&sheet, key, locasync_sync::now_millis())?;
    project.save_db(&db)?;
    println!("removed {} from {}", key, sheet);
    Ok(())
}

fn cmd_set(
    project: &Project,
    key: &str,
    column: &str,
    text: &str,
    sheet: Option<String>,
    misc: bool,
) -> Result<(), CliError> {
    let mut db = project.load_db()?;
    let sheet = resolve_sheet(&db, key, sheet)?;
    let now = locasync_sync::now_millis();
    if misc {
        db.set_misc(&sheet, key, column, text, now)?;
    } else {
        db.set_text(&sheet, key, column, text, &NoopHook, now)?;
    }
    project.save_db(&db)?;
    Ok(())
}

fn cmd_sort(project: &Project, sheet: &str, descending: bool) -> Result<(), CliError> {
    let mut db = project.load_db()?;
    db.sort(sheet, !descending)?;
    project.save_db(&db)?;
    Ok(())
}

fn cmd_find(project: &Project, term: &str, as_json: bool) -> Result<(), CliError> {
    let db = project.load_db()?;
    let hits = db.find(term);

    if as_json {
        let out: Vec<_> = hits
            .iter()
            .map(|hit| serde_json::json!({ "sheet": hit.sheet_name, "key": hit.key }))
            .collect();
        let text = serde_json::to_string_pretty(&out).map_err(|e| CliError::io(e.to_string()))?;
        println!("{}", text);
    } else {
        for hit in &hits {
            println!("{}\t{}", hit.sheet_name, hit.key);
        }
    }
    Ok(())
}

// ============================================================================
// watch
// ============================================================================

fn cmd_watch(project: &Project, ticks: Option<u32>) -> Result<(), CliError> {
    let syncer = project.syncer()?;
    if !syncer.config().poll.auto_update {
        log::info!("auto_update is off, only watching for remote changes");
    }
    let mut schedule = PollSchedule::new(&syncer.config().poll, syncer.now());
    let mut seen = 0u32;
    let mut last_state = None;

    loop {
        let now = syncer.now();
        if schedule.modified_due(now) {
            // Reload so edits made by other invocations are not overwritten.
            let mut db = project.load_db()?;
            let flagged = db.has_online_changes;
            let outcome = syncer.check_modified(&mut db);
            if db.has_online_changes != flagged {
                project.save_db(&db)?;
            }
            if last_state.as_ref() != Some(&outcome) {
                println!("{}", describe_tick(&outcome));
                last_state = Some(outcome);
            }
            seen += 1;
        }

        if schedule.update_due(now) {
            let mut db = project.load_db()?;
            match syncer.check_update(&mut db) {
                Ok(TickOutcome::Pulled(report)) => {
                    project.save_db(&db)?;
                    print_merge(&report);
                }
                Ok(outcome) => log::debug!("update tick: {}", describe_tick(&outcome)),
                Err(e) => log::warn!("update failed: {e}"),
            }
        }

        if ticks.is_some_and(|n| seen >= n) {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(schedule.sleep_hint(syncer.now()).max(1)));
    }
}

fn describe_tick(outcome: &TickOutcome) -> &'static str {
    match outcome {
        TickOutcome::Busy => "sync in progress",
        TickOutcome::Disabled => "auto update disabled",
        TickOutcome::UpToDate => "up to date",
        TickOutcome::Stale => "remote has changes",
        TickOutcome::Undetermined => "remote state unknown",
        TickOutcome::Pulled(_) => "pulled",
    }
}
