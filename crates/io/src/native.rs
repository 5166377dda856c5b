// Native database store using SQLite

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags, OptionalExtension};

use locasync_sync::model::{ColumnLayout, LanguageText, MiscText};
use locasync_sync::{Database, Record, SubDatabase, SyncError};

use crate::{io_err, NATIVE_FORMAT_VERSION};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS sheets (
    id INTEGER PRIMARY KEY,        -- position in the database
    read_only INTEGER NOT NULL,    -- 0=writable, 1=read-only
    sheet_name TEXT NOT NULL,
    name TEXT NOT NULL,
    languages TEXT NOT NULL,       -- JSON array of tags
    miscs TEXT NOT NULL,           -- JSON array of titles
    layout TEXT NOT NULL           -- JSON column layout
);

CREATE TABLE IF NOT EXISTS records (
    sheet_id INTEGER NOT NULL,
    ord INTEGER NOT NULL,
    key TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    key_changed INTEGER NOT NULL,
    changed INTEGER NOT NULL,
    content TEXT NOT NULL,         -- JSON array of {language, text, changed}
    misc TEXT NOT NULL,            -- JSON array of {title, text}
    PRIMARY KEY (sheet_id, ord)
);
"#;

/// Per-project store location: `<data dir>/locasync/projects/<hash>.loca`.
pub fn store_path(project: &Path) -> PathBuf {
    let canonical = project.canonicalize().unwrap_or_else(|_| project.to_path_buf());
    let hash = blake3::hash(canonical.to_string_lossy().as_bytes());
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("locasync")
        .join("projects")
        .join(format!("{}.loca", &hash.to_hex()[..16]))
}

pub fn save(db: &Database, path: &Path) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    // Build next to the target, then swap in.
    let tmp = path.with_extension("loca-tmp");
    if tmp.exists() {
        std::fs::remove_file(&tmp).map_err(io_err)?;
    }

    let mut conn = Connection::open(&tmp).map_err(io_err)?;
    conn.execute_batch(SCHEMA).map_err(io_err)?;

    let tx = conn.transaction().map_err(io_err)?;
    {
        let mut meta = tx
            .prepare("INSERT INTO meta (key, value) VALUES (?1, ?2)")
            .map_err(io_err)?;
        for (key, value) in [
            ("format_version", NATIVE_FORMAT_VERSION.to_string()),
            ("last_modified_online", db.last_modified_online.to_string()),
            ("last_modified_local", db.last_modified_local.to_string()),
            ("has_online_changes", db.has_online_changes.to_string()),
            ("has_local_changes", db.has_local_changes.to_string()),
        ] {
            meta.execute(params![key, value]).map_err(io_err)?;
        }

        let mut sheet_stmt = tx
            .prepare(
                "INSERT INTO sheets (id, read_only, sheet_name, name, languages, miscs, layout) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .map_err(io_err)?;
        let mut record_stmt = tx
            .prepare(
                "INSERT INTO records (sheet_id, ord, key, timestamp, key_changed, changed, content, misc) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )
            .map_err(io_err)?;

        let all = db
            .sub_databases()
            .iter()
            .map(|s| (false, s))
            .chain(db.read_only.iter().map(|s| (true, s)));
        for (id, (read_only, sub)) in all.enumerate() {
            sheet_stmt
                .execute(params![
                    id as i64,
                    read_only,
                    sub.sheet_name,
                    sub.name,
                    serde_json::to_string(sub.languages()).map_err(io_err)?,
                    serde_json::to_string(sub.miscs()).map_err(io_err)?,
                    serde_json::to_string(sub.layout()).map_err(io_err)?,
                ])
                .map_err(io_err)?;

            for (ord, record) in sub.records().iter().enumerate() {
                record_stmt
                    .execute(params![
                        id as i64,
                        ord as i64,
                        record.key(),
                        record.timestamp,
                        record.key_changed,
                        record.changed,
                        serde_json::to_string(&record.content).map_err(io_err)?,
                        serde_json::to_string(&record.misc).map_err(io_err)?,
                    ])
                    .map_err(io_err)?;
            }
        }
    }
    tx.commit().map_err(io_err)?;
    drop(conn);

    std::fs::rename(&tmp, path).map_err(io_err)?;
    log::debug!("database saved to {}", path.display());
    Ok(())
}

struct SheetRow {
    id: i64,
    read_only: bool,
    sheet_name: String,
    name: String,
    languages: String,
    miscs: String,
    layout: String,
}

struct RecordRow {
    key: String,
    timestamp: i64,
    key_changed: bool,
    changed: bool,
    content: String,
    misc: String,
}

pub fn load(path: &Path) -> Result<Database, SyncError> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(io_err)?;

    let version: u32 = read_meta(&conn, "format_version")?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    if version == 0 || version > NATIVE_FORMAT_VERSION {
        return Err(SyncError::Io(format!(
            "{}: unsupported store format version {version}",
            path.display()
        )));
    }

    let mut sheet_stmt = conn
        .prepare("SELECT id, read_only, sheet_name, name, languages, miscs, layout FROM sheets ORDER BY id")
        .map_err(io_err)?;
    let sheets = sheet_stmt
        .query_map([], |row| {
            Ok(SheetRow {
                id: row.get(0)?,
                read_only: row.get(1)?,
                sheet_name: row.get(2)?,
                name: row.get(3)?,
                languages: row.get(4)?,
                miscs: row.get(5)?,
                layout: row.get(6)?,
            })
        })
        .map_err(io_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;

    let mut record_stmt = conn
        .prepare(
            "SELECT key, timestamp, key_changed, changed, content, misc FROM records \
             WHERE sheet_id = ?1 ORDER BY ord",
        )
        .map_err(io_err)?;

    let mut writable = Vec::new();
    let mut read_only = Vec::new();
    for sheet in sheets {
        let mut sub = SubDatabase::new(sheet.sheet_name, sheet.name);
        sub.is_read_only = sheet.read_only;
        let languages: Vec<String> = serde_json::from_str(&sheet.languages).map_err(io_err)?;
        let miscs: Vec<String> = serde_json::from_str(&sheet.miscs).map_err(io_err)?;
        let layout: ColumnLayout = serde_json::from_str(&sheet.layout).map_err(io_err)?;
        sub.set_columns(languages, miscs, layout);

        let rows = record_stmt
            .query_map(params![sheet.id], |row| {
                Ok(RecordRow {
                    key: row.get(0)?,
                    timestamp: row.get(1)?,
                    key_changed: row.get(2)?,
                    changed: row.get(3)?,
                    content: row.get(4)?,
                    misc: row.get(5)?,
                })
            })
            .map_err(io_err)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;

        for row in rows {
            let mut record = Record::new(row.key, row.timestamp);
            record.key_changed = row.key_changed;
            record.changed = row.changed;
            record.content = serde_json::from_str::<Vec<LanguageText>>(&row.content).map_err(io_err)?;
            record.misc = serde_json::from_str::<Vec<MiscText>>(&row.misc).map_err(io_err)?;
            sub.push_record(record);
        }

        if sheet.read_only {
            read_only.push(sub);
        } else {
            writable.push(sub);
        }
    }

    let mut db = Database::from_parts(writable, read_only);
    db.last_modified_online = meta_i64(&conn, "last_modified_online")?;
    db.last_modified_local = meta_i64(&conn, "last_modified_local")?;
    db.has_online_changes = meta_bool(&conn, "has_online_changes")?;
    db.has_local_changes = meta_bool(&conn, "has_local_changes")?;
    Ok(db)
}

/// Load the store, or start empty when none exists yet.
pub fn load_or_default(path: &Path) -> Result<Database, SyncError> {
    if !path.exists() {
        log::info!("no local database at {}, starting empty", path.display());
        return Ok(Database::new());
    }
    load(path)
}

fn read_meta(conn: &Connection, key: &str) -> Result<Option<String>, SyncError> {
    conn.query_row("SELECT value FROM meta WHERE key = ?1", params![key], |row| row.get(0))
        .optional()
        .map_err(io_err)
}

fn meta_i64(conn: &Connection, key: &str) -> Result<i64, SyncError> {
    Ok(read_meta(conn, key)?.and_then(|v| v.parse().ok()).unwrap_or(0))
}

fn meta_bool(conn: &Connection, key: &str) -> Result<bool, SyncError> {
    Ok(read_meta(conn, key)?.is_some_and(|v| v == "true"))
}
