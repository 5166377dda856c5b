// JSON export for runtime consumption

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;

use locasync_sync::config::ExportSettings;
use locasync_sync::hooks::EditHook;
use locasync_sync::locale::canonical_tag;
use locasync_sync::{Database, SubDatabase, SyncError};

use crate::{file_stem, io_err};

/// `{ "translations": { "<hash>": "<value>" } }`
#[derive(Debug, Serialize)]
struct TranslationFile<'a> {
    translations: BTreeMap<String, &'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub files_written: usize,
    pub files_removed: usize,
    pub records_skipped: usize,
}

/// Write the editor index and one file per exported language for every
/// writable sub-database. Destinations are relative to `root`.
pub fn export(
    db: &Database,
    settings: &ExportSettings,
    root: &Path,
    hook: &dyn EditHook,
) -> Result<ExportReport, SyncError> {
    if db.is_empty() {
        return Err(SyncError::EmptyDatabase);
    }

    let destination = root.join(&settings.destination);
    let editor_destination = root.join(&settings.editor_destination);
    fs::create_dir_all(&destination).map_err(io_err)?;
    fs::create_dir_all(&editor_destination).map_err(io_err)?;

    let ignored: Vec<String> = settings
        .ignored_languages
        .iter()
        .filter_map(|l| {
            let tag = canonical_tag(l);
            if tag.is_none() {
                log::warn!("ignored language '{l}' is not a language tag");
            }
            tag
        })
        .collect();

    let mut report = ExportReport::default();
    for sub in db.sub_databases() {
        let stem = file_stem(&sub.sheet_name);
        let (editor, skipped) = collect(sub, hook, |r| r.key());
        report.records_skipped += skipped;
        write_file(&editor_destination.join(format!("{stem}_Editor.json")), editor)?;
        report.files_written += 1;

        for (slot, language) in sub.languages().iter().enumerate() {
            let path = destination.join(format!("{stem}_{language}.json"));
            if ignored.contains(language) {
                if settings.remove_ignored && path.exists() {
                    fs::remove_file(&path).map_err(io_err)?;
                    report.files_removed += 1;
                    log::info!("removed ignored language file {}", path.display());
                }
                continue;
            }
            let (runtime, _) = collect(sub, hook, |r| r.content[slot].text.as_str());
            write_file(&path, runtime)?;
            report.files_written += 1;
        }
    }

    log::info!(
        "export: {} file(s) written, {} removed, {} record(s) skipped",
        report.files_written,
        report.files_removed,
        report.records_skipped
    );
    Ok(report)
}

/// hash -> value for every exportable record. Returns the map and the
/// number of skipped records.
fn collect<'a>(
    sub: &'a SubDatabase,
    hook: &dyn EditHook,
    value: impl Fn(&'a locasync_sync::Record) -> &'a str,
) -> (BTreeMap<String, &'a str>, usize) {
    let mut map = BTreeMap::new();
    let mut skipped = 0;
    for record in sub.records() {
        if record.key().is_empty() {
            log::error!("sheet '{}': record without key skipped", sub.sheet_name);
            skipped += 1;
            continue;
        }
        if !hook.validate(record) {
            log::warn!("sheet '{}': '{}' failed validation, skipped", sub.sheet_name, record.key());
            skipped += 1;
            continue;
        }
        let hash = record.hash().to_string();
        if map.contains_key(&hash) {
            log::warn!(
                "sheet '{}': hash of '{}' collides with an earlier key, skipped",
                sub.sheet_name,
                record.key()
            );
            skipped += 1;
            continue;
        }
        map.insert(hash, value(record));
    }
    (map, skipped)
}

fn write_file(path: &Path, translations: BTreeMap<String, &str>) -> Result<(), SyncError> {
    let json = serde_json::to_string_pretty(&TranslationFile { translations }).map_err(io_err)?;
    fs::write(path, json).map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use locasync_sync::hooks::NoopHook;
    use locasync_sync::index::key_hash;
    use locasync_sync::model::ColumnLayout;
    use locasync_sync::Record;
    use tempfile::tempdir;

    fn db() -> Database {
        let mut main = SubDatabase::new("Main", "Main");
        main.set_columns(vec!["en".into(), "de".into(), "en-XA".into()], vec![], ColumnLayout::default());
        main.push_record(Record::new("greet", 1));
        let mut db = Database::from_parts(vec![main], vec![]);
        db.set_text("Main", "greet", "en", "Hello", &NoopHook, 2).unwrap();
        db.set_text("Main", "greet", "de", "Hallo", &NoopHook, 2).unwrap();
        db
    }

    fn read(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_editor_and_runtime_files() {
        let dir = tempdir().unwrap();
        let settings = ExportSettings {
            destination: "runtime".into(),
            editor_destination: "editor".into(),
            ignored_languages: vec!["en_xa".into()],
            remove_ignored: true,
        };
        fs::create_dir_all(dir.path().join("runtime")).unwrap();
        fs::write(dir.path().join("runtime/Main_en-XA.json"), "{}").unwrap();

        let report = export(&db(), &settings, dir.path(), &NoopHook).unwrap();
        assert_eq!(report.files_written, 3);
        assert_eq!(report.files_removed, 1);

        let hash = key_hash("greet").to_string();
        let editor = read(&dir.path().join("editor/Main_Editor.json"));
        assert_eq!(editor["translations"][&hash], "greet");
        let de = read(&dir.path().join("runtime/Main_de.json"));
        assert_eq!(de["translations"][&hash], "Hallo");
        assert!(!dir.path().join("runtime/Main_en-XA.json").exists());
    }

    #[test]
    fn invalid_records_are_left_out() {
        struct OnlyComplete;
        impl EditHook for OnlyComplete {
            fn validate(&self, record: &Record) -> bool {
                record.is_complete(None)
            }
        }

        let dir = tempdir().unwrap();
        let settings = ExportSettings {
            destination: "out".into(),
            editor_destination: "out".into(),
            ignored_languages: vec![],
            remove_ignored: false,
        };
        let report = export(&db(), &settings, dir.path(), &OnlyComplete).unwrap();
        assert_eq!(report.records_skipped, 1);
        let en = read(&dir.path().join("out/Main_en.json"));
        assert!(en["translations"].as_object().unwrap().is_empty());
    }

    #[test]
    fn empty_database_is_an_error() {
        let dir = tempdir().unwrap();
        let err = export(&Database::new(), &ExportSettings::default(), dir.path(), &NoopHook).unwrap_err();
        assert!(matches!(err, SyncError::EmptyDatabase));
    }
}
