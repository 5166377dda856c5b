//! Local edit operations on the [`Database`].
//!
//! Every successful edit stamps the touched record with `now` and marks the
//! database as having local changes, so the next push picks it up and the
//! next pull does not drop it.

use crate::error::SyncError;
use crate::hooks::EditHook;
use crate::model::{Database, Record};

impl Database {
    /// Create an empty entry in `sheet`, or in the first writable
    /// sub-database when `sheet` is `None`.
    ///
    /// `Ok(false)` when the key is empty or already present there.
    pub fn create_entry(&mut self, key: &str, sheet: Option<&str>, now: i64) -> Result<bool, SyncError> {
        let key = key.trim();
        let sub = match sheet {
            Some(name) => self
                .sub_database_mut(name)
                .ok_or_else(|| SyncError::UnknownSheet(name.to_string()))?,
            None => self
                .sub_databases_mut()
                .first_mut()
                .ok_or_else(|| SyncError::UnknownSheet("<none>".to_string()))?,
        };

        if !sub.create_record(key, now) {
            log::debug!("create '{key}' in '{}': empty or existing key", sub.sheet_name);
            return Ok(false);
        }
        self.mark_local_change(now);
        Ok(true)
    }

    /// Rename `old` to `new` in every writable sub-database that has it.
    ///
    /// A sub-database that already holds `new` (case-insensitively, so a
    /// case-only rename counts) is left untouched. Returns whether anything was renamed.
    pub fn rename_entry(&mut self, old: &str, new: &str, now: i64) -> bool {
        let new = new.trim();
        if new.is_empty() {
            return false;
        }

        let mut renamed = false;
        for sub in self.sub_databases_mut() {
            let Some(pos) = sub.position(old) else {
                continue;
            };
            if sub.contains_key(new) {
                log::warn!(
                    "sheet '{}': cannot rename '{old}' to '{new}', key already exists",
                    sub.sheet_name
                );
                continue;
            }
            let record = &mut sub.records_mut()[pos];
            record.set_key(new);
            record.timestamp = now;
            record.key_changed = true;
            record.changed = true;
            renamed = true;
        }

        if renamed {
            self.mark_local_change(now);
        }
        renamed
    }

    pub fn remove_entry(&mut self, sheet: &str, key: &str, now: i64) -> Result<Record, SyncError> {
        let sub = self
            .sub_database_mut(sheet)
            .ok_or_else(|| SyncError::UnknownSheet(sheet.to_string()))?;
        let record = sub
            .remove_record(key)
            .ok_or_else(|| SyncError::UnknownKey(key.to_string()))?;
        self.mark_local_change(now);
        Ok(record)
    }

    /// Replace the text of one language cell.
    ///
    /// The hook sees the record as it would look after the edit and may
    /// reject it.
    pub fn set_text(
        &mut self,
        sheet: &str,
        key: &str,
        language: &str,
        text: &str,
        hook: &dyn EditHook,
        now: i64,
    ) -> Result<(), SyncError> {
        let record = self.record_for_edit(sheet, key)?;
        let slot = record
            .content
            .iter()
            .position(|c| c.language == language)
            .ok_or_else(|| SyncError::UnknownColumn(language.to_string()))?;
        if record.content[slot].text == text {
            return Ok(());
        }

        let mut candidate = record.clone();
        candidate.content[slot].text = text.to_string();
        if !hook.on_save(&candidate, Some(language)) {
            return Err(SyncError::Rejected(format!("{key} [{language}]")));
        }

        let content = &mut record.content[slot];
        content.text = text.to_string();
        content.changed = true;
        record.changed = true;
        record.timestamp = now;
        self.mark_local_change(now);
        Ok(())
    }

    pub fn set_misc(&mut self, sheet: &str, key: &str, title: &str, text: &str, now: i64) -> Result<(), SyncError> {
        let record = self.record_for_edit(sheet, key)?;
        let misc = record
            .misc
            .iter_mut()
            .find(|m| m.title.eq_ignore_ascii_case(title))
            .ok_or_else(|| SyncError::UnknownColumn(title.to_string()))?;
        if misc.text == text {
            return Ok(());
        }
        misc.text = text.to_string();
        record.changed = true;
        record.timestamp = now;
        self.mark_local_change(now);
        Ok(())
    }

    /// Ask the hook whether `key` may be opened for editing, and enter edit
    /// mode if so. Auto-update is suspended while in edit mode.
    pub fn enter_edit(
        &mut self,
        sheet: &str,
        key: &str,
        language: Option<&str>,
        hook: &dyn EditHook,
    ) -> Result<bool, SyncError> {
        let record = self
            .sub_database(sheet)
            .ok_or_else(|| SyncError::UnknownSheet(sheet.to_string()))?
            .record(key)
            .ok_or_else(|| SyncError::UnknownKey(key.to_string()))?;
        let allowed = hook.on_enter_edit(record, language);
        if allowed {
            self.is_in_edit_mode = true;
        }
        Ok(allowed)
    }

    pub fn leave_edit(&mut self) {
        self.is_in_edit_mode = false;
    }

    pub fn sort(&mut self, sheet: &str, ascending: bool) -> Result<(), SyncError> {
        self.sub_database_mut(sheet)
            .ok_or_else(|| SyncError::UnknownSheet(sheet.to_string()))?
            .sort_by_key(ascending);
        Ok(())
    }

    /// Clear every per-record and per-language change marker.
    pub fn reset_change_flags(&mut self) {
        for sub in self.sub_databases_mut() {
            sub.reset_change_flags();
        }
    }

    /// Languages across writable sub-databases, first-seen order.
    pub fn all_languages(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for language in self.sub_databases().iter().flat_map(|s| s.languages()) {
            if !out.contains(language) {
                out.push(language.clone());
            }
        }
        out
    }

    fn record_for_edit(&mut self, sheet: &str, key: &str) -> Result<&mut Record, SyncError> {
        self.content_mut(sheet)
            .ok_or_else(|| SyncError::UnknownSheet(sheet.to_string()))?
            .record_mut(key)
            .ok_or_else(|| SyncError::UnknownKey(key.to_string()))
    }

    fn mark_local_change(&mut self, now: i64) {
        self.last_modified_local = now;
        self.has_local_changes = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::NoopHook;
    use crate::model::{ColumnLayout, SubDatabase};

    fn sheet(name: &str, languages: &[&str], keys: &[&str]) -> SubDatabase {
        let mut s = SubDatabase::new(name, name);
        s.set_columns(
            languages.iter().map(|l| l.to_string()).collect(),
            vec!["comment".into()],
            ColumnLayout::default(),
        );
        for key in keys {
            s.push_record(Record::new(*key, 1));
        }
        s
    }

    fn db(subs: Vec<SubDatabase>) -> Database {
        Database::from_parts(subs, vec![])
    }

    struct RejectAll;

    impl EditHook for RejectAll {
        fn on_save(&self, _record: &Record, _language: Option<&str>) -> bool {
            false
        }
    }

    #[test]
    fn rename_onto_existing_key_fails_without_mutation() {
        let mut db = db(vec![sheet("Main", &["en"], &["a", "b"])]);
        assert!(!db.rename_entry("a", "B", 50));

        let main = db.sub_database("Main").unwrap();
        let keys: Vec<&str> = main.records().iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(main.record("a").unwrap().timestamp, 1);
        assert!(!db.has_local_changes);
    }

    #[test]
    fn rename_updates_every_sheet_and_indices() {
        let mut db = db(vec![sheet("Main", &["en"], &["a"]), sheet("Menu", &["en"], &["a", "z"])]);
        let before = db.display_index().len();
        assert!(db.rename_entry("A", "renamed", 70));

        for name in ["Main", "Menu"] {
            let sub = db.sub_database(name).unwrap();
            assert!(sub.record("a").is_none());
            let r = sub.record("RENAMED").unwrap();
            assert!(r.key_changed && r.changed);
            assert_eq!(r.timestamp, 70);
        }
        assert_eq!(db.display_index().len(), before);
        assert_eq!(db.display_index().key_at(1), Some("renamed"));
        assert_eq!(db.last_modified_local, 70);
    }

    #[test]
    fn rename_skips_only_colliding_sheet() {
        let mut db = db(vec![sheet("Main", &["en"], &["a", "b"]), sheet("Menu", &["en"], &["a"])]);
        assert!(db.rename_entry("a", "b", 5));
        assert!(db.sub_database("Main").unwrap().record("a").is_some());
        assert!(db.sub_database("Menu").unwrap().record("a").is_none());
        assert!(db.sub_database("Menu").unwrap().record("b").is_some());
    }

    #[test]
    fn rename_to_other_case_of_same_key_is_rejected() {
        let mut db = db(vec![sheet("Main", &["en"], &["greet"])]);
        assert!(!db.rename_entry("greet", "Greet", 5));
        let greet = db.record("greet").unwrap();
        assert_eq!(greet.key(), "greet");
        assert_eq!(greet.timestamp, 1);
        assert!(!greet.key_changed);
        assert!(!db.has_local_changes);
    }

    #[test]
    fn create_goes_to_first_or_named_sheet() {
        let mut db = db(vec![sheet("Main", &["en", "de"], &[]), sheet("Menu", &["en"], &[])]);
        assert!(db.create_entry("greet", None, 10).unwrap());
        assert!(db.create_entry("start", Some("Menu"), 11).unwrap());
        assert!(!db.create_entry("GREET", None, 12).unwrap());
        assert!(!db.create_entry("  ", None, 12).unwrap());

        let greet = db.sub_database("Main").unwrap().record("greet").unwrap();
        assert_eq!(greet.content.len(), 2);
        assert_eq!(greet.misc.len(), 1);
        assert_eq!(greet.timestamp, 10);
        assert!(db.sub_database("Menu").unwrap().contains_key("start"));
        assert_eq!(db.display_index().len(), 3);

        let err = db.create_entry("x", Some("Nope"), 1).unwrap_err();
        assert!(matches!(err, SyncError::UnknownSheet(_)));
        assert!(Database::new().create_entry("x", None, 1).is_err());
    }

    #[test]
    fn set_text_marks_entry_updated() {
        let mut db = db(vec![sheet("Main", &["en", "de"], &["greet"])]);
        db.set_text("Main", "greet", "de", "Hallo", &NoopHook, 99).unwrap();

        let r = db.record("greet").unwrap();
        assert_eq!(r.text("de"), Some("Hallo"));
        assert!(r.content[1].changed);
        assert!(!r.content[0].changed);
        assert!(r.changed);
        assert_eq!(r.timestamp, 99);
        assert!(db.has_local_changes);
        assert_eq!(db.last_modified_local, 99);
    }

    #[test]
    fn set_text_errors_and_rejection() {
        let mut db = db(vec![sheet("Main", &["en"], &["greet"])]);
        assert!(matches!(
            db.set_text("Main", "greet", "fr", "x", &NoopHook, 1),
            Err(SyncError::UnknownColumn(_))
        ));
        assert!(matches!(
            db.set_text("Main", "nope", "en", "x", &NoopHook, 1),
            Err(SyncError::UnknownKey(_))
        ));
        assert!(matches!(
            db.set_text("Main", "greet", "en", "x", &RejectAll, 1),
            Err(SyncError::Rejected(_))
        ));
        assert_eq!(db.record("greet").unwrap().text("en"), Some(""));
        assert!(!db.has_local_changes);
    }

    #[test]
    fn set_misc_and_reset_flags() {
        let mut db = db(vec![sheet("Main", &["en"], &["greet"])]);
        db.set_misc("Main", "greet", "Comment", "lobby", 3).unwrap();
        db.set_text("Main", "greet", "en", "Hi", &NoopHook, 4).unwrap();
        assert_eq!(db.record("greet").unwrap().misc_text("comment"), Some("lobby"));

        db.reset_change_flags();
        let r = db.record("greet").unwrap();
        assert!(!r.changed && !r.content[0].changed);
    }

    #[test]
    fn remove_and_sort() {
        let mut db = db(vec![sheet("Main", &["en"], &["b", "c", "a"])]);
        db.sort("Main", true).unwrap();
        let keys: Vec<&str> = db.sub_database("Main").unwrap().records().iter().map(|r| r.key()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);

        let removed = db.remove_entry("Main", "B", 8).unwrap();
        assert_eq!(removed.key(), "b");
        assert_eq!(db.display_index().len(), 3);
        assert!(db.remove_entry("Main", "b", 9).is_err());
    }

    #[test]
    fn all_languages_first_seen_order() {
        let db = db(vec![sheet("Main", &["en", "de"], &[]), sheet("Menu", &["fr", "en"], &[])]);
        assert_eq!(db.all_languages(), vec!["en", "de", "fr"]);
    }

    #[test]
    fn edit_mode_follows_hook() {
        let mut db = db(vec![sheet("Main", &["en"], &["greet"])]);
        assert!(db.enter_edit("Main", "greet", Some("en"), &NoopHook).unwrap());
        assert!(db.is_in_edit_mode);
        db.leave_edit();
        assert!(!db.is_in_edit_mode);
    }
}
