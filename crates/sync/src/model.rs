use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::index::{self, DisplayIndex};

/// A grid of cell values. Row 0 is the header.
pub type Grid = Vec<Vec<String>>;

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Localized text for one language column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageText {
    pub language: String,
    pub text: String,
    #[serde(default)]
    pub changed: bool,
}

impl LanguageText {
    pub fn placeholder(language: &str) -> Self {
        Self {
            language: language.to_string(),
            text: String::new(),
            changed: false,
        }
    }
}

/// Free-text metadata for one misc column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiscText {
    pub title: String,
    pub text: String,
}

/// One localization entry.
///
/// The key is private: renames go through [`Database::rename_entry`] so that
/// key indices are invalidated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    key: String,
    /// Milliseconds since epoch of the last edit.
    pub timestamp: i64,
    pub content: Vec<LanguageText>,
    pub misc: Vec<MiscText>,
    pub key_changed: bool,
    pub changed: bool,
}

impl Record {
    pub fn new(key: impl Into<String>, timestamp: i64) -> Self {
        Self {
            key: key.into(),
            timestamp,
            content: Vec::new(),
            misc: Vec::new(),
            key_changed: false,
            changed: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn set_key(&mut self, key: &str) {
        self.key = key.to_string();
    }

    /// Cross-reference identity: hash of the lowercased key.
    /// Changes when the key is renamed.
    pub fn hash(&self) -> i32 {
        index::key_hash(&self.key)
    }

    pub fn text(&self, language: &str) -> Option<&str> {
        self.content
            .iter()
            .find(|c| c.language == language)
            .map(|c| c.text.as_str())
    }

    pub fn misc_text(&self, title: &str) -> Option<&str> {
        self.misc
            .iter()
            .find(|m| m.title.eq_ignore_ascii_case(title))
            .map(|m| m.text.as_str())
    }

    /// Rebuild `content` so it follows `languages` exactly, reusing existing
    /// tuples by language code and inserting empty placeholders for new ones.
    pub fn reorganize_languages(&mut self, languages: &[String]) {
        let mut old = std::mem::take(&mut self.content);
        self.content = languages
            .iter()
            .map(|lang| match old.iter().position(|c| &c.language == lang) {
                Some(pos) => old.remove(pos),
                None => LanguageText::placeholder(lang),
            })
            .collect();
    }

    /// Same as [`Record::reorganize_languages`] for misc columns. Titles match
    /// case-insensitively; repeated titles pair up in column order.
    pub fn reorganize_misc(&mut self, miscs: &[String]) {
        let mut old = std::mem::take(&mut self.misc);
        self.misc = miscs
            .iter()
            .map(|title| {
                match old.iter().position(|m| m.title.to_lowercase() == title.to_lowercase()) {
                    Some(pos) => old.remove(pos),
                    None => MiscText {
                        title: title.clone(),
                        text: String::new(),
                    },
                }
            })
            .collect();
    }

    /// True if every addressed language has non-blank text.
    /// `None` addresses all languages.
    pub fn is_complete(&self, language: Option<&str>) -> bool {
        self.content
            .iter()
            .filter(|c| language.map_or(true, |l| l == c.language))
            .all(|c| !c.text.trim().is_empty())
    }

    /// Case-insensitive substring search over the addressed language texts.
    pub fn content_contains(&self, language: Option<&str>, term: &str) -> bool {
        let term = term.to_lowercase();
        self.content
            .iter()
            .filter(|c| language.map_or(true, |l| l == c.language))
            .any(|c| c.text.to_lowercase().contains(&term))
    }

    pub fn clear_change_flags(&mut self) {
        self.changed = false;
        self.key_changed = false;
        for c in &mut self.content {
            c.changed = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Sub-database
// ---------------------------------------------------------------------------

/// Remote column positions captured at the last pull, used for write-back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub key: Option<usize>,
    pub timestamp: Option<usize>,
    pub languages: Vec<usize>,
    pub miscs: Vec<usize>,
}

impl ColumnLayout {
    /// Highest assigned column index, if any column is assigned.
    pub fn last_column(&self) -> Option<usize> {
        self.key
            .into_iter()
            .chain(self.timestamp)
            .chain(self.languages.iter().copied())
            .chain(self.miscs.iter().copied())
            .max()
    }
}

/// One unit of reconciliation, corresponding to one remote sheet.
///
/// Invariant: every record's `content` follows `languages` and every
/// record's `misc` follows `miscs`.
#[derive(Debug, Clone, Default)]
pub struct SubDatabase {
    /// Stable identity across pulls.
    pub sheet_name: String,
    pub name: String,
    pub is_read_only: bool,
    languages: Vec<String>,
    miscs: Vec<String>,
    layout: ColumnLayout,
    records: Vec<Record>,
    /// lowercase(key) -> position. Cleared on any structural mutation.
    index: OnceLock<HashMap<String, usize>>,
}

impl SubDatabase {
    pub fn new(sheet_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn miscs(&self) -> &[String] {
        &self.miscs
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replace the column schema and reorganize every record to match it.
    pub fn set_columns(&mut self, languages: Vec<String>, miscs: Vec<String>, layout: ColumnLayout) {
        let languages_changed = self.languages != languages;
        let miscs_changed = self.miscs != miscs;
        self.languages = languages;
        self.miscs = miscs;
        self.layout = layout;

        if languages_changed || miscs_changed {
            for record in &mut self.records {
                if languages_changed {
                    record.reorganize_languages(&self.languages);
                }
                if miscs_changed {
                    record.reorganize_misc(&self.miscs);
                }
            }
        }
    }

    /// The key index, rebuilt on first access after invalidation.
    pub fn key_index(&self) -> &HashMap<String, usize> {
        self.index
            .get_or_init(|| index::build_key_index(&self.sheet_name, &self.records))
    }

    pub fn invalidate_index(&mut self) {
        self.index.take();
    }

    pub fn position(&self, key: &str) -> Option<usize> {
        self.key_index().get(&key.to_lowercase()).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn record(&self, key: &str) -> Option<&Record> {
        self.position(key).map(|pos| &self.records[pos])
    }

    /// Mutable access to a record's content. The key stays fixed.
    pub fn record_mut(&mut self, key: &str) -> Option<&mut Record> {
        let pos = self.position(key)?;
        Some(&mut self.records[pos])
    }

    /// Direct access to the record list; the key index is invalidated.
    pub(crate) fn records_mut(&mut self) -> &mut Vec<Record> {
        self.invalidate_index();
        &mut self.records
    }

    /// Swap in a record with the same key (case-insensitive) at `pos`.
    /// The key index stays valid.
    pub(crate) fn replace_at(&mut self, pos: usize, mut record: Record) {
        record.reorganize_languages(&self.languages);
        record.reorganize_misc(&self.miscs);
        self.records[pos] = record;
    }

    pub(crate) fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Append a record, reorganized to the current columns.
    /// Returns false (and leaves the list untouched) if the key already exists.
    pub fn push_record(&mut self, mut record: Record) -> bool {
        if self.contains_key(record.key()) {
            return false;
        }
        record.reorganize_languages(&self.languages);
        record.reorganize_misc(&self.miscs);

        let lower = record.key().to_lowercase();
        self.records.push(record);
        let pos = self.records.len() - 1;
        if let Some(map) = self.index.get_mut() {
            map.insert(lower, pos);
        }
        true
    }

    /// Create an empty record stamped with `now`.
    /// Rejects empty and existing keys.
    pub fn create_record(&mut self, key: &str, now: i64) -> bool {
        if key.is_empty() || self.contains_key(key) {
            return false;
        }
        let mut record = Record::new(key, now);
        record.changed = true;
        self.push_record(record)
    }

    pub fn remove_record(&mut self, key: &str) -> Option<Record> {
        let pos = self.position(key)?;
        Some(self.records_mut().remove(pos))
    }

    pub fn sort_by_key(&mut self, ascending: bool) {
        let records = self.records_mut();
        if ascending {
            records.sort_by(|a, b| a.key.cmp(&b.key));
        } else {
            records.sort_by(|a, b| b.key.cmp(&a.key));
        }
    }

    /// Records whose key or addressed content contains `term`
    /// (case-insensitive). With `empty_only`, only incomplete records.
    pub fn filter(&self, term: &str, empty_only: bool, language: Option<&str>) -> Vec<&Record> {
        let needle = term.to_lowercase();
        self.records
            .iter()
            .filter(|r| r.key.to_lowercase().contains(&needle) || r.content_contains(language, term))
            .filter(|r| !empty_only || !r.is_complete(language))
            .collect()
    }

    pub fn reset_change_flags(&mut self) {
        for record in &mut self.records {
            record.clear_change_flags();
        }
    }
}

// ---------------------------------------------------------------------------
// Database
// ---------------------------------------------------------------------------

/// Top-level local state: writable and read-only sub-databases plus sync
/// watermarks.
#[derive(Debug, Clone, Default)]
pub struct Database {
    sub_databases: Vec<SubDatabase>,
    pub read_only: Vec<SubDatabase>,
    /// Remote modification time observed at the last successful pull.
    pub last_modified_online: i64,
    pub last_modified_local: i64,
    pub has_online_changes: bool,
    pub has_local_changes: bool,
    pub is_in_edit_mode: bool,
    display: OnceLock<DisplayIndex>,
}

impl Database {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(sub_databases: Vec<SubDatabase>, read_only: Vec<SubDatabase>) -> Self {
        Self {
            sub_databases,
            read_only,
            ..Self::default()
        }
    }

    pub fn sub_databases(&self) -> &[SubDatabase] {
        &self.sub_databases
    }

    pub fn sub_database(&self, sheet_name: &str) -> Option<&SubDatabase> {
        self.sub_databases.iter().find(|s| s.sheet_name == sheet_name)
    }

    /// Mutable access invalidates the display index up front.
    pub fn sub_database_mut(&mut self, sheet_name: &str) -> Option<&mut SubDatabase> {
        self.invalidate_display_index();
        self.sub_databases.iter_mut().find(|s| s.sheet_name == sheet_name)
    }

    /// Mutable access for edits that leave keys and record order untouched.
    pub(crate) fn content_mut(&mut self, sheet_name: &str) -> Option<&mut SubDatabase> {
        self.sub_databases.iter_mut().find(|s| s.sheet_name == sheet_name)
    }

    pub(crate) fn sub_databases_mut(&mut self) -> &mut Vec<SubDatabase> {
        self.invalidate_display_index();
        &mut self.sub_databases
    }

    pub fn is_empty(&self) -> bool {
        self.sub_databases.is_empty()
    }

    /// First record with this key across writable sub-databases.
    pub fn record(&self, key: &str) -> Option<&Record> {
        self.sub_databases.iter().find_map(|s| s.record(key))
    }

    pub fn display_index(&self) -> &DisplayIndex {
        self.display
            .get_or_init(|| DisplayIndex::build(&self.sub_databases))
    }

    pub fn invalidate_display_index(&mut self) {
        self.display.take();
    }

    /// Forget all local state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(key: &str, texts: &[(&str, &str)]) -> Record {
        let mut r = Record::new(key, 100);
        r.content = texts
            .iter()
            .map(|(lang, text)| LanguageText {
                language: lang.to_string(),
                text: text.to_string(),
                changed: false,
            })
            .collect();
        r
    }

    fn langs(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn reorganize_inserts_placeholder_in_list_order() {
        let mut r = record("greet", &[("en", "Hello"), ("de", "Hallo")]);
        r.reorganize_languages(&langs(&["en", "fr", "de"]));
        let texts: Vec<&str> = r.content.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["Hello", "", "Hallo"]);
        assert_eq!(r.content[1].language, "fr");
    }

    #[test]
    fn reorganize_drops_removed_and_reorders() {
        let mut r = record("greet", &[("en", "Hello"), ("de", "Hallo"), ("fr", "Salut")]);
        r.content[2].changed = true;
        r.reorganize_languages(&langs(&["fr", "en"]));
        assert_eq!(r.content.len(), 2);
        assert_eq!(r.content[0].text, "Salut");
        assert!(r.content[0].changed);
        assert_eq!(r.content[1].text, "Hello");
    }

    #[test]
    fn reorganize_misc_matches_titles_case_insensitively() {
        let mut r = Record::new("k", 1);
        r.misc = vec![MiscText { title: "Comment".into(), text: "ctx".into() }];
        r.reorganize_misc(&langs(&["notes", "comment"]));
        assert_eq!(r.misc[0].text, "");
        assert_eq!(r.misc[1].text, "ctx");
        assert_eq!(r.misc[1].title, "Comment");
    }

    #[test]
    fn reorganize_misc_keeps_repeated_titles_in_order() {
        let titles = langs(&["note", "note", "x", "note"]);
        let mut r = Record::new("k", 1);
        r.misc = ["n1", "n2", "xx", "n3"]
            .iter()
            .zip(&titles)
            .map(|(text, title)| MiscText { title: title.clone(), text: text.to_string() })
            .collect();
        let before = r.clone();

        r.reorganize_misc(&titles);
        assert_eq!(r, before);
    }

    #[test]
    fn completeness_per_language() {
        let r = record("k", &[("en", "Hi"), ("de", "  ")]);
        assert!(r.is_complete(Some("en")));
        assert!(!r.is_complete(Some("de")));
        assert!(!r.is_complete(None));
    }

    #[test]
    fn key_lookup_is_case_insensitive() {
        let mut sub = SubDatabase::new("Main", "Main");
        assert!(sub.push_record(Record::new("Menu.Title", 1)));
        assert_eq!(sub.position("menu.title"), Some(0));
        assert!(!sub.push_record(Record::new("MENU.TITLE", 2)));
        assert_eq!(sub.len(), 1);
    }

    #[test]
    fn index_follows_sort_and_remove() {
        let mut sub = SubDatabase::new("Main", "Main");
        for key in ["c", "a", "b"] {
            sub.push_record(Record::new(key, 1));
        }
        sub.sort_by_key(true);
        assert_eq!(sub.position("a"), Some(0));
        assert_eq!(sub.position("c"), Some(2));

        sub.remove_record("a");
        assert_eq!(sub.position("b"), Some(0));
        assert_eq!(sub.position("a"), None);
    }

    #[test]
    fn set_columns_keeps_invariant() {
        let mut sub = SubDatabase::new("Main", "Main");
        sub.set_columns(langs(&["en"]), vec![], ColumnLayout::default());
        sub.push_record(record("greet", &[("en", "Hi")]));
        sub.set_columns(langs(&["en", "de"]), langs(&["comment"]), ColumnLayout::default());

        let r = sub.record("greet").unwrap();
        assert_eq!(r.content.len(), 2);
        assert_eq!(r.text("en"), Some("Hi"));
        assert_eq!(r.text("de"), Some(""));
        assert_eq!(r.misc.len(), 1);
    }

    #[test]
    fn filter_matches_key_or_content() {
        let mut sub = SubDatabase::new("Main", "Main");
        sub.set_columns(langs(&["en"]), vec![], ColumnLayout::default());
        sub.push_record(record("menu.start", &[("en", "Start game")]));
        sub.push_record(record("menu.quit", &[("en", "")]));

        assert_eq!(sub.filter("GAME", false, None).len(), 1);
        assert_eq!(sub.filter("menu", false, None).len(), 2);
        let empty = sub.filter("menu", true, Some("en"));
        assert_eq!(empty.len(), 1);
        assert_eq!(empty[0].key(), "menu.quit");
    }

    #[test]
    fn layout_last_column() {
        let layout = ColumnLayout {
            key: Some(0),
            timestamp: Some(5),
            languages: vec![1, 2],
            miscs: vec![7],
        };
        assert_eq!(layout.last_column(), Some(7));
        assert_eq!(ColumnLayout::default().last_column(), None);
    }

    fn arb_codes() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::hash_set("[a-z]{2}", 0..6).prop_map(|s| s.into_iter().collect())
    }

    proptest! {
        #[test]
        fn reorganize_is_idempotent(codes in arb_codes(), target in arb_codes()) {
            let mut r = Record::new("k", 1);
            r.content = codes
                .iter()
                .enumerate()
                .map(|(i, c)| LanguageText { language: c.clone(), text: format!("t{i}"), changed: i % 2 == 0 })
                .collect();

            let mut same = r.clone();
            same.reorganize_languages(&codes);
            prop_assert_eq!(&same, &r);

            r.reorganize_languages(&target);
            let once = r.clone();
            r.reorganize_languages(&target);
            prop_assert_eq!(&r, &once);
        }

        #[test]
        fn reorganize_never_moves_text_between_languages(codes in arb_codes(), target in arb_codes()) {
            let mut r = Record::new("k", 1);
            r.content = codes
                .iter()
                .map(|c| LanguageText { language: c.clone(), text: format!("text-{c}"), changed: false })
                .collect();
            r.reorganize_languages(&target);

            prop_assert_eq!(r.content.len(), target.len());
            for (slot, lang) in r.content.iter().zip(&target) {
                prop_assert_eq!(&slot.language, lang);
                if codes.contains(lang) {
                    prop_assert_eq!(slot.text.clone(), format!("text-{lang}"));
                } else {
                    prop_assert!(slot.text.is_empty());
                }
            }
        }
    }
}
