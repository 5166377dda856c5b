use crate::config::HeaderSettings;
use crate::error::SyncError;
use crate::header::{HeaderClassification, HeaderClassifier};
use crate::model::{LanguageText, MiscText, Record, SubDatabase};

/// How a grid is turned into a sub-database.
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Require a timestamp column (writable sheets do, read-only ones don't).
    pub use_timestamp: bool,
    /// Timestamp given to rows that carry none.
    pub now: i64,
}

/// Extract a full grid (row 0 = header) into a sub-database.
///
/// `Ok(None)` for an empty or header-only grid. A header lacking a
/// required column is an error for this sheet only.
pub fn extract_sub_database(
    sheet_name: &str,
    grid: &[Vec<String>],
    settings: &HeaderSettings,
    options: ExtractOptions,
) -> Result<Option<SubDatabase>, SyncError> {
    let Some((header_row, rows)) = grid.split_first() else {
        return Ok(None);
    };
    if rows.is_empty() {
        return Ok(None);
    }

    let header = HeaderClassifier::new(settings).classify(header_row);
    header.validate(sheet_name, options.use_timestamp, settings)?;

    let mut sub = empty_sub_database(sheet_name, &header);
    for (offset, row) in rows.iter().enumerate() {
        let Some(record) = extract_record(&header, row, options.now) else {
            log::debug!("sheet '{sheet_name}': row {} has no key, skipped", offset + 1);
            continue;
        };
        push_first_wins(&mut sub, record, offset + 1);
    }

    Ok(Some(sub))
}

/// Extract keys only: `keys` is the key column (row 0 = header cell), and
/// `header_row` the full header used for the column schema. Records get
/// timestamp 0 and placeholder content.
pub fn extract_keys(
    sheet_name: &str,
    header_row: &[String],
    keys: &[Vec<String>],
    settings: &HeaderSettings,
    use_timestamp: bool,
) -> Result<Option<SubDatabase>, SyncError> {
    let header = HeaderClassifier::new(settings).classify(header_row);
    header.validate(sheet_name, use_timestamp, settings)?;

    if keys.len() <= 1 {
        return Ok(None);
    }

    let mut sub = empty_sub_database(sheet_name, &header);
    for (offset, row) in keys.iter().enumerate().skip(1) {
        let key = row.first().map(|k| k.trim()).unwrap_or_default();
        if key.is_empty() {
            continue;
        }
        push_first_wins(&mut sub, Record::new(key, 0), offset);
    }

    Ok(Some(sub))
}

fn empty_sub_database(sheet_name: &str, header: &HeaderClassification) -> SubDatabase {
    let mut sub = SubDatabase::new(sheet_name, sheet_name);
    sub.set_columns(header.language_codes(), header.misc_titles(), header.layout());
    sub
}

fn push_first_wins(sub: &mut SubDatabase, record: Record, row: usize) {
    let key = record.key().to_string();
    if !sub.push_record(record) {
        log::warn!(
            "sheet '{}': duplicate key '{key}' at row {row}, keeping first occurrence",
            sub.sheet_name
        );
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(String::as_str).unwrap_or("")
}

/// One data row to a record. `None` when the key cell is empty.
fn extract_record(header: &HeaderClassification, row: &[String], now: i64) -> Option<Record> {
    let key = cell(row, header.key_column?).trim();
    if key.is_empty() {
        return None;
    }

    let timestamp = header
        .timestamp_column
        .and_then(|column| row.get(column))
        .and_then(|value| value.trim().parse::<i64>().ok())
        .unwrap_or(now);

    let mut record = Record::new(key, timestamp);
    record.content = header
        .languages
        .iter()
        .map(|l| LanguageText {
            language: l.language.clone(),
            text: cell(row, l.column).to_string(),
            changed: false,
        })
        .collect();
    record.misc = header
        .miscs
        .iter()
        .map(|m| MiscText {
            title: m.title.clone(),
            text: cell(row, m.column).to_string(),
        })
        .collect();
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    fn opts() -> ExtractOptions {
        ExtractOptions {
            use_timestamp: true,
            now: NOW,
        }
    }

    #[test]
    fn extracts_records_in_row_order() {
        let g = grid(&[
            &["key", "*timestamp", "en", "de", "comment"],
            &["greet", "100", "Hello", "Hallo", "lobby"],
            &["bye", "200", "Bye", "Tschüss", ""],
        ]);
        let sub = extract_sub_database("Main", &g, &HeaderSettings::default(), opts())
            .unwrap()
            .unwrap();

        assert_eq!(sub.languages(), &["en", "de"]);
        assert_eq!(sub.miscs(), &["comment"]);
        assert_eq!(sub.layout().timestamp, Some(1));
        assert_eq!(sub.len(), 2);

        let greet = &sub.records()[0];
        assert_eq!(greet.key(), "greet");
        assert_eq!(greet.timestamp, 100);
        assert_eq!(greet.text("de"), Some("Hallo"));
        assert_eq!(greet.misc_text("comment"), Some("lobby"));
    }

    #[test]
    fn short_rows_get_empty_cells_and_now() {
        let g = grid(&[&["key", "en", "*timestamp"], &["greet"]]);
        let sub = extract_sub_database("Main", &g, &HeaderSettings::default(), opts())
            .unwrap()
            .unwrap();
        let r = &sub.records()[0];
        assert_eq!(r.text("en"), Some(""));
        assert_eq!(r.timestamp, NOW);
    }

    #[test]
    fn unparseable_timestamp_means_now() {
        let g = grid(&[&["key", "*timestamp"], &["a", "yesterday"], &["b", ""]]);
        let sub = extract_sub_database("Main", &g, &HeaderSettings::default(), opts())
            .unwrap()
            .unwrap();
        assert!(sub.records().iter().all(|r| r.timestamp == NOW));
    }

    #[test]
    fn timestamp_in_first_column_is_read() {
        let g = grid(&[&["*timestamp", "key"], &["42", "a"]]);
        let sub = extract_sub_database("Main", &g, &HeaderSettings::default(), opts())
            .unwrap()
            .unwrap();
        assert_eq!(sub.records()[0].timestamp, 42);
    }

    #[test]
    fn empty_and_header_only_grids_yield_nothing() {
        let settings = HeaderSettings::default();
        assert!(extract_sub_database("Main", &[], &settings, opts()).unwrap().is_none());
        let g = grid(&[&["key", "*timestamp", "en"]]);
        assert!(extract_sub_database("Main", &g, &settings, opts()).unwrap().is_none());
    }

    #[test]
    fn missing_timestamp_column_fails_only_when_required() {
        let settings = HeaderSettings::default();
        let g = grid(&[&["key", "en"], &["greet", "Hi"]]);
        let err = extract_sub_database("Main", &g, &settings, opts()).unwrap_err();
        assert!(matches!(err, SyncError::MissingColumn { .. }));

        let read_only = ExtractOptions { use_timestamp: false, now: NOW };
        let sub = extract_sub_database("Main", &g, &settings, read_only).unwrap().unwrap();
        assert_eq!(sub.records()[0].timestamp, NOW);
    }

    #[test]
    fn duplicate_keys_keep_first_row() {
        let g = grid(&[
            &["key", "*timestamp", "en"],
            &["greet", "1", "first"],
            &["GREET", "9", "second"],
            &["", "5", "blank row"],
        ]);
        let sub = extract_sub_database("Main", &g, &HeaderSettings::default(), opts())
            .unwrap()
            .unwrap();
        assert_eq!(sub.len(), 1);
        assert_eq!(sub.records()[0].text("en"), Some("first"));
    }

    #[test]
    fn repeated_misc_titles_survive_write_back() {
        let g = grid(&[
            &["key", "*timestamp", "note", "note", "x", "note"],
            &["k", "5", "n1", "n2", "xx", "n3"],
        ]);
        let settings = HeaderSettings::default();
        let sub = extract_sub_database("Main", &g, &settings, opts()).unwrap().unwrap();

        let texts: Vec<&str> = sub.records()[0].misc.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["n1", "n2", "xx", "n3"]);
        assert_eq!(crate::serialize::to_grid(&sub, &settings), g);
    }

    #[test]
    fn key_only_extraction() {
        let header = grid(&[&["key", "*timestamp", "en", "notes"]]).remove(0);
        let keys = grid(&[&["key"], &["a"], &["b"], &[]]);
        let sub = extract_keys("Main", &header, &keys, &HeaderSettings::default(), true)
            .unwrap()
            .unwrap();
        assert_eq!(sub.len(), 2);
        let b = sub.record("b").unwrap();
        assert_eq!(b.timestamp, 0);
        assert_eq!(b.content.len(), 1);
        assert_eq!(b.misc.len(), 1);
    }
}
