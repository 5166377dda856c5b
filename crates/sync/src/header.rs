use crate::config::HeaderSettings;
use crate::error::SyncError;
use crate::locale::{locale_table, LocaleTable};
use crate::model::ColumnLayout;

/// A header column resolved to a language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageColumn {
    pub column: usize,
    pub language: String,
}

/// A header column that is neither a control column nor a language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiscColumn {
    pub column: usize,
    pub title: String,
}

/// Semantic roles of one header row. Only valid for the row it was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderClassification {
    pub key_column: Option<usize>,
    pub timestamp_column: Option<usize>,
    pub languages: Vec<LanguageColumn>,
    pub miscs: Vec<MiscColumn>,
}

impl HeaderClassification {
    /// Fails with the first missing required column.
    pub fn validate(
        &self,
        sheet: &str,
        use_timestamp: bool,
        settings: &HeaderSettings,
    ) -> Result<(), SyncError> {
        if self.key_column.is_none() {
            return Err(SyncError::MissingColumn {
                sheet: sheet.to_string(),
                column: settings.key_column.clone(),
            });
        }
        if use_timestamp && self.timestamp_column.is_none() {
            return Err(SyncError::MissingColumn {
                sheet: sheet.to_string(),
                column: settings.timestamp_column.clone(),
            });
        }
        Ok(())
    }

    pub fn language_codes(&self) -> Vec<String> {
        self.languages.iter().map(|l| l.language.clone()).collect()
    }

    pub fn misc_titles(&self) -> Vec<String> {
        self.miscs.iter().map(|m| m.title.clone()).collect()
    }

    pub fn layout(&self) -> ColumnLayout {
        ColumnLayout {
            key: self.key_column,
            timestamp: self.timestamp_column,
            languages: self.languages.iter().map(|l| l.column).collect(),
            miscs: self.miscs.iter().map(|m| m.column).collect(),
        }
    }
}

/// Turns a header row into column roles.
pub struct HeaderClassifier<'a> {
    settings: &'a HeaderSettings,
    locales: &'static LocaleTable,
}

impl<'a> HeaderClassifier<'a> {
    pub fn new(settings: &'a HeaderSettings) -> Self {
        Self {
            settings,
            locales: locale_table(),
        }
    }

    pub fn classify(&self, row: &[String]) -> HeaderClassification {
        let key_name = self.settings.key_column.trim().to_lowercase();
        let timestamp_name = self.settings.timestamp_column.trim().to_lowercase();
        let mut result = HeaderClassification::default();

        for (column, cell) in row.iter().enumerate() {
            let normalized = cell.trim().to_lowercase();
            if normalized.is_empty() {
                continue;
            }

            if normalized == key_name {
                if result.key_column.is_none() {
                    result.key_column = Some(column);
                } else {
                    log::warn!("duplicate key column '{cell}' at {column} ignored");
                }
                continue;
            }

            if normalized == timestamp_name {
                if result.timestamp_column.is_none() {
                    result.timestamp_column = Some(column);
                } else {
                    log::warn!("duplicate timestamp column '{cell}' at {column} ignored");
                }
                continue;
            }

            match self.locales.resolve(cell) {
                Some(language) => {
                    if result.languages.iter().any(|l| l.language == language) {
                        log::warn!("duplicate language '{language}' in header at column {column}, skipped");
                    } else {
                        result.languages.push(LanguageColumn { column, language });
                    }
                }
                None => result.miscs.push(MiscColumn {
                    column,
                    title: cell.clone(),
                }),
            }
        }

        result
    }
}
