use std::collections::HashSet;

use serde::Deserialize;

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub header: HeaderSettings,
    #[serde(default)]
    pub remote: RemoteSettings,
    #[serde(default)]
    pub read_only: Vec<ReadOnlySource>,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub poll: PollSettings,
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Names of the control columns. Matched case-insensitively.
#[derive(Debug, Clone, Deserialize)]
pub struct HeaderSettings {
    #[serde(default = "default_key_column")]
    pub key_column: String,
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
}

impl Default for HeaderSettings {
    fn default() -> Self {
        Self {
            key_column: default_key_column(),
            timestamp_column: default_timestamp_column(),
        }
    }
}

fn default_key_column() -> String {
    "key".into()
}

fn default_timestamp_column() -> String {
    "*timestamp".into()
}

// ---------------------------------------------------------------------------
// Remote
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteSettings {
    /// Source id of the writable spreadsheet.
    #[serde(default)]
    pub spreadsheet: String,
    #[serde(default = "default_sheets")]
    pub sheets: Vec<String>,
    /// Endpoint answering the remote modification time in milliseconds.
    #[serde(default)]
    pub modified_url: Option<String>,
    /// Endpoint notified after a successful push.
    #[serde(default)]
    pub mark_changed_url: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            spreadsheet: String::new(),
            sheets: default_sheets(),
            modified_url: None,
            mark_changed_url: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_sheets() -> Vec<String> {
    vec!["Main".into()]
}

fn default_timeout_ms() -> u64 {
    10_000
}

/// A spreadsheet pulled for reference only; never merged or pushed.
#[derive(Debug, Clone, Deserialize)]
pub struct ReadOnlySource {
    pub name: String,
    pub spreadsheet: String,
    pub sheets: Vec<String>,
}

// ---------------------------------------------------------------------------
// Export + Poll
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_destination")]
    pub destination: String,
    #[serde(default = "default_editor_destination")]
    pub editor_destination: String,
    /// Language tags left out of the runtime export.
    #[serde(default)]
    pub ignored_languages: Vec<String>,
    /// Delete previously exported files of ignored languages.
    #[serde(default = "default_true")]
    pub remove_ignored: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            destination: default_destination(),
            editor_destination: default_editor_destination(),
            ignored_languages: Vec::new(),
            remove_ignored: true,
        }
    }
}

fn default_destination() -> String {
    "Package/Languages".into()
}

fn default_editor_destination() -> String {
    "PackageEditor/Languages".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollSettings {
    #[serde(default = "default_check_modified_ms")]
    pub check_modified_ms: u64,
    #[serde(default = "default_check_update_ms")]
    pub check_update_ms: u64,
    #[serde(default)]
    pub auto_update: bool,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            check_modified_ms: default_check_modified_ms(),
            check_update_ms: default_check_update_ms(),
            auto_update: false,
        }
    }
}

fn default_check_modified_ms() -> u64 {
    1_000
}

fn default_check_update_ms() -> u64 {
    120_000
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl SyncConfig {
    pub fn from_toml(input: &str) -> Result<Self, SyncError> {
        let config: SyncConfig =
            toml::from_str(input).map_err(|e| SyncError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        let key = self.header.key_column.trim();
        let timestamp = self.header.timestamp_column.trim();
        if key.is_empty() || timestamp.is_empty() {
            return Err(SyncError::ConfigValidation(
                "key and timestamp column names must not be empty".into(),
            ));
        }
        if key.eq_ignore_ascii_case(timestamp) {
            return Err(SyncError::ConfigValidation(format!(
                "key and timestamp columns share the name '{key}'"
            )));
        }

        validate_sheets("remote", &self.remote.sheets)?;

        for source in &self.read_only {
            if source.spreadsheet.trim().is_empty() {
                return Err(SyncError::ConfigValidation(format!(
                    "read-only source '{}': spreadsheet must not be empty",
                    source.name
                )));
            }
            validate_sheets(&source.name, &source.sheets)?;
        }

        if self.poll.check_modified_ms == 0 || self.poll.check_update_ms == 0 {
            return Err(SyncError::ConfigValidation(
                "poll intervals must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

fn validate_sheets(owner: &str, sheets: &[String]) -> Result<(), SyncError> {
    let mut seen = HashSet::new();
    for sheet in sheets {
        if sheet.trim().is_empty() {
            return Err(SyncError::ConfigValidation(format!(
                "{owner}: sheet names must not be empty"
            )));
        }
        if !seen.insert(sheet.as_str()) {
            return Err(SyncError::ConfigValidation(format!(
                "{owner}: sheet '{sheet}' listed twice"
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
[header]
key_column = "Key"
timestamp_column = "*timestamp"

[remote]
spreadsheet = "loca"
sheets = ["Main", "Menus"]
modified_url = "https://example.invalid/modified"
timeout_ms = 2500

[[read_only]]
name = "Shared"
spreadsheet = "shared"
sheets = ["Terms"]

[export]
destination = "out/runtime"
ignored_languages = ["en-XA"]
remove_ignored = false

[poll]
check_update_ms = 60000
auto_update = true
"#;

    #[test]
    fn parse_full() {
        let config = SyncConfig::from_toml(FULL).unwrap();
        assert_eq!(config.header.key_column, "Key");
        assert_eq!(config.remote.sheets, vec!["Main", "Menus"]);
        assert_eq!(config.remote.timeout_ms, 2500);
        assert_eq!(config.read_only.len(), 1);
        assert_eq!(config.read_only[0].sheets, vec!["Terms"]);
        assert_eq!(config.export.destination, "out/runtime");
        assert_eq!(config.export.editor_destination, "PackageEditor/Languages");
        assert!(!config.export.remove_ignored);
        assert_eq!(config.poll.check_modified_ms, 1000);
        assert!(config.poll.auto_update);
    }

    #[test]
    fn empty_input_uses_defaults() {
        let config = SyncConfig::from_toml("").unwrap();
        assert_eq!(config.header.key_column, "key");
        assert_eq!(config.header.timestamp_column, "*timestamp");
        assert_eq!(config.remote.sheets, vec!["Main"]);
        assert!(config.export.remove_ignored);
        assert!(!config.poll.auto_update);
    }

    #[test]
    fn reject_duplicate_sheet() {
        let err = SyncConfig::from_toml("[remote]\nsheets = [\"Main\", \"Main\"]\n").unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn reject_shared_control_column_name() {
        let input = "[header]\nkey_column = \"id\"\ntimestamp_column = \"ID\"\n";
        let err = SyncConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("share the name"));
    }

    #[test]
    fn reject_zero_interval() {
        let err = SyncConfig::from_toml("[poll]\ncheck_modified_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("greater than zero"));
    }

    #[test]
    fn reject_unparseable() {
        let err = SyncConfig::from_toml("[remote\n").unwrap_err();
        assert!(matches!(err, SyncError::ConfigParse(_)));
    }
}
