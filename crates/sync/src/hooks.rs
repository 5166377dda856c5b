use crate::model::Record;

/// Project-specific checks plugged into the editing surface.
///
/// Every method defaults to "allow, no styling". The reconciliation engine
/// never calls these; edit operations and the exporter do.
pub trait EditHook {
    /// Whether a record is fit for export.
    fn validate(&self, _record: &Record) -> bool {
        true
    }

    /// Called before an edited text is committed. Returning false rejects it.
    fn on_save(&self, _record: &Record, _language: Option<&str>) -> bool {
        true
    }

    /// Called before an entry is opened for editing.
    fn on_enter_edit(&self, _record: &Record, _language: Option<&str>) -> bool {
        true
    }

    /// Optional display style for a record (e.g. a color name).
    fn style_override(&self, _record: &Record) -> Option<String> {
        None
    }
}

/// The hook used when a project configures none.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl EditHook for NoopHook {}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoEmptyKeys;

    impl EditHook for NoEmptyKeys {
        fn validate(&self, record: &Record) -> bool {
            !record.key().is_empty()
        }

        fn style_override(&self, record: &Record) -> Option<String> {
            (!record.is_complete(None)).then(|| "incomplete".to_string())
        }
    }

    #[test]
    fn noop_allows_everything() {
        let record = Record::new("", 0);
        assert!(NoopHook.validate(&record));
        assert!(NoopHook.on_save(&record, Some("en")));
        assert!(NoopHook.on_enter_edit(&record, None));
        assert_eq!(NoopHook.style_override(&record), None);
    }

    #[test]
    fn overrides_keep_other_defaults() {
        let hook = NoEmptyKeys;
        assert!(!hook.validate(&Record::new("", 0)));
        assert!(hook.on_save(&Record::new("", 0), None));
        let mut record = Record::new("k", 0);
        record.content.push(crate::model::LanguageText::placeholder("en"));
        assert_eq!(hook.style_override(&record).as_deref(), Some("incomplete"));
    }
}
