use std::collections::HashSet;

use crate::model::{Database, SubDatabase};

/// What a merge did, for logging and status output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub sheets_added: usize,
    pub sheets_removed: usize,
    pub sheets_merged: usize,
    pub schema_changes: usize,
    pub records_added: usize,
    pub records_replaced: usize,
    pub records_kept: usize,
    pub records_removed: usize,
    /// Incoming records unknown locally but not newer than the watermark.
    pub records_ignored: usize,
    /// Watermark after the merge.
    pub watermark: i64,
}

/// Merge freshly extracted sub-databases into the persisted database.
///
/// Sub-databases are matched by sheet name. Persisted ones with no
/// counterpart are dropped, matched ones are merged in place (the persisted
/// instance survives), new ones are inserted as-is. Decisions use the
/// current `last_modified_online` watermark; `observed_remote`, when given,
/// becomes the new watermark. Clears `has_online_changes`.
pub fn merge_database(
    db: &mut Database,
    incoming: Vec<SubDatabase>,
    observed_remote: Option<i64>,
) -> MergeReport {
    let watermark = db.last_modified_online;
    let mut report = MergeReport::default();

    let subs = db.sub_databases_mut();
    let before = subs.len();
    subs.retain(|s| incoming.iter().any(|n| n.sheet_name == s.sheet_name));
    report.sheets_removed = before - subs.len();

    for new_sub in incoming {
        match subs.iter_mut().find(|s| s.sheet_name == new_sub.sheet_name) {
            Some(existing) => {
                merge_sub_database(existing, new_sub, watermark, &mut report);
                report.sheets_merged += 1;
            }
            None => {
                report.sheets_added += 1;
                report.records_added += new_sub.len();
                subs.push(new_sub);
            }
        }
    }

    if let Some(remote) = observed_remote {
        db.last_modified_online = remote;
    }
    db.has_online_changes = false;
    report.watermark = db.last_modified_online;

    log::info!(
        "merge: +{} sheet(s), -{} sheet(s), records +{} ~{} ={} -{} (ignored {})",
        report.sheets_added,
        report.sheets_removed,
        report.records_added,
        report.records_replaced,
        report.records_kept,
        report.records_removed,
        report.records_ignored,
    );
    report
}

/// Record-level merge of one pulled sheet into its persisted counterpart.
///
/// - The persisted sub-database adopts the pulled column schema; local
///   records are reorganized when languages or miscs changed.
/// - Local records missing from the pull are dropped only if they were last
///   edited before the watermark.
/// - Unknown incoming keys are accepted only if newer than the watermark.
/// - Known keys: the strictly newer timestamp wins, ties keep local.
pub fn merge_sub_database(
    local: &mut SubDatabase,
    incoming: SubDatabase,
    watermark: i64,
    report: &mut MergeReport,
) {
    let languages_changed = local.languages() != incoming.languages();
    let miscs_changed = local.miscs() != incoming.miscs();
    if languages_changed || miscs_changed {
        report.schema_changes += 1;
        log::debug!(
            "sheet '{}': column schema changed (languages: {languages_changed}, miscs: {miscs_changed})",
            local.sheet_name
        );
    }

    local.name = incoming.name.clone();
    local.is_read_only = incoming.is_read_only;
    local.set_columns(
        incoming.languages().to_vec(),
        incoming.miscs().to_vec(),
        incoming.layout().clone(),
    );

    let incoming_keys: HashSet<String> = incoming
        .records()
        .iter()
        .map(|r| r.key().to_lowercase())
        .collect();

    let records = local.records_mut();
    let before = records.len();
    records.retain(|r| incoming_keys.contains(&r.key().to_lowercase()) || r.timestamp >= watermark);
    report.records_removed += before - records.len();

    for record in incoming.into_records() {
        match local.position(record.key()) {
            None => {
                if record.timestamp > watermark {
                    local.push_record(record);
                    report.records_added += 1;
                } else {
                    report.records_ignored += 1;
                }
            }
            Some(pos) => {
                if local.records()[pos].timestamp < record.timestamp {
                    local.replace_at(pos, record);
                    report.records_replaced += 1;
                } else {
                    report.records_kept += 1;
                }
            }
        }
    }
}
