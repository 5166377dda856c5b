use crate::config::HeaderSettings;
use crate::model::{ColumnLayout, Grid, SubDatabase};

/// Rebuild header + rows from a sub-database for write-back.
///
/// Cells go to the column indices captured at the last pull; the row width
/// is the highest assigned index + 1 and unassigned cells are empty. A
/// sub-database without a usable layout gets a compact one (key, timestamp,
/// languages, miscs).
pub fn to_grid(sub: &SubDatabase, settings: &HeaderSettings) -> Grid {
    let layout = effective_layout(sub);
    let width = layout.last_column().map_or(0, |c| c + 1);

    let mut grid = Vec::with_capacity(sub.len() + 1);

    let mut header = vec![String::new(); width];
    if let Some(c) = layout.key {
        header[c] = settings.key_column.clone();
    }
    if let Some(c) = layout.timestamp {
        header[c] = settings.timestamp_column.clone();
    }
    for (&c, language) in layout.languages.iter().zip(sub.languages()) {
        header[c] = language.clone();
    }
    for (&c, title) in layout.miscs.iter().zip(sub.miscs()) {
        header[c] = title.clone();
    }
    grid.push(header);

    for record in sub.records() {
        let mut row = vec![String::new(); width];
        if let Some(c) = layout.key {
            row[c] = record.key().to_string();
        }
        if let Some(c) = layout.timestamp {
            row[c] = record.timestamp.to_string();
        }
        for (&c, content) in layout.languages.iter().zip(&record.content) {
            row[c] = content.text.clone();
        }
        for (&c, misc) in layout.miscs.iter().zip(&record.misc) {
            row[c] = misc.text.clone();
        }
        grid.push(row);
    }

    grid
}

fn effective_layout(sub: &SubDatabase) -> ColumnLayout {
    let layout = sub.layout();
    let complete = layout.key.is_some()
        && layout.timestamp.is_some()
        && layout.languages.len() == sub.languages().len()
        && layout.miscs.len() == sub.miscs().len();
    if complete {
        return layout.clone();
    }

    log::debug!("sheet '{}': no column layout, writing compact grid", sub.sheet_name);
    let languages_start = 2;
    let miscs_start = languages_start + sub.languages().len();
    ColumnLayout {
        key: Some(0),
        timestamp: Some(1),
        languages: (languages_start..miscs_start).collect(),
        miscs: (miscs_start..miscs_start + sub.miscs().len()).collect(),
    }
}
