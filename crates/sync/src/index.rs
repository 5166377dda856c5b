use std::collections::HashMap;

use crate::model::{Record, SubDatabase};

/// Label of the reserved ordinal 0.
pub const NONE_LABEL: &str = "None";

/// Stable hash of the lowercased key. 0 is reserved for "none".
pub fn key_hash(key: &str) -> i32 {
    let digest = blake3::hash(key.to_lowercase().as_bytes());
    let bytes = digest.as_bytes();
    let hash = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    if hash == 0 {
        1
    } else {
        hash
    }
}

/// Build lowercase(key) -> position in a single pass.
///
/// Duplicate keys keep the first position; later ones are logged.
pub fn build_key_index(sheet_name: &str, records: &[Record]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(records.len());
    for (pos, record) in records.iter().enumerate() {
        let lower = record.key().to_lowercase();
        if map.contains_key(&lower) {
            log::warn!(
                "sheet '{sheet_name}': duplicate key '{}' at row {pos}, keeping first occurrence",
                record.key()
            );
            continue;
        }
        map.insert(lower, pos);
    }
    map
}

// ---------------------------------------------------------------------------
// Display index
// ---------------------------------------------------------------------------

/// Ordinal <-> hash <-> key correspondence over all writable sub-databases.
///
/// Ordinal 0 is the "None" sentinel with hash 0. Keys whose hash was already
/// seen (the same key in two sheets, or a collision) are listed once.
#[derive(Debug, Clone, Default)]
pub struct DisplayIndex {
    labels: Vec<String>,
    hashes: Vec<i32>,
    ordinals: HashMap<i32, usize>,
}

impl DisplayIndex {
    pub fn build(sub_databases: &[SubDatabase]) -> Self {
        let mut index = Self {
            labels: vec![NONE_LABEL.to_string()],
            hashes: vec![0],
            ordinals: HashMap::from([(0, 0)]),
        };

        for record in sub_databases.iter().flat_map(|s| s.records()) {
            let hash = record.hash();
            if index.ordinals.contains_key(&hash) {
                log::debug!("display index: hash {hash} of '{}' already listed", record.key());
                continue;
            }
            index.ordinals.insert(hash, index.labels.len());
            index.labels.push(record.key().to_string());
            index.hashes.push(hash);
        }
        index
    }

    /// Keys in ordinal order, starting with the "None" sentinel.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Never empty: the sentinel is always present.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn hash_at(&self, ordinal: usize) -> Option<i32> {
        self.hashes.get(ordinal).copied()
    }

    pub fn key_at(&self, ordinal: usize) -> Option<&str> {
        self.labels.get(ordinal).map(String::as_str)
    }

    /// Ordinal for `hash`, 0 when unknown.
    pub fn ordinal_of(&self, hash: i32) -> usize {
        self.ordinals.get(&hash).copied().unwrap_or(0)
    }

    /// Key for `hash`; `None` for the sentinel and unknown hashes.
    pub fn key_of(&self, hash: i32) -> Option<&str> {
        match self.ordinals.get(&hash) {
            Some(0) | None => None,
            Some(&ordinal) => self.key_at(ordinal),
        }
    }

    /// Hash for a displayed label (exact match), 0 when unknown.
    pub fn hash_of_label(&self, label: &str) -> i32 {
        self.labels
            .iter()
            .position(|l| l == label)
            .and_then(|ordinal| self.hash_at(ordinal))
            .unwrap_or(0)
    }
}
