use crate::model::{Database, Record};

/// A record found by a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub sheet_name: String,
    /// Position in the sub-database at search time.
    pub position: usize,
    pub key: String,
}

impl Database {
    /// Records across writable sub-databases whose key or any text contains
    /// `term`, case-insensitively. Sheet order, then record order.
    pub fn find(&self, term: &str) -> Vec<SearchHit> {
        let needle = term.to_lowercase();
        self.collect_hits(|key, record| {
            key.to_lowercase().contains(&needle) || record.content_contains(None, term)
        })
    }

    /// Records whose key hashes to `hash`.
    pub fn find_by_hash(&self, hash: i32) -> Vec<SearchHit> {
        self.collect_hits(|_, record| record.hash() == hash)
    }

    fn collect_hits(&self, matches: impl Fn(&str, &Record) -> bool) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        for sub in self.sub_databases() {
            for (position, record) in sub.records().iter().enumerate() {
                if matches(record.key(), record) {
                    hits.push(SearchHit {
                        sheet_name: sub.sheet_name.clone(),
                        position,
                        key: record.key().to_string(),
                    });
                }
            }
        }
        hits
    }
}

/// Cursor over search hits with wrap-around stepping.
#[derive(Debug, Clone, Default)]
pub struct Search {
    hits: Vec<SearchHit>,
    cursor: usize,
}

impl Search {
    pub fn by_term(db: &Database, term: &str) -> Self {
        Self::from_hits(db.find(term))
    }

    pub fn by_hash(db: &Database, hash: i32) -> Self {
        Self::from_hits(db.find_by_hash(hash))
    }

    pub fn from_hits(hits: Vec<SearchHit>) -> Self {
        Self { hits, cursor: 0 }
    }

    pub fn hits(&self) -> &[SearchHit] {
        &self.hits
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    pub fn current(&self) -> Option<&SearchHit> {
        self.hits.get(self.cursor)
    }

    /// Step forward, wrapping to the first hit after the last.
    pub fn next_hit(&mut self) -> Option<&SearchHit> {
        if self.hits.is_empty() {
            return None;
        }
        self.cursor = (self.cursor + 1) % self.hits.len();
        self.current()
    }

    /// Step back, wrapping to the last hit before the first.
    pub fn previous_hit(&mut self) -> Option<&SearchHit> {
        if self.hits.is_empty() {
            return None;
        }
        self.cursor = self.cursor.checked_sub(1).unwrap_or(self.hits.len() - 1);
        self.current()
    }
}
