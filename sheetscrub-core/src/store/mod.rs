//! Translation table: content signatures and client tokens mapped to display names

mod csv_table;
mod sheet_table;

pub use csv_table::CsvTable;
pub use sheet_table::{SheetTable, TABLE_TITLE};

use crate::error::StoreError;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// One row of the persisted table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Content signature or source file name
    pub key: String,
    /// Display name; blank for placeholder rows
    pub name: String,
    pub skip: bool,
}

impl TableRow {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            skip: false,
        }
    }

    pub fn placeholder(key: impl Into<String>) -> Self {
        Self::new(key, "")
    }

    /// Parse the skip column. Only "y" (any case) marks a skip.
    pub fn parse_skip(raw: &str) -> bool {
        raw.trim().eq_ignore_ascii_case("y")
    }
}

/// Storage behind a [`TranslationStore`]. Rows are only ever appended.
pub trait TableBackend {
    fn load(&mut self) -> Result<Vec<TableRow>, StoreError>;
    fn append(&mut self, row: &TableRow) -> Result<(), StoreError>;
}

/// Key to name mapping, read at startup and extended during the run
pub struct TranslationStore<'a> {
    backend: Box<dyn TableBackend + 'a>,
    names: HashMap<String, String>,
    skipped: HashSet<String>,
    listed: HashSet<String>,
}

impl<'a> TranslationStore<'a> {
    /// Load every row from the backend
    pub fn open(mut backend: impl TableBackend + 'a) -> Result<Self, StoreError> {
        let rows = backend.load()?;
        let mut names: HashMap<String, String> = HashMap::new();
        let mut skipped = HashSet::new();
        let mut listed = HashSet::new();

        for row in rows {
            let key = row.key.trim().to_string();
            if key.is_empty() {
                continue;
            }
            listed.insert(key.clone());
            if row.skip {
                skipped.insert(key.clone());
            }

            let name = row.name.trim();
            if name.is_empty() {
                continue;
            }
            match names.get(&key) {
                Some(existing) if existing != name => {
                    return Err(StoreError::DuplicateSignature {
                        key,
                        existing: existing.clone(),
                        attempted: name.to_string(),
                    });
                }
                Some(_) => {}
                None => {
                    names.insert(key, name.to_string());
                }
            }
        }

        debug!(entries = names.len(), skipped = skipped.len(), "translation table loaded");
        Ok(Self {
            backend: Box::new(backend),
            names,
            skipped,
            listed,
        })
    }

    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.names.get(key.trim()).map(String::as_str)
    }

    pub fn is_skipped(&self, key: &str) -> bool {
        self.skipped.contains(key.trim())
    }

    /// True when the table has any row for the key, placeholders included
    pub fn is_listed(&self, key: &str) -> bool {
        self.listed.contains(key.trim())
    }

    /// Record a name for an unseen key. Recording the same name again is a no-op.
    pub fn record(&mut self, key: &str, name: &str) -> Result<(), StoreError> {
        let key = key.trim();
        let name = name.trim();

        if let Some(existing) = self.names.get(key) {
            if existing == name {
                return Ok(());
            }
            return Err(StoreError::DuplicateSignature {
                key: key.to_string(),
                existing: existing.clone(),
                attempted: name.to_string(),
            });
        }

        self.backend.append(&TableRow::new(key, name))?;
        self.names.insert(key.to_string(), name.to_string());
        self.listed.insert(key.to_string());
        info!(key, name, "recorded translation");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
