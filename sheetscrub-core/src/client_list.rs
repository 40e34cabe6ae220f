//! Initial translation table setup

use crate::error::StoreError;
use crate::service::FileEntry;
use crate::store::{TableBackend, TableRow};
use std::collections::HashSet;
use tracing::info;

/// Write one placeholder row per distinct source file name into a fresh table.
/// The coach fills in client tokens and skip marks afterwards.
/// Returns the number of rows written.
pub fn seed<B: TableBackend + ?Sized>(
    backend: &mut B,
    files: &[FileEntry],
) -> Result<usize, StoreError> {
    let existing: HashSet<String> = backend.load()?.into_iter().map(|row| row.key).collect();
    let mut written = 0;
    let mut seen = HashSet::new();

    for file in files {
        let name = file.name.trim();
        if name.is_empty() || existing.contains(name) || !seen.insert(name.to_string()) {
            continue;
        }
        backend.append(&TableRow::placeholder(name))?;
        written += 1;
    }

    info!(rows = written, "client list seeded");
    Ok(written)
}
