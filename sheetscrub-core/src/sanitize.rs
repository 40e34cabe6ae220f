//! Blank-out of client-identifying cells

use crate::record::{CellRef, CellValue, WorkoutRecord};
use std::collections::{BTreeMap, BTreeSet};

/// Cell payload for a sanitized copy
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedCells {
    /// Every source cell; PII positions hold `CellValue::Empty`
    pub cells: BTreeMap<CellRef, CellValue>,
    /// PII positions that held a value in the source
    pub cleared: Vec<CellRef>,
}

/// Copy the record's cells with the PII positions emptied. The source is untouched.
pub fn sanitize(record: &WorkoutRecord, pii: &BTreeSet<CellRef>) -> SanitizedCells {
    let mut cleared = Vec::new();
    let cells = record
        .cells
        .iter()
        .map(|(cell, value)| {
            if pii.contains(cell) {
                cleared.push(*cell);
                (*cell, CellValue::Empty)
            } else {
                (*cell, value.clone())
            }
        })
        .collect();

    SanitizedCells { cells, cleared }
}
