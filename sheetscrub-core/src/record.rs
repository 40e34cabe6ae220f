//! Workout record data structures

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static A1_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\$?([A-Za-z]{1,3})\$?([1-9][0-9]*)$").expect("A1 pattern is valid")
});

/// Error returned when a cell or range reference cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid cell reference: {0:?}")]
pub struct InvalidReference(pub String);

/// Cell reference (e.g., A1, B2), zero-based
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub row: u32,
    pub col: u32,
}

impl CellRef {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Convert to A1-style reference (e.g., "A1")
    pub fn to_a1(&self) -> String {
        format!("{}{}", Self::col_to_letter(self.col), self.row + 1)
    }

    /// Convert column number to letter (0 -> A, 1 -> B, etc.)
    fn col_to_letter(mut col: u32) -> String {
        let mut result = String::new();
        loop {
            result.insert(0, (b'A' + (col % 26) as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        result
    }

    /// Convert column letters to a number (A -> 0, Z -> 25, AA -> 26)
    fn letter_to_col(letters: &str) -> u32 {
        letters
            .bytes()
            .map(|b| (b.to_ascii_uppercase() - b'A') as u32 + 1)
            .fold(0, |acc, digit| acc * 26 + digit)
            - 1
    }
}

impl FromStr for CellRef {
    type Err = InvalidReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = A1_PATTERN
            .captures(s.trim())
            .ok_or_else(|| InvalidReference(s.to_string()))?;
        let row: u32 = caps[2]
            .parse()
            .map_err(|_| InvalidReference(s.to_string()))?;
        Ok(Self::new(row - 1, Self::letter_to_col(&caps[1])))
    }
}

impl PartialOrd for CellRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.row.cmp(&other.row).then_with(|| self.col.cmp(&other.col))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

/// Rectangular block of cells (e.g., "B1:D2"). A single reference is a 1x1 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start: CellRef,
    pub end: CellRef,
}

impl CellRange {
    /// Iterate over every cell in the range, row by row
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + use<> {
        let (start, end) = (self.start, self.end);
        (start.row..=end.row)
            .flat_map(move |row| (start.col..=end.col).map(move |col| CellRef::new(row, col)))
    }
}

impl FromStr for CellRange {
    type Err = InvalidReference;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (a, b) = match s.split_once(':') {
            Some((a, b)) => (a.parse::<CellRef>()?, b.parse::<CellRef>()?),
            None => {
                let single = s.parse::<CellRef>()?;
                (single, single)
            }
        };
        // Normalize so that "C3:A1" and "A1:C3" are the same block
        Ok(Self {
            start: CellRef::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellRef::new(a.row.max(b.row), a.col.max(b.col)),
        })
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// Cell value types
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    Formula(String),
}

impl CellValue {
    /// Check if the cell is empty
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Empty, or text made only of whitespace
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text as the operator sees it in the sheet, trimmed
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Boolean(true) => "TRUE".to_string(),
            CellValue::Boolean(false) => "FALSE".to_string(),
            CellValue::Formula(f) => f.clone(),
        }
    }
}

/// Identifies one worksheet of one source spreadsheet
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub file_id: String,
    pub sheet: String,
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.file_id, self.sheet)
    }
}

/// A single source workout: one worksheet of a spreadsheet in the source folder
#[derive(Debug, Clone)]
pub struct WorkoutRecord {
    pub id: RecordId,
    /// Display name of the owning spreadsheet (usually the client's name)
    pub file_name: String,
    pub folder_id: String,
    /// Non-empty cells, ordered row by row
    pub cells: BTreeMap<CellRef, CellValue>,
}

impl WorkoutRecord {
    /// Build a record from a dense grid of rows as returned by the service
    pub fn from_rows(
        id: RecordId,
        file_name: impl Into<String>,
        folder_id: impl Into<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        let mut cells = BTreeMap::new();
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                if !value.is_empty() {
                    cells.insert(CellRef::new(r as u32, c as u32), value);
                }
            }
        }

        Self {
            id,
            file_name: file_name.into(),
            folder_id: folder_id.into(),
            cells,
        }
    }

    /// Get the value at the given position
    pub fn get(&self, cell: &CellRef) -> Option<&CellValue> {
        self.cells.get(cell)
    }

    /// True when no cell holds anything visible
    pub fn is_blank(&self) -> bool {
        self.cells.values().all(CellValue::is_blank)
    }
}
