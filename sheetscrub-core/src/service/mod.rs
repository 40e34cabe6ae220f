//! Narrow interface to the cloud file and spreadsheet provider

#[cfg(feature = "google")]
mod google;
mod memory;

#[cfg(feature = "google")]
pub use google::GoogleSheets;
pub use memory::MemoryService;

use crate::error::ServiceError;
use crate::record::{CellRef, CellValue};

/// A spreadsheet file as listed in a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub name: String,
}

/// Contents of one worksheet, as dense rows from A1
#[derive(Debug, Clone, PartialEq)]
pub struct Worksheet {
    pub title: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// Operations consumed from the cloud provider. Implementations receive an
/// already-authorized client; credentials are not handled here.
pub trait SheetService {
    /// Spreadsheets directly inside the folder, in the provider's listing order
    fn list_spreadsheets(&self, folder_id: &str) -> Result<Vec<FileEntry>, ServiceError>;

    /// Every worksheet of the file, in tab order
    fn read_worksheets(&self, file_id: &str) -> Result<Vec<Worksheet>, ServiceError>;

    /// Create an empty spreadsheet with the given display name inside the folder.
    /// Returns the new file id.
    fn create_spreadsheet(&self, title: &str, folder_id: &str) -> Result<String, ServiceError>;

    /// Copy one worksheet into `target_file` as its only worksheet, keeping
    /// the title, values, formulas and formatting
    fn copy_worksheet(
        &self,
        source_file: &str,
        sheet: &str,
        target_file: &str,
    ) -> Result<(), ServiceError>;

    /// Empty the given cells of a worksheet
    fn clear_cells(
        &self,
        file_id: &str,
        sheet: &str,
        cells: &[CellRef],
    ) -> Result<(), ServiceError>;

    /// Append rows after the last non-empty row of the first worksheet
    fn append_rows(&self, file_id: &str, rows: &[Vec<String>]) -> Result<(), ServiceError>;

    /// Grant write access to the file
    fn share(&self, file_id: &str, email: &str) -> Result<(), ServiceError>;
}
