//! In-memory spreadsheet service

use super::{FileEntry, SheetService, Worksheet};
use crate::error::ServiceError;
use crate::record::{CellRef, CellValue};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

/// A spreadsheet held by [`MemoryService`]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub id: String,
    pub name: String,
    pub folder_id: String,
    pub worksheets: Vec<Worksheet>,
    pub shared_with: Vec<String>,
}

/// Keeps folders and spreadsheets in memory. Useful for tests and rehearsals.
#[derive(Debug, Default)]
pub struct MemoryService {
    files: RefCell<Vec<StoredFile>>,
    next_id: Cell<u32>,
    failing_writes: RefCell<HashSet<String>>,
}

impl MemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a spreadsheet to a folder and return its id
    pub fn add_spreadsheet(&self, folder_id: &str, name: &str, worksheets: Vec<Worksheet>) -> String {
        let id = self.allocate_id();
        self.files.borrow_mut().push(StoredFile {
            id: id.clone(),
            name: name.to_string(),
            folder_id: folder_id.to_string(),
            worksheets,
            shared_with: Vec::new(),
        });
        id
    }

    /// Make every later write to a file with this display name fail
    pub fn fail_writes_for(&self, name: &str) {
        self.failing_writes.borrow_mut().insert(name.to_string());
    }

    /// Snapshot of every file in the folder
    pub fn files_in(&self, folder_id: &str) -> Vec<StoredFile> {
        self.files
            .borrow()
            .iter()
            .filter(|f| f.folder_id == folder_id)
            .cloned()
            .collect()
    }

    pub fn file(&self, file_id: &str) -> Option<StoredFile> {
        self.files.borrow().iter().find(|f| f.id == file_id).cloned()
    }

    fn allocate_id(&self) -> String {
        let n = self.next_id.get() + 1;
        self.next_id.set(n);
        format!("mem-{n}")
    }

    fn with_file<T>(
        &self,
        file_id: &str,
        f: impl FnOnce(&mut StoredFile) -> T,
    ) -> Result<T, ServiceError> {
        let mut files = self.files.borrow_mut();
        let file = files
            .iter_mut()
            .find(|file| file.id == file_id)
            .ok_or_else(|| ServiceError::NotFound { id: file_id.to_string() })?;
        Ok(f(file))
    }

    fn check_writable(&self, file_id: &str) -> Result<(), ServiceError> {
        let name = self.with_file(file_id, |file| file.name.clone())?;
        if self.failing_writes.borrow().contains(&name) {
            return Err(ServiceError::Status {
                operation: "write",
                status: 503,
                body: format!("simulated failure for {name}"),
            });
        }
        Ok(())
    }
}

fn first_sheet(file: &mut StoredFile) -> &mut Worksheet {
    if file.worksheets.is_empty() {
        file.worksheets.push(Worksheet {
            title: "Sheet1".to_string(),
            rows: Vec::new(),
        });
    }
    &mut file.worksheets[0]
}

impl SheetService for MemoryService {
    fn list_spreadsheets(&self, folder_id: &str) -> Result<Vec<FileEntry>, ServiceError> {
        Ok(self
            .files
            .borrow()
            .iter()
            .filter(|f| f.folder_id == folder_id)
            .map(|f| FileEntry {
                id: f.id.clone(),
                name: f.name.clone(),
            })
            .collect())
    }

    fn read_worksheets(&self, file_id: &str) -> Result<Vec<Worksheet>, ServiceError> {
        self.with_file(file_id, |file| file.worksheets.clone())
    }

    fn create_spreadsheet(&self, title: &str, folder_id: &str) -> Result<String, ServiceError> {
        if self.failing_writes.borrow().contains(title) {
            return Err(ServiceError::Status {
                operation: "create",
                status: 503,
                body: format!("simulated failure for {title}"),
            });
        }
        Ok(self.add_spreadsheet(folder_id, title, Vec::new()))
    }

    fn copy_worksheet(
        &self,
        source_file: &str,
        sheet: &str,
        target_file: &str,
    ) -> Result<(), ServiceError> {
        self.check_writable(target_file)?;
        let worksheet = self
            .with_file(source_file, |file| {
                file.worksheets.iter().find(|w| w.title == sheet).cloned()
            })?
            .ok_or_else(|| ServiceError::NotFound {
                id: format!("{source_file}/{sheet}"),
            })?;
        self.with_file(target_file, |file| file.worksheets = vec![worksheet])
    }

    fn clear_cells(
        &self,
        file_id: &str,
        sheet: &str,
        cells: &[CellRef],
    ) -> Result<(), ServiceError> {
        self.check_writable(file_id)?;
        self.with_file(file_id, |file| {
            let worksheet = file
                .worksheets
                .iter_mut()
                .find(|w| w.title == sheet)
                .ok_or_else(|| ServiceError::NotFound {
                    id: format!("{file_id}/{sheet}"),
                })?;
            for cell in cells {
                let value = worksheet
                    .rows
                    .get_mut(cell.row as usize)
                    .and_then(|row| row.get_mut(cell.col as usize));
                if let Some(value) = value {
                    *value = CellValue::Empty;
                }
            }
            Ok::<_, ServiceError>(())
        })?
    }

    fn append_rows(&self, file_id: &str, rows: &[Vec<String>]) -> Result<(), ServiceError> {
        self.check_writable(file_id)?;
        self.with_file(file_id, |file| {
            let sheet = first_sheet(file);
            for row in rows {
                sheet
                    .rows
                    .push(row.iter().map(|s| CellValue::Text(s.clone())).collect());
            }
        })
    }

    fn share(&self, file_id: &str, email: &str) -> Result<(), ServiceError> {
        self.with_file(file_id, |file| file.shared_with.push(email.to_string()))
    }
}
