use super::{TableBackend, TableRow};
use crate::error::{ServiceError, StoreError};
use crate::service::SheetService;

/// Title given to translation spreadsheets created by the client list setup
pub const TABLE_TITLE: &str = "Workout Translations";

const HEADER: [&str; 3] = ["Original Name", "Description", "Skip?"];

/// Translation table kept in the first worksheet of a cloud spreadsheet.
/// Row 1 is a header; columns are key, name and an optional skip mark.
pub struct SheetTable<'s> {
    service: &'s dyn SheetService,
    file_id: String,
}

impl<'s> SheetTable<'s> {
    pub fn new(service: &'s dyn SheetService, file_id: impl Into<String>) -> Self {
        Self {
            service,
            file_id: file_id.into(),
        }
    }

    /// Create a new translation spreadsheet with a header row in the folder
    pub fn create(service: &'s dyn SheetService, folder_id: &str) -> Result<Self, StoreError> {
        let file_id = service.create_spreadsheet(TABLE_TITLE, folder_id)?;
        let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
        service.append_rows(&file_id, &[header])?;
        Ok(Self { service, file_id })
    }

    pub fn file_id(&self) -> &str {
        &self.file_id
    }
}

impl TableBackend for SheetTable<'_> {
    fn load(&mut self) -> Result<Vec<TableRow>, StoreError> {
        let sheets = self.service.read_worksheets(&self.file_id)?;
        let first = sheets.into_iter().next().ok_or_else(|| {
            StoreError::Service(ServiceError::Decode {
                operation: "read translation table",
                detail: format!("spreadsheet {} has no worksheets", self.file_id),
            })
        })?;

        Ok(first
            .rows
            .iter()
            .skip(1)
            .filter_map(|row| {
                let text = |i: usize| row.get(i).map(|v| v.display_text()).unwrap_or_default();
                let key = text(0);
                if key.is_empty() {
                    return None;
                }
                Some(TableRow {
                    key,
                    name: text(1),
                    skip: TableRow::parse_skip(&text(2)),
                })
            })
            .collect())
    }

    fn append(&mut self, row: &TableRow) -> Result<(), StoreError> {
        let skip = if row.skip { "y" } else { "" };
        self.service.append_rows(
            &self.file_id,
            &[vec![row.key.clone(), row.name.clone(), skip.to_string()]],
        )?;
        Ok(())
    }
}
