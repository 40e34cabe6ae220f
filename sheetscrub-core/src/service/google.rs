//! Google Drive v3 / Sheets v4 implementation over blocking HTTP

use super::{FileEntry, SheetService, Worksheet};
use crate::error::ServiceError;
use crate::record::{CellRef, CellValue};
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

const DRIVE_FILES: &str = "https://www.googleapis.com/drive/v3/files";
const SHEETS: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// Client for Google Drive and Sheets, authorized with a bearer token
pub struct GoogleSheets {
    client: Client,
    access_token: String,
}

impl GoogleSheets {
    pub fn new(access_token: impl Into<String>, timeout_secs: u64) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        Ok(Self {
            client,
            access_token: access_token.into(),
        })
    }

    fn send<T: for<'de> Deserialize<'de>>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ServiceError> {
        debug!(operation, "calling spreadsheet service");
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ServiceError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        response.json::<T>().map_err(|e| ServiceError::Decode {
            operation,
            detail: e.to_string(),
        })
    }

    /// Worksheet ids and titles in tab order
    fn sheet_properties(&self, file_id: &str) -> Result<Vec<SheetProperties>, ServiceError> {
        let meta: SpreadsheetMeta = self.send(
            "spreadsheets.get",
            self.client
                .get(format!("{SHEETS}/{file_id}"))
                .query(&[("fields", "sheets.properties(sheetId,title)")]),
        )?;
        Ok(meta.sheets.into_iter().map(|s| s.properties).collect())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    // Omitted from responses when it is 0
    #[serde(default)]
    sheet_id: i64,
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchValues {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

impl SheetService for GoogleSheets {
    fn list_spreadsheets(&self, folder_id: &str) -> Result<Vec<FileEntry>, ServiceError> {
        let query = format!(
            "'{}' in parents and mimeType = '{}' and trashed = false",
            folder_id.replace('\'', "\\'"),
            SPREADSHEET_MIME
        );
        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.client.get(DRIVE_FILES).query(&[
                ("q", query.as_str()),
                ("fields", "nextPageToken,files(id,name)"),
                ("pageSize", "100"),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let page: FileList = self.send("files.list", request)?;
            entries.extend(page.files.into_iter().map(|f| FileEntry {
                id: f.id,
                name: f.name,
            }));

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(entries)
    }

    fn read_worksheets(&self, file_id: &str) -> Result<Vec<Worksheet>, ServiceError> {
        let titles: Vec<String> = self
            .sheet_properties(file_id)?
            .into_iter()
            .map(|p| p.title)
            .collect();
        if titles.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: Vec<(&str, String)> =
            titles.iter().map(|t| ("ranges", quote_sheet(t))).collect();
        query.push(("valueRenderOption", "FORMULA".to_string()));
        query.push(("dateTimeRenderOption", "FORMATTED_STRING".to_string()));
        query.push(("majorDimension", "ROWS".to_string()));

        let batch: BatchValues = self.send(
            "values.batchGet",
            self.client
                .get(format!("{SHEETS}/{file_id}/values:batchGet"))
                .query(&query),
        )?;
        if batch.value_ranges.len() != titles.len() {
            return Err(ServiceError::Decode {
                operation: "values.batchGet",
                detail: format!(
                    "asked for {} ranges, got {}",
                    titles.len(),
                    batch.value_ranges.len()
                ),
            });
        }

        Ok(titles
            .into_iter()
            .zip(batch.value_ranges)
            .map(|(title, range)| Worksheet {
                title,
                rows: range
                    .values
                    .iter()
                    .map(|row| row.iter().map(cell_from_json).collect())
                    .collect(),
            })
            .collect())
    }

    fn create_spreadsheet(&self, title: &str, folder_id: &str) -> Result<String, ServiceError> {
        let created: DriveFile = self.send(
            "files.create",
            self.client
                .post(DRIVE_FILES)
                .query(&[("supportsAllDrives", "true"), ("fields", "id,name")])
                .json(&json!({
                    "name": title,
                    "mimeType": SPREADSHEET_MIME,
                    "parents": [folder_id],
                })),
        )?;
        debug!(id = %created.id, name = %created.name, "created spreadsheet");
        Ok(created.id)
    }

    fn copy_worksheet(
        &self,
        source_file: &str,
        sheet: &str,
        target_file: &str,
    ) -> Result<(), ServiceError> {
        let source = self
            .sheet_properties(source_file)?
            .into_iter()
            .find(|p| p.title == sheet)
            .ok_or_else(|| ServiceError::NotFound {
                id: format!("{source_file}/{sheet}"),
            })?;

        let copied: SheetProperties = self.send(
            "sheets.copyTo",
            self.client
                .post(format!("{SHEETS}/{source_file}/sheets/{}:copyTo", source.sheet_id))
                .json(&json!({ "destinationSpreadsheetId": target_file })),
        )?;

        let others: Vec<i64> = self
            .sheet_properties(target_file)?
            .into_iter()
            .map(|p| p.sheet_id)
            .filter(|id| *id != copied.sheet_id)
            .collect();
        let _: Value = self.send(
            "spreadsheets.batchUpdate",
            self.client
                .post(format!("{SHEETS}/{target_file}:batchUpdate"))
                .json(&keep_only(copied.sheet_id, &others, sheet)),
        )?;
        debug!(from = %copied.title, to = sheet, "copied worksheet");
        Ok(())
    }

    fn clear_cells(
        &self,
        file_id: &str,
        sheet: &str,
        cells: &[CellRef],
    ) -> Result<(), ServiceError> {
        if cells.is_empty() {
            return Ok(());
        }
        let ranges: Vec<String> = cells.iter().map(|cell| cell_range(sheet, cell)).collect();
        let _: Value = self.send(
            "values.batchClear",
            self.client
                .post(format!("{SHEETS}/{file_id}/values:batchClear"))
                .json(&json!({ "ranges": ranges })),
        )?;
        Ok(())
    }

    fn append_rows(&self, file_id: &str, rows: &[Vec<String>]) -> Result<(), ServiceError> {
        let _: Value = self.send(
            "values.append",
            self.client
                .post(format!("{SHEETS}/{file_id}/values/A1:append"))
                .query(&[
                    ("valueInputOption", "RAW"),
                    ("insertDataOption", "INSERT_ROWS"),
                ])
                .json(&json!({ "majorDimension": "ROWS", "values": rows })),
        )?;
        Ok(())
    }

    fn share(&self, file_id: &str, email: &str) -> Result<(), ServiceError> {
        let _: Value = self.send(
            "permissions.create",
            self.client
                .post(format!("{DRIVE_FILES}/{file_id}/permissions"))
                .query(&[("sendNotificationEmail", "false"), ("supportsAllDrives", "true")])
                .json(&json!({
                    "type": "user",
                    "role": "writer",
                    "emailAddress": email,
                })),
        )?;
        Ok(())
    }
}

fn cell_from_json(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::String(s) if s.is_empty() => CellValue::Empty,
        Value::String(s) if s.starts_with('=') => CellValue::Formula(s.clone()),
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
        Value::Bool(b) => CellValue::Boolean(*b),
        other => CellValue::Text(other.to_string()),
    }
}

fn quote_sheet(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

fn cell_range(sheet: &str, cell: &CellRef) -> String {
    format!("{}!{cell}", quote_sheet(sheet))
}

/// Drop every other worksheet, then give the copy its source title back
/// (the copy arrives as "Copy of ...")
fn keep_only(sheet_id: i64, others: &[i64], title: &str) -> Value {
    let mut requests: Vec<Value> = others
        .iter()
        .map(|id| json!({ "deleteSheet": { "sheetId": id } }))
        .collect();
    requests.push(json!({
        "updateSheetProperties": {
            "properties": { "sheetId": sheet_id, "title": title },
            "fields": "title",
        }
    }));
    json!({ "requests": requests })
}
