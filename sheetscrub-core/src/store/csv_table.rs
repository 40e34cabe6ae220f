use super::{TableBackend, TableRow};
use crate::error::StoreError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

const HEADER: [&str; 3] = ["key", "name", "skip"];

/// Translation table kept as a local CSV file with a `key,name,skip` header.
/// The skip column may be left out.
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    /// Use the file at `path`. A missing file reads as an empty table.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Start a new table, refusing to touch an existing file
    pub fn create_new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(StoreError::AlreadyExists(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        write_header(file)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn write_header(file: File) -> Result<(), StoreError> {
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(HEADER)?;
    writer.flush()?;
    Ok(())
}

impl TableBackend for CsvTable {
    fn load(&mut self) -> Result<Vec<TableRow>, StoreError> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let key = record.get(0).unwrap_or_default();
            if key.is_empty() {
                continue;
            }
            rows.push(TableRow {
                key: key.to_string(),
                name: record.get(1).unwrap_or_default().to_string(),
                skip: TableRow::parse_skip(record.get(2).unwrap_or_default()),
            });
        }
        Ok(rows)
    }

    fn append(&mut self, row: &TableRow) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        // Hand edits may leave the file empty or without a final newline
        let len = file.metadata()?.len();
        if len > 0 {
            file.seek(SeekFrom::End(-1))?;
            let mut last = [0u8; 1];
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut file);
        if len == 0 {
            writer.write_record(HEADER)?;
        }
        let skip = if row.skip { "y" } else { "" };
        writer.write_record([row.key.as_str(), row.name.as_str(), skip])?;
        writer.flush()?;
        drop(writer);

        file.flush()?;
        Ok(())
    }
}
