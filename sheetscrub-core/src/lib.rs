//! sheetscrub-core: turn client workout spreadsheets into reusable templates
//!
//! Each worksheet in a source folder is copied into a new spreadsheet with the
//! client-identifying cells emptied, and the copy is named from a translation
//! table keyed by the workout's content signature.

pub mod client_list;
pub mod config;
pub mod error;
pub mod extract;
pub mod namer;
pub mod organizer;
pub mod record;
pub mod sanitize;
pub mod service;
pub mod store;

pub use config::Config;
pub use error::{ExtractError, OrganizerError, RecordError, ServiceError, StoreError};
pub use extract::{
    ContentSignature, Extractor, FieldSignature, Screened, SignatureRule, VariantSignature,
};
pub use namer::NameRequest;
pub use organizer::{
    Batch, BatchReport, OutcomeStatus, Organizer, RecordOutcome, RecordPreview, Reply, Request,
    SkipReason, Step,
};
pub use record::{CellRange, CellRef, CellValue, RecordId, WorkoutRecord};
pub use service::{FileEntry, SheetService, Worksheet};
pub use store::{CsvTable, SheetTable, TableBackend, TableRow, TranslationStore};
