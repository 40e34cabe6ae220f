//! Batch workflow: extract, sanitize, name and copy every source record
//!
//! The workflow never talks to the operator directly. [`Batch::advance`]
//! yields a [`Step::Request`] whenever it needs an answer, and the caller
//! hands the answer back with [`Batch::reply`] before advancing again.

use crate::config::{Config, ConfigError, NamingConfig};
use crate::error::{OrganizerError, RecordError, ServiceError};
use crate::extract::{ContentSignature, Extraction, Extractor, Screened};
use crate::namer::{self, NameRequest, Resolution};
use crate::record::{CellRef, RecordId, WorkoutRecord};
use crate::sanitize::{SanitizedCells, sanitize};
use crate::service::{FileEntry, SheetService};
use crate::store::TranslationStore;
use std::collections::VecDeque;
use std::fmt;
use tracing::{info, warn};

/// Something the operator has to answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// A signature without a name
    Name(NameRequest),
    /// Permission to copy a record
    Confirm(RecordPreview),
}

/// Answer to a [`Request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Name for the pending signature; blank takes the suggestion
    Name(String),
    /// Go ahead (takes the suggestion when a name was asked for)
    Proceed,
    /// Leave the pending record alone
    Skip,
}

/// What the operator sees before confirming a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordPreview {
    pub record: RecordId,
    pub file_name: String,
    pub signature: ContentSignature,
    pub known_name: Option<String>,
    /// PII positions holding a value
    pub pii_cells: Vec<CellRef>,
}

/// Why a record is left alone without being an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No visible content at all
    Blank,
    /// The unfilled template, still showing its marker text
    UnfilledTemplate,
    /// Signature matches an operator exclusion
    Excluded(String),
    /// Operator declined the record when asked
    Declined,
}

impl From<Screened> for SkipReason {
    fn from(screened: Screened) -> Self {
        match screened {
            Screened::Blank => SkipReason::Blank,
            Screened::UnfilledTemplate => SkipReason::UnfilledTemplate,
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Blank => write!(f, "blank worksheet"),
            SkipReason::UnfilledTemplate => write!(f, "unfilled template"),
            SkipReason::Excluded(pattern) => write!(f, "excluded signature ({pattern})"),
            SkipReason::Declined => write!(f, "declined by operator"),
        }
    }
}

#[derive(Debug)]
pub enum OutcomeStatus {
    Copied {
        file_id: String,
        title: String,
        cleared: Vec<CellRef>,
    },
    Skipped(SkipReason),
    Failed(RecordError),
}

/// Result of processing one record
#[derive(Debug)]
pub struct RecordOutcome {
    pub record: RecordId,
    pub file_name: String,
    pub status: OutcomeStatus,
}

impl RecordOutcome {
    fn new(record: &WorkoutRecord, status: OutcomeStatus) -> Self {
        Self {
            record: record.id.clone(),
            file_name: record.file_name.clone(),
            status,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed(_))
    }
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.record.sheet.is_empty() {
            write!(f, "{}", self.file_name)
        } else {
            write!(f, "{} [{}]", self.file_name, self.record.sheet)
        }
    }
}

/// Totals for a finished batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub copied: usize,
    pub skipped: usize,
    /// (record, error message) for every failure, in processing order
    pub failures: Vec<(RecordId, String)>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

#[derive(Debug)]
pub enum Step {
    Request(Request),
    Processed(RecordOutcome),
    Finished(BatchReport),
}

/// Owns the collaborators for one run
pub struct Organizer<'a> {
    service: &'a dyn SheetService,
    store: TranslationStore<'a>,
    extractor: Extractor,
    destination: String,
    naming: NamingConfig,
    confirm_each_record: bool,
    only_listed_files: bool,
    exclude_file_names: Vec<String>,
    share_with: Option<String>,
}

impl<'a> Organizer<'a> {
    pub fn new(
        service: &'a dyn SheetService,
        store: TranslationStore<'a>,
        config: &Config,
        destination: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            service,
            store,
            extractor: Extractor::from_layout(&config.layout)?,
            destination: destination.into(),
            naming: config.naming.clone(),
            confirm_each_record: config.workflow.confirm_each_record,
            only_listed_files: config.workflow.only_listed_files,
            exclude_file_names: config.workflow.exclude_file_names.clone(),
            share_with: config.service.share_with.clone(),
        })
    }

    /// Replace the configured extractor, e.g. to plug in another signature rule
    pub fn with_extractor(mut self, extractor: Extractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn store(&self) -> &TranslationStore<'a> {
        &self.store
    }

    /// Spreadsheets in the source folder, minus excluded names and files the
    /// translation table marks as skipped (or does not list at all, with
    /// `only_listed_files`). Listing order is kept.
    pub fn source_files(&self, folder_id: &str) -> Result<Vec<FileEntry>, ServiceError> {
        let files = self.service.list_spreadsheets(folder_id)?;
        Ok(files
            .into_iter()
            .filter(|file| {
                if self
                    .exclude_file_names
                    .iter()
                    .any(|pattern| file.name.contains(pattern.as_str()))
                {
                    return false;
                }
                if self.store.is_skipped(&file.name) {
                    info!(file = %file.name, "skipped by translation table");
                    return false;
                }
                if self.only_listed_files && !self.store.is_listed(&file.name) {
                    info!(file = %file.name, "not listed in translation table");
                    return false;
                }
                true
            })
            .collect())
    }

    /// Start processing the given files
    pub fn batch(&mut self, source_folder: &str, files: Vec<FileEntry>) -> Batch<'_, 'a> {
        Batch {
            organizer: self,
            source_folder: source_folder.to_string(),
            files: files.into(),
            records: VecDeque::new(),
            pending: None,
            report: BatchReport::default(),
        }
    }

    fn client_token(&self, record: &WorkoutRecord) -> Option<&str> {
        if !self.naming.append_client_token {
            return None;
        }
        let token = self.store.lookup(&record.file_name);
        if token.is_none() {
            warn!(record = %record.id, "no client token in translation table; title left without one");
        }
        token
    }

    /// Copy the worksheet on the service side, then empty the PII cells the
    /// sanitizer cleared. Every other cell keeps its source value and format.
    fn write_copy(
        &self,
        title: &str,
        record: &WorkoutRecord,
        sanitized: &SanitizedCells,
    ) -> Result<String, ServiceError> {
        let file_id = self.service.create_spreadsheet(title, &self.destination)?;
        let sheet = record.id.sheet.as_str();
        self.service.copy_worksheet(&record.id.file_id, sheet, &file_id)?;
        self.service.clear_cells(&file_id, sheet, &sanitized.cleared)?;
        if let Some(email) = &self.share_with {
            self.service.share(&file_id, email)?;
        }
        Ok(file_id)
    }
}

enum Stage {
    Confirm,
    Name,
}

struct Pending {
    record: WorkoutRecord,
    extraction: Extraction,
    stage: Stage,
    answer: Option<Reply>,
}

/// One pass over a list of source files
pub struct Batch<'o, 'a> {
    organizer: &'o mut Organizer<'a>,
    source_folder: String,
    files: VecDeque<FileEntry>,
    records: VecDeque<WorkoutRecord>,
    pending: Option<Pending>,
    report: BatchReport,
}

impl Batch<'_, '_> {
    /// Run until the next request, processed record, or the end of the batch.
    /// Only translation table failures are returned as errors.
    pub fn advance(&mut self) -> Result<Step, OrganizerError> {
        if let Some(pending) = self.pending.take() {
            return self.resume(pending);
        }

        let record = match self.next_record() {
            None => return Ok(Step::Finished(self.report.clone())),
            Some(Err(outcome)) => return Ok(self.emit(outcome)),
            Some(Ok(record)) => record,
        };

        let extractor = &self.organizer.extractor;
        if let Some(screened) = extractor.screen(&record) {
            let status = OutcomeStatus::Skipped(screened.into());
            return Ok(self.emit(RecordOutcome::new(&record, status)));
        }
        let extraction = match extractor.extract(&record) {
            Ok(extraction) => extraction,
            Err(e) => {
                return Ok(self.emit(RecordOutcome::new(&record, OutcomeStatus::Failed(e.into()))));
            }
        };
        if let Some(pattern) = extractor.excluded_by(&extraction.signature) {
            let reason = SkipReason::Excluded(pattern.to_string());
            return Ok(self.emit(RecordOutcome::new(&record, OutcomeStatus::Skipped(reason))));
        }

        let stage = if self.organizer.confirm_each_record {
            Stage::Confirm
        } else {
            Stage::Name
        };
        self.resume(Pending {
            record,
            extraction,
            stage,
            answer: None,
        })
    }

    /// Answer the request returned by the last [`Batch::advance`]
    pub fn reply(&mut self, reply: Reply) -> Result<(), OrganizerError> {
        let pending = self.pending.as_mut().ok_or(OrganizerError::UnexpectedReply)?;
        if matches!((&pending.stage, &reply), (Stage::Confirm, Reply::Name(_))) {
            return Err(OrganizerError::UnexpectedReply);
        }
        pending.answer = Some(reply);
        Ok(())
    }

    /// Totals so far
    pub fn report(&self) -> &BatchReport {
        &self.report
    }

    fn resume(&mut self, mut pending: Pending) -> Result<Step, OrganizerError> {
        let answer = pending.answer.take();

        if let Stage::Confirm = pending.stage {
            return match answer {
                None => {
                    let request = Request::Confirm(self.preview(&pending));
                    self.pending = Some(pending);
                    Ok(Step::Request(request))
                }
                Some(Reply::Skip) => Ok(self.declined(&pending.record)),
                Some(_) => {
                    pending.stage = Stage::Name;
                    self.resume(pending)
                }
            };
        }

        let store = &mut self.organizer.store;
        let name = match namer::resolve(store, &pending.extraction.signature) {
            Resolution::Known(name) => name,
            Resolution::Needed(request) => match answer {
                None => {
                    self.pending = Some(pending);
                    return Ok(Step::Request(Request::Name(request)));
                }
                Some(Reply::Skip) => return Ok(self.declined(&pending.record)),
                Some(Reply::Name(name)) => request.fulfill(store, &name)?,
                Some(Reply::Proceed) => request.fulfill(store, "")?,
            },
        };

        let outcome = self.copy(&pending, &name);
        Ok(self.emit(outcome))
    }

    fn copy(&self, pending: &Pending, name: &str) -> RecordOutcome {
        let organizer = &*self.organizer;
        let sanitized = sanitize(&pending.record, &pending.extraction.pii);
        let token = organizer.client_token(&pending.record);
        let title = namer::title_for(name, token, &organizer.naming.token_separator);

        let status = match organizer.write_copy(&title, &pending.record, &sanitized) {
            Ok(file_id) => OutcomeStatus::Copied {
                file_id,
                title,
                cleared: sanitized.cleared,
            },
            Err(e) => OutcomeStatus::Failed(e.into()),
        };
        RecordOutcome::new(&pending.record, status)
    }

    fn preview(&self, pending: &Pending) -> RecordPreview {
        let signature = pending.extraction.signature.clone();
        RecordPreview {
            record: pending.record.id.clone(),
            file_name: pending.record.file_name.clone(),
            known_name: self
                .organizer
                .store
                .lookup(&signature.key)
                .map(str::to_string),
            signature,
            pii_cells: pending
                .extraction
                .pii
                .iter()
                .filter(|cell| pending.record.get(cell).is_some())
                .copied()
                .collect(),
        }
    }

    fn declined(&mut self, record: &WorkoutRecord) -> Step {
        self.emit(RecordOutcome::new(
            record,
            OutcomeStatus::Skipped(SkipReason::Declined),
        ))
    }

    /// Next record in listing order. Opening a file is the only place a whole
    /// file can fail; that failure is returned as a single outcome.
    fn next_record(&mut self) -> Option<Result<WorkoutRecord, RecordOutcome>> {
        loop {
            if let Some(record) = self.records.pop_front() {
                return Some(Ok(record));
            }

            let file = self.files.pop_front()?;
            match self.organizer.service.read_worksheets(&file.id) {
                Ok(worksheets) => {
                    for worksheet in worksheets {
                        let id = RecordId {
                            file_id: file.id.clone(),
                            sheet: worksheet.title,
                        };
                        self.records.push_back(WorkoutRecord::from_rows(
                            id,
                            file.name.as_str(),
                            self.source_folder.as_str(),
                            worksheet.rows,
                        ));
                    }
                }
                Err(e) => {
                    return Some(Err(RecordOutcome {
                        record: RecordId {
                            file_id: file.id,
                            sheet: String::new(),
                        },
                        file_name: file.name,
                        status: OutcomeStatus::Failed(e.into()),
                    }));
                }
            }
        }
    }

    fn emit(&mut self, outcome: RecordOutcome) -> Step {
        match &outcome.status {
            OutcomeStatus::Copied { title, cleared, .. } => {
                self.report.copied += 1;
                info!(record = %outcome.record, title = %title, cleared = cleared.len(), "copied");
            }
            OutcomeStatus::Skipped(reason) => {
                self.report.skipped += 1;
                info!(record = %outcome.record, reason = %reason, "skipped");
            }
            OutcomeStatus::Failed(e) => {
                warn!(record = %outcome.record, error = %e, "record failed");
                self.report
                    .failures
                    .push((outcome.record.clone(), e.to_string()));
            }
        }
        Step::Processed(outcome)
    }
}
