use sheetscrub_core::config::{Config, FieldConfig};
use sheetscrub_core::sanitize::sanitize;
use sheetscrub_core::service::MemoryService;
use sheetscrub_core::{
    BatchReport, CellRef, CellValue, CsvTable, OrganizerError, OutcomeStatus, Organizer,
    RecordError, RecordId, RecordOutcome, Reply, Request, SheetService, SkipReason, Step,
    StoreError, TranslationStore, Worksheet, WorkoutRecord,
};
use std::collections::BTreeSet;
use std::path::Path;
use tempfile::TempDir;

const SOURCE: &str = "source-folder";
const DEST: &str = "dest-folder";

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

fn config() -> Config {
    let mut config = Config::default();
    config.layout.fields = vec![
        FieldConfig::new("type", &["B2"]),
        FieldConfig::new("level", &["B3"]),
    ];
    config.layout.pii = vec!["B1".to_string()];
    config
}

/// Client name in B1, workout type in B2, level in B3, some content below
fn workout(client: &str, kind: &str, level: &str) -> Worksheet {
    Worksheet {
        title: "Week 1".to_string(),
        rows: vec![
            vec![text("Client"), text(client)],
            vec![text("Type"), text(kind)],
            vec![text("Level"), text(level)],
            vec![text("Squat"), CellValue::Number(5.0), CellValue::Formula("=B4*3".into())],
        ],
    }
}

/// Drive a batch to the end, answering every request with `answer`
fn run(
    service: &MemoryService,
    store_path: &Path,
    config: &Config,
    mut answer: impl FnMut(&Request) -> Reply,
) -> Result<(BatchReport, Vec<RecordOutcome>, Vec<Request>), OrganizerError> {
    let store = TranslationStore::open(CsvTable::new(store_path))?;
    let mut organizer = Organizer::new(service, store, config, DEST).unwrap();
    let files = organizer.source_files(SOURCE).unwrap();
    let mut batch = organizer.batch(SOURCE, files);

    let mut outcomes = Vec::new();
    let mut requests = Vec::new();
    loop {
        match batch.advance()? {
            Step::Request(request) => {
                let reply = answer(&request);
                requests.push(request);
                batch.reply(reply)?;
            }
            Step::Processed(outcome) => outcomes.push(outcome),
            Step::Finished(report) => return Ok((report, outcomes, requests)),
        }
    }
}

fn accept_suggestion(request: &Request) -> Reply {
    match request {
        Request::Name(_) => Reply::Name(String::new()),
        Request::Confirm(_) => Reply::Proceed,
    }
}

#[test]
fn test_first_run_prompts_and_copies() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    let service = MemoryService::new();
    service.add_spreadsheet(SOURCE, "Jane Doe", vec![workout("Jane Doe", "Leg Day", "Advanced")]);

    let (report, outcomes, requests) =
        run(&service, &store_path, &config(), accept_suggestion).unwrap();

    assert_eq!(requests.len(), 1);
    let Request::Name(request) = &requests[0] else {
        panic!("expected a name request");
    };
    assert_eq!(request.signature.key, "Leg Day|Advanced");
    assert_eq!(request.suggestion, "Leg_Day_Advanced");

    assert_eq!(report.copied, 1);
    assert!(!report.has_failures());
    assert!(matches!(
        &outcomes[0].status,
        OutcomeStatus::Copied { title, .. } if title == "Leg_Day_Advanced"
    ));

    // Entry persisted
    let store = TranslationStore::open(CsvTable::new(&store_path)).unwrap();
    assert_eq!(store.lookup("Leg Day|Advanced"), Some("Leg_Day_Advanced"));

    // Copy in the destination with the client cell emptied and content intact
    let copies = service.files_in(DEST);
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].name, "Leg_Day_Advanced");
    assert_eq!(copies[0].worksheets.len(), 1);
    assert_eq!(copies[0].worksheets[0].title, "Week 1");
    let rows = &copies[0].worksheets[0].rows;
    assert_eq!(rows[0][1], CellValue::Empty);
    assert_eq!(rows[0][0], text("Client"));
    assert_eq!(rows[1][1], text("Leg Day"));
    assert_eq!(rows[3][2], CellValue::Formula("=B4*3".into()));

    // Source untouched
    let source = service.files_in(SOURCE);
    assert_eq!(source[0].worksheets[0].rows[0][1], text("Jane Doe"));
}

#[test]
fn test_second_run_reuses_name_without_prompting() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    let service = MemoryService::new();
    service.add_spreadsheet(SOURCE, "Jane Doe", vec![workout("Jane Doe", "Leg Day", "Advanced")]);

    run(&service, &store_path, &config(), accept_suggestion).unwrap();
    let (report, _, requests) = run(&service, &store_path, &config(), |_| {
        panic!("no prompt expected on the second run")
    })
    .unwrap();

    assert!(requests.is_empty());
    assert_eq!(report.copied, 1);
    let names: Vec<String> = service.files_in(DEST).into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["Leg_Day_Advanced", "Leg_Day_Advanced"]);
}

#[test]
fn test_layout_mismatch_does_not_stop_batch() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    let service = MemoryService::new();
    service.add_spreadsheet(
        SOURCE,
        "Broken",
        vec![Worksheet {
            title: "Notes".into(),
            rows: vec![vec![text("Client"), text("Someone")]],
        }],
    );
    service.add_spreadsheet(SOURCE, "John Roe", vec![workout("John Roe", "Push", "Beginner")]);

    let (report, outcomes, _) = run(&service, &store_path, &config(), accept_suggestion).unwrap();

    assert_eq!(outcomes.len(), 2);
    assert!(matches!(
        outcomes[0].status,
        OutcomeStatus::Failed(RecordError::Layout(_))
    ));
    assert_eq!(outcomes[0].file_name, "Broken");
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.copied, 1);
    assert_eq!(service.files_in(DEST)[0].name, "Push_Beginner");
}

#[test]
fn test_write_failure_is_reported_and_batch_continues() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    let service = MemoryService::new();
    service.add_spreadsheet(SOURCE, "Jane Doe", vec![workout("Jane Doe", "Leg Day", "Advanced")]);
    service.add_spreadsheet(SOURCE, "John Roe", vec![workout("John Roe", "Push", "Beginner")]);
    service.fail_writes_for("Leg_Day_Advanced");

    let (report, outcomes, _) = run(&service, &store_path, &config(), accept_suggestion).unwrap();

    assert!(matches!(
        outcomes[0].status,
        OutcomeStatus::Failed(RecordError::Service(_))
    ));
    assert!(matches!(outcomes[1].status, OutcomeStatus::Copied { .. }));
    assert_eq!(report.copied, 1);
    assert_eq!(report.failures.len(), 1);
}

#[test]
fn test_conflicting_table_is_fatal() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    std::fs::write(
        &store_path,
        "key,name,skip\nLeg Day|Advanced,A\nLeg Day|Advanced,B\n",
    )
    .unwrap();
    let service = MemoryService::new();

    let result = run(&service, &store_path, &config(), accept_suggestion);
    assert!(matches!(
        result,
        Err(OrganizerError::Store(StoreError::DuplicateSignature { .. }))
    ));
}

#[test]
fn test_skips_and_exclusions() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    std::fs::write(&store_path, "key,name,skip\nOld Client,,y\n").unwrap();

    let service = MemoryService::new();
    service.add_spreadsheet(SOURCE, "Workout Translations", vec![]);
    service.add_spreadsheet(SOURCE, "Old Client", vec![workout("Old Client", "Push", "Beginner")]);
    service.add_spreadsheet(
        SOURCE,
        "Jane Doe",
        vec![
            Worksheet {
                title: "Blank".into(),
                rows: vec![vec![text(" ")]],
            },
            workout("Jane Doe", "Foundation 1", "Beginner"),
        ],
    );

    let mut config = config();
    config.layout.excluded_signatures = vec!["Foundation 1".into()];
    let (report, outcomes, requests) = run(&service, &store_path, &config, accept_suggestion).unwrap();

    assert!(requests.is_empty());
    assert_eq!(report.skipped, 2);
    assert!(matches!(outcomes[0].status, OutcomeStatus::Skipped(SkipReason::Blank)));
    assert!(matches!(
        &outcomes[1].status,
        OutcomeStatus::Skipped(SkipReason::Excluded(p)) if p == "Foundation 1"
    ));
    assert!(service.files_in(DEST).is_empty());
}

#[test]
fn test_confirmation_and_client_token() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    std::fs::write(&store_path, "key,name,skip\nJane Doe,Client 7,\n").unwrap();

    let service = MemoryService::new();
    service.add_spreadsheet(SOURCE, "Jane Doe", vec![workout("Jane Doe", "Leg Day", "Advanced")]);
    service.add_spreadsheet(SOURCE, "John Roe", vec![workout("John Roe", "Push", "Beginner")]);

    let mut config = config();
    config.workflow.confirm_each_record = true;
    config.naming.append_client_token = true;
    config.service.share_with = Some("coach@example.com".into());

    let (report, outcomes, requests) = run(&service, &store_path, &config, |request| match request {
        Request::Confirm(preview) if preview.file_name == "John Roe" => Reply::Skip,
        Request::Confirm(preview) => {
            assert_eq!(preview.pii_cells.len(), 1);
            Reply::Proceed
        }
        Request::Name(_) => Reply::Name("Leg Day Pro".into()),
    })
    .unwrap();

    assert_eq!(requests.len(), 3);
    assert_eq!(report.copied, 1);
    assert!(matches!(outcomes[1].status, OutcomeStatus::Skipped(SkipReason::Declined)));

    let copies = service.files_in(DEST);
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].name, "Leg Day Pro - Client 7");
    assert_eq!(copies[0].shared_with, vec!["coach@example.com"]);
}

#[test]
fn test_reply_without_request_is_rejected() {
    let dir = TempDir::new().unwrap();
    let service = MemoryService::new();
    let store = TranslationStore::open(CsvTable::new(dir.path().join("t.csv"))).unwrap();
    let config = config();
    let mut organizer = Organizer::new(&service, store, &config, DEST).unwrap();
    let mut batch = organizer.batch(SOURCE, Vec::new());

    assert!(matches!(
        batch.reply(Reply::Proceed),
        Err(OrganizerError::UnexpectedReply)
    ));
    assert!(matches!(batch.advance(), Ok(Step::Finished(_))));
}

#[test]
fn test_unreadable_file_fails_alone() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    let service = MemoryService::new();
    service.add_spreadsheet(SOURCE, "John Roe", vec![workout("John Roe", "Push", "Beginner")]);

    let store = TranslationStore::open(CsvTable::new(&store_path)).unwrap();
    let config = config();
    let mut organizer = Organizer::new(&service, store, &config, DEST).unwrap();
    let mut files = organizer.source_files(SOURCE).unwrap();
    files.insert(
        0,
        sheetscrub_core::FileEntry {
            id: "missing".into(),
            name: "Gone".into(),
        },
    );
    let mut batch = organizer.batch(SOURCE, files);

    let Ok(Step::Processed(first)) = batch.advance() else {
        panic!("expected the missing file to be reported");
    };
    assert!(first.is_failure());
    assert_eq!(first.to_string(), "Gone");

    let Ok(Step::Request(Request::Name(_))) = batch.advance() else {
        panic!("expected a name request for the next file");
    };
    batch.reply(Reply::Proceed).unwrap();
    let Ok(Step::Processed(second)) = batch.advance() else {
        panic!("expected the second file to be copied");
    };
    assert_eq!(second.to_string(), "John Roe [Week 1]");
    assert_eq!(batch.report().copied, 1);
    assert_eq!(service.list_spreadsheets(DEST).unwrap().len(), 1);
}

#[test]
fn test_copy_matches_sanitized_record() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    let mut sheet = workout("Jane Doe", "Leg Day", "Advanced");
    sheet.rows.push(vec![text("001"), text("3/4"), text("TRUE"), CellValue::Boolean(true)]);
    let service = MemoryService::new();
    let source_id = service.add_spreadsheet(SOURCE, "Jane Doe", vec![sheet.clone()]);

    run(&service, &store_path, &config(), accept_suggestion).unwrap();

    let source = WorkoutRecord::from_rows(
        RecordId {
            file_id: source_id,
            sheet: sheet.title.clone(),
        },
        "Jane Doe",
        SOURCE,
        sheet.rows,
    );
    let pii: BTreeSet<CellRef> = ["B1".parse().unwrap()].into_iter().collect();
    let expected = sanitize(&source, &pii);

    let copy = &service.files_in(DEST)[0].worksheets[0];
    let copied = WorkoutRecord::from_rows(source.id.clone(), "copy", DEST, copy.rows.clone());
    assert_eq!(copied.cells.len(), expected.cells.len() - expected.cleared.len());
    for (cell, value) in &expected.cells {
        match copied.get(cell) {
            Some(found) => assert_eq!(found, value),
            None => assert!(expected.cleared.contains(cell)),
        }
    }
    assert_eq!(copy.rows[4][0], text("001"));
}

#[test]
fn test_only_listed_files() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    std::fs::write(&store_path, "key,name,skip\nJane Doe,,\n").unwrap();

    let service = MemoryService::new();
    service.add_spreadsheet(SOURCE, "Jane Doe", vec![workout("Jane Doe", "Leg Day", "Advanced")]);
    service.add_spreadsheet(SOURCE, "John Roe", vec![workout("John Roe", "Push", "Beginner")]);

    let mut config = config();
    let (report, _, _) = run(&service, &store_path, &config, accept_suggestion).unwrap();
    assert_eq!(report.copied, 2);

    config.workflow.only_listed_files = true;
    let (report, outcomes, _) = run(&service, &store_path, &config, accept_suggestion).unwrap();
    assert_eq!(report.copied, 1);
    assert_eq!(outcomes[0].file_name, "Jane Doe");
}

#[test]
fn test_hand_edited_table_keeps_names_across_runs() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("translations.csv");
    // Edited by hand, no newline after the last row
    std::fs::write(&store_path, "key,name,skip\nJane Doe,Client 7").unwrap();

    let service = MemoryService::new();
    service.add_spreadsheet(SOURCE, "Jane Doe", vec![workout("Jane Doe", "Leg Day", "Advanced")]);

    let mut config = config();
    config.naming.append_client_token = true;
    let (_, _, requests) = run(&service, &store_path, &config, accept_suggestion).unwrap();
    assert_eq!(requests.len(), 1);

    let (_, _, requests) = run(&service, &store_path, &config, |_| {
        panic!("no prompt expected on the second run")
    })
    .unwrap();
    assert!(requests.is_empty());

    let names: Vec<String> = service.files_in(DEST).into_iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        vec!["Leg_Day_Advanced - Client 7", "Leg_Day_Advanced - Client 7"]
    );
}
