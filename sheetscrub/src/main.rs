use anyhow::{Context, Result};
use clap::Parser;
use sheetscrub_core::service::GoogleSheets;
use sheetscrub_core::store::SheetTable;
use sheetscrub_core::{
    Config, CsvTable, Organizer, Reply, Request, SheetService, Step, TableBackend,
    TranslationStore, client_list,
};
use std::path::PathBuf;

mod formatter;
mod prompt;

#[derive(Parser)]
#[command(name = "sheetscrub")]
#[command(about = "Copy client workout sheets into anonymized, renamed templates", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Take the suggested name for every new workout signature
    #[arg(long)]
    accept_suggestions: bool,

    /// Do not ask for confirmation before the batch or about the client list
    #[arg(short, long)]
    yes: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("sheetscrub.toml"));
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.validate().context("Invalid configuration")?;

    let token = std::env::var(&config.service.access_token_env).with_context(|| {
        format!(
            "Environment variable {} must hold an OAuth access token",
            config.service.access_token_env
        )
    })?;
    let service = GoogleSheets::new(token, config.service.timeout_secs)
        .context("Failed to set up the spreadsheet client")?;

    println!("Hint: folder IDs are in the URL of the folder in Google Drive.");
    let source = match &config.folders.source {
        Some(id) => id.clone(),
        None => prompt::ask("Please enter the source folder ID: ")?,
    };
    let destination = match &config.folders.destination {
        Some(id) => id.clone(),
        None => prompt::ask("Please enter the destination folder ID: ")?,
    };

    if !cli.yes && prompt::confirm("Do you want to create the client list?")? {
        return create_client_list(&service, &config, &source, &destination);
    }

    let store = match (&config.translations.csv, &config.translations.spreadsheet) {
        (Some(path), _) => TranslationStore::open(CsvTable::new(path)),
        (None, Some(id)) => TranslationStore::open(SheetTable::new(&service, id.clone())),
        (None, None) => anyhow::bail!("No translation table configured"),
    }
    .context("Failed to load the translation table")?;

    let mut organizer = Organizer::new(&service, store, &config, destination.as_str())?;
    let files = organizer
        .source_files(&source)
        .with_context(|| format!("Failed to list source folder {source}"))?;

    formatter::print_plan(&files, organizer.store().len());
    if files.is_empty() {
        return Ok(());
    }
    if !cli.yes && !prompt::confirm("Proceed?")? {
        return Ok(());
    }

    let mut batch = organizer.batch(&source, files);
    let report = loop {
        let step = batch
            .advance()
            .context("Translation table can no longer be trusted; run aborted")?;
        match step {
            Step::Request(Request::Name(request)) => {
                let reply = if cli.accept_suggestions {
                    Reply::Name(String::new())
                } else {
                    prompt::ask_name(&request)?
                };
                batch.reply(reply)?;
            }
            Step::Request(Request::Confirm(preview)) => {
                batch.reply(prompt::confirm_record(&preview)?)?;
            }
            Step::Processed(outcome) => formatter::print_outcome(&outcome),
            Step::Finished(report) => break report,
        }
    };

    formatter::print_summary(&report);
    if report.has_failures() {
        std::process::exit(1);
    }
    Ok(())
}

/// Write a fresh translation table listing every source file, then stop so
/// the coach can fill it in
fn create_client_list(
    service: &dyn SheetService,
    config: &Config,
    source: &str,
    destination: &str,
) -> Result<()> {
    let files: Vec<_> = service
        .list_spreadsheets(source)
        .with_context(|| format!("Failed to list source folder {source}"))?
        .into_iter()
        .filter(|file| {
            !config
                .workflow
                .exclude_file_names
                .iter()
                .any(|pattern| file.name.contains(pattern.as_str()))
        })
        .collect();

    let mut table: Box<dyn TableBackend + '_>;
    let location: String;
    match &config.translations.csv {
        Some(path) => {
            table = Box::new(CsvTable::create_new(path).context("Failed to create the client list")?);
            location = path.display().to_string();
        }
        None => {
            let sheet = SheetTable::create(service, destination)
                .context("Failed to create the client list spreadsheet")?;
            location = format!("spreadsheet {}", sheet.file_id());
            table = Box::new(sheet);
        }
    }

    let written = client_list::seed(table.as_mut(), &files)?;
    formatter::print_client_list(written, &location);
    Ok(())
}
