//! Output formatters for batch progress

use colored::*;
use sheetscrub_core::{BatchReport, FileEntry, OutcomeStatus, RecordOutcome};

pub fn print_plan(files: &[FileEntry], known_names: usize) {
    println!(
        "{}",
        format!("Found {} spreadsheet(s) to process", files.len()).bold()
    );
    println!("  {} {}", "Known templates:".bright_black(), known_names);
    println!();
}

/// One line per record, as it is processed
pub fn print_outcome(outcome: &RecordOutcome) {
    match &outcome.status {
        OutcomeStatus::Copied { title, cleared, .. } => {
            println!(
                "{} {} -> {} {}",
                "COPIED".green().bold(),
                outcome,
                title.cyan(),
                format!("({} cell(s) blanked)", cleared.len()).bright_black()
            );
        }
        OutcomeStatus::Skipped(reason) => {
            println!("{} {} {}", "SKIP".blue().bold(), outcome, format!("({reason})").bright_black());
        }
        OutcomeStatus::Failed(e) => {
            println!("{} {}: {}", "ERROR".red().bold(), outcome, e);
        }
    }
}

pub fn print_summary(report: &BatchReport) {
    println!();
    println!("{}", "Summary:".bold().underline());
    println!("  {} {}", "Copied:".green().bold(), report.copied);
    if report.skipped > 0 {
        println!("  {} {}", "Skipped:".blue().bold(), report.skipped);
    }
    if report.has_failures() {
        println!("  {} {}", "Failed:".red().bold(), report.failures.len());
        for (record, message) in &report.failures {
            println!("    {} {}", record.to_string().yellow(), message);
        }
    } else {
        println!("{}", "✓ No failures".green().bold());
    }
}

pub fn print_client_list(written: usize, location: &str) {
    println!(
        "{} {} client name(s) written to {}",
        "✓".green().bold(),
        written,
        location.cyan()
    );
    println!("Fill in the name column (and 'y' under skip where needed), then run again.");
}
