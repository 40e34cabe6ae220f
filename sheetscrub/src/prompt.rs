//! Blocking operator prompts on stdin/stdout

use colored::*;
use sheetscrub_core::{NameRequest, RecordPreview, Reply};
use std::io::{self, BufRead, Write};

/// Print the question and read one trimmed line
pub fn ask(question: &str) -> io::Result<String> {
    print!("{question}");
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed while waiting for an answer",
        ));
    }
    Ok(line.trim().to_string())
}

pub fn confirm(question: &str) -> io::Result<bool> {
    Ok(ask(&format!("{question} (y/n) "))?.eq_ignore_ascii_case("y"))
}

/// Ask for the name of a new workout signature
pub fn ask_name(request: &NameRequest) -> io::Result<Reply> {
    println!();
    println!("{} {}", "New workout:".bold(), request.signature.key.cyan());
    for (label, value) in &request.signature.parts {
        println!("  {}: {}", label.bright_black(), value);
    }

    let answer = ask(&format!(
        "Template name [{}] (Enter accepts, 'skip' leaves this workout): ",
        request.suggestion.green()
    ))?;
    Ok(if answer.eq_ignore_ascii_case("skip") {
        Reply::Skip
    } else {
        Reply::Name(answer)
    })
}

/// Show what is about to be copied and ask whether to go ahead
pub fn confirm_record(preview: &RecordPreview) -> io::Result<Reply> {
    println!();
    println!(
        "{} {} [{}]",
        "Record:".bold(),
        preview.file_name.cyan(),
        preview.record.sheet
    );
    println!("  {} {}", "Signature:".bold(), preview.signature.key);
    match &preview.known_name {
        Some(name) => println!("  {} {}", "Name:".bold(), name.green()),
        None => println!("  {} {}", "Name:".bold(), "(new, will ask)".yellow()),
    }
    let cells: Vec<String> = preview.pii_cells.iter().map(|c| c.to_string()).collect();
    println!("  {} {}", "Blanking:".bold(), cells.join(", "));

    Ok(if confirm("Copy this record?")? {
        Reply::Proceed
    } else {
        Reply::Skip
    })
}
