//! Interactive menu loop
//!
//! A failed action or an unreadable line is reported and control returns to
//! the menu; only the exit choice or end of input leaves the loop.

use anyhow::{Context, Result};
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Work requested from the menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuAction {
    Fetch(String),
    Render(PathBuf),
}

fn prompt<R: BufRead, W: Write>(input: &mut R, out: &mut W, message: &str) -> Result<Option<String>> {
    write!(out, "{}", message)?;
    out.flush()?;

    let mut line = String::new();
    match input.read_line(&mut line) {
        Ok(0) => Ok(None),
        Ok(_) => Ok(Some(line.trim().to_string())),
        // The offending line is consumed; answer it like an empty line
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            writeln!(out)?;
            writeln!(out, "Input was not valid text.")?;
            Ok(Some(String::new()))
        }
        Err(e) => Err(e).context("failed to read input"),
    }
}

/// Paths pasted from a file manager often arrive quoted
fn clean_path(raw: &str) -> PathBuf {
    PathBuf::from(raw.trim().trim_matches(|c| c == '"' || c == '\''))
}

pub fn run_menu<R, W, F>(mut input: R, mut out: W, mut handle: F) -> Result<()>
where
    R: BufRead,
    W: Write,
    F: FnMut(MenuAction) -> Result<()>,
{
    loop {
        writeln!(out, "Select an option:")?;
        writeln!(out, "[1] Get auction list")?;
        writeln!(out, "[2] Load manifest CSV")?;
        writeln!(out, "[3] Exit")?;

        let Some(choice) = prompt(&mut input, &mut out, "Enter your choice: ")? else {
            break;
        };

        let action = match choice.as_str() {
            "1" => match prompt(&mut input, &mut out, "Please enter the auction ID: ")? {
                Some(id) if !id.is_empty() => MenuAction::Fetch(id),
                Some(_) => {
                    writeln!(out, "No auction ID entered.")?;
                    continue;
                }
                None => break,
            },
            "2" => match prompt(&mut input, &mut out, "Please enter the path to the CSV file: ")? {
                Some(path) if !path.is_empty() => MenuAction::Render(clean_path(&path)),
                Some(_) => {
                    writeln!(out, "No path entered.")?;
                    continue;
                }
                None => break,
            },
            "3" => {
                writeln!(out, "Exiting the program.")?;
                return Ok(());
            }
            _ => {
                writeln!(out, "Invalid choice. Please try again.")?;
                continue;
            }
        };

        if let Err(e) = handle(action) {
            tracing::debug!(error = ?e, "menu action failed");
            writeln!(out, "An error occurred: {:#}", e)?;
        }
    }

    writeln!(out)?;
    Ok(())
}
