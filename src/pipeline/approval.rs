use async_trait::async_trait;
use console::style;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::debug;

use crate::errors::HawxError;

/// Operator decision for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Approval {
    /// Run this (possibly edited) command.
    Run(String),
    Skip,
    /// Run this command and every remaining one in the layer without asking.
    RunAll,
}

/// Interactive gate in front of command execution.
#[async_trait]
pub trait CommandApprover: Send + Sync {
    /// Decide on `command`, which is number `index` (1-based) of `total`.
    async fn review(&self, command: &str, index: usize, total: usize) -> Result<Approval, HawxError>;

    /// Pick which of the fixed web commands to run.
    async fn select(&self, commands: &[String]) -> Result<Vec<String>, HawxError>;
}

/// Prompts on the terminal through rustyline.
#[derive(Debug, Default)]
pub struct ConsoleApprover;

#[async_trait]
impl CommandApprover for ConsoleApprover {
    async fn review(&self, command: &str, index: usize, total: usize) -> Result<Approval, HawxError> {
        let command = command.to_string();
        // rustyline is blocking
        tokio::task::spawn_blocking(move || review_blocking(&command, index, total))
            .await
            .map_err(|e| HawxError::Internal(format!("Prompt task failed: {}", e)))?
    }

    async fn select(&self, commands: &[String]) -> Result<Vec<String>, HawxError> {
        let commands = commands.to_vec();
        tokio::task::spawn_blocking(move || select_blocking(&commands))
            .await
            .map_err(|e| HawxError::Internal(format!("Prompt task failed: {}", e)))?
    }
}

fn editor() -> Result<DefaultEditor, HawxError> {
    DefaultEditor::new().map_err(|e| HawxError::Internal(format!("Failed to open line editor: {}", e)))
}

fn review_blocking(command: &str, index: usize, total: usize) -> Result<Approval, HawxError> {
    let mut editor = editor()?;
    println!();
    println!(
        "  {} {}",
        style(format!("[{}/{}]", index, total)).dim(),
        style(command).white().bold()
    );

    let prompt = format!(
        "  {} run  {} modify  {} skip  {} yes to all > ",
        style("[Enter]").cyan(),
        style("m").cyan(),
        style("s").cyan(),
        style("Y").cyan()
    );
    let answer = match editor.readline(&prompt) {
        Ok(line) => line,
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
            debug!(command, "Prompt closed, skipping command");
            return Ok(Approval::Skip);
        }
        Err(e) => return Err(HawxError::Internal(format!("Prompt failed: {}", e))),
    };

    match parse_choice(&answer) {
        Choice::Run => Ok(Approval::Run(command.to_string())),
        Choice::Skip => Ok(Approval::Skip),
        Choice::RunAll => Ok(Approval::RunAll),
        Choice::Modify => {
            let edited = match editor.readline_with_initial("  edit> ", (command, "")) {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => String::new(),
                Err(e) => return Err(HawxError::Internal(format!("Prompt failed: {}", e))),
            };
            Ok(Approval::Run(modified_or_original(&edited, command)))
        }
    }
}

fn select_blocking(commands: &[String]) -> Result<Vec<String>, HawxError> {
    let mut editor = editor()?;
    let mut selected = vec![true; commands.len()];

    loop {
        println!();
        println!("  {}", style("Web reconnaissance commands").white().bold());
        for (i, (command, on)) in commands.iter().zip(&selected).enumerate() {
            let mark = if *on { style("[x]").green() } else { style("[ ]").dim() };
            println!("  {} {:>2}. {}", mark, i + 1, command);
        }

        let line = match editor.readline("  toggle numbers, a = all, n = none, Enter = confirm > ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(HawxError::Internal(format!("Prompt failed: {}", e))),
        };
        if apply_toggle(&mut selected, &line) == MenuStep::Confirm {
            break;
        }
    }

    Ok(commands
        .iter()
        .zip(selected)
        .filter(|(_, on)| *on)
        .map(|(c, _)| c.clone())
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Run,
    Modify,
    Skip,
    RunAll,
}

/// Anything unrecognized runs the command, like a bare Enter.
pub fn parse_choice(input: &str) -> Choice {
    match input.trim() {
        "m" | "M" => Choice::Modify,
        "s" | "S" => Choice::Skip,
        "Y" | "y" | "yes" => Choice::RunAll,
        _ => Choice::Run,
    }
}

pub fn modified_or_original(edited: &str, original: &str) -> String {
    let edited = edited.trim();
    if edited.is_empty() {
        original.to_string()
    } else {
        edited.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuStep {
    Continue,
    Confirm,
}

/// Apply one line of menu input to `selected`.
pub fn apply_toggle(selected: &mut [bool], input: &str) -> MenuStep {
    let input = input.trim();
    match input {
        "" => return MenuStep::Confirm,
        "a" | "A" => selected.iter_mut().for_each(|s| *s = true),
        "n" | "N" => selected.iter_mut().for_each(|s| *s = false),
        _ => {
            for token in input.split(|c: char| c == ',' || c.is_whitespace()) {
                let Ok(n) = token.parse::<usize>() else { continue };
                if let Some(slot) = n.checked_sub(1).and_then(|i| selected.get_mut(i)) {
                    *slot = !*slot;
                }
            }
        }
    }
    MenuStep::Continue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice(""), Choice::Run);
        assert_eq!(parse_choice(" m "), Choice::Modify);
        assert_eq!(parse_choice("s"), Choice::Skip);
        assert_eq!(parse_choice("Y"), Choice::RunAll);
        assert_eq!(parse_choice("whatever"), Choice::Run);
    }

    #[test]
    fn test_empty_modification_keeps_original() {
        assert_eq!(modified_or_original("  ", "nmap x"), "nmap x");
        assert_eq!(modified_or_original("nmap -sV x ", "nmap x"), "nmap -sV x");
    }

    #[test]
    fn test_toggle_menu() {
        let mut selected = vec![true; 4];
        assert_eq!(apply_toggle(&mut selected, "1, 3 9 x"), MenuStep::Continue);
        assert_eq!(selected, vec![false, true, false, true]);
        apply_toggle(&mut selected, "n");
        assert_eq!(selected, vec![false; 4]);
        apply_toggle(&mut selected, "a");
        assert_eq!(selected, vec![true; 4]);
        assert_eq!(apply_toggle(&mut selected, ""), MenuStep::Confirm);
    }
}
