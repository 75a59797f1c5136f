use std::path::Path;

use crate::errors::HawxError;

const SHELL_OPERATORS: &[&str] = &["&&", "||", "|", ";", ">", "<", "`", "$("];

/// How a command string will be launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Direct exec of the split argv.
    Direct(Vec<String>),
    /// `sh -c <command>`; only for commands that need shell operators.
    Shell(String),
}

impl Invocation {
    pub fn parse(command: &str) -> Result<Self, HawxError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(HawxError::Process("empty command".into()));
        }
        if needs_shell(command) {
            return Ok(Invocation::Shell(command.to_string()));
        }
        let argv = split_args(command)?;
        if argv.is_empty() {
            return Err(HawxError::Process("empty command".into()));
        }
        Ok(Invocation::Direct(argv))
    }

    /// The argv handed to the OS.
    pub fn argv(&self) -> Vec<String> {
        match self {
            Invocation::Direct(argv) => argv.clone(),
            Invocation::Shell(cmd) => vec!["sh".to_string(), "-c".to_string(), cmd.clone()],
        }
    }
}

pub fn needs_shell(command: &str) -> bool {
    SHELL_OPERATORS.iter().any(|op| command.contains(op))
}

/// Tool name of a command string: basename of its first word.
pub fn tool_name(command: &str) -> String {
    let first = split_args(command)
        .ok()
        .and_then(|argv| argv.into_iter().next())
        .or_else(|| command.split_whitespace().next().map(str::to_string))
        .unwrap_or_default();
    Path::new(&first)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or(first)
}

/// Split a command line into words with POSIX-like quoting rules.
pub fn split_args(command: &str) -> Result<Vec<String>, HawxError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(ch) => current.push(ch),
                        None => return Err(HawxError::Process(format!("unterminated single quote in: {}", command))),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(ch @ ('"' | '\\' | '$' | '`')) => current.push(ch),
                            Some(ch) => {
                                current.push('\\');
                                current.push(ch);
                            }
                            None => return Err(HawxError::Process(format!("unterminated double quote in: {}", command))),
                        },
                        Some(ch) => current.push(ch),
                        None => return Err(HawxError::Process(format!("unterminated double quote in: {}", command))),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(ch) = chars.next() {
                    current.push(ch);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}
