// src/system/editor.rs

//! Opening the declaration of a command in the user's editor.

use crate::models::EditTarget;
use colored::*;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

/// Errors raised while opening the editor.
#[derive(Error, Debug)]
pub enum EditorError {
    /// The editor setting is empty or has unbalanced quotes.
    #[error("Editor command '{0}' could not be parsed.")]
    InvalidCommand(String),
    /// The editor program could not be started.
    #[error("Editor '{editor}' could not be launched: {source}")]
    Launch {
        /// The program that was being started.
        editor: String,
        /// The underlying error from the OS.
        #[source]
        source: std::io::Error,
    },
}

// Editors that take `--goto file:line` instead of `+line file`.
const GOTO_EDITORS: &[&str] = &["code", "code-insiders", "codium", "cursor"];

/// Splits the editor command (which may carry its own arguments, e.g. `"emacs -nw"`)
/// and appends the arguments that open `target` at its line.
///
/// Returns the program and its arguments, or [`EditorError::InvalidCommand`].
pub fn editor_command(editor: &str, target: &EditTarget) -> Result<(String, Vec<String>), EditorError> {
    let mut parts = shlex::split(editor)
        .filter(|parts| !parts.is_empty())
        .ok_or_else(|| EditorError::InvalidCommand(editor.to_string()))?;
    let program = parts.remove(0);
    let file = target.file_path.display().to_string();

    let stem = Path::new(&program)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(program.as_str());

    if target.line == 0 {
        parts.push(file);
    } else if GOTO_EDITORS.contains(&stem) {
        parts.push("--goto".to_string());
        parts.push(format!("{}:{}", file, target.line));
    } else {
        parts.push(format!("+{}", target.line));
        parts.push(file);
    }
    Ok((program, parts))
}

/// Opens `target` in `editor` and waits for the editor to exit. Returns its exit code,
/// `1` when it was killed by a signal.
pub fn open(editor: &str, target: &EditTarget) -> Result<i32, EditorError> {
    let (program, args) = editor_command(editor, target)?;
    println!(
        "{} {}:{}",
        t!("editor.opening").blue(),
        target.file_path.display(),
        target.line
    );
    log::debug!("Launching editor: {} {:?}", program, args);

    let status = StdCommand::new(&program)
        .args(&args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|source| EditorError::Launch {
            editor: program.clone(),
            source,
        })?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(line: usize) -> EditTarget {
        EditTarget {
            file_path: "/work/Makefile".into(),
            line,
        }
    }

    #[test]
    fn test_plus_line_style() {
        let (program, args) = editor_command("vim", &target(12)).unwrap();
        assert_eq!(program, "vim");
        assert_eq!(args, vec!["+12", "/work/Makefile"]);
    }

    #[test]
    fn test_editor_with_arguments_and_goto_style() {
        let (program, args) = editor_command("emacs -nw", &target(3)).unwrap();
        assert_eq!(program, "emacs");
        assert_eq!(args, vec!["-nw", "+3", "/work/Makefile"]);

        let (program, args) = editor_command("/usr/bin/code --wait", &target(3)).unwrap();
        assert_eq!(program, "/usr/bin/code");
        assert_eq!(args, vec!["--wait", "--goto", "/work/Makefile:3"]);
    }

    #[test]
    fn test_unknown_line_opens_file_only() {
        let (_, args) = editor_command("nano", &target(0)).unwrap();
        assert_eq!(args, vec!["/work/Makefile"]);
    }

    #[test]
    fn test_invalid_editor_command() {
        assert!(matches!(
            editor_command("   ", &target(1)),
            Err(EditorError::InvalidCommand(_))
        ));
        assert!(matches!(
            editor_command("vim \"unterminated", &target(1)),
            Err(EditorError::InvalidCommand(_))
        ));
    }
}
