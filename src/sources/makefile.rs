// src/sources/makefile.rs

//! Reader for build-tool manifests (`Makefile`).
//!
//! Targets are column-0 `<name>:` lines. `include` directives are followed depth-first,
//! with a visited set keyed by canonical path so mutual includes terminate. Later
//! declarations of a target override earlier ones, including those pulled in by an include.

use super::{SourceCommands, SourceError, SourceReader, read_if_exists};
use crate::models::{CommandRecord, Provenance};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

const TOOL: &str = "make";
const INCLUDE_DIRECTIVES: &[&str] = &["include", "-include", "sinclude"];

/// Reads the targets of a `Makefile` and its includes.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakefileReader;

impl SourceReader for MakefileReader {
    fn read(&self, path: &Path) -> Result<Option<SourceCommands>, SourceError> {
        let mut visited = HashSet::new();
        let Some(targets) = parse_makefile(path, &mut visited)? else {
            return Ok(None);
        };

        let records = targets
            .into_iter()
            .map(|(name, provenance)| target_record(name, provenance))
            .collect();

        Ok(Some(SourceCommands {
            tool: TOOL.to_string(),
            records,
        }))
    }
}

/// Parses one makefile, recursing into its includes.
///
/// Returns `Ok(None)` if the file does not exist or was already visited in this read.
fn parse_makefile(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<Option<BTreeMap<String, Provenance>>, SourceError> {
    let visit_key = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(visit_key) {
        log::debug!("Makefile '{}' already visited, skipping.", path.display());
        return Ok(None);
    }

    let Some(content) = read_if_exists(path)? else {
        return Ok(None);
    };

    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let mut targets = BTreeMap::new();

    for (index, line) in content.lines().enumerate() {
        if let Some(includes) = parse_include(line) {
            for include in includes {
                let included_path = dir.join(include);
                log::trace!(
                    "'{}' includes '{}'",
                    path.display(),
                    included_path.display()
                );
                if let Some(included) = parse_makefile(&included_path, visited)? {
                    targets.extend(included);
                }
            }
            continue;
        }

        if let Some(name) = parse_target(line) {
            targets.insert(name.to_string(), Provenance::new(path, index + 1));
        }
    }

    Ok(Some(targets))
}

/// Returns the paths named by an include directive.
fn parse_include(line: &str) -> Option<Vec<&str>> {
    if line.starts_with('\t') {
        return None;
    }
    let mut words = line.split_whitespace();
    let directive = words.next()?;
    if !INCLUDE_DIRECTIVES.contains(&directive) {
        return None;
    }
    let paths: Vec<&str> = words
        .take_while(|word| !word.starts_with('#'))
        .filter(|word| {
            let resolvable = !word.contains('$');
            if !resolvable {
                log::debug!("Skipping include with variable reference: {}", word);
            }
            resolvable
        })
        .collect();
    Some(paths)
}

/// Returns the target name declared on a line, if any.
fn parse_target(line: &str) -> Option<&str> {
    if line.starts_with(char::is_whitespace) || line.starts_with('#') {
        return None;
    }
    let (head, rest) = line.split_once(':')?;
    // `:=` and `::=` are assignments; `build: CFLAGS += -O2` is a target-specific variable.
    if rest.contains('=') {
        return None;
    }
    let name = head.trim_end();
    let invalid = name.is_empty()
        || name.starts_with('.')
        || name.contains(|c: char| c.is_whitespace() || matches!(c, '%' | '$' | '='));
    if invalid {
        return None;
    }
    Some(name)
}

fn target_record(name: String, provenance: Provenance) -> CommandRecord {
    let file = provenance.file_path.display().to_string();
    CommandRecord {
        short_help: format!(t!("source.short"), name = name, file = file),
        long_help: format!(
            t!("source.long"),
            name = name,
            file = file,
            line = provenance.line
        ),
        script: vec![format!("{} {}", TOOL, name)],
        flags: Vec::new(),
        env: Vec::new(),
        provenance,
        name,
    }
}
