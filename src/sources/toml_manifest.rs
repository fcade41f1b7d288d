// src/sources/toml_manifest.rs

//! Reader for generic TOML manifests that keep a table of script names at a dotted path
//! (e.g. `tool.poetry.scripts` in `pyproject.toml`). Each key becomes one command run
//! through the tool's prefix.

use super::{SourceCommands, SourceError, SourceReader, lines, read_if_exists};
use crate::models::{CommandRecord, Provenance};
use std::path::Path;
use toml::de::{DeTable, DeValue};

/// Reads the script table found at `table_path` of a TOML manifest.
#[derive(Debug, Clone, Copy)]
pub struct TomlManifestReader {
    tool: &'static str,
    table_path: &'static str,
    run_prefix: &'static str,
}

impl TomlManifestReader {
    /// Creates a reader reporting commands for `tool`, found at `table_path`, run via `run_prefix`.
    pub const fn new(tool: &'static str, table_path: &'static str, run_prefix: &'static str) -> Self {
        Self {
            tool,
            table_path,
            run_prefix,
        }
    }
}

impl SourceReader for TomlManifestReader {
    fn read(&self, path: &Path) -> Result<Option<SourceCommands>, SourceError> {
        let Some(content) = read_if_exists(path)? else {
            return Ok(None);
        };

        let document = DeTable::parse(&content).map_err(|source| SourceError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        let mut commands = SourceCommands {
            tool: self.tool.to_string(),
            records: Vec::new(),
        };

        let Some(value) = lookup(document.get_ref(), self.table_path) else {
            log::debug!(
                "No '{}' table in '{}'.",
                self.table_path,
                path.display()
            );
            return Ok(Some(commands));
        };

        let DeValue::Table(scripts) = value else {
            return Err(SourceError::NotATable {
                path: path.to_path_buf(),
                table_path: self.table_path.to_string(),
            });
        };

        // Key spans point into `content`, whatever the table's layout.
        commands.records = scripts
            .iter()
            .map(|(name, _)| {
                let line = lines::line_of_offset(&content, name.span().start);
                self.record(name.get_ref(), Provenance::new(path, line))
            })
            .collect();

        Ok(Some(commands))
    }
}

impl TomlManifestReader {
    fn record(&self, name: &str, provenance: Provenance) -> CommandRecord {
        let file = provenance.file_path.display().to_string();
        CommandRecord {
            name: name.to_string(),
            short_help: format!(t!("source.short"), name = name, file = file),
            long_help: format!(
                t!("source.long"),
                name = name,
                file = file,
                line = provenance.line
            ),
            script: vec![format!("{} {}", self.run_prefix, name)],
            flags: Vec::new(),
            env: Vec::new(),
            provenance,
        }
    }
}

/// Follows a dotted path through nested tables. A missing segment, or a non-table on the
/// way, means the path is absent.
fn lookup<'a, 'i>(table: &'a DeTable<'i>, dotted: &str) -> Option<&'a DeValue<'i>> {
    let mut segments = dotted.split('.');
    let mut current = entry(table, segments.next()?)?;
    for segment in segments {
        let DeValue::Table(table) = current else {
            return None;
        };
        current = entry(table, segment)?;
    }
    Some(current)
}

fn entry<'a, 'i>(table: &'a DeTable<'i>, key: &str) -> Option<&'a DeValue<'i>> {
    table
        .iter()
        .find(|(name, _)| name.get_ref() == key)
        .map(|(_, value)| value.get_ref())
}
