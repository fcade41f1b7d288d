// src/sources/task_file.rs

//! Reader for runr's own declarative task file (`runr.toml`, and the user-global
//! `global.toml`).
//!
//! ```toml
//! [[variables]]
//! name = "ENV"
//! value = "prod"
//!
//! [[commands]]
//! name = "deploy"
//! hint = "Deploy the app"
//! description = "Builds and ships the current branch."
//! script = ['echo deploying to \$ENV', 'make release']
//! ```
//!
//! Script lines are expanded with the variables of the same file before the record is
//! built. A command whose `name` is not a scalar makes the whole file unusable.

use super::{SourceCommands, SourceError, SourceReader, lines, read_if_exists};
use crate::constants::TASK_FILE_TOOL;
use crate::core::substitution::{binding_table, substitute_script};
use crate::models::{CommandRecord, FlagKind, FlagSpec, Provenance, VariableBinding};
use serde::Deserialize;
use std::path::Path;
use toml::{Spanned, Value};

// --- TASK FILE MODELS (what is read from the file) ---

#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
struct RawTaskFile {
    commands: Vec<RawCommand>,
    variables: Vec<VariableBinding>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RawCommand {
    name: Spanned<Value>,
    #[serde(default)]
    hint: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    script: Vec<String>,
    #[serde(default)]
    flags: Vec<RawFlag>,
    #[serde(default)]
    env: Vec<VariableBinding>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RawFlag {
    flag: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "type", default = "default_flag_type")]
    kind: String,
    #[serde(default)]
    default: String,
}

fn default_flag_type() -> String {
    "string".to_string()
}

// --- READER ---

/// Reads a declarative task file.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskFileReader;

impl SourceReader for TaskFileReader {
    fn read(&self, path: &Path) -> Result<Option<SourceCommands>, SourceError> {
        let Some(content) = read_if_exists(path)? else {
            return Ok(None);
        };

        let raw: RawTaskFile = toml::from_str(&content).map_err(|source| SourceError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        let variables = binding_table(&raw.variables);
        let mut records = Vec::with_capacity(raw.commands.len());

        for command in raw.commands {
            let line = lines::line_of_offset(&content, command.name.span().start);
            let name = scalar_name(command.name.get_ref()).ok_or_else(|| {
                SourceError::NonScalarName {
                    path: path.to_path_buf(),
                    line,
                }
            })?;
            let provenance = Provenance::new(path, line);

            if name.is_empty() {
                log::warn!("Skipping command with an empty name at {}.", provenance);
                continue;
            }
            if command.script.is_empty() {
                log::warn!(
                    "Skipping command '{}' at {}: it has no script lines.",
                    name,
                    provenance
                );
                continue;
            }

            let flags = command
                .flags
                .into_iter()
                .filter_map(|flag| flag_spec(flag, &provenance))
                .collect();

            let file = provenance.file_path.display().to_string();
            let short_help = command
                .hint
                .unwrap_or_else(|| format!(t!("task_file.short_fallback"), name = name));
            let long_help = format!(
                t!("task_file.long"),
                description = command.description.unwrap_or_default(),
                file = file,
                line = line
            );

            log::trace!("Read command '{}' from {}.", name, provenance);
            records.push(CommandRecord {
                name,
                provenance,
                short_help,
                long_help,
                script: substitute_script(&command.script, &variables),
                flags,
                env: command.env,
            });
        }

        Ok(Some(SourceCommands {
            tool: TASK_FILE_TOOL.to_string(),
            records,
        }))
    }
}

/// Renders a scalar TOML value as a command name. Arrays and tables have no name form.
fn scalar_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        _ => None,
    }
}

fn flag_spec(raw: RawFlag, provenance: &Provenance) -> Option<FlagSpec> {
    let Some(kind) = FlagKind::parse(&raw.kind) else {
        log::warn!(
            "Unknown flag type '{}' for '--{}' at {}; the flag is ignored.",
            raw.kind,
            raw.flag,
            provenance
        );
        return None;
    };
    Some(FlagSpec {
        flag: raw.flag,
        description: raw.description,
        kind,
        default: raw.default,
    })
}
