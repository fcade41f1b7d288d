// src/sources/package_json.rs

//! Reader for `package.json`. The package manager that runs the scripts is picked from
//! the lockfile sitting next to the manifest; without one the run prefix would be a
//! guess, so the read fails instead.

use super::{SourceCommands, SourceError, SourceReader, lines, read_if_exists};
use crate::models::{CommandRecord, Provenance};
use serde_json::Value;
use std::path::Path;

/// Lockfiles in detection order, with the manager they belong to.
const LOCKFILES: &[(&str, &str)] = &[
    ("yarn.lock", "yarn"),
    ("pnpm-lock.yaml", "pnpm"),
    ("package-lock.json", "npm"),
];

/// Reads the `scripts` object of a `package.json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackageJsonReader;

impl SourceReader for PackageJsonReader {
    fn read(&self, path: &Path) -> Result<Option<SourceCommands>, SourceError> {
        let Some(content) = read_if_exists(path)? else {
            return Ok(None);
        };

        let manifest: Value = serde_json::from_str(&content).map_err(|source| SourceError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let manager = detect_package_manager(path).ok_or_else(|| SourceError::NoPackageManager {
            path: path.to_path_buf(),
        })?;
        log::debug!("Using '{}' to run scripts from '{}'.", manager, path.display());

        let mut commands = SourceCommands {
            tool: manager.to_string(),
            records: Vec::new(),
        };

        let Some(scripts) = manifest.get("scripts").and_then(Value::as_object) else {
            return Ok(Some(commands));
        };

        commands.records = scripts
            .iter()
            .map(|(name, body)| {
                let line = lines::locate_json_key(&content, "scripts", name).unwrap_or_else(|| {
                    log::debug!("Could not locate script '{}' in '{}'.", name, path.display());
                    0
                });
                script_record(manager, name, body.as_str(), Provenance::new(path, line))
            })
            .collect();

        Ok(Some(commands))
    }
}

/// Returns the package manager whose lockfile sits next to `manifest`.
pub fn detect_package_manager(manifest: &Path) -> Option<&'static str> {
    let dir = manifest.parent().unwrap_or_else(|| Path::new(""));
    LOCKFILES
        .iter()
        .find(|(lockfile, _)| dir.join(lockfile).is_file())
        .map(|&(_, manager)| manager)
}

fn script_record(manager: &str, name: &str, body: Option<&str>, provenance: Provenance) -> CommandRecord {
    let file = provenance.file_path.display().to_string();
    let long_help = match body {
        Some(body) => format!(
            t!("source.long_with_body"),
            name = name,
            file = file,
            line = provenance.line,
            body = body
        ),
        None => format!(
            t!("source.long"),
            name = name,
            file = file,
            line = provenance.line
        ),
    };
    CommandRecord {
        name: name.to_string(),
        short_help: format!(t!("source.short"), name = name, file = file),
        long_help,
        script: vec![format!("{} run {}", manager, name)],
        flags: Vec::new(),
        env: Vec::new(),
        provenance,
    }
}
