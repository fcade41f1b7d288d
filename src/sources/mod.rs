//! # Source Readers
//!
//! Every format that can declare runnable scripts gets a reader implementing
//! [`SourceReader`]. A reader turns one file into canonical [`CommandRecord`]s carrying
//! their provenance, and reports which tool the commands belong to.
//!
//! Readers distinguish three outcomes:
//!
//! - `Ok(None)`: the file does not exist. Never an error.
//! - `Ok(Some(..))`: the file was read; it may declare zero commands.
//! - `Err(..)`: the file is present but malformed, unreadable, or its environment is
//!   ambiguous (e.g. a `package.json` without any lockfile).
//!
//! Project sources are detected through the static [`PROJECT_SOURCES`] registry of
//! `(marker file, reader)` pairs.

pub mod lines;
pub mod makefile;
pub mod package_json;
pub mod task_file;
pub mod toml_manifest;

use crate::models::CommandRecord;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors a source reader can report.
#[derive(Error, Debug)]
pub enum SourceError {
    /// The file exists but could not be read.
    #[error("Could not read '{path}': {source}")]
    Io {
        /// The file being read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML document could not be parsed.
    #[error("Failed to parse TOML file at '{path}': {source}")]
    Toml {
        /// The file being read.
        path: PathBuf,
        /// The underlying parsing error from the `toml` crate.
        #[source]
        source: toml::de::Error,
    },
    /// The JSON document could not be parsed.
    #[error("Failed to parse JSON file at '{path}': {source}")]
    Json {
        /// The file being read.
        path: PathBuf,
        /// The underlying parsing error from `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// The scripts path exists but does not point at a table.
    #[error("'{table_path}' in '{path}' is not a table")]
    NotATable {
        /// The file being read.
        path: PathBuf,
        /// The dotted path that was expected to be a table.
        table_path: String,
    },
    /// No lockfile tells which package manager runs the scripts.
    #[error("No package manager lockfile found next to '{path}'")]
    NoPackageManager {
        /// The package manifest.
        path: PathBuf,
    },
    /// A task-file command has a name that is not a scalar.
    #[error("Command name at {path}:{line} is not a scalar value")]
    NonScalarName {
        /// The task file.
        path: PathBuf,
        /// Line of the offending `name`.
        line: usize,
    },
}

/// The error taxonomy a [`SourceError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    /// The file is present but cannot be turned into commands.
    SourceMalformed,
    /// The file is fine but the surrounding project does not say how to run it.
    UnresolvableEnvironment,
}

impl SourceError {
    /// Classifies the error.
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            Self::NoPackageManager { .. } => SourceErrorKind::UnresolvableEnvironment,
            _ => SourceErrorKind::SourceMalformed,
        }
    }
}

/// The commands read from one source, tagged with the tool that runs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCommands {
    /// Tool alias (`make`, `yarn`, `poetry`, `runr`, ...).
    pub tool: String,
    /// Records in a deterministic order.
    pub records: Vec<CommandRecord>,
}

/// A reader for one source format.
pub trait SourceReader: Sync + fmt::Debug {
    /// Reads the commands declared in `path`. See the module docs for the outcome contract.
    fn read(&self, path: &Path) -> Result<Option<SourceCommands>, SourceError>;
}

/// A project source detected by the presence of a marker file in the project directory.
#[derive(Debug)]
pub struct ProjectSource {
    /// File name looked up in the project directory.
    pub marker: &'static str,
    /// Reader for that file.
    pub reader: &'static dyn SourceReader,
}

/// The project sources, in priority order.
pub static PROJECT_SOURCES: &[ProjectSource] = &[
    ProjectSource {
        marker: "Makefile",
        reader: &makefile::MakefileReader,
    },
    ProjectSource {
        marker: "pyproject.toml",
        reader: &toml_manifest::TomlManifestReader::new("poetry", "tool.poetry.scripts", "poetry run"),
    },
    ProjectSource {
        marker: "pyproject.toml",
        reader: &toml_manifest::TomlManifestReader::new("pdm", "tool.pdm.scripts", "pdm run"),
    },
    ProjectSource {
        marker: "package.json",
        reader: &package_json::PackageJsonReader,
    },
];

/// Reads a file to a string, mapping "not found" to `Ok(None)`.
pub(crate) fn read_if_exists(path: &Path) -> Result<Option<String>, SourceError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::debug!("Source '{}' not found, skipping.", path.display());
            Ok(None)
        }
        Err(e) => Err(SourceError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
