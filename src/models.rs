// src/models.rs

//! The data passed between sources, the engine and the executor.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

// --- PROVENANCE & BINDINGS ---

/// Where a command was declared. Used for "jump to definition" and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    /// The file that declared the command.
    pub file_path: PathBuf,
    /// 1-based line of the declaration, or `0` when it could not be located.
    pub line: usize,
}

impl Provenance {
    /// Creates a new provenance record.
    pub fn new(file_path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file_path: file_path.into(),
            line,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file_path.display(), self.line)
    }
}

/// A named value, used both for substitution variables and for environment overlays.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct VariableBinding {
    /// The variable name.
    pub name: String,
    /// The value bound to it.
    pub value: String,
}

impl VariableBinding {
    /// Creates a new binding.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

// --- FLAGS ---

/// The value type of a declared command flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagKind {
    /// Takes a string value (`--flag value`).
    String,
    /// A switch (`--flag`).
    Bool,
}

impl FlagKind {
    /// Parses the `type` field of a flag declaration. Unknown types yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "string" => Some(Self::String),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }
}

/// An optional CLI flag declared on a task-file command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagSpec {
    /// Long flag name, without leading dashes.
    pub flag: String,
    /// Help text shown for the flag.
    pub description: String,
    /// Value type.
    pub kind: FlagKind,
    /// Value used when the flag is not given on the command line.
    pub default: String,
}

impl FlagSpec {
    /// The environment variable the flag's value is exported as (`dry-run` -> `DRY_RUN`).
    pub fn env_name(&self) -> String {
        self.flag.replace('-', "_").to_uppercase()
    }
}

// --- COMMAND RECORDS ---

/// The canonical unit produced by every source reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRecord {
    /// Logical name; unique within one source only.
    pub name: String,
    /// Where the command was declared.
    pub provenance: Provenance,
    /// One-line help.
    pub short_help: String,
    /// Extended help.
    pub long_help: String,
    /// Invocation lines, run in order. Never empty once a reader has produced the record.
    pub script: Vec<String>,
    /// Declared CLI flags.
    pub flags: Vec<FlagSpec>,
    /// Environment injected into every process started for this command.
    pub env: Vec<VariableBinding>,
}

/// Same-named commands declared by different tools, keyed by tool alias.
///
/// Entries keep the order in which their tool was first inserted; re-inserting an
/// existing tool replaces its record in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisambiguationGroup {
    name: String,
    entries: Vec<(String, CommandRecord)>,
}

impl DisambiguationGroup {
    /// Creates an empty group for a logical command name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// The logical name shared by every record in the group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts or replaces the record for `tool`, returning the replaced record.
    pub fn insert(&mut self, tool: impl Into<String>, record: CommandRecord) -> Option<CommandRecord> {
        debug_assert_eq!(record.name, self.name);
        let tool = tool.into();
        match self.entries.iter_mut().find(|(alias, _)| *alias == tool) {
            Some((_, existing)) => Some(std::mem::replace(existing, record)),
            None => {
                self.entries.push((tool, record));
                None
            }
        }
    }

    /// Looks up the record declared by `tool`.
    pub fn get(&self, tool: &str) -> Option<&CommandRecord> {
        self.entries
            .iter()
            .find(|(alias, _)| alias == tool)
            .map(|(_, record)| record)
    }

    /// Number of tools declaring this command.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if no tool declares this command.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tool aliases in declaration order.
    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(alias, _)| alias.as_str())
    }

    /// `(tool, record)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CommandRecord)> {
        self.entries
            .iter()
            .map(|(alias, record)| (alias.as_str(), record))
    }
}

/// Logical command name -> group of records declaring it.
pub type CommandMap = BTreeMap<String, DisambiguationGroup>;

// --- INVOCATION ---

/// One executable step derived from a script line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationPlan {
    /// The program to start.
    pub program: String,
    /// Its arguments: static ones from the script line followed by the caller's extras.
    pub args: Vec<String>,
    /// Environment overlay applied on top of the inherited environment.
    pub env: Vec<VariableBinding>,
}

impl InvocationPlan {
    /// Renders the plan as a shell-quoted command line for display.
    pub fn command_line(&self) -> String {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        shlex::try_join(words.clone()).unwrap_or_else(|_| words.collect::<Vec<_>>().join(" "))
    }
}

/// The file and line an "edit" request should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    /// File to open.
    pub file_path: PathBuf,
    /// Line to jump to (`0` when unknown).
    pub line: usize,
}

impl From<&Provenance> for EditTarget {
    fn from(provenance: &Provenance) -> Self {
        Self {
            file_path: provenance.file_path.clone(),
            line: provenance.line,
        }
    }
}
