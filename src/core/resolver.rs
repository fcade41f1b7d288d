// src/core/resolver.rs

//! Disambiguation policy: decides which record(s) of a group an invocation acts on.
//!
//! 1. A group with a single entry always resolves to it, whatever tool was asked for.
//! 2. A selected tool present in the group resolves to that tool's record.
//! 3. Otherwise, edit mode fails: there is no sensible default file to open.
//! 4. Otherwise every tool's record is returned, in declaration order.

use crate::models::{CommandRecord, DisambiguationGroup};
use thiserror::Error;

/// The outcome of resolving a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    /// Exactly one record, with the tool declaring it.
    Single(&'a str, &'a CommandRecord),
    /// Every record of the group, in declaration order.
    All(Vec<(&'a str, &'a CommandRecord)>),
}

/// Errors raised while resolving a group.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Edit mode needs a single declaration but several tools declare the command.
    #[error("'{name}' is declared by several tools ({tools}); use --tool to pick the one to edit")]
    AmbiguousEditTarget {
        /// The logical command name.
        name: String,
        /// The tools declaring it, comma separated.
        tools: String,
    },
}

/// Resolves `group` for an invocation. See the module docs for the rules.
pub fn resolve<'a>(
    group: &'a DisambiguationGroup,
    selected_tool: Option<&str>,
    edit_mode: bool,
) -> Result<Selection<'a>, ResolveError> {
    // Rule 1
    if group.len() == 1 {
        if let Some((tool, record)) = group.iter().next() {
            return Ok(Selection::Single(tool, record));
        }
    }

    // Rule 2
    if let Some(selected) = selected_tool {
        if let Some((tool, record)) = group.iter().find(|(tool, _)| *tool == selected) {
            return Ok(Selection::Single(tool, record));
        }
        log::debug!(
            "Tool '{}' does not declare '{}' (available: {}).",
            selected,
            group.name(),
            group.tools().collect::<Vec<_>>().join(", ")
        );
    }

    // Rule 3
    if edit_mode {
        return Err(ResolveError::AmbiguousEditTarget {
            name: group.name().to_string(),
            tools: group.tools().collect::<Vec<_>>().join(", "),
        });
    }

    // Rule 4
    Ok(Selection::All(group.iter().collect()))
}
