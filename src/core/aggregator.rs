// src/core/aggregator.rs

//! Merges the commands of every active source into one map keyed by logical name.
//! Same-named commands from different tools end up side by side in one
//! [`DisambiguationGroup`]; a tool that declares a name twice keeps only the later record.

use crate::models::{CommandMap, DisambiguationGroup};
use crate::sources::SourceCommands;
use std::fmt::Write;

/// Merges sources, processed in the given order, into a name -> group map.
pub fn aggregate(sources: impl IntoIterator<Item = SourceCommands>) -> CommandMap {
    let mut commands = CommandMap::new();

    for source in sources {
        log::debug!(
            "Aggregating {} command(s) from '{}'.",
            source.records.len(),
            source.tool
        );
        for record in source.records {
            let name = record.name.clone();
            let provenance = record.provenance.clone();
            let group = commands
                .entry(name.clone())
                .or_insert_with(|| DisambiguationGroup::new(name.clone()));

            if let Some(previous) = group.insert(source.tool.as_str(), record) {
                log::debug!(
                    "'{}' for tool '{}' at {} overrides the one at {}.",
                    name,
                    source.tool,
                    provenance,
                    previous.provenance
                );
            }
        }
    }

    commands
}

/// One-line help for a group: the record's own help when only one tool declares it.
pub fn group_short_help(group: &DisambiguationGroup) -> String {
    match single_record_help(group, |r| r.short_help.clone()) {
        Some(help) => help,
        None => format!(
            t!("group.short"),
            name = group.name(),
            tools = group.tools().collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Extended help for a group, listing where each tool declares the command.
pub fn group_long_help(group: &DisambiguationGroup) -> String {
    if let Some(help) = single_record_help(group, |r| r.long_help.clone()) {
        return help;
    }
    let mut lines = String::new();
    for (tool, record) in group.iter() {
        let _ = write!(
            lines,
            t!("group.long_line"),
            tool = tool,
            file = record.provenance.file_path.display(),
            line = record.provenance.line
        );
    }
    format!(t!("group.long"), name = group.name(), lines = lines)
}

fn single_record_help(
    group: &DisambiguationGroup,
    help: impl Fn(&crate::models::CommandRecord) -> String,
) -> Option<String> {
    if group.len() != 1 {
        return None;
    }
    group.iter().next().map(|(_, record)| help(record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CommandRecord, Provenance};

    fn record(name: &str, file: &str, line: usize, script: &str) -> CommandRecord {
        CommandRecord {
            name: name.to_string(),
            provenance: Provenance::new(file, line),
            short_help: format!("{} from {}", name, file),
            long_help: String::new(),
            script: vec![script.to_string()],
            flags: Vec::new(),
            env: Vec::new(),
        }
    }

    fn source(tool: &str, records: Vec<CommandRecord>) -> SourceCommands {
        SourceCommands {
            tool: tool.to_string(),
            records,
        }
    }

    #[test]
    fn test_same_name_from_two_tools_forms_one_group() {
        let commands = aggregate(vec![
            source("make", vec![record("build", "Makefile", 3, "make build")]),
            source("yarn", vec![record("build", "package.json", 5, "yarn run build")]),
        ]);

        assert_eq!(commands.len(), 1);
        let group = &commands["build"];
        assert_eq!(group.len(), 2);
        assert_eq!(group.tools().collect::<Vec<_>>(), vec!["make", "yarn"]);
        assert_eq!(group.get("make").unwrap().script, vec!["make build"]);
        assert_eq!(group.get("yarn").unwrap().script, vec!["yarn run build"]);
    }

    #[test]
    fn test_same_name_and_tool_twice_keeps_later_record() {
        let commands = aggregate(vec![
            source("runr", vec![record("deploy", "global.toml", 2, "echo global")]),
            source("make", vec![record("deploy", "Makefile", 1, "make deploy")]),
            source("runr", vec![record("deploy", "runr.toml", 9, "echo local")]),
        ]);

        let group = &commands["deploy"];
        assert_eq!(group.len(), 2);
        let runr = group.get("runr").unwrap();
        assert_eq!(runr.script, vec!["echo local"]);
        assert_eq!(runr.provenance, Provenance::new("runr.toml", 9));
        // The tool keeps its original position.
        assert_eq!(group.tools().collect::<Vec<_>>(), vec!["runr", "make"]);
    }

    #[test]
    fn test_distinct_names_get_distinct_groups() {
        let commands = aggregate(vec![source(
            "make",
            vec![
                record("build", "Makefile", 1, "make build"),
                record("test", "Makefile", 4, "make test"),
            ],
        )]);
        assert_eq!(commands.keys().collect::<Vec<_>>(), vec!["build", "test"]);
        assert!(commands.values().all(|g| g.len() == 1));
    }

    #[test]
    fn test_group_help() {
        let commands = aggregate(vec![
            source("make", vec![record("build", "Makefile", 3, "make build")]),
            source("npm", vec![record("build", "package.json", 5, "npm run build")]),
            source("make", vec![record("lint", "Makefile", 8, "make lint")]),
        ]);

        assert_eq!(group_short_help(&commands["lint"]), "lint from Makefile");

        let short = group_short_help(&commands["build"]);
        assert!(short.contains("make, npm"));

        let long = group_long_help(&commands["build"]);
        assert!(long.contains("make from Makefile at line 3"));
        assert!(long.contains("npm from package.json at line 5"));
    }
}
