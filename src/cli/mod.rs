// src/cli/mod.rs

//! The command line is not known until discovery has run: every logical command becomes
//! a subcommand, so the clap tree is assembled at runtime with the builder API.

use crate::core::aggregator::{group_long_help, group_short_help};
use crate::core::engine::InvokeRequest;
use crate::models::{DisambiguationGroup, FlagKind, FlagSpec};
use clap::builder::Styles;
use clap::builder::styling::AnsiColor;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::collections::{BTreeMap, HashSet};

/// `-e`/`--edit`: open the declaration instead of running it.
const EDIT_ARG: &str = "edit";
/// `-t`/`--tool`: pick one tool when several declare the command.
const TOOL_ARG: &str = "tool";
/// `-k`/`--keep-going`: run every tool even after one fails.
const KEEP_GOING_ARG: &str = "keep-going";
/// Everything after the command name that is not one of our options.
const ARGS_ARG: &str = "args";

// Long options a declared flag may not take over.
const RESERVED_LONGS: &[&str] = &[EDIT_ARG, TOOL_ARG, KEEP_GOING_ARG, "help"];

/// Help colours: yellow headers, cyan literals, green placeholders.
fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Yellow.on_default().bold())
        .literal(AnsiColor::Cyan.on_default().bold())
        .placeholder(AnsiColor::Green.on_default())
}

/// Builds the `runr` command with one subcommand per logical command.
pub fn build_command<'a>(
    groups: impl IntoIterator<Item = (&'a str, &'a DisambiguationGroup)>,
) -> Command {
    let command = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about"))
        .long_about(t!("cli.long_about"))
        .styles(styles())
        // Makefiles often declare their own `help` target.
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true);

    groups
        .into_iter()
        .fold(command, |command, (name, group)| {
            command.subcommand(group_subcommand(name, group))
        })
}

/// The subcommand for one logical command. `--tool` and `--keep-going` only exist when
/// several tools declare the name.
fn group_subcommand(name: &str, group: &DisambiguationGroup) -> Command {
    let mut command = Command::new(name.to_string())
        .about(group_short_help(group))
        .long_about(group_long_help(group))
        .arg(
            Arg::new(EDIT_ARG)
                .short('e')
                .long(EDIT_ARG)
                .action(ArgAction::SetTrue)
                .help(t!("cli.arg.edit")),
        );

    if group.len() > 1 {
        let tools = group.tools().collect::<Vec<_>>().join(", ");
        command = command
            .arg(
                Arg::new(TOOL_ARG)
                    .short('t')
                    .long(TOOL_ARG)
                    .value_name("TOOL")
                    .help(format!(t!("cli.arg.tool"), tools = tools)),
            )
            .arg(
                Arg::new(KEEP_GOING_ARG)
                    .short('k')
                    .long(KEEP_GOING_ARG)
                    .action(ArgAction::SetTrue)
                    .help(t!("cli.arg.keep_going")),
            );
    }

    let conflicts = group
        .iter()
        .flat_map(|(_, record)| &record.flags)
        .filter(|flag| RESERVED_LONGS.contains(&flag.flag.as_str()));
    for flag in conflicts {
        eprintln!(
            "{}",
            format!(t!("cli.warning.flag_conflict"), flag = flag.flag, name = group.name()).yellow()
        );
    }
    for flag in declared_flags(group) {
        command = command.arg(flag_arg(flag));
    }

    command.arg(
        Arg::new(ARGS_ARG)
            .num_args(0..)
            .trailing_var_arg(true)
            .allow_hyphen_values(true)
            .help(t!("cli.arg.args")),
    )
}

/// The flags declared by the group's records that can be offered as options: the first
/// declaration of each name wins and names clashing with built-in options are dropped.
fn declared_flags(group: &DisambiguationGroup) -> Vec<&FlagSpec> {
    let mut seen = HashSet::new();
    let mut flags = Vec::new();

    for (_, record) in group.iter() {
        for flag in &record.flags {
            if flag.flag.is_empty() || !seen.insert(flag.flag.as_str()) {
                continue;
            }
            if !RESERVED_LONGS.contains(&flag.flag.as_str()) {
                flags.push(flag);
            }
        }
    }
    flags
}

/// Argument ids of declared flags are prefixed so they never collide with ours.
fn flag_id(flag: &FlagSpec) -> String {
    format!("flag:{}", flag.flag)
}

/// A bool flag is a switch; a string flag takes a value and falls back to its default.
fn flag_arg(flag: &FlagSpec) -> Arg {
    let arg = Arg::new(flag_id(flag))
        .long(flag.flag.clone())
        .help(flag.description.clone());
    match flag.kind {
        FlagKind::Bool => arg.action(ArgAction::SetTrue),
        FlagKind::String if flag.default.is_empty() => arg.value_name("VALUE"),
        FlagKind::String => arg.value_name("VALUE").default_value(flag.default.clone()),
    }
}

/// Translates the matches of a group's subcommand into a request for the engine.
pub fn invoke_request(group: &DisambiguationGroup, matches: &ArgMatches) -> InvokeRequest {
    let tool = matches
        .try_get_one::<String>(TOOL_ARG)
        .ok()
        .flatten()
        .cloned();
    let keep_going = matches
        .try_get_one::<bool>(KEEP_GOING_ARG)
        .ok()
        .flatten()
        .copied()
        .unwrap_or(false);

    let mut flag_values = BTreeMap::new();
    for flag in declared_flags(group) {
        let id = flag_id(flag);
        let value = match flag.kind {
            FlagKind::Bool => matches
                .try_get_one::<bool>(&id)
                .ok()
                .flatten()
                .filter(|set| **set)
                .map(|_| "true".to_string()),
            FlagKind::String => matches.try_get_one::<String>(&id).ok().flatten().cloned(),
        };
        if let Some(value) = value {
            flag_values.insert(flag.flag.clone(), value);
        }
    }

    InvokeRequest {
        tool,
        extra_args: matches
            .get_many::<String>(ARGS_ARG)
            .map(|values| values.cloned().collect())
            .unwrap_or_default(),
        edit_mode: matches.get_flag(EDIT_ARG),
        flag_values,
        fail_fast: !keep_going,
    }
}
