// src/core/invocation.rs

//! Turning records into invocation plans and running them in order.

use crate::models::{CommandRecord, InvocationPlan, Provenance, VariableBinding};
use crate::system::executor::{ExecutionError, Executor};
use colored::*;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while turning a record into invocation plans.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// Every script line of the record was blank.
    #[error("Command '{name}' declared at {provenance} has no runnable script lines")]
    EmptyScript {
        /// The logical command name.
        name: String,
        /// Where it was declared.
        provenance: Provenance,
    },
}

// --- Plan Construction ---

/// Splits each script line into a program and its arguments, appends `extra_args` after
/// the static ones, and attaches the record's environment to every plan.
///
/// Blank lines are skipped with a warning; a record with nothing but blank lines is an error.
pub fn build(record: &CommandRecord, extra_args: &[String]) -> Result<Vec<InvocationPlan>, BuildError> {
    let plans: Vec<InvocationPlan> = record
        .script
        .iter()
        .enumerate()
        .filter_map(|(index, line)| {
            let mut words = line.split_whitespace();
            let Some(program) = words.next() else {
                log::warn!(
                    "Skipping blank script line {} of '{}' ({}).",
                    index + 1,
                    record.name,
                    record.provenance
                );
                return None;
            };
            Some(InvocationPlan {
                program: program.to_string(),
                args: words
                    .map(str::to_string)
                    .chain(extra_args.iter().cloned())
                    .collect(),
                env: record.env.clone(),
            })
        })
        .collect();

    if plans.is_empty() {
        return Err(BuildError::EmptyScript {
            name: record.name.clone(),
            provenance: record.provenance.clone(),
        });
    }
    Ok(plans)
}

/// Like [`build`], then exports the record's declared flags to every plan's environment.
///
/// `flag_values` holds the values given on the command line; flags missing from it use
/// their declared default.
pub fn build_with_flags(
    record: &CommandRecord,
    extra_args: &[String],
    flag_values: &BTreeMap<String, String>,
) -> Result<Vec<InvocationPlan>, BuildError> {
    let mut plans = build(record, extra_args)?;
    let flag_env = flag_env(record, flag_values);
    if !flag_env.is_empty() {
        for plan in &mut plans {
            plan.env.extend(flag_env.iter().cloned());
        }
    }
    Ok(plans)
}

fn flag_env(record: &CommandRecord, flag_values: &BTreeMap<String, String>) -> Vec<VariableBinding> {
    record
        .flags
        .iter()
        .map(|flag| {
            let value = flag_values
                .get(&flag.flag)
                .cloned()
                .unwrap_or_else(|| flag.default.clone());
            VariableBinding::new(flag.env_name(), value)
        })
        .collect()
}

// --- Sequence Execution ---

/// Runs the plans of one sequence in order, stopping at the first non-zero exit code.
/// Each plan is echoed before it starts.
///
/// Returns `0` if every plan succeeded, otherwise the failing plan's exit code. Errors
/// (including an interrupt) stop the sequence as well and are propagated.
pub fn run_sequence(plans: &[InvocationPlan], executor: &mut dyn Executor) -> Result<i32, ExecutionError> {
    for (index, plan) in plans.iter().enumerate() {
        println!("{} {}", "→".blue(), plan.command_line().green());
        let exit_code = executor.execute(plan)?;
        if exit_code != 0 {
            log::debug!(
                "Step {}/{} ('{}') exited with {}; skipping the rest of the sequence.",
                index + 1,
                plans.len(),
                plan.program,
                exit_code
            );
            return Ok(exit_code);
        }
    }
    Ok(0)
}
