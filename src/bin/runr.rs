// src/bin/runr.rs

use anyhow::Result;
use colored::*;
use runr::{
    CancellationToken, cli,
    config::Settings,
    core::engine::{Engine, EngineError, Outcome},
    system::{editor, executor::ExecutionError, executor::ProcessExecutor},
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// The main entry point of `runr`.
/// It sets up logging, discovers the project's commands, dispatches the invocation and
/// performs centralized error handling.
fn main() {
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    match run_cli(cancellation_token) {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            // --- Centralized Error Handling ---
            if let Some(engine_err) = e.downcast_ref::<EngineError>() {
                // Interrupted like a shell: quietly, with 130.
                if let EngineError::Execution(ExecutionError::Interrupted { .. }) = engine_err {
                    std::process::exit(engine_err.exit_code());
                }
                eprintln!("\n{}: {}", "Error".red().bold(), engine_err);
                std::process::exit(engine_err.exit_code());
            }

            eprintln!("\n{}: {:#}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

/// Builds the command line from the discovered commands, then runs or edits the chosen one.
fn run_cli(cancellation_token: CancellationToken) -> Result<i32> {
    let settings = Settings::from_env()?;
    let engine = Engine::discover(settings);

    let matches = cli::build_command(engine.list_logical_commands()).get_matches();
    let Some((name, sub_matches)) = matches.subcommand() else {
        return Ok(0);
    };
    let group = engine
        .group(name)
        .ok_or_else(|| EngineError::UnknownCommand(name.to_string()))?;
    let request = cli::invoke_request(group, sub_matches);
    log::debug!("Invoking '{}' with {:?}", name, request);

    let mut executor = ProcessExecutor::new(&engine.settings().project_dir, cancellation_token)
        .map_err(EngineError::from)?;
    match engine.invoke(name, &request, &mut executor)? {
        Outcome::Executed(result) => Ok(result.exit_code),
        Outcome::Edit(target) => Ok(editor::open(&engine.settings().editor, &target)?),
    }
}
