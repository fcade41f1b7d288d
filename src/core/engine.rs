// src/core/engine.rs

//! The engine context object: built once per CLI invocation from [`Settings`], it holds
//! the aggregated commands and is the only thing the front end talks to.

use super::aggregator::aggregate;
use super::invocation::{BuildError, build_with_flags, run_sequence};
use super::resolver::{ResolveError, Selection, resolve};
use crate::config::Settings;
use crate::constants::RESOLUTION_ERROR_EXIT_CODE;
use crate::models::{CommandMap, DisambiguationGroup, EditTarget};
use crate::sources::task_file::TaskFileReader;
use crate::sources::{PROJECT_SOURCES, SourceCommands, SourceError, SourceReader};
use crate::system::executor::{ExecutionError, Executor};
use colored::*;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by [`Engine::invoke`].
#[derive(Error, Debug)]
pub enum EngineError {
    /// No source declares a command with this name.
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    /// The command exists but the request does not pick a usable record.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A selected record could not be turned into plans.
    #[error(transparent)]
    Build(#[from] BuildError),
    /// A plan could not be run to completion.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

impl EngineError {
    /// The exit code the process should end with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Execution(e) => e.exit_code(),
            Self::UnknownCommand(_) | Self::Resolve(_) | Self::Build(_) => RESOLUTION_ERROR_EXIT_CODE,
        }
    }
}

// --- Discovery ---

/// Where a source comes from. Task files are the user's own and their failures are shown
/// prominently; project sources fail routinely and are only logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrigin {
    /// A manifest found in the project directory (Makefile, package.json, ...).
    Project,
    /// The global or local runr task file.
    TaskFile,
}

/// A source that was present but could not be read.
#[derive(Debug)]
pub struct SourceFailure {
    /// The file that failed.
    pub path: PathBuf,
    /// Whether it was a project source or a task file.
    pub origin: SourceOrigin,
    /// Why it could not be read.
    pub error: SourceError,
}

#[derive(Debug)]
struct SourceJob {
    path: PathBuf,
    reader: &'static dyn SourceReader,
    origin: SourceOrigin,
}

/// The sources to read, in aggregation order: project sources, then the global task
/// file, then the local one.
fn source_jobs(settings: &Settings) -> Vec<SourceJob> {
    let mut jobs: Vec<SourceJob> = PROJECT_SOURCES
        .iter()
        .map(|source| SourceJob {
            path: settings.project_dir.join(source.marker),
            reader: source.reader,
            origin: SourceOrigin::Project,
        })
        .collect();

    let task_files = settings
        .global_task_file
        .iter()
        .chain(std::iter::once(&settings.local_task_file));
    for path in task_files {
        jobs.push(SourceJob {
            path: path.clone(),
            reader: &TaskFileReader,
            origin: SourceOrigin::TaskFile,
        });
    }
    jobs
}

// --- Invocation ---

/// What the front end asks the engine to do with one logical command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    /// Tool selected with `--tool`, if any.
    pub tool: Option<String>,
    /// Arguments appended to every script line.
    pub extra_args: Vec<String>,
    /// Jump to the declaration instead of running it.
    pub edit_mode: bool,
    /// Values of declared flags given on the command line, keyed by flag name.
    pub flag_values: BTreeMap<String, String>,
    /// When running under every tool, stop after the first tool that fails.
    pub fail_fast: bool,
}

impl Default for InvokeRequest {
    fn default() -> Self {
        Self {
            tool: None,
            extra_args: Vec::new(),
            edit_mode: false,
            flag_values: BTreeMap::new(),
            fail_fast: true,
        }
    }
}

/// What happened when an invocation ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// `0`, or the first non-zero exit code seen.
    pub exit_code: i32,
    /// Tools whose sequence was started, in order.
    pub tools_run: Vec<String>,
}

/// The result of a successful [`Engine::invoke`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The selected sequences ran.
    Executed(ExecutionResult),
    /// Edit mode: the declaration to open instead of running anything.
    Edit(EditTarget),
}

/// The discovered commands of one project, ready to be listed and invoked.
#[derive(Debug)]
pub struct Engine {
    settings: Settings,
    commands: CommandMap,
    failures: Vec<SourceFailure>,
}

impl Engine {
    /// Reads every source in parallel, merges them in priority order and reports the
    /// sources that failed. A failing source contributes no commands.
    pub fn discover(settings: Settings) -> Self {
        let jobs = source_jobs(&settings);
        log::debug!("Reading {} candidate source(s).", jobs.len());

        // 1. Read in parallel; `collect` keeps the job order.
        let results: Vec<Result<Option<SourceCommands>, SourceError>> =
            jobs.par_iter().map(|job| job.reader.read(&job.path)).collect();

        // 2. Split successes from failures.
        let mut sources = Vec::new();
        let mut failures = Vec::new();
        for (job, result) in jobs.into_iter().zip(results) {
            match result {
                Ok(Some(commands)) => sources.push(commands),
                Ok(None) => {}
                Err(error) => failures.push(SourceFailure {
                    path: job.path,
                    origin: job.origin,
                    error,
                }),
            }
        }

        // 3. Merge sequentially.
        let commands = aggregate(sources);
        log::debug!("Discovered {} logical command(s).", commands.len());

        let engine = Self {
            settings,
            commands,
            failures,
        };
        engine.report_failures();
        engine
    }

    fn report_failures(&self) {
        for failure in &self.failures {
            match failure.origin {
                SourceOrigin::TaskFile => eprintln!(
                    "{}: {}",
                    t!("engine.warning.source_failed").yellow().bold(),
                    failure.error
                ),
                SourceOrigin::Project => log::warn!(
                    "Ignoring {} ({:?}): {}",
                    failure.path.display(),
                    failure.error.kind(),
                    failure.error
                ),
            }
        }
    }

    /// The settings discovery ran with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Sources that were present but could not be read.
    pub fn failures(&self) -> &[SourceFailure] {
        &self.failures
    }

    /// Every logical command with its group, sorted by name.
    pub fn list_logical_commands(&self) -> impl Iterator<Item = (&str, &DisambiguationGroup)> {
        self.commands.iter().map(|(name, group)| (name.as_str(), group))
    }

    /// The group of records declared under `name`, if any.
    pub fn group(&self, name: &str) -> Option<&DisambiguationGroup> {
        self.commands.get(name)
    }

    /// Resolves `name` and either runs it through `executor` or returns where to edit it.
    ///
    /// When no tool is selected and several tools declare the command, each tool's
    /// sequence runs in declaration order. Every sequence is built before anything runs,
    /// so a record with an empty script fails the invocation up front.
    pub fn invoke(
        &self,
        name: &str,
        request: &InvokeRequest,
        executor: &mut dyn Executor,
    ) -> Result<Outcome, EngineError> {
        let group = self
            .group(name)
            .ok_or_else(|| EngineError::UnknownCommand(name.to_string()))?;

        let records = match resolve(group, request.tool.as_deref(), request.edit_mode)? {
            Selection::Single(_, record) if request.edit_mode => {
                return Ok(Outcome::Edit(EditTarget::from(&record.provenance)));
            }
            Selection::Single(tool, record) => vec![(tool, record)],
            Selection::All(records) => records,
        };
        let announce = records.len() > 1;

        let sequences = records
            .into_iter()
            .map(|(tool, record)| {
                build_with_flags(record, &request.extra_args, &request.flag_values)
                    .map(|plans| (tool, plans))
            })
            .collect::<Result<Vec<_>, BuildError>>()?;

        let mut result = ExecutionResult {
            exit_code: 0,
            tools_run: Vec::with_capacity(sequences.len()),
        };
        for (tool, plans) in sequences {
            if announce {
                println!("{} {}", t!("engine.running_with_tool").blue(), tool.bold());
            }
            result.tools_run.push(tool.to_string());

            let exit_code = run_sequence(&plans, executor)?;
            if exit_code != 0 {
                if result.exit_code == 0 {
                    result.exit_code = exit_code;
                }
                if request.fail_fast {
                    break;
                }
            }
        }
        Ok(Outcome::Executed(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::invocation::tests::RecordingExecutor;
    use crate::sources::SourceErrorKind;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const MAKEFILE: &str = "build:\n\tcargo build\n\nlint:\n\tcargo clippy\n";
    const PACKAGE_JSON: &str = r#"{
  "name": "demo",
  "scripts": {
    "build": "tsc",
    "serve": "node server.js"
  }
}
"#;
    const TASK_FILE: &str = r#"[[commands]]
name = "deploy"
script = ["echo local", "echo done"]

[[commands]]
name = "broken"
script = ["   "]
"#;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    fn engine(dir: &Path, global: Option<PathBuf>) -> Engine {
        Engine::discover(Settings::new(dir, global, "vim"))
    }

    fn names(engine: &Engine) -> Vec<&str> {
        engine.list_logical_commands().map(|(name, _)| name).collect()
    }

    #[test]
    fn test_discovers_all_sources_into_groups() {
        let dir = project(&[
            ("Makefile", MAKEFILE),
            ("package.json", PACKAGE_JSON),
            ("yarn.lock", ""),
            ("runr.toml", TASK_FILE),
        ]);
        let engine = engine(dir.path(), None);

        assert!(engine.failures().is_empty());
        assert_eq!(names(&engine), vec!["broken", "build", "deploy", "lint", "serve"]);
        let build = engine.group("build").unwrap();
        assert_eq!(build.tools().collect::<Vec<_>>(), vec!["make", "yarn"]);
    }

    #[test]
    fn test_failing_project_source_does_not_stop_discovery() {
        let dir = project(&[("Makefile", MAKEFILE), ("package.json", PACKAGE_JSON)]);
        let engine = engine(dir.path(), None);

        assert_eq!(names(&engine), vec!["build", "lint"]);
        assert_eq!(engine.failures().len(), 1);
        let failure = &engine.failures()[0];
        assert_eq!(failure.origin, SourceOrigin::Project);
        assert_eq!(failure.error.kind(), SourceErrorKind::UnresolvableEnvironment);
    }

    #[test]
    fn test_malformed_task_file_is_reported() {
        let dir = project(&[("Makefile", MAKEFILE), ("runr.toml", "[[commands]\nname =")]);
        let engine = engine(dir.path(), None);

        assert_eq!(names(&engine), vec!["build", "lint"]);
        assert_eq!(engine.failures()[0].origin, SourceOrigin::TaskFile);
    }

    #[test]
    fn test_unreadable_task_file_is_reported() {
        let dir = project(&[("Makefile", MAKEFILE), ("package.json", PACKAGE_JSON), ("yarn.lock", "")]);
        fs::create_dir(dir.path().join("runr.toml")).unwrap();
        let engine = engine(dir.path(), None);

        assert_eq!(names(&engine), vec!["build", "lint", "serve"]);
        assert_eq!(engine.failures().len(), 1);
        let failure = &engine.failures()[0];
        assert_eq!(failure.origin, SourceOrigin::TaskFile);
        assert!(failure.path.ends_with("runr.toml"));
        assert!(matches!(failure.error, SourceError::Io { .. }));
        assert_eq!(failure.error.kind(), SourceErrorKind::SourceMalformed);
    }

    #[test]
    fn test_local_task_file_overrides_global() {
        let dir = project(&[("runr.toml", TASK_FILE)]);
        let global_dir = project(&[(
            "global.toml",
            "[[commands]]\nname = \"deploy\"\nscript = [\"echo global\"]\n\n[[commands]]\nname = \"hello\"\nscript = [\"echo hi\"]\n",
        )]);
        let engine = engine(dir.path(), Some(global_dir.path().join("global.toml")));

        let deploy = engine.group("deploy").unwrap();
        assert_eq!(deploy.len(), 1);
        assert_eq!(deploy.get("runr").unwrap().script[0], "echo local");
        assert!(engine.group("hello").is_some());
    }

    #[test]
    fn test_single_tool_runs_whole_script() {
        let dir = project(&[("runr.toml", TASK_FILE)]);
        let engine = engine(dir.path(), None);
        let mut executor = RecordingExecutor::default();

        let request = InvokeRequest {
            extra_args: vec!["--now".to_string()],
            ..Default::default()
        };
        let outcome = engine.invoke("deploy", &request, &mut executor).unwrap();

        assert_eq!(
            outcome,
            Outcome::Executed(ExecutionResult {
                exit_code: 0,
                tools_run: vec!["runr".to_string()],
            })
        );
        assert_eq!(executor.started.len(), 2);
        assert_eq!(executor.started[0].args, vec!["local", "--now"]);
    }

    #[test]
    fn test_selected_tool_runs_only_that_tool() {
        let dir = project(&[
            ("Makefile", MAKEFILE),
            ("package.json", PACKAGE_JSON),
            ("pnpm-lock.yaml", ""),
        ]);
        let engine = engine(dir.path(), None);
        let mut executor = RecordingExecutor::default();

        let request = InvokeRequest {
            tool: Some("pnpm".to_string()),
            ..Default::default()
        };
        engine.invoke("build", &request, &mut executor).unwrap();
        assert_eq!(executor.programs(), vec!["pnpm"]);
    }

    #[test]
    fn test_fan_out_stops_at_first_failing_tool_by_default() {
        let dir = project(&[
            ("Makefile", MAKEFILE),
            ("package.json", PACKAGE_JSON),
            ("package-lock.json", "{}"),
        ]);
        let engine = engine(dir.path(), None);

        let mut executor = RecordingExecutor::failing("make", 2);
        let outcome = engine
            .invoke("build", &InvokeRequest::default(), &mut executor)
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Executed(ExecutionResult {
                exit_code: 2,
                tools_run: vec!["make".to_string()],
            })
        );
        assert_eq!(executor.programs(), vec!["make"]);

        let mut executor = RecordingExecutor::failing("make", 2);
        let request = InvokeRequest {
            fail_fast: false,
            ..Default::default()
        };
        let outcome = engine.invoke("build", &request, &mut executor).unwrap();
        assert_eq!(
            outcome,
            Outcome::Executed(ExecutionResult {
                exit_code: 2,
                tools_run: vec!["make".to_string(), "npm".to_string()],
            })
        );
        assert_eq!(executor.programs(), vec!["make", "npm"]);
    }

    #[test]
    fn test_edit_mode() {
        let dir = project(&[
            ("Makefile", MAKEFILE),
            ("package.json", PACKAGE_JSON),
            ("yarn.lock", ""),
        ]);
        let engine = engine(dir.path(), None);
        let mut executor = RecordingExecutor::default();

        let edit = InvokeRequest {
            edit_mode: true,
            ..Default::default()
        };
        let err = engine.invoke("build", &edit, &mut executor).unwrap_err();
        assert!(matches!(err, EngineError::Resolve(_)));
        assert_eq!(err.exit_code(), 2);

        let edit_make = InvokeRequest {
            tool: Some("make".to_string()),
            ..edit.clone()
        };
        match engine.invoke("build", &edit_make, &mut executor).unwrap() {
            Outcome::Edit(target) => {
                assert_eq!(target.file_path, dir.path().join("Makefile"));
                assert_eq!(target.line, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        match engine.invoke("lint", &edit, &mut executor).unwrap() {
            Outcome::Edit(target) => assert_eq!(target.line, 4),
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(executor.started.is_empty());
    }

    #[test]
    fn test_unknown_command_and_empty_script() {
        let dir = project(&[("runr.toml", TASK_FILE)]);
        let engine = engine(dir.path(), None);
        let mut executor = RecordingExecutor::default();

        let err = engine
            .invoke("nope", &InvokeRequest::default(), &mut executor)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownCommand(_)));

        let err = engine
            .invoke("broken", &InvokeRequest::default(), &mut executor)
            .unwrap_err();
        assert!(matches!(err, EngineError::Build(BuildError::EmptyScript { .. })));
        assert_eq!(err.exit_code(), 2);
        assert!(executor.started.is_empty());
    }

    #[test]
    fn test_interrupt_propagates_with_exit_code_130() {
        let dir = project(&[("runr.toml", TASK_FILE)]);
        let engine = engine(dir.path(), None);
        let mut executor = RecordingExecutor {
            interrupt_on: Some("echo".to_string()),
            ..Default::default()
        };

        let err = engine
            .invoke("deploy", &InvokeRequest::default(), &mut executor)
            .unwrap_err();
        assert_eq!(err.exit_code(), 130);
        assert_eq!(executor.started.len(), 1);
    }
}
