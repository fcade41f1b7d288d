// src/constants.rs

//! File names, environment variables and exit codes shared across the crate.
//!
//! Task files are TOML. The YAML task files of earlier runr releases (`runr.yaml` in the
//! project, `~/runr_global.yaml` in the home directory) are not read; their fields map
//! one-to-one onto the TOML layout.

/// The name of the project-local task file.
pub const LOCAL_TASK_FILENAME: &str = "runr.toml";

/// The name of the user-global task file (inside the runr config directory).
pub const GLOBAL_TASK_FILENAME: &str = "global.toml";

/// The name of the runr directory inside the system config directory.
pub const CONFIG_DIR_NAME: &str = "runr";

/// Tool alias reported by both task files.
pub const TASK_FILE_TOOL: &str = "runr";

/// Overrides the location of the global task file.
pub const GLOBAL_CONFIG_ENV: &str = "RUNR_GLOBAL_CONFIG";

/// Editor used for `--edit`, checked before `VISUAL` and `EDITOR`.
pub const EDITOR_ENV: &str = "RUNR_EDITOR";

/// Editor used when none is configured.
pub const DEFAULT_EDITOR: &str = "vim";

/// Exit code for resolution errors (unknown command, ambiguous edit target, empty script).
pub const RESOLUTION_ERROR_EXIT_CODE: i32 = 2;

/// Exit code when a program could not be started.
pub const SPAWN_FAILURE_EXIT_CODE: i32 = 127;

/// Exit code after an interrupt (Ctrl+C).
pub const INTERRUPTED_EXIT_CODE: i32 = 130;
