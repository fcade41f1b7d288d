// src/config.rs

//! Settings resolved from the environment once per run.

use crate::constants::{
    CONFIG_DIR_NAME, DEFAULT_EDITOR, EDITOR_ENV, GLOBAL_CONFIG_ENV, GLOBAL_TASK_FILENAME,
    LOCAL_TASK_FILENAME,
};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building [`Settings`] from the environment.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The working directory is gone or not accessible.
    #[error("Could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    /// A path variable references an unset variable or an unknown home directory.
    #[error("Could not expand '{value}' from {variable}: {message}")]
    Expand {
        /// The environment variable holding the path.
        variable: &'static str,
        /// Its raw value.
        value: String,
        /// What `shellexpand` reported.
        message: String,
    },
}

/// Per-invocation configuration. Built once in `main` and handed to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory scanned for project sources; also the cwd of executed commands.
    pub project_dir: PathBuf,
    /// The user-global task file, if a location could be determined.
    pub global_task_file: Option<PathBuf>,
    /// The project-local task file.
    pub local_task_file: PathBuf,
    /// Editor command used in edit mode.
    pub editor: String,
}

impl Settings {
    /// Settings for `project_dir`. The local task file is always `runr.toml` inside it.
    pub fn new(
        project_dir: impl Into<PathBuf>,
        global_task_file: Option<PathBuf>,
        editor: impl Into<String>,
    ) -> Self {
        let project_dir: PathBuf = project_dir.into();
        let project_dir = dunce::simplified(&project_dir).to_path_buf();
        let local_task_file = project_dir.join(LOCAL_TASK_FILENAME);
        Self {
            project_dir,
            global_task_file,
            local_task_file,
            editor: editor.into(),
        }
    }

    /// Reads the settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let project_dir = env::current_dir().map_err(ConfigError::CurrentDir)?;

        let global_task_file = match non_empty_var(GLOBAL_CONFIG_ENV) {
            Some(raw) => Some(expand_path(GLOBAL_CONFIG_ENV, &raw)?),
            None => default_global_task_file(),
        };

        let editor = [EDITOR_ENV, "VISUAL", "EDITOR"]
            .into_iter()
            .find_map(non_empty_var)
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());

        let settings = Self::new(project_dir, global_task_file, editor);
        log::debug!("Settings: {:?}", settings);
        Ok(settings)
    }
}

/// `<config_dir>/runr/global.toml`, or `None` when the platform has no config directory.
pub fn default_global_task_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(GLOBAL_TASK_FILENAME))
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Expands `~` and environment variables in a user-supplied path.
fn expand_path(variable: &'static str, raw: &str) -> Result<PathBuf, ConfigError> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| ConfigError::Expand {
            variable,
            value: raw.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_task_file_lives_in_project_dir() {
        let settings = Settings::new("/work/app", None, "nano");
        assert_eq!(settings.project_dir, PathBuf::from("/work/app"));
        assert_eq!(settings.local_task_file, PathBuf::from("/work/app/runr.toml"));
        assert_eq!(settings.global_task_file, None);
        assert_eq!(settings.editor, "nano");
    }

    #[test]
    fn test_expand_home() {
        let expanded = expand_path(GLOBAL_CONFIG_ENV, "~/tasks.toml").unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("tasks.toml"));
        }
    }

    #[test]
    fn test_expand_unknown_variable_fails() {
        let err = expand_path(GLOBAL_CONFIG_ENV, "$RUNR_SURELY_UNSET_VARIABLE/x.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Expand { .. }));
    }

    #[test]
    fn test_default_global_task_file_name() {
        if let Some(path) = default_global_task_file() {
            assert!(path.ends_with("runr/global.toml"));
        }
    }
}
