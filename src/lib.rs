//! # runr
//!
//! Discovers the scripts a project declares across its manifests (Makefiles,
//! `package.json`, `pyproject.toml`, and runr's own task files) and exposes each one as
//! a command, disambiguating names declared by more than one tool.

include!(concat!(env!("OUT_DIR"), "/translations.rs"));

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Set once the user interrupts a run; no further command is started after that.
pub type CancellationToken = Arc<AtomicBool>;

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod models;
pub mod sources;
pub mod system;
