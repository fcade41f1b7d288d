// src/core/mod.rs

//! # Engine Core
//!
//! - **`aggregator`**: merges source results into logical commands.
//! - **`resolver`**: picks the record(s) an invocation runs.
//! - **`invocation`**: builds plans and runs a sequence.
//! - **`substitution`**: `\$NAME` variable substitution in task file scripts.
//! - **`engine`**: the context object tying the above together.

pub mod aggregator;
pub mod engine;
pub mod invocation;
pub mod resolver;
pub mod substitution;
