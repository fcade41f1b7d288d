//! # System Interaction Layer
//!
//! The boundary between the engine and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns invocation plans as child processes, forwards `Ctrl+C` and
//!   reports exit codes. Falls back to `cmd /C` on Windows for shell built-ins.
//! - **`editor`**: opens the user's editor at the file and line where a command is declared.

pub mod editor;
pub mod executor;
