// src/system/executor.rs

//! Running invocation plans as child processes.

use crate::CancellationToken;
use crate::constants::{INTERRUPTED_EXIT_CODE, SPAWN_FAILURE_EXIT_CODE};
use crate::models::InvocationPlan;
use colored::*;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::atomic::Ordering;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::watch;

/// Errors raised while running a plan.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The program could not be started, e.g. because it is not on `PATH`.
    #[error("Command '{command}' could not be started: {source}")]
    Spawn {
        /// The command line that was being started.
        command: String,
        /// The underlying error from the OS.
        #[source]
        source: io::Error,
    },
    /// The child was started but its exit status could not be collected.
    #[error("Lost track of command '{command}' while waiting for it: {source}")]
    Wait {
        /// The command line of the child.
        command: String,
        /// The underlying error from the OS.
        #[source]
        source: io::Error,
    },
    /// The async runtime driving child processes could not be built.
    #[error("Could not start the process runtime: {0}")]
    Runtime(#[source] io::Error),
    /// The run was cancelled with Ctrl+C, either during this command or before it started.
    #[error("Command '{command}' was interrupted.")]
    Interrupted {
        /// The command line that was interrupted or never started.
        command: String,
    },
}

impl ExecutionError {
    /// The exit code the process should end with when this error stops a run.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Spawn { .. } => SPAWN_FAILURE_EXIT_CODE,
            Self::Interrupted { .. } => INTERRUPTED_EXIT_CODE,
            Self::Wait { .. } | Self::Runtime(_) => 1,
        }
    }
}

/// Runs one invocation plan to completion and reports its exit code.
pub trait Executor {
    /// Runs `plan` and returns the child's exit code. A non-zero code is not an error.
    fn execute(&mut self, plan: &InvocationPlan) -> Result<i32, ExecutionError>;
}

/// Spawns plans as real OS processes with inherited stdio.
///
/// One Ctrl+C listener lives as long as the executor and sets the cancellation token on
/// every press, so a press between two plans still stops the second one. The first press
/// while a child runs is left to the child (it shares our process group); a second one
/// kills it.
#[derive(Debug)]
pub struct ProcessExecutor {
    runtime: Runtime,
    cwd: PathBuf,
    cancellation_token: CancellationToken,
    presses: watch::Receiver<usize>,
}

impl ProcessExecutor {
    /// Creates an executor running children in `cwd`, listening for Ctrl+C.
    pub fn new(cwd: &Path, cancellation_token: CancellationToken) -> Result<Self, ExecutionError> {
        Self::with_interrupts(cwd, cancellation_token, tokio::signal::ctrl_c)
    }

    /// Like [`ProcessExecutor::new`], with `next_press` resolving once per interrupt.
    fn with_interrupts<F, Fut>(
        cwd: &Path,
        cancellation_token: CancellationToken,
        next_press: F,
    ) -> Result<Self, ExecutionError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = io::Result<()>> + Send + 'static,
    {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ExecutionError::Runtime)?;

        let (sender, presses) = watch::channel(0);
        runtime.spawn(forward_interrupts(
            next_press,
            cancellation_token.clone(),
            sender,
        ));

        Ok(Self {
            runtime,
            cwd: dunce::simplified(cwd).to_path_buf(),
            cancellation_token,
            presses,
        })
    }
}

impl Executor for ProcessExecutor {
    fn execute(&mut self, plan: &InvocationPlan) -> Result<i32, ExecutionError> {
        let command_line = plan.command_line();
        let cwd = &self.cwd;
        let token = &self.cancellation_token;
        let presses = &mut self.presses;

        self.runtime.block_on(async {
            let_listener_run().await;
            if token.load(Ordering::SeqCst) {
                log::debug!("Not starting '{}': the run was interrupted.", command_line);
                return Err(ExecutionError::Interrupted {
                    command: command_line.clone(),
                });
            }
            let mut child = spawn(plan, cwd, &command_line)?;
            wait_with_interrupts(&mut child, &command_line, presses).await
        })
    }
}

// --- Interrupts ---

async fn forward_interrupts<F, Fut>(
    mut next_press: F,
    cancellation_token: CancellationToken,
    presses: watch::Sender<usize>,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    loop {
        if let Err(e) = next_press().await {
            log::warn!("Could not listen for Ctrl+C: {}", e);
            return;
        }
        cancellation_token.store(true, Ordering::SeqCst);
        presses.send_modify(|count| *count += 1);
    }
}

/// A press that arrived while no plan was running is only dispatched once the runtime
/// runs again: the first turn polls the signal driver, the second runs the listener.
async fn let_listener_run() {
    tokio::task::yield_now().await;
    tokio::task::yield_now().await;
}

// --- Process Helpers ---

fn spawn(plan: &InvocationPlan, cwd: &Path, command_line: &str) -> Result<Child, ExecutionError> {
    let mut command = Command::new(&plan.program);
    command.args(&plan.args);
    inherit_stdio(&mut command, plan, cwd);

    match command.spawn() {
        Ok(child) => Ok(child),
        // Shell built-ins such as `echo` only exist inside cmd.exe.
        Err(e) if e.kind() == ErrorKind::NotFound && cfg!(target_os = "windows") => {
            log::debug!("Command '{}' not found. Retrying with cmd /C.", plan.program);
            let mut fallback = Command::new("cmd");
            fallback.arg("/C").arg(&plan.program).args(&plan.args);
            inherit_stdio(&mut fallback, plan, cwd);
            fallback.spawn().map_err(|source| ExecutionError::Spawn {
                command: command_line.to_string(),
                source,
            })
        }
        Err(source) => Err(ExecutionError::Spawn {
            command: command_line.to_string(),
            source,
        }),
    }
}

fn inherit_stdio(command: &mut Command, plan: &InvocationPlan, cwd: &Path) {
    command
        .current_dir(cwd)
        .envs(plan.env.iter().map(|b| (&b.name, &b.value)))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
}

async fn wait_with_interrupts(
    child: &mut Child,
    command_line: &str,
    presses: &mut watch::Receiver<usize>,
) -> Result<i32, ExecutionError> {
    let seen = *presses.borrow_and_update();
    let mut interrupted = false;
    let mut listening = true;

    loop {
        tokio::select! {
            status = child.wait() => {
                let status = status.map_err(|source| ExecutionError::Wait {
                    command: command_line.to_string(),
                    source,
                })?;
                if interrupted {
                    return Err(ExecutionError::Interrupted {
                        command: command_line.to_string(),
                    });
                }
                return Ok(exit_code_of(status));
            }
            changed = presses.changed(), if listening => {
                if changed.is_err() {
                    listening = false;
                    continue;
                }
                let count = presses.borrow_and_update().saturating_sub(seen);
                if count >= 2 {
                    eprintln!("\n{}", t!("executor.interrupt.killing").yellow());
                    if let Err(e) = child.start_kill() {
                        log::warn!("Failed to kill '{}': {}", command_line, e);
                    }
                } else if !interrupted {
                    eprintln!("\n{}", t!("executor.interrupt.forwarding").yellow());
                }
                interrupted = true;
            }
        }
    }
}

/// Maps an exit status to a shell-style exit code (`128 + signal` when killed by a signal).
fn exit_code_of(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VariableBinding;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    fn plan(program: &str, args: &[&str]) -> InvocationPlan {
        InvocationPlan {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            env: Vec::new(),
        }
    }

    fn executor(dir: &TempDir) -> ProcessExecutor {
        ProcessExecutor::new(dir.path(), Arc::new(AtomicBool::new(false))).unwrap()
    }

    /// An executor whose Ctrl+C presses are simulated through the returned `Notify`.
    fn interruptible(dir: &TempDir) -> (ProcessExecutor, Arc<Notify>, CancellationToken) {
        let token = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let source = Arc::clone(&notify);
        let executor = ProcessExecutor::with_interrupts(dir.path(), Arc::clone(&token), move || {
            let source = Arc::clone(&source);
            async move {
                source.notified().await;
                Ok(())
            }
        })
        .unwrap();
        (executor, notify, token)
    }

    #[test]
    fn test_missing_program_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let err = executor(&dir)
            .execute(&plan("runr-definitely-not-a-program", &[]))
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Spawn { .. }));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn test_cancelled_token_prevents_spawning() {
        let dir = TempDir::new().unwrap();
        let token = Arc::new(AtomicBool::new(true));
        let mut executor = ProcessExecutor::new(dir.path(), token).unwrap();
        let err = executor.execute(&plan("runr-never-started", &[])).unwrap_err();
        assert!(matches!(err, ExecutionError::Interrupted { .. }));
        assert_eq!(err.exit_code(), 130);
    }

    #[test]
    fn test_ctrl_c_between_plans_stops_the_next_plan() {
        let dir = TempDir::new().unwrap();
        let (mut executor, notify, token) = interruptible(&dir);

        notify.notify_one();
        let err = executor.execute(&plan("runr-never-started", &[])).unwrap_err();
        assert!(matches!(err, ExecutionError::Interrupted { .. }));
        assert!(token.load(Ordering::SeqCst));
    }

    #[cfg(unix)]
    #[test]
    fn test_second_ctrl_c_kills_the_child() {
        let dir = TempDir::new().unwrap();
        let (mut executor, notify, token) = interruptible(&dir);

        let presser = std::thread::spawn(move || {
            for _ in 0..2 {
                std::thread::sleep(std::time::Duration::from_millis(300));
                notify.notify_one();
            }
        });
        let err = executor.execute(&plan("sleep", &["30"])).unwrap_err();
        presser.join().unwrap();

        assert!(matches!(err, ExecutionError::Interrupted { .. }));
        assert!(token.load(Ordering::SeqCst));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_env_and_cwd_reach_the_child() {
        let dir = TempDir::new().unwrap();
        let mut executor = executor(&dir);

        assert_eq!(executor.execute(&plan("true", &[])).unwrap(), 0);
        assert_eq!(executor.execute(&plan("sh", &["-c", "exit 7"])).unwrap(), 7);

        let mut with_env = plan("sh", &["-c", "test \"$RUNR_TEST\" = ok && test -f marker"]);
        with_env.env = vec![VariableBinding::new("RUNR_TEST", "ok")];
        assert_eq!(executor.execute(&with_env).unwrap(), 1);
        std::fs::write(dir.path().join("marker"), "").unwrap();
        assert_eq!(executor.execute(&with_env).unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_signal_exit_maps_to_128_plus_signal() {
        let dir = TempDir::new().unwrap();
        let code = executor(&dir)
            .execute(&plan("sh", &["-c", "kill -TERM $$"]))
            .unwrap();
        assert_eq!(code, 128 + 15);
    }
}
