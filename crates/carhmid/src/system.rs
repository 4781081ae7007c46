use crate::sinks::{SinkError, System};
use carhmi_core::config::SystemConfig;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Runs the configured shell commands for system actions.
pub struct ShellSystem {
    shutdown_command: Vec<String>,
    screen_toggle_command: Vec<String>,
    timeout: Duration,
}

/// Captured result of a finished command.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl ShellSystem {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            shutdown_command: config.shutdown_command.clone(),
            screen_toggle_command: config.screen_toggle_command.clone(),
            timeout: Duration::from_millis(config.command_timeout_ms),
        }
    }

    async fn run_checked(&self, argv: &[String]) -> Result<(), SinkError> {
        let output = run(argv, self.timeout).await?;
        if !output.stdout.trim().is_empty() {
            debug!(stdout = %output.stdout.trim(), "command output");
        }
        if output.status.success() {
            Ok(())
        } else {
            Err(SinkError::CommandFailed {
                program: argv.first().cloned().unwrap_or_default(),
                status: output.status.to_string(),
                stderr: output.stderr.trim().to_string(),
            })
        }
    }
}

impl System for ShellSystem {
    async fn shutdown(&mut self) -> Result<(), SinkError> {
        self.run_checked(&self.shutdown_command).await
    }

    async fn toggle_screen(&mut self) -> Result<(), SinkError> {
        self.run_checked(&self.screen_toggle_command).await
    }
}

/// Run `argv`, capturing output. The child is killed after `timeout`.
pub async fn run(argv: &[String], timeout: Duration) -> Result<CommandOutput, SinkError> {
    let (program, args) = argv.split_first().ok_or_else(|| SinkError::Spawn {
        program: String::new(),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty command"),
    })?;
    info!(command = %argv.join(" "), "running shell command");

    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null()).kill_on_drop(true);

    // output() drains both pipes while waiting, so chatty commands cannot stall.
    let output = match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(source)) => {
            return Err(SinkError::Spawn {
                program: program.clone(),
                source,
            })
        }
        Err(_) => {
            warn!(program = %program, "command timed out, killed");
            return Err(SinkError::CommandTimeout {
                program: program.clone(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }
    };

    debug!(program = %program, status = %output.status, "command finished");
    Ok(CommandOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    fn shell(shutdown: &[&str], toggle: &[&str]) -> ShellSystem {
        ShellSystem::new(&SystemConfig {
            shutdown_command: argv(shutdown),
            screen_toggle_command: argv(toggle),
            command_timeout_ms: 1000,
        })
    }

    #[tokio::test]
    async fn run_captures_stdout() {
        let output = run(&argv(&["/bin/sh", "-c", "echo hello"]), Duration::from_secs(2)).await.unwrap();
        assert!(output.status.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn large_output_does_not_stall_the_command() {
        // More than a pipe buffer's worth of output.
        let output = run(&argv(&["/bin/sh", "-c", "head -c 200000 /dev/zero"]), Duration::from_secs(2))
            .await
            .expect("command should finish well before the timeout");
        assert!(output.status.success());
        assert_eq!(output.stdout.len(), 200_000);
    }

    #[tokio::test]
    async fn nonzero_exit_is_command_failed_with_stderr() {
        let mut system = shell(&["/bin/sh", "-c", "echo nope >&2; exit 3"], &["/bin/true"]);
        match system.shutdown().await {
            Err(SinkError::CommandFailed { stderr, .. }) => assert_eq!(stderr, "nope"),
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_toggle_is_ok() {
        let mut system = shell(&["/bin/false"], &["/bin/sh", "-c", "exit 0"]);
        assert!(system.toggle_screen().await.is_ok());
    }

    #[tokio::test]
    async fn missing_program_is_spawn_error() {
        let mut system = shell(&["/nonexistent/carhmi-halt"], &["/bin/true"]);
        assert!(matches!(system.shutdown().await, Err(SinkError::Spawn { .. })));
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let result = run(&argv(&["/bin/sh", "-c", "sleep 5"]), Duration::from_millis(100)).await;
        assert!(matches!(result, Err(SinkError::CommandTimeout { .. })));
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        assert!(run(&[], Duration::from_secs(1)).await.is_err());
    }
}
