//! Execution sessions: where expanded commands actually run.
//!
//! One trait, two implementations. `SshSession` shells out to the system
//! `ssh` binary per command; `LocalShell` spawns `sh -c`. The step runner
//! and pipeline driver are written once against the trait.

use std::process::Command;

use crate::error::{Error, Result};
use crate::ssh_config::ResolvedHost;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

/// Anything that can run a command string and return captured output.
///
/// `run` returns `Err` only when the command could not be spawned at all;
/// a command that ran and failed comes back as `success: false` with its
/// output intact.
pub trait ExecutionSession {
    fn run(&mut self, command: &str) -> Result<CommandOutput>;
}

/// Remote session backed by the system `ssh` client, keyed by a resolved
/// host identity. Each command is an `ssh` invocation; authentication
/// state lives in the identity file, so there is no persistent channel to
/// tear down.
#[derive(Debug)]
pub struct SshSession {
    host_name: String,
    user: String,
    identity_file: String,
    program: String,
}

impl SshSession {
    /// Establish a session for a resolved host.
    ///
    /// Validates the identity file and probes the host with a no-op
    /// command so acquisition failures surface before any step runs.
    pub fn connect(host_key: &str, resolved: &ResolvedHost) -> Result<Self> {
        Self::connect_with(host_key, resolved, "ssh")
    }

    fn connect_with(host_key: &str, resolved: &ResolvedHost, program: &str) -> Result<Self> {
        if !std::path::Path::new(&resolved.identity_file).exists() {
            return Err(Error::ssh_identity_file_not_found(
                host_key,
                &resolved.identity_file,
            ));
        }

        let mut session = Self {
            host_name: resolved.host_name.clone(),
            user: resolved.user.clone(),
            identity_file: resolved.identity_file.clone(),
            program: program.to_string(),
        };

        // Anything that goes wrong while probing is a session-acquisition
        // failure, including not being able to spawn the client at all.
        let probe = match session.run("exit 0") {
            Ok(probe) => probe,
            Err(err) => {
                return Err(Error::ssh_connect_failed(
                    &session.host_name,
                    &session.user,
                    err.message,
                ));
            }
        };
        if !probe.success {
            return Err(Error::ssh_connect_failed(
                &session.host_name,
                &session.user,
                probe.stderr.trim().to_string(),
            ));
        }

        log_status!("ssh", "Connected to {}@{}", session.user, session.host_name);
        Ok(session)
    }

    fn build_ssh_args(&self, command: &str) -> Vec<String> {
        let mut args = vec!["-i".to_string(), self.identity_file.clone()];

        // Non-interactive options prevent hangs on stalled connections or
        // unexpected prompts.
        args.extend(
            [
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=10",
                "-o",
                "ServerAliveInterval=15",
                "-o",
                "ServerAliveCountMax=3",
            ]
            .map(str::to_string),
        );

        args.push(format!("{}@{}", self.user, self.host_name));
        args.push(command.to_string());
        args
    }
}

impl ExecutionSession for SshSession {
    fn run(&mut self, command: &str) -> Result<CommandOutput> {
        let output = Command::new(&self.program)
            .args(self.build_ssh_args(command))
            .output()
            .map_err(|e| {
                Error::internal_io(format!("Failed to spawn ssh: {}", e), Some("run ssh".to_string()))
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Local execution target: spawns a shell process per command. Used for
/// build/transfer actions and for driving pipelines against the local
/// machine in tests.
#[derive(Default)]
pub struct LocalShell;

impl LocalShell {
    pub fn new() -> Self {
        Self
    }
}

impl ExecutionSession for LocalShell {
    fn run(&mut self, command: &str) -> Result<CommandOutput> {
        let output = Command::new("sh")
            .args(["-c", command])
            .output()
            .map_err(|e| {
                Error::internal_io(
                    format!("Failed to spawn shell: {}", e),
                    Some("run local command".to_string()),
                )
            })?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}
