//! Error type shared across the crate.
//!
//! Every failure carries a stable code (used for exit-code mapping and the
//! JSON envelope), a human message, structured details, and optional hints
//! for resolution.

use serde::Serialize;
use serde_json::{json, Value};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Catalog-data defects: a command template could not be turned into a
    // runnable command. Never user-recoverable mid-run.
    TemplateParse,
    TemplateRender,

    // The remote/local command ran and failed, or could not be spawned.
    CommandFailed,

    // Host resolution and session acquisition, before any step runs.
    SshHostNotFound,
    SshConfigInvalid,
    SshIdentityFileNotFound,
    SshConnectFailed,

    // All remote work succeeded but local bookkeeping could not be
    // persisted. Remote and local state are now inconsistent.
    StateCommit,

    ProjectNotFound,
    ServiceNotFound,
    ValidationInvalidArgument,

    InternalIoError,
    InternalYamlError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::TemplateParse => "template_parse",
            ErrorCode::TemplateRender => "template_render",
            ErrorCode::CommandFailed => "command_failed",
            ErrorCode::SshHostNotFound => "ssh_host_not_found",
            ErrorCode::SshConfigInvalid => "ssh_config_invalid",
            ErrorCode::SshIdentityFileNotFound => "ssh_identity_file_not_found",
            ErrorCode::SshConnectFailed => "ssh_connect_failed",
            ErrorCode::StateCommit => "state_commit",
            ErrorCode::ProjectNotFound => "project_not_found",
            ErrorCode::ServiceNotFound => "service_not_found",
            ErrorCode::ValidationInvalidArgument => "validation_invalid_argument",
            ErrorCode::InternalIoError => "internal_io_error",
            ErrorCode::InternalYamlError => "internal_yaml_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub hints: Vec<String>,
    pub retryable: Option<bool>,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            hints: Vec::new(),
            retryable: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }

    // ========================================================================
    // Template engine
    // ========================================================================

    pub fn template_parse(message: impl Into<String>, template: &str) -> Self {
        Self::new(
            ErrorCode::TemplateParse,
            message,
            json!({ "template": template }),
        )
    }

    pub fn template_render(message: impl Into<String>, template: &str) -> Self {
        Self::new(
            ErrorCode::TemplateRender,
            message,
            json!({ "template": template }),
        )
    }

    // ========================================================================
    // Command execution
    // ========================================================================

    pub fn command_failed(
        command: &str,
        stdout: &str,
        stderr: &str,
        exit_code: i32,
    ) -> Self {
        Self::new(
            ErrorCode::CommandFailed,
            format!("There was an error running the command '{}'", command),
            json!({
                "command": command,
                "stdout": stdout,
                "stderr": stderr,
                "exitCode": exit_code,
            }),
        )
    }

    // ========================================================================
    // Host resolution / session acquisition
    // ========================================================================

    pub fn ssh_host_not_found(host_key: &str) -> Self {
        Self::new(
            ErrorCode::SshHostNotFound,
            format!("The host '{}' was not found in your SSH config", host_key),
            json!({ "host": host_key }),
        )
    }

    pub fn ssh_config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SshConfigInvalid, message, Value::Null)
    }

    pub fn ssh_missing_field(host_key: &str, field: &str) -> Self {
        Self::new(
            ErrorCode::SshConfigInvalid,
            format!("'{}' not found in your SSH config for '{}'", field, host_key),
            json!({ "host": host_key, "field": field }),
        )
    }

    pub fn ssh_identity_file_not_found(host_key: &str, path: &str) -> Self {
        Self::new(
            ErrorCode::SshIdentityFileNotFound,
            format!("Identity file '{}' for host '{}' does not exist", path, host_key),
            json!({ "host": host_key, "identityFile": path }),
        )
    }

    pub fn ssh_connect_failed(host: &str, user: &str, cause: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::SshConnectFailed,
            format!(
                "There was a problem setting up an SSH session to '{}' (user '{}'): {}",
                host,
                user,
                cause.into()
            ),
            json!({ "host": host, "user": user }),
        )
    }

    // ========================================================================
    // Project state
    // ========================================================================

    pub fn state_commit(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StateCommit, message, Value::Null).with_retryable(true)
    }

    pub fn project_not_found(path: &str) -> Self {
        Self::new(
            ErrorCode::ProjectNotFound,
            format!("Project file '{}' does not exist", path),
            json!({ "path": path }),
        )
    }

    pub fn service_not_found(name: &str, available: Vec<String>) -> Self {
        Self::new(
            ErrorCode::ServiceNotFound,
            format!("'{}' is not a known service", name),
            json!({ "service": name, "available": available }),
        )
    }

    // ========================================================================
    // Ambient
    // ========================================================================

    pub fn validation_invalid_argument(
        field: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            ErrorCode::ValidationInvalidArgument,
            message,
            json!({ "field": field }),
        )
    }

    pub fn internal_io(message: impl Into<String>, context: Option<String>) -> Self {
        let details = match context {
            Some(ctx) => json!({ "context": ctx }),
            None => Value::Null,
        };
        Self::new(ErrorCode::InternalIoError, message, details)
    }

    pub fn internal_yaml(message: impl Into<String>, context: Option<String>) -> Self {
        let details = match context {
            Some(ctx) => json!({ "context": ctx }),
            None => Value::Null,
        };
        Self::new(ErrorCode::InternalYamlError, message, details)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_hint_accumulates() {
        let err = Error::ssh_host_not_found("web1")
            .with_hint("Check ~/.ssh/config")
            .with_hint("Run 'skiff hosts' to list configured hosts");
        assert_eq!(err.hints.len(), 2);
        assert_eq!(err.code, ErrorCode::SshHostNotFound);
    }

    #[test]
    fn command_failed_carries_output() {
        let err = Error::command_failed("apt update", "out", "err", 100);
        assert_eq!(err.details["stdout"], "out");
        assert_eq!(err.details["stderr"], "err");
        assert_eq!(err.details["exitCode"], 100);
    }

    #[test]
    fn state_commit_is_retryable() {
        let err = Error::state_commit("could not write skiff.yaml");
        assert_eq!(err.retryable, Some(true));
    }
}
