//! Commands, steps, and the step runner.
//!
//! A `Command` pairs a template with a progress message. A `Step` is an
//! ordered sequence of commands plus lifecycle messages, and is the unit
//! of fail-fast execution: the first command that fails aborts the step,
//! and the step reports exactly one overall success or failure.

use crate::context::TemplateContext;
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::session::ExecutionSession;
use crate::template;

/// An immutable (template, progress message) pair. Commands are catalog
/// data, never built from user-controlled strings at runtime.
#[derive(Debug, Clone)]
pub struct Command {
    pub template: String,
    pub message: String,
}

impl Command {
    pub fn new(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Step {
    pub commands: Vec<Command>,
    pub starting_message: String,
    pub success_message: String,
    pub failure_message: String,
}

/// Run every command of a step, in order, against a session.
///
/// Each command's template is expanded first; an expansion failure aborts
/// before anything is sent to the session. A command that runs and fails
/// aborts the step with its captured output. Side effects of earlier
/// commands persist; there is no rollback.
pub fn run_step(
    step: &Step,
    ctx: &TemplateContext,
    session: &mut dyn ExecutionSession,
    progress: &mut dyn Progress,
) -> Result<()> {
    progress.step_started(&step.starting_message);

    match run_commands(step, ctx, session, progress) {
        Ok(()) => {
            progress.step_succeeded(&step.success_message);
            Ok(())
        }
        Err(err) => {
            progress.step_failed(&format!("{}: {}", step.failure_message, err.message));
            Err(err)
        }
    }
}

fn run_commands(
    step: &Step,
    ctx: &TemplateContext,
    session: &mut dyn ExecutionSession,
    progress: &mut dyn Progress,
) -> Result<()> {
    for command in &step.commands {
        // Progress messages may reference context fields too.
        let message = template::expand(&command.message, ctx)?;
        progress.command_running(&message);

        let text = template::expand(&command.template, ctx)?;
        let output = session.run(&text)?;

        if !output.success {
            return Err(Error::command_failed(
                &text,
                &output.stdout,
                &output.stderr,
                output.exit_code,
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::session::CommandOutput;

    /// Scripted session: succeeds on every command except those containing
    /// a failure marker, and records everything it was asked to run.
    #[derive(Default)]
    pub struct ScriptedSession {
        pub executed: Vec<String>,
        pub fail_on: Option<String>,
    }

    impl ScriptedSession {
        pub fn failing_on(marker: &str) -> Self {
            Self {
                executed: Vec::new(),
                fail_on: Some(marker.to_string()),
            }
        }
    }

    impl ExecutionSession for ScriptedSession {
        fn run(&mut self, command: &str) -> Result<CommandOutput> {
            self.executed.push(command.to_string());

            let fails = self
                .fail_on
                .as_ref()
                .is_some_and(|marker| command.contains(marker));

            Ok(CommandOutput {
                stdout: String::new(),
                stderr: if fails { "boom".to_string() } else { String::new() },
                success: !fails,
                exit_code: if fails { 1 } else { 0 },
            })
        }
    }
}
