//! Pipeline composition: ordered steps and local actions, fail-fast.
//!
//! A pipeline is the top-level workflow (server preparation or
//! application deployment). Stage order encodes real dependencies, so
//! execution is strictly sequential: the first stage that fails halts
//! everything after it. State commit is the caller's final act and only
//! happens after the whole pipeline has succeeded.

use crate::context::TemplateContext;
use crate::error::{Error, Result};
use crate::progress::Progress;
use crate::session::{ExecutionSession, LocalShell};
use crate::step::{self, Step};
use crate::template;

/// A build/transfer action run against the local machine. Same run/fail
/// contract as a remote step, sequenced inline with them.
#[derive(Debug, Clone)]
pub struct LocalAction {
    pub template: String,
    pub description: String,
}

impl LocalAction {
    pub fn new(template: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Stage {
    Remote(Step),
    Local(LocalAction),
}

impl Stage {
    /// Human label for progress and summaries.
    pub fn label(&self) -> &str {
        match self {
            Stage::Remote(step) => &step.starting_message,
            Stage::Local(action) => &action.description,
        }
    }
}

/// Run stages strictly in order against the given remote session.
///
/// Local stages run through a `LocalShell`. The first failure aborts the
/// pipeline; nothing after it is attempted, and the caller must not
/// commit project state.
pub fn run_pipeline(
    stages: &[Stage],
    ctx: &TemplateContext,
    session: &mut dyn ExecutionSession,
    progress: &mut dyn Progress,
) -> Result<()> {
    let mut local = LocalShell::new();

    for stage in stages {
        match stage {
            Stage::Remote(s) => step::run_step(s, ctx, session, progress)?,
            Stage::Local(action) => run_local_action(action, ctx, &mut local, progress)?,
        }
    }

    Ok(())
}

fn run_local_action(
    action: &LocalAction,
    ctx: &TemplateContext,
    local: &mut dyn ExecutionSession,
    progress: &mut dyn Progress,
) -> Result<()> {
    progress.step_started(&format!("Running: {}...", action.description));

    match run_local_command(action, ctx, local) {
        Ok(()) => {
            progress.step_succeeded(&format!("Finished '{}'", action.description));
            Ok(())
        }
        Err(err) => {
            progress.step_failed(&format!(
                "Error running '{}': {}",
                action.description, err.message
            ));
            Err(err)
        }
    }
}

fn run_local_command(
    action: &LocalAction,
    ctx: &TemplateContext,
    local: &mut dyn ExecutionSession,
) -> Result<()> {
    let text = template::expand(&action.template, ctx)?;
    let output = local.run(&text)?;

    if !output.success {
        return Err(Error::command_failed(
            &text,
            &output.stdout,
            &output.stderr,
            output.exit_code,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::progress::{ProgressEvent, RecordingProgress};
    use crate::project::{ProjectStore, ProjectState};
    use crate::step::test_support::ScriptedSession;
    use crate::step::Command;

    fn ctx() -> TemplateContext {
        TemplateContext::builder()
            .service_name("api")
            .port(9000)
            .build()
            .unwrap()
    }

    fn named_step(name: &str) -> Step {
        Step {
            commands: vec![Command::new(format!("run {}", name), format!("{}...", name))],
            starting_message: format!("Starting {}...", name),
            success_message: format!("{} done.", name),
            failure_message: format!("{} failed", name),
        }
    }

    #[test]
    fn stages_run_in_caller_order() {
        let stages = vec![
            Stage::Remote(named_step("first")),
            Stage::Remote(named_step("second")),
            Stage::Remote(named_step("third")),
        ];
        let mut session = ScriptedSession::default();
        let mut progress = RecordingProgress::default();

        run_pipeline(&stages, &ctx(), &mut session, &mut progress).unwrap();
        assert_eq!(session.executed, vec!["run first", "run second", "run third"]);
    }

    #[test]
    fn fail_fast_mid_pipeline() {
        // Step 2 fails: step 1's effects applied, step 3 never attempted.
        let stages = vec![
            Stage::Remote(named_step("first")),
            Stage::Remote(named_step("second")),
            Stage::Remote(named_step("third")),
        ];
        let mut session = ScriptedSession::failing_on("second");
        let mut progress = RecordingProgress::default();

        let err = run_pipeline(&stages, &ctx(), &mut session, &mut progress).unwrap_err();
        assert_eq!(err.code, ErrorCode::CommandFailed);
        assert_eq!(session.executed, vec!["run first", "run second"]);
        assert!(progress
            .events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Failed(m) if m.contains("second failed"))));
    }

    #[test]
    fn local_actions_run_inline() {
        let stages = vec![
            Stage::Remote(named_step("first")),
            Stage::Local(LocalAction::new("true", "Build {{serviceName}} image")),
            Stage::Remote(named_step("second")),
        ];
        let mut session = ScriptedSession::default();
        let mut progress = RecordingProgress::default();

        run_pipeline(&stages, &ctx(), &mut session, &mut progress).unwrap();
        assert_eq!(session.executed, vec!["run first", "run second"]);
    }

    #[test]
    fn failed_local_action_halts_pipeline() {
        let stages = vec![
            Stage::Local(LocalAction::new("exit 7", "Doomed build")),
            Stage::Remote(named_step("after")),
        ];
        let mut session = ScriptedSession::default();
        let mut progress = RecordingProgress::default();

        let err = run_pipeline(&stages, &ctx(), &mut session, &mut progress).unwrap_err();
        assert_eq!(err.code, ErrorCode::CommandFailed);
        assert_eq!(err.details["exitCode"], 7);
        assert!(session.executed.is_empty());
    }

    #[test]
    fn local_spawn_failure_still_reports_terminal_outcome() {
        struct BrokenShell;

        impl ExecutionSession for BrokenShell {
            fn run(&mut self, _command: &str) -> crate::Result<crate::CommandOutput> {
                Err(crate::Error::internal_io(
                    "Failed to spawn shell: no such file or directory",
                    Some("run local command".to_string()),
                ))
            }
        }

        let action = LocalAction::new("true", "Build image");
        let mut progress = RecordingProgress::default();

        let err = run_local_action(&action, &ctx(), &mut BrokenShell, &mut progress).unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalIoError);
        assert_eq!(progress.terminal_reports(), 1);
        assert!(progress
            .events
            .iter()
            .any(|e| matches!(e, ProgressEvent::Failed(m) if m.contains("Build image"))));
    }

    #[test]
    fn failed_pipeline_leaves_state_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(dir.path());
        let state = ProjectState {
            service_name: "api".to_string(),
            version: 3,
            ..ProjectState::default()
        };
        store.save(&state).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let stages = vec![Stage::Remote(named_step("only"))];
        let mut session = ScriptedSession::failing_on("only");
        let mut progress = RecordingProgress::default();
        let result = run_pipeline(&stages, &ctx(), &mut session, &mut progress);
        assert!(result.is_err());

        // No commit happened, so the file is byte-identical.
        let after = std::fs::read(store.path()).unwrap();
        assert_eq!(before, after);
    }
}
