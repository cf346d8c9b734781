use clap::{Args, Subcommand};
use serde::Serialize;

use skiff::project::{ProjectState, ProjectStore};

use super::CmdResult;

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    command: ProjectCommand,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Display the current project state
    Show,
}

#[derive(Serialize)]
pub struct ProjectOutput {
    pub command: String,
    pub path: String,
    pub project: ProjectState,
}

pub fn run(args: ProjectArgs, _global: &super::GlobalArgs) -> CmdResult<ProjectOutput> {
    match args.command {
        ProjectCommand::Show => show(),
    }
}

fn show() -> CmdResult<ProjectOutput> {
    let store = ProjectStore::current_dir()?;
    let project = store.load()?;

    Ok((
        ProjectOutput {
            command: "project.show".to_string(),
            path: store.path().to_string_lossy().to_string(),
            project,
        },
        0,
    ))
}
