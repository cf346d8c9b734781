use clap::Args;
use serde::Serialize;

use skiff::catalog;
use skiff::context::ContextBuilder;
use skiff::pipeline::{self, Stage};
use skiff::progress::TerminalProgress;
use skiff::project::{ProjectState, ProjectStore};
use skiff::session::SshSession;
use skiff::{log_status, ssh_config, validation};

use super::CmdResult;

#[derive(Args)]
pub struct PrepareArgs {
    /// Host alias from your SSH config
    #[arg(long)]
    pub host: String,

    /// Contact email for TLS certificate issuance
    #[arg(long)]
    pub email: String,

    /// Overwrite an existing project file
    #[arg(long)]
    pub force: bool,
}

#[derive(Serialize)]
pub struct PrepareOutput {
    pub command: String,
    pub host: String,
    pub email: String,
    pub steps: Vec<String>,
}

/// Set up a fresh server: base packages, Docker, and Traefik, then write
/// the initial project file.
pub fn run(args: PrepareArgs, global: &super::GlobalArgs) -> CmdResult<PrepareOutput> {
    validation::require_non_empty(&args.host, "host", "A host alias is required")?;
    validation::require_email(&args.email, "email")?;

    let store = ProjectStore::current_dir()?;
    if store.exists() && !args.force {
        return Err(skiff::Error::validation_invalid_argument(
            "force",
            format!(
                "A project file already exists at '{}'",
                store.path().display()
            ),
        )
        .with_hint("Pass --force to prepare this server again"));
    }

    let config_text = ssh_config::read_config(&ssh_config::default_config_path())?;
    let resolved = ssh_config::resolve_host(&config_text, &args.host)?;

    let ctx = ContextBuilder::default()
        .email(&args.email)
        .resolved_host(&args.host, &resolved)
        .build()?;

    if global.debug {
        log_status!("prepare", "context: {:?}", ctx);
    }

    let mut session = SshSession::connect(&args.host, &resolved)?;
    let mut progress = TerminalProgress;

    let stages = vec![
        Stage::Remote(catalog::base_server_step()),
        Stage::Remote(catalog::docker_install_step()),
        Stage::Remote(catalog::traefik_install_step()),
    ];
    let steps: Vec<String> = stages.iter().map(|s| s.label().to_string()).collect();

    pipeline::run_pipeline(&stages, &ctx, &mut session, &mut progress)?;

    let state = ProjectState {
        host: args.host.clone(),
        cert_email: args.email.clone(),
        env_file: ".env".to_string(),
        ..ProjectState::default()
    };
    store.commit_prepare(&state)?;

    log_status!("prepare", "Server '{}' is ready.", args.host);

    Ok((
        PrepareOutput {
            command: "prepare".to_string(),
            host: args.host,
            email: args.email,
            steps,
        },
        0,
    ))
}
