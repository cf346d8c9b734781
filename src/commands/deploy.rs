use std::path::Path;

use clap::Args;
use serde::Serialize;

use skiff::catalog;
use skiff::context::ContextBuilder;
use skiff::pipeline::{self, Stage};
use skiff::progress::TerminalProgress;
use skiff::project::{Mount, ProjectStore};
use skiff::session::SshSession;
use skiff::{log_status, ssh_config, validation};

use super::CmdResult;

#[derive(Args)]
pub struct DeployArgs {
    /// App name (directory and Docker friendly)
    #[arg(long)]
    pub service_name: Option<String>,

    /// Port your app binds to
    #[arg(long)]
    pub port: Option<u16>,

    /// Domain (URL) to your app
    #[arg(long)]
    pub domain: Option<String>,

    /// Env file containing your app settings
    #[arg(long)]
    pub env_file: Option<String>,

    /// Service dependency (repeatable, replaces the stored list)
    #[arg(long = "dependency", value_name = "NAME")]
    pub dependencies: Vec<String>,

    /// Volume mount as local:remote (repeatable, replaces the stored list)
    #[arg(long = "mount", value_name = "LOCAL:REMOTE")]
    pub mounts: Vec<String>,
}

#[derive(Serialize)]
pub struct DeployOutput {
    pub command: String,
    pub service_name: String,
    pub host: String,
    pub version: u32,
    pub last_deploy: String,
}

/// Build the application image, transfer it, and start it on the server.
///
/// Settings are merged in memory and persisted in a single commit after
/// the pipeline succeeds, so a failed deploy leaves the project file
/// exactly as it was.
pub fn run(args: DeployArgs, global: &super::GlobalArgs) -> CmdResult<DeployOutput> {
    let store = ProjectStore::current_dir()?;
    let mut state = store.load()?;

    if let Some(value) = args.service_name {
        state.service_name = value;
    }
    if let Some(value) = args.port {
        state.port = value;
    }
    if let Some(value) = args.domain {
        state.domain = value;
    }
    if let Some(value) = args.env_file {
        state.env_file = value;
    }
    if !args.dependencies.is_empty() {
        state.dependencies = args.dependencies;
    }
    // An empty --mount list keeps whatever the project already has.
    if !args.mounts.is_empty() {
        state.mounts = args
            .mounts
            .iter()
            .map(|spec| Mount::parse(spec))
            .collect::<skiff::Result<Vec<Mount>>>()?;
    }
    if state.env_file.is_empty() {
        state.env_file = ".env".to_string();
    }

    validation::require_non_empty(
        &state.service_name,
        "serviceName",
        "App name must not be empty",
    )?;
    validation::require_non_empty(&state.host, "host", "The project has no host configured")
        .map_err(|e| e.with_hint("Run 'skiff prepare --host <alias>' first"))?;
    if state.port == 0 {
        return Err(skiff::Error::validation_invalid_argument(
            "port",
            "A port number is required",
        ));
    }

    let config_text = ssh_config::read_config(&ssh_config::default_config_path())?;
    let resolved = ssh_config::resolve_host(&config_text, &state.host)?;

    let ctx = ContextBuilder::from_state(&state)
        .resolved_host(&state.host, &resolved)
        .build()?;

    if global.debug {
        log_status!("deploy", "context: {:?}", ctx);
    }

    let mut session = SshSession::connect(&state.host, &resolved)?;
    let mut progress = TerminalProgress;

    // The env file may be given with a path; only its file name matters on
    // the server, and the local copy is expected next to the Dockerfile.
    let env_file_name = Path::new(&state.env_file)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| state.env_file.clone());
    let cwd = std::env::current_dir()
        .map_err(|e| skiff::Error::internal_io(e.to_string(), Some("resolve cwd".to_string())))?;
    let local_env_path = cwd.join(&env_file_name).to_string_lossy().to_string();

    let mut stages = vec![
        Stage::Remote(catalog::app_setup_step()),
        Stage::Local(catalog::upload_env_action(&local_env_path, &env_file_name)),
    ];
    if !state.mounts.is_empty() {
        stages.push(Stage::Remote(catalog::mount_dirs_step(&state.mounts)));
    }
    stages.extend([
        Stage::Local(catalog::build_image_action()),
        Stage::Local(catalog::upload_image_action()),
        Stage::Remote(catalog::load_app_step()),
        Stage::Remote(catalog::start_app_step()),
        Stage::Remote(catalog::cleanup_app_step()),
    ]);

    pipeline::run_pipeline(&stages, &ctx, &mut session, &mut progress)?;

    store.commit_deploy(&mut state)?;

    log_status!("deploy", "Version {} deployed!", state.version);

    Ok((
        DeployOutput {
            command: "deploy".to_string(),
            service_name: state.service_name,
            host: state.host,
            version: state.version,
            last_deploy: state.last_deploy,
        },
        0,
    ))
}
