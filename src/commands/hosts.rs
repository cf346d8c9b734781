use clap::Args;
use serde::Serialize;

use skiff::ssh_config;

use super::CmdResult;

#[derive(Args)]
pub struct HostsArgs {
    /// Read a specific SSH config file instead of ~/.ssh/config
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,
}

#[derive(Serialize)]
pub struct HostsOutput {
    pub command: String,
    pub hosts: Vec<String>,
}

/// List concrete host aliases from the SSH config.
pub fn run(args: HostsArgs, _global: &super::GlobalArgs) -> CmdResult<HostsOutput> {
    let path = match args.config {
        Some(path) => std::path::PathBuf::from(shellexpand::tilde(&path).to_string()),
        None => ssh_config::default_config_path(),
    };

    let config_text = ssh_config::read_config(&path)?;
    let hosts = ssh_config::list_hosts(&config_text);

    Ok((
        HostsOutput {
            command: "hosts".to_string(),
            hosts,
        },
        0,
    ))
}
