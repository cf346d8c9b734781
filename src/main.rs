use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{deploy, hosts, prepare, project, service, GlobalArgs};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "skiff")]
#[command(version = VERSION)]
#[command(about = "Provision a server and deploy containerized apps over SSH")]
struct Cli {
    /// Include diagnostic output on stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Prepare a fresh server: base packages, Docker, and Traefik
    Prepare(prepare::PrepareArgs),
    /// Build your application image, transfer it, and start it
    Deploy(deploy::DeployArgs),
    /// Manage shared services (PostgreSQL, ...)
    Service(service::ServiceArgs),
    /// List host aliases from your SSH config
    Hosts(hosts::HostsArgs),
    /// Inspect the current project
    Project(project::ProjectArgs),
}

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    let global = GlobalArgs { debug: cli.debug };

    let (json_result, exit_code) = commands::run_json(cli.command, &global);
    let _ = output::print_json_result(json_result);

    std::process::ExitCode::from(exit_code_to_u8(exit_code))
}

fn exit_code_to_u8(code: i32) -> u8 {
    if code <= 0 {
        0
    } else if code >= 255 {
        255
    } else {
        code as u8
    }
}
