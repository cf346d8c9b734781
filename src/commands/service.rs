use std::collections::BTreeMap;

use clap::{Args, Subcommand};
use serde::Serialize;

use skiff::context::ContextBuilder;
use skiff::progress::TerminalProgress;
use skiff::project::ProjectStore;
use skiff::services;
use skiff::session::SshSession;
use skiff::step;
use skiff::{log_status, ssh_config, validation};

use super::CmdResult;

#[derive(Args)]
pub struct ServiceArgs {
    #[command(subcommand)]
    command: ServiceCommand,
}

#[derive(Subcommand)]
enum ServiceCommand {
    /// Install a shared service on the project's server
    Install {
        /// Service name from the catalog
        name: String,

        /// Environment variable for the service (repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,
    },
    /// List installable services
    List,
}

#[derive(Default, Serialize)]
pub struct ServiceOutput {
    pub command: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<ServiceListItem>>,
}

#[derive(Serialize)]
pub struct ServiceListItem {
    pub name: String,
    pub description: String,
}

pub fn run(args: ServiceArgs, global: &super::GlobalArgs) -> CmdResult<ServiceOutput> {
    match args.command {
        ServiceCommand::Install { name, env } => install(&name, &env, global),
        ServiceCommand::List => list(),
    }
}

fn list() -> CmdResult<ServiceOutput> {
    let services = services::all()
        .iter()
        .map(|s| ServiceListItem {
            name: s.name.to_string(),
            description: s.description.to_string(),
        })
        .collect();

    Ok((
        ServiceOutput {
            command: "service.list".to_string(),
            services: Some(services),
            ..ServiceOutput::default()
        },
        0,
    ))
}

fn install(name: &str, env_flags: &[String], global: &super::GlobalArgs) -> CmdResult<ServiceOutput> {
    let definition = services::find(name)?;
    let env = collect_env(definition, env_flags)?;

    let store = ProjectStore::current_dir()?;
    let state = store.load()?;
    validation::require_non_empty(&state.host, "host", "The project has no host configured")
        .map_err(|e| e.with_hint("Run 'skiff prepare --host <alias>' first"))?;

    let config_text = ssh_config::read_config(&ssh_config::default_config_path())?;
    let resolved = ssh_config::resolve_host(&config_text, &state.host)?;

    let mut builder = ContextBuilder::default().resolved_host(&state.host, &resolved);
    for (key, value) in env {
        builder = builder.env_var(key, value);
    }
    let ctx = builder.build()?;

    if global.debug {
        log_status!("service", "context: {:?}", ctx);
    }

    let mut session = SshSession::connect(&state.host, &resolved)?;
    let mut progress = TerminalProgress;

    step::run_step(&definition.step(), &ctx, &mut session, &mut progress)?;

    log_status!("service", "Service '{}' installed on '{}'.", name, state.host);

    Ok((
        ServiceOutput {
            command: "service.install".to_string(),
            service: Some(name.to_string()),
            host: Some(state.host),
            ..ServiceOutput::default()
        },
        0,
    ))
}

/// Parse `--env KEY=VALUE` flags, apply the service's defaults, and check
/// required keys.
fn collect_env(
    definition: &services::ServiceDefinition,
    env_flags: &[String],
) -> skiff::Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();

    for flag in env_flags {
        match flag.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                env.insert(key.to_string(), value.to_string());
            }
            _ => {
                return Err(skiff::Error::validation_invalid_argument(
                    "env",
                    format!("Env '{}' must be in 'KEY=VALUE' form", flag),
                ));
            }
        }
    }

    for (key, value) in definition.env_defaults {
        env.entry(key.to_string()).or_insert_with(|| value.to_string());
    }

    for key in definition.required_env {
        if !env.contains_key(*key) {
            return Err(skiff::Error::validation_invalid_argument(
                "env",
                format!("'{}' requires --env {}=<value>", definition.name, key),
            ));
        }
    }

    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_env_applies_defaults_and_requires_password() {
        let definition = services::find("postgres").unwrap();

        let err = collect_env(definition, &[]).unwrap_err();
        assert!(err.message.contains("POSTGRES_PASSWORD"));

        let env = collect_env(definition, &["POSTGRES_PASSWORD=hunter2".to_string()]).unwrap();
        assert_eq!(env["POSTGRES_USER"], "root");
        assert_eq!(env["POSTGRES_PASSWORD"], "hunter2");
    }

    #[test]
    fn collect_env_flag_overrides_default() {
        let definition = services::find("postgres").unwrap();
        let env = collect_env(
            definition,
            &[
                "POSTGRES_PASSWORD=hunter2".to_string(),
                "POSTGRES_USER=admin".to_string(),
            ],
        )
        .unwrap();
        assert_eq!(env["POSTGRES_USER"], "admin");
    }

    #[test]
    fn collect_env_rejects_malformed_flag() {
        let definition = services::find("postgres").unwrap();
        let err = collect_env(definition, &["NOPE".to_string()]).unwrap_err();
        assert!(err.message.contains("KEY=VALUE"));
    }
}
