//! Template context: the variables available to command templates.
//!
//! Assembled once per invocation from persisted project state plus freshly
//! collected input, then passed unchanged through every step of a
//! pipeline. Steps read it, never mutate it.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::project::{Mount, ProjectState};
use crate::ssh_config::ResolvedHost;
use crate::template::{Value, Vars};
use crate::validation;

/// Ports claimed by the reverse proxy and its dashboard; applications may
/// not bind to them.
pub const RESERVED_PORTS: [u16; 3] = [80, 443, 8080];

/// Variable names command templates may reference.
pub struct ContextVars;

impl ContextVars {
    pub const SERVICE_NAME: &'static str = "serviceName";
    pub const PORT: &'static str = "port";
    pub const DOMAIN: &'static str = "domain";
    pub const ENV_FILE: &'static str = "envFile";
    pub const DEPENDENCIES: &'static str = "dependencies";
    pub const MOUNTS: &'static str = "mounts";
    pub const ENV: &'static str = "env";
    pub const HOST: &'static str = "host";
    pub const HOST_NAME: &'static str = "hostName";
    pub const USER: &'static str = "user";
    pub const IDENTITY_FILE: &'static str = "identityFile";
    pub const EMAIL: &'static str = "email";
}

#[derive(Debug, Clone, Default)]
pub struct TemplateContext {
    service_name: String,
    port: u16,
    domain: String,
    env_file: String,
    dependencies: Vec<String>,
    mounts: Vec<Mount>,
    env: BTreeMap<String, String>,
    host: String,
    host_name: String,
    user: String,
    identity_file: String,
    email: String,
}

impl TemplateContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Vars for TemplateContext {
    fn value(&self, key: &str) -> Option<Value> {
        match key {
            ContextVars::SERVICE_NAME => Some(Value::Str(self.service_name.clone())),
            ContextVars::PORT => Some(Value::Str(self.port.to_string())),
            ContextVars::DOMAIN => Some(Value::Str(self.domain.clone())),
            ContextVars::ENV_FILE => Some(Value::Str(self.env_file.clone())),
            ContextVars::HOST => Some(Value::Str(self.host.clone())),
            ContextVars::HOST_NAME => Some(Value::Str(self.host_name.clone())),
            ContextVars::USER => Some(Value::Str(self.user.clone())),
            ContextVars::IDENTITY_FILE => Some(Value::Str(self.identity_file.clone())),
            ContextVars::EMAIL => Some(Value::Str(self.email.clone())),
            ContextVars::DEPENDENCIES => Some(Value::List(self.dependencies.clone())),
            ContextVars::MOUNTS => Some(Value::List(
                self.mounts.iter().map(|m| m.to_string()).collect(),
            )),
            // BTreeMap iteration keeps env rendering deterministic.
            ContextVars::ENV => Some(Value::Map(
                self.env
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            )),
            _ => None,
        }
    }
}

/// Validating constructor for `TemplateContext`.
///
/// Structural rules are enforced here for any value that is set; commands
/// decide which values are required for their workflow.
#[derive(Debug, Default)]
pub struct ContextBuilder {
    state: ProjectState,
    env: BTreeMap<String, String>,
    host_name: String,
    user: String,
    identity_file: String,
}

impl ContextBuilder {
    /// Seed the builder from persisted project state.
    pub fn from_state(state: &ProjectState) -> Self {
        Self {
            state: state.clone(),
            ..Self::default()
        }
    }

    pub fn service_name(mut self, value: impl Into<String>) -> Self {
        self.state.service_name = value.into();
        self
    }

    pub fn port(mut self, value: u16) -> Self {
        self.state.port = value;
        self
    }

    pub fn domain(mut self, value: impl Into<String>) -> Self {
        self.state.domain = value.into();
        self
    }

    pub fn env_file(mut self, value: impl Into<String>) -> Self {
        self.state.env_file = value.into();
        self
    }

    pub fn dependencies(mut self, values: Vec<String>) -> Self {
        self.state.dependencies = values;
        self
    }

    pub fn mounts(mut self, values: Vec<Mount>) -> Self {
        self.state.mounts = values;
        self
    }

    pub fn email(mut self, value: impl Into<String>) -> Self {
        self.state.cert_email = value.into();
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Attach the resolved connection identity for a host key.
    pub fn resolved_host(mut self, host_key: impl Into<String>, resolved: &ResolvedHost) -> Self {
        self.state.host = host_key.into();
        self.host_name = resolved.host_name.clone();
        self.user = resolved.user.clone();
        self.identity_file = resolved.identity_file.clone();
        self
    }

    pub fn build(self) -> Result<TemplateContext> {
        if self.state.service_name.contains(char::is_whitespace) {
            return Err(Error::validation_invalid_argument(
                ContextVars::SERVICE_NAME,
                "App name must not contain spaces",
            ));
        }

        if RESERVED_PORTS.contains(&self.state.port) {
            return Err(Error::validation_invalid_argument(
                ContextVars::PORT,
                format!(
                    "Port {} is reserved (ports 80, 443, and 8080 are taken)",
                    self.state.port
                ),
            ));
        }

        if !self.state.cert_email.is_empty() {
            validation::require_email(&self.state.cert_email, ContextVars::EMAIL)?;
        }

        Ok(TemplateContext {
            service_name: self.state.service_name,
            port: self.state.port,
            domain: self.state.domain,
            env_file: self.state.env_file,
            dependencies: self.state.dependencies,
            mounts: self.state.mounts,
            env: self.env,
            host: self.state.host,
            host_name: self.host_name,
            user: self.user,
            identity_file: self.identity_file,
            email: self.state.cert_email,
        })
    }
}
