//! Installable shared services.
//!
//! A service is a named catalog entry an operator can install onto a
//! prepared server. Each entry carries its own setup step and the env
//! variables it expects.

use crate::error::{Error, Result};
use crate::step::{Command, Step};

pub const POSTGRES_VERSION: &str = "15.2";

#[derive(Debug)]
pub struct ServiceDefinition {
    pub name: &'static str,
    pub description: &'static str,
    /// Env keys that must be supplied at install time.
    pub required_env: &'static [&'static str],
    /// Defaults applied when the operator does not supply the key.
    pub env_defaults: &'static [(&'static str, &'static str)],
    step: fn() -> Step,
}

impl ServiceDefinition {
    pub fn step(&self) -> Step {
        (self.step)()
    }
}

pub fn all() -> &'static [ServiceDefinition] {
    &[ServiceDefinition {
        name: "postgres",
        description: "PostgreSQL is a powerful, open source object-relational database system",
        required_env: &["POSTGRES_PASSWORD"],
        env_defaults: &[("POSTGRES_USER", "root")],
        step: postgres_step,
    }]
}

pub fn names() -> Vec<String> {
    all().iter().map(|s| s.name.to_string()).collect()
}

pub fn find(name: &str) -> Result<&'static ServiceDefinition> {
    all()
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| Error::service_not_found(name, names()))
}

fn postgres_step() -> Step {
    Step {
        commands: vec![
            Command::new(
                "cd ~ && mkdir -p services/postgres/data",
                "Installing PostgreSQL...",
            ),
            Command::new(
                format!(
                    r#"cd ~/services/postgres && tee docker-compose.yml <<EOF
services:
  postgres:
    image: postgres:{version}
    container_name: postgres
    restart: unless-stopped
    ports:
      - 127.0.0.1:5432:5432
    environment:{{{{#each env}}}}
      {{{{@key}}}}: "{{{{@value}}}}"{{{{/each}}}}
    volumes:
      - ~/services/postgres/data:/var/lib/postgresql/data
    networks:
      - applications

networks:
  applications:
    external: true
EOF"#,
                    version = POSTGRES_VERSION
                ),
                "Installing PostgreSQL...",
            ),
            Command::new(
                "cd services/postgres && sudo docker compose up -d",
                "Starting PostgreSQL...",
            ),
        ],
        starting_message: "Setting up PostgreSQL...".to_string(),
        success_message: "PostgreSQL setup successfully.".to_string(),
        failure_message: "There was a problem setting up PostgreSQL".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TemplateContext;
    use crate::error::ErrorCode;
    use crate::template;

    #[test]
    fn find_known_service() {
        let service = find("postgres").unwrap();
        assert_eq!(service.name, "postgres");
        assert!(service.required_env.contains(&"POSTGRES_PASSWORD"));
    }

    #[test]
    fn unknown_service_lists_available() {
        let err = find("redis").unwrap_err();
        assert_eq!(err.code, ErrorCode::ServiceNotFound);
        assert_eq!(err.details["available"][0], "postgres");
    }

    #[test]
    fn postgres_compose_renders_env_sorted() {
        let ctx = TemplateContext::builder()
            .env_var("POSTGRES_USER", "root")
            .env_var("POSTGRES_PASSWORD", "hunter2")
            .env_var("POSTGRES_DB", "app")
            .build()
            .unwrap();

        let step = find("postgres").unwrap().step();
        let compose = template::expand(&step.commands[1].template, &ctx).unwrap();

        assert!(compose.contains(&format!("image: postgres:{}", POSTGRES_VERSION)));
        let db = compose.find("POSTGRES_DB: \"app\"").unwrap();
        let password = compose.find("POSTGRES_PASSWORD: \"hunter2\"").unwrap();
        let user = compose.find("POSTGRES_USER: \"root\"").unwrap();
        assert!(db < password && password < user);
    }

    #[test]
    fn postgres_binds_loopback_only() {
        let step = find("postgres").unwrap().step();
        assert!(step.commands[1]
            .template
            .contains("127.0.0.1:5432:5432"));
    }
}
