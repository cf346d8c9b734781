//! The built-in step catalog.
//!
//! Every command an operator's pipeline runs comes from here. Templates
//! reference context variables by name; nothing in this module talks to a
//! session directly.

use crate::pipeline::LocalAction;
use crate::project::Mount;
use crate::shell;
use crate::step::{Command, Step};

pub const LAZYDOCKER_VERSION: &str = "0.23.3";

/// OS package refresh and baseline tooling for a fresh server.
pub fn base_server_step() -> Step {
    Step {
        commands: vec![
            Command::new("sudo apt update -y", "Updating packages list..."),
            Command::new("sudo apt upgrade -y", "Upgrading OS packages..."),
            Command::new(
                "sudo apt install ca-certificates curl wget htop neovim git -y",
                "Installing additional packages...",
            ),
            Command::new(
                "cd ~ && mkdir -p applications/ && mkdir -p services/",
                "Setting up directories...",
            ),
        ],
        starting_message: "Updating OS and installing base software components...".to_string(),
        success_message: "Server update and software installed successfully.".to_string(),
        failure_message: "There was a problem updating the OS and installing software components"
            .to_string(),
    }
}

/// Docker engine, compose plugin, bridge networks, and lazydocker.
pub fn docker_install_step() -> Step {
    Step {
        commands: vec![
            Command::new(
                "sudo install -m 0755 -d /etc/apt/keyrings",
                "Setting up keyring...",
            ),
            Command::new(
                "sudo curl -fsSL https://download.docker.com/linux/ubuntu/gpg -o /etc/apt/keyrings/docker.asc",
                "Setting up keyring...",
            ),
            Command::new(
                "sudo chmod a+r /etc/apt/keyrings/docker.asc",
                "Setting up keyring...",
            ),
            Command::new(
                r#"echo \
         "deb [arch=$(dpkg --print-architecture) signed-by=/etc/apt/keyrings/docker.asc] https://download.docker.com/linux/ubuntu \
         $(. /etc/os-release && echo "$VERSION_CODENAME") stable" | \
         sudo tee /etc/apt/sources.list.d/docker.list > /dev/null"#,
                "Setting up keyring...",
            ),
            Command::new("sudo apt update -y", "Updating package list..."),
            Command::new(
                "sudo apt install docker-ce docker-ce-cli containerd.io docker-buildx-plugin docker-compose-plugin -y",
                "Installing Docker...",
            ),
            Command::new(
                "sudo usermod -aG docker {{user}}",
                "Adding user to 'docker' group...",
            ),
            Command::new(
                "sudo docker network create -d bridge applications || true && sudo docker network create -d bridge web || true",
                "Setting up Docker network...",
            ),
            Command::new(
                format!(
                    "cd ~ && wget https://github.com/jesseduffield/lazydocker/releases/download/v{v}/lazydocker_{v}_Linux_x86_64.tar.gz",
                    v = LAZYDOCKER_VERSION
                ),
                "Installing LazyDocker...",
            ),
            Command::new(
                format!(
                    "cd ~ && mkdir -p ./lazydocker && tar xvf ./lazydocker_{v}_Linux_x86_64.tar.gz -C ./lazydocker && sudo ln -sf ~/lazydocker/lazydocker /usr/local/bin/lazydocker",
                    v = LAZYDOCKER_VERSION
                ),
                "Installing LazyDocker...",
            ),
            Command::new(
                format!("rm ./lazydocker_{v}_Linux_x86_64.tar.gz", v = LAZYDOCKER_VERSION),
                "Cleaning up...",
            ),
        ],
        starting_message: "Setting up Docker...".to_string(),
        success_message: "Docker setup successfully.".to_string(),
        failure_message: "There was a problem setting up Docker".to_string(),
    }
}

/// Traefik reverse proxy with the ACME resolver bound to the operator's
/// certificate email.
pub fn traefik_install_step() -> Step {
    Step {
        commands: vec![
            Command::new("cd ~ && mkdir -p traefik/ssl-certs", "Installing Traefik..."),
            Command::new(
                r#"cd ~/traefik && tee docker-compose.yml <<EOF
services:
  traefik:
    image: traefik:v3.1
    container_name: traefik
    command: --api-insecure=false --providers.docker
    restart: unless-stopped
    ports:
      - 80:80
      - 443:443
    volumes:
      - /var/run/docker.sock:/var/run/docker.sock
      - ~/traefik/traefik.yml:/etc/traefik/traefik.yml
      - ~/traefik/ssl-certs:/ssl-certs/
    networks:
      - web
      - applications

networks:
  web:
    external: true
  applications:
    external: true
EOF"#,
                "Installing Traefik...",
            ),
            Command::new(
                r#"cd ~/traefik && tee traefik.yml <<EOF
global:
  checkNewVersion: true
  sendAnonymousUsage: false

api:
  dashboard: false
  insecure: false

entryPoints:
  web:
    address: :80
    http:
      redirections:
        entryPoint:
          to: websecure
          scheme: https

  websecure:
    address: :443
    http:
      tls:
        certResolver: default

certificatesResolvers:
  default:
    acme:
      email: {{email}}
      storage: /ssl-certs/acme.json
      httpChallenge:
        entryPoint: web

providers:
  docker:
    exposedByDefault: false
EOF"#,
                "Installing Traefik...",
            ),
            Command::new("cd traefik && sudo docker compose up -d", "Starting Traefik..."),
        ],
        starting_message: "Setting up Traefik...".to_string(),
        success_message: "Traefik setup successfully.".to_string(),
        failure_message: "There was a problem setting up Traefik".to_string(),
    }
}

/// Write the application's compose file on the server.
///
/// The service binds to loopback only; Traefik is the sole public entry
/// point. Dependency and volume sections render only when the context has
/// entries for them.
pub fn app_setup_step() -> Step {
    Step {
        commands: vec![
            Command::new(
                "cd ~ && mkdir -p applications/{{serviceName}}",
                "Preparing {{serviceName}}...",
            ),
            Command::new(
                r#"cd ~/applications/{{serviceName}} && tee docker-compose.yml <<EOF
services:
  {{serviceName}}:
    image: {{serviceName}}:latest
    container_name: {{serviceName}}
    restart: unless-stopped
    ports:
      - 127.0.0.1:{{port}}:{{port}}
    env_file:
      - {{envFile}}{{#if dependencies}}
    depends_on:{{#each dependencies}}
      - {{this}}{{/each}}{{/if}}{{#if mounts}}
    volumes:{{#each mounts}}
      - {{this}}{{/each}}{{/if}}
    networks:
      - applications
    labels:
      - traefik.enable=true
      - traefik.http.routers.{{serviceName}}.rule=Host("{{domain}}")
      - traefik.http.services.{{serviceName}}.loadbalancer.server.port={{port}}
      - traefik.http.routers.{{serviceName}}.tls=true
      - traefik.http.routers.{{serviceName}}.tls.certresolver=default
      - traefik.docker.network=applications

networks:
  applications:
    external: true
EOF"#,
                "Preparing {{serviceName}}...",
            ),
        ],
        starting_message: "Setting up your application...".to_string(),
        success_message: "Application setup successfully.".to_string(),
        failure_message: "There was a problem setting up your application".to_string(),
    }
}

/// Create the host-side directory for every configured mount. Built per
/// project since the command list depends on the mount set.
pub fn mount_dirs_step(mounts: &[Mount]) -> Step {
    let commands = mounts
        .iter()
        .map(|m| {
            Command::new(
                format!("mkdir -p {}", shell::quote_arg(&m.local)),
                format!("Creating mount folder {}...", m.local),
            )
        })
        .collect();

    Step {
        commands,
        starting_message: "Creating mount folders...".to_string(),
        success_message: "Mount folders created.".to_string(),
        failure_message: "There was a problem creating a mount folder on the server".to_string(),
    }
}

/// Load the uploaded image archive into the server's Docker daemon.
pub fn load_app_step() -> Step {
    Step {
        commands: vec![Command::new(
            "cd ~ && sudo docker load -i {{serviceName}}-latest.tar",
            "Loading {{serviceName}} image...",
        )],
        starting_message: "Loading your application image...".to_string(),
        success_message: "Application image loaded.".to_string(),
        failure_message: "There was a problem loading your application image".to_string(),
    }
}

/// Bring the application up with compose.
pub fn start_app_step() -> Step {
    Step {
        commands: vec![Command::new(
            "cd ~/applications/{{serviceName}} && sudo docker compose up -d",
            "Starting {{serviceName}}...",
        )],
        starting_message: "Starting your application...".to_string(),
        success_message: "Application started.".to_string(),
        failure_message: "There was a problem starting your application".to_string(),
    }
}

/// Remove the transferred archive and prune superseded image layers.
pub fn cleanup_app_step() -> Step {
    Step {
        commands: vec![
            Command::new(
                "cd ~ && rm -f {{serviceName}}-latest.tar",
                "Removing image archive...",
            ),
            Command::new("sudo docker image prune -f", "Pruning old images..."),
        ],
        starting_message: "Cleaning up...".to_string(),
        success_message: "Cleanup finished.".to_string(),
        failure_message: "There was a problem cleaning up after the deploy".to_string(),
    }
}

/// Build the application image from the working directory's Dockerfile
/// and save it as a transferable archive.
pub fn build_image_action() -> LocalAction {
    LocalAction::new(
        "docker build --cache-from={{serviceName}}:latest --tag {{serviceName}}:latest --platform linux/amd64 . && \
docker save -o {{serviceName}}-latest.tar {{serviceName}}",
        "Build Docker Image",
    )
}

/// Copy the saved image archive to the server over scp, addressed by the
/// SSH config alias so the operator's own client settings apply.
pub fn upload_image_action() -> LocalAction {
    LocalAction::new(
        "scp {{serviceName}}-latest.tar {{host}}:~/",
        "Upload Docker Image",
    )
}

/// Copy the local env file into the application directory on the server.
/// Paths come from the filesystem, not the context, so they are quoted
/// and baked in here.
pub fn upload_env_action(local_env_path: &str, env_file_name: &str) -> LocalAction {
    LocalAction::new(
        format!(
            "scp {} {{{{host}}}}:~/applications/{{{{serviceName}}}}/{}",
            shell::quote_arg(local_env_path),
            shell::quote_arg(env_file_name),
        ),
        "Upload env file",
    )
}
