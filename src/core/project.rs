//! Persisted project state.
//!
//! One deployable service per project, stored as a flat YAML record
//! (`skiff.yaml`) in the project directory. The version counter is the
//! single source of truth for how many times the service has been
//! deployed; it only moves forward, and only after a fully successful
//! pipeline run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const PROJECT_FILE_NAME: &str = "skiff.yaml";

/// A host-path to container-path volume mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mount {
    pub local: String,
    pub remote: String,
}

impl Mount {
    /// Parse a `local:remote` pair as given on the command line.
    pub fn parse(spec: &str) -> Result<Self> {
        match spec.split_once(':') {
            Some((local, remote)) if !local.is_empty() && !remote.is_empty() => Ok(Self {
                local: local.to_string(),
                remote: remote.to_string(),
            }),
            _ => Err(Error::validation_invalid_argument(
                "mount",
                format!("Mount '{}' must be in 'local:remote' form", spec),
            )),
        }
    }
}

impl std::fmt::Display for Mount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.local, self.remote)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectState {
    #[serde(default)]
    pub service_name: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub env_file: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub mounts: Vec<Mount>,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub cert_email: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub last_deploy: String,
}

/// Load/save access to the project state file.
pub struct ProjectStore {
    path: PathBuf,
}

impl ProjectStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(PROJECT_FILE_NAME),
        }
    }

    /// Store rooted at the current working directory.
    pub fn current_dir() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::internal_io(e.to_string(), Some("resolve cwd".to_string())))?;
        Ok(Self::new(&cwd))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> Result<ProjectState> {
        let raw = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::project_not_found(&self.path.to_string_lossy())
                    .with_hint("Run 'skiff prepare' to set up a project first")
            } else {
                Error::internal_io(e.to_string(), Some(format!("read {}", self.path.display())))
            }
        })?;

        serde_yml::from_str(&raw).map_err(|e| {
            Error::internal_yaml(
                format!("There was a problem decoding the project file: {}", e),
                Some(self.path.to_string_lossy().to_string()),
            )
        })
    }

    pub fn save(&self, state: &ProjectState) -> Result<()> {
        let out = serde_yml::to_string(state).map_err(|e| {
            Error::internal_yaml(
                format!("There was an error converting project settings to YAML: {}", e),
                None,
            )
        })?;

        std::fs::write(&self.path, out).map_err(|e| {
            Error::internal_io(
                e.to_string(),
                Some(format!("write {}", self.path.display())),
            )
        })
    }

    /// Persist the initial state after a successful prepare pipeline.
    ///
    /// The remote host is already set up by the time this runs, so a
    /// persistence failure is a state-commit condition, not a plain I/O
    /// error.
    pub fn commit_prepare(&self, state: &ProjectState) -> Result<()> {
        self.save(state).map_err(|e| {
            Error::state_commit(format!(
                "Your server was prepared, but the project file could not be written: {}",
                e.message
            ))
        })
    }

    /// Record a successful deploy: bump the version by exactly one, stamp
    /// the commit time, and persist.
    ///
    /// Failures map to the state-commit error class: the remote system has
    /// already changed even though local bookkeeping is out of sync.
    pub fn commit_deploy(&self, state: &mut ProjectState) -> Result<()> {
        state.version += 1;
        state.last_deploy = chrono::Utc::now().to_rfc3339();

        self.save(state).map_err(|e| {
            Error::state_commit(format!(
                "Your application was deployed, but there was a problem updating the project file: {}",
                e.message
            ))
        })
    }
}
