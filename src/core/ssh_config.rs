//! Host resolution from the conventional SSH client configuration.
//!
//! Skiff does not manage credentials itself; every target must be a host
//! entry in `~/.ssh/config` with a `HostName`, `User`, and `IdentityFile`.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Connection identity looked up for one host alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHost {
    pub host_name: String,
    pub user: String,
    /// Tilde-expanded absolute path.
    pub identity_file: String,
}

pub fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_default();
    PathBuf::from(home).join(".ssh").join("config")
}

/// Read the SSH config file contents.
pub fn read_config(path: &std::path::Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Error::internal_io(
            format!(
                "There was a problem opening the SSH config file '{}': {}",
                path.display(),
                e
            ),
            Some("read ssh config".to_string()),
        )
    })
}

/// List all concrete host aliases in an SSH config, sorted and
/// deduplicated. Wildcard patterns are skipped.
pub fn list_hosts(config_text: &str) -> Vec<String> {
    let mut hosts = Vec::new();

    for line in config_text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let keyword = parts.next().unwrap_or_default();
        if !keyword.eq_ignore_ascii_case("host") {
            continue;
        }

        for pattern in parts {
            if pattern.contains('*') || pattern.contains('?') {
                continue;
            }
            if !hosts.iter().any(|h| h == pattern) {
                hosts.push(pattern.to_string());
            }
        }
    }

    hosts.sort();
    hosts
}

/// Resolve one host alias to its connection identity.
///
/// Fails distinctly when the alias is absent and for each missing
/// required field.
pub fn resolve_host(config_text: &str, host_key: &str) -> Result<ResolvedHost> {
    let mut in_block = false;
    let mut found = false;
    let mut host_name = String::new();
    let mut user = String::new();
    let mut identity_file = String::new();

    for line in config_text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut parts = line.split_whitespace();
        let keyword = parts.next().unwrap_or_default().to_ascii_lowercase();
        let values: Vec<&str> = parts.collect();

        if keyword == "host" {
            in_block = values.iter().any(|p| *p == host_key);
            if in_block {
                found = true;
            }
            continue;
        }

        if !in_block {
            continue;
        }

        // Only the fields we consume are parsed. Other client options may
        // legitimately take several values (ProxyCommand, SendEnv,
        // LocalForward) and are skipped wholesale.
        if !matches!(keyword.as_str(), "hostname" | "user" | "identityfile") {
            continue;
        }

        let value = match values.as_slice() {
            [v] => *v,
            _ => {
                return Err(Error::ssh_config_invalid(format!(
                    "Invalid line in SSH config file: '{}'",
                    line
                )));
            }
        };

        // First match wins, matching ssh's own precedence.
        match keyword.as_str() {
            "hostname" if host_name.is_empty() => host_name = value.to_string(),
            "user" if user.is_empty() => user = value.to_string(),
            "identityfile" if identity_file.is_empty() => {
                identity_file = shellexpand::tilde(value).to_string();
            }
            _ => {}
        }
    }

    if !found {
        return Err(Error::ssh_host_not_found(host_key)
            .with_hint("Run 'skiff hosts' to list configured hosts"));
    }

    if host_name.is_empty() {
        return Err(Error::ssh_missing_field(host_key, "HostName"));
    }
    if user.is_empty() {
        return Err(Error::ssh_missing_field(host_key, "User"));
    }
    if identity_file.is_empty() {
        return Err(Error::ssh_missing_field(host_key, "IdentityFile"));
    }

    Ok(ResolvedHost {
        host_name,
        user,
        identity_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    const CONFIG: &str = "\
# personal hosts
Host web1
    HostName 203.0.113.7
    User deploy
    IdentityFile /keys/web1

Host staging prod
    HostName 203.0.113.9
    User root
    IdentityFile /keys/shared

Host *
    ServerAliveInterval 30
";

    #[test]
    fn resolves_full_entry() {
        let resolved = resolve_host(CONFIG, "web1").unwrap();
        assert_eq!(resolved.host_name, "203.0.113.7");
        assert_eq!(resolved.user, "deploy");
        assert_eq!(resolved.identity_file, "/keys/web1");
    }

    #[test]
    fn resolves_entry_with_multiple_patterns() {
        let resolved = resolve_host(CONFIG, "prod").unwrap();
        assert_eq!(resolved.host_name, "203.0.113.9");
    }

    #[test]
    fn unknown_host_is_distinct_error() {
        let err = resolve_host(CONFIG, "nope").unwrap_err();
        assert_eq!(err.code, ErrorCode::SshHostNotFound);
    }

    #[test]
    fn missing_fields_are_reported_by_name() {
        let config = "Host bare\n    HostName 203.0.113.2\n";
        let err = resolve_host(config, "bare").unwrap_err();
        assert_eq!(err.code, ErrorCode::SshConfigInvalid);
        assert!(err.message.contains("User"));

        let config = "Host bare\n    User root\n    IdentityFile /k\n";
        let err = resolve_host(config, "bare").unwrap_err();
        assert!(err.message.contains("HostName"));
    }

    #[test]
    fn multi_value_client_options_are_ignored() {
        let config = "\
Host web1
    HostName 203.0.113.7
    ProxyCommand ssh -W %h:%p jump
    SendEnv LANG LC_ALL
    LocalForward 8080 localhost:80
    User deploy
    IdentityFile /keys/web1
";
        let resolved = resolve_host(config, "web1").unwrap();
        assert_eq!(resolved.host_name, "203.0.113.7");
        assert_eq!(resolved.user, "deploy");
        assert_eq!(resolved.identity_file, "/keys/web1");
    }

    #[test]
    fn malformed_line_is_config_error() {
        let config = "Host bad\n    HostName 203.0.113.2 extra junk\n";
        let err = resolve_host(config, "bad").unwrap_err();
        assert_eq!(err.code, ErrorCode::SshConfigInvalid);
        assert!(err.message.contains("Invalid line"));
    }

    #[test]
    fn identity_file_tilde_is_expanded() {
        let config = "Host t\n    HostName h\n    User u\n    IdentityFile ~/.ssh/id\n";
        let resolved = resolve_host(config, "t").unwrap();
        assert!(!resolved.identity_file.starts_with('~'));
        assert!(resolved.identity_file.ends_with(".ssh/id"));
    }

    #[test]
    fn list_hosts_sorted_dedup_no_wildcards() {
        let hosts = list_hosts(CONFIG);
        assert_eq!(hosts, vec!["prod", "staging", "web1"]);
    }

    #[test]
    fn list_hosts_skips_comments_and_options() {
        let hosts = list_hosts("# Host commented\nHost real\n  HostName x\n");
        assert_eq!(hosts, vec!["real"]);
    }

    #[test]
    fn read_config_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_config(&dir.path().join("config")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InternalIoError);
    }
}
