//! The host a documentation run publishes to.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{expand_path, TargetConfig, DEFAULT_SSH_PORT, DEFAULT_TIMEOUT};
use crate::error::{Error, Result};

/// How the server's host key is checked against known_hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostKeyPolicy {
    /// The host must already be listed with a matching key.
    #[default]
    Strict,
    /// Unknown hosts are recorded on first contact; a changed key still fails.
    AcceptNew,
}

/// Immutable description of one deployment destination.
///
/// Built once before the run starts and shared read-only with the session
/// provider. `host` and `private_key` are never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentTarget {
    host: String,
    user: String,
    port: u16,
    private_key: PathBuf,
    timeout: Duration,
    known_hosts: PathBuf,
    host_key_policy: HostKeyPolicy,
}

impl DeploymentTarget {
    /// Creates a target with default port, timeout and host key settings.
    pub fn new(host: &str, user: &str, private_key: impl Into<PathBuf>) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::Config("target host must not be empty".to_string()));
        }
        if user.trim().is_empty() {
            return Err(Error::Config("target user must not be empty".to_string()));
        }
        let private_key = private_key.into();
        if private_key.as_os_str().is_empty() {
            return Err(Error::Config(
                "private key path must not be empty".to_string(),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            user: user.trim().to_string(),
            port: DEFAULT_SSH_PORT,
            private_key,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT),
            known_hosts: expand_path("~/.ssh/known_hosts"),
            host_key_policy: HostKeyPolicy::default(),
        })
    }

    /// Builds a target from the `target:` section of the configuration.
    pub fn from_config(config: &TargetConfig) -> Result<Self> {
        let user = config.resolved_user().ok_or_else(|| {
            Error::Config(
                "no SSH user configured and $USER is not set; pass --user".to_string(),
            )
        })?;

        if config.timeout == 0 {
            return Err(Error::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(Self::new(&config.host, &user, expand_path(&config.private_key))?
            .with_port(config.port)
            .with_timeout(Duration::from_secs(config.timeout))
            .with_known_hosts(expand_path(&config.known_hosts))
            .with_host_key_policy(config.host_key_policy))
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_known_hosts(mut self, path: PathBuf) -> Self {
        self.known_hosts = path;
        self
    }

    pub fn with_host_key_policy(mut self, policy: HostKeyPolicy) -> Self {
        self.host_key_policy = policy;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn private_key(&self) -> &Path {
        &self.private_key
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn known_hosts(&self) -> &Path {
        &self.known_hosts
    }

    pub fn host_key_policy(&self) -> HostKeyPolicy {
        self.host_key_policy
    }

    /// Returns the SSH connection string (user@host:port).
    pub fn connection_string(&self) -> String {
        if self.port == DEFAULT_SSH_PORT {
            format!("{}@{}", self.user, self.host)
        } else {
            format!("{}@{}:{}", self.user, self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_empty_fields() {
        assert!(matches!(
            DeploymentTarget::new("", "user", "/key"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DeploymentTarget::new("   ", "user", "/key"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DeploymentTarget::new("host", "", "/key"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DeploymentTarget::new("host", "user", ""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_defaults() {
        let target = DeploymentTarget::new("docs.example.com", "deploy", "/k").unwrap();
        assert_eq!(target.port(), 22);
        assert_eq!(target.timeout(), Duration::from_secs(60));
        assert_eq!(target.host_key_policy(), HostKeyPolicy::Strict);
        assert_eq!(target.connection_string(), "deploy@docs.example.com");
    }

    #[test]
    fn test_from_config() {
        let config = TargetConfig::default()
            .with_host("web.example.org".to_string())
            .with_user("docs".to_string())
            .with_port(2200)
            .with_private_key("/keys/id_ed25519".to_string());

        let target = DeploymentTarget::from_config(&config).unwrap();
        assert_eq!(target.host(), "web.example.org");
        assert_eq!(target.user(), "docs");
        assert_eq!(target.private_key(), Path::new("/keys/id_ed25519"));
        assert_eq!(target.connection_string(), "docs@web.example.org:2200");
    }

    #[test]
    fn test_from_config_rejects_zero_timeout() {
        let mut config = TargetConfig::default().with_user("docs".to_string());
        config.timeout = 0;
        assert!(matches!(
            DeploymentTarget::from_config(&config),
            Err(Error::Config(_))
        ));

        config.timeout = 1;
        let target = DeploymentTarget::from_config(&config).unwrap();
        assert_eq!(target.timeout(), Duration::from_secs(1));
    }
}
