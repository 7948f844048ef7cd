//! Configuration management for deploy-docs.
//!
//! This module handles loading and saving the settings that describe where
//! documentation gets published and how the SSH connection is made.
//!
//! # Configuration File Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/deploy-docs/config.yml`
//! - macOS: `~/Library/Application Support/deploy-docs/config.yml`
//! - Windows: `C:\Users\<User>\AppData\Roaming\deploy-docs\config.yml`
//!
//! # Example Configuration
//!
//! ```yaml
//! target:
//!   host: "docs.example.com"
//!   user: "deploy"
//!   port: 22
//!   private_key: "~/.ssh/id_ed25519"
//!   timeout: 60
//!   known_hosts: "~/.ssh/known_hosts"
//!   host_key_policy: strict
//! publish:
//!   archive: "~/docs.tar.gz"
//!   doc_root: "public_html/docs"
//!   archive_name: "docs.tar.gz"
//!   strategy: staged
//!   verify_upload: true
//!   remove_archive: true
//!   zone: "UTC"
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::deploy::DeployStrategy;
use crate::error::{Error, Result};
use crate::remote::HostKeyPolicy;

/// Default documentation host when neither the CLI nor the file names one.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Default SSH connection timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 60;

const DEFAULT_PRIVATE_KEY: &str = "~/.ssh/id_ed25519";
const DEFAULT_KNOWN_HOSTS: &str = "~/.ssh/known_hosts";
const DEFAULT_ARCHIVE: &str = "~/docs.tar.gz";
const DEFAULT_DOC_ROOT: &str = "public_html/docs";
const DEFAULT_ARCHIVE_NAME: &str = "docs.tar.gz";
const DEFAULT_ZONE: &str = "UTC";

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// The host receiving the documentation
    #[serde(default)]
    pub target: TargetConfig,

    /// What gets published and how
    #[serde(default)]
    pub publish: PublishConfig,
}

/// SSH settings for the documentation host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Hostname or IP address of the web host
    #[serde(default = "default_host")]
    pub host: String,

    /// SSH username (falls back to `$USER` when unset)
    #[serde(default)]
    pub user: Option<String>,

    /// SSH port (default: 22)
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Path to the SSH private key used for authentication
    #[serde(default = "default_private_key")]
    pub private_key: String,

    /// Connection timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// OpenSSH known_hosts file used to verify the server key
    #[serde(default = "default_known_hosts")]
    pub known_hosts: String,

    #[serde(default)]
    pub host_key_policy: HostKeyPolicy,
}

/// Settings for the archive and the remote documentation directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishConfig {
    /// Local path of the prebuilt archive
    #[serde(default = "default_archive")]
    pub archive: String,

    /// Remote documentation directory, relative to the login directory
    /// unless absolute
    #[serde(default = "default_doc_root")]
    pub doc_root: String,

    /// File name the archive is given on the remote side
    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    #[serde(default)]
    pub strategy: DeployStrategy,

    /// Compare remote and local SHA-256 before extracting
    #[serde(default = "default_true")]
    pub verify_upload: bool,

    /// Delete the uploaded archive once it has been extracted
    #[serde(default = "default_true")]
    pub remove_archive: bool,

    /// Time zone used to label deployment runs
    #[serde(default = "default_zone")]
    pub zone: String,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_private_key() -> String {
    DEFAULT_PRIVATE_KEY.to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_known_hosts() -> String {
    DEFAULT_KNOWN_HOSTS.to_string()
}

fn default_archive() -> String {
    DEFAULT_ARCHIVE.to_string()
}

fn default_doc_root() -> String {
    DEFAULT_DOC_ROOT.to_string()
}

fn default_archive_name() -> String {
    DEFAULT_ARCHIVE_NAME.to_string()
}

fn default_zone() -> String {
    DEFAULT_ZONE.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            user: None,
            port: DEFAULT_SSH_PORT,
            private_key: default_private_key(),
            timeout: DEFAULT_TIMEOUT,
            known_hosts: default_known_hosts(),
            host_key_policy: HostKeyPolicy::default(),
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            archive: default_archive(),
            doc_root: default_doc_root(),
            archive_name: default_archive_name(),
            strategy: DeployStrategy::default(),
            verify_upload: true,
            remove_archive: true,
            zone: default_zone(),
        }
    }
}

impl Config {
    /// Returns the default configuration file path for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("deploy-docs").join("config.yml"))
    }

    /// Loads configuration from the default location.
    ///
    /// Returns `Ok(Config::default())` if no config file exists.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Loads configuration from a specific file path.
    ///
    /// Returns `Ok(Config::default())` if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read config file: {}\n\n\
                     File path: {}\n\n\
                     Suggestions:\n\
                     • Check file permissions: ls -la {}\n\
                     • Try recreating with: deploy-docs config init --force",
                    e,
                    path.display(),
                    path.display()
                ),
            ))
        })?;

        Self::from_yaml(&contents).map_err(|e| {
            Error::Config(format!(
                "{}\n\n\
                 File path: {}\n\n\
                 Suggestions:\n\
                 • Check YAML syntax in the config file\n\
                 • Verify indentation uses spaces, not tabs\n\
                 • Backup and recreate: mv {} {}.bak && deploy-docs config init",
                e,
                path.display(),
                path.display(),
                path.display()
            ))
        })
    }

    /// Parses a configuration document, filling in defaults for anything
    /// the document leaves out.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(contents)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Saves configuration to the default location.
    pub fn save(&self) -> Result<()> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine config directory\n\n\
                 Suggestions:\n\
                 • Check HOME environment variable is set\n\
                 • Verify XDG_CONFIG_HOME is accessible",
            ))),
        }
    }

    /// Saves configuration to a specific file path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create config directory: {}\n\n\
                         Directory: {}",
                        e,
                        parent.display()
                    ),
                ))
            })?;
        }

        let contents = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to write config file: {}\n\nFile path: {}",
                    e,
                    path.display()
                ),
            ))
        })?;

        Ok(())
    }
}

impl TargetConfig {
    /// Builder method to set the host.
    pub fn with_host(mut self, host: String) -> Self {
        self.host = host;
        self
    }

    /// Builder method to set the SSH user.
    pub fn with_user(mut self, user: String) -> Self {
        self.user = Some(user);
        self
    }

    /// Builder method to set the SSH port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to set the private key path.
    pub fn with_private_key(mut self, key_path: String) -> Self {
        self.private_key = key_path;
        self
    }

    /// Returns the configured user, or the login name of the current user.
    pub fn resolved_user(&self) -> Option<String> {
        self.user
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .or_else(|| std::env::var("USERNAME").ok())
            .filter(|u| !u.is_empty())
    }

    /// Returns the SSH connection string (user@host:port).
    pub fn connection_string(&self) -> String {
        let user = self.resolved_user().unwrap_or_else(|| "?".to_string());
        if self.port == DEFAULT_SSH_PORT {
            format!("{}@{}", user, self.host)
        } else {
            format!("{}@{}:{}", user, self.host, self.port)
        }
    }
}

/// Expands a leading `~/` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
