//! What a deployment run does, step by step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{expand_path, PublishConfig};
use crate::error::{Error, Result};
use crate::remote::shell::{bash, remote_join, shell_escape};

/// Order in which the live documentation directory is replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeployStrategy {
    /// Upload, verify and extract into a staging directory, then swap it
    /// into place. The live directory is untouched until everything
    /// before the swap has succeeded.
    #[default]
    Staged,
    /// Empty the live directory, then upload and extract into it. A
    /// failed upload or extract leaves the site empty.
    InPlace,
}

impl fmt::Display for DeployStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeployStrategy::Staged => write!(f, "staged"),
            DeployStrategy::InPlace => write!(f, "in-place"),
        }
    }
}

/// One unit of work in a run. Every step is fatal on error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeployStep {
    Authenticate,
    Connect,
    Clean,
    Upload,
    Verify,
    Extract,
    RemoveArchive,
    Publish,
}

impl DeployStep {
    /// State reached once this step has succeeded.
    pub fn completed_state(self) -> DeployState {
        match self {
            DeployStep::Authenticate => DeployState::Authenticated,
            DeployStep::Connect => DeployState::Connected,
            DeployStep::Clean => DeployState::Cleaned,
            DeployStep::Upload => DeployState::Uploaded,
            DeployStep::Verify => DeployState::Verified,
            DeployStep::Extract => DeployState::Extracted,
            DeployStep::RemoveArchive => DeployState::ArchiveRemoved,
            DeployStep::Publish => DeployState::Published,
        }
    }

    /// Human-readable progress line.
    pub fn description(self) -> &'static str {
        match self {
            DeployStep::Authenticate => "Initialize ssh key-auth",
            DeployStep::Connect => "ssh into remote webhost",
            DeployStep::Clean => "Remove old documentation files",
            DeployStep::Upload => "Copy documentation archive to remote host",
            DeployStep::Verify => "Verify uploaded archive checksum",
            DeployStep::Extract => "Extract documentation archive",
            DeployStep::RemoveArchive => "Remove uploaded archive",
            DeployStep::Publish => "Swap new documentation into place",
        }
    }
}

impl fmt::Display for DeployStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeployStep::Authenticate => "authenticate",
            DeployStep::Connect => "connect",
            DeployStep::Clean => "clean",
            DeployStep::Upload => "upload",
            DeployStep::Verify => "verify",
            DeployStep::Extract => "extract",
            DeployStep::RemoveArchive => "remove-archive",
            DeployStep::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// Position of a run in the deployment state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployState {
    Init,
    Authenticated,
    Connected,
    Cleaned,
    Uploaded,
    Verified,
    Extracted,
    ArchiveRemoved,
    Published,
    Done,
    Failed(DeployStep),
}

impl DeployState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeployState::Done | DeployState::Failed(_))
    }
}

/// Fixed inputs of one run: which archive goes where, and how.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployPlan {
    local_archive: PathBuf,
    doc_root: String,
    archive_name: String,
    strategy: DeployStrategy,
    verify_upload: bool,
    remove_archive: bool,
}

impl DeployPlan {
    /// Creates a staged plan that verifies and removes the uploaded archive.
    ///
    /// `doc_root` is relative to the remote login directory unless it is
    /// absolute; a leading `~/` is accepted and dropped. Roots that would
    /// point the clean step at the home or filesystem root are rejected.
    pub fn new(local_archive: impl Into<PathBuf>, doc_root: &str) -> Result<Self> {
        let doc_root = normalize_doc_root(doc_root)?;
        let local_archive = local_archive.into();
        let archive_name = local_archive
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "archive path {} has no file name",
                    local_archive.display()
                ))
            })?;

        Ok(Self {
            local_archive,
            doc_root,
            archive_name,
            strategy: DeployStrategy::default(),
            verify_upload: true,
            remove_archive: true,
        })
    }

    /// Builds a plan from the `publish:` section of the configuration.
    pub fn from_config(config: &PublishConfig) -> Result<Self> {
        Ok(Self::new(expand_path(&config.archive), &config.doc_root)?
            .with_archive_name(&config.archive_name)?
            .with_strategy(config.strategy)
            .with_verify_upload(config.verify_upload)
            .with_remove_archive(config.remove_archive))
    }

    /// Sets the file name the archive is given on the remote side.
    pub fn with_archive_name(mut self, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return Err(Error::Config(format!(
                "invalid remote archive name '{}'",
                name
            )));
        }
        self.archive_name = name.to_string();
        Ok(self)
    }

    pub fn with_strategy(mut self, strategy: DeployStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_verify_upload(mut self, verify: bool) -> Self {
        self.verify_upload = verify;
        self
    }

    pub fn with_remove_archive(mut self, remove: bool) -> Self {
        self.remove_archive = remove;
        self
    }

    pub fn local_archive(&self) -> &Path {
        &self.local_archive
    }

    pub fn doc_root(&self) -> &str {
        &self.doc_root
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    pub fn strategy(&self) -> DeployStrategy {
        self.strategy
    }

    /// All steps of the run, in execution order.
    pub fn steps(&self) -> Vec<DeployStep> {
        let mut steps = vec![DeployStep::Authenticate, DeployStep::Connect];
        steps.extend(self.remote_steps());
        steps
    }

    /// Steps that run over the open session.
    pub fn remote_steps(&self) -> Vec<DeployStep> {
        let mut steps = Vec::new();
        if self.strategy == DeployStrategy::InPlace {
            steps.push(DeployStep::Clean);
        }
        steps.push(DeployStep::Upload);
        if self.verify_upload {
            steps.push(DeployStep::Verify);
        }
        steps.push(DeployStep::Extract);
        if self.remove_archive {
            steps.push(DeployStep::RemoveArchive);
        }
        if self.strategy == DeployStrategy::Staged {
            steps.push(DeployStep::Publish);
        }
        steps
    }

    /// Directory the archive is uploaded to and extracted in.
    pub fn work_dir(&self) -> String {
        match self.strategy {
            DeployStrategy::Staged => self.staging_dir(),
            DeployStrategy::InPlace => self.doc_root.clone(),
        }
    }

    pub fn staging_dir(&self) -> String {
        format!("{}.staging", self.doc_root)
    }

    pub fn previous_dir(&self) -> String {
        format!("{}.previous", self.doc_root)
    }

    /// Remote path of the uploaded archive.
    pub fn remote_archive_path(&self) -> String {
        remote_join(&self.work_dir(), &self.archive_name)
    }

    /// Empties the live documentation directory, hidden files included.
    pub fn clean_command(&self) -> String {
        let root = shell_escape(&self.doc_root);
        bash(&format!("mkdir -p {root} && find {root} -mindepth 1 -delete"))
    }

    /// Creates an empty staging directory next to the live one.
    pub fn prepare_staging_command(&self) -> String {
        let staging = shell_escape(&self.staging_dir());
        bash(&format!("rm -rf {staging} && mkdir -p {staging}"))
    }

    pub fn extract_command(&self) -> String {
        bash(&format!(
            "cd {} && tar xzf {}",
            shell_escape(&self.work_dir()),
            shell_escape(&self.archive_name)
        ))
    }

    pub fn remove_archive_command(&self) -> String {
        bash(&format!("rm -f {}", shell_escape(&self.remote_archive_path())))
    }

    /// Moves the staging directory over the live one.
    pub fn publish_command(&self) -> String {
        let root = shell_escape(&self.doc_root);
        let staging = shell_escape(&self.staging_dir());
        let previous = shell_escape(&self.previous_dir());
        bash(&format!(
            "set -e; rm -rf {previous}; \
             if [ -e {root} ]; then mv {root} {previous}; fi; \
             mv {staging} {root}; rm -rf {previous}"
        ))
    }
}

fn normalize_doc_root(doc_root: &str) -> Result<String> {
    let refuse = || {
        Error::Config(format!(
            "refusing to use '{}' as the documentation root",
            doc_root
        ))
    };

    let trimmed = doc_root.trim();
    let relative = trimmed.strip_prefix("~/").unwrap_or(trimmed);
    let absolute = relative.starts_with('/');

    // Empty and `.` segments never move the path away from its base.
    let segments: Vec<&str> = relative
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect();

    if segments.is_empty()
        || segments.contains(&"..")
        || (!absolute && segments.first() == Some(&"~"))
    {
        return Err(refuse());
    }

    let joined = segments.join("/");
    Ok(if absolute { format!("/{}", joined) } else { joined })
}
