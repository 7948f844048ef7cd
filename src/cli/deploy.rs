//! CLI command that publishes a documentation archive to the web host.

use anyhow::{Context, Result};
use clap::Args;
use log::info;
use std::path::PathBuf;

use deploy_docs::archive::{create_archive, run_build};
use deploy_docs::config::{expand_path, Config};
use deploy_docs::deploy::{DeployPlan, DeployStep, DeployStrategy, Sequencer};
use deploy_docs::remote::{diagnose_ssh_error, DeploymentTarget, HostKeyPolicy, Ssh2Provider};
use deploy_docs::timestamp;

/// Environment variable holding the passphrase of an encrypted key.
pub const PASSPHRASE_ENV: &str = "DEPLOY_DOCS_KEY_PASSPHRASE";

#[derive(Args, Default)]
#[command(about = "Publish a documentation archive to the web host")]
pub struct DeployCommand {
    /// Web host to publish to (default: config file, then 127.0.0.1)
    #[arg(long)]
    pub dochost: Option<String>,

    /// SSH username (default: config file, then $USER)
    #[arg(long)]
    pub user: Option<String>,

    /// SSH port
    #[arg(long)]
    pub port: Option<u16>,

    /// Path to the SSH private key
    #[arg(long)]
    pub key: Option<String>,

    /// known_hosts file used to verify the host key
    #[arg(long)]
    pub known_hosts: Option<String>,

    /// Trust and record the host key if the host is not yet known
    #[arg(long)]
    pub accept_new_host_key: bool,

    /// Local documentation archive (.tar.gz)
    #[arg(long)]
    pub archive: Option<String>,

    /// Documentation directory on the web host
    #[arg(long)]
    pub doc_root: Option<String>,

    /// Empty the live directory before uploading instead of staging
    #[arg(long)]
    pub in_place: bool,

    /// Skip the checksum comparison after upload
    #[arg(long)]
    pub no_verify: bool,

    /// Leave the uploaded archive on the web host
    #[arg(long)]
    pub keep_archive: bool,

    /// Built HTML directory to pack into the archive before deploying
    #[arg(long)]
    pub html_dir: Option<PathBuf>,

    /// Command that builds the HTML (e.g. "make html")
    #[arg(long, requires = "html_dir")]
    pub build_cmd: Option<String>,

    /// Directory the build command runs in
    #[arg(long, default_value = ".")]
    pub build_dir: PathBuf,

    /// Time zone used to label the run
    #[arg(long)]
    pub zone: Option<String>,

    /// Configuration file (default: platform config directory)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl DeployCommand {
    pub fn execute(&self) -> Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        let config = self.apply_overrides(config);

        let started_at = timestamp::localize("now", &config.publish.zone)
            .context("Invalid time zone for labeling the deployment")?;
        info!("Deployment started at {}", started_at);

        if let Some(html_dir) = &self.html_dir {
            if let Some(cmd) = &self.build_cmd {
                run_build(cmd, &self.build_dir).context("Documentation build failed")?;
            }
            create_archive(html_dir, &expand_path(&config.publish.archive))
                .context("Failed to package documentation")?;
        }

        let target = DeploymentTarget::from_config(&config.target)?;
        let plan = DeployPlan::from_config(&config.publish)?;
        let passphrase = std::env::var(PASSPHRASE_ENV).ok();

        let provider = Ssh2Provider::new();
        let mut sequencer = Sequencer::new(&provider, &target, &plan).with_passphrase(passphrase);

        match sequencer.run() {
            Ok(report) => {
                println!(
                    "Published {} to {}:{} ({} bytes, {} strategy)",
                    plan.local_archive().display(),
                    report.target,
                    plan.doc_root(),
                    report.bytes_uploaded,
                    report.strategy
                );
                if let Some(sha) = &report.archive_sha256 {
                    println!("SHA-256: {}", sha);
                }
                Ok(())
            }
            Err(failure) => {
                if matches!(failure.step, DeployStep::Authenticate | DeployStep::Connect) {
                    eprintln!(
                        "{}",
                        diagnose_ssh_error(
                            &failure.error,
                            target.host(),
                            target.port(),
                            Some(&config.target.private_key)
                        )
                    );
                }
                Err(failure.into())
            }
        }
    }

    /// Layers command-line flags over the loaded configuration.
    pub fn apply_overrides(&self, mut config: Config) -> Config {
        if let Some(host) = &self.dochost {
            config.target.host = host.clone();
        }
        if let Some(user) = &self.user {
            config.target.user = Some(user.clone());
        }
        if let Some(port) = self.port {
            config.target.port = port;
        }
        if let Some(key) = &self.key {
            config.target.private_key = key.clone();
        }
        if let Some(known_hosts) = &self.known_hosts {
            config.target.known_hosts = known_hosts.clone();
        }
        if self.accept_new_host_key {
            config.target.host_key_policy = HostKeyPolicy::AcceptNew;
        }
        if let Some(archive) = &self.archive {
            config.publish.archive = archive.clone();
        }
        if let Some(doc_root) = &self.doc_root {
            config.publish.doc_root = doc_root.clone();
        }
        if self.in_place {
            config.publish.strategy = DeployStrategy::InPlace;
        }
        if self.no_verify {
            config.publish.verify_upload = false;
        }
        if self.keep_archive {
            config.publish.remove_archive = false;
        }
        if let Some(zone) = &self.zone {
            config.publish.zone = zone.clone();
        }
        config
    }
}
