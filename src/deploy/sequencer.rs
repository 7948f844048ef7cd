//! Runs a [`DeployPlan`] against a remote host.
//!
//! The sequencer is a strictly ordered state machine. Each step runs once,
//! in plan order, and the first failure ends the run: no later step is
//! attempted and nothing is retried. Once a session has been opened it is
//! closed exactly once, whether the run succeeds or fails.

use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::archive::ArchiveInfo;
use crate::deploy::plan::{DeployPlan, DeployState, DeployStep, DeployStrategy};
use crate::error::{Error, Result};
use crate::remote::{
    verify_remote_file, DeploymentTarget, ExecutionResult, RemoteSession, SessionGuard,
    SessionProvider, VerificationResult,
};

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployReport {
    /// `user@host:port` the documentation was published to
    pub target: String,
    pub strategy: DeployStrategy,
    pub steps_completed: Vec<DeployStep>,
    pub bytes_uploaded: u64,
    pub archive_sha256: Option<String>,
    pub elapsed: Duration,
}

/// The step that stopped a run, and why.
#[derive(Error, Debug)]
#[error("step '{step}' failed: {error}")]
pub struct DeployFailure {
    pub step: DeployStep,
    #[source]
    pub error: Error,
    /// Steps that had succeeded before `step` was attempted
    pub completed: Vec<DeployStep>,
}

#[derive(Default)]
struct RunContext {
    archive: Option<ArchiveInfo>,
    bytes_uploaded: u64,
}

/// Drives one deployment run over sessions opened by `P`.
pub struct Sequencer<'a, P: SessionProvider> {
    provider: &'a P,
    target: &'a DeploymentTarget,
    plan: &'a DeployPlan,
    passphrase: Option<String>,
    state: DeployState,
    completed: Vec<DeployStep>,
}

impl<'a, P: SessionProvider> Sequencer<'a, P> {
    pub fn new(provider: &'a P, target: &'a DeploymentTarget, plan: &'a DeployPlan) -> Self {
        Self {
            provider,
            target,
            plan,
            passphrase: None,
            state: DeployState::Init,
            completed: Vec::new(),
        }
    }

    /// Passphrase for an encrypted private key.
    pub fn with_passphrase(mut self, passphrase: Option<String>) -> Self {
        self.passphrase = passphrase;
        self
    }

    pub fn state(&self) -> DeployState {
        self.state
    }

    pub fn completed(&self) -> &[DeployStep] {
        &self.completed
    }

    /// Runs every step of the plan. A sequencer runs at most once.
    pub fn run(&mut self) -> std::result::Result<DeployReport, DeployFailure> {
        if self.state != DeployState::Init {
            return Err(DeployFailure {
                step: DeployStep::Authenticate,
                error: Error::Config(format!("deployment already ran ({:?})", self.state)),
                completed: self.completed.clone(),
            });
        }

        let started = Instant::now();
        info!(
            "Deploying {} to {}:{} ({} strategy)",
            self.plan.local_archive().display(),
            self.target.connection_string(),
            self.plan.doc_root(),
            self.plan.strategy()
        );

        info!("{}", DeployStep::Authenticate.description());
        let key: PathBuf = self.target.private_key().to_path_buf();
        let credential = self
            .provider
            .authenticate(&key, self.passphrase.as_deref());
        let credential = self.record(DeployStep::Authenticate, credential)?;

        info!("{}", DeployStep::Connect.description());
        let session = self.provider.connect(self.target, &credential);
        let session = self.record(DeployStep::Connect, session)?;

        // Dropping the guard on an early return closes the session.
        let mut guard = SessionGuard::new(session, self.target.connection_string());
        let mut context = RunContext::default();

        for step in self.plan.remote_steps() {
            info!("{}", step.description());
            let outcome = match guard.session() {
                Ok(session) => self.execute(step, session, &mut context),
                Err(e) => Err(e),
            };
            self.record(step, outcome)?;
        }

        if let Err(e) = guard.close() {
            warn!(
                "Deployment succeeded but closing the session failed: {}",
                e
            );
        }

        self.state = DeployState::Done;
        let report = DeployReport {
            target: self.target.connection_string(),
            strategy: self.plan.strategy(),
            steps_completed: self.completed.clone(),
            bytes_uploaded: context.bytes_uploaded,
            archive_sha256: context.archive.map(|a| a.sha256),
            elapsed: started.elapsed(),
        };
        info!(
            "Deployment complete: {} steps in {:.2?}",
            report.steps_completed.len(),
            report.elapsed
        );
        Ok(report)
    }

    fn record<T>(&mut self, step: DeployStep, outcome: Result<T>) -> std::result::Result<T, DeployFailure> {
        match outcome {
            Ok(value) => {
                self.state = step.completed_state();
                self.completed.push(step);
                debug!("Step '{}' complete, state {:?}", step, self.state);
                Ok(value)
            }
            Err(error) => {
                self.state = DeployState::Failed(step);
                Err(DeployFailure {
                    step,
                    error,
                    completed: self.completed.clone(),
                })
            }
        }
    }

    fn execute<S: RemoteSession>(
        &self,
        step: DeployStep,
        session: &mut S,
        context: &mut RunContext,
    ) -> Result<()> {
        match step {
            // Both run before a session exists
            DeployStep::Authenticate | DeployStep::Connect => Ok(()),
            DeployStep::Clean => run_checked(session, &self.plan.clean_command()).map(|_| ()),
            DeployStep::Upload => {
                let archive = ArchiveInfo::inspect(self.plan.local_archive())?;
                if self.plan.strategy() == DeployStrategy::Staged {
                    run_checked(session, &self.plan.prepare_staging_command())?;
                }

                let remote_path = self.plan.remote_archive_path();
                debug!(
                    "Uploading {} ({} bytes) to {}",
                    archive.path.display(),
                    archive.size_bytes,
                    remote_path
                );
                context.bytes_uploaded = session.upload_file(&archive.path, &remote_path)?;
                context.archive = Some(archive);
                Ok(())
            }
            DeployStep::Verify => {
                let expected = context
                    .archive
                    .as_ref()
                    .map(|a| a.sha256.clone())
                    .ok_or_else(|| Error::Transfer("nothing has been uploaded".to_string()))?;
                let remote_path = self.plan.remote_archive_path();

                match verify_remote_file(session, &remote_path, &expected)? {
                    VerificationResult::Match => {
                        debug!("Checksum verified: {}", expected);
                        Ok(())
                    }
                    VerificationResult::HashMismatch { expected, actual } => {
                        Err(Error::Transfer(format!(
                            "checksum mismatch for {}: expected {}, got {}",
                            remote_path, expected, actual
                        )))
                    }
                    VerificationResult::NotFound => Err(Error::Transfer(format!(
                        "uploaded archive {} not found on remote host",
                        remote_path
                    ))),
                }
            }
            DeployStep::Extract => run_checked(session, &self.plan.extract_command()).map(|_| ()),
            DeployStep::RemoveArchive => {
                run_checked(session, &self.plan.remove_archive_command()).map(|_| ())
            }
            DeployStep::Publish => run_checked(session, &self.plan.publish_command()).map(|_| ()),
        }
    }
}

/// Runs `command`, treating a non-zero exit status as an error.
fn run_checked<S: RemoteSession>(session: &mut S, command: &str) -> Result<ExecutionResult> {
    debug!("Executing: {}", command);
    let result = session.run_command(command)?;
    if !result.is_success() {
        return Err(Error::RemoteCommand {
            command: command.to_string(),
            exit_code: result.exit_code,
            stderr: result.stderr.trim().to_string(),
        });
    }
    Ok(result)
}
