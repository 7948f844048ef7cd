//! Session abstractions shared by the SSH provider and the sequencer.
//!
//! The sequencer only talks to the remote host through [`SessionProvider`]
//! and [`RemoteSession`], so a run can be driven by the `ssh2` backend in
//! production or by a recording stub in tests.

use log::{debug, warn};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::remote::target::DeploymentTarget;

/// Result of executing a remote command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
    /// Exit code (0 for success)
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Returns true if the command succeeded (exit code 0).
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// A private key that has been checked and is ready to present to a server.
#[derive(Clone)]
pub struct Credential {
    private_key: PathBuf,
    passphrase: Option<String>,
}

impl Credential {
    /// Loads and sanity-checks a private key file.
    ///
    /// The file must exist, be readable, and carry a PEM or OpenSSH
    /// private key header. Decryption is left to the SSH library.
    pub fn from_key_file(private_key: &Path, passphrase: Option<&str>) -> Result<Self> {
        debug!("Loading private key: {}", private_key.display());

        let contents = fs::read_to_string(private_key).map_err(|e| {
            Error::Authentication(format!(
                "cannot read private key {}: {}",
                private_key.display(),
                e
            ))
        })?;

        if !contents.contains("PRIVATE KEY-----") {
            return Err(Error::Authentication(format!(
                "{} does not look like a private key",
                private_key.display()
            )));
        }

        Ok(Self {
            private_key: private_key.to_path_buf(),
            passphrase: passphrase.filter(|p| !p.is_empty()).map(str::to_string),
        })
    }

    pub fn private_key(&self) -> &Path {
        &self.private_key
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_deref()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("private_key", &self.private_key)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// An authenticated connection to one host.
pub trait RemoteSession {
    /// Runs a shell command and captures its output and exit status.
    ///
    /// A non-zero exit status is reported in the result, not as an error.
    fn run_command(&mut self, command: &str) -> Result<ExecutionResult>;

    /// Copies a local file to `remote_path`, returning the bytes sent.
    fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> Result<u64>;

    /// Disconnects from the host.
    fn close(&mut self) -> Result<()>;
}

/// Opens [`RemoteSession`]s.
pub trait SessionProvider {
    type Session: RemoteSession;

    /// Turns a private key on disk into a [`Credential`].
    fn authenticate(&self, private_key: &Path, passphrase: Option<&str>) -> Result<Credential> {
        Credential::from_key_file(private_key, passphrase)
    }

    /// Connects and logs in to `target` with `credential`.
    fn connect(&self, target: &DeploymentTarget, credential: &Credential) -> Result<Self::Session>;
}

/// Owns a session for the length of a run and closes it exactly once.
///
/// Call [`SessionGuard::close`] on the success path to observe the close
/// result; on any other path the session is closed when the guard drops.
pub struct SessionGuard<S: RemoteSession> {
    session: Option<S>,
    label: String,
}

impl<S: RemoteSession> SessionGuard<S> {
    pub fn new(session: S, label: impl Into<String>) -> Self {
        Self {
            session: Some(session),
            label: label.into(),
        }
    }

    /// Access to the live session.
    pub fn session(&mut self) -> Result<&mut S> {
        self.session
            .as_mut()
            .ok_or_else(|| Error::Connection(format!("session to {} already closed", self.label)))
    }

    /// Closes the session now.
    pub fn close(mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => {
                debug!("Closing session to {}", self.label);
                session.close()
            }
            None => Ok(()),
        }
    }
}

impl<S: RemoteSession> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!("Releasing session to {}", self.label);
            if let Err(e) = session.close() {
                warn!("Failed to close session to {}: {}", self.label, e);
            }
        }
    }
}
