//! `ssh2`-backed session provider.
//!
//! Opens one TCP connection per run, verifies the server host key, logs in
//! with a private key and then serves commands and SCP uploads over that
//! single session.

use log::{debug, info};
use ssh2::{Channel, Session};
use std::fs::File;
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;

use crate::error::{Error, Result};
use crate::remote::known_hosts::KnownHostsVerifier;
use crate::remote::session::{Credential, ExecutionResult, RemoteSession, SessionProvider};
use crate::remote::target::DeploymentTarget;

/// Mode given to uploaded files.
const UPLOAD_MODE: i32 = 0o644;

/// Production [`SessionProvider`] speaking SSH through libssh2.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ssh2Provider;

impl Ssh2Provider {
    pub fn new() -> Self {
        Self
    }

    fn open_tcp(target: &DeploymentTarget) -> Result<TcpStream> {
        let addr_str = format!("{}:{}", target.host(), target.port());
        let addr = addr_str
            .to_socket_addrs()
            .map_err(|e| {
                Error::Connection(format!(
                    "Failed to resolve host '{}': {}",
                    target.host(),
                    e
                ))
            })?
            .next()
            .ok_or_else(|| {
                Error::Connection(format!("No addresses found for host '{}'", target.host()))
            })?;

        let tcp = TcpStream::connect_timeout(&addr, target.timeout()).map_err(|e| {
            Error::Connection(format!("Failed to connect to {}: {}", target.host(), e))
        })?;

        tcp.set_read_timeout(Some(target.timeout()))?;
        tcp.set_write_timeout(Some(target.timeout()))?;
        Ok(tcp)
    }
}

impl SessionProvider for Ssh2Provider {
    type Session = Ssh2Session;

    fn connect(&self, target: &DeploymentTarget, credential: &Credential) -> Result<Ssh2Session> {
        info!("Connecting to {}:{}", target.host(), target.port());

        let tcp = Self::open_tcp(target)?;

        let mut session = Session::new()
            .map_err(|e| Error::Connection(format!("Failed to create SSH session: {}", e)))?;
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| Error::Connection(format!("SSH handshake failed: {}", e)))?;

        KnownHostsVerifier::with_path(target.known_hosts().to_path_buf(), target.host_key_policy())
            .verify(&session, target.host(), target.port())?;

        debug!(
            "Authenticating as {} with {}",
            target.user(),
            credential.private_key().display()
        );
        session
            .userauth_pubkey_file(
                target.user(),
                None,
                credential.private_key(),
                credential.passphrase(),
            )
            .map_err(|e| {
                Error::Authentication(format!(
                    "public key authentication failed for user {}: {}",
                    target.user(),
                    e
                ))
            })?;

        if !session.authenticated() {
            return Err(Error::Authentication(format!(
                "server did not accept {} for user {}",
                credential.private_key().display(),
                target.user()
            )));
        }

        debug!("SSH connection established");
        Ok(Ssh2Session {
            session,
            label: target.connection_string(),
            closed: false,
        })
    }
}

/// An authenticated libssh2 session.
pub struct Ssh2Session {
    session: Session,
    label: String,
    closed: bool,
}

impl RemoteSession for Ssh2Session {
    fn run_command(&mut self, command: &str) -> Result<ExecutionResult> {
        debug!("Executing remote command on {}: {}", self.label, command);

        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| Error::Connection(format!("Failed to open channel: {}", e)))?;

        channel
            .exec(command)
            .map_err(|e| Error::Connection(format!("Failed to execute command: {}", e)))?;

        let mut stdout = String::new();
        channel.read_to_string(&mut stdout)?;

        let mut stderr = String::new();
        channel.stderr().read_to_string(&mut stderr)?;

        channel
            .wait_close()
            .map_err(|e| Error::Connection(format!("Failed to close channel: {}", e)))?;

        let exit_code = channel
            .exit_status()
            .map_err(|e| Error::Connection(format!("Failed to get exit status: {}", e)))?;

        debug!("Command exit code: {}", exit_code);
        if !stdout.is_empty() {
            debug!("Command stdout: {}", stdout.trim_end());
        }
        if !stderr.is_empty() {
            debug!("Command stderr: {}", stderr.trim_end());
        }

        Ok(ExecutionResult {
            stdout,
            stderr,
            exit_code,
        })
    }

    fn upload_file(&mut self, local_path: &Path, remote_path: &str) -> Result<u64> {
        let mut file = File::open(local_path).map_err(|e| {
            Error::Transfer(format!("cannot open {}: {}", local_path.display(), e))
        })?;
        let size = file.metadata()?.len();

        debug!(
            "SCP {} ({} bytes) -> {}:{}",
            local_path.display(),
            size,
            self.label,
            remote_path
        );

        let mut channel = self
            .session
            .scp_send(Path::new(remote_path), UPLOAD_MODE, size, None)
            .map_err(|e| Error::Transfer(format!("SCP to {} refused: {}", remote_path, e)))?;

        let sent = std::io::copy(&mut file, &mut channel)
            .map_err(|e| Error::Transfer(format!("SCP upload interrupted: {}", e)))?;

        let finish = |channel: &mut Channel| -> std::result::Result<(), ssh2::Error> {
            channel.send_eof()?;
            channel.wait_eof()?;
            channel.close()?;
            channel.wait_close()
        };
        finish(&mut channel)
            .map_err(|e| Error::Transfer(format!("SCP upload did not finish: {}", e)))?;

        if sent != size {
            return Err(Error::Transfer(format!(
                "sent {} of {} bytes for {}",
                sent,
                size,
                local_path.display()
            )));
        }

        Ok(sent)
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.session
            .disconnect(None, "deploy-docs finished", None)
            .map_err(|e| Error::Connection(format!("disconnect from {} failed: {}", self.label, e)))
    }
}
