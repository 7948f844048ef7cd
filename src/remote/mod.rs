//! Remote host access for documentation deployment.
//!
//! This module provides the SSH session used to publish documentation:
//! key-based login, host key verification, command execution, SCP upload
//! and post-upload hash verification.

pub mod diagnostics;
pub mod known_hosts;
pub mod session;
pub mod shell;
pub mod ssh;
pub mod target;
pub mod verify;

pub use diagnostics::diagnose_ssh_error;
pub use session::{Credential, ExecutionResult, RemoteSession, SessionGuard, SessionProvider};
pub use ssh::{Ssh2Provider, Ssh2Session};
pub use target::{DeploymentTarget, HostKeyPolicy};
pub use verify::{verify_remote_file, VerificationResult};
