//! Remote hash verification of uploaded archives.
//!
//! After an upload the remote copy is hashed with `sha256sum` and compared
//! with the digest of the local file, so nothing is extracted from a
//! truncated or corrupted transfer.

use log::{debug, info, warn};

use crate::error::Result;
use crate::remote::session::RemoteSession;
use crate::remote::shell::shell_escape;

/// Result of a remote hash verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// File exists on remote with matching hash
    Match,
    /// File exists on remote but hash differs
    HashMismatch { expected: String, actual: String },
    /// File does not exist on remote, or could not be hashed
    NotFound,
}

impl VerificationResult {
    pub fn is_match(&self) -> bool {
        matches!(self, VerificationResult::Match)
    }
}

/// Compute SHA256 hash of a file on the remote machine.
///
/// Returns `Ok(None)` when `sha256sum` fails, e.g. the file is missing.
pub fn compute_remote_hash<S: RemoteSession>(
    session: &mut S,
    remote_path: &str,
) -> Result<Option<String>> {
    let command = format!("sha256sum {} 2>/dev/null", shell_escape(remote_path));

    debug!("Computing remote hash for: {}", remote_path);
    let result = session.run_command(&command)?;

    if !result.is_success() {
        debug!(
            "Remote hash computation failed (exit code {}): {}",
            result.exit_code, result.stderr
        );
        return Ok(None);
    }

    // sha256sum output: "hash  filename"
    Ok(result
        .stdout
        .split_whitespace()
        .next()
        .map(|s| s.to_lowercase()))
}

/// Verify that a remote file has the expected hash.
pub fn verify_remote_file<S: RemoteSession>(
    session: &mut S,
    remote_path: &str,
    expected_hash: &str,
) -> Result<VerificationResult> {
    info!(
        "Verifying remote hash for {} (expected: {}...)",
        remote_path,
        &expected_hash[..8.min(expected_hash.len())]
    );

    let result = match compute_remote_hash(session, remote_path)? {
        Some(actual) if actual == expected_hash.to_lowercase() => VerificationResult::Match,
        Some(actual) => {
            warn!(
                "Remote hash mismatch for {}: expected {}, got {}",
                remote_path, expected_hash, actual
            );
            VerificationResult::HashMismatch {
                expected: expected_hash.to_string(),
                actual,
            }
        }
        None => VerificationResult::NotFound,
    };

    Ok(result)
}
