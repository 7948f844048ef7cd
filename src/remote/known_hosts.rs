//! Host key verification against an OpenSSH known_hosts file.

use log::{debug, info, warn};
use ssh2::{CheckResult, HashType, HostKeyType, KnownHostFileKind, KnownHosts, Session};
use std::fs;
use std::path::PathBuf;

use crate::config::DEFAULT_SSH_PORT;
use crate::error::{Error, Result};
use crate::remote::target::HostKeyPolicy;

/// Outcome of looking the server key up in known_hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKeyStatus {
    Match,
    NotFound,
    Mismatch,
    Failure,
}

impl From<CheckResult> for HostKeyStatus {
    fn from(result: CheckResult) -> Self {
        match result {
            CheckResult::Match => HostKeyStatus::Match,
            CheckResult::NotFound => HostKeyStatus::NotFound,
            CheckResult::Mismatch => HostKeyStatus::Mismatch,
            CheckResult::Failure => HostKeyStatus::Failure,
        }
    }
}

/// What to do with a host after its key has been looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKeyDecision {
    /// Key is known and matches.
    Trusted,
    /// Key is unknown and the policy allows recording it.
    Record,
    /// Connection must not proceed.
    Reject(String),
}

/// Applies `policy` to a lookup result.
pub fn decide(status: HostKeyStatus, policy: HostKeyPolicy, host: &str) -> HostKeyDecision {
    match (status, policy) {
        (HostKeyStatus::Match, _) => HostKeyDecision::Trusted,
        (HostKeyStatus::NotFound, HostKeyPolicy::AcceptNew) => HostKeyDecision::Record,
        (HostKeyStatus::NotFound, HostKeyPolicy::Strict) => HostKeyDecision::Reject(format!(
            "{} is not in known_hosts; connect once with --accept-new-host-key \
             or add it with ssh-keyscan",
            host
        )),
        (HostKeyStatus::Mismatch, _) => HostKeyDecision::Reject(format!(
            "the host key for {} does not match known_hosts; \
             the server key changed or the connection is being intercepted",
            host
        )),
        (HostKeyStatus::Failure, _) => {
            HostKeyDecision::Reject(format!("could not check the host key for {}", host))
        }
    }
}

/// known_hosts name for a host, bracketed when the port is not 22.
pub fn host_entry(host: &str, port: u16) -> String {
    if port == DEFAULT_SSH_PORT {
        host.to_string()
    } else {
        format!("[{}]:{}", host, port)
    }
}

/// Checks a handshaken session's host key.
pub struct KnownHostsVerifier {
    path: PathBuf,
    policy: HostKeyPolicy,
}

impl KnownHostsVerifier {
    pub fn with_path(path: PathBuf, policy: HostKeyPolicy) -> Self {
        Self { path, policy }
    }

    /// Verifies the key presented during the handshake of `session`.
    ///
    /// Must run after `handshake()` and before any authentication.
    pub fn verify(&self, session: &Session, host: &str, port: u16) -> Result<()> {
        let (key, key_type) = session
            .host_key()
            .ok_or_else(|| Error::HostKey(format!("{} presented no host key", host)))?;

        let mut known = session
            .known_hosts()
            .map_err(|e| Error::HostKey(format!("cannot initialise known_hosts: {}", e)))?;

        if self.check(&mut known, host, port, key, key_type)? {
            warn!(
                "Permanently added {} ({}) to {}",
                host_entry(host, port),
                fingerprint(session).unwrap_or_else(|| "unknown fingerprint".to_string()),
                self.path.display()
            );
        }
        Ok(())
    }

    /// Looks `key` up in the known_hosts file and applies the policy.
    ///
    /// Returns `true` when the key was unknown and has been recorded.
    pub fn check(
        &self,
        known: &mut KnownHosts,
        host: &str,
        port: u16,
        key: &[u8],
        key_type: HostKeyType,
    ) -> Result<bool> {
        if self.path.exists() {
            known
                .read_file(&self.path, KnownHostFileKind::OpenSSH)
                .map_err(|e| {
                    Error::HostKey(format!("cannot read {}: {}", self.path.display(), e))
                })?;
        } else {
            debug!("known_hosts file {} does not exist", self.path.display());
        }

        let status = HostKeyStatus::from(known.check_port(host, port, key));
        debug!("Host key lookup for {}:{}: {:?}", host, port, status);

        match decide(status, self.policy, host) {
            HostKeyDecision::Trusted => Ok(false),
            HostKeyDecision::Record => {
                let entry = host_entry(host, port);
                known
                    .add(&entry, key, "added by deploy-docs", key_type.into())
                    .map_err(|e| Error::HostKey(format!("cannot record {}: {}", entry, e)))?;

                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                known
                    .write_file(&self.path, KnownHostFileKind::OpenSSH)
                    .map_err(|e| {
                        Error::HostKey(format!("cannot write {}: {}", self.path.display(), e))
                    })?;
                Ok(true)
            }
            HostKeyDecision::Reject(reason) => {
                info!("Rejecting host key for {}", host);
                Err(Error::HostKey(reason))
            }
        }
    }
}

/// SHA-256 fingerprint of the session host key as colon-separated hex.
fn fingerprint(session: &Session) -> Option<String> {
    session.host_key_hash(HashType::Sha256).map(|bytes| {
        let hex: Vec<String> = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        format!("SHA256 {}", hex.join(":"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// SSH wire encoding of an RSA public key with made-up numbers.
    fn rsa_key_blob() -> Vec<u8> {
        let mut blob = Vec::new();
        for field in [&b"ssh-rsa"[..], &[0x01, 0x00, 0x01][..], &[0x5a; 64][..]] {
            blob.extend_from_slice(&(field.len() as u32).to_be_bytes());
            blob.extend_from_slice(field);
        }
        blob
    }

    fn empty_known_hosts(session: &Session) -> KnownHosts {
        session.known_hosts().unwrap()
    }

    #[test]
    fn test_match_is_trusted_under_any_policy() {
        assert_eq!(
            decide(HostKeyStatus::Match, HostKeyPolicy::Strict, "h"),
            HostKeyDecision::Trusted
        );
        assert_eq!(
            decide(HostKeyStatus::Match, HostKeyPolicy::AcceptNew, "h"),
            HostKeyDecision::Trusted
        );
    }

    #[test]
    fn test_unknown_host() {
        assert!(matches!(
            decide(HostKeyStatus::NotFound, HostKeyPolicy::Strict, "h"),
            HostKeyDecision::Reject(_)
        ));
        assert_eq!(
            decide(HostKeyStatus::NotFound, HostKeyPolicy::AcceptNew, "h"),
            HostKeyDecision::Record
        );
    }

    #[test]
    fn test_mismatch_always_rejected() {
        for policy in [HostKeyPolicy::Strict, HostKeyPolicy::AcceptNew] {
            match decide(HostKeyStatus::Mismatch, policy, "docs.example.com") {
                HostKeyDecision::Reject(reason) => assert!(reason.contains("docs.example.com")),
                other => panic!("expected rejection, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_host_entry() {
        assert_eq!(host_entry("docs.example.com", 22), "docs.example.com");
        assert_eq!(host_entry("docs.example.com", 2222), "[docs.example.com]:2222");
    }

    #[test]
    fn test_accept_new_records_bracketed_entry() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ssh").join("known_hosts");
        let verifier = KnownHostsVerifier::with_path(path.clone(), HostKeyPolicy::AcceptNew);
        let session = Session::new().unwrap();
        let key = rsa_key_blob();

        let recorded = verifier
            .check(
                &mut empty_known_hosts(&session),
                "docs.example.com",
                2222,
                &key,
                HostKeyType::Rsa,
            )
            .unwrap();
        assert!(recorded);

        let contents = fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[docs.example.com]:2222 ssh-rsa "), "{}", contents);

        // A fresh lookup now finds the recorded key
        let mut reread = empty_known_hosts(&session);
        reread
            .read_file(&path, KnownHostFileKind::OpenSSH)
            .unwrap();
        assert_eq!(
            HostKeyStatus::from(reread.check_port("docs.example.com", 2222, &key)),
            HostKeyStatus::Match
        );

        let again = KnownHostsVerifier::with_path(path.clone(), HostKeyPolicy::Strict)
            .check(
                &mut empty_known_hosts(&session),
                "docs.example.com",
                2222,
                &key,
                HostKeyType::Rsa,
            )
            .unwrap();
        assert!(!again);
    }

    #[test]
    fn test_strict_leaves_known_hosts_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("known_hosts");
        let verifier = KnownHostsVerifier::with_path(path.clone(), HostKeyPolicy::Strict);
        let session = Session::new().unwrap();

        let result = verifier.check(
            &mut empty_known_hosts(&session),
            "docs.example.com",
            2222,
            &rsa_key_blob(),
            HostKeyType::Rsa,
        );

        assert!(matches!(result, Err(Error::HostKey(_))));
        assert!(!path.exists());
    }
}
