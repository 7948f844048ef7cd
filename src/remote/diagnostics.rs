//! Troubleshooting hints for failed SSH connections.

use crate::error::Error;

/// Provides helpful diagnostic information for SSH connection failures.
pub fn diagnose_ssh_error(error: &Error, host: &str, port: u16, ssh_key: Option<&str>) -> String {
    let error_str = error.to_string().to_lowercase();

    let mut suggestions = Vec::new();

    if matches!(error, Error::Connection(_))
        && (error_str.contains("connection refused")
            || error_str.contains("timed out")
            || error_str.contains("no route to host")
            || error_str.contains("resolve"))
    {
        suggestions.push(format!("• Verify the host '{}' is reachable", host));
        suggestions.push(format!(
            "• Check if SSH is running on port {} (try: ssh -p {} {})",
            port, port, host
        ));
        suggestions.push("• Verify your network connection and firewall settings".to_string());
    }

    if matches!(error, Error::Authentication(_)) {
        suggestions.push("• Verify your SSH key has correct permissions (chmod 600)".to_string());

        if let Some(key) = ssh_key {
            suggestions.push(format!("• Check that the SSH key exists: {}", key));
            suggestions.push(format!(
                "• Verify the public key is in ~/.ssh/authorized_keys on {}",
                host
            ));
        }
        suggestions.push(
            "• If the key is encrypted, export DEPLOY_DOCS_KEY_PASSPHRASE".to_string(),
        );
    }

    if matches!(error, Error::HostKey(_)) {
        suggestions.push(format!(
            "• Add the host to known_hosts: ssh-keyscan -p {} {} >> ~/.ssh/known_hosts",
            port, host
        ));
        suggestions.push(
            "• Or trust it on first contact with --accept-new-host-key".to_string(),
        );
    }

    if suggestions.is_empty() {
        suggestions.push("• Verify the remote host is accessible".to_string());
        suggestions.push(format!(
            "• Test the connection manually: ssh -p {} {}",
            port, host
        ));
    }

    format!(
        "{}\n\nTroubleshooting suggestions:\n{}",
        error,
        suggestions.join("\n")
    )
}
