//! Quoting and path helpers for commands sent to the remote shell.

/// Escape a string for safe use in shell commands.
pub fn shell_escape(s: &str) -> String {
    // Single quotes, with embedded single quotes closed, escaped and reopened
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Joins remote path components with `/`, ignoring duplicate separators.
pub fn remote_join(dir: &str, name: &str) -> String {
    let trimmed = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if !trimmed.is_empty() {
        format!("{}/{}", trimmed, name)
    } else if dir.starts_with('/') {
        format!("/{}", name)
    } else {
        name.to_string()
    }
}

/// Wraps a command so it runs under `bash -c`, like an interactive login.
pub fn bash(command: &str) -> String {
    format!("bash -c {}", shell_escape(command))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape("simple"), "'simple'");
        assert_eq!(shell_escape("/path/to/file"), "'/path/to/file'");
        assert_eq!(shell_escape("file with spaces"), "'file with spaces'");
        assert_eq!(shell_escape("it's a test"), "'it'\\''s a test'");
    }

    #[test]
    fn test_remote_join() {
        assert_eq!(remote_join("public_html/docs", "docs.tar.gz"), "public_html/docs/docs.tar.gz");
        assert_eq!(remote_join("public_html/docs/", "/docs.tar.gz"), "public_html/docs/docs.tar.gz");
        assert_eq!(remote_join("", "docs.tar.gz"), "docs.tar.gz");
        assert_eq!(remote_join("/", "docs.tar.gz"), "/docs.tar.gz");
    }

    #[test]
    fn test_bash_wraps_and_quotes() {
        assert_eq!(bash("cd 'a b' && ls"), "bash -c 'cd '\\''a b'\\'' && ls'");
    }
}
