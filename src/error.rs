use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Host key verification failed: {0}")]
    HostKey(String),

    #[error("Remote command `{command}` failed with exit code {exit_code}: {stderr}")]
    RemoteCommand {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Transfer error: {0}")]
    Transfer(String),

    #[error("Build error: {0}")]
    Build(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Error = DeployError;
pub type Result<T> = std::result::Result<T, Error>;
