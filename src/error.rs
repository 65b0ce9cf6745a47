use thiserror::Error;

/// Every way a launch can fail. All of them are terminal.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("{name} binary not found as executable in $PATH")]
    BinaryNotFound { name: String },

    #[error("could not read the installed version: {0}")]
    VersionRead(String),

    #[error("unexpected response from the release channel: {0}")]
    UpstreamProtocol(String),

    #[error("malformed version {0:?}")]
    MalformedVersion(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("authentication cancelled or failed")]
    AuthCancelled,

    #[error("installation failed: {0}")]
    Install(String),

    #[error("{name} was installed but is still not found in $PATH")]
    PostInstallNotFound { name: String },

    #[error("could not start {name}: {source}")]
    Launch {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LaunchError>;
