use std::path::PathBuf;

use thiserror::Error;

pub const TOKEN_URL: &str = "https://dashboard.ngrok.com/get-started/your-authtoken";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Represents all possible errors that can occur during the app's lifecycle
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to listen on \"{addr}\": {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
    #[error("ngrok listen error: {source}\n[HINT] Ensure your ngrok Authtoken is valid: {url}", url = TOKEN_URL)]
    RelayConnect { source: BoxError },
    #[error("ngrok tunnel closed: {0}")]
    RelayClosed(String),
    #[error("Missing ngrok Authtoken. Get one at {url}", url = TOKEN_URL)]
    MissingToken,
    #[error("Failed to read \"{path}\": {source}")]
    ReadEnvFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write \"{path}\": {source}")]
    WriteEnvFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to read from prompt: {0}")]
    Prompt(std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn relay<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::RelayConnect {
            source: source.into(),
        }
    }
}
