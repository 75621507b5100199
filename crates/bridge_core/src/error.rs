use std::{io, path::PathBuf};

use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read scene mapping file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("invalid scene mapping file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to connect websocket {url}: {source}")]
    Connect {
        url: String,
        source: tungstenite::Error,
    },
    #[error("websocket transport failed: {0}")]
    Socket(#[from] tungstenite::Error),
    #[error("failed to fetch lighting status page: {0}")]
    StatusPage(#[from] reqwest::Error),
    #[error("failed to parse lighting status page: {0}")]
    StatusPageParse(String),
    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl BridgeError {
    /// The peer is simply not running; this is the steady state while it is offline.
    pub fn is_connection_refused(&self) -> bool {
        matches!(
            self,
            BridgeError::Connect {
                source: tungstenite::Error::Io(err),
                ..
            } if err.kind() == io::ErrorKind::ConnectionRefused
        )
    }
}
