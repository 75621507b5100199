use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed lighting frame: {0:?}")]
    MalformedLightingFrame(String),
    #[error("invalid mixer frame: {0}")]
    InvalidMixerJson(#[from] serde_json::Error),
    #[error("scene switch update without a scene name")]
    MissingSceneName,
}
