// Error taxonomy for the voice satellite. Fatal errors (config, device open)
// use these types directly; everything else is logged and swallowed by the
// session controller so the listening loop never dies on a transient failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("missing required config: {0}")]
    MissingRequired(&'static str),

    #[error("invalid value for {field}: {value:?} (must be one of: direct, subprocess, auto)")]
    InvalidBackend { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("audio stream ended unexpectedly")]
    StreamEnded,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
#[error("agent returned an error: {0}")]
pub struct TransientAgentError(pub String);

#[derive(Debug, Error)]
#[error("tts failed: {0}")]
pub struct TtsFailure(pub String);

#[derive(Debug, Error)]
#[error("beep failed: {0}")]
pub struct BeepFailure(pub String);
