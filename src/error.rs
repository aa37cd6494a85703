use thiserror::Error;

/// Errors raised by the level core and its sample sources.
#[derive(Debug, Error)]
pub enum LevelError {
    /// Rejected smoothing coefficient or update interval.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// The sample source cannot produce samples.
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("{0}: source already running")]
    AlreadyRunning(&'static str),

    /// A worker thread could not be spawned.
    #[error("thread error: {0}")]
    Thread(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, LevelError>;
