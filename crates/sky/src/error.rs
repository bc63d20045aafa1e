/// Errors from sky operations.
#[derive(Debug, thiserror::Error)]
pub enum SkyError {
    #[error("invalid moon phase {0}: expected 0..=7")]
    InvalidPhase(u8),
    #[error("invalid moon body {0}: expected 0 (Masser) or 1 (Secunda)")]
    InvalidBody(u8),
    #[error("billboard is not a moon")]
    NotAMoon,
    #[error("direction must be a non-zero, finite vector")]
    ZeroDirection,
    #[error("unknown weather '{0}'")]
    UnknownWeather(String),
    #[error("invalid sky config: {0}")]
    InvalidConfig(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
