use thiserror::Error;

#[derive(Debug, Error)]
pub enum BallpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid texture: {0}")]
    InvalidTexture(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Stroke has no points")]
    EmptyStroke,
}

impl From<BallpointError> for String {
    fn from(err: BallpointError) -> Self {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, BallpointError>;
