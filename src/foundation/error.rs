pub type SoftCanvasResult<T> = Result<T, SoftCanvasError>;

/// Errors raised at the fallible edges of the server: decoding, configuration and
/// buffer construction. The per-frame render path never returns these.
#[derive(thiserror::Error, Debug)]
pub enum SoftCanvasError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("texture error: {0}")]
    Texture(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SoftCanvasError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn texture(msg: impl Into<String>) -> Self {
        Self::Texture(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}
