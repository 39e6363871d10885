use thiserror::Error;

pub type Result<T> = std::result::Result<T, LollipopError>;

#[derive(Debug, Error)]
pub enum LollipopError {
    #[error("cannot parse protein change '{token}': {reason}")]
    Parse { token: String, reason: String },

    #[error("invalid protein feature data: {0}")]
    Data(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("font unavailable: {0}")]
    FontUnavailable(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl LollipopError {
    pub fn parse(token: &str, reason: impl Into<String>) -> Self {
        LollipopError::Parse {
            token: token.to_string(),
            reason: reason.into(),
        }
    }

    /// Parse and data errors are raised before any output is produced.
    pub fn is_input_error(&self) -> bool {
        matches!(self, LollipopError::Parse { .. } | LollipopError::Data(_))
    }
}

impl From<std::io::Error> for LollipopError {
    fn from(err: std::io::Error) -> Self {
        LollipopError::Render(err.to_string())
    }
}

impl From<image::ImageError> for LollipopError {
    fn from(err: image::ImageError) -> Self {
        LollipopError::Render(err.to_string())
    }
}
