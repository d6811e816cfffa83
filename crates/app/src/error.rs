use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),
    #[error(transparent)]
    Client(#[from] client::ClientError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    InvalidArgument(String),
}

impl AppError {
    /// Message printed to the user when a command fails.
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

impl From<engine::EngineError> for AppError {
    fn from(err: engine::EngineError) -> Self {
        Self::Client(err.into())
    }
}

impl From<engine::SplitError> for AppError {
    fn from(err: engine::SplitError) -> Self {
        Self::Client(err.into())
    }
}
