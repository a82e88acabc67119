use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    DuplicateEmail,

    #[error("User not found")]
    UnknownUser,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("The model hasn't been trained yet")]
    NotTrained,

    #[error("Training error: {0}")]
    Training(String),

    #[error("Corrupt model artifact: {0}")]
    CorruptArtifact(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Errors caused by the caller's input rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::DuplicateEmail | Error::UnknownUser
        )
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Validation(msg)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
