use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("{entity} with ID {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{0}")]
    Validation(String),
    #[error("Malformed schedule {id}: {reason}")]
    MalformedSchedule { id: i64, reason: String },
    #[error("Job '{0}' is already running")]
    JobLocked(&'static str),
    #[error("Failed to open file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to start {job} worker: {source}")]
    Worker {
        job: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid rule pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Failed to encode tags: {0}")]
    Tags(#[from] serde_json::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        AppError::NotFound { entity, id }
    }
}

pub type AppResult<T> = Result<T, AppError>;
