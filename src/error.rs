use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid confidence {0}: expected an integer from 1 to 5")]
    InvalidConfidence(i64),

    #[error("Topic not found: {0}")]
    TopicNotFound(String),

    #[error("Ambiguous topic id '{0}': matches more than one topic")]
    AmbiguousId(String),

    #[error("Invalid status '{0}'. Use: new, to_study, studying, or studied")]
    InvalidStatus(String),

    #[error("Invalid daily goal {0}: expected 1 to 1440 minutes")]
    InvalidGoal(u32),

    #[error("Invalid stored timestamp '{0}'")]
    Timestamp(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
