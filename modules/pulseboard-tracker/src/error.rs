/// Result type alias for tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("No suggestions to categorize")]
    NoSuggestions,

    #[error("Failed to parse categorization response: {0}")]
    CategorizerParse(String),

    #[error("Categorizer API error (status {status}): {message}")]
    CategorizerApi { status: u16, message: String },

    #[error("Categorizer request failed: {0}")]
    CategorizerHttp(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
