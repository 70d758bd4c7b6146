use thiserror::Error;

/// Application-wide error types for DevCamper.
#[derive(Error, Debug)]
pub enum AppError {
    /// A record with a well-formed id does not exist.
    #[error("{kind} not found with id of {id}")]
    NotFound { kind: &'static str, id: String },

    /// A path id that could not be parsed.
    #[error("Resource not found with id of {0}")]
    MalformedId(String),

    /// Input failed one or more field rules.
    #[error("{0}")]
    Validation(String),

    /// A unique constraint was violated.
    #[error("Duplicate field value entered")]
    DuplicateKey(String),

    /// A photo upload was refused (missing, wrong type, too large).
    #[error("{0}")]
    UploadRejected(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// The geocoding provider failed or returned garbage.
    #[error("Geocoder error: {0}")]
    GeocoderError(String),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Filesystem operation failed.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Internal failure with no more specific category.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        AppError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}
