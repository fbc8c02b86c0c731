use thiserror::Error;

/// Main error type for Vinculos
#[derive(Error, Debug)]
pub enum VinculosError {
    /// Storage-layer errors (the underlying store could not complete a read)
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested seed person or company does not exist in the store.
    /// Recoverable by the caller; the HTTP layer maps this to a 404.
    #[error("Seed not found: {0}")]
    SeedNotFound(String),

    /// Malformed identifier supplied as a seed; rejected before any store call
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using VinculosError
pub type Result<T> = std::result::Result<T, VinculosError>;
