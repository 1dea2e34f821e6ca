use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// The index holds no coordinates for the identifier.
    #[error("not indexed: {0}")]
    NotIndexed(String),
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),
    /// Decompression failed or the container ended before the record did.
    #[error("corrupt archive: {0}")]
    CorruptArchive(String),
    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),
    #[error("measurement not found")]
    NotFound,
}

impl From<reqwest::Error> for ResolveError {
    fn from(value: reqwest::Error) -> Self {
        ResolveError::SourceUnavailable(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ResolveError>;
