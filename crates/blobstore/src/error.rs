//! Error types for blob providers.

/// Errors that can occur when working with a blob provider.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The blob name would escape the storage root, or is empty
    #[error("invalid blob name: {0:?}")]
    InvalidName(String),

    /// Blob not found
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The backend could not be reached or provisioned
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A stream was interrupted after the backend was reached
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A copy would read and write the same blob
    #[error("source and destination are the same blob: {0}")]
    SameBlob(String),
}

impl BlobError {
    /// Map an object storage error for the object `name`.
    ///
    /// Only `NotFound` keeps its meaning. Everything else means the store
    /// could not serve the request at all.
    pub(crate) fn from_store(err: object_store::Error, name: &str) -> Self {
        match err {
            object_store::Error::NotFound { .. } => Self::NotFound(name.to_string()),
            e => Self::Unavailable(e.to_string()),
        }
    }

    /// Map an object storage error raised while bytes were in flight.
    pub(crate) fn from_transfer(err: object_store::Error) -> Self {
        Self::Io(std::io::Error::other(err))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    pub fn is_invalid_name(&self) -> bool {
        matches!(self, Self::InvalidName(_))
    }
}

/// Result type alias for blob provider operations.
pub type Result<T> = std::result::Result<T, BlobError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let err = object_store::Error::NotFound {
            path: "foo".to_string(),
            source: "missing".into(),
        };
        let mapped = BlobError::from_store(err, "foo");
        assert!(mapped.is_not_found());
        assert_eq!(mapped.to_string(), "blob not found: foo");
    }

    #[test]
    fn test_other_store_errors_map_to_unavailable() {
        let err = object_store::Error::Generic {
            store: "S3",
            source: "connection refused".into(),
        };
        assert!(BlobError::from_store(err, "foo").is_unavailable());
    }

    #[test]
    fn test_transfer_errors_are_io() {
        let err = object_store::Error::Generic {
            store: "S3",
            source: "reset by peer".into(),
        };
        assert!(matches!(BlobError::from_transfer(err), BlobError::Io(_)));
    }
}
